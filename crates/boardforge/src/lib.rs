//! # Boardforge
//!
//! Turn-based game-state engine. A game is declared once (setup, moves,
//! turn and phase rules, player view, bot enumerator) and Boardforge runs
//! it: a pure reducer advances the state, a session per match keeps the
//! authoritative copy, and every connected client receives its own
//! filtered view after each change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use boardforge::prelude::*;
//!
//! # async fn run() -> Result<(), BoardforgeError> {
//! let game = GameBuilder::<u32>::new("counter")
//!     .add_move("inc", |m, _| Ok(*m.g + 1))
//!     .build()?;
//!
//! let local = Local::new(LocalConfig::default());
//! let (mut client, mut notices) =
//!     local.transport(TransportOpts::new(Arc::new(game)).player(PlayerId(0)));
//! client.connect().await?;
//! client.send_action(Action::make_move("inc", vec![], None)).await;
//! # let _ = notices.recv().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod logging;

pub use error::BoardforgeError;
pub use logging::init_tracing;

pub use boardforge_ai as ai;
pub use boardforge_core as core;
pub use boardforge_protocol as protocol;
pub use boardforge_session as session;
pub use boardforge_transport as transport;

pub mod prelude {
    pub use crate::{BoardforgeError, init_tracing};

    pub use boardforge_ai::{Bot, BotContext, BotError, BotFuture, RandomBot};
    pub use boardforge_core::{
        ActivePlayers, Candidate, ConfigError, GameBuilder, GameData, GameDefinition,
        InvalidMove, LocalClient, MoveConfig, MoveContext, PhaseConfig, StageConfig, Store,
        TurnConfig, TurnOrder, initialize, parse_arg, reduce,
    };
    pub use boardforge_protocol::{
        Action, ChatMessage, Codec, Ctx, GameState, JsonCodec, LogEntry, MatchId, PlayerId,
        SyncInfo, TransportData,
    };
    pub use boardforge_session::{
        LocalConfig, RegistryConfig, SessionError, SessionHandle, SessionKey, SessionRegistry,
    };
    pub use boardforge_transport::{
        Applied, Local, LocalTransport, MatchView, Transport, TransportError, TransportOpts,
    };
}
