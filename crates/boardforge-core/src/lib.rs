//! Game definitions and the state reducer for Boardforge.
//!
//! Game developers describe a game declaratively with a [`GameBuilder`]
//! (setup, moves, turn and phase rules, player view, AI enumerator) and
//! process it into an immutable [`GameDefinition`]. The reducer then
//! advances a [`GameState`] one [`Action`] at a time.
//!
//! # Key types
//!
//! - [`GameBuilder`] / [`GameDefinition`]: declare and validate a game
//! - [`TurnConfig`], [`PhaseConfig`], [`TurnOrder`], [`ActivePlayers`]: flow rules
//! - [`initialize`]: the state right after setup
//! - [`reduce`]: pure `(state, action) → state`, failing soft
//! - [`Store`]: owns an authoritative state and its accumulated log
//! - [`LocalClient`]: a non-networked client over its own store
//!
//! [`GameState`]: boardforge_protocol::GameState
//! [`Action`]: boardforge_protocol::Action

mod client;
mod error;
mod flow;
mod game;
mod initialize;
mod reducer;
mod store;
mod turn;

pub use client::LocalClient;
pub use error::ConfigError;
pub use game::{
    Candidate, ConditionFn, EndIfFn, EnumerateFn, GameBuilder, GameData, GameDefinition,
    InvalidMove, MoveConfig, MoveContext, MoveFn, PlayerViewFn, SetupFn, parse_arg,
};
pub use initialize::initialize;
pub use reducer::{EVENTS, reduce};
pub use store::Store;
pub use turn::{ActivePlayers, DEFAULT_STAGE, PhaseConfig, StageConfig, TurnConfig, TurnOrder};
