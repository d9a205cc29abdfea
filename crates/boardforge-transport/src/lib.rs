//! Client transports for Boardforge.
//!
//! A transport is a client's connection to a match. It forwards the
//! client's actions and chat to the authoritative session and delivers the
//! session's notices back on a channel.
//!
//! Only the in-process [`LocalTransport`] is provided: every client lives in
//! the same process as the session, which makes it suitable for local
//! multiplayer, bots and tests.
//!
//! # Key types
//!
//! - [`Transport`]: the operations every client connection supports
//! - [`Local`]: factory that creates [`LocalTransport`]s sharing a registry
//! - [`TransportOpts`]: per-connection options (match, seat, credentials)
//! - [`MatchView`]: client-side consumer that tracks the synced state

#![allow(async_fn_in_trait)]

mod error;
mod local;
mod view;

pub use error::TransportError;
pub use local::{Local, LocalTransport, TransportOpts};
pub use view::{Applied, MatchView};

use boardforge_protocol::{Action, MatchId, PlayerId};
use serde_json::Value;

/// Called with the new connected flag whenever it changes.
pub type StatusCallback = Box<dyn Fn(bool) + Send + Sync>;

/// One client's connection to a match.
///
/// Only [`connect`](Self::connect) and [`update_match_id`](Self::update_match_id)
/// report errors. Everything else is best effort: failures are logged and
/// the client learns the outcome from the next sync.
pub trait Transport: Send {
    /// Attaches to the match's session, creating it if needed. The session
    /// answers with a full sync.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Detaches from the session. Bot work already in flight keeps going.
    async fn disconnect(&mut self);

    /// Dispatches `action` as this connection's player. A no-op while
    /// disconnected.
    async fn send_action(&mut self, action: Action);

    /// Relays `payload` to everyone attached to the match.
    async fn send_chat_message(&mut self, payload: Value);

    /// Asks for a fresh sync to this connection only.
    async fn request_sync(&mut self);

    /// Moves to another match, reconnecting if currently connected.
    async fn update_match_id(&mut self, match_id: MatchId) -> Result<(), TransportError>;

    /// Changes seat (or spectates with `None`) and gets a fresh sync if
    /// connected.
    async fn update_player_id(&mut self, player_id: Option<PlayerId>);

    fn update_credentials(&mut self, credentials: Option<String>);

    fn subscribe_to_connection_status(&mut self, callback: StatusCallback);

    fn is_connected(&self) -> bool;
}
