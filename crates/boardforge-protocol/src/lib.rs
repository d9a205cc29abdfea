//! Shared data model for Boardforge.
//!
//! This crate defines the "language" every other layer speaks:
//!
//! - **Identity** ([`PlayerId`], [`MatchId`]): who acts and in which match.
//! - **Actions** ([`Action`], [`ActionPayload`]): moves and lifecycle
//!   events, tagged `MAKE_MOVE` / `GAME_EVENT` on the wire.
//! - **State** ([`GameState`], [`Ctx`], [`LogEntry`]): what the reducer
//!   produces and what the log records.
//! - **Notices** ([`TransportData`], [`SyncInfo`], [`ChatMessage`]): what a
//!   session pushes to each attached connection.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how notices become bytes.
//!
//! # Architecture
//!
//! ```text
//! Core (reducer) → Protocol (GameState, LogEntry) → Session (per-recipient sync)
//! ```
//!
//! The protocol layer has no behaviour beyond construction helpers,
//! log redaction and lossy encoding. It does not know about sessions or
//! connections.

mod codec;
mod error;
mod notice;
mod state;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use notice::{
    ChatMessage, SyncInfo, TransportData, UNSERIALIZABLE, to_value_lossy,
};
pub use state::{Ctx, GameState};
pub use types::{Action, ActionPayload, LogEntry, MatchId, PlayerId, REDACTED_ARG};
