//! Authoritative match sessions for Boardforge.
//!
//! Each session runs as an isolated Tokio task (actor model) that owns the
//! match's [`Store`](boardforge_core::Store), its attached connections and
//! its bots. Everything that touches the state goes through the session's
//! command channel, so dispatches are serialized without locks.
//!
//! # Key types
//!
//! - [`SessionRegistry`]: creates, shares and evicts sessions by key
//! - [`SessionHandle`]: send commands to a running session actor
//! - [`SessionKey`]: game name + match ID + player count
//! - [`RegistryConfig`] / [`LocalConfig`]: defaults and bot setup
//! - [`sync_for`]: builds the per-recipient sync notice

mod bot_driver;
mod config;
mod error;
mod registry;
mod session;
mod sync;

pub use bot_driver::active_bot_player;
pub use config::{BotFactory, LocalConfig, RegistryConfig};
pub use error::SessionError;
pub use registry::{SessionKey, SessionRegistry};
pub use session::{ConnectionId, NoticeSender, SessionHandle, SessionInfo};
pub use sync::{sync_for, update_for};
