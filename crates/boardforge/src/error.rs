//! Unified error type for Boardforge.

use boardforge_ai::BotError;
use boardforge_core::ConfigError;
use boardforge_protocol::ProtocolError;
use boardforge_session::SessionError;
use boardforge_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// Illegal moves never show up here: the reducer treats them as no-ops.
#[derive(Debug, thiserror::Error)]
pub enum BoardforgeError {
    /// The game definition was rejected at build time.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session is gone or refused the requested player count.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Bot(#[from] BotError),
}
