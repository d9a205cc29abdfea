//! Error types for the session layer.

use crate::SessionKey;

/// Errors that can occur while creating or talking to a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session's command channel is closed: it was evicted or its task
    /// stopped.
    #[error("session {0} is unavailable")]
    Unavailable(SessionKey),

    /// The game can't be played with this many seats.
    #[error("game {game} does not support {requested} players (allowed {min}..={max})")]
    InvalidPlayerCount {
        game: String,
        requested: usize,
        min: usize,
        max: usize,
    },
}
