//! Error types for the protocol layer.
//!
//! Each crate in Boardforge defines its own error enum. When you see a
//! `ProtocolError`, the problem is in turning notices into bytes or back,
//! never in game rules or session bookkeeping.

/// Errors that can occur while encoding or decoding protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    ///
    /// The usual culprit is a game payload holding a map whose keys are
    /// not strings, which JSON cannot represent.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
