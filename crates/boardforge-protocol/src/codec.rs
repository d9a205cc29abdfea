//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust values and raw bytes. Sessions hand typed
//! notices to in-process connections, so a codec is only involved when a
//! notice leaves the process (logging, a custom transport, a debugger
//! panel). [`TransportData::encode_lossy`](crate::TransportData::encode_lossy)
//! is the entry point that never fails on odd game payloads.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust values to bytes and decode bytes back.
///
/// `Send + Sync + 'static` so one codec can be shared by every task that
/// talks to a connection.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented
    /// in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use boardforge_protocol::{Action, Codec, JsonCodec, PlayerId};
///
/// let codec = JsonCodec;
/// let action = Action::make_move("inc", vec![], Some(PlayerId(0)));
///
/// let bytes = codec.encode(&action).unwrap();
/// let decoded: Action = codec.decode(&bytes).unwrap();
/// assert_eq!(action, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
