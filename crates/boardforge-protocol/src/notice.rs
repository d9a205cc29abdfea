//! Notices a session pushes to its attached connections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Codec, GameState, LogEntry, MatchId, PlayerId, ProtocolError};

/// Marker substituted for any value that cannot be serialized.
pub const UNSERIALIZABLE: &str = "[Unserializable]";

/// A chat line. Chat is relayed verbatim: never filtered, never redacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Option<PlayerId>,
    pub payload: Value,
}

/// Everything a connection needs to (re)build its view of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncInfo<G> {
    /// Current state, filtered for the recipient.
    pub state: GameState<G>,
    /// Full match log, redacted for the recipient.
    pub log: Vec<LogEntry>,
    /// State right after setup, filtered for the recipient.
    pub initial_state: GameState<G>,
}

/// Session → connection notice.
///
/// Tagged on the wire: `{ "type": "sync", "matchID": "...", "info": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransportData<G> {
    /// Whole-state snapshot. Always safe to apply.
    Sync {
        #[serde(rename = "matchID")]
        match_id: MatchId,
        info: SyncInfo<G>,
    },

    /// One transition: the new state plus its deltalog.
    Update {
        #[serde(rename = "matchID")]
        match_id: MatchId,
        state: GameState<G>,
        deltalog: Vec<LogEntry>,
    },

    Chat {
        #[serde(rename = "matchID")]
        match_id: MatchId,
        message: ChatMessage,
    },
}

impl<G> TransportData<G> {
    /// The match this notice belongs to.
    pub fn match_id(&self) -> &MatchId {
        match self {
            Self::Sync { match_id, .. }
            | Self::Update { match_id, .. }
            | Self::Chat { match_id, .. } => match_id,
        }
    }
}

impl<G: Serialize> TransportData<G> {
    /// Encodes the notice, degrading instead of failing.
    ///
    /// If the notice as a whole can't be encoded (typically a game payload
    /// with non-string map keys), each piece is converted separately and
    /// every piece that fails is replaced by [`UNSERIALIZABLE`]. The sync
    /// still goes out with its `_stateID`, ctx and log intact.
    pub fn encode_lossy<C: Codec>(&self, codec: &C) -> Result<Vec<u8>, ProtocolError> {
        match codec.encode(self) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                tracing::warn!(
                    match_id = %self.match_id(),
                    error = %err,
                    "notice not serializable, substituting placeholders"
                );
                codec.encode(&self.to_value_lossy())
            }
        }
    }

    /// Converts the notice into a JSON tree, piece by piece.
    pub fn to_value_lossy(&self) -> Value {
        let mut out = Map::new();
        match self {
            Self::Sync { match_id, info } => {
                out.insert("type".into(), Value::from("sync"));
                out.insert("matchID".into(), Value::from(match_id.as_str()));
                let mut info_obj = Map::new();
                info_obj.insert("state".into(), state_value_lossy(&info.state));
                info_obj.insert("log".into(), to_value_lossy(&info.log));
                info_obj.insert("initialState".into(), state_value_lossy(&info.initial_state));
                out.insert("info".into(), Value::Object(info_obj));
            }
            Self::Update {
                match_id,
                state,
                deltalog,
            } => {
                out.insert("type".into(), Value::from("update"));
                out.insert("matchID".into(), Value::from(match_id.as_str()));
                out.insert("state".into(), state_value_lossy(state));
                out.insert("deltalog".into(), to_value_lossy(deltalog));
            }
            Self::Chat { match_id, message } => {
                out.insert("type".into(), Value::from("chat"));
                out.insert("matchID".into(), Value::from(match_id.as_str()));
                out.insert("message".into(), to_value_lossy(message));
            }
        }
        Value::Object(out)
    }
}

/// Converts any value to JSON, yielding [`UNSERIALIZABLE`] on failure.
pub fn to_value_lossy<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::String(UNSERIALIZABLE.to_string()))
}

fn state_value_lossy<G: Serialize>(state: &GameState<G>) -> Value {
    let mut out = Map::new();
    out.insert("G".into(), to_value_lossy(&state.g));
    out.insert("ctx".into(), to_value_lossy(&state.ctx));
    out.insert("_stateID".into(), Value::from(state.state_id));
    if !state.deltalog.is_empty() {
        out.insert("deltalog".into(), to_value_lossy(&state.deltalog));
    }
    Value::Object(out)
}
