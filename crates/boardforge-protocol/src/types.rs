//! Identity, action and log types.
//!
//! Everything here is plain data: it derives `Serialize`/`Deserialize` so
//! it can be logged, diffed and shipped to clients, and `Clone` so that a
//! session can hand every recipient its own copy.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A seat at the table.
///
/// Players are numbered from zero in seating order, which is also the
/// default turn order. Spectators have no `PlayerId`; APIs that accept
/// either use `Option<PlayerId>` with `None` meaning "spectator".
///
/// `#[serde(transparent)]` makes `PlayerId(1)` serialize as just `1`, and
/// as the string `"1"` when it is used as a map key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PlayerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Identifies one match of a game. Connections that share a match ID (and
/// player count) share one authoritative session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl MatchId {
    /// The match ID used when a caller doesn't name one.
    pub const DEFAULT: &'static str = "default";

    /// Creates a match ID from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MatchId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MatchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The argument every redacted log entry carries instead of the real ones.
pub const REDACTED_ARG: &str = "<redacted>";

/// The body shared by both action kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    /// Move or event name, e.g. `"clickCell"` or `"endTurn"`.
    #[serde(rename = "type")]
    pub name: String,

    /// Positional arguments, passed to the move untouched.
    #[serde(default)]
    pub args: Vec<Value>,

    /// The acting player. `None` for spectators, whose actions are always
    /// rejected by the reducer.
    #[serde(rename = "playerID", default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,

    /// Opaque credentials forwarded by the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// Something a player asks the reducer to do.
///
/// Serialized as `{ "type": "MAKE_MOVE", "payload": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Action {
    /// Invoke a named move from the game definition.
    #[serde(rename = "MAKE_MOVE")]
    MakeMove(ActionPayload),

    /// Trigger a lifecycle event (`endTurn`, `endPhase`, ...).
    #[serde(rename = "GAME_EVENT")]
    GameEvent(ActionPayload),
}

impl Action {
    /// Builds a `MAKE_MOVE` action.
    pub fn make_move(
        name: impl Into<String>,
        args: Vec<Value>,
        player_id: Option<PlayerId>,
    ) -> Self {
        Self::MakeMove(ActionPayload {
            name: name.into(),
            args,
            player_id,
            credentials: None,
        })
    }

    /// Builds a `GAME_EVENT` action.
    pub fn game_event(
        name: impl Into<String>,
        args: Vec<Value>,
        player_id: Option<PlayerId>,
    ) -> Self {
        Self::GameEvent(ActionPayload {
            name: name.into(),
            args,
            player_id,
            credentials: None,
        })
    }

    /// Attaches credentials to the payload.
    pub fn with_credentials(mut self, credentials: Option<String>) -> Self {
        self.payload_mut().credentials = credentials;
        self
    }

    pub fn payload(&self) -> &ActionPayload {
        match self {
            Self::MakeMove(p) | Self::GameEvent(p) => p,
        }
    }

    pub fn payload_mut(&mut self) -> &mut ActionPayload {
        match self {
            Self::MakeMove(p) | Self::GameEvent(p) => p,
        }
    }

    /// Name of the move or event.
    pub fn name(&self) -> &str {
        &self.payload().name
    }

    /// The acting player, if any.
    pub fn player_id(&self) -> Option<PlayerId> {
        self.payload().player_id
    }

    /// The wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MakeMove(_) => "MAKE_MOVE",
            Self::GameEvent(_) => "GAME_EVENT",
        }
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

fn is_false(b: &bool) -> bool {
    !*b
}

/// One accepted transition, as recorded in the match log.
///
/// `state_id`, `turn` and `phase` describe the state the action was applied
/// to, not the state it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub action: Action,

    #[serde(rename = "_stateID")]
    pub state_id: u64,

    pub turn: u32,

    pub phase: Option<String>,

    /// When set, only the acting player may see `action.payload.args`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub redact: bool,
}

impl LogEntry {
    /// Returns the entry as `viewer` is allowed to see it.
    ///
    /// Entries flagged `redact` keep their position and metadata for every
    /// viewer, but anyone other than the acting player gets
    /// `[REDACTED_ARG]` in place of the arguments.
    pub fn redacted_for(&self, viewer: Option<PlayerId>) -> LogEntry {
        let mut entry = self.clone();
        if self.redact && self.action.player_id() != viewer {
            entry.action.payload_mut().args = vec![Value::String(REDACTED_ARG.to_string())];
        }
        entry
    }
}
