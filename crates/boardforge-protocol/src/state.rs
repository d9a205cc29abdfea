//! Game state as produced by the reducer and seen by clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{LogEntry, PlayerId};

/// Turn and phase bookkeeping that every game shares.
///
/// Field names are camelCase on the wire (`currentPlayer`, `playOrderPos`,
/// ...). Only the reducer writes to a `Ctx`; game code reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ctx {
    /// How many seats the match was created with.
    pub num_players: usize,

    /// Seating order used by the turn order, usually `0..num_players`.
    pub play_order: Vec<PlayerId>,

    /// Index into `play_order` of the current player.
    pub play_order_pos: usize,

    pub current_player: PlayerId,

    /// Turn counter. 0 before the first turn begins, 1 afterwards.
    pub turn: u32,

    /// Current phase. `None` is the implicit default phase.
    pub phase: Option<String>,

    /// When set, exactly these players may act, each in the named stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_players: Option<BTreeMap<PlayerId, String>>,

    /// Result of a finished game. Once set, nothing else is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gameover: Option<Value>,

    /// Moves made so far in the current turn.
    #[serde(default)]
    pub num_moves: u32,
}

impl Ctx {
    /// A context for `num_players` seats before the first turn starts.
    ///
    /// A [`PlayerId`] is a `u32`, so the seat count is clamped to
    /// `u32::MAX`; `num_players` always equals `play_order.len()`.
    pub fn new(num_players: usize) -> Self {
        let seats = seat_count(num_players);
        let play_order: Vec<PlayerId> = (0..seats).map(PlayerId).collect();
        Self {
            num_players: play_order.len(),
            current_player: play_order.first().copied().unwrap_or(PlayerId(0)),
            play_order,
            play_order_pos: 0,
            turn: 0,
            phase: None,
            active_players: None,
            gameover: None,
            num_moves: 0,
        }
    }

    /// Returns `true` once `gameover` is set.
    pub fn is_over(&self) -> bool {
        self.gameover.is_some()
    }

    /// Returns `true` if `player` may act right now: a key of
    /// `active_players` when that is set, the current player otherwise.
    pub fn can_act(&self, player: PlayerId) -> bool {
        match &self.active_players {
            Some(active) => active.contains_key(&player),
            None => self.current_player == player,
        }
    }

    /// The stage `player` is in, if active players are set and include them.
    pub fn stage_of(&self, player: PlayerId) -> Option<&str> {
        self.active_players
            .as_ref()
            .and_then(|active| active.get(&player))
            .map(String::as_str)
    }
}

fn seat_count(num_players: usize) -> u32 {
    u32::try_from(num_players).unwrap_or(u32::MAX)
}

/// The full authoritative state of one match.
///
/// `G` is the game-specific payload. On the wire the struct looks like
/// `{ "G": ..., "ctx": {...}, "_stateID": 4, "deltalog": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState<G> {
    #[serde(rename = "G")]
    pub g: G,

    pub ctx: Ctx,

    /// Increases by exactly one per accepted transition. Clients use it to
    /// detect missed updates.
    #[serde(rename = "_stateID")]
    pub state_id: u64,

    /// Log entries for the most recent transition only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deltalog: Vec<LogEntry>,
}
