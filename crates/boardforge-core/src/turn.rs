//! Turn, stage and phase configuration.
//!
//! These describe *how play flows*: who moves first in a turn, who moves
//! next, which players may act in parallel, and when a turn or phase ends
//! on its own. The reducer interprets them in `flow.rs`.

use std::collections::BTreeMap;
use std::fmt;

use boardforge_protocol::{Ctx, PlayerId};
use serde::{Deserialize, Serialize};

use crate::game::ConditionFn;

/// Stage name used when players are made active without naming a stage.
pub const DEFAULT_STAGE: &str = "default";

// ---------------------------------------------------------------------------
// TurnOrder
// ---------------------------------------------------------------------------

/// Decides the first player of a phase and the player after each turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOrder {
    /// Round-robin. The first turn of the game goes to seat 0; later phases
    /// continue with the player after the current one.
    #[default]
    Default,

    /// Round-robin, but every phase starts again at the first seat.
    Reset,

    /// Round-robin, and the current player keeps playing when a phase begins.
    Continue,

    /// Each player gets exactly one turn, then the phase ends.
    Once,

    /// Round-robin over a fixed seating, installed as `ctx.playOrder` when
    /// the phase begins.
    Custom(Vec<PlayerId>),
}

impl TurnOrder {
    /// Position in `ctx.play_order` of the first player of a phase.
    pub(crate) fn first(&self, ctx: &Ctx) -> usize {
        let len = ctx.play_order.len().max(1);
        match self {
            Self::Default if ctx.turn == 0 => ctx.play_order_pos,
            Self::Default => (ctx.play_order_pos + 1) % len,
            Self::Continue => ctx.play_order_pos,
            Self::Reset | Self::Once | Self::Custom(_) => 0,
        }
    }

    /// Position of the next player, or `None` when the phase should end.
    pub(crate) fn next(&self, ctx: &Ctx) -> Option<usize> {
        let len = ctx.play_order.len().max(1);
        match self {
            Self::Once if ctx.play_order_pos + 1 >= len => None,
            _ => Some((ctx.play_order_pos + 1) % len),
        }
    }
}

// ---------------------------------------------------------------------------
// ActivePlayers
// ---------------------------------------------------------------------------

/// Which players may act, and in which stage.
///
/// This is also the argument of the `setActivePlayers` event, so it is
/// deserializable from JSON: `{"all": "vote"}`, `{"others": "discard"}`,
/// `{"currentPlayer": "play", "value": {"2": "wait"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePlayers {
    /// Every seated player enters this stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player: Option<String>,

    /// Everyone except the current player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub others: Option<String>,

    /// Explicit assignments. Applied last, so they win over the above.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub value: BTreeMap<PlayerId, String>,
}

impl ActivePlayers {
    pub fn all(stage: impl Into<String>) -> Self {
        Self {
            all: Some(stage.into()),
            ..Self::default()
        }
    }

    pub fn current_player(stage: impl Into<String>) -> Self {
        Self {
            current_player: Some(stage.into()),
            ..Self::default()
        }
    }

    pub fn others(stage: impl Into<String>) -> Self {
        Self {
            others: Some(stage.into()),
            ..Self::default()
        }
    }

    /// Makes exactly `players` active, all in [`DEFAULT_STAGE`].
    pub fn players(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            value: players
                .into_iter()
                .map(|p| (p, DEFAULT_STAGE.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Resolves the configuration against the current seating.
    ///
    /// Returns `None` when nobody ends up active, which hands control back
    /// to the current player.
    pub(crate) fn resolve(&self, ctx: &Ctx) -> Option<BTreeMap<PlayerId, String>> {
        let mut active = BTreeMap::new();

        if let Some(stage) = &self.all {
            for &player in &ctx.play_order {
                active.insert(player, stage.clone());
            }
        }
        if let Some(stage) = &self.others {
            for &player in ctx.play_order.iter().filter(|&&p| p != ctx.current_player) {
                active.insert(player, stage.clone());
            }
        }
        if let Some(stage) = &self.current_player {
            active.insert(ctx.current_player, stage.clone());
        }
        for (&player, stage) in &self.value {
            active.insert(player, stage.clone());
        }

        (!active.is_empty()).then_some(active)
    }
}

// ---------------------------------------------------------------------------
// StageConfig / TurnConfig
// ---------------------------------------------------------------------------

/// Rules for one stage inside a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageConfig {
    /// Moves allowed in this stage. `None` allows every move.
    pub moves: Option<Vec<String>>,

    /// Stage a player moves to on `endStage`. `None` makes them inactive.
    pub next: Option<String>,
}

impl StageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moves<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moves = Some(moves.into_iter().map(Into::into).collect());
        self
    }

    pub fn next(mut self, stage: impl Into<String>) -> Self {
        self.next = Some(stage.into());
        self
    }
}

/// How turns work, either for the whole game or for one phase.
pub struct TurnConfig<G> {
    pub order: TurnOrder,

    /// Set at the start of every turn.
    pub active_players: Option<ActivePlayers>,

    pub stages: BTreeMap<String, StageConfig>,

    /// `endTurn` is refused until the current player made this many moves.
    pub min_moves: Option<u32>,

    /// The turn ends automatically after this many moves.
    pub max_moves: Option<u32>,

    /// The turn ends automatically when this returns `true` after a move.
    pub end_if: Option<ConditionFn<G>>,
}

impl<G> TurnConfig<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: TurnOrder) -> Self {
        self.order = order;
        self
    }

    pub fn active_players(mut self, active: ActivePlayers) -> Self {
        self.active_players = Some(active);
        self
    }

    pub fn stage(mut self, name: impl Into<String>, stage: StageConfig) -> Self {
        self.stages.insert(name.into(), stage);
        self
    }

    pub fn min_moves(mut self, n: u32) -> Self {
        self.min_moves = Some(n);
        self
    }

    pub fn max_moves(mut self, n: u32) -> Self {
        self.max_moves = Some(n);
        self
    }

    pub fn end_if<F>(mut self, f: F) -> Self
    where
        F: Fn(&G, &Ctx) -> bool + Send + Sync + 'static,
    {
        self.end_if = Some(std::sync::Arc::new(f));
        self
    }
}

impl<G> Default for TurnConfig<G> {
    fn default() -> Self {
        Self {
            order: TurnOrder::Default,
            active_players: None,
            stages: BTreeMap::new(),
            min_moves: None,
            max_moves: None,
            end_if: None,
        }
    }
}

impl<G> Clone for TurnConfig<G> {
    fn clone(&self) -> Self {
        Self {
            order: self.order.clone(),
            active_players: self.active_players.clone(),
            stages: self.stages.clone(),
            min_moves: self.min_moves,
            max_moves: self.max_moves,
            end_if: self.end_if.clone(),
        }
    }
}

impl<G> fmt::Debug for TurnConfig<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnConfig")
            .field("order", &self.order)
            .field("active_players", &self.active_players)
            .field("stages", &self.stages)
            .field("min_moves", &self.min_moves)
            .field("max_moves", &self.max_moves)
            .field("end_if", &self.end_if.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PhaseConfig
// ---------------------------------------------------------------------------

/// A named period of the game with its own moves and turn rules.
pub struct PhaseConfig<G> {
    /// The game begins in this phase.
    pub start: bool,

    /// Phase entered when this one ends. `None` returns to the default phase.
    pub next: Option<String>,

    /// Moves allowed in this phase. `None` allows every move.
    pub moves: Option<Vec<String>>,

    /// Overrides the game-level turn configuration.
    pub turn: Option<TurnConfig<G>>,

    /// The phase ends automatically when this returns `true` after a move.
    pub end_if: Option<ConditionFn<G>>,
}

impl<G> PhaseConfig<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self) -> Self {
        self.start = true;
        self
    }

    pub fn next(mut self, phase: impl Into<String>) -> Self {
        self.next = Some(phase.into());
        self
    }

    pub fn moves<I, S>(mut self, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moves = Some(moves.into_iter().map(Into::into).collect());
        self
    }

    pub fn turn(mut self, turn: TurnConfig<G>) -> Self {
        self.turn = Some(turn);
        self
    }

    pub fn end_if<F>(mut self, f: F) -> Self
    where
        F: Fn(&G, &Ctx) -> bool + Send + Sync + 'static,
    {
        self.end_if = Some(std::sync::Arc::new(f));
        self
    }
}

impl<G> Default for PhaseConfig<G> {
    fn default() -> Self {
        Self {
            start: false,
            next: None,
            moves: None,
            turn: None,
            end_if: None,
        }
    }
}

impl<G> fmt::Debug for PhaseConfig<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseConfig")
            .field("start", &self.start)
            .field("next", &self.next)
            .field("moves", &self.moves)
            .field("turn", &self.turn)
            .field("end_if", &self.end_if.is_some())
            .finish()
    }
}
