//! The Game Definition Processor.
//!
//! A [`GameBuilder`] is the raw, declarative description of a game. Calling
//! [`GameBuilder::build`] validates it and produces a [`GameDefinition`],
//! the immutable form the reducer, sessions and bots work from. Processing
//! is side-effect-free: building the same builder twice yields equivalent
//! definitions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use boardforge_protocol::{Action, Ctx, GameState, PlayerId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::reducer::EVENTS;
use crate::turn::{PhaseConfig, TurnConfig, TurnOrder};

/// Bound for a game's custom payload `G`.
///
/// Implemented automatically for every type that qualifies.
pub trait GameData:
    Clone + fmt::Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> GameData for T where
    T: Clone + fmt::Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

// ---------------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------------

/// Returned by a move to reject the action. The reducer turns it into a
/// no-op; it is never surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid move")]
pub struct InvalidMove;

/// What a move function gets to look at.
#[derive(Debug)]
pub struct MoveContext<'a, G> {
    pub g: &'a G,
    pub ctx: &'a Ctx,
    pub player_id: PlayerId,
}

/// Per-move options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveConfig {
    /// Hide this move's arguments in the log from everyone but the mover.
    pub redact: bool,
}

/// Deserializes positional argument `index`, rejecting the move if it is
/// missing or has the wrong shape.
///
/// ```
/// use boardforge_core::{parse_arg, InvalidMove};
/// use serde_json::json;
///
/// let args = [json!(4)];
/// assert_eq!(parse_arg::<usize>(&args, 0), Ok(4));
/// assert_eq!(parse_arg::<usize>(&args, 1), Err(InvalidMove));
/// ```
pub fn parse_arg<T: DeserializeOwned>(args: &[Value], index: usize) -> Result<T, InvalidMove> {
    let value = args.get(index).ok_or(InvalidMove)?;
    serde_json::from_value(value.clone()).map_err(|_| InvalidMove)
}

pub type MoveFn<G> =
    Arc<dyn Fn(&MoveContext<'_, G>, &[Value]) -> Result<G, InvalidMove> + Send + Sync>;
pub type SetupFn<G> = Arc<dyn Fn(&Ctx) -> G + Send + Sync>;
pub type ConditionFn<G> = Arc<dyn Fn(&G, &Ctx) -> bool + Send + Sync>;
pub type EndIfFn<G> = Arc<dyn Fn(&G, &Ctx) -> Option<Value> + Send + Sync>;
pub type PlayerViewFn<G> = Arc<dyn Fn(&G, &Ctx, Option<PlayerId>) -> G + Send + Sync>;
pub type EnumerateFn<G> = Arc<dyn Fn(&G, &Ctx, PlayerId) -> Vec<Candidate> + Send + Sync>;

pub(crate) struct MoveDef<G> {
    pub(crate) apply: MoveFn<G>,
    pub(crate) config: MoveConfig,
}

impl<G> Clone for MoveDef<G> {
    fn clone(&self) -> Self {
        Self {
            apply: Arc::clone(&self.apply),
            config: self.config,
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A legal option offered to a bot by the game's enumerator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Candidate {
    Move {
        #[serde(rename = "move")]
        name: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    Event {
        #[serde(rename = "event")]
        name: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl Candidate {
    pub fn move_(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Move {
            name: name.into(),
            args,
        }
    }

    pub fn event(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Event {
            name: name.into(),
            args,
        }
    }

    /// Turns the candidate into an action on behalf of `player`.
    pub fn into_action(self, player: PlayerId) -> Action {
        match self {
            Self::Move { name, args } => Action::make_move(name, args, Some(player)),
            Self::Event { name, args } => Action::game_event(name, args, Some(player)),
        }
    }
}

// ---------------------------------------------------------------------------
// GameBuilder
// ---------------------------------------------------------------------------

/// Declarative description of a game, before validation.
///
/// ```
/// use boardforge_core::{GameBuilder, parse_arg};
///
/// let game = GameBuilder::<u32>::new("counter")
///     .add_move("add", |m, args| Ok(*m.g + parse_arg::<u32>(args, 0)?))
///     .build()
///     .unwrap();
///
/// assert_eq!(game.name(), "counter");
/// ```
pub struct GameBuilder<G> {
    name: String,
    min_players: usize,
    max_players: usize,
    setup: Option<SetupFn<G>>,
    moves: Vec<(String, MoveDef<G>)>,
    turn: TurnConfig<G>,
    phases: Vec<(String, PhaseConfig<G>)>,
    end_if: Option<EndIfFn<G>>,
    player_view: Option<PlayerViewFn<G>>,
    enumerate: Option<EnumerateFn<G>>,
    seed: Option<u64>,
}

impl<G: GameData> GameBuilder<G> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_players: 1,
            max_players: usize::MAX,
            setup: None,
            moves: Vec::new(),
            turn: TurnConfig::default(),
            phases: Vec::new(),
            end_if: None,
            player_view: None,
            enumerate: None,
            seed: None,
        }
    }

    /// Accepted player counts, inclusive.
    pub fn players(mut self, min: usize, max: usize) -> Self {
        self.min_players = min;
        self.max_players = max;
        self
    }

    /// Builds the initial payload. Without one, `G::default()` is used.
    pub fn setup<F>(mut self, f: F) -> Self
    where
        F: Fn(&Ctx) -> G + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(f));
        self
    }

    pub fn add_move<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&MoveContext<'_, G>, &[Value]) -> Result<G, InvalidMove> + Send + Sync + 'static,
    {
        self.add_move_with(name, MoveConfig::default(), f)
    }

    pub fn add_move_with<F>(mut self, name: impl Into<String>, config: MoveConfig, f: F) -> Self
    where
        F: Fn(&MoveContext<'_, G>, &[Value]) -> Result<G, InvalidMove> + Send + Sync + 'static,
    {
        self.moves.push((
            name.into(),
            MoveDef {
                apply: Arc::new(f),
                config,
            },
        ));
        self
    }

    pub fn turn(mut self, turn: TurnConfig<G>) -> Self {
        self.turn = turn;
        self
    }

    pub fn phase(mut self, name: impl Into<String>, phase: PhaseConfig<G>) -> Self {
        self.phases.push((name.into(), phase));
        self
    }

    /// Checked after every move; `Some(result)` ends the game.
    pub fn end_if<F>(mut self, f: F) -> Self
    where
        F: Fn(&G, &Ctx) -> Option<Value> + Send + Sync + 'static,
    {
        self.end_if = Some(Arc::new(f));
        self
    }

    /// Hides information per recipient. Called with `None` for spectators.
    pub fn player_view<F>(mut self, f: F) -> Self
    where
        F: Fn(&G, &Ctx, Option<PlayerId>) -> G + Send + Sync + 'static,
    {
        self.player_view = Some(Arc::new(f));
        self
    }

    /// Lists the legal options for a player. Required for bots.
    pub fn ai<F>(mut self, f: F) -> Self
    where
        F: Fn(&G, &Ctx, PlayerId) -> Vec<Candidate> + Send + Sync + 'static,
    {
        self.enumerate = Some(Arc::new(f));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the description and produces a [`GameDefinition`].
    pub fn build(self) -> Result<GameDefinition<G>, ConfigError> {
        if self.min_players == 0 || self.min_players > self.max_players {
            return Err(ConfigError::InvalidPlayerRange {
                min: self.min_players,
                max: self.max_players,
            });
        }

        let mut moves = BTreeMap::new();
        for (name, def) in self.moves {
            if name.is_empty() {
                return Err(ConfigError::EmptyMoveName);
            }
            if EVENTS.contains(&name.as_str()) {
                return Err(ConfigError::ReservedMoveName(name));
            }
            if moves.contains_key(&name) {
                return Err(ConfigError::DuplicateMove(name));
            }
            moves.insert(name, def);
        }

        let phase_names: BTreeSet<&str> = self.phases.iter().map(|(n, _)| n.as_str()).collect();
        if phase_names.len() != self.phases.len() {
            let mut seen = BTreeSet::new();
            for (name, _) in &self.phases {
                if !seen.insert(name.as_str()) {
                    return Err(ConfigError::DuplicatePhase(name.clone()));
                }
            }
        }

        validate_turn(&self.turn, &moves, "game turn")?;

        let mut start_phase: Option<String> = None;
        for (name, phase) in &self.phases {
            let label = format!("phase {name}");
            if let Some(next) = &phase.next {
                if !phase_names.contains(next.as_str()) {
                    return Err(ConfigError::UnknownPhase {
                        phase: next.clone(),
                        referenced_by: label,
                    });
                }
            }
            if let Some(allowed) = &phase.moves {
                check_moves(allowed, &moves, &label)?;
            }
            if let Some(turn) = &phase.turn {
                validate_turn(turn, &moves, &label)?;
            }
            if phase.start {
                if let Some(first) = &start_phase {
                    return Err(ConfigError::MultipleStartPhases(first.clone(), name.clone()));
                }
                start_phase = Some(name.clone());
            }
        }

        Ok(GameDefinition {
            name: self.name,
            min_players: self.min_players,
            max_players: self.max_players,
            setup: self.setup,
            moves,
            turn: self.turn,
            phases: self.phases.into_iter().collect(),
            start_phase,
            end_if: self.end_if,
            player_view: self.player_view,
            enumerate: self.enumerate,
            seed: self.seed,
        })
    }
}

fn check_moves<G>(
    names: &[String],
    moves: &BTreeMap<String, MoveDef<G>>,
    referenced_by: &str,
) -> Result<(), ConfigError> {
    match names.iter().find(|n| !moves.contains_key(n.as_str())) {
        Some(name) => Err(ConfigError::UnknownMove {
            name: name.clone(),
            referenced_by: referenced_by.to_string(),
        }),
        None => Ok(()),
    }
}

fn validate_turn<G>(
    turn: &TurnConfig<G>,
    moves: &BTreeMap<String, MoveDef<G>>,
    label: &str,
) -> Result<(), ConfigError> {
    if let TurnOrder::Custom(order) = &turn.order {
        if order.is_empty() {
            return Err(ConfigError::EmptyPlayOrder(label.to_string()));
        }
    }
    for (stage_name, stage) in &turn.stages {
        if let Some(allowed) = &stage.moves {
            check_moves(allowed, moves, &format!("{label} stage {stage_name}"))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GameDefinition
// ---------------------------------------------------------------------------

/// A validated, immutable game. Share it as `Arc<GameDefinition<G>>`.
pub struct GameDefinition<G> {
    name: String,
    min_players: usize,
    max_players: usize,
    setup: Option<SetupFn<G>>,
    moves: BTreeMap<String, MoveDef<G>>,
    turn: TurnConfig<G>,
    phases: BTreeMap<String, PhaseConfig<G>>,
    start_phase: Option<String>,
    end_if: Option<EndIfFn<G>>,
    player_view: Option<PlayerViewFn<G>>,
    enumerate: Option<EnumerateFn<G>>,
    seed: Option<u64>,
}

impl<G: GameData> GameDefinition<G> {
    pub fn builder(name: impl Into<String>) -> GameBuilder<G> {
        GameBuilder::new(name)
    }

    /// The game key. Part of every session key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_players(&self) -> usize {
        self.min_players
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn accepts_player_count(&self, n: usize) -> bool {
        (self.min_players..=self.max_players).contains(&n)
    }

    pub fn move_names(&self) -> impl Iterator<Item = &str> {
        self.moves.keys().map(String::as_str)
    }

    pub fn move_config(&self, name: &str) -> Option<MoveConfig> {
        self.moves.get(name).map(|m| m.config)
    }

    pub fn start_phase(&self) -> Option<&str> {
        self.start_phase.as_deref()
    }

    pub fn has_phase(&self, name: &str) -> bool {
        self.phases.contains_key(name)
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn enumerator(&self) -> Option<&EnumerateFn<G>> {
        self.enumerate.as_ref()
    }

    /// Runs the game's setup for a fresh context.
    pub fn setup(&self, ctx: &Ctx) -> G {
        match &self.setup {
            Some(setup) => setup(ctx),
            None => G::default(),
        }
    }

    /// `G` as `viewer` may see it. Without a player view this is a clone.
    pub fn player_view(&self, g: &G, ctx: &Ctx, viewer: Option<PlayerId>) -> G {
        match &self.player_view {
            Some(view) => view(g, ctx, viewer),
            None => g.clone(),
        }
    }

    /// A state filtered for `viewer`: payload through the player view and
    /// the deltalog redacted. The input is left untouched.
    pub fn view_state(&self, state: &GameState<G>, viewer: Option<PlayerId>) -> GameState<G> {
        GameState {
            g: self.player_view(&state.g, &state.ctx, viewer),
            ctx: state.ctx.clone(),
            state_id: state.state_id,
            deltalog: state
                .deltalog
                .iter()
                .map(|entry| entry.redacted_for(viewer))
                .collect(),
        }
    }

    pub(crate) fn get_move(&self, name: &str) -> Option<&MoveDef<G>> {
        self.moves.get(name)
    }

    pub(crate) fn phase_config(&self, phase: Option<&str>) -> Option<&PhaseConfig<G>> {
        phase.and_then(|p| self.phases.get(p))
    }

    /// Turn rules in force for `phase`.
    pub(crate) fn turn_config(&self, phase: Option<&str>) -> &TurnConfig<G> {
        self.phase_config(phase)
            .and_then(|p| p.turn.as_ref())
            .unwrap_or(&self.turn)
    }

    pub(crate) fn game_over(&self, g: &G, ctx: &Ctx) -> Option<Value> {
        self.end_if.as_ref().and_then(|end_if| end_if(g, ctx))
    }
}

impl<G> fmt::Debug for GameDefinition<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameDefinition")
            .field("name", &self.name)
            .field("players", &(self.min_players..=self.max_players))
            .field("moves", &self.moves.keys().collect::<Vec<_>>())
            .field("phases", &self.phases.keys().collect::<Vec<_>>())
            .field("start_phase", &self.start_phase)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::StageConfig;
    use serde_json::json;

    fn noop(m: &MoveContext<'_, u32>, _: &[Value]) -> Result<u32, InvalidMove> {
        Ok(*m.g)
    }

    #[test]
    fn test_build_minimal_game_succeeds() {
        let game = GameBuilder::<u32>::new("g").add_move("a", noop).build().unwrap();

        assert_eq!(game.name(), "g");
        assert_eq!(game.move_names().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(game.min_players(), 1);
        assert!(game.accepts_player_count(12));
        assert!(game.start_phase().is_none());
    }

    #[test]
    fn test_build_empty_move_name_fails() {
        let err = GameBuilder::<u32>::new("g").add_move("", noop).build().unwrap_err();
        assert_eq!(err, ConfigError::EmptyMoveName);
    }

    #[test]
    fn test_build_duplicate_move_fails() {
        let err = GameBuilder::<u32>::new("g")
            .add_move("a", noop)
            .add_move("a", noop)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateMove("a".into()));
    }

    #[test]
    fn test_build_reserved_move_name_fails() {
        let err = GameBuilder::<u32>::new("g")
            .add_move("endTurn", noop)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::ReservedMoveName("endTurn".into()));
    }

    #[test]
    fn test_build_unknown_next_phase_fails() {
        let err = GameBuilder::<u32>::new("g")
            .phase("draw", PhaseConfig::new().next("nowhere"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPhase { phase, .. } if phase == "nowhere"));
    }

    #[test]
    fn test_build_two_start_phases_fails() {
        let err = GameBuilder::<u32>::new("g")
            .phase("a", PhaseConfig::new().start())
            .phase("b", PhaseConfig::new().start())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MultipleStartPhases("a".into(), "b".into()));
    }

    #[test]
    fn test_build_duplicate_phase_fails() {
        let err = GameBuilder::<u32>::new("g")
            .phase("a", PhaseConfig::new())
            .phase("a", PhaseConfig::new())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicatePhase("a".into()));
    }

    #[test]
    fn test_build_phase_with_unknown_move_fails() {
        let err = GameBuilder::<u32>::new("g")
            .add_move("a", noop)
            .phase("p", PhaseConfig::new().moves(["b"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMove { name, .. } if name == "b"));
    }

    #[test]
    fn test_build_stage_with_unknown_move_fails() {
        let err = GameBuilder::<u32>::new("g")
            .turn(TurnConfig::new().stage("s", StageConfig::new().moves(["zap"])))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMove { name, .. } if name == "zap"));
    }

    #[test]
    fn test_build_empty_custom_order_fails() {
        let err = GameBuilder::<u32>::new("g")
            .turn(TurnConfig::new().order(TurnOrder::Custom(vec![])))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPlayOrder(_)));
    }

    #[test]
    fn test_build_invalid_player_range_fails() {
        let err = GameBuilder::<u32>::new("g").players(3, 2).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidPlayerRange { min: 3, max: 2 });

        let err = GameBuilder::<u32>::new("g").players(0, 2).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidPlayerRange { min: 0, max: 2 });
    }

    #[test]
    fn test_start_phase_recorded() {
        let game = GameBuilder::<u32>::new("g")
            .phase("main", PhaseConfig::new())
            .phase("draft", PhaseConfig::new().start().next("main"))
            .build()
            .unwrap();

        assert_eq!(game.start_phase(), Some("draft"));
        assert!(game.has_phase("main"));
    }

    #[test]
    fn test_setup_defaults_to_empty_payload() {
        let game = GameBuilder::<Vec<u8>>::new("g").build().unwrap();
        assert!(game.setup(&Ctx::new(2)).is_empty());
    }

    #[test]
    fn test_player_view_defaults_to_identity() {
        let game = GameBuilder::<u32>::new("g").build().unwrap();
        assert_eq!(game.player_view(&7, &Ctx::new(2), None), 7);
    }

    #[test]
    fn test_parse_arg_wrong_type_is_invalid() {
        assert_eq!(parse_arg::<u32>(&[json!("x")], 0), Err(InvalidMove));
    }

    #[test]
    fn test_candidate_into_action() {
        let action = Candidate::move_("clickCell", vec![json!(4)]).into_action(PlayerId(1));
        assert_eq!(action, Action::make_move("clickCell", vec![json!(4)], Some(PlayerId(1))));

        let action = Candidate::event("endTurn", vec![]).into_action(PlayerId(0));
        assert_eq!(action.kind(), "GAME_EVENT");
    }
}
