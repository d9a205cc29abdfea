//! The pure state reducer.
//!
//! `reduce` never fails: anything illegal or malformed comes back as an
//! unchanged clone of the input, so callers can dispatch blindly and
//! compare `_stateID`s to learn whether something happened.

use std::collections::BTreeMap;

use boardforge_protocol::{Action, ActionPayload, GameState, LogEntry, PlayerId};
use serde_json::Value;

use crate::flow;
use crate::game::{GameData, GameDefinition, MoveContext, parse_arg};
use crate::turn::ActivePlayers;

/// Lifecycle events understood by the reducer. Moves may not use these names.
pub const EVENTS: [&str; 7] = [
    "endTurn",
    "endPhase",
    "setPhase",
    "endGame",
    "setActivePlayers",
    "endStage",
    "setStage",
];

/// Applies `action` to `state`, returning the next state.
///
/// Deterministic: the same inputs always produce the same output. The
/// player view is never applied here; the result is the full state.
pub fn reduce<G: GameData>(
    game: &GameDefinition<G>,
    state: &GameState<G>,
    action: &Action,
) -> GameState<G> {
    match apply(game, state, action) {
        Some(next) => next,
        None => {
            tracing::trace!(
                kind = action.kind(),
                name = action.name(),
                player = ?action.player_id(),
                state_id = state.state_id,
                "action rejected"
            );
            state.clone()
        }
    }
}

fn apply<G: GameData>(
    game: &GameDefinition<G>,
    state: &GameState<G>,
    action: &Action,
) -> Option<GameState<G>> {
    if state.ctx.is_over() {
        return None;
    }
    let player = action.player_id()?;
    if !state.ctx.can_act(player) {
        return None;
    }

    match action {
        Action::MakeMove(payload) => {
            let (g, redact) = apply_move(game, state, player, payload)?;
            let mut next = GameState {
                g,
                ctx: state.ctx.clone(),
                state_id: state.state_id + 1,
                deltalog: vec![log_entry(state, action, redact)],
            };
            next.ctx.num_moves += 1;
            flow::after_move(game, &mut next);
            Some(next)
        }
        Action::GameEvent(payload) => {
            let mut next = GameState {
                g: state.g.clone(),
                ctx: state.ctx.clone(),
                state_id: state.state_id + 1,
                deltalog: vec![log_entry(state, action, false)],
            };
            apply_event(game, &mut next, player, payload)?;
            flow::check_game_over(game, &mut next);
            Some(next)
        }
    }
}

/// The log entry for `action` applied to `state`. Credentials never reach
/// the log.
fn log_entry<G>(state: &GameState<G>, action: &Action, redact: bool) -> LogEntry {
    LogEntry {
        action: action.clone().with_credentials(None),
        state_id: state.state_id,
        turn: state.ctx.turn,
        phase: state.ctx.phase.clone(),
        redact,
    }
}

fn apply_move<G: GameData>(
    game: &GameDefinition<G>,
    state: &GameState<G>,
    player: PlayerId,
    payload: &ActionPayload,
) -> Option<(G, bool)> {
    let def = game.get_move(&payload.name)?;
    let phase = state.ctx.phase.as_deref();

    let phase_moves = game.phase_config(phase).and_then(|p| p.moves.as_ref());
    if phase_moves.is_some_and(|allowed| !allowed.contains(&payload.name)) {
        return None;
    }

    let stage_moves = state
        .ctx
        .stage_of(player)
        .and_then(|stage| game.turn_config(phase).stages.get(stage))
        .and_then(|stage| stage.moves.as_ref());
    if stage_moves.is_some_and(|allowed| !allowed.contains(&payload.name)) {
        return None;
    }

    let ctx = MoveContext {
        g: &state.g,
        ctx: &state.ctx,
        player_id: player,
    };
    let g = (def.apply)(&ctx, &payload.args).ok()?;
    Some((g, def.config.redact))
}

fn apply_event<G: GameData>(
    game: &GameDefinition<G>,
    state: &mut GameState<G>,
    player: PlayerId,
    payload: &ActionPayload,
) -> Option<()> {
    let args = &payload.args;
    match payload.name.as_str() {
        "endTurn" => {
            let min_moves = game.turn_config(state.ctx.phase.as_deref()).min_moves;
            if min_moves.is_some_and(|min| state.ctx.num_moves < min) {
                return None;
            }
            let next = args
                .first()
                .and_then(|arg| arg.get("next"))
                .and_then(player_arg);
            flow::end_turn(game, state, next);
        }
        "endPhase" => flow::end_phase(game, state, None),
        "setPhase" => {
            let phase: String = parse_arg(args, 0).ok()?;
            if !game.has_phase(&phase) {
                return None;
            }
            flow::end_phase(game, state, Some(Some(phase)));
        }
        "endGame" => {
            let result = args
                .first()
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::Bool(true));
            state.ctx.gameover = Some(result);
        }
        "setActivePlayers" => {
            let config: ActivePlayers = parse_arg(args, 0).ok()?;
            state.ctx.active_players = config.resolve(&state.ctx);
        }
        "endStage" => {
            let stage = state.ctx.stage_of(player)?.to_string();
            let next = game
                .turn_config(state.ctx.phase.as_deref())
                .stages
                .get(&stage)
                .and_then(|s| s.next.clone());
            let active = state.ctx.active_players.as_mut()?;
            match next {
                Some(next) => {
                    active.insert(player, next);
                }
                None => {
                    active.remove(&player);
                }
            }
            if active.is_empty() {
                state.ctx.active_players = None;
            }
        }
        "setStage" => {
            let stage: String = parse_arg(args, 0).ok()?;
            state
                .ctx
                .active_players
                .get_or_insert_with(BTreeMap::new)
                .insert(player, stage);
        }
        _ => return None,
    }
    Some(())
}

/// Accepts a player as `1` or `"1"`.
fn player_arg(value: &Value) -> Option<PlayerId> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).map(PlayerId),
        Value::String(s) => s.parse().ok().map(PlayerId),
        _ => None,
    }
}
