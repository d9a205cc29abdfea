//! Turn and phase transitions.
//!
//! Everything here mutates a freshly cloned state owned by the reducer, so
//! the state passed to `reduce` is never touched.

use boardforge_protocol::{GameState, PlayerId};

use crate::game::{GameData, GameDefinition};
use crate::turn::TurnOrder;

/// Enters the phase named by `state.ctx.phase` and begins its first turn.
pub(crate) fn begin_phase<G: GameData>(game: &GameDefinition<G>, state: &mut GameState<G>) {
    let turn = game.turn_config(state.ctx.phase.as_deref());
    if let TurnOrder::Custom(order) = &turn.order {
        state.ctx.play_order = order.clone();
    }
    let pos = turn.order.first(&state.ctx);
    begin_turn(game, state, pos);
}

/// Starts a new turn for the player at `pos` in the play order.
fn begin_turn<G: GameData>(game: &GameDefinition<G>, state: &mut GameState<G>, pos: usize) {
    let ctx = &mut state.ctx;
    if ctx.play_order.is_empty() {
        return;
    }
    ctx.turn += 1;
    ctx.play_order_pos = pos % ctx.play_order.len();
    ctx.current_player = ctx.play_order[ctx.play_order_pos];
    ctx.num_moves = 0;

    let turn = game.turn_config(ctx.phase.as_deref());
    let active = turn.active_players.as_ref().and_then(|a| a.resolve(ctx));
    ctx.active_players = active;
}

/// Ends the current turn. `next` overrides the turn order when it names a
/// seated player.
pub(crate) fn end_turn<G: GameData>(
    game: &GameDefinition<G>,
    state: &mut GameState<G>,
    next: Option<PlayerId>,
) {
    let explicit = next.and_then(|p| state.ctx.play_order.iter().position(|&q| q == p));
    let pos = match explicit {
        Some(pos) => Some(pos),
        None => game
            .turn_config(state.ctx.phase.as_deref())
            .order
            .next(&state.ctx),
    };

    match pos {
        Some(pos) => begin_turn(game, state, pos),
        None => end_phase(game, state, None),
    }
}

/// Leaves the current phase for `target`, or for the phase's configured
/// `next` when `target` is `None`. `Some(None)` enters the default phase.
pub(crate) fn end_phase<G: GameData>(
    game: &GameDefinition<G>,
    state: &mut GameState<G>,
    target: Option<Option<String>>,
) {
    let next = match target {
        Some(phase) => phase,
        None => game
            .phase_config(state.ctx.phase.as_deref())
            .and_then(|p| p.next.clone()),
    };
    tracing::trace!(from = ?state.ctx.phase, to = ?next, "phase change");
    state.ctx.phase = next;
    begin_phase(game, state);
}

/// Records the result if the game's `end_if` fires.
pub(crate) fn check_game_over<G: GameData>(game: &GameDefinition<G>, state: &mut GameState<G>) {
    if state.ctx.gameover.is_none() {
        state.ctx.gameover = game.game_over(&state.g, &state.ctx);
    }
}

/// Runs the automatic checks that follow a move: game over, then phase
/// end, then turn end.
pub(crate) fn after_move<G: GameData>(game: &GameDefinition<G>, state: &mut GameState<G>) {
    check_game_over(game, state);
    if state.ctx.is_over() {
        return;
    }

    let phase_over = game
        .phase_config(state.ctx.phase.as_deref())
        .and_then(|p| p.end_if.as_ref())
        .is_some_and(|end_if| end_if(&state.g, &state.ctx));
    if phase_over {
        end_phase(game, state, None);
    } else {
        let turn = game.turn_config(state.ctx.phase.as_deref());
        let turn_over = turn.end_if.as_ref().is_some_and(|end_if| end_if(&state.g, &state.ctx))
            || turn.max_moves.is_some_and(|max| state.ctx.num_moves >= max);
        if turn_over {
            end_turn(game, state, None);
        }
    }

    check_game_over(game, state);
}
