use boardforge_protocol::{Ctx, GameState};

use crate::flow;
use crate::game::{GameData, GameDefinition};

/// Builds the state of a new match with `num_players` seats.
///
/// The play order is `0..num_players`, the start phase (if any) is entered,
/// `G` comes from the game's setup and the first turn has begun, so
/// `ctx.turn == 1` and `_stateID == 0`. The player count is not validated
/// here; sessions check it against the game's range before calling this.
pub fn initialize<G: GameData>(game: &GameDefinition<G>, num_players: usize) -> GameState<G> {
    let mut ctx = Ctx::new(num_players);
    ctx.phase = game.start_phase().map(str::to_string);

    let g = game.setup(&ctx);
    let mut state = GameState {
        g,
        ctx,
        state_id: 0,
        deltalog: Vec::new(),
    };

    flow::begin_phase(game, &mut state);
    flow::check_game_over(game, &mut state);
    state
}
