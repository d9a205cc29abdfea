use std::sync::Mutex;

use boardforge_core::{EnumerateFn, GameData};
use boardforge_protocol::{Action, GameState, PlayerId};
use futures_util::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Bot, BotContext, BotError, BotFuture};

/// Plays a uniformly random option from the game's enumerator.
///
/// With a seed, the sequence of choices is reproducible for a given
/// sequence of states.
pub struct RandomBot<G> {
    enumerate: EnumerateFn<G>,
    rng: Mutex<StdRng>,
}

impl<G: GameData> RandomBot<G> {
    pub fn new(ctx: BotContext<G>) -> Self {
        let rng = match ctx.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            enumerate: ctx.enumerate,
            rng: Mutex::new(rng),
        }
    }
}

impl<G: GameData> RandomBot<G> {
    fn choose(&self, state: &GameState<G>, player_id: PlayerId) -> Result<Option<Action>, BotError> {
        let mut candidates = (self.enumerate)(&state.g, &state.ctx, player_id);
        if candidates.is_empty() {
            return Ok(None);
        }
        let idx = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| BotError::Failed("rng lock poisoned".into()))?;
            rng.random_range(0..candidates.len())
        };
        let choice = candidates.swap_remove(idx);
        tracing::debug!(player = %player_id, ?choice, "random bot chose");
        Ok(Some(choice.into_action(player_id)))
    }
}

impl<G: GameData> Bot<G> for RandomBot<G> {
    fn play(&self, state: GameState<G>, player_id: PlayerId) -> BotFuture<'_> {
        futures_util::future::ready(self.choose(&state, player_id)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use boardforge_core::{Candidate, GameBuilder, initialize};
    use serde_json::json;

    use super::*;

    fn pick_game(seed: Option<u64>) -> Arc<boardforge_core::GameDefinition<u32>> {
        let mut builder = GameBuilder::<u32>::new("pick")
            .add_move("pick", |_, args| boardforge_core::parse_arg(args, 0))
            .ai(|_, _, _| (0..10).map(|n| Candidate::move_("pick", vec![json!(n)])).collect());
        if let Some(seed) = seed {
            builder = builder.seed(seed);
        }
        Arc::new(builder.build().unwrap())
    }

    async fn choices(bot: &RandomBot<u32>, state: &GameState<u32>, n: usize) -> Vec<Action> {
        let mut out = Vec::new();
        for _ in 0..n {
            out.push(bot.play(state.clone(), PlayerId(0)).await.unwrap().unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_play_returns_enumerated_move() {
        let game = pick_game(None);
        let bot = RandomBot::new(BotContext::from_game(game.clone()).unwrap());
        let state = initialize(&game, 2);

        let action = bot.play(state, PlayerId(0)).await.unwrap().unwrap();

        assert_eq!(action.kind(), "MAKE_MOVE");
        assert_eq!(action.name(), "pick");
        assert_eq!(action.player_id(), Some(PlayerId(0)));
    }

    #[tokio::test]
    async fn test_play_same_seed_same_choices() {
        let game = pick_game(Some(7));
        let state = initialize(&game, 2);
        let a = RandomBot::new(BotContext::from_game(game.clone()).unwrap());
        let b = RandomBot::new(BotContext::from_game(game.clone()).unwrap());

        assert_eq!(choices(&a, &state, 8).await, choices(&b, &state, 8).await);
    }

    #[tokio::test]
    async fn test_play_no_candidates_passes() {
        let game = Arc::new(
            GameBuilder::<u32>::new("stuck")
                .ai(|_, _, _| vec![])
                .build()
                .unwrap(),
        );
        let bot = RandomBot::new(BotContext::from_game(game.clone()).unwrap());

        let action = bot.play(initialize(&game, 2), PlayerId(0)).await.unwrap();

        assert!(action.is_none());
    }

    #[test]
    fn test_context_without_enumerator_fails() {
        let game = Arc::new(GameBuilder::<u32>::new("plain").build().unwrap());
        assert!(matches!(
            BotContext::from_game(game),
            Err(BotError::NoEnumerator(name)) if name == "plain"
        ));
    }
}
