use std::fmt;
use std::sync::Arc;

use boardforge_core::{EnumerateFn, GameData, GameDefinition};
use boardforge_protocol::{Action, GameState, PlayerId};
use futures_util::future::BoxFuture;

use crate::BotError;

/// What a bot's `play` resolves to: an action to dispatch, or `None` to
/// pass.
pub type BotFuture<'a> = BoxFuture<'a, Result<Option<Action>, BotError>>;

/// A computer player.
///
/// Bots are shared across tasks as `Arc<dyn Bot<G>>`, so the future is
/// boxed. The state is handed over owned: the bot may keep it as long as
/// it likes without holding up the session.
pub trait Bot<G>: Send + Sync {
    fn play(&self, state: GameState<G>, player_id: PlayerId) -> BotFuture<'_>;
}

/// Everything a bot is constructed from.
pub struct BotContext<G> {
    pub game: Arc<GameDefinition<G>>,
    pub enumerate: EnumerateFn<G>,
    /// Seed for deterministic play. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl<G: GameData> BotContext<G> {
    /// Builds a context from the game's enumerator and seed.
    pub fn from_game(game: Arc<GameDefinition<G>>) -> Result<Self, BotError> {
        let enumerate = game
            .enumerator()
            .cloned()
            .ok_or_else(|| BotError::NoEnumerator(game.name().to_string()))?;
        Ok(Self {
            seed: game.seed(),
            enumerate,
            game,
        })
    }
}

impl<G> Clone for BotContext<G> {
    fn clone(&self) -> Self {
        Self {
            game: Arc::clone(&self.game),
            enumerate: Arc::clone(&self.enumerate),
            seed: self.seed,
        }
    }
}

impl<G> fmt::Debug for BotContext<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotContext")
            .field("game", &self.game)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
