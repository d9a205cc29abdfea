//! Registry and local-play configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use boardforge_ai::{Bot, BotContext};
use boardforge_protocol::PlayerId;

/// Default command channel size for session actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Settings shared by every session a registry creates.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Player count used when a connection doesn't ask for one.
    pub default_num_players: usize,

    /// Bounded command channel size per session actor. When it fills up,
    /// callers wait.
    pub channel_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_num_players: 2,
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }
}

/// Builds a bot for one seat when its session is created.
pub type BotFactory<G> = Arc<dyn Fn(BotContext<G>) -> Arc<dyn Bot<G>> + Send + Sync>;

/// Per-transport options for locally hosted matches.
pub struct LocalConfig<G> {
    /// Seats played by bots. Only honoured when the game declares an `ai`
    /// enumerator.
    pub bots: BTreeMap<PlayerId, BotFactory<G>>,
}

impl<G> LocalConfig<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts a bot built by `factory` in `player`'s seat.
    pub fn bot<F>(mut self, player: PlayerId, factory: F) -> Self
    where
        F: Fn(BotContext<G>) -> Arc<dyn Bot<G>> + Send + Sync + 'static,
    {
        self.bots.insert(player, Arc::new(factory));
        self
    }
}

impl<G> Default for LocalConfig<G> {
    fn default() -> Self {
        Self {
            bots: BTreeMap::new(),
        }
    }
}

impl<G> Clone for LocalConfig<G> {
    fn clone(&self) -> Self {
        Self {
            bots: self.bots.clone(),
        }
    }
}

impl<G> fmt::Debug for LocalConfig<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalConfig")
            .field("bots", &self.bots.keys().collect::<Vec<_>>())
            .finish()
    }
}
