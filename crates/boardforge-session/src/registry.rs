//! Session registry: one authoritative session per key.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use boardforge_ai::{Bot, BotContext};
use boardforge_core::{GameData, GameDefinition};
use boardforge_protocol::{MatchId, PlayerId};
use tokio::sync::Mutex;

use crate::session::spawn_session;
use crate::{LocalConfig, RegistryConfig, SessionError, SessionHandle};

/// Identifies a session: game name, match ID and player count.
///
/// Two connections share state only if all three agree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey {
    pub game: String,
    pub match_id: MatchId,
    pub num_players: usize,
}

impl SessionKey {
    pub fn new(game: impl Into<String>, match_id: MatchId, num_players: usize) -> Self {
        Self {
            game: game.into(),
            match_id,
            num_players,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.game, self.match_id, self.num_players)
    }
}

/// Owns every live session and hands out handles to them.
///
/// Sessions are created lazily by [`get_or_create`](Self::get_or_create)
/// and live until they are evicted. Nothing is dropped behind the
/// caller's back: [`evict`](Self::evict) removes one session,
/// [`evict_idle`](Self::evict_idle) removes all sessions nobody is
/// attached to.
pub struct SessionRegistry<G: GameData> {
    config: RegistryConfig,
    sessions: Mutex<HashMap<SessionKey, SessionHandle<G>>>,
}

impl<G: GameData> SessionRegistry<G> {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns the session for this game, match and player count, creating
    /// it on first use.
    ///
    /// `match_id` defaults to `"default"` and `num_players` to
    /// [`RegistryConfig::default_num_players`]. A new session gets a fresh
    /// store and, when the game has an `ai` enumerator, one bot per seat
    /// listed in `local.bots`.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidPlayerCount`] if the game can't be
    /// played with `num_players` seats.
    pub async fn get_or_create(
        &self,
        game: &Arc<GameDefinition<G>>,
        match_id: Option<MatchId>,
        num_players: Option<usize>,
        local: &LocalConfig<G>,
    ) -> Result<SessionHandle<G>, SessionError> {
        let num_players = num_players.unwrap_or(self.config.default_num_players);
        if !game.accepts_player_count(num_players) {
            return Err(SessionError::InvalidPlayerCount {
                game: game.name().to_string(),
                requested: num_players,
                min: game.min_players(),
                max: game.max_players(),
            });
        }
        let key = SessionKey::new(game.name(), match_id.unwrap_or_default(), num_players);

        let mut sessions = self.sessions.lock().await;
        if let Some(handle) = sessions.get(&key) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
            tracing::debug!(session = %key, "replacing stopped session");
        }

        let bots = build_bots(game, local);
        let handle = spawn_session(key.clone(), Arc::clone(game), bots, self.config.channel_size);
        sessions.insert(key.clone(), handle.clone());
        tracing::info!(session = %key, "session created");
        Ok(handle)
    }

    /// Shuts a session down and forgets it. Returns `false` if there was no
    /// such session.
    pub async fn evict(&self, key: &SessionKey) -> bool {
        let handle = self.sessions.lock().await.remove(key);
        match handle {
            Some(handle) => {
                let _ = handle.shutdown().await;
                tracing::info!(session = %key, "session evicted");
                true
            }
            None => false,
        }
    }

    /// Evicts every session with no attached connections, and every
    /// session whose actor has stopped. Returns how many were removed.
    ///
    /// Sessions are queried without holding the registry lock. A session
    /// replaced in the meantime by [`get_or_create`](Self::get_or_create)
    /// is left alone.
    pub async fn evict_idle(&self) -> usize {
        let snapshot: Vec<(SessionKey, SessionHandle<G>)> = self
            .sessions
            .lock()
            .await
            .iter()
            .map(|(key, handle)| (key.clone(), handle.clone()))
            .collect();

        let mut idle = Vec::new();
        for (key, handle) in snapshot {
            match handle.info().await {
                Ok(info) if info.connections > 0 => {}
                _ => idle.push((key, handle)),
            }
        }

        let mut removed = Vec::new();
        {
            let mut sessions = self.sessions.lock().await;
            for (key, handle) in idle {
                if sessions.get(&key).is_some_and(|h| h.same_session(&handle)) {
                    sessions.remove(&key);
                    removed.push((key, handle));
                }
            }
        }
        for (key, handle) in &removed {
            let _ = handle.shutdown().await;
            tracing::info!(session = %key, "idle session evicted");
        }
        removed.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    pub async fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.lock().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<SessionKey> {
        self.sessions.lock().await.keys().cloned().collect()
    }
}

impl<G: GameData> Default for SessionRegistry<G> {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

fn build_bots<G: GameData>(
    game: &Arc<GameDefinition<G>>,
    local: &LocalConfig<G>,
) -> BTreeMap<PlayerId, Arc<dyn Bot<G>>> {
    if local.bots.is_empty() {
        return BTreeMap::new();
    }
    let ctx = match BotContext::from_game(Arc::clone(game)) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::warn!(game = game.name(), error = %err, "bots configured but unavailable");
            return BTreeMap::new();
        }
    };
    local
        .bots
        .iter()
        .map(|(&player, factory)| (player, factory(ctx.clone())))
        .collect()
}
