//! A non-networked client that owns its own [`Store`].
//!
//! Useful for hot-seat play, tests and tools. Actions are reduced in
//! place; there is no session, transport or bot driver involved.

use std::sync::Arc;

use boardforge_protocol::{Action, GameState, LogEntry, PlayerId};
use serde_json::Value;

use crate::game::{GameData, GameDefinition};
use crate::store::Store;

/// A local game client.
///
/// In single-player mode (the default) an action without a `playerID` is
/// made on behalf of `ctx.currentPlayer`, so one client can play every
/// seat. With [`multiplayer`](Self::multiplayer) set the client never
/// fills in an identity: actions carry the configured player or nothing,
/// and the reducer rejects the latter.
///
/// ```
/// # use std::sync::Arc;
/// # use boardforge_core::{GameBuilder, LocalClient};
/// let game = GameBuilder::<u32>::new("counter")
///     .add_move("inc", |m, _| Ok(*m.g + 1))
///     .build()
///     .unwrap();
/// let mut client = LocalClient::new(Arc::new(game), 2);
///
/// assert!(client.make_move("inc", vec![]));
/// assert_eq!(client.state().g, 1);
/// ```
#[derive(Debug)]
pub struct LocalClient<G: GameData> {
    store: Store<G>,
    player_id: Option<PlayerId>,
    credentials: Option<String>,
    multiplayer: bool,
}

impl<G: GameData> LocalClient<G> {
    pub fn new(game: Arc<GameDefinition<G>>, num_players: usize) -> Self {
        Self {
            store: Store::new(game, num_players),
            player_id: None,
            credentials: None,
            multiplayer: false,
        }
    }

    /// Plays as `player_id`. Also the viewer for [`state`](Self::state).
    pub fn player(mut self, player_id: PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    pub fn credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    pub fn multiplayer(mut self, multiplayer: bool) -> Self {
        self.multiplayer = multiplayer;
        self
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    pub fn update_player_id(&mut self, player_id: Option<PlayerId>) {
        self.player_id = player_id;
    }

    pub fn is_multiplayer(&self) -> bool {
        self.multiplayer
    }

    pub fn game(&self) -> &Arc<GameDefinition<G>> {
        self.store.game()
    }

    /// The underlying store, unfiltered.
    pub fn store(&self) -> &Store<G> {
        &self.store
    }

    /// The current state as this client's player sees it.
    pub fn state(&self) -> GameState<G> {
        self.store
            .game()
            .view_state(self.store.state(), self.player_id)
    }

    pub fn initial_state(&self) -> GameState<G> {
        self.store
            .game()
            .view_state(self.store.initial_state(), self.player_id)
    }

    /// The match log, with redacted moves of other players stripped.
    pub fn log(&self) -> Vec<LogEntry> {
        self.store
            .log()
            .iter()
            .map(|entry| entry.redacted_for(self.player_id))
            .collect()
    }

    /// Dispatches move `name`. Returns `true` if the state advanced.
    pub fn make_move(&mut self, name: &str, args: Vec<Value>) -> bool {
        let action = self.move_action(name, args);
        self.store.dispatch(&action)
    }

    /// Dispatches lifecycle event `name` (`endTurn`, `setPhase`, ...).
    pub fn event(&mut self, name: &str, args: Vec<Value>) -> bool {
        let action = self.event_action(name, args);
        self.store.dispatch(&action)
    }

    /// Dispatches a prebuilt action. A missing `playerID` is resolved the
    /// same way as for [`make_move`](Self::make_move).
    pub fn dispatch(&mut self, mut action: Action) -> bool {
        let player_id = self.resolve_player(action.player_id());
        action.payload_mut().player_id = player_id;
        if action.payload().credentials.is_none() {
            action = action.with_credentials(self.credentials.clone());
        }
        self.store.dispatch(&action)
    }

    /// The action [`make_move`](Self::make_move) would dispatch right now.
    pub fn move_action(&self, name: &str, args: Vec<Value>) -> Action {
        Action::make_move(name, args, self.resolve_player(self.player_id))
            .with_credentials(self.credentials.clone())
    }

    /// The action [`event`](Self::event) would dispatch right now.
    pub fn event_action(&self, name: &str, args: Vec<Value>) -> Action {
        Action::game_event(name, args, self.resolve_player(self.player_id))
            .with_credentials(self.credentials.clone())
    }

    fn resolve_player(&self, player_id: Option<PlayerId>) -> Option<PlayerId> {
        match player_id {
            Some(player) => Some(player),
            None if self.multiplayer => None,
            None => Some(self.store.state().ctx.current_player),
        }
    }
}
