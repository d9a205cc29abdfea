use std::sync::Arc;

use boardforge_protocol::{Action, GameState, LogEntry};

use crate::game::{GameData, GameDefinition};
use crate::initialize::initialize;
use crate::reducer::reduce;

/// The authoritative copy of one match.
///
/// Holds the current state, the state right after setup and the full
/// match log. Every mutation goes through [`reduce`].
#[derive(Debug)]
pub struct Store<G: GameData> {
    game: Arc<GameDefinition<G>>,
    state: GameState<G>,
    initial_state: GameState<G>,
    log: Vec<LogEntry>,
}

impl<G: GameData> Store<G> {
    pub fn new(game: Arc<GameDefinition<G>>, num_players: usize) -> Self {
        let state = initialize(&game, num_players);
        Self {
            game,
            initial_state: state.clone(),
            state,
            log: Vec::new(),
        }
    }

    pub fn game(&self) -> &Arc<GameDefinition<G>> {
        &self.game
    }

    pub fn state(&self) -> &GameState<G> {
        &self.state
    }

    pub fn initial_state(&self) -> &GameState<G> {
        &self.initial_state
    }

    /// Every accepted transition so far, oldest first.
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Runs `action` through the reducer. Returns `true` if it was accepted
    /// and the state advanced.
    pub fn dispatch(&mut self, action: &Action) -> bool {
        let next = reduce(&self.game, &self.state, action);
        if next.state_id == self.state.state_id {
            return false;
        }
        self.log.extend(next.deltalog.iter().cloned());
        self.state = next;
        true
    }
}
