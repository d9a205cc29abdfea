//! Client-side consumer of session notices.

use boardforge_protocol::{ChatMessage, GameState, LogEntry, MatchId, TransportData};

/// What [`MatchView::apply`] did with a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A sync replaced the local state.
    Synced,
    /// An update advanced the local state by one.
    Updated,
    /// An update at or behind the local state was dropped.
    Stale,
    /// An update skipped ahead. The view wants a resync.
    Gap { have: Option<u64>, got: u64 },
    Chat,
    /// The notice belongs to another match.
    Ignored,
}

/// The client's picture of one match, built only from notices.
///
/// Syncs always win. Updates apply only when their `_stateID` is exactly
/// one past the local one; anything older is dropped, anything further
/// ahead sets [`needs_resync`](Self::needs_resync).
#[derive(Debug, Clone)]
pub struct MatchView<G> {
    match_id: MatchId,
    state: Option<GameState<G>>,
    initial_state: Option<GameState<G>>,
    log: Vec<LogEntry>,
    chat: Vec<ChatMessage>,
    needs_resync: bool,
}

impl<G> MatchView<G> {
    pub fn new(match_id: MatchId) -> Self {
        Self {
            match_id,
            state: None,
            initial_state: None,
            log: Vec::new(),
            chat: Vec::new(),
            needs_resync: false,
        }
    }

    pub fn apply(&mut self, notice: TransportData<G>) -> Applied {
        if notice.match_id() != &self.match_id {
            return Applied::Ignored;
        }
        match notice {
            TransportData::Sync { info, .. } => {
                self.state = Some(info.state);
                self.initial_state = Some(info.initial_state);
                self.log = info.log;
                self.needs_resync = false;
                Applied::Synced
            }
            TransportData::Update {
                state, deltalog, ..
            } => {
                let have = self.state_id();
                let got = state.state_id;
                match have {
                    Some(have) if got <= have => Applied::Stale,
                    Some(have) if got == have + 1 => {
                        self.log.extend(deltalog);
                        self.state = Some(state);
                        Applied::Updated
                    }
                    _ => {
                        tracing::debug!(match_id = %self.match_id, ?have, got, "update gap");
                        self.needs_resync = true;
                        Applied::Gap { have, got }
                    }
                }
            }
            TransportData::Chat { message, .. } => {
                self.chat.push(message);
                Applied::Chat
            }
        }
    }

    /// Follows another match. Everything held for the old one is dropped.
    pub fn reset(&mut self, match_id: MatchId) {
        *self = Self::new(match_id);
    }

    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    /// The latest state, `None` until the first sync.
    pub fn state(&self) -> Option<&GameState<G>> {
        self.state.as_ref()
    }

    pub fn initial_state(&self) -> Option<&GameState<G>> {
        self.initial_state.as_ref()
    }

    pub fn state_id(&self) -> Option<u64> {
        self.state.as_ref().map(|s| s.state_id)
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }
}
