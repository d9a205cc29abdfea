//! Per-recipient notice construction.
//!
//! Every recipient gets its own freshly built notice: the payload goes
//! through the game's player view and redacted log entries lose their
//! arguments unless the recipient made the move. Nothing here mutates the
//! store, and nothing built for one recipient is shared with another.

use boardforge_core::{GameData, Store};
use boardforge_protocol::{MatchId, PlayerId, SyncInfo, TransportData};

/// A full sync for `viewer` (`None` = spectator).
pub fn sync_for<G: GameData>(
    store: &Store<G>,
    match_id: &MatchId,
    viewer: Option<PlayerId>,
) -> TransportData<G> {
    let game = store.game();
    TransportData::Sync {
        match_id: match_id.clone(),
        info: SyncInfo {
            state: game.view_state(store.state(), viewer),
            log: store
                .log()
                .iter()
                .map(|entry| entry.redacted_for(viewer))
                .collect(),
            initial_state: game.view_state(store.initial_state(), viewer),
        },
    }
}

/// An incremental update for `viewer`: the current state and the deltalog
/// of the last transition, both filtered.
pub fn update_for<G: GameData>(
    store: &Store<G>,
    match_id: &MatchId,
    viewer: Option<PlayerId>,
) -> TransportData<G> {
    let state = store.game().view_state(store.state(), viewer);
    TransportData::Update {
        match_id: match_id.clone(),
        deltalog: state.deltalog.clone(),
        state,
    }
}
