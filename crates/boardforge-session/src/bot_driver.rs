//! Bot Driver: picks the bot that should move and runs it off the actor.
//!
//! The session owns a single-flight flag. When it is idle and a bot seat
//! may act, the session sets the flag and calls [`spawn_bot_turn`]. The
//! bot runs on its own task and reports back with a
//! `SessionCommand::BotFinished`, which the actor handles like any other
//! command: dispatch, broadcast, release the flag, re-check.

use std::collections::BTreeMap;
use std::sync::Arc;

use boardforge_ai::{Bot, BotError};
use boardforge_core::GameData;
use boardforge_protocol::{GameState, PlayerId};
use tokio::sync::mpsc;

use crate::session::SessionCommand;

/// The bot seat that should move now, if any.
///
/// Nothing moves after gameover. With `activePlayers` set, the lowest bot
/// seat among them is chosen; otherwise the current player, if a bot sits
/// there.
pub fn active_bot_player<G, B>(
    state: &GameState<G>,
    bots: &BTreeMap<PlayerId, B>,
) -> Option<PlayerId> {
    if state.ctx.is_over() {
        return None;
    }
    match &state.ctx.active_players {
        Some(active) => bots.keys().copied().find(|p| active.contains_key(p)),
        None => {
            let current = state.ctx.current_player;
            bots.contains_key(&current).then_some(current)
        }
    }
}

/// Runs `bot` for `player` on a separate task and reports the outcome to
/// the session, if it still exists.
///
/// The bot future runs in an inner task so that a panic inside bot code
/// surfaces as a `JoinError` here instead of killing the reporter.
pub(crate) fn spawn_bot_turn<G: GameData>(
    bot: Arc<dyn Bot<G>>,
    state: GameState<G>,
    player: PlayerId,
    session: mpsc::WeakSender<SessionCommand<G>>,
) {
    let started_at = state.state_id;
    tokio::spawn(async move {
        let inner = tokio::spawn(async move { bot.play(state, player).await });
        let outcome = match inner.await {
            Ok(result) => result,
            Err(err) => Err(BotError::Failed(format!("bot task ended abnormally: {err}"))),
        };

        let Some(session) = session.upgrade() else {
            tracing::debug!(%player, "session gone, dropping bot result");
            return;
        };
        let _ = session
            .send(SessionCommand::BotFinished {
                player,
                started_at,
                outcome,
            })
            .await;
    });
}
