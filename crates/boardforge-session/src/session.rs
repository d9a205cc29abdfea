//! Session actor: an isolated Tokio task that owns one match.
//!
//! The actor owns the authoritative [`Store`], the attached connections and
//! the bots. The outside world talks to it only through a
//! [`SessionHandle`], so every dispatch is applied in arrival order.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use boardforge_ai::{Bot, BotError};
use boardforge_core::{GameData, GameDefinition, Store};
use boardforge_protocol::{
    Action, ChatMessage, GameState, MatchId, PlayerId, TransportData,
};
use rand::Rng;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::bot_driver::{active_bot_player, spawn_bot_turn};
use crate::sync::sync_for;
use crate::{SessionError, SessionKey};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one attached connection within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Allocates a fresh, process-unique ID.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Channel a session pushes notices into for one connection.
pub type NoticeSender<G> = mpsc::UnboundedSender<TransportData<G>>;

/// Commands sent to a session actor through its channel.
///
/// Variants carrying a `oneshot::Sender` reply once the command has been
/// fully handled, including any broadcast it caused.
pub(crate) enum SessionCommand<G> {
    Attach {
        conn: ConnectionId,
        player_id: Option<PlayerId>,
        sender: NoticeSender<G>,
        reply: oneshot::Sender<()>,
    },

    Detach {
        conn: ConnectionId,
        reply: oneshot::Sender<()>,
    },

    /// Replies `true` if the action was accepted by the reducer.
    Dispatch {
        conn: ConnectionId,
        action: Action,
        reply: oneshot::Sender<bool>,
    },

    RequestSync {
        conn: ConnectionId,
    },

    UpdatePlayer {
        conn: ConnectionId,
        player_id: Option<PlayerId>,
        reply: oneshot::Sender<()>,
    },

    Chat {
        conn: ConnectionId,
        payload: Value,
    },

    /// A bot started at `started_at` has finished.
    BotFinished {
        player: PlayerId,
        started_at: u64,
        outcome: Result<Option<Action>, BotError>,
    },

    GetInfo {
        reply: oneshot::Sender<SessionInfo>,
    },

    GetState {
        reply: oneshot::Sender<GameState<G>>,
    },

    Shutdown,
}

/// A snapshot of session metadata (not the game state itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub key: SessionKey,
    /// Connections currently attached, players and spectators alike.
    pub connections: usize,
    pub state_id: u64,
    pub gameover: bool,
    /// Whether a bot computation is in flight.
    pub bot_running: bool,
}

/// Handle to a running session actor.
///
/// Cheap to clone: it's an `mpsc::Sender` wrapper. The actor stops when
/// every handle is dropped or [`shutdown`](Self::shutdown) is called.
pub struct SessionHandle<G> {
    key: SessionKey,
    sender: mpsc::Sender<SessionCommand<G>>,
}

impl<G> Clone for SessionHandle<G> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<G> fmt::Debug for SessionHandle<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<G: GameData> SessionHandle<G> {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Returns `true` if both handles talk to the same actor.
    pub fn same_session(&self, other: &Self) -> bool {
        self.sender.same_channel(&other.sender)
    }

    fn unavailable(&self) -> SessionError {
        SessionError::Unavailable(self.key.clone())
    }

    async fn send(&self, cmd: SessionCommand<G>) -> Result<(), SessionError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    /// Attaches a connection. The session answers with a full sync on
    /// `sender` before this returns, then checks whether a bot should move.
    pub async fn attach(
        &self,
        conn: ConnectionId,
        player_id: Option<PlayerId>,
        sender: NoticeSender<G>,
    ) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Attach {
            conn,
            player_id,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn detach(&self, conn: ConnectionId) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Detach {
            conn,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Dispatches `action` on behalf of `conn` and waits until the
    /// resulting syncs have been sent. Returns whether it was accepted.
    ///
    /// The acting player is always the one `conn` is attached as; a
    /// `playerID` inside the action is overwritten. Actions from
    /// connections that aren't attached are ignored.
    pub async fn dispatch(&self, conn: ConnectionId, action: Action) -> Result<bool, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Dispatch {
            conn,
            action,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Asks for a fresh sync to `conn` only (fire-and-forget).
    pub async fn request_sync(&self, conn: ConnectionId) -> Result<(), SessionError> {
        self.send(SessionCommand::RequestSync { conn }).await
    }

    /// Rebinds `conn` to another seat (or to spectating) and pushes it a
    /// fresh sync.
    pub async fn update_player(
        &self,
        conn: ConnectionId,
        player_id: Option<PlayerId>,
    ) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::UpdatePlayer {
            conn,
            player_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Relays a chat payload to every attached connection (fire-and-forget).
    pub async fn chat(&self, conn: ConnectionId, payload: Value) -> Result<(), SessionError> {
        self.send(SessionCommand::Chat { conn, payload }).await
    }

    pub async fn info(&self) -> Result<SessionInfo, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// The full, unfiltered authoritative state.
    pub async fn state(&self) -> Result<GameState<G>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::GetState { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }
}

struct Attachment<G> {
    player_id: Option<PlayerId>,
    sender: NoticeSender<G>,
}

/// The internal session actor state. Runs inside a Tokio task.
struct SessionActor<G: GameData> {
    key: SessionKey,
    store: Store<G>,
    connections: BTreeMap<ConnectionId, Attachment<G>>,
    bots: BTreeMap<PlayerId, Arc<dyn Bot<G>>>,
    /// Single-flight guard: at most one bot computation at a time.
    bot_running: bool,
    /// Weak, so that dropping every handle still ends the actor.
    self_sender: mpsc::WeakSender<SessionCommand<G>>,
    receiver: mpsc::Receiver<SessionCommand<G>>,
}

impl<G: GameData> SessionActor<G> {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(session = %self.key, bots = self.bots.len(), "session actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                SessionCommand::Attach {
                    conn,
                    player_id,
                    sender,
                    reply,
                } => {
                    self.handle_attach(conn, player_id, sender);
                    let _ = reply.send(());
                    self.check_bots();
                }
                SessionCommand::Detach { conn, reply } => {
                    self.handle_detach(conn);
                    let _ = reply.send(());
                }
                SessionCommand::Dispatch {
                    conn,
                    action,
                    reply,
                } => {
                    let accepted = self.handle_dispatch(conn, action);
                    let _ = reply.send(accepted);
                    if accepted {
                        self.check_bots();
                    }
                }
                SessionCommand::RequestSync { conn } => {
                    self.sync_connection(conn);
                }
                SessionCommand::UpdatePlayer {
                    conn,
                    player_id,
                    reply,
                } => {
                    self.handle_update_player(conn, player_id);
                    let _ = reply.send(());
                }
                SessionCommand::Chat { conn, payload } => {
                    self.handle_chat(conn, payload);
                }
                SessionCommand::BotFinished {
                    player,
                    started_at,
                    outcome,
                } => {
                    self.handle_bot_finished(player, started_at, outcome);
                }
                SessionCommand::GetInfo { reply } => {
                    self.reap_closed();
                    let _ = reply.send(self.info());
                }
                SessionCommand::GetState { reply } => {
                    let _ = reply.send(self.store.state().clone());
                }
                SessionCommand::Shutdown => {
                    tracing::info!(session = %self.key, "session shutting down");
                    break;
                }
            }
        }

        tracing::info!(session = %self.key, "session actor stopped");
    }

    fn handle_attach(
        &mut self,
        conn: ConnectionId,
        player_id: Option<PlayerId>,
        sender: NoticeSender<G>,
    ) {
        self.connections
            .insert(conn, Attachment { player_id, sender });
        tracing::info!(
            session = %self.key,
            %conn,
            player = ?player_id,
            connections = self.connections.len(),
            "connection attached"
        );
        self.sync_connection(conn);
    }

    fn handle_detach(&mut self, conn: ConnectionId) {
        if self.connections.remove(&conn).is_some() {
            tracing::info!(
                session = %self.key,
                %conn,
                connections = self.connections.len(),
                "connection detached"
            );
        }
    }

    fn handle_dispatch(&mut self, conn: ConnectionId, mut action: Action) -> bool {
        let Some(attachment) = self.connections.get(&conn) else {
            tracing::debug!(session = %self.key, %conn, "action from detached connection, ignoring");
            return false;
        };
        action.payload_mut().player_id = attachment.player_id;
        self.apply(action)
    }

    /// Runs `action` through the store and sends every attached connection
    /// a fresh sync, whether or not the reducer accepted it.
    fn apply(&mut self, action: Action) -> bool {
        let accepted = self.store.dispatch(&action);
        tracing::debug!(
            session = %self.key,
            kind = action.kind(),
            name = action.name(),
            player = ?action.player_id(),
            state_id = self.store.state().state_id,
            accepted,
            "action dispatched"
        );
        self.broadcast_sync();
        accepted
    }

    fn handle_update_player(&mut self, conn: ConnectionId, player_id: Option<PlayerId>) {
        let Some(attachment) = self.connections.get_mut(&conn) else {
            return;
        };
        attachment.player_id = player_id;
        tracing::debug!(session = %self.key, %conn, player = ?player_id, "player rebound");
        self.sync_connection(conn);
    }

    fn handle_chat(&mut self, conn: ConnectionId, payload: Value) {
        let Some(attachment) = self.connections.get(&conn) else {
            return;
        };
        let notice = TransportData::Chat {
            match_id: self.key.match_id.clone(),
            message: ChatMessage {
                id: generate_message_id(),
                sender: attachment.player_id,
                payload,
            },
        };
        let dead: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, attachment)| attachment.sender.send(notice.clone()).is_err())
            .map(|(conn, _)| *conn)
            .collect();
        self.reap(dead);
    }

    fn handle_bot_finished(
        &mut self,
        player: PlayerId,
        started_at: u64,
        outcome: Result<Option<Action>, BotError>,
    ) {
        match outcome {
            Ok(Some(mut action)) => {
                action.payload_mut().player_id = Some(player);
                if !self.apply(action) {
                    tracing::debug!(session = %self.key, %player, "bot action rejected");
                }
            }
            Ok(None) => {
                tracing::debug!(session = %self.key, %player, "bot passed");
            }
            Err(err) => {
                tracing::warn!(session = %self.key, %player, error = %err, "bot failed");
            }
        }

        self.bot_running = false;
        if self.store.state().state_id != started_at {
            self.check_bots();
        }
    }

    /// Starts a bot if one should move and none is running.
    fn check_bots(&mut self) {
        if self.bot_running {
            return;
        }
        let state = self.store.state();
        let Some(player) = active_bot_player(state, &self.bots) else {
            return;
        };
        let Some(bot) = self.bots.get(&player).cloned() else {
            return;
        };

        self.bot_running = true;
        tracing::debug!(
            session = %self.key,
            %player,
            state_id = state.state_id,
            "bot turn started"
        );
        spawn_bot_turn(bot, state.clone(), player, self.self_sender.clone());
    }

    fn broadcast_sync(&mut self) {
        let dead: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, attachment)| !self.send_to(attachment))
            .map(|(conn, _)| *conn)
            .collect();
        self.reap(dead);
    }

    fn sync_connection(&mut self, conn: ConnectionId) {
        let delivered = match self.connections.get(&conn) {
            Some(attachment) => self.send_to(attachment),
            None => return,
        };
        if !delivered {
            self.reap([conn]);
        }
    }

    /// Builds and sends a sync for one connection. Returns `false` if the
    /// receiver is gone; the view isn't built in that case.
    fn send_to(&self, attachment: &Attachment<G>) -> bool {
        if attachment.sender.is_closed() {
            return false;
        }
        let notice = sync_for(&self.store, &self.key.match_id, attachment.player_id);
        attachment.sender.send(notice).is_ok()
    }

    /// Forgets connections whose receiver was dropped without detaching.
    fn reap(&mut self, dead: impl IntoIterator<Item = ConnectionId>) {
        for conn in dead {
            if self.connections.remove(&conn).is_some() {
                tracing::info!(
                    session = %self.key,
                    %conn,
                    connections = self.connections.len(),
                    "connection dropped"
                );
            }
        }
    }

    fn reap_closed(&mut self) {
        let dead: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, attachment)| attachment.sender.is_closed())
            .map(|(conn, _)| *conn)
            .collect();
        self.reap(dead);
    }

    fn info(&self) -> SessionInfo {
        let state = self.store.state();
        SessionInfo {
            key: self.key.clone(),
            connections: self.connections.len(),
            state_id: state.state_id,
            gameover: state.ctx.is_over(),
            bot_running: self.bot_running,
        }
    }
}

/// Spawns a new session actor task and returns a handle to it.
pub(crate) fn spawn_session<G: GameData>(
    key: SessionKey,
    game: Arc<GameDefinition<G>>,
    bots: BTreeMap<PlayerId, Arc<dyn Bot<G>>>,
    channel_size: usize,
) -> SessionHandle<G> {
    let (tx, rx) = mpsc::channel(channel_size);
    let store = Store::new(game, key.num_players);

    let actor = SessionActor {
        key: key.clone(),
        store,
        connections: BTreeMap::new(),
        bots,
        bot_running: false,
        self_sender: tx.downgrade(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    SessionHandle { key, sender: tx }
}

/// Generates a random 16-character hex ID for a chat message.
fn generate_message_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
