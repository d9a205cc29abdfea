//! In-process transport: clients and sessions share one process.

use std::fmt;
use std::sync::Arc;

use boardforge_core::{GameData, GameDefinition};
use boardforge_protocol::{Action, MatchId, PlayerId, TransportData};
use boardforge_session::{
    ConnectionId, LocalConfig, RegistryConfig, SessionHandle, SessionRegistry,
};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{StatusCallback, Transport, TransportError};

/// Per-connection options.
pub struct TransportOpts<G> {
    pub game: Arc<GameDefinition<G>>,
    /// `None` joins the `"default"` match.
    pub match_id: Option<MatchId>,
    /// `None` connects as a spectator.
    pub player_id: Option<PlayerId>,
    pub credentials: Option<String>,
    /// `None` uses the registry's default player count.
    pub num_players: Option<usize>,
}

impl<G> TransportOpts<G> {
    pub fn new(game: Arc<GameDefinition<G>>) -> Self {
        Self {
            game,
            match_id: None,
            player_id: None,
            credentials: None,
            num_players: None,
        }
    }

    pub fn match_id(mut self, match_id: impl Into<MatchId>) -> Self {
        self.match_id = Some(match_id.into());
        self
    }

    pub fn player(mut self, player_id: PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    pub fn credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    pub fn num_players(mut self, n: usize) -> Self {
        self.num_players = Some(n);
        self
    }
}

/// Creates [`LocalTransport`]s that share one session registry.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use boardforge_core::GameBuilder;
/// # use boardforge_protocol::PlayerId;
/// # use boardforge_session::LocalConfig;
/// # use boardforge_transport::{Local, Transport, TransportOpts};
/// # async fn demo() -> Result<(), boardforge_transport::TransportError> {
/// let game = Arc::new(GameBuilder::<u32>::new("counter").build().unwrap());
/// let local = Local::new(LocalConfig::default());
///
/// let (mut client, mut notices) = local.transport(TransportOpts::new(game).player(PlayerId(0)));
/// client.connect().await?;
/// let sync = notices.recv().await;
/// # Ok(())
/// # }
/// ```
pub struct Local<G: GameData> {
    registry: Arc<SessionRegistry<G>>,
    config: LocalConfig<G>,
}

impl<G: GameData> Local<G> {
    /// A factory with its own registry using default settings.
    pub fn new(config: LocalConfig<G>) -> Self {
        Self::with_registry(Arc::new(SessionRegistry::new(RegistryConfig::default())), config)
    }

    pub fn with_registry(registry: Arc<SessionRegistry<G>>, config: LocalConfig<G>) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<G>> {
        &self.registry
    }

    /// Creates a disconnected transport and the receiver its notices
    /// arrive on.
    pub fn transport(
        &self,
        opts: TransportOpts<G>,
    ) -> (LocalTransport<G>, mpsc::UnboundedReceiver<TransportData<G>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = LocalTransport {
            id: ConnectionId::next(),
            game: opts.game,
            registry: Arc::clone(&self.registry),
            local: self.config.clone(),
            match_id: opts.match_id.unwrap_or_default(),
            player_id: opts.player_id,
            credentials: opts.credentials,
            num_players: opts.num_players,
            session: None,
            connected: false,
            status: None,
            notices: tx,
        };
        (transport, rx)
    }
}

/// A client connection to a session in the same process.
pub struct LocalTransport<G: GameData> {
    id: ConnectionId,
    game: Arc<GameDefinition<G>>,
    registry: Arc<SessionRegistry<G>>,
    local: LocalConfig<G>,
    match_id: MatchId,
    player_id: Option<PlayerId>,
    credentials: Option<String>,
    num_players: Option<usize>,
    /// Resolved lazily on first connect and dropped on match change.
    session: Option<SessionHandle<G>>,
    connected: bool,
    status: Option<StatusCallback>,
    notices: mpsc::UnboundedSender<TransportData<G>>,
}

impl<G: GameData> LocalTransport<G> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    pub fn credentials(&self) -> Option<&str> {
        self.credentials.as_deref()
    }

    /// The session this transport is bound to, if resolved.
    pub fn session(&self) -> Option<&SessionHandle<G>> {
        self.session.as_ref()
    }

    async fn resolve_session(&mut self) -> Result<SessionHandle<G>, TransportError> {
        if let Some(session) = &self.session {
            if !session.is_closed() {
                return Ok(session.clone());
            }
        }
        let session = self
            .registry
            .get_or_create(
                &self.game,
                Some(self.match_id.clone()),
                self.num_players,
                &self.local,
            )
            .await?;
        self.session = Some(session.clone());
        Ok(session)
    }

    fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        if let Some(callback) = &self.status {
            callback(connected);
        }
    }

    /// The bound session, but only while connected.
    fn live_session(&self) -> Option<&SessionHandle<G>> {
        self.session.as_ref().filter(|_| self.connected)
    }
}

impl<G: GameData> Transport for LocalTransport<G> {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let session = self.resolve_session().await?;
        session
            .attach(self.id, self.player_id, self.notices.clone())
            .await?;
        tracing::debug!(
            conn = %self.id,
            session = %session.key(),
            player = ?self.player_id,
            "transport connected"
        );
        self.set_connected(true);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(session) = self.live_session() {
            if let Err(err) = session.detach(self.id).await {
                tracing::debug!(conn = %self.id, error = %err, "detach failed");
            }
        }
        tracing::debug!(conn = %self.id, "transport disconnected");
        self.set_connected(false);
    }

    async fn send_action(&mut self, action: Action) {
        let Some(session) = self.live_session() else {
            tracing::debug!(conn = %self.id, name = action.name(), "not connected, dropping action");
            return;
        };
        let mut action = action.with_credentials(self.credentials.clone());
        action.payload_mut().player_id = self.player_id;
        if let Err(err) = session.dispatch(self.id, action).await {
            tracing::warn!(conn = %self.id, error = %err, "dispatch failed");
        }
    }

    async fn send_chat_message(&mut self, payload: Value) {
        let Some(session) = self.live_session() else {
            return;
        };
        if let Err(err) = session.chat(self.id, payload).await {
            tracing::warn!(conn = %self.id, error = %err, "chat failed");
        }
    }

    async fn request_sync(&mut self) {
        let Some(session) = self.live_session() else {
            return;
        };
        if let Err(err) = session.request_sync(self.id).await {
            tracing::warn!(conn = %self.id, error = %err, "sync request failed");
        }
    }

    async fn update_match_id(&mut self, match_id: MatchId) -> Result<(), TransportError> {
        if self.match_id == match_id {
            return Ok(());
        }
        if let Some(session) = self.session.take() {
            if self.connected {
                if let Err(err) = session.detach(self.id).await {
                    tracing::debug!(conn = %self.id, error = %err, "detach failed");
                }
            }
        }
        tracing::debug!(conn = %self.id, from = %self.match_id, to = %match_id, "match changed");
        self.match_id = match_id;

        if self.connected {
            if let Err(err) = self.connect().await {
                self.set_connected(false);
                return Err(err);
            }
        }
        Ok(())
    }

    async fn update_player_id(&mut self, player_id: Option<PlayerId>) {
        self.player_id = player_id;
        let Some(session) = self.live_session() else {
            return;
        };
        if let Err(err) = session.update_player(self.id, player_id).await {
            tracing::warn!(conn = %self.id, error = %err, "player update failed");
        }
    }

    fn update_credentials(&mut self, credentials: Option<String>) {
        self.credentials = credentials;
    }

    fn subscribe_to_connection_status(&mut self, callback: StatusCallback) {
        self.status = Some(callback);
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Detaches from the session when a connected transport is dropped.
///
/// `Drop` is synchronous, so the detach runs on a fire-and-forget task.
/// Outside a Tokio runtime nothing is sent; the session forgets the
/// connection once its receiver is gone.
impl<G: GameData> Drop for LocalTransport<G> {
    fn drop(&mut self) {
        let Some(session) = self.live_session().cloned() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let conn = self.id;
        runtime.spawn(async move {
            if let Err(err) = session.detach(conn).await {
                tracing::debug!(%conn, error = %err, "detach on drop failed");
            }
        });
    }
}

impl<G: GameData> fmt::Debug for LocalTransport<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTransport")
            .field("id", &self.id)
            .field("match_id", &self.match_id)
            .field("player_id", &self.player_id)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}
