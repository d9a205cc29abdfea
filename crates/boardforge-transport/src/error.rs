use boardforge_session::SessionError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The session could not be created or reached.
    #[error(transparent)]
    Session(#[from] SessionError),
}
