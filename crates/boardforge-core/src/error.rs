//! Error types for game processing.

/// Problems found while processing a [`GameBuilder`](crate::GameBuilder).
///
/// These are fatal: a game that fails validation never produces a
/// [`GameDefinition`](crate::GameDefinition). Illegal moves at play time
/// are not errors at all; the reducer simply ignores them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("move names must not be empty")]
    EmptyMoveName,

    #[error("move {0} is declared twice")]
    DuplicateMove(String),

    /// A move would shadow a lifecycle event such as `endTurn`.
    #[error("move {0} collides with a reserved event name")]
    ReservedMoveName(String),

    #[error("phase {0} is declared twice")]
    DuplicatePhase(String),

    #[error("{referenced_by} refers to unknown phase {phase}")]
    UnknownPhase { phase: String, referenced_by: String },

    #[error("phases {0} and {1} are both marked as the start phase")]
    MultipleStartPhases(String, String),

    #[error("{referenced_by} refers to unknown move {name}")]
    UnknownMove { name: String, referenced_by: String },

    #[error("custom turn order in {0} has no players")]
    EmptyPlayOrder(String),

    #[error("invalid player range {min}..={max}")]
    InvalidPlayerRange { min: usize, max: usize },
}
