use thiserror::Error;

/// Failures reported by the remote game session.
///
/// Every remote action is fire-and-forget from the engine's point of view, so
/// these only describe the dispatch itself being refused or lost. The engine
/// never propagates them out of a processing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The remote side refused the action (bad slot, busy, not allowed).
    #[error("action rejected: {0}")]
    Rejected(String),

    /// The referenced item is no longer where the action expected it.
    #[error("item {0} is not available")]
    ItemUnavailable(u64),

    /// The referenced container is unknown or closed.
    #[error("container {0} is not available")]
    ContainerUnavailable(u64),

    /// Response could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Session is gone (disconnect, zoning, shutdown).
    #[error("session disconnected")]
    Disconnected,
}

/// Errors raised outside the processing path: loading recipe files and
/// world snapshots, validating descriptors.
#[derive(Debug, Error)]
pub enum CraftError {
    /// Wrapper around IO errors (reading recipe or snapshot files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON parse errors.
    #[error("parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A recipe descriptor failed validation.
    #[error("invalid recipe '{name}': {reason}")]
    InvalidRecipe { name: String, reason: String },

    /// Two descriptors share a name.
    #[error("duplicate recipe name: {0}")]
    DuplicateRecipe(String),
}
