//! Error types for calico-hooks

/// Result type for calico-hooks operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while executing a hook
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An imperative action's subprocess failed
    #[error("Action {command} failed: {message}")]
    Action { command: String, message: String },

    /// Hook environment state we depend on is missing or malformed
    #[error("Hook environment error: {message}")]
    Environment { message: String },

    /// Relation error from calico-relation
    #[error(transparent)]
    Relation(#[from] calico_relation::Error),

    /// Context error from calico-context
    #[error(transparent)]
    Context(#[from] calico_context::Error),

    /// Render error from calico-render
    #[error(transparent)]
    Render(#[from] calico_render::Error),

    /// Address error from calico-net
    #[error(transparent)]
    Net(#[from] calico_net::Error),

    /// JSON deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
