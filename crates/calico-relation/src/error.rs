//! Error types for calico-relation

/// Result type for calico-relation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in calico-relation operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A hook environment tool exited with non-zero status
    #[error("Hook tool {command} failed: {message}")]
    HookTool { command: String, message: String },

    /// A hook environment tool could not be spawned
    #[error("Failed to run hook tool {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Hook tool output was not the JSON shape we expected
    #[error("Unexpected {command} output: {message}")]
    Payload { command: String, message: String },

    /// Address error from calico-net
    #[error(transparent)]
    Net(#[from] calico_net::Error),

    /// JSON deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
