//! Error types for calico-render

use std::path::PathBuf;

/// Result type for calico-render operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in calico-render operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Asked to write a target path nothing registered
    #[error("No config target registered for {path}")]
    UnknownTarget { path: PathBuf },

    /// Writing a rendered target failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Context error from calico-context
    #[error(transparent)]
    Context(#[from] calico_context::Error),

    /// Relation error from calico-relation
    #[error(transparent)]
    Relation(#[from] calico_relation::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
