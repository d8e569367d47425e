//! Error types for calico-context

use std::path::PathBuf;

/// Result type for calico-context operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in calico-context operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credential or rendered-file I/O failed.
    ///
    /// Fatal: a context promising a path whose write failed would make the
    /// downstream render/restart step operate on stale or missing data.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The local etcd proxy could not be queried for its peer list.
    ///
    /// Callers fold this into "zero existing peers"; it exists as a variant
    /// so the fallback is explicit and testable rather than hidden in a
    /// catch-all.
    #[error("Failed to query etcd proxy peers: {message}")]
    ProxyQuery { message: String },

    /// Relation error from calico-relation
    #[error(transparent)]
    Relation(#[from] calico_relation::Error),

    /// Address error from calico-net
    #[error(transparent)]
    Net(#[from] calico_net::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
