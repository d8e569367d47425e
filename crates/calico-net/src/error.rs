//! Error types for calico-net

/// Result type for calico-net operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in calico-net operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A peer-advertised hostname could not be resolved to an address.
    ///
    /// This is fatal for the current hook pass: silently dropping a
    /// misconfigured peer from the BGP peer list would be worse than a loud
    /// failure.
    #[error("Failed to resolve host {host}: {source}")]
    Resolution {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// Resolution succeeded but returned no addresses
    #[error("Host {host} resolved to no addresses")]
    NoAddresses { host: String },

    /// The configured data-network selector is not a valid CIDR
    #[error("Invalid network CIDR {cidr}: {message}")]
    InvalidCidr { cidr: String, message: String },
}
