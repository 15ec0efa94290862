//! Error types for the provisioning tool
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the provisioning tool
#[derive(Error, Debug)]
pub enum Error {
    /// Identity resolution errors (UID, hostname, addresses, version)
    #[error("identity error: {0}")]
    Identity(String),

    /// DNS update transport or protocol errors
    #[error("DNS update error: {0}")]
    DnsUpdate(String),

    /// The DNS server answered the update with a non-zero response code
    #[error("DNS server refused update: {code}")]
    DnsRefused {
        /// Response code as reported by the server
        code: String,
    },

    /// Inventory database errors (connection, auth, insert)
    #[error("inventory error: {0}")]
    Inventory(String),

    /// The device UID is already present in the inventory
    #[error("device already provisioned: {0}")]
    AlreadyProvisioned(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Network-related errors
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an identity error
    pub fn identity(msg: impl Into<String>) -> Self {
        Self::Identity(msg.into())
    }

    /// Create a DNS update error
    pub fn dns_update(msg: impl Into<String>) -> Self {
        Self::DnsUpdate(msg.into())
    }

    /// Create a DNS refusal error from a response code
    pub fn dns_refused(code: impl Into<String>) -> Self {
        Self::DnsRefused { code: code.into() }
    }

    /// Create an inventory error
    pub fn inventory(msg: impl Into<String>) -> Self {
        Self::Inventory(msg.into())
    }

    /// Create an "already provisioned" error for a device UID
    pub fn already_provisioned(uid: impl Into<String>) -> Self {
        Self::AlreadyProvisioned(uid.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error indicates the device was provisioned before
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::AlreadyProvisioned(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_error_carries_code() {
        let err = Error::dns_refused("REFUSED");
        assert_eq!(err.to_string(), "DNS server refused update: REFUSED");
    }

    #[test]
    fn duplicate_detection() {
        assert!(Error::already_provisioned("abc123").is_duplicate());
        assert!(!Error::inventory("connect failed").is_duplicate());
    }
}
