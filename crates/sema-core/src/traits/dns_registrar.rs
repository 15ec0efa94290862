// # DNS Registrar Trait
//
// Defines the interface for adding the device's forward record via a
// dynamic-update request.
//
// ## Single-Shot Rules
//
// Registrars are stateless, single-shot components:
//
// - one update request per `register` call
// - NO retry or backoff logic (there is none anywhere; the sequence fails)
// - a non-zero response code is an error returned to the caller, never a
//   silently logged success path

use async_trait::async_trait;
use std::net::IpAddr;

/// Proof of a successful dynamic update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRegistration {
    /// Fully-qualified name the record was added under
    pub fqdn: String,
    /// Address the record points at
    pub ip: IpAddr,
    /// Time-to-live the record was registered with
    pub ttl: u32,
}

/// Trait for DNS registrar implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsRegistrar: Send + Sync {
    /// Send one dynamic-update request adding a forward record for `host`
    ///
    /// The host is a bare label; the registrar qualifies it with its
    /// configured zone.
    ///
    /// # Returns
    ///
    /// - `Ok(RecordRegistration)`: the server accepted the update (response
    ///   code 0)
    /// - `Err(Error::DnsRefused)`: the server answered with a non-zero
    ///   response code
    /// - `Err(Error)`: transport or protocol failure
    async fn register(
        &self,
        host: &str,
        ip: IpAddr,
    ) -> Result<RecordRegistration, crate::Error>;

    /// Check if this registrar can handle the given host label
    fn supports_host(&self, host: &str) -> bool;

    /// Get the registrar name (for logging/debugging)
    fn registrar_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS registrars from configuration
pub trait DnsRegistrarFactory: Send + Sync {
    /// Create a DnsRegistrar instance from configuration
    fn create(
        &self,
        config: &crate::config::DnsConfig,
    ) -> Result<Box<dyn DnsRegistrar>, crate::Error>;
}
