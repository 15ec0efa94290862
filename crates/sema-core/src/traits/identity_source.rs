// # Identity Source Trait
//
// Defines the interface for resolving the identity of the device being
// provisioned.
//
// The identity step is the prerequisite of the whole sequence: the
// registrar and the inventory store both consume its output, so it must
// complete before either of them runs, and its failure aborts provisioning
// before any external side effect.

use async_trait::async_trait;

use crate::device::DeviceRecord;

/// Trait for identity source implementations
///
/// Implementations gather the UID, hostname, local and public addresses,
/// DNS name and OS image version of the device. The UID is generated once
/// and must be stable across re-runs.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Resolve the device identity
    ///
    /// # Returns
    ///
    /// - `Ok(DeviceRecord)`: the assembled, validated identity record
    /// - `Err(Error)`: if any identity field cannot be resolved
    async fn identify(&self) -> Result<DeviceRecord, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
