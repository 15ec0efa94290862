// # Inventory Store Trait
//
// Defines the interface for recording the device in the central inventory.
//
// The connection is a scoped resource: implementations acquire it inside
// `record_device` and release it before returning, on success and on error.

use async_trait::async_trait;

use crate::device::DeviceRecord;

/// Trait for inventory store implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Insert one row describing the device
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the row was inserted and committed
    /// - `Err(Error::AlreadyProvisioned)`: a row with this UID exists
    /// - `Err(Error)`: connection, auth or insert failure (fatal, no retry)
    async fn record_device(&self, record: &DeviceRecord) -> Result<(), crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing inventory stores from configuration
pub trait InventoryStoreFactory: Send + Sync {
    /// Create an InventoryStore instance from configuration
    fn create(
        &self,
        config: &crate::config::DatabaseConfig,
    ) -> Result<Box<dyn InventoryStore>, crate::Error>;
}
