//! Backend registry
//!
//! The registry maps backend names to registrar/store factories, so the
//! binary can construct both from configuration without hardcoded if-else
//! dispatch.
//!
//! ## Registration
//!
//! Backend crates provide a `register()` function called during
//! initialization:
//!
//! ```rust,ignore
//! let registry = sema_core::Registry::new();
//! sema_dns_rfc2136::register(&registry);
//! sema_db_mysql::register(&registry);
//!
//! let registrar = registry.create_registrar(&config.dns)?;
//! let store = registry.create_store(&config.database)?;
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::{DatabaseConfig, DnsConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsRegistrar, DnsRegistrarFactory, InventoryStore, InventoryStoreFactory};

/// Registry for backend factories
///
/// ## Thread Safety
///
/// Uses interior mutability with RwLock, allowing concurrent reads and
/// exclusive writes.
#[derive(Default)]
pub struct Registry {
    /// Registered DNS registrar factories
    registrars: RwLock<HashMap<String, Box<dyn DnsRegistrarFactory>>>,

    /// Registered inventory store factories
    stores: RwLock<HashMap<String, Box<dyn InventoryStoreFactory>>>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS registrar factory under a backend name
    pub fn register_registrar(
        &self,
        name: impl Into<String>,
        factory: Box<dyn DnsRegistrarFactory>,
    ) {
        let mut registrars = self.registrars.write().unwrap();
        registrars.insert(name.into(), factory);
    }

    /// Register an inventory store factory under a backend name
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn InventoryStoreFactory>) {
        let mut stores = self.stores.write().unwrap();
        stores.insert(name.into(), factory);
    }

    /// Create a DNS registrar from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsRegistrar>)`: created registrar instance
    /// - `Err(Error)`: if the backend is not registered or creation fails
    pub fn create_registrar(&self, config: &DnsConfig) -> Result<Box<dyn DnsRegistrar>> {
        let registrars = self.registrars.read().unwrap();

        let factory = registrars
            .get(&config.backend)
            .ok_or_else(|| Error::config(format!("unknown DNS backend: {}", config.backend)))?;

        factory.create(config)
    }

    /// Create an inventory store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn InventoryStore>)`: created store instance
    /// - `Err(Error)`: if the backend is not registered or creation fails
    pub fn create_store(&self, config: &DatabaseConfig) -> Result<Box<dyn InventoryStore>> {
        let stores = self.stores.read().unwrap();

        let factory = stores
            .get(&config.backend)
            .ok_or_else(|| Error::config(format!("unknown store backend: {}", config.backend)))?;

        factory.create(config)
    }

    /// Check if a DNS backend is registered
    pub fn has_registrar(&self, name: &str) -> bool {
        self.registrars.read().unwrap().contains_key(name)
    }

    /// Check if a store backend is registered
    pub fn has_store(&self, name: &str) -> bool {
        self.stores.read().unwrap().contains_key(name)
    }

    /// List all registered DNS backend names
    pub fn list_registrars(&self) -> Vec<String> {
        self.registrars.read().unwrap().keys().cloned().collect()
    }

    /// List all registered store backend names
    pub fn list_stores(&self) -> Vec<String> {
        self.stores.read().unwrap().keys().cloned().collect()
    }
}
