//! Device record model
//!
//! The record is assembled once by an [`IdentitySource`](crate::IdentitySource),
//! forwarded to the DNS registrar and the inventory store, and then discarded.
//! It is never persisted locally and never mutated after assembly.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::{Error, Result};

/// Identity of a device being provisioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Unique device identifier, generated once, immutable
    pub uid: String,

    /// Device network name (bare label, no dots)
    pub hostname: String,

    /// Private network address
    pub local_ip: IpAddr,

    /// Externally visible address
    pub public_ip: IpAddr,

    /// Fully-qualified name for the device (`hostname.domain`)
    pub dns_name: String,

    /// Software version string of the device's OS image
    pub version: String,
}

impl DeviceRecord {
    /// Validate the record before any network side effect
    ///
    /// All string fields must be non-empty and the hostname must be a bare
    /// label, since the registrar appends the zone itself.
    pub fn validate(&self) -> Result<()> {
        if self.uid.is_empty() {
            return Err(Error::invalid_input("device uid cannot be empty"));
        }
        if self.hostname.is_empty() {
            return Err(Error::invalid_input("hostname cannot be empty"));
        }
        if self.hostname.contains('.') {
            return Err(Error::invalid_input(format!(
                "hostname must be a bare label, got: {}",
                self.hostname
            )));
        }
        if self.dns_name.is_empty() {
            return Err(Error::invalid_input("dns name cannot be empty"));
        }
        if self.version.is_empty() {
            return Err(Error::invalid_input("version cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DeviceRecord {
        DeviceRecord {
            uid: "abc123".to_string(),
            hostname: "sema01".to_string(),
            local_ip: "192.168.1.10".parse().unwrap(),
            public_ip: "203.0.113.7".parse().unwrap(),
            dns_name: "sema01.cma4.box".to_string(),
            version: "1.2.5".to_string(),
        }
    }

    #[test]
    fn valid_record_passes() {
        assert!(record().validate().is_ok());
    }

    #[test]
    fn empty_uid_rejected() {
        let mut r = record();
        r.uid.clear();
        assert!(r.validate().is_err());
    }

    #[test]
    fn qualified_hostname_rejected() {
        let mut r = record();
        r.hostname = "sema01.cma4.box".to_string();
        assert!(r.validate().is_err());
    }

    #[test]
    fn empty_version_rejected() {
        let mut r = record();
        r.version.clear();
        assert!(r.validate().is_err());
    }
}
