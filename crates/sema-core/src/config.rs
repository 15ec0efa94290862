//! Configuration types for the provisioning tool
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Main provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// DNS registrar configuration
    pub dns: DnsConfig,

    /// Inventory database configuration
    pub database: DatabaseConfig,

    /// Identity source configuration
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl ProvisionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.dns.validate()?;
        self.database.validate()?;
        self.identity.validate()?;
        Ok(())
    }
}

/// DNS registrar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address of the DNS server that accepts dynamic updates for the zone
    /// (`host` or `host:port`; the port defaults to 53)
    pub server: String,

    /// Zone the forward record is added to (e.g. "cma4.box")
    pub domain: String,

    /// Time-to-live for the forward record, in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Record type (A for IPv4, AAAA for IPv6)
    #[serde(default)]
    pub record_type: RecordType,

    /// Registrar backend name
    #[serde(default = "default_dns_backend")]
    pub backend: String,
}

impl DnsConfig {
    /// Validate the DNS configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.server.is_empty() {
            return Err(crate::Error::config("DNS server address cannot be empty"));
        }
        if self.domain.is_empty() {
            return Err(crate::Error::config("DNS domain cannot be empty"));
        }
        if self.ttl == 0 {
            return Err(crate::Error::config("record TTL must be > 0"));
        }
        if self.backend.is_empty() {
            return Err(crate::Error::config("DNS backend name cannot be empty"));
        }
        Ok(())
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// A record (IPv4)
    #[default]
    A,
    /// AAAA record (IPv6)
    Aaaa,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::Aaaa => write!(f, "AAAA"),
        }
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(crate::Error::config(format!(
                "unknown record type: {} (expected A or AAAA)",
                other
            ))),
        }
    }
}

/// Inventory database configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database server host
    pub host: String,

    /// Database server port
    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Database user
    pub user: String,

    /// Database password
    /// ⚠️ never logged; excluded from Debug output
    pub password: String,

    /// Database name
    #[serde(default = "default_db_name")]
    pub database: String,

    /// Store backend name
    #[serde(default = "default_db_backend")]
    pub backend: String,
}

// Custom Debug implementation that hides the password
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .field("database", &self.database)
            .field("backend", &self.backend)
            .finish()
    }
}

impl DatabaseConfig {
    /// Validate the database configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.host.is_empty() {
            return Err(crate::Error::config("database host cannot be empty"));
        }
        if self.user.is_empty() {
            return Err(crate::Error::config("database user cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("database password cannot be empty"));
        }
        if self.database.is_empty() {
            return Err(crate::Error::config("database name cannot be empty"));
        }
        if self.backend.is_empty() {
            return Err(crate::Error::config("store backend name cannot be empty"));
        }
        Ok(())
    }
}

/// Identity source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Path of the persisted device UID file
    #[serde(default = "default_uid_path")]
    pub uid_path: String,

    /// File holding the OS image version string
    #[serde(default = "default_version_file")]
    pub version_file: String,

    /// Plain-text IP echo service used for the public address lookup
    #[serde(default = "default_public_ip_url")]
    pub public_ip_url: String,
}

impl IdentityConfig {
    /// Validate the identity configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.uid_path.is_empty() {
            return Err(crate::Error::config("UID file path cannot be empty"));
        }
        if self.version_file.is_empty() {
            return Err(crate::Error::config("version file path cannot be empty"));
        }
        if self.public_ip_url.is_empty() {
            return Err(crate::Error::config("public IP URL cannot be empty"));
        }
        Ok(())
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            uid_path: default_uid_path(),
            version_file: default_version_file(),
            public_ip_url: default_public_ip_url(),
        }
    }
}

fn default_ttl() -> u32 {
    300
}

fn default_dns_backend() -> String {
    "rfc2136".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_name() -> String {
    "semabox".to_string()
}

fn default_db_backend() -> String {
    "mysql".to_string()
}

fn default_uid_path() -> String {
    "/var/lib/semabox/uid.json".to_string()
}

fn default_version_file() -> String {
    "/etc/semabox/version".to_string()
}

fn default_public_ip_url() -> String {
    "https://api.ipify.org".to_string()
}
