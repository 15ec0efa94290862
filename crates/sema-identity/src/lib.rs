// # System Identity Source
//
// Resolves the identity fields of the device being provisioned:
//
// - **uid**: persisted UUID, generated on the first run and reused after
// - **hostname**: from the kernel
// - **local_ip**: first non-loopback IPv4 interface address
// - **public_ip**: plain-text IP echo service over HTTP
// - **dns_name**: hostname joined with the site domain
// - **version**: contents of the OS image version file
//
// ## UID persistence
//
// "Generated once, immutable": the UID is stored as JSON next to the other
// device state and a re-run reuses it instead of minting a new one.
//
// ```json
// {
//   "version": "1.0",
//   "uid": "5e47…",
//   "generated_at": "2025-01-09T12:00:00Z"
// }
// ```
//
// Writes go to a temporary file first and are renamed into place, so a
// crash mid-write never leaves a half-written UID behind.

use async_trait::async_trait;
use sema_core::config::IdentityConfig;
use sema_core::device::DeviceRecord;
use sema_core::error::{Error, Result};
use sema_core::traits::IdentitySource;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// UID file format version
/// Used for future migration if the format changes
const UID_FILE_VERSION: &str = "1.0";

/// Timeout for the public IP lookup
const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(10);

/// Serializable UID file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct UidFileFormat {
    version: String,
    uid: String,
    generated_at: chrono::DateTime<chrono::Utc>,
}

/// Identity source backed by the running system
pub struct SystemIdentitySource {
    config: IdentityConfig,

    /// Site domain the DNS name is composed under
    domain: String,

    /// HTTP client for the public IP lookup
    client: reqwest::Client,
}

impl SystemIdentitySource {
    /// Create a new system identity source
    ///
    /// # Parameters
    ///
    /// - `config`: identity configuration (UID path, version file, IP echo URL)
    /// - `domain`: site domain used to compose the device's DNS name
    pub fn new(config: IdentityConfig, domain: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PUBLIC_IP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            config,
            domain: domain.into(),
            client,
        }
    }

    /// Load the persisted UID, or generate and persist a fresh one
    async fn load_or_generate_uid(&self) -> Result<String> {
        let path = Path::new(&self.config.uid_path);

        if path.exists() {
            let content = fs::read_to_string(path).await.map_err(|e| {
                Error::identity(format!("failed to read UID file {}: {}", path.display(), e))
            })?;

            let file: UidFileFormat = serde_json::from_str(&content).map_err(|e| {
                Error::identity(format!(
                    "failed to parse UID file {}: {}",
                    path.display(),
                    e
                ))
            })?;

            if file.uid.is_empty() {
                return Err(Error::identity(format!(
                    "UID file {} holds an empty uid",
                    path.display()
                )));
            }

            tracing::debug!("Reusing persisted UID from {}", path.display());
            return Ok(file.uid);
        }

        let uid = uuid::Uuid::new_v4().to_string();
        self.write_uid(path, &uid).await?;
        tracing::info!("Generated new device UID");
        Ok(uid)
    }

    /// Persist the UID atomically (write to a temp file, then rename)
    async fn write_uid(&self, path: &Path, uid: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::identity(format!(
                        "failed to create UID directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = UidFileFormat {
            version: UID_FILE_VERSION.to_string(),
            uid: uid.to_string(),
            generated_at: chrono::Utc::now(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = temp_path(path);
        {
            let mut f = fs::File::create(&temp_path).await.map_err(|e| {
                Error::identity(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            f.write_all(json.as_bytes()).await.map_err(|e| {
                Error::identity(format!(
                    "failed to write UID file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            f.flush().await.map_err(|e| {
                Error::identity(format!(
                    "failed to flush UID file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, path).await.map_err(|e| {
            Error::identity(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get the device hostname from the kernel
    fn hostname() -> Result<String> {
        let hostname = gethostname::gethostname().to_string_lossy().to_string();
        if hostname.is_empty() {
            return Err(Error::identity("system hostname is empty"));
        }
        Ok(hostname)
    }

    /// Pick the first non-loopback IPv4 interface address
    fn local_ip() -> Result<IpAddr> {
        let if_addrs = if_addrs::get_if_addrs()
            .map_err(|e| Error::identity(format!("failed to enumerate network interfaces: {}", e)))?;

        if_addrs
            .iter()
            .filter(|interface| !interface.is_loopback())
            .find_map(|interface| match interface.addr {
                if_addrs::IfAddr::V4(ref v4) => Some(IpAddr::V4(v4.ip)),
                if_addrs::IfAddr::V6(_) => None,
            })
            .ok_or_else(|| Error::identity("no non-loopback IPv4 interface found"))
    }

    /// Fetch the externally visible address from the IP echo service
    async fn public_ip(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.config.public_ip_url)
            .send()
            .await
            .map_err(|e| Error::identity(format!("public IP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::identity(format!(
                "public IP service returned {}",
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::identity(format!("failed to read public IP response: {}", e)))?;

        let text = text.trim();
        text.parse()
            .map_err(|_| Error::identity(format!("invalid public IP address: {}", text)))
    }

    /// Read the OS image version string
    async fn version(&self) -> Result<String> {
        let content = fs::read_to_string(&self.config.version_file)
            .await
            .map_err(|e| {
                Error::identity(format!(
                    "failed to read version file {}: {}",
                    self.config.version_file, e
                ))
            })?;

        let version = content.trim().to_string();
        if version.is_empty() {
            return Err(Error::identity(format!(
                "version file {} is empty",
                self.config.version_file
            )));
        }
        Ok(version)
    }
}

#[async_trait]
impl IdentitySource for SystemIdentitySource {
    async fn identify(&self) -> Result<DeviceRecord> {
        let uid = self.load_or_generate_uid().await?;
        let hostname = Self::hostname()?;
        let local_ip = Self::local_ip()?;
        let public_ip = self.public_ip().await?;
        let dns_name = format!("{}.{}", hostname, self.domain);
        let version = self.version().await?;

        let record = DeviceRecord {
            uid,
            hostname,
            local_ip,
            public_ip,
            dns_name,
            version,
        };
        record.validate()?;

        tracing::debug!("Device identity resolved: {} ({})", record.uid, record.dns_name);
        Ok(record)
    }

    fn source_name(&self) -> &'static str {
        "system"
    }
}

/// Path of the temporary file used for atomic UID writes
fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.to_path_buf();
    temp.set_extension("tmp");
    temp
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_core::config::IdentityConfig;
    use tempfile::tempdir;

    fn source_with_uid_path(path: &Path) -> SystemIdentitySource {
        let config = IdentityConfig {
            uid_path: path.to_string_lossy().to_string(),
            ..IdentityConfig::default()
        };
        SystemIdentitySource::new(config, "cma4.box")
    }

    #[tokio::test]
    async fn uid_generated_once_and_reused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uid.json");

        let source = source_with_uid_path(&path);

        let first = source.load_or_generate_uid().await.unwrap();
        assert!(!first.is_empty());
        assert!(path.exists(), "UID file written on first run");

        // A second run (fresh source, same path) reuses the stored UID
        let source2 = source_with_uid_path(&path);
        let second = source2.load_or_generate_uid().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn uid_file_carries_format_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uid.json");

        let source = source_with_uid_path(&path);
        source.load_or_generate_uid().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let file: UidFileFormat = serde_json::from_str(&content).unwrap();
        assert_eq!(file.version, UID_FILE_VERSION);
        assert!(!file.uid.is_empty());
    }

    #[tokio::test]
    async fn corrupted_uid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uid.json");
        std::fs::write(&path, b"not json").unwrap();

        let source = source_with_uid_path(&path);
        let err = source.load_or_generate_uid().await.unwrap_err();
        assert!(err.to_string().contains("failed to parse UID file"));
    }

    #[test]
    fn temp_path_swaps_extension() {
        let path = Path::new("/var/lib/semabox/uid.json");
        assert_eq!(temp_path(path), PathBuf::from("/var/lib/semabox/uid.tmp"));
    }
}
