// # sema-provision
//
// First-boot provisioning binary for the Semabox.
//
// This is a THIN integration layer: all provisioning logic lives in
// sema-core and the backend crates. The binary is responsible for:
//
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Registering backends and wiring the provisioner
// 4. Running the sequence once and mapping the outcome to an exit code
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### DNS registrar
// - `SEMA_DNS_SERVER`: address of the zone's primary server (`ip[:port]`)
// - `SEMA_DOMAIN`: zone the forward record is added to
// - `SEMA_TTL`: record time-to-live in seconds (default: 300)
// - `SEMA_RECORD_TYPE`: A or AAAA (default: A)
// - `SEMA_DNS_BACKEND`: registrar backend (default: rfc2136)
//
// ### Inventory database
// - `SEMA_DB_HOST`: database server host
// - `SEMA_DB_PORT`: database server port (default: 3306)
// - `SEMA_DB_USER`: database user
// - `SEMA_DB_PASSWORD`: database password
// - `SEMA_DB_NAME`: database name (default: semabox)
// - `SEMA_DB_BACKEND`: store backend (default: mysql)
//
// ### Identity
// - `SEMA_UID_PATH`: persisted device UID file (default: /var/lib/semabox/uid.json)
// - `SEMA_VERSION_FILE`: OS image version file (default: /etc/semabox/version)
// - `SEMA_PUBLIC_IP_URL`: plain-text IP echo service (default: https://api.ipify.org)
//
// ### Logging
// - `SEMA_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
//
// ## Example
//
// ```bash
// export SEMA_DNS_SERVER=192.168.100.253
// export SEMA_DOMAIN=cma4.box
// export SEMA_DB_HOST=192.168.150.240
// export SEMA_DB_USER=semabox
// export SEMA_DB_PASSWORD=…
//
// sema-provision
// ```

use anyhow::{Context, Result};
use sema_core::config::{
    DatabaseConfig, DnsConfig, IdentityConfig, ProvisionConfig, RecordType,
};
use sema_core::{ProvisionEvent, ProvisionReport, Provisioner, Registry};
use sema_identity::SystemIdentitySource;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the provisioning run
///
/// - 0: device provisioned
/// - 1: configuration error (nothing was touched)
/// - 2: provisioning failure (identity, DNS or inventory)
#[derive(Debug, Clone, Copy)]
enum ProvisionExitCode {
    /// Device provisioned successfully
    Provisioned = 0,
    /// Configuration error, before any side effect
    ConfigError = 1,
    /// A provisioning stage failed
    ProvisionError = 2,
}

impl From<ProvisionExitCode> for ExitCode {
    fn from(code: ProvisionExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct AppConfig {
    provision: ProvisionConfig,
    log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let dns = DnsConfig {
            server: env::var("SEMA_DNS_SERVER").unwrap_or_default(),
            domain: env::var("SEMA_DOMAIN").unwrap_or_default(),
            ttl: match env::var("SEMA_TTL") {
                Ok(s) => s.parse().context("SEMA_TTL must be an integer")?,
                Err(_) => 300,
            },
            record_type: match env::var("SEMA_RECORD_TYPE") {
                Ok(s) => s
                    .parse()
                    .context("SEMA_RECORD_TYPE must be A or AAAA")?,
                Err(_) => RecordType::A,
            },
            backend: env::var("SEMA_DNS_BACKEND").unwrap_or_else(|_| "rfc2136".to_string()),
        };

        let database = DatabaseConfig {
            host: env::var("SEMA_DB_HOST").unwrap_or_default(),
            port: match env::var("SEMA_DB_PORT") {
                Ok(s) => s.parse().context("SEMA_DB_PORT must be a port number")?,
                Err(_) => 3306,
            },
            user: env::var("SEMA_DB_USER").unwrap_or_default(),
            password: env::var("SEMA_DB_PASSWORD").unwrap_or_default(),
            database: env::var("SEMA_DB_NAME").unwrap_or_else(|_| "semabox".to_string()),
            backend: env::var("SEMA_DB_BACKEND").unwrap_or_else(|_| "mysql".to_string()),
        };

        let mut identity = IdentityConfig::default();
        if let Ok(path) = env::var("SEMA_UID_PATH") {
            identity.uid_path = path;
        }
        if let Ok(path) = env::var("SEMA_VERSION_FILE") {
            identity.version_file = path;
        }
        if let Ok(url) = env::var("SEMA_PUBLIC_IP_URL") {
            identity.public_ip_url = url;
        }

        Ok(Self {
            provision: ProvisionConfig {
                dns,
                database,
                identity,
            },
            log_level: env::var("SEMA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Everything is checked here, before any network call, so a bad setup
    /// exits with code 1 and a message telling the operator what to set.
    fn validate(&self) -> Result<()> {
        let dns = &self.provision.dns;

        if dns.server.is_empty() {
            anyhow::bail!(
                "SEMA_DNS_SERVER is required. \
                Set it via: export SEMA_DNS_SERVER=192.168.100.253"
            );
        }

        if dns.domain.is_empty() {
            anyhow::bail!(
                "SEMA_DOMAIN is required. \
                Set it via: export SEMA_DOMAIN=cma4.box"
            );
        }
        validate_domain_name(&dns.domain)?;

        if !(1..=604_800).contains(&dns.ttl) {
            anyhow::bail!(
                "SEMA_TTL must be between 1 and 604800 seconds. Got: {}",
                dns.ttl
            );
        }

        let db = &self.provision.database;

        if db.host.is_empty() {
            anyhow::bail!(
                "SEMA_DB_HOST is required. \
                Set it via: export SEMA_DB_HOST=192.168.150.240"
            );
        }
        if db.user.is_empty() {
            anyhow::bail!(
                "SEMA_DB_USER is required. \
                Set it via: export SEMA_DB_USER=semabox"
            );
        }
        if db.password.is_empty() {
            anyhow::bail!(
                "SEMA_DB_PASSWORD is required. \
                Set it via: export SEMA_DB_PASSWORD=your_password"
            );
        }

        // Backend names and the remaining paths are validated by the
        // registry and the core config
        self.provision
            .validate()
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "SEMA_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 validation; not comprehensive but catches common errors.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ProvisionExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ProvisionExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ProvisionExitCode::ConfigError.into();
    }

    info!("Starting sema-provision");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ProvisionExitCode::ProvisionError.into();
        }
    };

    let result = rt.block_on(async {
        match run_provision(config).await {
            Ok(report) => {
                info!(
                    "Device {} provisioned as {} (version {})",
                    report.record.uid, report.registration.fqdn, report.record.version
                );
                ProvisionExitCode::Provisioned
            }
            Err(e) => {
                error!("Provisioning failed: {}", e);
                ProvisionExitCode::ProvisionError
            }
        }
    });

    result.into()
}

/// Run the provisioning sequence once
async fn run_provision(config: AppConfig) -> Result<ProvisionReport> {
    // Register built-in backends
    let registry = Registry::new();
    sema_dns_rfc2136::register(&registry);
    sema_db_mysql::register(&registry);

    let registrar = registry.create_registrar(&config.provision.dns)?;
    let store = registry.create_store(&config.provision.database)?;
    let identity = Box::new(SystemIdentitySource::new(
        config.provision.identity.clone(),
        config.provision.dns.domain.clone(),
    ));

    info!(
        "Provisioning via {} registrar and {} store",
        registrar.registrar_name(),
        store.store_name()
    );

    let (provisioner, mut events) = Provisioner::new(identity, registrar, store);

    // Surface progress events to the operator
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let result = provisioner.run().await;

    // Dropping the provisioner closes the channel and ends the logger task
    drop(provisioner);
    let _ = event_logger.await;

    Ok(result?)
}

/// Log one provisioning event
fn log_event(event: &ProvisionEvent) {
    match event {
        ProvisionEvent::Started => info!("Provisioning started"),
        ProvisionEvent::IdentityResolved { uid, hostname } => {
            info!("Identity resolved: {} ({})", hostname, uid);
        }
        ProvisionEvent::DnsRegistered { fqdn, ip } => {
            info!("DNS record registered: {} -> {}", fqdn, ip);
        }
        ProvisionEvent::InventoryRecorded { uid } => {
            info!("Inventory row inserted for {}", uid);
        }
        ProvisionEvent::Failed { stage, error } => {
            error!("Provisioning failed during {}: {}", stage, error);
        }
        ProvisionEvent::Completed { uid } => info!("Provisioning complete for {}", uid),
    }
}
