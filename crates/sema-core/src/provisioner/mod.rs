//! Sequential provisioner
//!
//! The Provisioner runs the provisioning transaction once:
//!
//! ```text
//! ┌────────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ IdentitySource │ ──▶ │ DnsRegistrar │ ──▶ │ InventoryStore │
//! └────────────────┘     └──────────────┘     └────────────────┘
//!        identify            register            record_device
//! ```
//!
//! Strictly sequential, no feedback loop, no retry. The identity step must
//! complete before either consumer runs; the first failure stops the
//! sequence and is returned to the caller.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::device::DeviceRecord;
use crate::error::Result;
use crate::traits::{DnsRegistrar, IdentitySource, InventoryStore, RecordRegistration};

/// Capacity of the event channel; a run emits at most six events
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Provisioning stage, named in failure events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Identity resolution
    Identity,
    /// DNS forward record registration
    Dns,
    /// Inventory row insertion
    Inventory,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Identity => write!(f, "identity"),
            Stage::Dns => write!(f, "dns"),
            Stage::Inventory => write!(f, "inventory"),
        }
    }
}

/// Events emitted while a provisioning run progresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionEvent {
    /// The run started
    Started,

    /// Identity fields resolved
    IdentityResolved { uid: String, hostname: String },

    /// Forward record accepted by the DNS server
    DnsRegistered {
        fqdn: String,
        ip: std::net::IpAddr,
    },

    /// Device row inserted into the inventory
    InventoryRecorded { uid: String },

    /// A stage failed; the sequence stopped here
    Failed { stage: Stage, error: String },

    /// The whole sequence completed
    Completed { uid: String },
}

/// Report returned after a successful run
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    /// The identity record that was provisioned
    pub record: DeviceRecord,

    /// The DNS registration the server accepted
    pub registration: RecordRegistration,

    /// When the sequence finished
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Sequential provisioner
///
/// Owns its three collaborators as boxed trait objects; there is no shared
/// mutable state across them.
pub struct Provisioner {
    /// Identity source (prerequisite step)
    identity: Box<dyn IdentitySource>,

    /// DNS registrar for the forward record
    registrar: Box<dyn DnsRegistrar>,

    /// Inventory store for the device row
    inventory: Box<dyn InventoryStore>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ProvisionEvent>,
}

impl Provisioner {
    /// Create a new provisioner
    ///
    /// # Returns
    ///
    /// A tuple of (provisioner, event_receiver) where event_receiver yields
    /// progress events
    pub fn new(
        identity: Box<dyn IdentitySource>,
        registrar: Box<dyn DnsRegistrar>,
        inventory: Box<dyn InventoryStore>,
    ) -> (Self, mpsc::Receiver<ProvisionEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let provisioner = Self {
            identity,
            registrar,
            inventory,
            event_tx: tx,
        };

        (provisioner, rx)
    }

    /// Run the provisioning sequence once
    ///
    /// identity → DNS forward record → inventory row, stopping at the first
    /// failure. Every failure is returned to the caller; none is logged and
    /// swallowed.
    pub async fn run(&self) -> Result<ProvisionReport> {
        self.emit(ProvisionEvent::Started);
        debug!("Starting provisioning via {}", self.identity.source_name());

        // Step 1: resolve identity (prerequisite for both consumers)
        let record = match self.identity.identify().await {
            Ok(record) => record,
            Err(e) => return Err(self.fail(Stage::Identity, e)),
        };
        if let Err(e) = record.validate() {
            return Err(self.fail(Stage::Identity, e));
        }

        debug!("Device identity resolved: {} ({})", record.uid, record.dns_name);
        self.emit(ProvisionEvent::IdentityResolved {
            uid: record.uid.clone(),
            hostname: record.hostname.clone(),
        });

        // Step 2: register the forward record
        if !self.registrar.supports_host(&record.hostname) {
            let e = crate::Error::invalid_input(format!(
                "registrar {} cannot handle host {}",
                self.registrar.registrar_name(),
                record.hostname
            ));
            return Err(self.fail(Stage::Dns, e));
        }

        let registration = match self
            .registrar
            .register(&record.hostname, record.local_ip)
            .await
        {
            Ok(registration) => registration,
            Err(e) => return Err(self.fail(Stage::Dns, e)),
        };

        info!(
            "Forward record registered: {} -> {}",
            registration.fqdn, registration.ip
        );
        self.emit(ProvisionEvent::DnsRegistered {
            fqdn: registration.fqdn.clone(),
            ip: registration.ip,
        });

        // Step 3: record the device in the inventory
        if let Err(e) = self.inventory.record_device(&record).await {
            return Err(self.fail(Stage::Inventory, e));
        }

        info!("Device {} recorded in inventory", record.uid);
        self.emit(ProvisionEvent::InventoryRecorded {
            uid: record.uid.clone(),
        });

        self.emit(ProvisionEvent::Completed {
            uid: record.uid.clone(),
        });

        Ok(ProvisionReport {
            record,
            registration,
            completed_at: chrono::Utc::now(),
        })
    }

    /// Emit a failure event and hand the error back for propagation
    fn fail(&self, stage: Stage, error: crate::Error) -> crate::Error {
        self.emit(ProvisionEvent::Failed {
            stage,
            error: error.to_string(),
        });
        error
    }

    /// Emit a provisioning event
    fn emit(&self, event: ProvisionEvent) {
        // A full channel means nobody is draining events; the run itself
        // must not block or fail on that.
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping provisioning event");
        }
    }
}
