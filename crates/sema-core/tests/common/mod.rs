//! Test doubles and common utilities for provisioning contract tests
//!
//! The mocks count their calls and append to a shared call log so tests can
//! assert both how often and in which order the collaborators ran.

use sema_core::device::DeviceRecord;
use sema_core::error::{Error, Result};
use sema_core::traits::{
    DnsRegistrar, IdentitySource, InventoryStore, RecordRegistration,
};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared ordered log of collaborator calls
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Create an empty call log
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// The identity record used by the end-to-end scenario
pub fn sample_record() -> DeviceRecord {
    DeviceRecord {
        uid: "abc123".to_string(),
        hostname: "sema01".to_string(),
        local_ip: "192.168.1.10".parse().unwrap(),
        public_ip: "203.0.113.7".parse().unwrap(),
        dns_name: "sema01.cma4.box".to_string(),
        version: "1.2.5".to_string(),
    }
}

/// A mock IdentitySource that returns a fixed record or a fixed failure
pub struct MockIdentitySource {
    record: Option<DeviceRecord>,
    log: CallLog,
    identify_call_count: Arc<AtomicUsize>,
}

impl MockIdentitySource {
    /// Source that resolves the given record
    pub fn resolving(record: DeviceRecord, log: CallLog) -> Self {
        Self {
            record: Some(record),
            log,
            identify_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Source whose identify() always fails
    pub fn failing(log: CallLog) -> Self {
        Self {
            record: None,
            log,
            identify_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle on the call counter, kept by the test before boxing
    pub fn call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.identify_call_count)
    }
}

#[async_trait::async_trait]
impl IdentitySource for MockIdentitySource {
    async fn identify(&self) -> Result<DeviceRecord> {
        self.identify_call_count.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push("identify");

        match &self.record {
            Some(record) => Ok(record.clone()),
            None => Err(Error::identity("generator failed")),
        }
    }

    fn source_name(&self) -> &'static str {
        "mock"
    }
}

/// A mock DnsRegistrar that tracks calls and can be told to refuse updates
pub struct MockDnsRegistrar {
    refuse: bool,
    log: CallLog,
    register_call_count: Arc<AtomicUsize>,
    registered: Arc<Mutex<Vec<(String, IpAddr)>>>,
}

impl MockDnsRegistrar {
    /// Registrar whose updates are accepted
    pub fn accepting(log: CallLog) -> Self {
        Self {
            refuse: false,
            log,
            register_call_count: Arc::new(AtomicUsize::new(0)),
            registered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Registrar whose updates are refused with a non-zero response code
    pub fn refusing(log: CallLog) -> Self {
        Self {
            refuse: true,
            ..Self::accepting(log)
        }
    }

    /// Handle on the call counter, kept by the test before boxing
    pub fn call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.register_call_count)
    }

    /// Handle on the (host, ip) pairs passed to register()
    pub fn registered(&self) -> Arc<Mutex<Vec<(String, IpAddr)>>> {
        Arc::clone(&self.registered)
    }
}

#[async_trait::async_trait]
impl DnsRegistrar for MockDnsRegistrar {
    async fn register(&self, host: &str, ip: IpAddr) -> Result<RecordRegistration> {
        self.register_call_count.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push("register");
        self.registered
            .lock()
            .unwrap()
            .push((host.to_string(), ip));

        if self.refuse {
            return Err(Error::dns_refused("REFUSED"));
        }

        Ok(RecordRegistration {
            fqdn: format!("{}.cma4.box.", host),
            ip,
            ttl: 300,
        })
    }

    fn supports_host(&self, _host: &str) -> bool {
        true
    }

    fn registrar_name(&self) -> &'static str {
        "mock"
    }
}

/// A mock InventoryStore that tracks inserted rows and can be told to fail
pub struct MockInventoryStore {
    fail: bool,
    log: CallLog,
    record_call_count: Arc<AtomicUsize>,
    rows: Arc<Mutex<Vec<DeviceRecord>>>,
}

impl MockInventoryStore {
    /// Store whose inserts succeed
    pub fn accepting(log: CallLog) -> Self {
        Self {
            fail: false,
            log,
            record_call_count: Arc::new(AtomicUsize::new(0)),
            rows: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Store whose inserts fail
    pub fn failing(log: CallLog) -> Self {
        Self {
            fail: true,
            ..Self::accepting(log)
        }
    }

    /// Handle on the call counter, kept by the test before boxing
    pub fn call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.record_call_count)
    }

    /// Handle on the inserted rows
    pub fn rows(&self) -> Arc<Mutex<Vec<DeviceRecord>>> {
        Arc::clone(&self.rows)
    }
}

#[async_trait::async_trait]
impl InventoryStore for MockInventoryStore {
    async fn record_device(&self, record: &DeviceRecord) -> Result<()> {
        self.record_call_count.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push("record_device");

        if self.fail {
            return Err(Error::inventory("insert failed"));
        }

        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "mock"
    }
}
