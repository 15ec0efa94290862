//! Contract Test: Failure Aborts the Sequence
//!
//! Every failure mode is an explicit, propagated error and stops the
//! remaining steps:
//! - identity failure → zero registrar calls, zero store calls
//! - DNS refusal → zero store calls
//! - inventory failure → surfaced to the caller
//!
//! If this test fails, a failure path has become silent again.

mod common;

use common::*;
use sema_core::{Error, Provisioner};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn identity_failure_aborts_everything() {
    let log = call_log();

    let identity = MockIdentitySource::failing(log.clone());
    let identity_count = identity.call_count();
    let registrar = MockDnsRegistrar::accepting(log.clone());
    let register_count = registrar.call_count();
    let inventory = MockInventoryStore::accepting(log.clone());
    let record_count = inventory.call_count();

    let (provisioner, _events) = Provisioner::new(
        Box::new(identity),
        Box::new(registrar),
        Box::new(inventory),
    );

    let err = provisioner.run().await.expect_err("identity failure propagates");
    assert!(matches!(err, Error::Identity(_)));

    assert_eq!(identity_count.load(Ordering::SeqCst), 1);
    assert_eq!(
        register_count.load(Ordering::SeqCst),
        0,
        "no DNS update may be sent after an identity failure"
    );
    assert_eq!(
        record_count.load(Ordering::SeqCst),
        0,
        "no inventory row may be inserted after an identity failure"
    );
}

#[tokio::test]
async fn dns_refusal_aborts_inventory() {
    let log = call_log();

    let identity = MockIdentitySource::resolving(sample_record(), log.clone());
    let registrar = MockDnsRegistrar::refusing(log.clone());
    let inventory = MockInventoryStore::accepting(log.clone());
    let record_count = inventory.call_count();

    let (provisioner, _events) = Provisioner::new(
        Box::new(identity),
        Box::new(registrar),
        Box::new(inventory),
    );

    let err = provisioner.run().await.expect_err("refusal propagates");
    assert!(matches!(err, Error::DnsRefused { .. }));

    assert_eq!(
        record_count.load(Ordering::SeqCst),
        0,
        "a refused DNS update must stop the sequence before the insert"
    );
}

#[tokio::test]
async fn inventory_failure_surfaces() {
    let log = call_log();

    let identity = MockIdentitySource::resolving(sample_record(), log.clone());
    let registrar = MockDnsRegistrar::accepting(log.clone());
    let register_count = registrar.call_count();
    let inventory = MockInventoryStore::failing(log.clone());

    let (provisioner, _events) = Provisioner::new(
        Box::new(identity),
        Box::new(registrar),
        Box::new(inventory),
    );

    let err = provisioner.run().await.expect_err("insert failure propagates");
    assert!(matches!(err, Error::Inventory(_)));

    // The DNS step had already succeeded by then
    assert_eq!(register_count.load(Ordering::SeqCst), 1);
}
