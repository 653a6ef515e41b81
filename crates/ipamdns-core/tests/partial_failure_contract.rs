//! Contract Test: Partial Failure Tolerance
//!
//! This test verifies that failures are reported but never rolled back,
//! and that a rerun finishes what a failed run started.
//!
//! Constraints verified:
//! - A failing mutation does not stop later mutations
//! - Successful mutations stay in place after a later failure
//! - A rerun issues only the mutations that are still missing
//! - A missing zone skips one side; the other side still runs
//! - An invalid event reaches no backend at all
//!
//! If this test fails, one bad DNS server can block unrelated changes.

mod common;

use common::*;
use ipamdns_core::{Error, Operation};

#[tokio::test]
async fn failed_reverse_add_keeps_forward_add() {
    let w = world();
    w.log.fail_on(Operation::AddReverse);

    let report = w
        .engine
        .reconcile_raw("10.0.0.5", "host.example.com")
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.applied_lines(), vec!["add host.example.com A 10.0.0.5"]);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(&report.failures[0], Error::Backend(e) if e.operation == Operation::AddReverse));
    assert!(w.store.has_forward(&name("host.example.com"), ip("10.0.0.5")).await);

    // Rerun once the server recovers
    w.log.clear_failures();
    w.log.reset();
    let rerun = w
        .engine
        .reconcile_raw("10.0.0.5", "host.example.com")
        .await
        .unwrap();

    assert!(rerun.is_success());
    assert_eq!(w.log.mutations(), vec!["add-reverse 10.0.0.5 host.example.com"]);
}

#[tokio::test]
async fn failed_removal_does_not_stop_later_mutations() {
    let w = world();
    w.store.insert_forward(name("host.example.com"), ip("10.0.0.9")).await;
    w.log.fail_on(Operation::RemoveForward);

    let report = w
        .engine
        .reconcile_raw("10.0.0.5", "host.example.com")
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.applied.len(), 2);
    assert!(w.store.has_forward(&name("host.example.com"), ip("10.0.0.9")).await);
    assert!(w.store.has_reverse(ip("10.0.0.5"), &name("host.example.com")).await);
}

#[tokio::test]
async fn failed_forward_query_still_reconciles_reverse() {
    let w = world();
    w.log.fail_on(Operation::ListForward);

    let report = w
        .engine
        .reconcile_raw("10.0.0.5", "host.example.com")
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(w.log.mutations(), vec!["add-reverse 10.0.0.5 host.example.com"]);
}

#[tokio::test]
async fn missing_forward_zone_is_a_configuration_failure() {
    let w = world();

    let report = w
        .engine
        .reconcile_raw("10.0.0.5", "host.example.org")
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].is_configuration());
    assert!(report.failure_lines()[0].contains("host.example.org"));
    assert!(w.store.has_reverse(ip("10.0.0.5"), &name("host.example.org")).await);
}

#[tokio::test]
async fn missing_reverse_zone_is_a_configuration_failure() {
    let w = world();

    let report = w
        .engine
        .reconcile_raw("192.168.1.5", "host.example.com")
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], Error::NoZone(_)));
    assert!(w.store.has_forward(&name("host.example.com"), ip("192.168.1.5")).await);
}

#[tokio::test]
async fn invalid_event_reaches_no_backend() {
    let w = world();

    for (address, dns_name) in [("", "host.example.com"), ("10.0.0.999", "host.example.com"), ("10.0.0.5", "bad..name")] {
        let result = w.engine.reconcile_raw(address, dns_name).await;
        assert!(
            matches!(result, Err(Error::InvalidEvent(_))),
            "{:?}/{:?} should be rejected",
            address,
            dns_name
        );
    }

    assert_eq!(w.log.query_count(), 0);
    assert_eq!(w.log.mutation_count(), 0);
}
