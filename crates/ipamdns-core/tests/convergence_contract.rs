//! Contract Test: Convergence
//!
//! After one successful reconciliation DNS holds exactly one forward and one
//! reverse record for the event's pair, and nothing else claims either side.
//!
//! Constraints verified:
//! - Empty DNS converges with one forward add and one reverse add
//! - Stale records on both sides are removed together with the records
//!   that pointed back at them
//! - An empty name clears the address's PTR and the forward record behind it
//! - Address families never mix
//!
//! If this test fails, DNS can drift away from IPAM.

mod common;

use common::*;

#[tokio::test]
async fn empty_dns_converges_with_two_adds() {
    let w = world();

    let report = w
        .engine
        .reconcile_raw("10.0.0.5", "host.example.com")
        .await
        .expect("event is valid");

    assert!(report.is_success(), "failures: {:?}", report.failure_lines());
    assert_eq!(
        w.log.mutations(),
        vec![
            "add-forward host.example.com 10.0.0.5",
            "add-reverse 10.0.0.5 host.example.com",
        ]
    );
    assert_eq!(
        report.applied_lines(),
        vec![
            "add host.example.com A 10.0.0.5",
            "add 5.0.0.10.in-addr.arpa PTR host.example.com",
        ]
    );
    assert!(w.store.has_forward(&name("host.example.com"), ip("10.0.0.5")).await);
    assert!(w.store.has_reverse(ip("10.0.0.5"), &name("host.example.com")).await);
}

#[tokio::test]
async fn forward_takeover_replaces_both_stale_pairs() {
    let w = world();
    w.store.insert_forward(name("host.example.com"), ip("10.0.0.9")).await;
    w.store.insert_reverse(ip("10.0.0.9"), name("host.example.com")).await;
    w.store.insert_reverse(ip("10.0.0.5"), name("oldhost.example.com")).await;
    w.store.insert_forward(name("oldhost.example.com"), ip("10.0.0.5")).await;

    let report = w
        .engine
        .reconcile_raw("10.0.0.5", "host.example.com")
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(
        w.log.mutations(),
        vec![
            "remove-forward host.example.com 10.0.0.9",
            "remove-reverse 10.0.0.9 host.example.com",
            "add-forward host.example.com 10.0.0.5",
            "remove-reverse 10.0.0.5 oldhost.example.com",
            "remove-forward oldhost.example.com 10.0.0.5",
            "add-reverse 10.0.0.5 host.example.com",
        ]
    );
    assert_eq!(
        w.store.forward_records().await,
        vec![(name("host.example.com"), ip("10.0.0.5"))]
    );
    assert_eq!(
        w.store.reverse_records().await,
        vec![(ip("10.0.0.5"), name("host.example.com"))]
    );
}

#[tokio::test]
async fn ptr_of_stale_address_naming_someone_else_survives() {
    let w = world();
    w.store.insert_forward(name("host.example.com"), ip("10.0.0.9")).await;
    w.store.insert_reverse(ip("10.0.0.9"), name("printer.example.com")).await;

    w.engine
        .reconcile_raw("10.0.0.5", "host.example.com")
        .await
        .unwrap();

    assert!(!w.store.has_forward(&name("host.example.com"), ip("10.0.0.9")).await);
    assert!(w.store.has_reverse(ip("10.0.0.9"), &name("printer.example.com")).await);
}

#[tokio::test]
async fn empty_name_clears_ptr_and_pointing_forward() {
    let w = world();
    w.store.insert_reverse(ip("10.0.0.7"), name("retired.example.com")).await;
    w.store.insert_forward(name("retired.example.com"), ip("10.0.0.7")).await;

    let report = w.engine.reconcile_raw("10.0.0.7", "").await.unwrap();

    assert!(report.is_success());
    assert_eq!(
        w.log.mutations(),
        vec![
            "remove-reverse 10.0.0.7 retired.example.com",
            "remove-forward retired.example.com 10.0.0.7",
        ]
    );
    assert!(w.store.is_empty().await);
}

#[tokio::test]
async fn empty_name_leaves_other_addresses_of_the_old_name() {
    let w = world();
    w.store.insert_reverse(ip("10.0.0.7"), name("retired.example.com")).await;
    w.store.insert_forward(name("retired.example.com"), ip("10.0.0.7")).await;
    w.store.insert_forward(name("retired.example.com"), ip("10.0.0.8")).await;

    w.engine.reconcile_raw("10.0.0.7/24", "").await.unwrap();

    assert_eq!(
        w.store.forward_records().await,
        vec![(name("retired.example.com"), ip("10.0.0.8"))]
    );
}

#[tokio::test]
async fn ipv6_event_never_touches_ipv4_records() {
    let w = world();
    w.store.insert_forward(name("host.example.com"), ip("10.0.0.5")).await;
    w.store.insert_reverse(ip("10.0.0.5"), name("host.example.com")).await;
    w.store.insert_forward(name("host.example.com"), ip("2001:db8::9")).await;

    let report = w
        .engine
        .reconcile_raw("2001:db8::5", "host.example.com")
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(
        w.log.mutations(),
        vec![
            "remove-forward host.example.com 2001:db8::9",
            "add-forward host.example.com 2001:db8::5",
            "add-reverse 2001:db8::5 host.example.com",
        ]
    );
    assert!(report.applied_lines()[1].starts_with("add host.example.com AAAA"));
    assert!(report.applied_lines()[2].ends_with("ip6.arpa PTR host.example.com"));
    assert!(w.store.has_forward(&name("host.example.com"), ip("10.0.0.5")).await);
    assert!(w.store.has_reverse(ip("10.0.0.5"), &name("host.example.com")).await);
}

#[tokio::test]
async fn ipv4_event_never_touches_ipv6_records() {
    let w = world();
    w.store.insert_forward(name("host.example.com"), ip("2001:db8::5")).await;

    w.engine
        .reconcile_raw("10.0.0.5", "host.example.com")
        .await
        .unwrap();

    assert!(w.log.mutations().iter().all(|m| !m.contains("2001:db8")));
    assert!(w.store.has_forward(&name("host.example.com"), ip("2001:db8::5")).await);
}
