//! Contract Test: Configuration to Running Engine
//!
//! A zone file on disk is enough to build a working engine.
//!
//! Constraints verified:
//! - Zone files are read, parsed and validated
//! - Networks become reverse zones on octet/nibble boundaries
//! - Backends are created through the registry by type name
//! - Dry-run mode observes DNS but never changes it

mod common;

use common::*;
use ipamdns_core::backend::{MemoryBackendFactory, MemoryRecordStore};
use ipamdns_core::{BackendRegistry, ReconcileEngine, ServiceConfig, ZoneRegistry};
use std::io::Write;

const ZONES: &str = r#"{
    "ttl": 600,
    "zones": [
        { "name": "example.com", "backend": { "type": "memory" } },
        { "network": "10.0.0.0/16", "backend": { "type": "memory" } },
        { "network": "2001:db8::/32", "backend": { "type": "memory" } }
    ]
}"#;

fn zone_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write zone file");
    file
}

fn registry_over(store: &MemoryRecordStore) -> BackendRegistry {
    let registry = BackendRegistry::with_builtin();
    registry.register_backend("memory", Box::new(MemoryBackendFactory::new(store.clone())));
    registry
}

#[tokio::test]
async fn zone_file_builds_a_working_engine() {
    let file = zone_file(ZONES);
    let config = ServiceConfig::from_file(file.path()).expect("valid zone file");
    assert_eq!(config.ttl, 600);
    assert_eq!(config.timeout_secs, 5);

    let store = MemoryRecordStore::new();
    let zones = ZoneRegistry::from_config(&config, &registry_over(&store), false).unwrap();
    let reverse_apexes: Vec<String> = zones
        .zones()
        .filter(|b| b.is_reverse())
        .map(|b| b.zone.to_string())
        .collect();
    assert_eq!(
        reverse_apexes,
        vec!["8.b.d.0.1.0.0.2.ip6.arpa", "0.10.in-addr.arpa"]
    );

    let engine = ReconcileEngine::new(zones);
    let report = engine
        .reconcile_raw("10.0.3.4/16", "host.example.com")
        .await
        .unwrap();
    assert!(report.is_success());
    assert!(store.has_reverse(ip("10.0.3.4"), &name("host.example.com")).await);
}

#[tokio::test]
async fn dry_run_mode_observes_but_never_changes() {
    let config = ServiceConfig::from_json(ZONES).unwrap();
    let store = MemoryRecordStore::new();
    store.insert_forward(name("host.example.com"), ip("10.0.0.9")).await;

    let zones = ZoneRegistry::from_config(&config, &registry_over(&store), true).unwrap();
    let engine = ReconcileEngine::new(zones);
    let report = engine
        .reconcile_raw("10.0.0.5", "host.example.com")
        .await
        .unwrap();

    // The plan saw the stale record, nothing was sent
    assert_eq!(
        report.applied_lines(),
        vec![
            "remove host.example.com A 10.0.0.9",
            "add host.example.com A 10.0.0.5",
            "add 5.0.0.10.in-addr.arpa PTR host.example.com",
        ]
    );
    assert_eq!(
        store.forward_records().await,
        vec![(name("host.example.com"), ip("10.0.0.9"))]
    );
    assert!(store.reverse_records().await.is_empty());
}

#[test]
fn invalid_zone_files_are_rejected() {
    let cases = [
        r#"{"zones": []}"#,
        r#"{"zones": [{"network": "10.0.0.0/20", "backend": {"type": "dry_run"}}]}"#,
        r#"{"zones": [{"name": "example.com", "backend": {"type": "dry_run"}},
                      {"name": "EXAMPLE.com.", "backend": {"type": "dry_run"}}]}"#,
        r#"{"zones": [{"name": "example.com", "backend": {"type": "rfc2136", "server": ""}}]}"#,
        r#"{"zones": [{"backend": {"type": "dry_run"}}]}"#,
        r#"not json"#,
    ];

    for case in cases {
        let file = zone_file(case);
        assert!(
            ServiceConfig::from_file(file.path()).is_err(),
            "should be rejected: {}",
            case
        );
    }
}

#[test]
fn unreadable_zone_file_is_a_configuration_error() {
    let err = ServiceConfig::from_file("/nonexistent/zones.json").unwrap_err();
    assert!(err.is_configuration());
}
