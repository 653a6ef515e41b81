//! Minimal embedding example for ipamdns-core
//!
//! Builds an engine over in-process record stores and walks one address
//! through its life: created, renamed, moved, deleted. No DNS server or
//! webhook is involved; the application owns the engine.

use ipamdns_core::backend::{MemoryBackend, MemoryRecordStore};
use ipamdns_core::{DomainName, ReconcileEngine, RecordBackend, ZoneRegistry};
use std::sync::Arc;

async fn show(store: &MemoryRecordStore) {
    for (name, address) in store.forward_records().await {
        println!("    {} -> {}", name, address);
    }
    for (address, name) in store.reverse_records().await {
        println!("    {} <- {}", name, address);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .compact()
        .init();

    println!("=== Embedded ipamdns-core Example ===\n");

    let store = MemoryRecordStore::new();
    let mut backends: Vec<Arc<dyn RecordBackend>> = Vec::new();
    for zone in ["example.com", "0.10.in-addr.arpa", "8.b.d.0.1.0.0.2.ip6.arpa"] {
        backends.push(Arc::new(MemoryBackend::new(
            DomainName::parse(zone)?,
            store.clone(),
        )));
    }

    println!("1. Creating engine...");
    let engine = ReconcileEngine::new(ZoneRegistry::new(backends)?);

    let steps = [
        ("2. Address created", "10.0.0.5/24", "host.example.com"),
        ("3. Address renamed", "10.0.0.5/24", "web.example.com"),
        ("4. Name moved to a new address", "10.0.0.6/24", "web.example.com"),
        ("5. IPv6 address added", "2001:db8::5/64", "web.example.com"),
        ("6. Address deleted", "10.0.0.6/24", ""),
    ];

    for (title, address, dns_name) in steps {
        println!("\n{}: {} {:?}", title, address, dns_name);
        let report = engine.reconcile_raw(address, dns_name).await?;
        for line in report.applied_lines() {
            println!("  applied: {}", line);
        }
        for line in report.failure_lines() {
            println!("  failed:  {}", line);
        }
        println!("  records:");
        show(&store).await;
    }

    println!("\n7. Replaying the last event changes nothing:");
    let report = engine.reconcile_raw("10.0.0.6/24", "").await?;
    println!("  {}", report);

    println!("\n=== Embedding Successful ===");
    Ok(())
}
