// # RFC 2136 Backend Real Environment Validation Tool
//
// Reconciles a single address against real DNS servers described by a zone
// file, then prints what was (or would have been) changed.
//
// ## Usage
//
// ```bash
// # Dry-run mode (default - safe)
// IPAMDNS_ZONES_FILE=/etc/ipamdns/zones.json \
// IPAMDNS_TEST_ADDRESS=10.0.0.5/24 \
// IPAMDNS_TEST_NAME=ipamdns-test.example.com \
// cargo run --bin rfc2136_validation
//
// # Live mode (makes actual changes!)
// IPAMDNS_MODE=live \
// IPAMDNS_ZONES_FILE=/etc/ipamdns/zones.json \
// IPAMDNS_TEST_ADDRESS=10.0.0.5/24 \
// IPAMDNS_TEST_NAME=ipamdns-test.example.com \
// cargo run --bin rfc2136_validation
// ```
//
// ## Environment Variables
//
// Required:
// - `IPAMDNS_ZONES_FILE`: Zone table (JSON)
// - `IPAMDNS_TEST_ADDRESS`: Address with optional prefix length
//
// Optional:
// - `IPAMDNS_TEST_NAME`: Name to point at the address (empty clears it)
// - `IPAMDNS_MODE`: "dry-run" or "live" (default: dry-run)

use anyhow::Context;
use ipamdns_core::{BackendRegistry, ReconcileEngine, ServiceConfig, ZoneRegistry};
use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("=== RFC 2136 Backend Real Environment Validation ===");

    let zones_file =
        env::var("IPAMDNS_ZONES_FILE").context("IPAMDNS_ZONES_FILE environment variable is required")?;
    let address = env::var("IPAMDNS_TEST_ADDRESS")
        .context("IPAMDNS_TEST_ADDRESS environment variable is required")?;
    let dns_name = env::var("IPAMDNS_TEST_NAME").unwrap_or_default();
    let mode = env::var("IPAMDNS_MODE").unwrap_or_else(|_| "dry-run".to_string());

    let dry_run = match mode.as_str() {
        "dry-run" => true,
        "live" => false,
        other => anyhow::bail!("IPAMDNS_MODE must be 'dry-run' or 'live', got '{}'", other),
    };

    if dry_run {
        tracing::info!("Mode: DRY-RUN (servers are queried, nothing is changed)");
    } else {
        tracing::warn!("Mode: LIVE (this will change DNS records!)");
    }

    let config = ServiceConfig::from_file(&zones_file)
        .with_context(|| format!("Failed to load {}", zones_file))?;
    let registry = BackendRegistry::with_builtin();
    ipamdns_backend_rfc2136::register(&registry);
    let zones = ZoneRegistry::from_config(&config, &registry, dry_run)?;
    let engine = ReconcileEngine::new(zones);

    tracing::info!("Reconciling {} -> {:?}", address, dns_name);
    let report = engine.reconcile_raw(&address, &dns_name).await?;

    for line in report.applied_lines() {
        tracing::info!("{} {}", if dry_run { "Would apply:" } else { "Applied:" }, line);
    }
    for line in report.failure_lines() {
        tracing::error!("Failed: {}", line);
    }

    if report.is_success() {
        tracing::info!("✓ Validation completed: {}", report);
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!("✗ Validation failed: {}", report);
        Ok(ExitCode::FAILURE)
    }
}
