// # ipamdnsd - IPAM to DNS Daemon
//
// The ipamdnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Loading the zone table and creating one backend per zone
// 3. Initializing logging and the runtime
// 4. Serving the webhook receiver until SIGTERM/SIGINT
//
// It is a thin integration layer: reconciliation lives in ipamdns-core,
// request handling in ipamdns-webhook.
//
// ## Configuration
//
// - `IPAMDNS_ZONES_FILE`: Path to the JSON zone table (required)
// - `IPAMDNS_LISTEN`: Listen address (default `0.0.0.0:7001`)
// - `IPAMDNS_WEBHOOK_SECRET`: Shared secret for `X-Hook-Signature` (optional)
// - `IPAMDNS_MODE`: `live` (default) or `dry-run`; dry-run queries the real
//   servers but never changes them
// - `IPAMDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info);
//   `RUST_LOG` overrides it with a full filter
// - `RUST_LOG_FORMAT`: `text` (default) or `json`
//
// ## Example
//
// ```bash
// export IPAMDNS_ZONES_FILE=/etc/ipamdns/zones.json
// export IPAMDNS_WEBHOOK_SECRET='VERY RANDOM STRING'
//
// ipamdnsd
// ```

use anyhow::{Context, Result};
use ipamdns_core::{BackendRegistry, ReconcileEngine, ServiceConfig, ZoneRegistry};
use ipamdns_webhook::{WebhookSecret, WebhookState};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default listen address
const DEFAULT_LISTEN: &str = "0.0.0.0:7001";

/// How long in-flight requests may run after a shutdown signal
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    zones_file: PathBuf,
    listen: String,
    /// ⚠️ NEVER log this value
    webhook_secret: Option<String>,
    mode: String,
    log_level: String,
    log_format: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            zones_file: lookup("IPAMDNS_ZONES_FILE")
                .map(PathBuf::from)
                .context("IPAMDNS_ZONES_FILE is required")?,
            listen: lookup("IPAMDNS_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            webhook_secret: lookup("IPAMDNS_WEBHOOK_SECRET"),
            mode: lookup("IPAMDNS_MODE").unwrap_or_else(|| "live".to_string()),
            log_level: lookup("IPAMDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: lookup("RUST_LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.zones_file.as_os_str().is_empty() {
            anyhow::bail!(
                "IPAMDNS_ZONES_FILE cannot be empty. \
                Set it via: export IPAMDNS_ZONES_FILE=/etc/ipamdns/zones.json"
            );
        }

        if !self.zones_file.is_file() {
            anyhow::bail!(
                "IPAMDNS_ZONES_FILE does not point to a file: {}",
                self.zones_file.display()
            );
        }

        self.listen_addr()?;

        if self.webhook_secret.as_ref().is_some_and(|s| s.is_empty()) {
            anyhow::bail!("IPAMDNS_WEBHOOK_SECRET is set but empty. Unset it or provide a secret.");
        }

        match self.mode.to_lowercase().as_str() {
            "live" | "dry-run" => {}
            _ => anyhow::bail!(
                "IPAMDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IPAMDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        match self.log_format.to_lowercase().as_str() {
            "text" | "json" => {}
            _ => anyhow::bail!(
                "RUST_LOG_FORMAT '{}' is not valid. Valid formats: text, json",
                self.log_format
            ),
        }

        Ok(())
    }

    fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .with_context(|| format!("IPAMDNS_LISTEN '{}' is not a socket address", self.listen))
    }

    fn dry_run(&self) -> bool {
        self.mode.eq_ignore_ascii_case("dry-run")
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase()));

    let result = match config.log_format.to_lowercase().as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .json()
            .try_init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

/// Create the backends and the engine
fn build_engine(config: &Config) -> Result<ReconcileEngine> {
    let service = ServiceConfig::from_file(&config.zones_file)?;

    let registry = BackendRegistry::with_builtin();
    #[cfg(feature = "rfc2136")]
    ipamdns_backend_rfc2136::register(&registry);
    info!("Registered backends: {}", registry.list_backends().join(", "));

    let zones = ZoneRegistry::from_config(&service, &registry, config.dry_run())?;
    Ok(ReconcileEngine::new(zones))
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    if let Err(e) = init_logging(&config) {
        eprintln!("{}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting ipamdnsd daemon");
    if config.dry_run() {
        warn!("Running in DRY-RUN mode - DNS will be queried but never changed");
    }

    let engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };
    info!("Configuration loaded: {} zone(s)", engine.zones().len());

    let secret = config.webhook_secret.as_deref().map(WebhookSecret::new);
    let state = WebhookState::new(Arc::new(engine), secret);
    if !state.requires_signature() {
        warn!("IPAMDNS_WEBHOOK_SECRET not set - webhook requests are not authenticated");
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(&config, state).await {
            error!("Daemon error: {:#}", e);
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: &Config, state: WebhookState) -> Result<()> {
    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind webhook receiver to {}", addr))?;

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(ipamdns_webhook::serve(listener, state, async {
        let _ = stop_rx.await;
    }));

    info!("Daemon initialized successfully");

    tokio::select! {
        signal = wait_for_shutdown() => {
            let signal = signal?;
            info!("Received shutdown signal: {}", signal);
        }
        finished = &mut server => {
            // The server only returns on its own when it fails
            finished.context("Webhook receiver task failed")??;
            anyhow::bail!("Webhook receiver stopped unexpectedly");
        }
    }

    info!("Shutting down daemon");
    let _ = stop_tx.send(());
    match tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, server).await {
        Ok(joined) => {
            joined.context("Webhook receiver task failed")??;
            Ok(())
        }
        Err(_) => Err(anyhow::anyhow!(
            "Shutdown timeout after {:?}",
            SHUTDOWN_DRAIN_TIMEOUT
        )),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
