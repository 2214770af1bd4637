// # portsync
//
// One synchronization run, meant to be started by a scheduler (cron,
// systemd timer, Task Scheduler):
//
// 1. Read configuration from environment variables
// 2. Resolve the public IPv6 address and compare it with the stored one
// 3. On change: update the Cloudflare records, then the router's IPv6 port
//    mappings, then store the address
// 4. Exit with a code describing the single condition that ended the run
//
// This is a thin integration layer. All sync logic lives in portsync-core.
//
// ## Configuration
//
// ### DNS
// - `PORTSYNC_CLOUDFLARE_API_TOKEN`: API token (required)
// - `PORTSYNC_CLOUDFLARE_ZONE_ID`: Zone ID (required)
// - `PORTSYNC_CLOUDFLARE_RECORD_IDS`: Comma-separated record IDs (required)
//
// ### Router
// - `PORTSYNC_ROUTER_URL`: Admin panel root (default http://192.168.1.1)
// - `PORTSYNC_ROUTER_USERNAME` / `PORTSYNC_ROUTER_PASSWORD`: Credentials
// - `PORTSYNC_ROUTER_MAPPING_NAMES`: Comma-separated mapping entry names
// - `PORTSYNC_ROUTER_TIMEOUT_SECS`: Element wait bound, 1-600 (default 60)
//
// ### Browser
// - `PORTSYNC_WEBDRIVER_URL`: WebDriver server (default http://localhost:4444)
// - `PORTSYNC_BROWSER_CHANNEL`: msedge, chrome, chromium, firefox
// - `PORTSYNC_HEADLESS`: true/false (default true)
// - `PORTSYNC_SCREENSHOTS`: true/false (default true)
// - `PORTSYNC_SCREENSHOT_DIR`: Directory for screenshots (default ./screenshots)
//
// ### State and lookup
// - `PORTSYNC_STATE_DIR`: Directory holding ipv4.txt / ipv6.txt (default .)
// - `PORTSYNC_IPV4_LOOKUP_URL` / `PORTSYNC_IPV6_LOOKUP_URL`: Lookup endpoints
// - `PORTSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export PORTSYNC_CLOUDFLARE_API_TOKEN=your_token
// export PORTSYNC_CLOUDFLARE_ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
// export PORTSYNC_CLOUDFLARE_RECORD_IDS=372e67954025e0ba6aaa6d586b9e0b59
// export PORTSYNC_ROUTER_USERNAME=admin
// export PORTSYNC_ROUTER_PASSWORD=secret
// export PORTSYNC_ROUTER_MAPPING_NAMES=nas,home-server-1
//
// portsync
// ```

use anyhow::{Context, Result};
use portsync_core::{
    BrowserChannel, Error, FailureKind, FileStateStore, IpResolver, SyncConfig, SyncEngine,
    SyncOutcome,
};
use portsync_ip_http::HttpIpLookup;
use portsync_provider_cloudflare::CloudflareUpdater;
use portsync_router_webdriver::WebDriverFactory;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes, one per condition that can end a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortsyncExitCode {
    /// Nothing to do, or everything synced
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Lookup service or DNS provider unreachable, or lookup returned garbage
    Connectivity = 2,
    /// The host has no public IPv6 address
    NoIpv6 = 3,
    /// The DNS provider refused an update
    ProviderRejected = 4,
    /// The router admin panel could not be driven
    RouterAutomation = 5,
    /// State store or unexpected internal failure
    StateError = 6,
}

impl From<PortsyncExitCode> for ExitCode {
    fn from(code: PortsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<FailureKind> for PortsyncExitCode {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Connectivity | FailureKind::InvalidAddress => {
                PortsyncExitCode::Connectivity
            }
            FailureKind::NoIpv6 => PortsyncExitCode::NoIpv6,
            FailureKind::ProviderRejected => PortsyncExitCode::ProviderRejected,
            FailureKind::RouterAutomation => PortsyncExitCode::RouterAutomation,
            FailureKind::Config => PortsyncExitCode::ConfigError,
            FailureKind::State | FailureKind::Internal => PortsyncExitCode::StateError,
        }
    }
}

/// Application settings
struct Settings {
    sync: SyncConfig,
    log_level: Level,
}

impl Settings {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `var`, which returns a variable's value
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut sync = SyncConfig::default();

        sync.dns.api_token = required(&var, "PORTSYNC_CLOUDFLARE_API_TOKEN")?;
        sync.dns.zone_id = required(&var, "PORTSYNC_CLOUDFLARE_ZONE_ID")?;
        sync.dns.record_ids = list(var("PORTSYNC_CLOUDFLARE_RECORD_IDS"));
        if sync.dns.record_ids.is_empty() {
            anyhow::bail!(
                "PORTSYNC_CLOUDFLARE_RECORD_IDS must contain at least one record id. \
                Set it via: export PORTSYNC_CLOUDFLARE_RECORD_IDS=id1,id2"
            );
        }

        if let Some(url) = var("PORTSYNC_ROUTER_URL") {
            sync.router.base_url = url;
        }
        sync.router.username = var("PORTSYNC_ROUTER_USERNAME").unwrap_or_default();
        sync.router.password = var("PORTSYNC_ROUTER_PASSWORD").unwrap_or_default();
        sync.router.mapping_names = list(var("PORTSYNC_ROUTER_MAPPING_NAMES"));
        if let Some(secs) = var("PORTSYNC_ROUTER_TIMEOUT_SECS") {
            sync.router.element_timeout_secs = secs.trim().parse().with_context(|| {
                format!("PORTSYNC_ROUTER_TIMEOUT_SECS must be a number of seconds. Got: {secs}")
            })?;
        }

        if let Some(url) = var("PORTSYNC_WEBDRIVER_URL") {
            sync.browser.webdriver_url = url;
        }
        if let Some(channel) = var("PORTSYNC_BROWSER_CHANNEL") {
            sync.browser.channel = channel.parse::<BrowserChannel>()?;
        }
        if let Some(value) = var("PORTSYNC_HEADLESS") {
            sync.browser.headless = parse_bool("PORTSYNC_HEADLESS", &value)?;
        }
        if let Some(value) = var("PORTSYNC_SCREENSHOTS") {
            sync.browser.screenshots = parse_bool("PORTSYNC_SCREENSHOTS", &value)?;
        }
        if let Some(dir) = var("PORTSYNC_SCREENSHOT_DIR") {
            sync.browser.screenshot_dir = PathBuf::from(dir);
        }

        if let Some(dir) = var("PORTSYNC_STATE_DIR") {
            sync.state.dir = PathBuf::from(dir);
        }
        if let Some(url) = var("PORTSYNC_IPV4_LOOKUP_URL") {
            sync.lookup.ipv4_url = url;
        }
        if let Some(url) = var("PORTSYNC_IPV6_LOOKUP_URL") {
            sync.lookup.ipv6_url = url;
        }

        let log_level = parse_level(&var("PORTSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()))?;

        sync.validate()?;
        Ok(Self { sync, log_level })
    }
}

fn required(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    match var(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => anyhow::bail!("{key} is required. Set it via: export {key}=..."),
    }
}

/// Split a comma-separated variable, dropping empty items
fn list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{key} must be true or false. Got: {value}"),
    }
}

fn parse_level(value: &str) -> Result<Level> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "PORTSYNC_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return PortsyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return PortsyncExitCode::ConfigError.into();
    }

    // One run, no parallelism
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return PortsyncExitCode::StateError.into();
        }
    };

    let code = match rt.block_on(run(settings.sync)) {
        Ok(outcome) => {
            info!("{}", describe_outcome(&outcome));
            PortsyncExitCode::Success
        }
        Err(e) => {
            error!("{}", describe_failure(&e));
            PortsyncExitCode::from(e.kind())
        }
    };

    code.into()
}

/// Wire the concrete components together and perform one run
async fn run(config: SyncConfig) -> portsync_core::Result<SyncOutcome> {
    info!(
        "Starting portsync: {} DNS record(s), {} port mapping(s)",
        config.dns.record_ids.len(),
        config.router.mapping_names.len()
    );

    let lookup = HttpIpLookup::from_config(&config.lookup)?;
    let updater = CloudflareUpdater::new(config.dns.api_token.clone())?;
    let state_store = FileStateStore::new(&config.state.dir).await?;
    let browser_factory = WebDriverFactory::new(&config.browser)?;

    let (engine, mut events) = SyncEngine::new(
        IpResolver::new(Box::new(lookup)),
        Box::new(updater),
        Box::new(state_store),
        Box::new(browser_factory),
        config,
    )?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Sync event: {:?}", event);
        }
    });

    engine.run_once().await
}

fn describe_outcome(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Unchanged { address } => {
            format!("IPv6 address unchanged ({address}), nothing to do")
        }
        SyncOutcome::Synced {
            address,
            records,
            mappings,
        } => format!(
            "Synced {address}: {records} DNS record(s), {mappings} port mapping(s)"
        ),
    }
}

/// One line naming the condition that ended the run
fn describe_failure(err: &Error) -> String {
    match err.kind() {
        FailureKind::Config => format!("Configuration error: {err}"),
        FailureKind::Connectivity | FailureKind::InvalidAddress => {
            format!("Connectivity failure: {err}")
        }
        FailureKind::NoIpv6 => format!("No public IPv6 address: {err}"),
        FailureKind::ProviderRejected => format!("DNS provider rejected the update: {err}"),
        FailureKind::RouterAutomation => {
            format!("Router automation failed at step {}: {err}", router_step(err))
        }
        FailureKind::State => format!("State store failure: {err}"),
        FailureKind::Internal => format!("Internal error: {err}"),
    }
}

fn router_step(err: &Error) -> String {
    match err {
        Error::Authentication(_) => "login".to_string(),
        Error::Navigation(_) => "open port mapping page".to_string(),
        Error::MappingNotFound { name } | Error::MappingEdit { name, .. } => {
            format!("edit mapping '{name}'")
        }
        _ => "browser control".to_string(),
    }
}
