//! Test doubles and common utilities for architecture contract tests
//!
//! This module provides minimal test doubles that record how the engine
//! drives them, without any network or browser access.

#![allow(dead_code)]

use async_trait::async_trait;
use portsync_core::error::{Error, Result};
use portsync_core::traits::{
    BrowserDriver, BrowserDriverFactory, DnsRecordUpdater, IpLookup, Locator, RecordTarget,
    StateStore,
};
use portsync_core::{
    Address, DnsConfig, IpResolver, IpVersion, MemoryStateStore, RouterConfig, SyncConfig,
    SyncEngine, SyncEvent,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

pub const ZONE_ID: &str = "zone-1";

/// Lookup service answering with fixed text, or failing
pub struct ScriptedLookup {
    answer: std::result::Result<String, String>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedLookup {
    /// Answer every lookup with `text`
    pub fn answering(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every lookup as unreachable
    pub fn unreachable() -> Self {
        Self {
            answer: Err("connection refused".to_string()),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times lookup() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Create a new ScriptedLookup that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            answer: other.answer.clone(),
            call_count: Arc::clone(&other.call_count),
        }
    }
}

#[async_trait]
impl IpLookup for ScriptedLookup {
    async fn lookup(&self, _version: IpVersion) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(text) => Ok(text.clone()),
            Err(msg) => Err(Error::unreachable(msg.clone())),
        }
    }

    fn service_name(&self) -> &'static str {
        "scripted"
    }
}

/// A DNS updater that records every call
#[derive(Clone, Default)]
pub struct RecordingDnsUpdater {
    /// (record id, address) per update() call
    updates: Arc<Mutex<Vec<(String, String)>>>,
    /// Records answering with a non-success status
    rejected: Arc<Vec<String>>,
    /// Fail every call as unreachable
    offline: bool,
}

impl RecordingDnsUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject updates of `record_id`
    pub fn rejecting(record_id: &str) -> Self {
        Self {
            rejected: Arc::new(vec![record_id.to_string()]),
            ..Self::default()
        }
    }

    /// Fail every update as unreachable
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Get the number of times update() was called
    pub fn update_call_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    /// Get (record id, address) pairs in call order
    pub fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsRecordUpdater for RecordingDnsUpdater {
    async fn update(&self, target: &RecordTarget, address: &Address) -> Result<bool> {
        assert_eq!(target.zone_id, ZONE_ID, "zone id must come from config");
        self.updates
            .lock()
            .unwrap()
            .push((target.record_id.clone(), address.to_string()));

        if self.offline {
            return Err(Error::unreachable("provider offline"));
        }
        Ok(!self.rejected.contains(&target.record_id))
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// A browser driver replaying a router admin panel
///
/// Clones share the call log, so the copy handed to the engine can be
/// inspected through the one kept by the test.
#[derive(Clone, Default)]
pub struct ScriptedBrowser {
    /// One line per driver call, e.g. `click #btnApply_ex`
    log: Arc<Mutex<Vec<String>>>,
    /// Rendered text of the mapping table rows
    rows: Arc<Vec<String>>,
    /// Calls whose log line starts with this prefix fail
    fail_on: Option<String>,
    close_count: Arc<AtomicUsize>,
}

impl ScriptedBrowser {
    /// Panel whose mapping table shows `rows`
    pub fn with_rows(rows: &[&str]) -> Self {
        Self {
            rows: Arc::new(rows.iter().map(|r| r.to_string()).collect()),
            ..Self::default()
        }
    }

    /// Make every call whose log line starts with `prefix` fail
    pub fn failing_on(mut self, prefix: &str) -> Self {
        self.fail_on = Some(prefix.to_string());
        self
    }

    /// Every driver call so far
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Number of calls equal to `call`
    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    /// Get the number of times close() was called
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    fn record(&self, line: String) -> Result<()> {
        let fails = self
            .fail_on
            .as_deref()
            .is_some_and(|prefix| line.starts_with(prefix));
        self.log.lock().unwrap().push(line.clone());

        if fails {
            Err(Error::driver(format!("scripted failure: {line}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BrowserDriver for ScriptedBrowser {
    async fn launch(&mut self) -> Result<()> {
        self.record("launch".to_string())
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.record(format!("navigate {url}"))
    }

    async fn invoke(&mut self, function: &str) -> Result<()> {
        self.record(format!("invoke {function}"))
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> Result<()> {
        self.record(format!("fill {locator} = {value}"))
    }

    async fn click(&mut self, locator: &Locator) -> Result<()> {
        self.record(format!("click {locator}"))
    }

    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<()> {
        let visible = match locator {
            Locator::Css(_) => true,
            Locator::TableRow { text, .. } | Locator::RowCheckbox { text, .. } => {
                self.rows.iter().any(|row| row.contains(text.as_str()))
            }
        };

        let timed_out = Error::ElementTimeout {
            locator: locator.to_string(),
            timeout_secs: timeout.as_secs(),
        };
        match self.record(format!("wait {locator}")) {
            Ok(()) if visible => Ok(()),
            _ => Err(timed_out),
        }
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        self.record(format!("screenshot {}", path.display()))
    }

    async fn close(&mut self) -> Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.record("close".to_string())
    }
}

/// Hands out clones of one ScriptedBrowser
pub struct ScriptedBrowserFactory {
    browser: ScriptedBrowser,
    create_count: Arc<AtomicUsize>,
}

impl ScriptedBrowserFactory {
    pub fn new(browser: &ScriptedBrowser) -> Self {
        Self {
            browser: browser.clone(),
            create_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times create() was called
    pub fn create_count(&self) -> usize {
        self.create_count.load(Ordering::SeqCst)
    }

    /// Create a new factory that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            browser: other.browser.clone(),
            create_count: Arc::clone(&other.create_count),
        }
    }
}

impl BrowserDriverFactory for ScriptedBrowserFactory {
    fn create(&self) -> Result<Box<dyn BrowserDriver>> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.browser.clone()))
    }
}

/// MemoryStateStore whose writes can be made to fail
#[derive(Clone, Default)]
pub struct FlakyStateStore {
    inner: MemoryStateStore,
    fail_invalidate: Arc<AtomicBool>,
    invalidate_count: Arc<AtomicUsize>,
    commit_count: Arc<AtomicUsize>,
}

impl FlakyStateStore {
    pub fn new(inner: MemoryStateStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Make invalidate() fail from now on
    pub fn break_invalidate(&self) {
        self.fail_invalidate.store(true, Ordering::SeqCst);
    }

    /// Get the number of times invalidate() was called
    pub fn invalidate_count(&self) -> usize {
        self.invalidate_count.load(Ordering::SeqCst)
    }

    /// Get the number of times commit() was called
    pub fn commit_count(&self) -> usize {
        self.commit_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for FlakyStateStore {
    async fn load(&self, version: IpVersion) -> Result<Option<Address>> {
        self.inner.load(version).await
    }

    async fn commit(&self, version: IpVersion, address: &Address) -> Result<()> {
        self.commit_count.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(version, address).await
    }

    async fn invalidate(&self, version: IpVersion) -> Result<()> {
        self.invalidate_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_invalidate.load(Ordering::SeqCst) {
            return Err(Error::state_store("disk full"));
        }
        self.inner.invalidate(version).await
    }
}

/// Parse an address that is known to be valid
pub fn addr(text: &str) -> Address {
    Address::parse(text).expect("test address parses")
}

/// Helper to create a SyncConfig for testing
///
/// Screenshots are disabled so no directory is created.
pub fn sync_config(record_ids: &[&str], mapping_names: &[&str]) -> SyncConfig {
    let mut config = SyncConfig {
        dns: DnsConfig {
            api_token: "test-token".to_string(),
            zone_id: ZONE_ID.to_string(),
            record_ids: record_ids.iter().map(|r| r.to_string()).collect(),
        },
        router: RouterConfig {
            username: "admin".to_string(),
            password: "secret".to_string(),
            mapping_names: mapping_names.iter().map(|n| n.to_string()).collect(),
            element_timeout_secs: 1,
            ..RouterConfig::default()
        },
        ..SyncConfig::default()
    };
    config.browser.screenshots = false;
    config
}

/// Helper to build an engine over the test doubles
pub fn build_engine(
    lookup: ScriptedLookup,
    dns: &RecordingDnsUpdater,
    store: impl StateStore + 'static,
    factory: &ScriptedBrowserFactory,
    config: SyncConfig,
) -> (SyncEngine, mpsc::Receiver<SyncEvent>) {
    SyncEngine::new(
        IpResolver::new(Box::new(lookup)),
        Box::new(dns.clone()),
        Box::new(store),
        Box::new(ScriptedBrowserFactory::sharing_counters_with(factory)),
        config,
    )
    .expect("engine construction succeeds")
}

/// Collect every event once the engine has been dropped
pub async fn drain_events(rx: mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    ReceiverStream::new(rx).collect().await
}
