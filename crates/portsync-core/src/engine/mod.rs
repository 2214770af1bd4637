//! Sync engine
//!
//! The SyncEngine performs one synchronization run:
//! - Detecting an IPv6 change via the IpResolver
//! - Updating every configured DNS record
//! - Pointing every configured router port mapping at the new address
//! - Committing the address only after everything above worked
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ IpResolver  │─── changed address ───┐
//! └─────────────┘                       │
//!                                       ▼
//!                              ┌──────────────┐
//!                              │  SyncEngine  │
//!                              └──────────────┘
//!                                       │
//!         ┌─────────────────┬───────────┴──────┬──────────────────┐
//!         │                 │                  │                  │
//!         ▼                 ▼                  ▼                  ▼
//! ┌──────────────┐ ┌────────────────┐ ┌───────────────┐ ┌─────────────┐
//! │ StateStore   │ │ DnsRecord      │ │ RouterSession │ │   Events    │
//! │ (commit /    │ │ Updater        │ │ (mappings)    │ │  (notify)   │
//! │  invalidate) │ └────────────────┘ └───────────────┘ └─────────────┘
//! └──────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Resolve the public IPv6 address and compare with the stored one
//! 2. Unchanged: stop, nothing is touched
//! 3. Update each DNS record in configuration order
//! 4. Log in to the router once and edit each mapping in order
//! 5. All succeeded: commit the address
//! 6. Anything in 3-4 failed: invalidate the stored address so the next
//!    run re-applies everything, then report the original failure

use crate::address::{Address, IpVersion};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::resolver::IpResolver;
use crate::session::{Credentials, RouterProfile, RouterSession};
use crate::traits::{BrowserDriverFactory, DnsRecordUpdater, RecordTarget, StateStore};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Capacity of the engine event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The public address equals the stored one; nothing was touched
    Unchanged { address: Address },

    /// Every record and mapping now points at `address`, and it is stored
    Synced {
        address: Address,
        /// DNS records updated
        records: usize,
        /// Router mappings updated
        mappings: usize,
    },
}

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The public address differs from the stored one
    ChangeDetected { address: Address },

    /// A DNS record accepted the new address
    RecordUpdated { target: RecordTarget, address: Address },

    /// A router mapping was pointed at the new address
    MappingUpdated { name: String, address: Address },

    /// The address was stored as fully propagated
    Committed { address: Address, at: DateTime<Utc> },

    /// Propagation failed and the stored address was invalidated
    RolledBack { address: Address, error: String },
}

/// One-shot synchronization engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Call [`SyncEngine::run_once()`]
/// 3. Drop; the next run is started by the scheduler
///
/// Only the IPv6 slot of the state store is used. Runs must not overlap:
/// the engine does no locking of its own.
pub struct SyncEngine {
    /// Public address resolution
    resolver: IpResolver,

    /// DNS provider for updating records
    dns_updater: Box<dyn DnsRecordUpdater>,

    /// Last fully propagated address
    state_store: Box<dyn StateStore>,

    /// One browser per run
    browser_factory: Box<dyn BrowserDriverFactory>,

    /// DNS records to update, in order
    records: Vec<RecordTarget>,

    /// Router mapping entries to update, in order
    mapping_names: Vec<String>,

    profile: RouterProfile,
    credentials: Credentials,
    element_timeout: Duration,
    screenshot_dir: Option<PathBuf>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// engine events. Events are dropped with a warning when nobody drains
    /// the receiver.
    pub fn new(
        resolver: IpResolver,
        dns_updater: Box<dyn DnsRecordUpdater>,
        state_store: Box<dyn StateStore>,
        browser_factory: Box<dyn BrowserDriverFactory>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            resolver,
            dns_updater,
            state_store,
            browser_factory,
            records: config.dns.targets(),
            profile: RouterProfile::with_base_url(&config.router.base_url),
            credentials: config.router.credentials(),
            element_timeout: Duration::from_secs(config.router.element_timeout_secs),
            screenshot_dir: config.browser.screenshot_dir(),
            mapping_names: config.router.mapping_names,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Perform one synchronization run
    ///
    /// # Errors
    ///
    /// - Resolver errors are returned as-is; the stored address is untouched
    /// - `Error::DnsRejected`: a DNS record did not accept the update
    /// - Router session errors (`Authentication`, `Navigation`,
    ///   `MappingNotFound`, `MappingEdit`, `Driver`, ...)
    /// - `Error::StateStore`: the new address could not be committed
    ///
    /// After a DNS or router failure the stored address has been
    /// invalidated.
    pub async fn run_once(&self) -> Result<SyncOutcome> {
        let version = IpVersion::V6;

        let Some(address) = self
            .resolver
            .detect_change(version, self.state_store.as_ref())
            .await?
        else {
            let address = self.state_store.load(version).await?.ok_or_else(|| {
                Error::state_store("Stored address disappeared during the run")
            })?;
            return Ok(SyncOutcome::Unchanged { address });
        };

        self.emit_event(SyncEvent::ChangeDetected { address });

        match self.propagate(&address).await {
            Ok((records, mappings)) => {
                self.state_store.commit(version, &address).await?;
                info!("Committed IP{} address {}", version, address);
                self.emit_event(SyncEvent::Committed {
                    address,
                    at: Utc::now(),
                });
                Ok(SyncOutcome::Synced {
                    address,
                    records,
                    mappings,
                })
            }
            Err(e) => {
                self.rollback(version, &address, &e).await;
                Err(e)
            }
        }
    }

    /// Push `address` to every DNS record, then every router mapping
    async fn propagate(&self, address: &Address) -> Result<(usize, usize)> {
        let records = self.update_records(address).await?;
        let mappings = self.update_mappings(address).await?;
        Ok((records, mappings))
    }

    async fn update_records(&self, address: &Address) -> Result<usize> {
        for target in &self.records {
            debug!(
                "Updating {} record {} via {}",
                address.record_type(),
                target,
                self.dns_updater.provider_name()
            );

            if !self.dns_updater.update(target, address).await? {
                return Err(Error::DnsRejected {
                    provider: self.dns_updater.provider_name().to_string(),
                    record_id: target.record_id.clone(),
                });
            }

            info!("DNS record {} -> {}", target, address);
            self.emit_event(SyncEvent::RecordUpdated {
                target: target.clone(),
                address: *address,
            });
        }

        Ok(self.records.len())
    }

    async fn update_mappings(&self, address: &Address) -> Result<usize> {
        if self.mapping_names.is_empty() {
            debug!("No port mappings configured, skipping router");
            return Ok(0);
        }

        let driver = self.browser_factory.create()?;
        let mut session = RouterSession::new(driver, self.profile.clone(), self.element_timeout)
            .with_screenshots(self.screenshot_dir.clone());

        let result = self.edit_mappings(&mut session, address).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close router session: {}", e);
        }

        result
    }

    async fn edit_mappings(&self, session: &mut RouterSession, address: &Address) -> Result<usize> {
        session.start().await?;
        session.authenticate(&self.credentials).await?;
        session.goto_mapping_page().await?;

        for name in &self.mapping_names {
            session.set_mapping_target(name, address).await?;
            self.emit_event(SyncEvent::MappingUpdated {
                name: name.clone(),
                address: *address,
            });
        }

        Ok(self.mapping_names.len())
    }

    /// Forget the stored address so the next run starts over
    async fn rollback(&self, version: IpVersion, address: &Address, cause: &Error) {
        warn!("Sync of {} failed, invalidating stored address: {}", address, cause);

        if let Err(e) = self.state_store.invalidate(version).await {
            error!("Failed to invalidate stored IP{} address: {}", version, e);
        }

        self.emit_event(SyncEvent::RolledBack {
            address: *address,
            error: cause.to_string(),
        });
    }

    /// Emit an engine event
    fn emit_event(&self, event: SyncEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DnsConfig, RouterConfig};
    use crate::state::MemoryStateStore;
    use crate::traits::{BrowserDriver, IpLookup};
    use async_trait::async_trait;

    struct StaticLookup;

    #[async_trait]
    impl IpLookup for StaticLookup {
        async fn lookup(&self, _version: IpVersion) -> Result<String> {
            Ok("2001:db8::1".to_string())
        }

        fn service_name(&self) -> &'static str {
            "static"
        }
    }

    struct AcceptAll;

    #[async_trait]
    impl DnsRecordUpdater for AcceptAll {
        async fn update(&self, _target: &RecordTarget, _address: &Address) -> Result<bool> {
            Ok(true)
        }

        fn provider_name(&self) -> &'static str {
            "accept-all"
        }
    }

    struct NoBrowser;

    impl BrowserDriverFactory for NoBrowser {
        fn create(&self) -> Result<Box<dyn BrowserDriver>> {
            Err(Error::driver("no browser in unit tests"))
        }
    }

    fn config() -> SyncConfig {
        SyncConfig {
            dns: DnsConfig {
                api_token: "token".to_string(),
                zone_id: "zone".to_string(),
                record_ids: vec!["rec-1".to_string(), "rec-2".to_string()],
            },
            router: RouterConfig::default(),
            ..SyncConfig::default()
        }
    }

    fn engine(
        config: SyncConfig,
        store: MemoryStateStore,
    ) -> Result<(SyncEngine, mpsc::Receiver<SyncEvent>)> {
        SyncEngine::new(
            IpResolver::new(Box::new(StaticLookup)),
            Box::new(AcceptAll),
            Box::new(store),
            Box::new(NoBrowser),
            config,
        )
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config();
        config.dns.record_ids.clear();

        let result = engine(config, MemoryStateStore::new());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_dns_only_run_skips_browser() {
        let store = MemoryStateStore::new();
        let (engine, mut events) = engine(config(), store.clone()).unwrap();

        let outcome = engine.run_once().await.unwrap();
        let address = Address::parse("2001:db8::1").unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                address,
                records: 2,
                mappings: 0
            }
        );
        assert_eq!(store.load(IpVersion::V6).await.unwrap(), Some(address));

        assert_eq!(events.recv().await, Some(SyncEvent::ChangeDetected { address }));
        assert!(matches!(events.recv().await, Some(SyncEvent::RecordUpdated { .. })));
        assert!(matches!(events.recv().await, Some(SyncEvent::RecordUpdated { .. })));
        assert!(matches!(events.recv().await, Some(SyncEvent::Committed { .. })));
    }

    #[tokio::test]
    async fn test_unchanged_reports_stored_address() {
        let address = Address::parse("2001:db8::1").unwrap();
        let store = MemoryStateStore::with_address(address);
        let (engine, mut events) = engine(config(), store).unwrap();

        assert_eq!(
            engine.run_once().await.unwrap(),
            SyncOutcome::Unchanged { address }
        );
        assert!(events.try_recv().is_err(), "no events when nothing changed");
    }

    #[tokio::test]
    async fn test_factory_failure_rolls_back() {
        let mut config = config();
        config.router.username = "admin".to_string();
        config.router.mapping_names = vec!["nas".to_string()];

        let store = MemoryStateStore::with_address(Address::parse("2001:db8::9").unwrap());
        let (engine, _events) = engine(config, store.clone()).unwrap();

        let err = engine.run_once().await.unwrap_err();
        assert!(matches!(err, Error::Driver(_)));
        assert_eq!(store.load(IpVersion::V6).await.unwrap(), None);
    }
}
