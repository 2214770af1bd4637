//! Core traits for portsync
//!
//! This module defines the narrow interfaces to the outside world:
//!
//! - [`IpLookup`]: Ask an external service for the public address
//! - [`DnsRecordUpdater`]: Push an address into one provider-side record
//! - [`StateStore`]: Remember the last fully propagated address
//! - [`BrowserDriver`]: Drive the router's admin UI

pub mod browser;
pub mod dns_updater;
pub mod ip_lookup;
pub mod state_store;

pub use browser::{BrowserDriver, BrowserDriverFactory, Locator};
pub use dns_updater::{DnsRecordUpdater, RecordTarget};
pub use ip_lookup::IpLookup;
pub use state_store::StateStore;
