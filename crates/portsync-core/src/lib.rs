// # portsync-core
//
// Core library for keeping DNS records and router port mappings pointed at
// a host whose public IPv6 address changes.
//
// ## Architecture Overview
//
// - **IpLookup / IpResolver**: Find the current public address and decide
//   whether it differs from the last propagated one
// - **DnsRecordUpdater**: Push the address into provider-side records
// - **RouterSession**: Drive the router admin panel through a BrowserDriver
//   to edit IPv6 port mapping entries
// - **StateStore**: Remember the last fully propagated address
// - **SyncEngine**: One run of detect → update DNS → update router →
//   commit, or invalidate on failure
//
// ## Design Principles
//
// 1. **Library-First**: Everything the binary does is reachable from here
// 2. **Narrow seams**: Network, provider and browser access sit behind traits
// 3. **Commit last**: An address is stored only once every downstream
//    update succeeded; any failure forces a full re-apply on the next run

pub mod address;
pub mod config;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod session;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use address::{Address, IpVersion, version_of};
pub use config::{BrowserChannel, BrowserConfig, DnsConfig, LookupConfig, RouterConfig, StateConfig, SyncConfig};
pub use engine::{SyncEngine, SyncEvent, SyncOutcome};
pub use error::{Error, FailureKind, Result};
pub use resolver::IpResolver;
pub use session::{Credentials, RouterProfile, RouterSession, SessionState};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{
    BrowserDriver, BrowserDriverFactory, DnsRecordUpdater, IpLookup, Locator, RecordTarget,
    StateStore,
};
