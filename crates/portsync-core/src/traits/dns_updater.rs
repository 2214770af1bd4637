// # DNS Record Updater Trait
//
// Defines the interface for pushing an address into a provider-side record.
//
// ## Implementations
//
// - Cloudflare: `portsync-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use portsync_core::{Address, DnsRecordUpdater, RecordTarget};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let updater = /* DnsRecordUpdater implementation */;
//     let target = RecordTarget::new("zone-id", "record-id");
//     let ok = updater.update(&target, &Address::parse("2001:db8::1")?).await?;
//     assert!(ok);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;

/// One provider-side record kept in sync
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordTarget {
    /// Zone identifier
    pub zone_id: String,
    /// Record identifier within the zone
    pub record_id: String,
}

impl RecordTarget {
    /// Create a new record target
    pub fn new(zone_id: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            record_id: record_id.into(),
        }
    }
}

impl fmt::Display for RecordTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zone_id, self.record_id)
    }
}

/// Trait for DNS record updaters
///
/// # Contract
///
/// - **Full replace**: the record content is overwritten with `address`,
///   and the record type (`A`/`AAAA`) is derived from the address version.
///   Applying the same address twice leaves the record as applying it once.
/// - **Report, don't raise**: a response from the provider that is not a
///   success yields `Ok(false)`. Only a provider that cannot be reached at
///   all yields `Err(Error::Unreachable)`.
/// - **Single-shot**: one request per call, no retries. The engine decides
///   what a failure means for the run.
#[async_trait]
pub trait DnsRecordUpdater: Send + Sync {
    /// Point `target` at `address`
    async fn update(&self, target: &RecordTarget, address: &Address)
    -> Result<bool, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
