//! Public address resolution and change detection

use crate::address::{Address, IpVersion};
use crate::error::{Error, Result};
use crate::traits::{IpLookup, StateStore};
use tracing::{debug, info};

/// Turns raw lookup text into a validated [`Address`]
pub struct IpResolver {
    lookup: Box<dyn IpLookup>,
}

impl IpResolver {
    /// Create a resolver over a lookup service
    pub fn new(lookup: Box<dyn IpLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve the current public address for `version`
    ///
    /// # Errors
    ///
    /// - `Error::Unreachable`: the lookup service could not be reached
    /// - `Error::InvalidAddress`: the service answered with something that
    ///   is not an address
    /// - `Error::VersionMismatch`: the service answered with an address of
    ///   the other version. For a v6 request this means the host has no
    ///   usable IPv6 connectivity; retrying immediately will not help.
    pub async fn resolve(&self, version: IpVersion) -> Result<Address> {
        let text = self.lookup.lookup(version).await?;
        let address = Address::parse(&text)?;

        if address.version() != version {
            return Err(Error::VersionMismatch {
                requested: version,
                received: address.to_string(),
            });
        }

        debug!(
            "Resolved IP{} address {} via {}",
            version,
            address,
            self.lookup.service_name()
        );
        Ok(address)
    }

    /// Resolve and compare against the stored address
    ///
    /// Returns `None` when the current address equals the stored one, and
    /// the current address otherwise. Nothing is written to the store:
    /// committing is the engine's job once every downstream update worked.
    pub async fn detect_change(
        &self,
        version: IpVersion,
        store: &dyn StateStore,
    ) -> Result<Option<Address>> {
        let current = self.resolve(version).await?;
        info!("Current IP{} address: {}", version, current);

        let stored = store.load(version).await?;
        if stored == Some(current) {
            info!("Same as stored, nothing to do");
            return Ok(None);
        }

        debug!(
            "IP{} address changed: {} -> {}",
            version,
            stored.map(|a| a.to_string()).unwrap_or_else(|| "<none>".to_string()),
            current
        );
        Ok(Some(current))
    }
}
