// # State Store Trait
//
// Defines the interface for remembering the last propagated address.
//
// ## Purpose
//
// One slot per IP version holds either nothing or the address that was
// last pushed to every downstream system. A run compares the current
// public address against it to decide whether there is work to do.
//
// ## Lifecycle
//
// - Empty on first run
// - Overwritten by the engine after a fully successful run
// - Cleared by the engine when any downstream update failed, so the next
//   run re-applies everything
//
// ## Implementations
//
// - File-based: one plain-text file per version
// - Memory: tests and embedding

use async_trait::async_trait;

use crate::address::{Address, IpVersion};

/// Trait for state store implementations
///
/// # Durability
///
/// `commit` and `invalidate` must be atomic with respect to a crash: after
/// a crash the slot holds either the old or the new content, never a torn
/// write.
///
/// # Validation
///
/// `load` never returns unvalidated text. Slot content that does not parse
/// as an address of the slot's version is reported as empty.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the slot for `version`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Address))`: The last synchronized address
    /// - `Ok(None)`: Nothing stored (including a missing file)
    /// - `Err(Error)`: Storage error
    async fn load(&self, version: IpVersion) -> Result<Option<Address>, crate::Error>;

    /// Overwrite the slot for `version` with `address`
    ///
    /// Fails with `Error::InvalidInput` when `address` is not of `version`.
    async fn commit(&self, version: IpVersion, address: &Address) -> Result<(), crate::Error>;

    /// Clear the slot for `version`
    ///
    /// This is the rollback primitive: the next run sees no stored address
    /// and treats the current one as changed.
    async fn invalidate(&self, version: IpVersion) -> Result<(), crate::Error>;
}

pub(crate) fn check_slot(version: IpVersion, address: &Address) -> Result<(), crate::Error> {
    if address.version() != version {
        return Err(crate::Error::invalid_input(format!(
            "cannot store {} address {} in the IP{} slot",
            address.version(),
            address,
            version
        )));
    }
    Ok(())
}
