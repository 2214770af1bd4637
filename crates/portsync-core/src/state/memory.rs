// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Provides a state store that doesn't persist across runs. Useful for
// tests and for embedding the engine in a long-lived process that keeps
// its own persistence.
//
// ## Crash Behavior
//
// - All state is lost when the process exits
// - The first run afterwards treats the current address as changed and
//   re-applies every downstream update (harmless, they are idempotent)

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::address::{Address, IpVersion};
use crate::traits::state_store::{StateStore, check_slot};

/// In-memory state store implementation
///
/// Clones share the same slots, so a test can keep a handle while the
/// engine owns another.
///
/// # Example
///
/// ```rust,no_run
/// use portsync_core::state::MemoryStateStore;
/// use portsync_core::traits::StateStore;
/// use portsync_core::{Address, IpVersion};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///     let addr = Address::parse("2001:db8::1")?;
///
///     store.commit(IpVersion::V6, &addr).await?;
///     assert_eq!(store.load(IpVersion::V6).await?, Some(addr));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<HashMap<IpVersion, Address>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with `address` already committed
    pub fn with_address(address: Address) -> Self {
        let mut slots = HashMap::new();
        slots.insert(address.version(), address);
        Self {
            inner: Arc::new(RwLock::new(slots)),
        }
    }

    /// Check if every slot is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, version: IpVersion) -> Result<Option<Address>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(&version).copied())
    }

    async fn commit(&self, version: IpVersion, address: &Address) -> Result<(), Error> {
        check_slot(version, address)?;
        let mut guard = self.inner.write().await;
        guard.insert(version, *address);
        Ok(())
    }

    async fn invalidate(&self, version: IpVersion) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(&version);
        Ok(())
    }
}
