// # File State Store
//
// File-based implementation of StateStore.
//
// ## Purpose
//
// Remembers the last propagated address across runs. The tool is started
// by an external scheduler, so this file is the only memory one run has of
// the previous one.
//
// ## File Format
//
// One plain-text file per IP version inside the state directory:
//
// ```text
// <dir>/ipv4.txt   empty, or e.g. 203.0.113.7
// <dir>/ipv6.txt   empty, or e.g. 2001:db8::1
// ```
//
// ## Crash Safety
//
// - Atomic writes: content goes to `<file>.tmp`, is fsynced, then renamed
//   over the slot. A crash leaves either the old or the new content.
// - Corruption: content that is not an address of the slot's version is
//   treated as empty (logged), so the next run re-applies everything.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::address::{Address, IpVersion};
use crate::traits::state_store::{StateStore, check_slot};

/// File-based state store
///
/// # Example
///
/// ```rust,no_run
/// use portsync_core::state::FileStateStore;
/// use portsync_core::traits::StateStore;
/// use portsync_core::{Address, IpVersion};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/portsync").await?;
///
///     // Atomically written to /var/lib/portsync/ipv6.txt
///     store.commit(IpVersion::V6, &Address::parse("2001:db8::1")?).await?;
///
///     let addr = store.load(IpVersion::V6).await?;
///     assert_eq!(addr, Some(Address::parse("2001:db8::1")?));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Open the state directory, creating it if needed
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(&dir).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(Self { dir })
    }

    /// Path of the slot file for `version`
    pub fn slot_path(&self, version: IpVersion) -> PathBuf {
        self.dir.join(format!("ipv{}.txt", version.number()))
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(path: &Path) -> PathBuf {
        let mut temp = path.to_path_buf();
        temp.set_extension("txt.tmp");
        temp
    }

    /// Write `content` to the slot atomically
    async fn write_slot(&self, version: IpVersion, content: &str) -> Result<(), Error> {
        let path = self.slot_path(version);
        let temp_path = Self::temp_path(&path);

        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(content.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self, version: IpVersion) -> Result<Option<Address>, Error> {
        let path = self.slot_path(version);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("State file does not exist: {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::state_store(format!(
                    "Failed to read state file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        match Address::parse(&content) {
            Ok(addr) if addr.version() == version => Ok(Some(addr)),
            Ok(addr) => {
                tracing::warn!(
                    "State file {} holds {} address {}, treating as empty",
                    path.display(),
                    addr.version(),
                    addr
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(
                    "State file {} appears corrupted: {}. Treating as empty.",
                    path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    async fn commit(&self, version: IpVersion, address: &Address) -> Result<(), Error> {
        check_slot(version, address)?;
        self.write_slot(version, &address.to_string()).await
    }

    async fn invalidate(&self, version: IpVersion) -> Result<(), Error> {
        self.write_slot(version, "").await
    }
}
