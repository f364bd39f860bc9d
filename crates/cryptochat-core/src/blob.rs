//! Named byte-blob persistence
//!
//! The store only needs get/put/delete by name. [`SledBlobStore`] keeps blobs
//! in a sled database and flushes after every write; [`MemoryBlobStore`] is
//! the in-process variant used by tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};

/// Blob holding the profile account
pub const PROFILE_BLOB: &str = "profile";
/// Blob holding the PEM private key as a JSON string
pub const PRIVATE_KEY_BLOB: &str = "privateKey";
/// Blob holding the contact array
pub const CONTACTS_BLOB: &str = "contacts";
/// Blob holding the message array
pub const MESSAGES_BLOB: &str = "messages";

/// Key/value byte-blob persistence
pub trait BlobStore: Send + Sync {
    /// Read a blob; `None` when it was never written or was deleted
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Write a blob durably
    fn put(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Remove a blob; removing an absent blob is not an error
    fn delete(&self, name: &str) -> Result<()>;
}

/// In-memory blob store (for testing)
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_blob: RwLock<Option<String>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `put`/`delete` fail with a storage error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `put`/`delete` of one named blob fail, or none with `None`
    pub fn set_fail_blob(&self, name: Option<&str>) {
        *self.fail_blob.write() = name.map(str::to_string);
    }

    /// Names of the blobs currently present
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.blobs.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn check_writable(&self, name: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("blob store is not writable".to_string()));
        }
        if self.fail_blob.read().as_deref() == Some(name) {
            return Err(Error::Storage(format!("blob {} is not writable", name)));
        }
        Ok(())
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(name).cloned())
    }

    fn put(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.check_writable(name)?;
        self.blobs.write().insert(name.to_string(), bytes.to_vec());
        debug!("Stored blob {}: {} bytes", name, bytes.len());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.check_writable(name)?;
        if self.blobs.write().remove(name).is_some() {
            debug!("Deleted blob {}", name);
        }
        Ok(())
    }
}

/// Sled-based persistent blob store
pub struct SledBlobStore {
    db: sled::Db,
}

impl SledBlobStore {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Size of the database on disk
    pub fn size_bytes(&self) -> u64 {
        self.db.size_on_disk().unwrap_or(0)
    }
}

impl BlobStore for SledBlobStore {
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(name)?.map(|v| v.to_vec()))
    }

    fn put(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.db.insert(name, bytes)?;
        self.db.flush()?;
        debug!("Stored blob {}: {} bytes", name, bytes.len());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        if self.db.remove(name)?.is_some() {
            debug!("Deleted blob {}", name);
        }
        self.db.flush()?;
        Ok(())
    }
}
