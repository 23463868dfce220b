//! Bucketed key-value storage abstraction for wallet persistence.
//!
//! The wallet core is written against the [`Storage`] trait only, so any
//! backend providing get/put/atomic-batch semantics over named buckets can be
//! plugged in. Two backends ship with the crate:
//! - [`MemoryStorage`]: process-local maps, nothing survives a drop
//! - [`SledStorage`]: durable on-disk storage backed by `sled`
//!
//! Buckets used by the wallet:
//! - [`SEEDS_BUCKET`]: the root seed and the next seed of the seed chain
//! - [`FCT_ADDRESSES_BUCKET`]: Factoid (spending) addresses
//! - [`EC_ADDRESSES_BUCKET`]: Entry Credit (credit) addresses

mod disk;
mod memory;

pub use disk::SledStorage;
pub use memory::MemoryStorage;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bucket holding the seed chain state.
pub const SEEDS_BUCKET: &str = "seeds";
/// Bucket holding Factoid addresses keyed by their public string.
pub const FCT_ADDRESSES_BUCKET: &str = "fct-addresses";
/// Bucket holding Entry Credit addresses keyed by their public string.
pub const EC_ADDRESSES_BUCKET: &str = "ec-addresses";

/// A single put inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPut {
    pub bucket: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A set of puts, possibly spanning several buckets, applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    puts: Vec<BatchPut>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put. Later puts to the same bucket/key win.
    pub fn put(&mut self, bucket: &str, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) {
        self.puts.push(BatchPut {
            bucket: bucket.to_string(),
            key: key.as_ref().to_vec(),
            value: value.as_ref().to_vec(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }
}

impl IntoIterator for WriteBatch {
    type Item = BatchPut;
    type IntoIter = std::vec::IntoIter<BatchPut>;

    fn into_iter(self) -> Self::IntoIter {
        self.puts.into_iter()
    }
}

/// Bucketed key-value storage used by the wallet.
///
/// Implementations must make every successful write visible to subsequent
/// reads through the same handle. Backend failures are reported as
/// [`Error::Storage`](crate::Error::Storage); a missing key is never an error.
pub trait Storage: Send + Sync {
    /// Get the value stored under `key` in `bucket`.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key` in `bucket`.
    ///
    /// Overwrites any existing value.
    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()>;

    /// Apply every put of the batch atomically.
    ///
    /// Either all puts become visible or none do.
    fn write_batch(&self, batch: WriteBatch) -> Result<()>;

    /// List all entries of a bucket.
    ///
    /// Callers must not rely on the order of the returned entries.
    fn list(&self, bucket: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Make all previous writes durable.
    fn flush(&self) -> Result<()>;
}

/// Extension trait for storage operations.
///
/// This provides convenience methods built on top of the base `Storage` trait.
/// It's automatically implemented for any type that implements `Storage`.
pub trait StorageExt: Storage {
    /// Store several entries of one bucket atomically.
    fn batch_put(&self, bucket: &str, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<()> {
        let mut batch = WriteBatch::new();
        for (key, value) in entries {
            batch.put(bucket, key, value);
        }
        self.write_batch(batch)
    }

    /// Whether `key` exists in `bucket`.
    fn contains(&self, bucket: &str, key: &[u8]) -> Result<bool> {
        Ok(self.get(bucket, key)?.is_some())
    }
}

// Blanket implementation for all Storage types
impl<T: Storage + ?Sized> StorageExt for T {}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backend {
    /// Purely in-memory storage, lost on close.
    Memory,
    /// Durable `sled` database at the given directory.
    Sled { path: PathBuf },
}

impl Backend {
    /// Open (or create) the selected backend.
    pub fn open(&self) -> Result<Box<dyn Storage>> {
        match self {
            Backend::Memory => Ok(Box::new(MemoryStorage::new())),
            Backend::Sled { path } => Ok(Box::new(SledStorage::open(path)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_put_is_visible() {
        let storage = MemoryStorage::new();
        storage
            .batch_put(
                FCT_ADDRESSES_BUCKET,
                &[
                    (b"a".to_vec(), b"1".to_vec()),
                    (b"b".to_vec(), b"2".to_vec()),
                ],
            )
            .unwrap();

        assert!(storage.contains(FCT_ADDRESSES_BUCKET, b"a").unwrap());
        assert_eq!(
            storage.get(FCT_ADDRESSES_BUCKET, b"b").unwrap(),
            Some(b"2".to_vec())
        );
        assert!(!storage.contains(EC_ADDRESSES_BUCKET, b"a").unwrap());
    }

    #[test]
    fn test_backend_config_from_json() {
        let backend: Backend =
            serde_json::from_str(r#"{"kind":"sled","path":"/tmp/wallet"}"#).unwrap();
        assert_eq!(
            backend,
            Backend::Sled {
                path: PathBuf::from("/tmp/wallet")
            }
        );

        let backend: Backend = serde_json::from_str(r#"{"kind":"memory"}"#).unwrap();
        assert_eq!(backend, Backend::Memory);
    }

    #[test]
    fn test_open_memory_backend() {
        let storage = Backend::Memory.open().unwrap();
        assert_eq!(storage.get(SEEDS_BUCKET, b"current").unwrap(), None);
        storage.put(SEEDS_BUCKET, b"current", b"x").unwrap();
        assert_eq!(
            storage.get(SEEDS_BUCKET, b"current").unwrap(),
            Some(b"x".to_vec())
        );
    }
}
