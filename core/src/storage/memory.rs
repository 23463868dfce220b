//! In-memory storage backend.

use super::{Storage, WriteBatch};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Buckets = HashMap<String, BTreeMap<Vec<u8>, Vec<u8>>>;

/// Simple in-memory storage. Contents are lost when the handle is dropped.
#[derive(Default)]
pub struct MemoryStorage {
    buckets: RwLock<Buckets>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Buckets>> {
        self.buckets
            .read()
            .map_err(|e| Error::Storage(format!("memory storage lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Buckets>> {
        self.buckets
            .write()
            .map_err(|e| Error::Storage(format!("memory storage lock poisoned: {}", e)))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let buckets = self.read()?;
        Ok(buckets.get(bucket).and_then(|b| b.get(key)).cloned())
    }

    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let mut buckets = self.write()?;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        // One write guard for the whole batch: readers see all puts or none.
        let mut buckets = self.write()?;
        for put in batch {
            buckets
                .entry(put.bucket)
                .or_default()
                .insert(put.key, put.value);
        }
        Ok(())
    }

    fn list(&self, bucket: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let buckets = self.read()?;
        Ok(buckets
            .get(bucket)
            .map(|b| b.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
