//! Durable storage backend backed by a `sled` database.
//!
//! All buckets share the default tree. A bucket is a key prefix
//! `bucket || 0x00`, which lets a single `sled::Batch` cover writes to
//! several buckets and keeps batches atomic.

use super::{Storage, WriteBatch};
use crate::error::{Error, Result};
use std::path::Path;

const BUCKET_SEPARATOR: u8 = 0x00;

/// `sled`-backed storage. The database lock is released when the handle is dropped.
pub struct SledStorage {
    db: sled::Db,
}

impl SledStorage {
    /// Open or create a database in the directory at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open {}: {}", path.display(), e)))?;
        log::debug!("Opened sled wallet storage at {}", path.display());
        Ok(Self { db })
    }

    fn prefix(bucket: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(bucket.len() + 1);
        prefix.extend_from_slice(bucket.as_bytes());
        prefix.push(BUCKET_SEPARATOR);
        prefix
    }

    fn scoped_key(bucket: &str, key: &[u8]) -> Vec<u8> {
        let mut scoped = Self::prefix(bucket);
        scoped.extend_from_slice(key);
        scoped
    }
}

impl Storage for SledStorage {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self.db.get(Self::scoped_key(bucket, key))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.insert(Self::scoped_key(bucket, key), value)?;
        self.db.flush()?;
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut sled_batch = sled::Batch::default();
        for put in batch {
            sled_batch.insert(Self::scoped_key(&put.bucket, &put.key), put.value);
        }
        self.db.apply_batch(sled_batch)?;
        self.db.flush()?;
        Ok(())
    }

    fn list(&self, bucket: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let prefix = Self::prefix(bucket);
        let mut entries = Vec::new();
        for item in self.db.scan_prefix(&prefix) {
            let (key, value) = item?;
            entries.push((key[prefix.len()..].to_vec(), value.to_vec()));
        }
        Ok(entries)
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
