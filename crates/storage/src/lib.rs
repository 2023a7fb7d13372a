//! Byte-prefixed key/value storage for the monetary policy state.
//!
//! The economics crate addresses every record through the key layout in
//! [`keys`]. Backends implement [`KvStore`]; writes are grouped in a
//! [`WriteBatch`] so a backend can apply them atomically. [`StagedStore`]
//! buffers writes over any backend and commits them as a single batch.

pub mod keys;
mod memory;
mod sled_store;
mod staged;

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

pub use memory::MemoryStore;
pub use sled_store::SledStore;
pub use staged::StagedStore;

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupted value under key {key}: {reason}")]
    Corrupted { key: String, reason: String },
}

impl StorageError {
    pub fn corrupted(key: &[u8], reason: impl Into<String>) -> Self {
        StorageError::Corrupted {
            key: hex::encode(key),
            reason: reason.into(),
        }
    }
}

/// A key and its value.
pub type KvPair = (Vec<u8>, Vec<u8>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Ordered set of writes applied as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Put(key.into(), value.into()));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Delete(key.into()));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Abstract key/value store.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Entries whose key starts with `prefix`, in ascending key order.
    ///
    /// When `start` is set only keys `>= start` are returned. At most
    /// `limit` entries are returned when a limit is given.
    fn scan(
        &self,
        prefix: &[u8],
        start: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<KvPair>, StorageError>;

    /// Apply every write of the batch, or none of them.
    fn apply_batch(&self, batch: WriteBatch) -> Result<(), StorageError>;

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.apply_batch(batch)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.apply_batch(batch)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<KvPair>, StorageError> {
        self.scan(prefix, None, None)
    }
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn scan(
        &self,
        prefix: &[u8],
        start: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<KvPair>, StorageError> {
        (**self).scan(prefix, start, limit)
    }

    fn apply_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        (**self).apply_batch(batch)
    }
}

/// Read and decode a JSON record.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &[u8],
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON record.
pub fn put_json<T: Serialize>(
    store: &dyn KvStore,
    key: &[u8],
    value: &T,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec(value)?;
    store.set(key, &bytes)
}

/// Read a big-endian `u128` counter; missing keys read as zero.
pub fn get_u128(store: &dyn KvStore, key: &[u8]) -> Result<u128, StorageError> {
    match store.get(key)? {
        Some(bytes) => keys::decode_u128(key, &bytes),
        None => Ok(0),
    }
}

pub fn put_u128(store: &dyn KvStore, key: &[u8], value: u128) -> Result<(), StorageError> {
    store.set(key, &keys::encode_u128(value))
}

/// Read a big-endian `u64` counter; missing keys read as zero.
pub fn get_u64(store: &dyn KvStore, key: &[u8]) -> Result<u64, StorageError> {
    match store.get(key)? {
        Some(bytes) => keys::decode_u64(key, &bytes),
        None => Ok(0),
    }
}

pub fn put_u64(store: &dyn KvStore, key: &[u8], value: u64) -> Result<(), StorageError> {
    store.set(key, &value.to_be_bytes())
}

/// First key after every key that starts with `prefix`, if one exists.
pub(crate) fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last < u8::MAX {
            bound.push(last + 1);
            return Some(bound);
        }
    }
    None
}

/// Lower bound of a prefix scan that may start past the prefix itself.
pub(crate) fn scan_lower_bound(prefix: &[u8], start: Option<&[u8]>) -> Vec<u8> {
    match start {
        Some(start) if start > prefix => start.to_vec(),
        _ => prefix.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_bound_skips_saturated_bytes() {
        assert_eq!(prefix_upper_bound(&[0x13]), Some(vec![0x14]));
        assert_eq!(prefix_upper_bound(&[0x13, 0xFF]), Some(vec![0x14]));
        assert_eq!(prefix_upper_bound(&[0xFF, 0xFF]), None);
    }

    #[test]
    fn lower_bound_prefers_later_start() {
        assert_eq!(scan_lower_bound(&[0x13], None), vec![0x13]);
        assert_eq!(scan_lower_bound(&[0x13], Some(&[0x13, 0x05])), vec![0x13, 0x05]);
        assert_eq!(scan_lower_bound(&[0x13], Some(&[0x01])), vec![0x13]);
    }

    #[test]
    fn json_and_counter_helpers() {
        let store = MemoryStore::new();
        assert_eq!(get_u128(&store, b"c").unwrap(), 0);
        put_u128(&store, b"c", 42).unwrap();
        assert_eq!(get_u128(&store, b"c").unwrap(), 42);

        put_json(&store, b"j", &vec![1u32, 2, 3]).unwrap();
        let back: Option<Vec<u32>> = get_json(&store, b"j").unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));

        store.set(b"bad", &[1, 2, 3]).unwrap();
        assert!(matches!(
            get_u128(&store, b"bad"),
            Err(StorageError::Corrupted { .. })
        ));
    }
}
