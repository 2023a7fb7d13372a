use crate::{scan_lower_bound, KvPair, KvStore, StorageError, WriteBatch, WriteOp};
use sled::{Db, Tree};
use std::path::Path;
use tracing::debug;

const MONETARY_TREE: &str = "monetary";

/// Sled-backed implementation
pub struct SledStore {
    db: Db,
    tree: Tree,
}

impl SledStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Store backed by a temporary sled database removed on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(MONETARY_TREE)?;
        debug!(target: "storage", entries = tree.len(), "opened monetary tree");
        Ok(Self { db, tree })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn scan(
        &self,
        prefix: &[u8],
        start: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<KvPair>, StorageError> {
        let lower = scan_lower_bound(prefix, start);
        let mut out = Vec::new();
        for item in self.tree.range(lower..) {
            if limit.is_some_and(|l| out.len() >= l) {
                break;
            }
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    fn apply_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut sled_batch = sled::Batch::default();
        for op in batch.into_ops() {
            match op {
                WriteOp::Put(key, value) => sled_batch.insert(key, value),
                WriteOp::Delete(key) => sled_batch.remove(key),
            }
        }
        self.tree.apply_batch(sled_batch)?;
        Ok(())
    }
}
