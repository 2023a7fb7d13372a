use crate::{
    prefix_upper_bound, scan_lower_bound, KvPair, KvStore, StorageError, WriteBatch,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use tracing::trace;

/// Write overlay on top of another store.
///
/// Reads see staged writes first. Nothing reaches the base store until
/// [`StagedStore::commit`] applies every staged write as one batch; dropping
/// the overlay discards them.
pub struct StagedStore<'a> {
    base: &'a dyn KvStore,
    overlay: RwLock<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl<'a> StagedStore<'a> {
    pub fn new(base: &'a dyn KvStore) -> Self {
        Self {
            base,
            overlay: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys with a staged write.
    pub fn pending_writes(&self) -> usize {
        self.overlay.read().len()
    }

    pub fn into_batch(self) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for (key, value) in self.overlay.into_inner() {
            match value {
                Some(value) => batch.put(key, value),
                None => batch.delete(key),
            }
        }
        batch
    }

    /// Apply every staged write to the base store atomically.
    pub fn commit(self) -> Result<usize, StorageError> {
        let base = self.base;
        let batch = self.into_batch();
        let count = batch.len();
        if count > 0 {
            base.apply_batch(batch)?;
        }
        trace!(target: "storage", writes = count, "committed staged writes");
        Ok(count)
    }
}

impl KvStore for StagedStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(staged) = self.overlay.read().get(key) {
            return Ok(staged.clone());
        }
        self.base.get(key)
    }

    fn scan(
        &self,
        prefix: &[u8],
        start: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<KvPair>, StorageError> {
        let lower = scan_lower_bound(prefix, start);
        let upper = match prefix_upper_bound(prefix) {
            Some(bound) => Bound::Excluded(bound),
            None => Bound::Unbounded,
        };
        let overlay = self.overlay.read();
        let staged: Vec<_> = overlay
            .range((Bound::Included(lower), upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        drop(overlay);

        // Staged deletes can hide base entries; fetch enough to still fill the page.
        let deletes = staged.iter().filter(|(_, v)| v.is_none()).count();
        let base_limit = limit.map(|l| l.saturating_add(deletes));
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.base.scan(prefix, start, base_limit)?.into_iter().collect();
        for (key, value) in staged {
            match value {
                Some(value) => {
                    merged.insert(key, value);
                }
                None => {
                    merged.remove(&key);
                }
            }
        }
        Ok(merged
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn apply_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut overlay = self.overlay.write();
        for op in batch.into_ops() {
            match op {
                crate::WriteOp::Put(key, value) => {
                    overlay.insert(key, Some(value));
                }
                crate::WriteOp::Delete(key) => {
                    overlay.insert(key, None);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn reads_see_staged_writes_before_commit() {
        let base = MemoryStore::new();
        base.set(b"k", b"old").unwrap();
        let staged = StagedStore::new(&base);
        staged.set(b"k", b"new").unwrap();
        assert_eq!(staged.get(b"k").unwrap(), Some(b"new".to_vec()));
        assert_eq!(base.get(b"k").unwrap(), Some(b"old".to_vec()));
        assert_eq!(staged.commit().unwrap(), 1);
        assert_eq!(base.get(b"k").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn drop_discards_staged_writes() {
        let base = MemoryStore::new();
        {
            let staged = StagedStore::new(&base);
            staged.set(b"k", b"v").unwrap();
            staged.delete(b"missing").unwrap();
        }
        assert!(base.is_empty());
    }

    #[test]
    fn scan_merges_overlay_with_base() {
        let base = MemoryStore::new();
        for i in 0u8..6 {
            base.set(&[0x13, i], &[i]).unwrap();
        }
        let staged = StagedStore::new(&base);
        staged.delete(&[0x13, 0]).unwrap();
        staged.delete(&[0x13, 1]).unwrap();
        staged.set(&[0x13, 9], &[9]).unwrap();
        staged.set(&[0x13, 2], &[42]).unwrap();

        let page = staged.scan(&[0x13], None, Some(3)).unwrap();
        assert_eq!(
            page,
            vec![
                (vec![0x13, 2], vec![42]),
                (vec![0x13, 3], vec![3]),
                (vec![0x13, 4], vec![4]),
            ]
        );

        let all = staged.prefix_scan(&[0x13]).unwrap();
        let keys: Vec<u8> = all.iter().map(|(k, _)| k[1]).collect();
        assert_eq!(keys, vec![2, 3, 4, 5, 9]);
    }

    #[test]
    fn nested_overlays_commit_into_parent() {
        let base = MemoryStore::new();
        let outer = StagedStore::new(&base);
        {
            let inner = StagedStore::new(&outer);
            inner.set(b"a", b"1").unwrap();
            inner.commit().unwrap();
        }
        assert!(base.get(b"a").unwrap().is_none());
        assert_eq!(outer.get(b"a").unwrap(), Some(b"1".to_vec()));
        outer.commit().unwrap();
        assert_eq!(base.get(b"a").unwrap(), Some(b"1".to_vec()));
    }
}
