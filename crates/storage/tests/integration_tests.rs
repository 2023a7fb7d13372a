use tempfile::TempDir;
use trichain_storage::keys::{self, burn_record_key, sequence_of};
use trichain_storage::{get_json, get_u128, put_json, put_u128, KvStore, SledStore, StagedStore};

#[test]
fn sled_persists_committed_batches_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = SledStore::new(dir.path()).unwrap();
        let staged = StagedStore::new(&store);
        put_u128(&staged, keys::CURRENT_SUPPLY_KEY, 1_000).unwrap();
        put_json(&staged, &burn_record_key(1), &"first").unwrap();
        put_json(&staged, &burn_record_key(2), &"second").unwrap();
        staged.commit().unwrap();
        store.flush().unwrap();
    }

    let store = SledStore::new(dir.path()).unwrap();
    assert_eq!(get_u128(&store, keys::CURRENT_SUPPLY_KEY).unwrap(), 1_000);
    let second: Option<String> = get_json(&store, &burn_record_key(2)).unwrap();
    assert_eq!(second.as_deref(), Some("second"));

    let ids: Vec<u64> = store
        .prefix_scan(&[keys::BURN_RECORD_PREFIX])
        .unwrap()
        .iter()
        .filter_map(|(k, _)| sequence_of(k))
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn discarded_overlay_leaves_sled_untouched() {
    let dir = TempDir::new().unwrap();
    let store = SledStore::new(dir.path()).unwrap();
    put_u128(&store, keys::TOTAL_MINTED_KEY, 5).unwrap();
    {
        let staged = StagedStore::new(&store);
        put_u128(&staged, keys::TOTAL_MINTED_KEY, 10).unwrap();
        staged.delete(keys::TOTAL_MINTED_KEY).unwrap();
        assert_eq!(get_u128(&staged, keys::TOTAL_MINTED_KEY).unwrap(), 0);
    }
    assert_eq!(get_u128(&store, keys::TOTAL_MINTED_KEY).unwrap(), 5);
}

#[test]
fn paged_scan_resumes_after_cursor() {
    let store = SledStore::temporary().unwrap();
    for id in 1..=10u64 {
        put_u128(&store, &burn_record_key(id), id as u128).unwrap();
    }
    let first = store
        .scan(&[keys::BURN_RECORD_PREFIX], None, Some(4))
        .unwrap();
    assert_eq!(first.len(), 4);
    let next = burn_record_key(sequence_of(&first[3].0).unwrap() + 1);
    let second = store
        .scan(&[keys::BURN_RECORD_PREFIX], Some(&next), Some(4))
        .unwrap();
    let ids: Vec<u64> = second.iter().filter_map(|(k, _)| sequence_of(k)).collect();
    assert_eq!(ids, vec![5, 6, 7, 8]);
}
