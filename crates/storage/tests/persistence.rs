use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use stakedist_storage::{get_value, set_value, CacheStore, KvStore, MemStore, SledStore};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    period: u64,
    label: String,
}

#[test]
fn sled_restart_restores_committed_branch_only() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("db");

    {
        let mut store = SledStore::open(&path, "distribution").expect("sled store");
        set_value(
            &mut store,
            b"\x06one",
            &Record {
                period: 1,
                label: "kept".into(),
            },
        )
        .unwrap();

        {
            let mut branch = CacheStore::new(&mut store);
            branch.set(b"\x06two", vec![1, 2, 3]).unwrap();
            // dropped without write
        }

        let mut branch = CacheStore::new(&mut store);
        branch.set(b"\x06three", vec![3]).unwrap();
        branch.write().unwrap();
        store.flush().unwrap();
    }

    let store = SledStore::open(&path, "distribution").expect("reopen");
    let record: Record = get_value(&store, b"\x06one").unwrap().unwrap();
    assert_eq!(record.period, 1);
    assert!(!store.has(b"\x06two").unwrap());
    assert!(store.has(b"\x06three").unwrap());
}

#[test]
fn sled_and_memory_backends_scan_identically() {
    let mut sled = SledStore::temporary("scan").unwrap();
    let mut mem = MemStore::new();
    for (key, value) in [
        (vec![5u8, 1, 0], vec![1u8]),
        (vec![5, 0, 9], vec![2]),
        (vec![4, 7], vec![3]),
        (vec![5, 0, 1], vec![4]),
    ] {
        sled.set(&key, value.clone()).unwrap();
        mem.set(&key, value).unwrap();
    }
    assert_eq!(sled.prefix_scan(&[5]).unwrap(), mem.prefix_scan(&[5]).unwrap());
    assert_eq!(sled.prefix_scan(&[5, 0]).unwrap().len(), 2);
}

#[test]
fn corrupted_value_is_reported_with_key() {
    let mut mem = MemStore::new();
    mem.set(b"\x00bad", vec![0xff]).unwrap();
    let err = get_value::<Record>(&mem, b"\x00bad").unwrap_err();
    assert!(err.to_string().contains("00626164"));
}

proptest! {
    #[test]
    fn committed_branch_matches_direct_writes(ops in proptest::collection::vec((0u8..8, proptest::option::of(0u8..255)), 0..40)) {
        let mut direct = MemStore::new();
        let mut base = MemStore::new();
        {
            let mut branch = CacheStore::new(&mut base);
            for (key, value) in &ops {
                match value {
                    Some(v) => {
                        direct.set(&[*key], vec![*v]).unwrap();
                        branch.set(&[*key], vec![*v]).unwrap();
                    }
                    None => {
                        direct.delete(&[*key]).unwrap();
                        branch.delete(&[*key]).unwrap();
                    }
                }
            }
            prop_assert_eq!(branch.prefix_scan(&[]).unwrap(), direct.prefix_scan(&[]).unwrap());
            branch.write().unwrap();
        }
        prop_assert_eq!(base, direct);
    }
}
