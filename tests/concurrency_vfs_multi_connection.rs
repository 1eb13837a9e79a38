//! SQLite VFS multi-connection concurrency tests
//!
//! Every connection owns an independent asset handle, so readers on the same
//! logical path never share a cursor.

mod common;

use common::numbers_image;
use rusqlite::params;
use sqlite_asset_vfs::vfs::open_file_count;
use sqlite_asset_vfs::{
    open_read_only, register_vfs, unregister_vfs, AssetHandle, AssetName, AssetVfsError,
    MemoryAssets, VfsConfig,
};
use std::sync::{Arc, Barrier};

#[test]
fn test_vfs_concurrent_readers() {
    let assets = MemoryAssets::new()
        .with_asset("numbers.db", numbers_image(2_000))
        .unwrap();
    let config = VfsConfig::new("cc-readers");
    register_vfs(Arc::new(assets), &config).unwrap();

    // Spawn 8 reader threads, each with its own connection to the same asset
    let handles: Vec<_> = (0..8i64)
        .map(|thread_id| {
            let vfs_name = config.name.clone();
            std::thread::spawn(move || {
                let conn = open_read_only("numbers.db", &vfs_name).unwrap();

                for i in 0..50i64 {
                    let n = (thread_id * 97 + i * 31) % 2_000;
                    let label: String = conn
                        .query_row("SELECT label FROM numbers WHERE n = ?1", params![n], |row| {
                            row.get(0)
                        })
                        .unwrap();
                    assert_eq!(label, format!("number-{n:06}"));
                }

                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM numbers", [], |row| row.get(0))
                    .unwrap();
                assert_eq!(count, 2_000);
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(open_file_count(&config.name), Some(0));
    unregister_vfs(&config.name).unwrap();
}

#[test]
fn test_interleaved_connections_do_not_disturb_each_other() {
    let assets = MemoryAssets::new()
        .with_asset("numbers.db", numbers_image(1_000))
        .unwrap();
    let config = VfsConfig::new("cc-interleaved");
    register_vfs(Arc::new(assets), &config).unwrap();

    let a = open_read_only("numbers.db", &config.name).unwrap();
    let b = open_read_only("numbers.db", &config.name).unwrap();
    assert_eq!(open_file_count(&config.name), Some(2));

    {
        let mut stmt_a = a.prepare("SELECT n FROM numbers ORDER BY n").unwrap();
        let mut stmt_b = b.prepare("SELECT n FROM numbers ORDER BY n DESC").unwrap();
        let mut rows_a = stmt_a.query([]).unwrap();
        let mut rows_b = stmt_b.query([]).unwrap();

        for i in 0..1_000i64 {
            let n_a: i64 = rows_a.next().unwrap().unwrap().get(0).unwrap();
            let n_b: i64 = rows_b.next().unwrap().unwrap().get(0).unwrap();
            assert_eq!(n_a, i);
            assert_eq!(n_b, 999 - i);
        }
    }

    // Unregister is refused while connections hold files
    assert!(matches!(
        unregister_vfs(&config.name),
        Err(AssetVfsError::Registration { .. })
    ));

    drop(a);
    drop(b);
    unregister_vfs(&config.name).unwrap();
}

#[test]
fn test_handles_on_shared_source_have_independent_cursors() {
    let data: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    let assets = Arc::new(MemoryAssets::new().with_asset("blob.bin", data.clone()).unwrap());
    let name = AssetName::new("blob.bin").unwrap();

    let threads = 6;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let assets = Arc::clone(&assets);
            let barrier = Arc::clone(&barrier);
            let name = name.clone();
            let data = data.clone();
            std::thread::spawn(move || {
                let mut handle = AssetHandle::open(&*assets, &name).unwrap();
                barrier.wait();

                let mut buf = vec![0u8; 1024];
                for i in 0..64u64 {
                    let offset = ((t as u64 * 7 + i * 13) % 64) * 1024;
                    let outcome = handle.read_at(&mut buf, offset).unwrap();
                    assert!(!outcome.is_short());
                    assert_eq!(&buf[..], &data[offset as usize..offset as usize + 1024]);
                }
                handle.close().unwrap();
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}
