//! Property-based tests for positional asset reads
//!
//! Uses proptest to check read_at against a plain slice model for every
//! source kind.

use proptest::prelude::*;
use sqlite_asset_vfs::vfs::read_page;
use sqlite_asset_vfs::{
    AssetHandle, AssetMode, AssetName, AssetSource, DirAssets, MemoryAssets, ReadOutcome,
};
use tempfile::TempDir;

const IOERR_SHORT_READ: i32 = libsqlite3_sys::SQLITE_IOERR_SHORT_READ;
const OK: i32 = libsqlite3_sys::SQLITE_OK;

/// Bytes `read_at` must produce for a read of `len` at `offset`
fn model(data: &[u8], offset: u64, len: usize) -> (Vec<u8>, usize) {
    let start = (offset as usize).min(data.len());
    let end = start.saturating_add(len).min(data.len());
    let available = end - start;
    let mut out = vec![0u8; len];
    out[..available].copy_from_slice(&data[start..end]);
    (out, available)
}

fn check_handle(handle: &mut AssetHandle, data: &[u8], reads: &[(u64, usize)]) -> Result<(), TestCaseError> {
    prop_assert_eq!(handle.size().unwrap(), data.len() as u64);

    for &(offset, len) in reads {
        let (expected, available) = model(data, offset, len);

        let mut buf = vec![0xA5u8; len];
        let outcome = handle.read_at(&mut buf, offset).unwrap();
        prop_assert_eq!(outcome.bytes_read(), available);
        if available == len {
            prop_assert_eq!(outcome, ReadOutcome::Full(len));
        } else {
            prop_assert!(outcome.is_short());
        }
        prop_assert_eq!(&buf[..available], &expected[..available]);

        // Page reads zero-fill whatever the asset could not supply
        let mut page = vec![0xA5u8; len];
        let rc = read_page(handle, &mut page, offset);
        prop_assert_eq!(rc, if available == len { OK } else { IOERR_SHORT_READ });
        prop_assert_eq!(&page, &expected);

        // Size never moves with the cursor
        prop_assert_eq!(handle.size().unwrap(), data.len() as u64);
    }
    Ok(())
}

fn reads_strategy() -> impl Strategy<Value = Vec<(u64, usize)>> {
    prop::collection::vec((0u64..20_000, 0usize..5_000), 1..24)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_memory_reads_match_model(
        data in prop::collection::vec(any::<u8>(), 0..16_384),
        reads in reads_strategy()
    ) {
        let assets = MemoryAssets::new().with_asset("blob.bin", data.clone()).unwrap();
        let name = AssetName::new("blob.bin").unwrap();
        let mut handle = AssetHandle::open(&assets, &name).unwrap();

        check_handle(&mut handle, &data, &reads)?;
        handle.close().unwrap();
    }

    #[test]
    fn prop_directory_reads_match_model(
        data in prop::collection::vec(any::<u8>(), 0..16_384),
        reads in reads_strategy(),
        mapped in any::<bool>()
    ) {
        let bundle = TempDir::new().unwrap();
        std::fs::create_dir_all(bundle.path().join("db")).unwrap();
        std::fs::write(bundle.path().join("db/blob.bin"), &data).unwrap();

        let mode = if mapped { AssetMode::Mapped } else { AssetMode::Streaming };
        let assets = DirAssets::with_mode(bundle.path(), mode);
        let name = AssetName::new("db/blob.bin").unwrap();
        prop_assert!(assets.exists(&name));

        let mut handle = AssetHandle::open(&assets, &name).unwrap();
        check_handle(&mut handle, &data, &reads)?;
        handle.close().unwrap();
    }

    #[test]
    fn prop_reads_past_end_are_empty_short_reads(
        data in prop::collection::vec(any::<u8>(), 0..4_096),
        past in 0u64..1_000_000,
        len in 1usize..4_096
    ) {
        let assets = MemoryAssets::new().with_asset("blob.bin", data.clone()).unwrap();
        let name = AssetName::new("blob.bin").unwrap();
        let mut handle = AssetHandle::open(&assets, &name).unwrap();

        let mut buf = vec![0xFFu8; len];
        let outcome = handle.read_at(&mut buf, data.len() as u64 + past).unwrap();
        prop_assert_eq!(outcome, ReadOutcome::Short(0));

        let rc = read_page(&mut handle, &mut buf, data.len() as u64 + past);
        prop_assert_eq!(rc, IOERR_SHORT_READ);
        prop_assert!(buf.iter().all(|&b| b == 0));
    }
}
