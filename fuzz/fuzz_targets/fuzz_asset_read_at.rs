#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sqlite_asset_vfs::vfs::read_page;
use sqlite_asset_vfs::{AssetHandle, AssetName, MemoryAssets};

#[derive(Debug, Arbitrary)]
struct ReadOp {
    offset: u32,
    len: u16,
}

#[derive(Debug, Arbitrary)]
struct Input {
    data: Vec<u8>,
    ops: Vec<ReadOp>,
}

// Reads at arbitrary offsets must match the backing bytes and zero-fill
// everything past the end
fuzz_target!(|input: Input| {
    let assets = match MemoryAssets::new().with_asset("fuzz.db", input.data.clone()) {
        Ok(a) => a,
        Err(_) => return,
    };
    let name = AssetName::new("fuzz.db").unwrap();
    let mut handle = AssetHandle::open(&assets, &name).unwrap();
    let len = input.data.len() as u64;

    for op in input.ops.iter().take(64) {
        let mut buf = vec![0xEEu8; op.len as usize];
        let offset = op.offset as u64;
        let rc = read_page(&mut handle, &mut buf, offset);

        let start = offset.min(len) as usize;
        let end = (offset + buf.len() as u64).min(len) as usize;
        let available = end - start;

        assert_eq!(&buf[..available], &input.data[start..end]);
        assert!(buf[available..].iter().all(|&b| b == 0));
        if available == buf.len() {
            assert_eq!(rc, libsqlite3_sys::SQLITE_OK);
        } else {
            assert_eq!(rc, libsqlite3_sys::SQLITE_IOERR_SHORT_READ);
        }
        assert_eq!(handle.size().unwrap(), len);
    }

    handle.close().unwrap();
});
