#![no_main]
use libfuzzer_sys::fuzz_target;
use sqlite_asset_vfs::vfs::check_open_flags;
use sqlite_asset_vfs::LogicalPath;

// Arbitrary path strings and open flags must never panic, and accepted
// paths must canonicalize to a stable asset name
fuzz_target!(|input: (String, i32)| {
    let (raw, flags) = input;

    if let Ok(path) = LogicalPath::parse(&raw) {
        let canonical = path.canonical().to_string();
        assert!(!canonical.is_empty());
        assert!(!canonical.starts_with('/'));
        assert!(canonical.split('/').all(|s| !s.is_empty() && s != "." && s != ".."));

        let again = LogicalPath::parse(&canonical).expect("canonical path reparses");
        assert_eq!(again.canonical(), path.canonical());
    }

    let _ = check_open_flags(&raw, flags);
});
