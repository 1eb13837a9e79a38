//! SQLite VFS (Virtual File System) over bundled assets
//!
//! This module provides a read-only SQLite VFS that lets SQLite query a
//! database file shipped inside an application bundle without copying it to
//! writable storage first:
//!
//! - Reads go straight to the bundle through an [`AssetSource`](crate::asset::AssetSource)
//! - Opens with write intent, journals, WAL and temp files are refused
//! - Files report `SQLITE_IOCAP_IMMUTABLE`, so SQLite takes no locks and
//!   never looks for hot journals
//!
//! Select the VFS by name (`open_with_flags_and_vfs`, or `?vfs=` in a URI
//! opened with `SQLITE_OPEN_URI`), or register it with `make_default`.

mod file;
mod vfs;


pub use file::{read_page, AssetFile};
pub use vfs::{
    check_open_flags, is_registered, open_file_count, register_vfs, unregister_vfs, AccessKind,
    AssetVfs,
};

use crate::asset::AssetSource;
use crate::config::VfsConfig;
use crate::error::Result;
use rusqlite::{Connection, OpenFlags};
use std::sync::Arc;

/// Open a read-only connection to a bundled database through `vfs_name`
///
/// # Examples
///
/// ```rust,no_run
/// use sqlite_asset_vfs::{open_read_only, register_vfs, DirAssets, VfsConfig};
/// use std::sync::Arc;
///
/// # fn main() -> sqlite_asset_vfs::Result<()> {
/// register_vfs(Arc::new(DirAssets::new("/app/Resources")), &VfsConfig::default())?;
///
/// let conn = open_read_only("databases/demo.db", "asset_vfs")?;
/// let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
/// # Ok(())
/// # }
/// ```
pub fn open_read_only(path: &str, vfs_name: &str) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Ok(Connection::open_with_flags_and_vfs(path, flags, vfs_name)?)
}

/// Register `source` under `config` and open `path` through it
pub fn open_bundled(
    source: Arc<dyn AssetSource>,
    config: &VfsConfig,
    path: &str,
) -> Result<Connection> {
    register_vfs(source, config)?;
    open_read_only(path, &config.name)
}
