//! # sqlite-asset-vfs - SQLite over read-only bundle assets
//!
//! Ship a pre-built SQLite database inside an application bundle and query it
//! in place, without first copying it to writable storage.
//!
//! - **Read-only VFS** registered with SQLite's global VFS list
//! - **Asset sources**: resource directories (streamed or memory-mapped),
//!   in-memory blobs, or any platform asset manager behind [`AssetSource`]
//! - **Deterministic reads**: sizes fixed at open, short reads zero-filled
//! - **Independent handles**: every connection gets its own asset cursor
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqlite_asset_vfs::{open_read_only, register_vfs, MemoryAssets, Result, VfsConfig};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let assets = MemoryAssets::new().with_asset("demo.db", std::fs::read("demo.db")?)?;
//! register_vfs(Arc::new(assets), &VfsConfig::default())?;
//!
//! let conn = open_read_only("demo.db", "asset_vfs")?;
//! let rows: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Path contract
//!
//! Logical paths are asset-relative names such as `databases/demo.db`,
//! optionally prefixed with `asset:` / `asset://` or leading slashes. See
//! [`path`] for the accepted and rejected shapes.

pub mod asset;
pub mod config;
pub mod error;
pub mod path;
pub mod vfs;

pub use crate::asset::{
    AssetHandle, AssetMode, AssetSource, AssetStream, DirAssets, MemoryAssets, ReadOutcome,
};
pub use crate::config::{VfsConfig, DEFAULT_VFS_NAME};
pub use crate::error::{AssetVfsError, Result};
pub use crate::path::{AssetName, LogicalPath};
pub use crate::vfs::{
    is_registered, open_bundled, open_read_only, register_vfs, unregister_vfs, AssetVfs,
};
