//! Bundle asset access
//!
//! An [`AssetSource`] is whatever the host platform offers for reading
//! bundled resources by name: a read-only resource directory, an in-memory
//! table of embedded blobs, or a platform asset manager wrapped by the host
//! application. Every opened asset is an [`AssetStream`], a sequential cursor
//! with a known total length. [`AssetHandle`] turns such a cursor into the
//! offset-based reads SQLite issues.

mod dir;
mod handle;
mod memory;

pub use dir::{AssetMode, DirAssets};
pub use handle::{AssetHandle, ReadOutcome};
pub use memory::MemoryAssets;

use crate::error::Result;
use crate::path::AssetName;
use std::io::{Cursor, Read, Seek};

/// An opened asset: a read cursor over immutable bytes
///
/// Dropping the stream releases the underlying resource.
pub trait AssetStream: Read + Seek + Send {
    /// Total length of the asset in bytes
    fn length(&self) -> u64;
}

impl<T> AssetStream for Cursor<T>
where
    T: AsRef<[u8]> + Send,
{
    fn length(&self) -> u64 {
        self.get_ref().as_ref().len() as u64
    }
}

/// Read-only namespace of bundled assets
///
/// Implementations must hand out independent streams: two opens of the same
/// name never share a cursor.
pub trait AssetSource: Send + Sync {
    /// Open an asset by name
    ///
    /// # Errors
    ///
    /// `NotFound` if no asset exists under `name`, `Io` if the platform
    /// failed to open an existing one.
    fn open(&self, name: &AssetName) -> Result<Box<dyn AssetStream>>;

    /// Check for an asset without keeping it open
    fn exists(&self, name: &AssetName) -> bool {
        self.open(name).is_ok()
    }
}
