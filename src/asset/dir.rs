//! Directory-backed asset bundle
//!
//! Covers bundles whose resources are plain files under a read-only
//! directory (iOS/macOS bundle resources, desktop install trees).

use super::{AssetSource, AssetStream};
use crate::error::{AssetVfsError, Result};
use crate::path::AssetName;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::trace;

/// How directory assets are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetMode {
    /// One file cursor per handle; every read seeks then reads
    #[default]
    Streaming,
    /// Whole asset memory-mapped at open
    Mapped,
}

/// Assets stored as files below a root directory
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
    mode: AssetMode,
}

impl DirAssets {
    /// Streaming bundle rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::with_mode(root, AssetMode::Streaming)
    }

    /// Memory-mapped bundle rooted at `root`
    pub fn mapped<P: AsRef<Path>>(root: P) -> Self {
        Self::with_mode(root, AssetMode::Mapped)
    }

    pub fn with_mode<P: AsRef<Path>>(root: P, mode: AssetMode) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            mode,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> AssetMode {
        self.mode
    }

    /// Filesystem location of an asset
    pub fn resolve(&self, name: &AssetName) -> PathBuf {
        name.segments()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    fn open_file(&self, name: &AssetName) -> Result<(File, u64)> {
        let path = self.resolve(name);
        let not_found = |e: io::Error| match e.kind() {
            io::ErrorKind::NotFound => AssetVfsError::NotFound(name.to_string()),
            _ => AssetVfsError::Io(e),
        };

        // Directories are not assets
        if !std::fs::metadata(&path).map_err(not_found)?.is_file() {
            return Err(AssetVfsError::NotFound(name.to_string()));
        }

        let file = File::open(&path).map_err(not_found)?;
        let len = file.metadata()?.len();
        Ok((file, len))
    }
}

impl AssetSource for DirAssets {
    fn open(&self, name: &AssetName) -> Result<Box<dyn AssetStream>> {
        let (file, len) = self.open_file(name)?;
        trace!(asset = %name, len, mode = ?self.mode, "opened directory asset");

        match self.mode {
            AssetMode::Streaming => Ok(Box::new(FileStream { file, len })),
            // Zero-length files cannot be mapped on every platform
            AssetMode::Mapped if len == 0 => Ok(Box::new(Cursor::new(Vec::<u8>::new()))),
            AssetMode::Mapped => {
                // SAFETY: bundle assets are immutable for the life of the process
                let map = unsafe { Mmap::map(&file)? };
                Ok(Box::new(Cursor::new(map)))
            }
        }
    }
}

/// File cursor with its length captured at open
struct FileStream {
    file: File,
    len: u64,
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl AssetStream for FileStream {
    fn length(&self) -> u64 {
        self.len
    }
}
