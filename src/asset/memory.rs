//! In-memory asset bundle

use super::{AssetSource, AssetStream};
use crate::error::{AssetVfsError, Result};
use crate::path::AssetName;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

/// Assets held in memory, e.g. databases embedded with `include_bytes!`
///
/// Contents are shared immutably between handles; each open gets its own
/// cursor.
///
/// # Examples
///
/// ```
/// use sqlite_asset_vfs::asset::{AssetSource, MemoryAssets};
/// use sqlite_asset_vfs::path::AssetName;
///
/// let assets = MemoryAssets::new().with_asset("demo.db", vec![0u8; 4096]).unwrap();
/// let stream = assets.open(&AssetName::new("demo.db").unwrap()).unwrap();
/// assert_eq!(stream.length(), 4096);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    assets: HashMap<AssetName, Arc<[u8]>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset, replacing any previous content under the same name
    pub fn insert(&mut self, name: &str, data: impl Into<Arc<[u8]>>) -> Result<()> {
        let name = AssetName::new(name)?;
        self.assets.insert(name, data.into());
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_asset(mut self, name: &str, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        self.insert(name, data)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Asset names, sorted
    pub fn names(&self) -> Vec<&AssetName> {
        let mut names: Vec<_> = self.assets.keys().collect();
        names.sort();
        names
    }
}

impl AssetSource for MemoryAssets {
    fn open(&self, name: &AssetName) -> Result<Box<dyn AssetStream>> {
        let data = self
            .assets
            .get(name)
            .ok_or_else(|| AssetVfsError::NotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(Arc::clone(data))))
    }

    fn exists(&self, name: &AssetName) -> bool {
        self.assets.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    fn name(s: &str) -> AssetName {
        AssetName::new(s).unwrap()
    }

    #[test]
    fn test_open_and_read() {
        let assets = MemoryAssets::new()
            .with_asset("demo.db", b"SQLite format 3\0".to_vec())
            .unwrap();

        let mut stream = assets.open(&name("demo.db")).unwrap();
        assert_eq!(stream.length(), 16);

        let mut buf = [0u8; 6];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"SQLite");
    }

    #[test]
    fn test_missing_asset() {
        let assets = MemoryAssets::new();
        assert!(assets.is_empty());
        assert!(!assets.exists(&name("missing.db")));
        assert!(matches!(
            assets.open(&name("missing.db")),
            Err(AssetVfsError::NotFound(n)) if n == "missing.db"
        ));
    }

    #[test]
    fn test_streams_are_independent() {
        let assets = MemoryAssets::new()
            .with_asset("demo.db", (0u8..=255).collect::<Vec<_>>())
            .unwrap();

        let mut a = assets.open(&name("demo.db")).unwrap();
        let mut b = assets.open(&name("demo.db")).unwrap();

        a.seek(SeekFrom::Start(200)).unwrap();
        let mut byte = [0u8; 1];
        b.read_exact(&mut byte).unwrap();
        assert_eq!(byte[0], 0);
        a.read_exact(&mut byte).unwrap();
        assert_eq!(byte[0], 200);
    }

    #[test]
    fn test_insert_rejects_invalid_names() {
        let mut assets = MemoryAssets::new();
        assert!(assets.insert("../escape.db", vec![1u8]).is_err());
        assert!(assets.insert("nested/ok.db", vec![1u8]).is_ok());
        assert_eq!(assets.len(), 1);
        assert_eq!(assets.names()[0].as_str(), "nested/ok.db");
    }
}
