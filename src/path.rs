//! Logical path canonicalization
//!
//! Applications name a bundled database by its asset-relative name. This
//! module is the single place where a string handed to SQLite is turned into
//! an [`AssetName`], and therefore defines the public path contract:
//!
//! - `demo.db`, `databases/demo.db`: bare asset-relative names
//! - `asset:demo.db`, `asset://databases/demo.db`: optional scheme prefix
//! - `/demo.db`: leading slashes are dropped, so `file:///demo.db?vfs=...`
//!   URIs resolve to the same asset as `file:demo.db?vfs=...`
//!
//! Rejected shapes:
//! - empty names, trailing `/`, empty segments (`a//b.db`)
//! - `.` and `..` segments
//! - backslashes and NUL bytes
//! - a second `asset:` prefix (`asset:asset:demo.db`)
//! - names longer than [`AssetName::MAX_LENGTH`]

use crate::error::{AssetVfsError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Scheme prefixes accepted in front of an asset name, longest first
const SCHEMES: [&str; 2] = ["asset://", "asset:"];

/// Validated asset-relative name
///
/// Segments are separated by `/` and never escape the bundle root.
///
/// # Examples
///
/// ```
/// use sqlite_asset_vfs::path::AssetName;
///
/// let name = AssetName::new("databases/demo.db").unwrap();
/// assert_eq!(name.file_name(), "demo.db");
///
/// assert!(AssetName::new("../demo.db").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetName(String);

impl AssetName {
    /// Pattern for a single path segment
    const SEGMENT_PATTERN: &'static str = r"^[^/\\\x00]+$";

    /// Hard upper bound; the VFS may impose a tighter one
    pub const MAX_LENGTH: usize = 4096;

    /// Create a new validated asset name
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if the name breaks any of the module rules.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<()> {
        let invalid = |reason| AssetVfsError::InvalidPath {
            path: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("empty asset name"));
        }
        if name.len() > Self::MAX_LENGTH {
            return Err(invalid("asset name too long"));
        }
        // Canonical names must reparse to themselves
        if SCHEMES.iter().any(|scheme| name.starts_with(scheme)) {
            return Err(invalid("scheme prefix in asset name"));
        }

        for segment in name.split('/') {
            match segment {
                "" => return Err(invalid("empty path segment")),
                "." | ".." => return Err(invalid("relative path segment")),
                _ if !segment_regex()?.is_match(segment) => {
                    return Err(invalid("backslash or NUL in path segment"))
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Iterate over the `/`-separated segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl std::fmt::Display for AssetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AssetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn segment_regex() -> Result<&'static Regex> {
    static SEGMENT: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    SEGMENT
        .get_or_init(|| Regex::new(AssetName::SEGMENT_PATTERN))
        .as_ref()
        .map_err(|e| AssetVfsError::Pattern(e.clone()))
}

/// A path as passed to SQLite, resolved to the asset it names
///
/// Immutable once parsed. Parsing the canonical form again yields the same
/// asset, which matters because SQLite hands the output of xFullPathname
/// back to xOpen.
///
/// # Examples
///
/// ```
/// use sqlite_asset_vfs::path::LogicalPath;
///
/// let path = LogicalPath::parse("asset:///databases/demo.db").unwrap();
/// assert_eq!(path.asset().as_str(), "databases/demo.db");
/// assert_eq!(path.canonical(), "databases/demo.db");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPath {
    raw: String,
    asset: AssetName,
}

impl LogicalPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut rest = raw;
        for scheme in SCHEMES {
            if let Some(stripped) = rest.strip_prefix(scheme) {
                rest = stripped;
                break;
            }
        }
        let rest = rest.trim_start_matches('/');

        let asset = AssetName::new(rest).map_err(|e| match e {
            AssetVfsError::InvalidPath { reason, .. } => AssetVfsError::InvalidPath {
                path: raw.to_string(),
                reason,
            },
            other => other,
        })?;

        Ok(Self {
            raw: raw.to_string(),
            asset,
        })
    }

    /// The string the caller handed over
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn asset(&self) -> &AssetName {
        &self.asset
    }

    /// Canonical form written back by xFullPathname
    pub fn canonical(&self) -> &str {
        self.asset.as_str()
    }

    pub fn into_asset(self) -> AssetName {
        self.asset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_asset_names() {
        assert!(AssetName::new("demo.db").is_ok());
        assert!(AssetName::new("databases/demo.db").is_ok());
        assert!(AssetName::new("a/b/c/d.sqlite").is_ok());
        assert!(AssetName::new("demo.db-journal").is_ok());
        assert!(AssetName::new("with space.db").is_ok());
        assert!(AssetName::new("..hidden.db").is_ok());
    }

    #[test]
    fn test_invalid_asset_names() {
        assert!(AssetName::new("").is_err()); // empty
        assert!(AssetName::new("../demo.db").is_err()); // parent escape
        assert!(AssetName::new("a/./demo.db").is_err()); // current dir
        assert!(AssetName::new("a//demo.db").is_err()); // empty segment
        assert!(AssetName::new("databases/").is_err()); // trailing slash
        assert!(AssetName::new("/demo.db").is_err()); // absolute
        assert!(AssetName::new("C:\\demo.db").is_err()); // backslash
        assert!(AssetName::new("demo\0.db").is_err()); // NUL
        assert!(AssetName::new("asset:demo.db").is_err()); // scheme
        assert!(AssetName::new("x".repeat(AssetName::MAX_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_file_name_and_segments() {
        let name = AssetName::new("databases/v2/demo.db").unwrap();
        assert_eq!(name.file_name(), "demo.db");
        assert_eq!(
            name.segments().collect::<Vec<_>>(),
            vec!["databases", "v2", "demo.db"]
        );

        let flat = AssetName::new("demo.db").unwrap();
        assert_eq!(flat.file_name(), "demo.db");
    }

    #[test]
    fn test_parse_accepted_shapes() {
        for raw in [
            "demo.db",
            "/demo.db",
            "///demo.db",
            "asset:demo.db",
            "asset:/demo.db",
            "asset://demo.db",
            "asset:///demo.db",
        ] {
            let path = LogicalPath::parse(raw).unwrap();
            assert_eq!(path.canonical(), "demo.db", "raw path {raw:?}");
            assert_eq!(path.raw(), raw);
        }

        let nested = LogicalPath::parse("asset://databases/demo.db").unwrap();
        assert_eq!(nested.asset().as_str(), "databases/demo.db");
    }

    #[test]
    fn test_parse_rejected_shapes() {
        for raw in [
            "",
            "/",
            "asset:",
            "asset://",
            "../demo.db",
            "asset://../demo.db",
            "databases//demo.db",
            "databases/./demo.db",
            "databases/",
            "C:\\data\\demo.db",
            "asset:asset:demo.db",
        ] {
            let err = LogicalPath::parse(raw).unwrap_err();
            assert!(
                matches!(err, AssetVfsError::InvalidPath { ref path, .. } if path == raw),
                "raw path {raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = LogicalPath::parse("asset:///databases/demo.db").unwrap();
        let second = LogicalPath::parse(first.canonical()).unwrap();
        assert_eq!(first.asset(), second.asset());
    }

    #[test]
    fn test_segment_pattern_compiles() {
        assert!(Regex::new(AssetName::SEGMENT_PATTERN).is_ok());
        assert!(segment_regex().is_ok());
    }

    #[test]
    fn test_rejection_reason() {
        match LogicalPath::parse("a//b.db") {
            Err(AssetVfsError::InvalidPath { reason, .. }) => {
                assert_eq!(reason, "empty path segment")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
