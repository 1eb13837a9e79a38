//! VFS configuration
//!
//! Settings can be built in code or loaded from TOML:
//!
//! ```toml
//! name = "bundle"
//! make_default = false
//! sector_size = 512
//! max_pathname = 256
//! asset_mode = "streaming"
//! ```

use crate::asset::AssetMode;
use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use validator::{Validate, ValidationError};

/// Name the VFS registers under unless configured otherwise
pub const DEFAULT_VFS_NAME: &str = "asset_vfs";

/// Asset VFS registration settings
///
/// # Examples
///
/// ```
/// use sqlite_asset_vfs::VfsConfig;
///
/// let config = VfsConfig::new("bundle").with_make_default(true);
/// config.check().unwrap();
/// assert_eq!(config.sector_size, 512);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VfsConfig {
    /// Registered VFS name, passed as `vfs=` or to `open_with_flags_and_vfs`
    #[validate(custom(function = "validate_vfs_name"))]
    pub name: String,

    /// Make this the VFS used when a connection names none
    pub make_default: bool,

    /// Reported by xSectorSize
    #[validate(range(min = 512, max = 65536))]
    pub sector_size: u32,

    /// Longest logical path accepted (`mxPathname`)
    #[validate(range(min = 64, max = 4096))]
    pub max_pathname: u32,

    /// How directory bundles are read (`streaming` or `mapped`)
    pub asset_mode: AssetMode,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_VFS_NAME.to_string(),
            make_default: false,
            sector_size: 512,
            max_pathname: 256,
            asset_mode: AssetMode::Streaming,
        }
    }
}

impl VfsConfig {
    /// Default settings under another name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_make_default(mut self, make_default: bool) -> Self {
        self.make_default = make_default;
        self
    }

    pub fn with_sector_size(mut self, sector_size: u32) -> Self {
        self.sector_size = sector_size;
        self
    }

    pub fn with_max_pathname(mut self, max_pathname: u32) -> Self {
        self.max_pathname = max_pathname;
        self
    }

    pub fn with_asset_mode(mut self, asset_mode: AssetMode) -> Self {
        self.asset_mode = asset_mode;
        self
    }

    /// Parse and validate TOML settings; missing keys take defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.check()?;
        Ok(config)
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate all fields
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }
}

/// Accepted VFS names
const VFS_NAME_PATTERN: &str = r"^[A-Za-z0-9_.-]{1,64}$";

fn validate_vfs_name(name: &str) -> std::result::Result<(), ValidationError> {
    static NAME: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    match NAME.get_or_init(|| Regex::new(VFS_NAME_PATTERN)) {
        Ok(re) if re.is_match(name) => Ok(()),
        Ok(_) => {
            let mut err = ValidationError::new("vfs_name");
            err.message = Some("1-64 characters of A-Z, a-z, 0-9, '_', '.', '-'".into());
            Err(err)
        }
        Err(_) => Err(ValidationError::new("vfs_name_pattern")),
    }
}
