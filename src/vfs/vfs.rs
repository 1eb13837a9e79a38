//! SQLite VFS implementation
//!
//! Implements the sqlite3_vfs interface on top of an [`AssetSource`].
//! File I/O is specialized; randomness, sleep and clock calls go to the
//! stock VFS that was the process default at registration time.

use super::file::AssetFile;
use crate::asset::{AssetHandle, AssetSource};
use crate::config::VfsConfig;
use crate::error::{AssetVfsError, Result};
use crate::path::LogicalPath;
use libsqlite3_sys as ffi;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Flags that signal an intent to modify the file
const WRITE_INTENT: [(c_int, &str); 4] = [
    (ffi::SQLITE_OPEN_READWRITE, "read-write access requested"),
    (ffi::SQLITE_OPEN_CREATE, "creation requested"),
    (ffi::SQLITE_OPEN_DELETEONCLOSE, "delete-on-close requested"),
    (ffi::SQLITE_OPEN_EXCLUSIVE, "exclusive creation requested"),
];

/// Kind of check requested through xAccess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Exists,
    Read,
    ReadWrite,
}

impl AccessKind {
    pub fn from_flags(flags: c_int) -> Self {
        match flags {
            ffi::SQLITE_ACCESS_READWRITE => AccessKind::ReadWrite,
            ffi::SQLITE_ACCESS_READ => AccessKind::Read,
            _ => AccessKind::Exists,
        }
    }
}

/// Asset VFS state, reachable from SQLite through `pAppData`
pub struct AssetVfs {
    name: CString,
    config: VfsConfig,
    source: Arc<dyn AssetSource>,
    /// Stock VFS for the non-file methods; null until registered
    stock: *mut ffi::sqlite3_vfs,
    open_files: AtomicUsize,
}

// The stock VFS pointer refers to a process-lifetime SQLite VFS
unsafe impl Send for AssetVfs {}
unsafe impl Sync for AssetVfs {}

impl AssetVfs {
    /// Create an unregistered VFS over `source`
    pub fn new(source: Arc<dyn AssetSource>, config: &VfsConfig) -> Result<Self> {
        config.check()?;
        let name = CString::new(config.name.as_str())
            .map_err(|e| AssetVfsError::registration(&config.name, e.to_string()))?;

        Ok(Self {
            name,
            config: config.clone(),
            source,
            stock: ptr::null_mut(),
            open_files: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<dyn AssetSource> {
        &self.source
    }

    /// Files opened through this VFS and not yet closed
    pub fn open_files(&self) -> usize {
        self.open_files.load(Ordering::Acquire)
    }

    pub(super) fn file_opened(&self) {
        self.open_files.fetch_add(1, Ordering::AcqRel);
    }

    pub(super) fn file_closed(&self) {
        self.open_files.fetch_sub(1, Ordering::AcqRel);
    }

    /// Open a database asset for reading
    ///
    /// `path` is `None` when SQLite asks for a temporary file.
    ///
    /// # Errors
    ///
    /// `CannotOpen` for temp files, write intent, any file type other
    /// than a main database, or a platform failure opening the asset;
    /// `InvalidPath` or `NotFound` if the path does not name a bundled asset.
    pub fn open(&self, path: Option<&str>, flags: c_int) -> Result<AssetHandle> {
        let path = path.ok_or_else(|| {
            AssetVfsError::cannot_open("<temp>", "temporary files are not supported")
        })?;
        check_open_flags(path, flags)?;

        let logical = LogicalPath::parse(path)?;
        let handle =
            AssetHandle::open(self.source.as_ref(), logical.asset()).map_err(|e| match e {
                AssetVfsError::Io(err) => AssetVfsError::cannot_open(path, err.to_string()),
                other => other,
            })?;
        debug!(vfs = %self.name(), asset = %logical.asset(), len = handle.size()?, "opened asset");
        Ok(handle)
    }

    /// Bundled assets cannot be removed
    pub fn delete(&self, path: &str) -> Result<()> {
        warn!(vfs = %self.name(), path, "delete refused on read-only assets");
        Err(AssetVfsError::Unsupported("delete"))
    }

    /// Existence and readability come from a probe open; nothing is writable
    pub fn access(&self, path: &str, kind: AccessKind) -> bool {
        match kind {
            AccessKind::ReadWrite => false,
            AccessKind::Exists | AccessKind::Read => match LogicalPath::parse(path) {
                Ok(logical) => self.source.exists(logical.asset()),
                Err(_) => false,
            },
        }
    }

    /// Canonical asset name SQLite should hand back to xOpen
    pub fn full_pathname(&self, path: &str) -> Result<String> {
        let logical = LogicalPath::parse(path)?;
        if logical.canonical().len() > self.config.max_pathname as usize {
            return Err(AssetVfsError::InvalidPath {
                path: path.to_string(),
                reason: "asset name exceeds max_pathname",
            });
        }
        Ok(logical.canonical().to_string())
    }
}

impl std::fmt::Debug for AssetVfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetVfs")
            .field("config", &self.config)
            .field("open_files", &self.open_files())
            .finish()
    }
}

/// Reject every open that could lead to a write or a non-database file
pub fn check_open_flags(path: &str, flags: c_int) -> Result<()> {
    for (flag, reason) in WRITE_INTENT {
        if flags & flag != 0 {
            return Err(AssetVfsError::cannot_open(path, reason));
        }
    }
    if flags & ffi::SQLITE_OPEN_MAIN_DB == 0 {
        return Err(AssetVfsError::cannot_open(
            path,
            format!("only main database files can be opened (flags {flags:#x})"),
        ));
    }
    Ok(())
}

/// A VFS this crate registered with SQLite
struct Registered {
    vfs: *mut ffi::sqlite3_vfs,
}

// Only touched under the registry lock
unsafe impl Send for Registered {}

impl Registered {
    fn state(&self) -> &AssetVfs {
        unsafe { &*((*self.vfs).pAppData as *const AssetVfs) }
    }

    fn same_source(&self, source: &Arc<dyn AssetSource>) -> bool {
        Arc::as_ptr(&self.state().source) as *const () == Arc::as_ptr(source) as *const ()
    }

    /// Unregister from SQLite and free the method table and state
    fn release(self) -> std::result::Result<(), (Self, c_int)> {
        let rc = unsafe { ffi::sqlite3_vfs_unregister(self.vfs) };
        if rc != ffi::SQLITE_OK {
            return Err((self, rc));
        }
        unsafe {
            drop(Box::from_raw((*self.vfs).pAppData as *mut AssetVfs));
            drop(Box::from_raw(self.vfs));
        }
        Ok(())
    }
}

/// Process-wide record of the asset VFSes registered by this crate
static REGISTRY: Mutex<BTreeMap<String, Registered>> = parking_lot::const_mutex(BTreeMap::new());

/// Register an asset VFS with SQLite
///
/// Idempotent: registering the same name over the same source again is a
/// no-op (apart from promoting it to default when `make_default` is set).
/// Registering the name over a different source replaces the previous
/// registration.
///
/// # Errors
///
/// `Registration` if the name belongs to a VFS this crate did not register,
/// if a registration being replaced still has open files, or if SQLite
/// rejects the VFS.
pub fn register_vfs(source: Arc<dyn AssetSource>, config: &VfsConfig) -> Result<()> {
    let mut state = AssetVfs::new(Arc::clone(&source), config)?;
    let mut registry = REGISTRY.lock();

    if let Some(existing) = registry.get(&config.name) {
        let current = existing.state().config();
        if existing.same_source(&source)
            && current.sector_size == config.sector_size
            && current.max_pathname == config.max_pathname
        {
            if config.make_default {
                let rc = unsafe { ffi::sqlite3_vfs_register(existing.vfs, 1) };
                if rc != ffi::SQLITE_OK {
                    return Err(AssetVfsError::registration(
                        &config.name,
                        format!("sqlite3_vfs_register returned {rc}"),
                    ));
                }
            }
            debug!(vfs = %config.name, "asset VFS already registered");
            return Ok(());
        }

        if existing.state().open_files() > 0 {
            return Err(AssetVfsError::registration(
                &config.name,
                format!(
                    "cannot replace while {} file(s) are open",
                    existing.state().open_files()
                ),
            ));
        }

        if let Some(old) = registry.remove(&config.name) {
            if let Err((old, rc)) = old.release() {
                registry.insert(config.name.clone(), old);
                return Err(AssetVfsError::registration(
                    &config.name,
                    format!("sqlite3_vfs_unregister returned {rc}"),
                ));
            }
        }
        info!(vfs = %config.name, "replacing asset VFS registration");
    }

    unsafe {
        if !ffi::sqlite3_vfs_find(state.name.as_ptr()).is_null() {
            return Err(AssetVfsError::registration(
                &config.name,
                "name already used by another VFS",
            ));
        }

        // Delegate to the stock VFS, never to another asset VFS that may be
        // unregistered before this one
        let mut stock = ffi::sqlite3_vfs_find(ptr::null());
        if let Some(ours) = registry.values().find(|r| r.vfs == stock) {
            stock = ours.state().stock;
        }
        if stock.is_null() {
            return Err(AssetVfsError::registration(
                &config.name,
                "no default VFS to delegate to",
            ));
        }
        state.stock = stock;
    }

    let state_ptr = Box::into_raw(Box::new(state));
    let vfs_ptr = Box::into_raw(Box::new(ffi::sqlite3_vfs {
        iVersion: 3,
        szOsFile: std::mem::size_of::<AssetFile>() as c_int,
        mxPathname: config.max_pathname as c_int,
        pNext: ptr::null_mut(),
        zName: unsafe { (*state_ptr).name.as_ptr() },
        pAppData: state_ptr as *mut c_void,
        xOpen: Some(vfs_open),
        xDelete: Some(vfs_delete),
        xAccess: Some(vfs_access),
        xFullPathname: Some(vfs_full_pathname),
        xDlOpen: None,
        xDlError: None,
        xDlSym: None,
        xDlClose: None,
        xRandomness: Some(vfs_randomness),
        xSleep: Some(vfs_sleep),
        xCurrentTime: Some(vfs_current_time),
        xGetLastError: Some(vfs_get_last_error),
        xCurrentTimeInt64: Some(vfs_current_time_int64),
        xSetSystemCall: None,
        xGetSystemCall: None,
        xNextSystemCall: None,
    }));

    let rc = unsafe { ffi::sqlite3_vfs_register(vfs_ptr, config.make_default as c_int) };
    if rc != ffi::SQLITE_OK {
        unsafe {
            drop(Box::from_raw(vfs_ptr));
            drop(Box::from_raw(state_ptr));
        }
        return Err(AssetVfsError::registration(
            &config.name,
            format!("sqlite3_vfs_register returned {rc}"),
        ));
    }

    registry.insert(config.name.clone(), Registered { vfs: vfs_ptr });
    info!(vfs = %config.name, default = config.make_default, "registered asset VFS");
    Ok(())
}

/// Unregister an asset VFS and free its method table
///
/// Unregistering a name that is not registered is a no-op.
///
/// The open-file count only covers files SQLite has already opened. A
/// connection open racing this call can still reach the freed VFS, so stop
/// opening connections through `name` (and let in-flight opens finish)
/// before unregistering it.
///
/// # Errors
///
/// `Registration` while files opened through the VFS are still open.
pub fn unregister_vfs(name: &str) -> Result<()> {
    let mut registry = REGISTRY.lock();

    match registry.get(name) {
        None => return Ok(()),
        Some(entry) if entry.state().open_files() > 0 => {
            return Err(AssetVfsError::registration(
                name,
                format!("{} file(s) still open", entry.state().open_files()),
            ));
        }
        Some(_) => {}
    }

    if let Some(entry) = registry.remove(name) {
        if let Err((entry, rc)) = entry.release() {
            registry.insert(name.to_string(), entry);
            return Err(AssetVfsError::registration(
                name,
                format!("sqlite3_vfs_unregister returned {rc}"),
            ));
        }
    }

    info!(vfs = name, "unregistered asset VFS");
    Ok(())
}

/// Whether this crate currently has a VFS registered under `name`
pub fn is_registered(name: &str) -> bool {
    REGISTRY.lock().contains_key(name)
}

/// Files currently open through the asset VFS `name`
pub fn open_file_count(name: &str) -> Option<usize> {
    REGISTRY.lock().get(name).map(|r| r.state().open_files())
}

pub(super) unsafe fn vfs_state<'a>(vfs: *mut ffi::sqlite3_vfs) -> Option<&'a AssetVfs> {
    if vfs.is_null() {
        return None;
    }
    ((*vfs).pAppData as *const AssetVfs).as_ref()
}

unsafe fn stock_vfs(vfs: *mut ffi::sqlite3_vfs) -> Option<*mut ffi::sqlite3_vfs> {
    vfs_state(vfs)
        .map(|state| state.stock)
        .filter(|stock| !stock.is_null())
}

unsafe fn c_path<'a>(z_name: *const c_char) -> Option<&'a str> {
    if z_name.is_null() {
        return None;
    }
    CStr::from_ptr(z_name).to_str().ok()
}

// VFS callback functions

unsafe extern "C" fn vfs_open(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    file: *mut ffi::sqlite3_file,
    flags: c_int,
    p_out_flags: *mut c_int,
) -> c_int {
    super::file::file_open(vfs, z_name, file, flags, p_out_flags)
}

unsafe extern "C" fn vfs_delete(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    _sync_dir: c_int,
) -> c_int {
    let Some(state) = vfs_state(vfs) else {
        return ffi::SQLITE_ERROR;
    };
    match state.delete(c_path(z_name).unwrap_or_default()) {
        Ok(()) => ffi::SQLITE_OK,
        Err(e) => e.sqlite_code(),
    }
}

unsafe extern "C" fn vfs_access(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    flags: c_int,
    p_res_out: *mut c_int,
) -> c_int {
    let Some(state) = vfs_state(vfs) else {
        return ffi::SQLITE_ERROR;
    };
    if p_res_out.is_null() {
        return ffi::SQLITE_ERROR;
    }

    let granted = match c_path(z_name) {
        Some(path) => state.access(path, AccessKind::from_flags(flags)),
        None => false,
    };
    *p_res_out = granted as c_int;
    ffi::SQLITE_OK
}

unsafe extern "C" fn vfs_full_pathname(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    n_out: c_int,
    z_out: *mut c_char,
) -> c_int {
    let Some(state) = vfs_state(vfs) else {
        return ffi::SQLITE_ERROR;
    };
    let Some(path) = c_path(z_name) else {
        return ffi::SQLITE_CANTOPEN;
    };
    if z_out.is_null() || n_out <= 0 {
        return ffi::SQLITE_CANTOPEN;
    }

    let canonical = match state.full_pathname(path) {
        Ok(canonical) => canonical,
        Err(e) => {
            warn!(vfs = %state.name(), path, error = %e, "rejected logical path");
            return e.sqlite_code();
        }
    };

    let bytes = canonical.as_bytes();
    if bytes.len() >= n_out as usize {
        return ffi::SQLITE_CANTOPEN;
    }
    ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, z_out, bytes.len());
    *z_out.add(bytes.len()) = 0;
    ffi::SQLITE_OK
}

unsafe extern "C" fn vfs_randomness(
    vfs: *mut ffi::sqlite3_vfs,
    n_byte: c_int,
    z_out: *mut c_char,
) -> c_int {
    match stock_vfs(vfs).and_then(|stock| (*stock).xRandomness.map(|f| (stock, f))) {
        Some((stock, randomness)) => randomness(stock, n_byte, z_out),
        None => 0,
    }
}

unsafe extern "C" fn vfs_sleep(vfs: *mut ffi::sqlite3_vfs, microseconds: c_int) -> c_int {
    match stock_vfs(vfs).and_then(|stock| (*stock).xSleep.map(|f| (stock, f))) {
        Some((stock, sleep)) => sleep(stock, microseconds),
        None => 0,
    }
}

unsafe extern "C" fn vfs_current_time(vfs: *mut ffi::sqlite3_vfs, p_time_out: *mut f64) -> c_int {
    match stock_vfs(vfs).and_then(|stock| (*stock).xCurrentTime.map(|f| (stock, f))) {
        Some((stock, current_time)) => current_time(stock, p_time_out),
        None => ffi::SQLITE_ERROR,
    }
}

unsafe extern "C" fn vfs_current_time_int64(
    vfs: *mut ffi::sqlite3_vfs,
    p_time_out: *mut ffi::sqlite3_int64,
) -> c_int {
    match stock_vfs(vfs).and_then(|stock| (*stock).xCurrentTimeInt64.map(|f| (stock, f))) {
        Some((stock, current_time)) => current_time(stock, p_time_out),
        None => ffi::SQLITE_ERROR,
    }
}

unsafe extern "C" fn vfs_get_last_error(
    _vfs: *mut ffi::sqlite3_vfs,
    _n_byte: c_int,
    _z_err_msg: *mut c_char,
) -> c_int {
    0
}
