//! SQLite file I/O methods implementation
//!
//! Implements sqlite3_io_methods for reading database files out of a
//! bundle. Every mutating method reports SQLITE_READONLY.

use super::vfs::{vfs_state, AssetVfs};
use crate::asset::{AssetHandle, ReadOutcome};
use crate::error::AssetVfsError;
use libsqlite3_sys as ffi;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use tracing::{debug, trace, warn};

/// Asset-backed SQLite file
#[repr(C)]
pub struct AssetFile {
    /// Base sqlite3_file structure (MUST be first field)
    pub base: ffi::sqlite3_file,
    /// Open asset; null once closed
    handle: *mut AssetHandle,
    /// VFS that opened this file
    vfs: *const AssetVfs,
}

static IO_METHODS: ffi::sqlite3_io_methods = ffi::sqlite3_io_methods {
    iVersion: 1,
    xClose: Some(file_close),
    xRead: Some(file_read),
    xWrite: Some(file_write),
    xTruncate: Some(file_truncate),
    xSync: Some(file_sync),
    xFileSize: Some(file_file_size),
    xLock: Some(file_lock),
    xUnlock: Some(file_unlock),
    xCheckReservedLock: Some(file_check_reserved_lock),
    xFileControl: Some(file_file_control),
    xSectorSize: Some(file_sector_size),
    xDeviceCharacteristics: Some(file_device_characteristics),
    xShmMap: None,
    xShmLock: None,
    xShmBarrier: None,
    xShmUnmap: None,
    xFetch: None,
    xUnfetch: None,
};

/// Fill `buf` from `offset`, zero-filling whatever lies past the end
///
/// Returns the SQLite result code for xRead.
pub fn read_page(handle: &mut AssetHandle, buf: &mut [u8], offset: u64) -> c_int {
    match handle.read_at(buf, offset) {
        Ok(ReadOutcome::Full(_)) => ffi::SQLITE_OK,
        Ok(ReadOutcome::Short(read)) => {
            buf[read..].fill(0);
            ffi::SQLITE_IOERR_SHORT_READ
        }
        Err(e) => {
            warn!(asset = %handle.name(), offset, amt = buf.len(), error = %e, "asset read failed");
            e.sqlite_code()
        }
    }
}

unsafe fn asset_file<'a>(file: *mut ffi::sqlite3_file) -> &'a mut AssetFile {
    &mut *(file as *mut AssetFile)
}

unsafe fn open_handle<'a>(file: *mut ffi::sqlite3_file) -> Option<&'a mut AssetHandle> {
    asset_file(file).handle.as_mut()
}

// File I/O method implementations

unsafe extern "C" fn file_close(file: *mut ffi::sqlite3_file) -> c_int {
    let asset_file = asset_file(file);
    if asset_file.handle.is_null() {
        return ffi::SQLITE_MISUSE;
    }

    let mut handle = Box::from_raw(asset_file.handle);
    asset_file.handle = ptr::null_mut();
    if let Some(vfs) = asset_file.vfs.as_ref() {
        vfs.file_closed();
    }

    debug!(asset = %handle.name(), "closing asset");
    match handle.close() {
        Ok(()) => ffi::SQLITE_OK,
        Err(e) => e.sqlite_code(),
    }
}

unsafe extern "C" fn file_read(
    file: *mut ffi::sqlite3_file,
    buf: *mut c_void,
    amt: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    let Some(handle) = open_handle(file) else {
        return ffi::SQLITE_MISUSE;
    };

    if offset < 0 || amt < 0 || buf.is_null() {
        return ffi::SQLITE_IOERR_READ;
    }

    trace!(asset = %handle.name(), offset, amt, "read");
    let buf = std::slice::from_raw_parts_mut(buf as *mut u8, amt as usize);
    read_page(handle, buf, offset as u64)
}

unsafe extern "C" fn file_write(
    file: *mut ffi::sqlite3_file,
    _buf: *const c_void,
    _amt: c_int,
    _offset: ffi::sqlite3_int64,
) -> c_int {
    if open_handle(file).is_none() {
        return ffi::SQLITE_MISUSE;
    }
    AssetVfsError::Unsupported("write").sqlite_code()
}

unsafe extern "C" fn file_truncate(file: *mut ffi::sqlite3_file, _size: ffi::sqlite3_int64) -> c_int {
    if open_handle(file).is_none() {
        return ffi::SQLITE_MISUSE;
    }
    AssetVfsError::Unsupported("truncate").sqlite_code()
}

unsafe extern "C" fn file_sync(file: *mut ffi::sqlite3_file, _flags: c_int) -> c_int {
    if open_handle(file).is_none() {
        return ffi::SQLITE_MISUSE;
    }
    // Nothing is ever written
    ffi::SQLITE_OK
}

unsafe extern "C" fn file_file_size(
    file: *mut ffi::sqlite3_file,
    p_size: *mut ffi::sqlite3_int64,
) -> c_int {
    let Some(handle) = open_handle(file) else {
        return ffi::SQLITE_MISUSE;
    };

    match handle.size() {
        Ok(size) => {
            *p_size = size as ffi::sqlite3_int64;
            ffi::SQLITE_OK
        }
        Err(e) => e.sqlite_code(),
    }
}

unsafe extern "C" fn file_lock(file: *mut ffi::sqlite3_file, _lock_type: c_int) -> c_int {
    if open_handle(file).is_none() {
        return ffi::SQLITE_MISUSE;
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn file_unlock(file: *mut ffi::sqlite3_file, _lock_type: c_int) -> c_int {
    if open_handle(file).is_none() {
        return ffi::SQLITE_MISUSE;
    }
    ffi::SQLITE_OK
}

unsafe extern "C" fn file_check_reserved_lock(
    file: *mut ffi::sqlite3_file,
    p_res_out: *mut c_int,
) -> c_int {
    if open_handle(file).is_none() || p_res_out.is_null() {
        return ffi::SQLITE_MISUSE;
    }
    // No writer can ever hold a reserved lock
    *p_res_out = 0;
    ffi::SQLITE_OK
}

unsafe extern "C" fn file_file_control(
    file: *mut ffi::sqlite3_file,
    _op: c_int,
    _p_arg: *mut c_void,
) -> c_int {
    if open_handle(file).is_none() {
        return ffi::SQLITE_MISUSE;
    }
    ffi::SQLITE_NOTFOUND
}

/// Closed files report no sector size
unsafe extern "C" fn file_sector_size(file: *mut ffi::sqlite3_file) -> c_int {
    let asset_file = asset_file(file);
    if asset_file.handle.is_null() {
        return 0;
    }
    asset_file
        .vfs
        .as_ref()
        .map(|vfs| vfs.config().sector_size as c_int)
        .unwrap_or(0)
}

/// Closed files report no capabilities
unsafe extern "C" fn file_device_characteristics(file: *mut ffi::sqlite3_file) -> c_int {
    if open_handle(file).is_none() {
        return 0;
    }
    // Content never changes, so SQLite skips journal, WAL and change checks
    ffi::SQLITE_IOCAP_IMMUTABLE
}

// VFS open callback

pub(super) unsafe extern "C" fn file_open(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    file: *mut ffi::sqlite3_file,
    flags: c_int,
    p_out_flags: *mut c_int,
) -> c_int {
    if file.is_null() {
        return ffi::SQLITE_ERROR;
    }

    // pMethods must be null on failure so SQLite never calls xClose
    ptr::write(
        file as *mut AssetFile,
        AssetFile {
            base: ffi::sqlite3_file {
                pMethods: ptr::null(),
            },
            handle: ptr::null_mut(),
            vfs: ptr::null(),
        },
    );

    let Some(state) = vfs_state(vfs) else {
        return ffi::SQLITE_ERROR;
    };

    let path = if z_name.is_null() {
        None
    } else {
        match CStr::from_ptr(z_name).to_str() {
            Ok(p) => Some(p),
            Err(_) => return ffi::SQLITE_CANTOPEN,
        }
    };

    let handle = match state.open(path, flags) {
        Ok(handle) => handle,
        Err(e) => {
            warn!(vfs = %state.name(), path = path.unwrap_or("<temp>"), flags, error = %e, "open rejected");
            return e.sqlite_code();
        }
    };

    state.file_opened();
    ptr::write(
        file as *mut AssetFile,
        AssetFile {
            base: ffi::sqlite3_file {
                pMethods: &IO_METHODS,
            },
            handle: Box::into_raw(Box::new(handle)),
            vfs: state,
        },
    );

    if !p_out_flags.is_null() {
        *p_out_flags = flags | ffi::SQLITE_OPEN_READONLY;
    }

    ffi::SQLITE_OK
}
