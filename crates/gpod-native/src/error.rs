//! `GError` reporting
//!
//! A fallible call takes a `*mut *mut GError`. On failure it allocates a
//! `GError` into that slot (if the slot is non-NULL and still empty) and
//! returns NULL/FALSE. The caller frees the error with [`g_error_free`].

use crate::ledger::{self, AllocKind};
use crate::mem::{dup_str, g_free};
use std::fmt::Display;
use std::io;
use std::os::raw::{c_char, c_int};
use std::ptr;
use tracing::warn;

pub type GQuark = u32;

#[repr(C)]
#[derive(Debug)]
pub struct GError {
    pub domain: GQuark,
    pub code: c_int,
    pub message: *mut c_char,
}

/// Database file errors
pub const ITDB_FILE_ERROR: GQuark = 1;
/// Device / SysInfo errors
pub const ITDB_DEVICE_ERROR: GQuark = 2;
/// Plain I/O errors
pub const G_FILE_ERROR: GQuark = 3;
/// Artwork / image errors
pub const ITDB_ARTWORK_ERROR: GQuark = 4;

pub const ITDB_FILE_ERROR_SEEK: c_int = 0;
pub const ITDB_FILE_ERROR_CORRUPT: c_int = 1;
pub const ITDB_FILE_ERROR_NOTFOUND: c_int = 2;
pub const ITDB_FILE_ERROR_RENAME: c_int = 3;
pub const ITDB_FILE_ERROR_ITDB_CORRUPT: c_int = 4;

pub const ITDB_DEVICE_ERROR_SYSINFO: c_int = 0;
pub const ITDB_DEVICE_ERROR_CREATE: c_int = 1;

pub const G_FILE_ERROR_EXIST: c_int = 0;
pub const G_FILE_ERROR_ACCES: c_int = 2;
pub const G_FILE_ERROR_NOENT: c_int = 4;
pub const G_FILE_ERROR_FAILED: c_int = 24;

pub const ITDB_ARTWORK_ERROR_ROTATION: c_int = 0;
pub const ITDB_ARTWORK_ERROR_IMAGE: c_int = 1;

#[no_mangle]
pub extern "C" fn itdb_file_error_quark() -> GQuark {
    ITDB_FILE_ERROR
}

#[no_mangle]
pub extern "C" fn itdb_device_error_quark() -> GQuark {
    ITDB_DEVICE_ERROR
}

#[no_mangle]
pub extern "C" fn g_file_error_quark() -> GQuark {
    G_FILE_ERROR
}

/// Name of a known error domain; NULL for anything else.
#[no_mangle]
pub extern "C" fn g_quark_to_string(quark: GQuark) -> *const c_char {
    match quark {
        ITDB_FILE_ERROR => c"itdb-file-error-quark".as_ptr(),
        ITDB_DEVICE_ERROR => c"itdb-device-error-quark".as_ptr(),
        G_FILE_ERROR => c"g-file-error-quark".as_ptr(),
        ITDB_ARTWORK_ERROR => c"itdb-artwork-error-quark".as_ptr(),
        _ => ptr::null(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn g_error_free(error: *mut GError) {
    if error.is_null() {
        return;
    }
    if ledger::release(error as usize, AllocKind::Error) {
        let error = Box::from_raw(error);
        g_free(error.message as _);
    }
}

/// Store a new error in `slot`.
pub(crate) unsafe fn set_error(slot: *mut *mut GError, domain: GQuark, code: c_int, message: impl Display) {
    let message = message.to_string();
    if slot.is_null() {
        warn!(domain, code, %message, "error dropped: no error location supplied");
        return;
    }
    if !(*slot).is_null() {
        warn!(domain, code, %message, "error location already set; keeping the first error");
        return;
    }
    let error = Box::into_raw(Box::new(GError {
        domain,
        code,
        message: dup_str(&message),
    }));
    ledger::register(error as usize, AllocKind::Error);
    *slot = error;
}

/// `G_FILE_ERROR` code for an I/O error.
pub(crate) fn file_error_code(err: &io::Error) -> c_int {
    match err.kind() {
        io::ErrorKind::NotFound => G_FILE_ERROR_NOENT,
        io::ErrorKind::PermissionDenied => G_FILE_ERROR_ACCES,
        io::ErrorKind::AlreadyExists => G_FILE_ERROR_EXIST,
        _ => G_FILE_ERROR_FAILED,
    }
}
