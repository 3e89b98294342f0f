//! Error types for binding operations

use gpod_native as ffi;
use std::ffi::{CStr, CString};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Binding result type
pub type Result<T> = std::result::Result<T, GpodError>;

/// A failure reported by the native library through its `GError` out-parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// Error domain, e.g. `itdb-file-error-quark`
    pub domain: String,
    pub code: i32,
    pub message: String,
}

impl NativeError {
    /// Copy domain, code and message out of `error` and free it.
    ///
    /// # Safety
    ///
    /// `error` must be a non-NULL `GError` produced by the native library.
    pub(crate) unsafe fn take(error: *mut ffi::GError) -> Self {
        let raw = &*error;
        let name = ffi::g_quark_to_string(raw.domain);
        let domain = if name.is_null() {
            format!("quark-{}", raw.domain)
        } else {
            CStr::from_ptr(name).to_string_lossy().into_owned()
        };
        let message = if raw.message.is_null() {
            String::new()
        } else {
            CStr::from_ptr(raw.message).to_string_lossy().into_owned()
        };
        let code = raw.code;
        ffi::g_error_free(error);
        NativeError {
            domain,
            code,
            message,
        }
    }

    /// Whether this is the `itdb-file-error` "not found" case.
    pub fn is_not_found(&self) -> bool {
        self.domain.starts_with("itdb-file-error") && self.code == ffi::ITDB_FILE_ERROR_NOTFOUND
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.domain, self.code, self.message)
    }
}

/// Binding errors
#[derive(Error, Debug)]
pub enum GpodError {
    /// Native operation failed
    #[error("native error: {0}")]
    Native(NativeError),

    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The record is already present in the target list
    #[error("record is already linked into this list")]
    AlreadyLinked,

    /// An owning collection was handed a record it cannot take ownership of
    #[error("record is not owned by the caller")]
    NotOwned,

    /// No native primitive backs this operation
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// String contains an interior NUL byte
    #[error("string contains an interior NUL byte")]
    InvalidString,

    /// The native library rejected the call
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<NativeError> for GpodError {
    fn from(err: NativeError) -> Self {
        GpodError::Native(err)
    }
}

impl From<std::ffi::NulError> for GpodError {
    fn from(_: std::ffi::NulError) -> Self {
        GpodError::InvalidString
    }
}

/// Turn a populated `GError` slot into an error.
///
/// # Safety
///
/// `error` must be NULL or a `GError` produced by the native library.
pub(crate) unsafe fn check(error: *mut ffi::GError) -> Result<()> {
    if error.is_null() {
        Ok(())
    } else {
        Err(GpodError::Native(NativeError::take(error)))
    }
}

/// Result of a native call that returns a `gboolean` and may fill a
/// `GError`. FALSE without an error becomes [`GpodError::Precondition`].
///
/// # Safety
///
/// Same as [`check`].
pub(crate) unsafe fn check_ok(ok: ffi::gboolean, error: *mut ffi::GError, what: &str) -> Result<()> {
    check(error)?;
    if ok == ffi::FALSE {
        return Err(GpodError::Precondition(format!("{what} failed")));
    }
    Ok(())
}

pub(crate) fn c_string(value: &str) -> Result<CString> {
    Ok(CString::new(value)?)
}

pub(crate) fn c_path(path: &Path) -> Result<CString> {
    c_string(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_check_null_is_ok() {
        assert!(unsafe { check(ptr::null_mut()) }.is_ok());
    }

    #[test]
    fn test_parse_error_is_copied_and_freed() {
        let dir = tempfile::TempDir::new().unwrap();
        let mp = c_path(dir.path()).unwrap();
        let before = ffi::ledger::live_allocations();
        let mut err = ptr::null_mut();
        let db = unsafe { ffi::itdb_parse(mp.as_ptr(), &mut err) };
        assert!(db.is_null());
        match unsafe { check(err) } {
            Err(GpodError::Native(e)) => {
                assert!(e.is_not_found(), "{e}");
                assert!(!e.message.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ffi::ledger::live_allocations(), before);
    }

    #[test]
    fn test_false_without_error_is_precondition() {
        match unsafe { check_ok(ffi::FALSE, ptr::null_mut(), "itdb_write") } {
            Err(GpodError::Precondition(msg)) => assert_eq!(msg, "itdb_write failed"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(unsafe { check_ok(ffi::TRUE, ptr::null_mut(), "itdb_write") }.is_ok());
    }

    #[test]
    fn test_write_without_mountpoint_is_native_error() {
        let db = ffi::itdb_new();
        let mut err = ptr::null_mut();
        let ok = unsafe { ffi::itdb_write(db, &mut err) };
        assert!(matches!(unsafe { check_ok(ok, err, "itdb_write") }, Err(GpodError::Native(_))));
        unsafe { ffi::itdb_free(db) };
    }

    #[test]
    fn test_interior_nul_rejected() {
        assert!(matches!(c_string("a\0b"), Err(GpodError::InvalidString)));
    }
}
