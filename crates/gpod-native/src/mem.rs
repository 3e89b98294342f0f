//! Heap strings and record allocation
//!
//! Strings are plain `malloc`ed NUL-terminated buffers so foreign callers can
//! treat them as `char *`. Records are boxed Rust values; both are routed
//! through the [`ledger`](crate::ledger).

use crate::gpointer;
use crate::ledger::{self, AllocKind};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

/// Allocate a record and register it under `kind`.
pub(crate) fn alloc<T>(value: T, kind: &'static str) -> *mut T {
    let ptr = Box::into_raw(Box::new(value));
    ledger::register(ptr as usize, AllocKind::Record(kind));
    ptr
}

/// Free a record previously returned by [`alloc`].
///
/// Unknown addresses are logged and left alone.
pub(crate) unsafe fn dealloc<T>(ptr: *mut T, kind: &'static str) -> bool {
    if ptr.is_null() || !ledger::release(ptr as usize, AllocKind::Record(kind)) {
        return false;
    }
    drop(Box::from_raw(ptr));
    true
}

/// Copy `bytes` into a fresh C string, stopping at the first NUL.
pub(crate) fn dup_bytes(bytes: &[u8]) -> *mut c_char {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    unsafe {
        let buf = libc::malloc(len + 1) as *mut u8;
        if buf.is_null() {
            return ptr::null_mut();
        }
        ptr::copy_nonoverlapping(bytes.as_ptr(), buf, len);
        *buf.add(len) = 0;
        ledger::register(buf as usize, AllocKind::String);
        buf as *mut c_char
    }
}

/// Copy a Rust string into a fresh C string.
pub(crate) fn dup_str(s: &str) -> *mut c_char {
    dup_bytes(s.as_bytes())
}

/// Copy an optional Rust string; `None` maps to NULL.
pub(crate) fn dup_opt(s: Option<&str>) -> *mut c_char {
    s.map_or(ptr::null_mut(), dup_str)
}

/// Read a C string into an owned `String` (lossy). NULL maps to `None`.
pub(crate) unsafe fn read_str(p: *const c_char) -> Option<String> {
    if p.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p).to_string_lossy().into_owned())
    }
}

/// Duplicate a C string. NULL in, NULL out.
#[no_mangle]
pub unsafe extern "C" fn g_strdup(s: *const c_char) -> *mut c_char {
    if s.is_null() {
        return ptr::null_mut();
    }
    dup_bytes(CStr::from_ptr(s).to_bytes())
}

/// Free a string returned by this crate. NULL is ignored.
#[no_mangle]
pub unsafe extern "C" fn g_free(p: gpointer) {
    if p.is_null() {
        return;
    }
    if ledger::release(p as usize, AllocKind::String) {
        libc::free(p);
    }
}

/// Replace the string stored at `slot` with a copy of `value`.
pub(crate) unsafe fn replace_str(slot: *mut *mut c_char, value: Option<&str>) {
    let old = *slot;
    *slot = dup_opt(value);
    g_free(old as gpointer);
}
