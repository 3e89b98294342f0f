//! Typed field access over fixed-layout native records
//!
//! Record wrappers never expose raw offsets. They declare their fields with
//! [`overlay!`], which generates a getter/setter pair per field on top of
//! the helpers in this module.

use crate::error::{GpodError, Result};
use chrono::NaiveDateTime;
use gpod_native as ffi;
use libc::c_char;
use std::ffi::{CStr, CString};

/// Decode a string field. NULL reads as `None`.
///
/// # Safety
///
/// `ptr` must be NULL or a NUL-terminated buffer.
pub(crate) unsafe fn read_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Decode a string the caller owns, then free it.
///
/// # Safety
///
/// `ptr` must be NULL or a string allocated by the native library that
/// nothing else will free.
pub(crate) unsafe fn take_string(ptr: *mut c_char) -> Option<String> {
    let out = read_string(ptr);
    ffi::g_free(ptr.cast());
    out
}

/// Replace a string field: duplicate the new value on the native heap,
/// free the old buffer, repoint the slot.
///
/// # Safety
///
/// `slot` must point at a string field of a live record.
pub(crate) unsafe fn write_string(slot: *mut *mut c_char, value: Option<&str>) -> Result<()> {
    let fresh = match value {
        Some(v) => {
            let c = CString::new(v).map_err(|_| GpodError::InvalidString)?;
            ffi::g_strdup(c.as_ptr())
        }
        None => std::ptr::null_mut(),
    };
    let old = std::mem::replace(&mut *slot, fresh);
    ffi::g_free(old.cast());
    Ok(())
}

#[inline]
pub(crate) fn read_bool<T: Into<i64>>(raw: T) -> bool {
    raw.into() != 0
}

#[inline]
pub(crate) fn bool_byte(value: bool) -> u8 {
    u8::from(value)
}

#[inline]
pub(crate) fn read_time(raw: i32) -> NaiveDateTime {
    crate::core::time::decode(raw)
}

#[inline]
pub(crate) fn write_time(time: NaiveDateTime) -> i32 {
    crate::core::time::encode(time)
}

/// Generate accessors for fields of `Self::Raw`.
///
/// Each line names a kind (`string`, `int`, `bool`, `time`), the native
/// field, its Rust type for `int`, and the getter/setter names.
macro_rules! overlay {
    (@field $(#[$m:meta])* string $field:ident, $get:ident, $set:ident) => {
        $(#[$m])*
        pub fn $get(&self) -> Option<String> {
            let raw = self.handle().as_ptr();
            unsafe { $crate::core::overlay::read_string((*raw).$field) }
        }

        pub fn $set(&mut self, value: Option<&str>) -> $crate::Result<()> {
            let raw = self.handle().as_ptr();
            unsafe { $crate::core::overlay::write_string(::std::ptr::addr_of_mut!((*raw).$field), value) }
        }
    };
    (@field $(#[$m:meta])* int $field:ident: $ty:ty, $get:ident, $set:ident) => {
        $(#[$m])*
        pub fn $get(&self) -> $ty {
            let raw = self.handle().as_ptr();
            unsafe { (*raw).$field }
        }

        pub fn $set(&mut self, value: $ty) {
            let raw = self.handle().as_ptr();
            unsafe { (*raw).$field = value }
        }
    };
    (@field $(#[$m:meta])* bool $field:ident, $get:ident, $set:ident) => {
        $(#[$m])*
        pub fn $get(&self) -> bool {
            let raw = self.handle().as_ptr();
            $crate::core::overlay::read_bool(unsafe { (*raw).$field })
        }

        pub fn $set(&mut self, value: bool) {
            let raw = self.handle().as_ptr();
            unsafe { (*raw).$field = $crate::core::overlay::bool_byte(value) as _ }
        }
    };
    (@field $(#[$m:meta])* time $field:ident, $get:ident, $set:ident) => {
        $(#[$m])*
        pub fn $get(&self) -> ::chrono::NaiveDateTime {
            let raw = self.handle().as_ptr();
            $crate::core::overlay::read_time(unsafe { (*raw).$field })
        }

        pub fn $set(&mut self, value: ::chrono::NaiveDateTime) {
            let raw = self.handle().as_ptr();
            unsafe { (*raw).$field = $crate::core::overlay::write_time(value) }
        }
    };
    ($($(#[$m:meta])* $kind:ident $field:ident $(: $ty:ty)? => $get:ident, $set:ident;)*) => {
        $( $crate::core::overlay::overlay!(@field $(#[$m])* $kind $field $(: $ty)?, $get, $set); )*
    };
}

pub(crate) use overlay;
