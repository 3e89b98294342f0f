//! # gpod-native
//!
//! In-tree C-ABI record store for iPod databases.
//!
//! This crate plays the part of the native device library: records are
//! fixed-layout `#[repr(C)]` structs, collections are `GList` chains, strings
//! are NUL-terminated heap buffers and every fallible entry point reports
//! through a `GError` out-parameter. Higher layers reach it only through the
//! `extern "C"` functions exported here.
//!
//! ## Layout
//!
//! - [`glist`] - doubly linked list primitive shared by every collection
//! - [`mem`] - heap strings and record allocation
//! - [`ledger`] - live-allocation bookkeeping used by leak/double-free tests
//! - [`error`] - `GError` domains and codes
//! - [`track`], [`playlist`], [`chapterdata`], [`artwork`], [`pixbuf`] - record kinds
//! - [`device`], [`ipod_info`] - mountpoint, SysInfo and the model registry
//! - [`itunesdb`], [`photodb`] - database roots
//! - [`persist`] - on-disk snapshot of both databases
//!
//! ## Safety
//!
//! Every exported function takes raw pointers. Callers must pass either NULL
//! (where documented) or a pointer previously returned by this crate that has
//! not been freed. Records are not internally synchronized.

#![allow(non_camel_case_types)]
#![allow(improper_ctypes_definitions)]
#![allow(clippy::missing_safety_doc)]

pub mod artwork;
pub mod chapterdata;
pub mod device;
pub mod error;
pub mod glist;
pub mod ipod_info;
pub mod itunesdb;
pub mod ledger;
pub mod mem;
pub mod persist;
pub mod photodb;
pub mod pixbuf;
pub mod playlist;
pub mod track;

use std::os::raw::{c_int, c_void};

pub type gboolean = c_int;
pub type gpointer = *mut c_void;

pub const FALSE: gboolean = 0;
pub const TRUE: gboolean = 1;

pub use artwork::*;
pub use chapterdata::*;
pub use device::*;
pub use error::*;
pub use glist::*;
pub use ipod_info::*;
pub use itunesdb::*;
pub use ledger::{itdb_debug_live_allocations, itdb_debug_rejected_frees};
pub use mem::{g_free, g_strdup};
pub use photodb::*;
pub use pixbuf::*;
pub use playlist::*;
pub use track::*;

/// Convert a Rust bool to a `gboolean`.
#[inline]
pub(crate) fn gbool(value: bool) -> gboolean {
    if value {
        TRUE
    } else {
        FALSE
    }
}
