//! Binding primitives shared by every record type

pub mod handle;
pub mod list;
pub mod overlay;
pub mod time;

pub use handle::{Liveness, NativeHandle, NativeRecord, Ownership, Record};
pub use list::{Iter, LazyList, ListBinding, Membership};
