//! Native handles and their ownership state machine
//!
//! A [`NativeHandle`] wraps one address in the native record store. It is
//! either the single owner of that address (and frees it exactly once) or a
//! borrowed view that never frees. Every handle also carries a liveness node
//! chained to the node of whatever owns it, so a view taken from a database
//! root fails fast once that root has been disposed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;
use gpod_native as ffi;
use tracing::debug;

/// Ownership state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The wrapper frees the address when released
    Owned,
    /// Some other record or collection owns the address
    Borrowed,
    /// The address has been freed through this handle
    Released,
}

/// Liveness of one handle, chained to the handle that owns it.
///
/// A node also remembers which native allocation its record is, so a view
/// notices when that record is freed by any path, even while its owner
/// lives on.
#[derive(Debug)]
pub struct Liveness {
    alive: Cell<bool>,
    record: Option<Allocation>,
    parent: RefCell<Option<Rc<Liveness>>>,
}

/// One allocation in the native ledger, identified by address and generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Allocation {
    addr: usize,
    generation: u64,
}

impl Allocation {
    fn current(addr: usize) -> Option<Self> {
        ffi::ledger::generation(addr).map(|generation| Allocation { addr, generation })
    }

    fn is_live(&self) -> bool {
        ffi::ledger::generation(self.addr) == Some(self.generation)
    }
}

impl Liveness {
    fn new(record: Option<Allocation>, parent: Option<&Rc<Liveness>>) -> Rc<Self> {
        Rc::new(Liveness {
            alive: Cell::new(true),
            record,
            parent: RefCell::new(parent.map(Rc::clone)),
        })
    }

    /// Whether the owners above this node are all alive.
    fn owners_alive(&self) -> bool {
        match &*self.parent.borrow() {
            Some(parent) => parent.is_alive(),
            None => true,
        }
    }

    /// Whether this node's own record is still the allocation it was
    /// created for.
    fn record_alive(&self) -> bool {
        self.alive.get() && self.record.map_or(true, |r| r.is_live())
    }

    /// Whether this node, its record and every node above it are alive.
    pub fn is_alive(&self) -> bool {
        self.record_alive() && self.owners_alive()
    }

    fn kill(&self) {
        self.alive.set(false);
    }

    fn reparent(&self, parent: Option<Rc<Liveness>>) {
        *self.parent.borrow_mut() = parent;
    }
}

/// A fixed-layout native record kind with a matching free function.
pub trait NativeRecord {
    /// Short name used in log lines and panic messages
    const KIND: &'static str;

    /// Free `ptr` and everything it owns.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live record of this kind that nothing else will free.
    unsafe fn free(ptr: *mut Self);
}

/// Owned or borrowed reference to a native record
pub struct NativeHandle<T: NativeRecord> {
    ptr: NonNull<T>,
    ownership: Cell<Ownership>,
    node: Rc<Liveness>,
}

impl<T: NativeRecord> NativeHandle<T> {
    /// Take ownership of a freshly created record. NULL, or an address the
    /// native ledger does not know, yields `None`.
    ///
    /// # Safety
    ///
    /// `ptr` must be NULL or a live record nobody else will free.
    pub(crate) unsafe fn owned(ptr: *mut T) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        let record = Allocation::current(ptr.as_ptr() as usize)?;
        debug!(kind = T::KIND, addr = record.addr, "acquire owned");
        Some(NativeHandle {
            ptr,
            ownership: Cell::new(Ownership::Owned),
            node: Liveness::new(Some(record), None),
        })
    }

    /// View a record owned by the holder of `parent`. NULL, or an address
    /// the native ledger does not know, yields `None`.
    ///
    /// # Safety
    ///
    /// `ptr` must be NULL or a record kept alive by the owner of `parent`.
    pub(crate) unsafe fn borrowed(ptr: *mut T, parent: &Rc<Liveness>) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        let record = Allocation::current(ptr.as_ptr() as usize)?;
        Some(NativeHandle {
            ptr,
            ownership: Cell::new(Ownership::Borrowed),
            node: Liveness::new(Some(record), Some(parent)),
        })
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership.get()
    }

    pub fn is_owned(&self) -> bool {
        self.ownership.get() == Ownership::Owned
    }

    pub fn is_borrowed(&self) -> bool {
        self.ownership.get() == Ownership::Borrowed
    }

    /// Whether the record can still be dereferenced.
    pub fn is_alive(&self) -> bool {
        self.ownership.get() != Ownership::Released && self.node.is_alive()
    }

    /// Raw address, usable as an identity even after release.
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Pointer for a native call.
    ///
    /// # Panics
    ///
    /// Panics if the root the record was derived from has been disposed,
    /// or if the record itself was freed (through this handle, another
    /// wrapper, or a native call that frees it).
    pub(crate) fn as_ptr(&self) -> *mut T {
        if self.ownership.get() != Ownership::Released && !self.node.owners_alive() {
            panic!(
                "{} at {:#x} used after its owning root was disposed",
                T::KIND,
                self.address()
            );
        }
        if self.ownership.get() == Ownership::Released || !self.node.record_alive() {
            panic!("{} at {:#x} used after release", T::KIND, self.address());
        }
        self.ptr.as_ptr()
    }

    pub(crate) fn node(&self) -> &Rc<Liveness> {
        &self.node
    }

    /// Hand ownership to a container whose liveness is `parent`.
    ///
    /// Returns `false` (and changes nothing) unless the handle is owned.
    pub(crate) fn mark_borrowed(&self, parent: &Rc<Liveness>) -> bool {
        if self.ownership.get() != Ownership::Owned {
            return false;
        }
        self.ownership.set(Ownership::Borrowed);
        self.node.reparent(Some(Rc::clone(parent)));
        debug!(kind = T::KIND, addr = self.address(), "ownership transferred in");
        true
    }

    /// Take ownership back from a container.
    pub(crate) fn mark_owned(&self) -> bool {
        if self.ownership.get() != Ownership::Borrowed {
            return false;
        }
        self.ownership.set(Ownership::Owned);
        self.node.reparent(None);
        debug!(kind = T::KIND, addr = self.address(), "ownership transferred out");
        true
    }

    /// Free the record if this handle owns it. Idempotent; borrowed
    /// handles are left untouched.
    pub fn release(&self) {
        if self.ownership.get() != Ownership::Owned {
            return;
        }
        // Consume the flag before freeing so no path can free twice.
        self.ownership.set(Ownership::Released);
        self.node.kill();
        debug!(kind = T::KIND, addr = self.address(), "release");
        unsafe { T::free(self.ptr.as_ptr()) };
    }
}

impl<T: NativeRecord> Drop for NativeHandle<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: NativeRecord> fmt::Debug for NativeHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &T::KIND)
            .field("addr", &format_args!("{:#x}", self.address()))
            .field("ownership", &self.ownership.get())
            .finish()
    }
}

/// A typed wrapper around one native record.
pub trait Record: Sized {
    type Raw: NativeRecord;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self;

    fn handle(&self) -> &NativeHandle<Self::Raw>;

    /// Wrap a record owned by the holder of `parent`.
    ///
    /// # Safety
    ///
    /// See [`NativeHandle::borrowed`].
    unsafe fn borrowed(ptr: *mut Self::Raw, parent: &Rc<Liveness>) -> Option<Self> {
        NativeHandle::borrowed(ptr, parent).map(Self::from_handle)
    }

    /// Wrap a record the caller now owns.
    ///
    /// # Safety
    ///
    /// See [`NativeHandle::owned`].
    unsafe fn owned(ptr: *mut Self::Raw) -> Option<Self> {
        NativeHandle::owned(ptr).map(Self::from_handle)
    }

    fn ownership(&self) -> Ownership {
        self.handle().ownership()
    }

    fn address(&self) -> usize {
        self.handle().address()
    }

    /// Free the record now if this wrapper owns it.
    fn dispose(self) {
        self.handle().release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpod_native as ffi;

    fn chapter() -> NativeHandle<ffi::Itdb_Chapter> {
        unsafe { NativeHandle::owned(ffi::itdb_chapter_new()).unwrap() }
    }

    #[test]
    fn test_release_is_idempotent() {
        let before = ffi::ledger::live_allocations();
        let h = chapter();
        h.release();
        h.release();
        drop(h);
        assert_eq!(ffi::ledger::live_allocations(), before);
        assert_eq!(ffi::ledger::rejected_frees(), 0);
    }

    #[test]
    fn test_borrowed_never_frees() {
        let owner = chapter();
        let view = unsafe { NativeHandle::borrowed(owner.as_ptr(), owner.node()).unwrap() };
        view.release();
        drop(view);
        assert!(ffi::ledger::is_live(owner.address()));
    }

    #[test]
    fn test_transfer_round_trip() {
        let container = Liveness::new(None, None);
        let h = chapter();
        assert!(h.mark_borrowed(&container));
        assert!(!h.mark_borrowed(&container));
        assert_eq!(h.ownership(), Ownership::Borrowed);
        assert!(h.mark_owned());
        assert_eq!(h.ownership(), Ownership::Owned);
    }

    #[test]
    #[should_panic(expected = "used after its owning root was disposed")]
    fn test_view_of_released_owner_panics() {
        let owner = chapter();
        let view = unsafe { NativeHandle::borrowed(owner.as_ptr(), owner.node()).unwrap() };
        owner.release();
        let _ = view.as_ptr();
    }

    #[test]
    #[should_panic(expected = "used after release")]
    fn test_view_of_record_freed_elsewhere_panics() {
        let container = Liveness::new(None, None);
        let owner = chapter();
        let view = unsafe { NativeHandle::borrowed(owner.as_ptr(), &container).unwrap() };
        assert!(view.is_alive());
        drop(owner);
        assert!(!view.is_alive());
        let _ = view.as_ptr();
    }

    #[test]
    fn test_null_yields_none() {
        assert!(unsafe { NativeHandle::<ffi::Itdb_Chapter>::owned(std::ptr::null_mut()) }.is_none());
    }
}
