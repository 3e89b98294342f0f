//! Lazy list adapter over native `GList` collections
//!
//! A [`LazyList`] never caches. Every call re-reads the head pointer from
//! the parent record and walks the native list, because other wrappers can
//! mutate the list through the native library at any time. Iteration takes
//! a snapshot of borrowed wrappers first and then yields from that array.
//!
//! Structural changes always go through the native add/unlink primitives
//! supplied by a [`ListBinding`]; the adapter never patches links itself.

use crate::core::handle::{Liveness, Record};
use crate::error::{GpodError, Result};
use gpod_native as ffi;
use std::rc::Rc;
use tracing::debug;

/// How a collection relates to the records in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// The parent frees members. Linking takes ownership from the caller,
    /// unlinking hands it back.
    Owning,
    /// Members are owned elsewhere (e.g. playlist tracks, owned by the
    /// database). Ownership never moves.
    Referencing,
    /// Linking stores a native copy, so the caller keeps its record.
    /// Unlinking hands the detached copy to the caller.
    Copying,
}

/// Native primitives behind one collection.
pub trait ListBinding {
    type Item: Record;

    /// Current head of the native list.
    fn head(&self) -> *mut ffi::GList;

    /// Liveness of the record holding the list.
    fn owner(&self) -> &Rc<Liveness>;

    fn membership(&self) -> Membership;

    /// Whether the native side accepts a link at `index` (`-1` appends)
    /// into a list of `len` records, independent of the record itself.
    fn check_position(&self, _index: i32, _len: usize) -> Result<()> {
        Ok(())
    }

    /// Splice `item` in at `index` (`-1` appends).
    fn link(&self, item: &Self::Item, index: i32) -> Result<()>;

    /// Detach the record at `raw` without freeing it.
    fn unlink(&self, raw: *mut <Self::Item as Record>::Raw) -> Result<()>;
}

/// Ordered, mutable view over a native list
pub struct LazyList<B: ListBinding> {
    binding: B,
}

impl<B: ListBinding> LazyList<B> {
    pub(crate) fn new(binding: B) -> Self {
        LazyList { binding }
    }

    fn check_alive(&self) {
        if !self.binding.owner().is_alive() {
            panic!("list used after its owning root was disposed");
        }
    }

    fn raw_items(&self) -> Vec<*mut <B::Item as Record>::Raw> {
        self.check_alive();
        unsafe { walk(self.binding.head()) }
    }

    fn raw_at(&self, index: usize) -> Result<*mut <B::Item as Record>::Raw> {
        let items = self.raw_items();
        items.get(index).copied().ok_or(GpodError::IndexOutOfBounds {
            index,
            len: items.len(),
        })
    }

    fn wrap(&self, raw: *mut <B::Item as Record>::Raw) -> Option<B::Item> {
        unsafe { B::Item::borrowed(raw, self.binding.owner()) }
    }

    pub fn membership(&self) -> Membership {
        self.binding.membership()
    }

    /// Current native length.
    pub fn len(&self) -> usize {
        self.check_alive();
        unsafe { ffi::g_list_length(self.binding.head()) as usize }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrowed wrapper for the record at `index`.
    pub fn get(&self, index: usize) -> Result<B::Item> {
        let raw = self.raw_at(index)?;
        self.wrap(raw).ok_or(GpodError::Precondition(format!("NULL list entry at {index}")))
    }

    pub fn first(&self) -> Option<B::Item> {
        self.get(0).ok()
    }

    /// Position of `item` by address.
    pub fn index_of(&self, item: &B::Item) -> Option<usize> {
        let addr = item.address();
        self.raw_items().iter().position(|&p| p as usize == addr)
    }

    pub fn contains(&self, item: &B::Item) -> bool {
        self.index_of(item).is_some()
    }

    /// Append `item`.
    pub fn push(&self, item: &B::Item) -> Result<()> {
        self.link_at(-1, item)
    }

    /// Insert `item` before position `index` (`index == len` appends).
    pub fn insert(&self, index: usize, item: &B::Item) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(GpodError::IndexOutOfBounds { index, len });
        }
        let pos = i32::try_from(index).map_err(|_| GpodError::IndexOutOfBounds { index, len })?;
        self.link_at(pos, item)
    }

    fn link_at(&self, pos: i32, item: &B::Item) -> Result<()> {
        if self.contains(item) {
            return Err(GpodError::AlreadyLinked);
        }
        let membership = self.binding.membership();
        if membership == Membership::Owning && !item.handle().is_owned() {
            return Err(GpodError::NotOwned);
        }
        self.binding.link(item, pos)?;
        if membership == Membership::Owning {
            item.handle().mark_borrowed(self.binding.owner());
        }
        debug!(addr = item.address(), pos, ?membership, "list link");
        Ok(())
    }

    fn unlink_raw(&self, index: usize) -> Result<*mut <B::Item as Record>::Raw> {
        let raw = self.raw_at(index)?;
        self.binding.unlink(raw)?;
        debug!(addr = raw as usize, index, "list unlink");
        Ok(raw)
    }

    /// Detach the record at `index` and return it.
    ///
    /// From an owning or copying list the caller receives an owned
    /// wrapper; from a referencing list a borrowed one.
    pub fn remove_at(&self, index: usize) -> Result<B::Item> {
        let raw = self.unlink_raw(index)?;
        let item = match self.binding.membership() {
            Membership::Referencing => self.wrap(raw),
            Membership::Owning | Membership::Copying => unsafe { B::Item::owned(raw) },
        };
        item.ok_or(GpodError::Precondition(format!("NULL list entry at {index}")))
    }

    /// Detach `item` if present. The passed wrapper becomes the owner when
    /// the list owned it.
    pub fn remove(&self, item: &B::Item) -> Result<bool> {
        let Some(index) = self.index_of(item) else {
            return Ok(false);
        };
        self.unlink_raw(index)?;
        if self.binding.membership() != Membership::Referencing {
            item.handle().mark_owned();
        }
        Ok(true)
    }

    /// Swap the record at `index` for `item`, returning the old one.
    ///
    /// On error the list is left as it was.
    pub fn replace(&self, index: usize, item: &B::Item) -> Result<B::Item> {
        let len = self.len();
        if index >= len {
            return Err(GpodError::IndexOutOfBounds { index, len });
        }
        if self.contains(item) {
            return Err(GpodError::AlreadyLinked);
        }
        if self.binding.membership() == Membership::Owning && !item.handle().is_owned() {
            return Err(GpodError::NotOwned);
        }
        let pos = i32::try_from(index).map_err(|_| GpodError::IndexOutOfBounds { index, len })?;
        self.binding.check_position(pos, len - 1)?;

        let old = self.remove_at(index)?;
        if let Err(e) = self.insert(index, item) {
            // put the old record back where it was; if even that fails the
            // caller gets the restore error and still holds `old`
            self.insert(index, &old)?;
            return Err(e);
        }
        Ok(old)
    }

    /// Remove every record, one unlink at a time from the front. Detached
    /// records of owning lists are released.
    pub fn clear(&self) -> Result<()> {
        while !self.is_empty() {
            self.remove_at(0)?;
        }
        Ok(())
    }

    /// Borrowed wrappers for every record, taken now.
    pub fn snapshot(&self) -> Vec<B::Item> {
        self.raw_items()
            .into_iter()
            .filter_map(|raw| self.wrap(raw))
            .collect()
    }

    /// Iterate over a snapshot. Later changes to the list do not affect
    /// the records yielded.
    pub fn iter(&self) -> Iter<B::Item> {
        Iter {
            inner: self.snapshot().into_iter(),
        }
    }
}

impl<B: ListBinding> IntoIterator for &LazyList<B> {
    type Item = B::Item;
    type IntoIter = Iter<B::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a list snapshot
pub struct Iter<T> {
    inner: std::vec::IntoIter<T>,
}

impl<T> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<T> {}

impl<T> DoubleEndedIterator for Iter<T> {
    fn next_back(&mut self) -> Option<T> {
        self.inner.next_back()
    }
}

/// Native insert position: `None` appends.
pub(crate) fn native_position(pos: Option<usize>) -> Result<i32> {
    match pos {
        None => Ok(-1),
        Some(index) => i32::try_from(index).map_err(|_| GpodError::IndexOutOfBounds {
            index,
            len: i32::MAX as usize,
        }),
    }
}

/// Collect the data pointers of a native list.
///
/// # Safety
///
/// `list` must be NULL or the head of a live `GList`.
pub(crate) unsafe fn walk<T>(list: *mut ffi::GList) -> Vec<*mut T> {
    let mut out = Vec::new();
    let mut node = list;
    while let Some(n) = node.as_ref() {
        out.push(n.data.cast::<T>());
        node = n.next;
    }
    out
}
