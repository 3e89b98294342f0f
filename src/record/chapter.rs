//! Chapters and chapter data

use crate::core::handle::{Liveness, NativeHandle, NativeRecord, Record};
use crate::core::list::{LazyList, ListBinding, Membership};
use crate::core::overlay::overlay;
use crate::error::{c_string, GpodError, Result};
use crate::record::adopt;
use gpod_native as ffi;
use std::rc::Rc;

impl NativeRecord for ffi::Itdb_Chapter {
    const KIND: &'static str = "chapter";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_chapter_free(ptr);
    }
}

impl NativeRecord for ffi::Itdb_Chapterdata {
    const KIND: &'static str = "chapterdata";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_chapterdata_free(ptr);
    }
}

/// One chapter mark inside a track
#[derive(Debug)]
pub struct Chapter {
    handle: NativeHandle<ffi::Itdb_Chapter>,
}

impl Record for Chapter {
    type Raw = ffi::Itdb_Chapter;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        Chapter { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

impl Chapter {
    /// New detached chapter starting at `startpos` milliseconds.
    pub fn new(startpos: u32, title: Option<&str>) -> Result<Self> {
        let mut chapter: Chapter = adopt(unsafe { ffi::itdb_chapter_new() }, "itdb_chapter_new")?;
        chapter.set_start_position(startpos);
        chapter.set_title(title)?;
        Ok(chapter)
    }

    /// Deep copy, owned by the caller.
    pub fn duplicate(&self) -> Result<Self> {
        adopt(unsafe { ffi::itdb_chapter_duplicate(self.handle.as_ptr()) }, "itdb_chapter_duplicate")
    }

    overlay! {
        /// Start position in milliseconds
        int startpos: u32 => start_position, set_start_position;
        string chaptertitle => title, set_title;
    }
}

/// Chapter list of a track
#[derive(Debug)]
pub struct ChapterData {
    handle: NativeHandle<ffi::Itdb_Chapterdata>,
}

impl Record for ChapterData {
    type Raw = ffi::Itdb_Chapterdata;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        ChapterData { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

impl ChapterData {
    pub fn new() -> Result<Self> {
        adopt(unsafe { ffi::itdb_chapterdata_new() }, "itdb_chapterdata_new")
    }

    pub fn duplicate(&self) -> Result<Self> {
        adopt(unsafe { ffi::itdb_chapterdata_duplicate(self.handle.as_ptr()) }, "itdb_chapterdata_duplicate")
    }

    /// Chapters in native order. Adding stores a copy and always appends.
    pub fn chapters(&self) -> LazyList<ChapterList> {
        LazyList::new(ChapterList {
            raw: self.handle.as_ptr(),
            owner: Rc::clone(self.handle.node()),
        })
    }

    /// Append a chapter built from `startpos` and `title`.
    pub fn add_chapter(&self, startpos: u32, title: &str) -> Result<()> {
        let title = c_string(title)?;
        let ok = unsafe { ffi::itdb_chapterdata_add_chapter(self.handle.as_ptr(), startpos, title.as_ptr()) };
        if ok == ffi::FALSE {
            return Err(GpodError::Precondition("chapter was not added".into()));
        }
        Ok(())
    }

    /// Free every chapter.
    pub fn remove_chapters(&self) {
        unsafe { ffi::itdb_chapterdata_remove_chapters(self.handle.as_ptr()) }
    }
}

#[doc(hidden)]
pub struct ChapterList {
    raw: *mut ffi::Itdb_Chapterdata,
    owner: Rc<Liveness>,
}

impl ListBinding for ChapterList {
    type Item = Chapter;

    fn head(&self) -> *mut ffi::GList {
        unsafe { (*self.raw).chapters }
    }

    fn owner(&self) -> &Rc<Liveness> {
        &self.owner
    }

    fn membership(&self) -> Membership {
        Membership::Copying
    }

    fn check_position(&self, index: i32, len: usize) -> Result<()> {
        if index >= 0 && index as usize != len {
            return Err(GpodError::Unsupported("chapters can only be appended"));
        }
        Ok(())
    }

    fn link(&self, item: &Chapter, index: i32) -> Result<()> {
        let len = unsafe { ffi::g_list_length(self.head()) } as usize;
        self.check_position(index, len)?;
        let title = item.title().unwrap_or_default();
        let title = c_string(&title)?;
        let ok = unsafe { ffi::itdb_chapterdata_add_chapter(self.raw, item.start_position(), title.as_ptr()) };
        if ok == ffi::FALSE {
            return Err(GpodError::Precondition("chapter was not added".into()));
        }
        Ok(())
    }

    fn unlink(&self, raw: *mut ffi::Itdb_Chapter) -> Result<()> {
        unsafe { ffi::itdb_chapterdata_unlink_chapter(self.raw, raw) };
        Ok(())
    }
}
