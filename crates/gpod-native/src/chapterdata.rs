//! Chapter lists attached to tracks

use crate::glist::{self, g_list_append, g_list_free, g_list_remove, GList};
use crate::mem::{self, g_free, read_str};
use crate::{gboolean, gpointer, FALSE, TRUE};
use std::os::raw::c_char;
use std::ptr;

#[repr(C)]
#[derive(Debug)]
pub struct Itdb_Chapter {
    /// Start position in milliseconds
    pub startpos: u32,
    pub chaptertitle: *mut c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct Itdb_Chapterdata {
    pub chapters: *mut GList,
    pub unk024: u32,
    pub unk028: u32,
    pub unk032: u32,
}

#[no_mangle]
pub extern "C" fn itdb_chapter_new() -> *mut Itdb_Chapter {
    mem::alloc(
        Itdb_Chapter {
            startpos: 0,
            chaptertitle: ptr::null_mut(),
        },
        "chapter",
    )
}

#[no_mangle]
pub unsafe extern "C" fn itdb_chapter_free(chapter: *mut Itdb_Chapter) {
    if chapter.is_null() {
        return;
    }
    g_free((*chapter).chaptertitle as gpointer);
    mem::dealloc(chapter, "chapter");
}

#[no_mangle]
pub unsafe extern "C" fn itdb_chapter_duplicate(chapter: *const Itdb_Chapter) -> *mut Itdb_Chapter {
    let Some(src) = chapter.as_ref() else {
        return ptr::null_mut();
    };
    let copy = itdb_chapter_new();
    (*copy).startpos = src.startpos;
    (*copy).chaptertitle = mem::g_strdup(src.chaptertitle);
    copy
}

#[no_mangle]
pub extern "C" fn itdb_chapterdata_new() -> *mut Itdb_Chapterdata {
    mem::alloc(
        Itdb_Chapterdata {
            chapters: ptr::null_mut(),
            unk024: 0,
            unk028: 0,
            unk032: 0,
        },
        "chapterdata",
    )
}

/// Free the chapter data and every chapter in it.
#[no_mangle]
pub unsafe extern "C" fn itdb_chapterdata_free(chapterdata: *mut Itdb_Chapterdata) {
    if chapterdata.is_null() {
        return;
    }
    itdb_chapterdata_remove_chapters(chapterdata);
    mem::dealloc(chapterdata, "chapterdata");
}

/// Deep copy, chapters included.
#[no_mangle]
pub unsafe extern "C" fn itdb_chapterdata_duplicate(chapterdata: *const Itdb_Chapterdata) -> *mut Itdb_Chapterdata {
    let Some(src) = chapterdata.as_ref() else {
        return ptr::null_mut();
    };
    let copy = itdb_chapterdata_new();
    (*copy).unk024 = src.unk024;
    (*copy).unk028 = src.unk028;
    (*copy).unk032 = src.unk032;
    for chapter in glist::to_vec::<Itdb_Chapter>(src.chapters) {
        (*copy).chapters = g_list_append((*copy).chapters, itdb_chapter_duplicate(chapter) as gpointer);
    }
    copy
}

/// Append a new chapter. A start position of 0 is stored as 1.
#[no_mangle]
pub unsafe extern "C" fn itdb_chapterdata_add_chapter(
    chapterdata: *mut Itdb_Chapterdata,
    startpos: u32,
    chaptertitle: *const c_char,
) -> gboolean {
    if chapterdata.is_null() || chaptertitle.is_null() {
        return FALSE;
    }
    let chapter = itdb_chapter_new();
    (*chapter).startpos = startpos.max(1);
    (*chapter).chaptertitle = mem::g_strdup(chaptertitle);
    (*chapterdata).chapters = g_list_append((*chapterdata).chapters, chapter as gpointer);
    TRUE
}

/// Detach `chapter` without freeing it.
#[no_mangle]
pub unsafe extern "C" fn itdb_chapterdata_unlink_chapter(
    chapterdata: *mut Itdb_Chapterdata,
    chapter: *mut Itdb_Chapter,
) {
    if chapterdata.is_null() || chapter.is_null() {
        return;
    }
    (*chapterdata).chapters = g_list_remove((*chapterdata).chapters, chapter as gpointer);
}

/// Detach and free `chapter`.
#[no_mangle]
pub unsafe extern "C" fn itdb_chapterdata_remove_chapter(
    chapterdata: *mut Itdb_Chapterdata,
    chapter: *mut Itdb_Chapter,
) {
    if chapterdata.is_null() || chapter.is_null() {
        return;
    }
    itdb_chapterdata_unlink_chapter(chapterdata, chapter);
    itdb_chapter_free(chapter);
}

/// Free every chapter.
#[no_mangle]
pub unsafe extern "C" fn itdb_chapterdata_remove_chapters(chapterdata: *mut Itdb_Chapterdata) {
    if chapterdata.is_null() {
        return;
    }
    let chapters = std::mem::replace(&mut (*chapterdata).chapters, ptr::null_mut());
    for chapter in glist::to_vec::<Itdb_Chapter>(chapters) {
        itdb_chapter_free(chapter);
    }
    g_list_free(chapters);
}

/// Titles and start positions, in order.
pub(crate) unsafe fn chapters_of(chapterdata: *const Itdb_Chapterdata) -> Vec<(u32, Option<String>)> {
    chapterdata.as_ref().map_or_else(Vec::new, |cd| {
        glist::to_vec::<Itdb_Chapter>(cd.chapters)
            .into_iter()
            .map(|c| ((*c).startpos, read_str((*c).chaptertitle)))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger;

    #[test]
    fn test_add_chapter_copies_title_and_bumps_zero() {
        let before = ledger::live_allocations();
        unsafe {
            let cd = itdb_chapterdata_new();
            assert_eq!(itdb_chapterdata_add_chapter(cd, 0, c"Intro".as_ptr()), TRUE);
            assert_eq!(itdb_chapterdata_add_chapter(cd, 5000, c"Verse".as_ptr()), TRUE);
            assert_eq!(itdb_chapterdata_add_chapter(cd, 1, ptr::null()), FALSE);
            assert_eq!(
                chapters_of(cd),
                vec![(1, Some("Intro".into())), (5000, Some("Verse".into()))]
            );

            let copy = itdb_chapterdata_duplicate(cd);
            itdb_chapterdata_free(cd);
            assert_eq!(chapters_of(copy).len(), 2);
            itdb_chapterdata_free(copy);
        }
        assert_eq!(ledger::live_allocations(), before);
    }

    #[test]
    fn test_unlink_keeps_chapter_alive() {
        unsafe {
            let cd = itdb_chapterdata_new();
            itdb_chapterdata_add_chapter(cd, 10, c"One".as_ptr());
            let chapter = crate::glist::g_list_nth_data((*cd).chapters, 0) as *mut Itdb_Chapter;
            itdb_chapterdata_unlink_chapter(cd, chapter);
            assert!((*cd).chapters.is_null());
            assert_eq!((*chapter).startpos, 10);
            itdb_chapter_free(chapter);
            itdb_chapterdata_free(cd);
        }
    }
}
