//! Playlist records
//!
//! A playlist references tracks owned by its database; its `members` list
//! never owns the tracks it points at.

use crate::glist::{self, g_list_copy, g_list_free, g_list_index, g_list_insert, g_list_remove, GList};
use crate::itunesdb::{itdb_now, Itdb_iTunesDB};
use crate::mem::{self, g_free, read_str};
use crate::track::Itdb_Track;
use crate::{gbool, gboolean, gpointer, FALSE, TRUE};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uint};
use std::ptr;
use tracing::{debug, warn};

pub const ITDB_PL_TYPE_NORM: u8 = 0;
pub const ITDB_PL_TYPE_MPL: u8 = 1;

pub const ITDB_PSO_MANUAL: u32 = 1;

#[repr(C)]
#[derive(Debug)]
pub struct Itdb_Playlist {
    pub itdb: *mut Itdb_iTunesDB,
    pub name: *mut c_char,
    pub type_: u8,
    pub flag1: u8,
    pub flag2: u8,
    pub flag3: u8,
    pub num: c_int,
    pub members: *mut GList,
    pub is_spl: gboolean,
    pub timestamp: i32,
    pub id: u64,
    pub sortorder: u32,
    pub podcastflag: u32,
}

/// New, unlinked playlist with manual sort order and the current time.
#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_new(title: *const c_char, spl: gboolean) -> *mut Itdb_Playlist {
    mem::alloc(
        Itdb_Playlist {
            itdb: ptr::null_mut(),
            name: mem::g_strdup(title),
            type_: ITDB_PL_TYPE_NORM,
            flag1: 0,
            flag2: 0,
            flag3: 0,
            num: 0,
            members: ptr::null_mut(),
            is_spl: gbool(spl != FALSE),
            timestamp: itdb_now(),
            id: 0,
            sortorder: ITDB_PSO_MANUAL,
            podcastflag: 0,
        },
        "playlist",
    )
}

/// Free the playlist. Member tracks are untouched.
#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_free(pl: *mut Itdb_Playlist) {
    let Some(p) = pl.as_mut() else {
        return;
    };
    if !p.itdb.is_null() {
        warn!(playlist = ?pl, "freeing a playlist that is still linked into a database");
    }
    g_free(p.name as gpointer);
    g_list_free(p.members);
    mem::dealloc(pl, "playlist");
}

/// Copy with the same member references; the copy is unlinked and gets a
/// fresh id when added.
#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_duplicate(pl: *const Itdb_Playlist) -> *mut Itdb_Playlist {
    let Some(src) = pl.as_ref() else {
        return ptr::null_mut();
    };
    mem::alloc(
        Itdb_Playlist {
            itdb: ptr::null_mut(),
            name: mem::g_strdup(src.name),
            members: g_list_copy(src.members),
            id: 0,
            ..*src
        },
        "playlist",
    )
}

unsafe fn id_in_use(itdb: *const Itdb_iTunesDB, id: u64) -> bool {
    glist::to_vec::<Itdb_Playlist>((*itdb).playlists)
        .into_iter()
        .any(|p| (*p).id == id)
}

/// Link `pl` into `itdb` at `pos` (-1 appends).
#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_add(itdb: *mut Itdb_iTunesDB, pl: *mut Itdb_Playlist, pos: c_int) {
    if itdb.is_null() || pl.is_null() {
        return;
    }
    if (*pl).id == 0 || id_in_use(itdb, (*pl).id) {
        loop {
            let candidate = rand::random::<u64>();
            if candidate != 0 && !id_in_use(itdb, candidate) {
                (*pl).id = candidate;
                break;
            }
        }
    }
    (*pl).itdb = itdb;
    (*itdb).playlists = g_list_insert((*itdb).playlists, pl as gpointer, pos);
    debug!(id = (*pl).id, pos, "playlist added");
}

/// Detach `pl` from its database without freeing it.
#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_unlink(pl: *mut Itdb_Playlist) {
    let Some(p) = pl.as_mut() else {
        return;
    };
    let Some(itdb) = p.itdb.as_mut() else {
        return;
    };
    itdb.playlists = g_list_remove(itdb.playlists, pl as gpointer);
    p.itdb = ptr::null_mut();
}

/// Unlink and free `pl`.
#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_remove(pl: *mut Itdb_Playlist) {
    itdb_playlist_unlink(pl);
    itdb_playlist_free(pl);
}

/// Reference `track` from `pl` at `pos` (-1 appends). Fails when the
/// playlist is not in a database or the track belongs to another one.
#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_add_track(pl: *mut Itdb_Playlist, track: *mut Itdb_Track, pos: c_int) -> gboolean {
    let (Some(p), Some(t)) = (pl.as_mut(), track.as_mut()) else {
        return FALSE;
    };
    if p.itdb.is_null() {
        warn!("playlist_add_track: playlist is not part of a database");
        return FALSE;
    }
    if !t.itdb.is_null() && t.itdb != p.itdb {
        warn!("playlist_add_track: track belongs to a different database");
        return FALSE;
    }
    t.itdb = p.itdb;
    p.members = g_list_insert(p.members, track as gpointer, pos);
    p.num += 1;
    TRUE
}

/// Stop referencing `track`. A NULL playlist means the master playlist of
/// the track's database. The track is not freed.
#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_remove_track(pl: *mut Itdb_Playlist, track: *mut Itdb_Track) {
    if track.is_null() {
        return;
    }
    let pl = if pl.is_null() {
        itdb_playlist_mpl((*track).itdb)
    } else {
        pl
    };
    let Some(p) = pl.as_mut() else {
        return;
    };
    if g_list_index(p.members, track as gpointer) >= 0 {
        p.members = g_list_remove(p.members, track as gpointer);
        p.num -= 1;
    }
}

#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_contains_track(pl: *const Itdb_Playlist, track: *const Itdb_Track) -> gboolean {
    gbool(pl.as_ref().is_some_and(|p| g_list_index(p.members, track as gpointer) >= 0))
}

#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_tracks_number(pl: *const Itdb_Playlist) -> c_uint {
    pl.as_ref().map_or(0, |p| glist::g_list_length(p.members))
}

#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_is_mpl(pl: *const Itdb_Playlist) -> gboolean {
    gbool(pl.as_ref().is_some_and(|p| p.type_ == ITDB_PL_TYPE_MPL))
}

#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_is_podcasts(pl: *const Itdb_Playlist) -> gboolean {
    gbool(pl.as_ref().is_some_and(|p| p.podcastflag == 1))
}

#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_set_mpl(pl: *mut Itdb_Playlist) {
    if let Some(p) = pl.as_mut() {
        p.type_ = ITDB_PL_TYPE_MPL;
    }
}

#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_set_podcasts(pl: *mut Itdb_Playlist) {
    if let Some(p) = pl.as_mut() {
        p.podcastflag = 1;
    }
}

/// The master playlist: the first playlist, if it is flagged as master.
#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_mpl(itdb: *mut Itdb_iTunesDB) -> *mut Itdb_Playlist {
    let Some(db) = itdb.as_ref() else {
        return ptr::null_mut();
    };
    let first = glist::g_list_nth_data(db.playlists, 0) as *mut Itdb_Playlist;
    if itdb_playlist_is_mpl(first) == TRUE {
        first
    } else {
        ptr::null_mut()
    }
}

#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_podcasts(itdb: *mut Itdb_iTunesDB) -> *mut Itdb_Playlist {
    let Some(db) = itdb.as_ref() else {
        return ptr::null_mut();
    };
    glist::to_vec::<Itdb_Playlist>(db.playlists)
        .into_iter()
        .find(|&p| itdb_playlist_is_podcasts(p) == TRUE)
        .unwrap_or(ptr::null_mut())
}

#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_by_name(itdb: *mut Itdb_iTunesDB, name: *const c_char) -> *mut Itdb_Playlist {
    let (Some(db), false) = (itdb.as_ref(), name.is_null()) else {
        return ptr::null_mut();
    };
    let wanted = CStr::from_ptr(name).to_string_lossy();
    glist::to_vec::<Itdb_Playlist>(db.playlists)
        .into_iter()
        .find(|&p| read_str((*p).name).as_deref() == Some(wanted.as_ref()))
        .unwrap_or(ptr::null_mut())
}

#[no_mangle]
pub unsafe extern "C" fn itdb_playlist_by_id(itdb: *mut Itdb_iTunesDB, id: u64) -> *mut Itdb_Playlist {
    let Some(db) = itdb.as_ref() else {
        return ptr::null_mut();
    };
    glist::to_vec::<Itdb_Playlist>(db.playlists)
        .into_iter()
        .find(|&p| (*p).id == id)
        .unwrap_or(ptr::null_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itunesdb::{itdb_free, itdb_new};
    use crate::ledger;
    use crate::track::{itdb_track_add, itdb_track_new, itdb_track_remove};

    #[test]
    fn test_add_track_requires_database() {
        unsafe {
            let pl = itdb_playlist_new(c"Loose".as_ptr(), FALSE);
            let t = itdb_track_new();
            assert_eq!(itdb_playlist_add_track(pl, t, -1), FALSE);
            crate::track::itdb_track_free(t);
            itdb_playlist_free(pl);
        }
    }

    #[test]
    fn test_master_lookup_and_track_membership() {
        let before = ledger::live_allocations();
        unsafe {
            let db = itdb_new();
            let mpl = itdb_playlist_new(c"iPod".as_ptr(), FALSE);
            itdb_playlist_set_mpl(mpl);
            let other = itdb_playlist_new(c"Mix".as_ptr(), FALSE);
            itdb_playlist_add(db, other, -1);
            assert!(itdb_playlist_mpl(db).is_null());
            itdb_playlist_add(db, mpl, 0);
            assert_eq!(itdb_playlist_mpl(db), mpl);
            assert_ne!((*mpl).id, (*other).id);

            let t = itdb_track_new();
            itdb_track_add(db, t, -1);
            assert_eq!(itdb_playlist_add_track(mpl, t, -1), TRUE);
            assert_eq!(itdb_playlist_add_track(other, t, 0), TRUE);
            assert_eq!(itdb_playlist_tracks_number(mpl), 1);

            itdb_playlist_remove_track(ptr::null_mut(), t);
            assert_eq!(itdb_playlist_contains_track(mpl, t), FALSE);
            assert_eq!((*mpl).num, 0);
            assert_eq!(itdb_playlist_contains_track(other, t), TRUE);

            itdb_track_remove(t);
            assert_eq!(itdb_playlist_tracks_number(other), 0);
            assert_eq!(itdb_playlist_by_name(db, c"Mix".as_ptr()), other);
            itdb_free(db);
        }
        assert_eq!(ledger::live_allocations(), before);
    }
}
