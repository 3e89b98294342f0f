//! Track records

use crate::artwork::{itdb_artwork_duplicate, itdb_artwork_free, itdb_artwork_new, itdb_artwork_remove_thumbnails, itdb_artwork_set_thumbnail_from_pixbuf, Itdb_Artwork};
use crate::chapterdata::{itdb_chapterdata_duplicate, itdb_chapterdata_free, itdb_chapterdata_new, Itdb_Chapterdata};
use crate::glist::{self, g_list_insert, g_list_remove};
use crate::itunesdb::Itdb_iTunesDB;
use crate::mem::{self, g_free};
use crate::pixbuf::Itdb_Pixbuf;
use crate::playlist::{itdb_playlist_remove_track, Itdb_Playlist};
use crate::{gbool, gboolean, gpointer, FALSE};
use std::os::raw::{c_char, c_int};
use std::ptr;
use tracing::{debug, warn};

pub const ITDB_MEDIATYPE_AUDIO: u32 = 0x0001;
pub const ITDB_MEDIATYPE_MOVIE: u32 = 0x0002;
pub const ITDB_MEDIATYPE_PODCAST: u32 = 0x0004;

/// `mark_unplayed` raw values
pub const ITDB_MARK_PLAYED: u8 = 0x01;
pub const ITDB_MARK_UNPLAYED: u8 = 0x02;

/// `has_artwork` raw values
pub const ITDB_HAS_ARTWORK: u8 = 0x01;
pub const ITDB_NO_ARTWORK: u8 = 0x02;

#[repr(C)]
#[derive(Debug)]
pub struct Itdb_Track {
    pub itdb: *mut Itdb_iTunesDB,
    pub title: *mut c_char,
    pub ipod_path: *mut c_char,
    pub album: *mut c_char,
    pub artist: *mut c_char,
    pub genre: *mut c_char,
    pub filetype: *mut c_char,
    pub comment: *mut c_char,
    pub category: *mut c_char,
    pub composer: *mut c_char,
    pub grouping: *mut c_char,
    pub description: *mut c_char,
    pub podcasturl: *mut c_char,
    pub podcastrss: *mut c_char,
    pub subtitle: *mut c_char,
    pub tvshow: *mut c_char,
    pub tvepisode: *mut c_char,
    pub tvnetwork: *mut c_char,
    pub albumartist: *mut c_char,
    pub keywords: *mut c_char,
    pub sort_artist: *mut c_char,
    pub sort_title: *mut c_char,
    pub sort_album: *mut c_char,
    pub sort_albumartist: *mut c_char,
    pub sort_composer: *mut c_char,
    pub sort_tvshow: *mut c_char,
    pub id: u32,
    pub size: u32,
    pub tracklen: i32,
    pub cd_nr: i32,
    pub cds: i32,
    pub track_nr: i32,
    pub tracks: i32,
    pub bitrate: i32,
    pub samplerate: u16,
    pub samplerate_low: u16,
    pub year: i32,
    pub volume: i32,
    pub soundcheck: u32,
    pub time_added: i32,
    pub time_modified: i32,
    pub time_played: i32,
    pub bookmark_time: u32,
    pub rating: u32,
    pub playcount: u32,
    pub playcount2: u32,
    pub recent_playcount: u32,
    pub transferred: i32,
    pub bpm: i16,
    pub app_rating: u8,
    pub type1: u8,
    pub type2: u8,
    pub compilation: u8,
    pub starttime: u32,
    pub stoptime: u32,
    /// 0 means checked
    pub checked: u8,
    pub dbid: u64,
    pub drm_userid: u32,
    pub visible: u32,
    pub filetype_marker: u32,
    pub artwork_count: u16,
    pub artwork_size: u32,
    pub samplerate2: f32,
    pub time_released: i32,
    pub has_artwork: u8,
    pub skip_when_shuffling: u8,
    pub remember_playback_position: u8,
    pub flag4: u8,
    pub dbid2: u64,
    pub lyrics_flag: u8,
    pub movie_flag: u8,
    /// 2 = unplayed, 1 = played
    pub mark_unplayed: u8,
    pub explicit_flag: u8,
    pub skipcount: u32,
    pub recent_skipcount: u32,
    pub last_skipped: i32,
    pub pregap: u32,
    pub samplecount: u64,
    pub postgap: u32,
    pub mediatype: u32,
    pub season_nr: u32,
    pub episode_nr: u32,
    pub gapless_data: u32,
    pub gapless_track_flag: u16,
    pub gapless_album_flag: u16,
    pub chapterdata: *mut Itdb_Chapterdata,
    pub artwork: *mut Itdb_Artwork,
}

/// Invoke `$mac!` with every string field of `Itdb_Track`.
macro_rules! with_track_strings {
    ($mac:ident) => {
        $mac!(
            title, ipod_path, album, artist, genre, filetype, comment, category, composer,
            grouping, description, podcasturl, podcastrss, subtitle, tvshow, tvepisode,
            tvnetwork, albumartist, keywords, sort_artist, sort_title, sort_album,
            sort_albumartist, sort_composer, sort_tvshow
        )
    };
}

impl Itdb_Track {
    /// All-zero record: NULL pointers, zero scalars.
    pub(crate) fn zeroed() -> Self {
        // SAFETY: every field is an integer, a float or a raw pointer, all of
        // which are valid when zeroed.
        unsafe { std::mem::zeroed() }
    }
}

#[no_mangle]
pub extern "C" fn itdb_track_new() -> *mut Itdb_Track {
    let mut track = Itdb_Track::zeroed();
    track.visible = 1;
    track.mark_unplayed = ITDB_MARK_PLAYED;
    track.mediatype = ITDB_MEDIATYPE_AUDIO;
    track.chapterdata = itdb_chapterdata_new();
    track.artwork = itdb_artwork_new();
    mem::alloc(track, "track")
}

/// Free a track with its strings, chapter data and artwork. The track must
/// not be linked into a database.
#[no_mangle]
pub unsafe extern "C" fn itdb_track_free(track: *mut Itdb_Track) {
    let Some(t) = track.as_mut() else {
        return;
    };
    if !t.itdb.is_null() {
        warn!(track = ?track, "freeing a track that is still linked into a database");
    }
    macro_rules! free_strings {
        ($($f:ident),*) => { $( g_free(t.$f as gpointer); )* };
    }
    with_track_strings!(free_strings);
    itdb_chapterdata_free(t.chapterdata);
    itdb_artwork_free(t.artwork);
    mem::dealloc(track, "track");
}

/// Deep copy. The copy is not linked into any database.
#[no_mangle]
pub unsafe extern "C" fn itdb_track_duplicate(track: *const Itdb_Track) -> *mut Itdb_Track {
    let Some(src) = track.as_ref() else {
        return ptr::null_mut();
    };
    let mut copy = ptr::read(src);
    copy.itdb = ptr::null_mut();
    macro_rules! dup_strings {
        ($($f:ident),*) => { $( copy.$f = mem::g_strdup(src.$f); )* };
    }
    with_track_strings!(dup_strings);
    copy.chapterdata = itdb_chapterdata_duplicate(src.chapterdata);
    copy.artwork = itdb_artwork_duplicate(src.artwork);
    mem::alloc(copy, "track")
}

unsafe fn dbid_in_use(itdb: *const Itdb_iTunesDB, dbid: u64) -> bool {
    glist::to_vec::<Itdb_Track>((*itdb).tracks)
        .into_iter()
        .any(|t| (*t).dbid == dbid)
}

/// Link `track` into `itdb` at `pos` (-1 appends). Fills in a unique `dbid`
/// when it is 0.
#[no_mangle]
pub unsafe extern "C" fn itdb_track_add(itdb: *mut Itdb_iTunesDB, track: *mut Itdb_Track, pos: c_int) {
    if itdb.is_null() || track.is_null() {
        return;
    }
    let t = &mut *track;
    t.itdb = itdb;
    if t.dbid == 0 {
        loop {
            let candidate = rand::random::<u64>();
            if candidate != 0 && !dbid_in_use(itdb, candidate) {
                t.dbid = candidate;
                break;
            }
        }
    }
    if t.dbid2 == 0 {
        t.dbid2 = t.dbid;
    }
    if t.samplerate != 0 && t.samplerate2 == 0.0 {
        t.samplerate2 = t.samplerate as f32;
    }
    if t.mark_unplayed == 0 {
        t.mark_unplayed = ITDB_MARK_PLAYED;
    }
    (*itdb).tracks = g_list_insert((*itdb).tracks, track as gpointer, pos);
    debug!(dbid = t.dbid, pos, "track added");
}

/// Detach `track` from its database without freeing it.
#[no_mangle]
pub unsafe extern "C" fn itdb_track_unlink(track: *mut Itdb_Track) {
    let Some(t) = track.as_mut() else {
        return;
    };
    let Some(itdb) = t.itdb.as_mut() else {
        return;
    };
    itdb.tracks = g_list_remove(itdb.tracks, track as gpointer);
    t.itdb = ptr::null_mut();
}

/// Remove `track` from every playlist and from its database, then free it.
#[no_mangle]
pub unsafe extern "C" fn itdb_track_remove(track: *mut Itdb_Track) {
    let Some(t) = track.as_ref() else {
        return;
    };
    if let Some(itdb) = t.itdb.as_ref() {
        for pl in glist::to_vec::<Itdb_Playlist>(itdb.playlists) {
            itdb_playlist_remove_track(pl, track);
        }
    }
    itdb_track_unlink(track);
    itdb_track_free(track);
}

#[no_mangle]
pub unsafe extern "C" fn itdb_track_by_id(itdb: *mut Itdb_iTunesDB, id: u32) -> *mut Itdb_Track {
    if itdb.is_null() {
        return ptr::null_mut();
    }
    glist::to_vec::<Itdb_Track>((*itdb).tracks)
        .into_iter()
        .find(|&t| (*t).id == id)
        .unwrap_or(ptr::null_mut())
}

#[no_mangle]
pub unsafe extern "C" fn itdb_track_by_dbid(itdb: *mut Itdb_iTunesDB, dbid: u64) -> *mut Itdb_Track {
    if itdb.is_null() {
        return ptr::null_mut();
    }
    glist::to_vec::<Itdb_Track>((*itdb).tracks)
        .into_iter()
        .find(|&t| (*t).dbid == dbid)
        .unwrap_or(ptr::null_mut())
}

/// Set the track's cover art from a pixbuf.
#[no_mangle]
pub unsafe extern "C" fn itdb_track_set_thumbnails_from_pixbuf(
    track: *mut Itdb_Track,
    pixbuf: *const Itdb_Pixbuf,
) -> gboolean {
    let Some(t) = track.as_mut() else {
        return FALSE;
    };
    if t.artwork.is_null() {
        t.artwork = itdb_artwork_new();
    }
    let ok = itdb_artwork_set_thumbnail_from_pixbuf(t.artwork, pixbuf, 0, ptr::null_mut());
    if ok != FALSE {
        t.has_artwork = ITDB_HAS_ARTWORK;
        t.artwork_count = 1;
        t.artwork_size = (*t.artwork).artwork_size;
    }
    ok
}

#[no_mangle]
pub unsafe extern "C" fn itdb_track_has_thumbnails(track: *const Itdb_Track) -> gboolean {
    gbool(
        track
            .as_ref()
            .and_then(|t| t.artwork.as_ref())
            .is_some_and(|a| !a.thumbnail.is_null()),
    )
}

/// Cover art rendered for the track's device, or NULL.
#[no_mangle]
pub unsafe extern "C" fn itdb_track_get_thumbnail(track: *const Itdb_Track, width: c_int, height: c_int) -> *mut Itdb_Pixbuf {
    let Some(t) = track.as_ref() else {
        return ptr::null_mut();
    };
    let device = t.itdb.as_ref().map_or(ptr::null(), |db| db.device as *const _);
    crate::artwork::itdb_artwork_get_pixbuf(device, t.artwork, width, height)
}

#[no_mangle]
pub unsafe extern "C" fn itdb_track_remove_thumbnails(track: *mut Itdb_Track) {
    let Some(t) = track.as_mut() else {
        return;
    };
    itdb_artwork_remove_thumbnails(t.artwork);
    t.has_artwork = ITDB_NO_ARTWORK;
    t.artwork_count = 0;
    t.artwork_size = 0;
}
