//! Playlists
//!
//! A playlist references tracks that its database owns. Its track list
//! never moves ownership: removing a track from a playlist leaves the
//! track in the database.

use crate::core::handle::{Liveness, NativeHandle, NativeRecord, Record};
use crate::core::list::{LazyList, ListBinding, Membership};
use crate::core::overlay::overlay;
use crate::error::{c_string, GpodError, Result};
use crate::record::adopt;
use crate::record::track::Track;
use gpod_native as ffi;
use std::rc::Rc;

impl NativeRecord for ffi::Itdb_Playlist {
    const KIND: &'static str = "playlist";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_playlist_free(ptr);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistType {
    Normal,
    Master,
    Other(u8),
}

impl From<u8> for PlaylistType {
    fn from(raw: u8) -> Self {
        match raw {
            ffi::ITDB_PL_TYPE_NORM => PlaylistType::Normal,
            ffi::ITDB_PL_TYPE_MPL => PlaylistType::Master,
            other => PlaylistType::Other(other),
        }
    }
}

impl From<PlaylistType> for u8 {
    fn from(kind: PlaylistType) -> u8 {
        match kind {
            PlaylistType::Normal => ffi::ITDB_PL_TYPE_NORM,
            PlaylistType::Master => ffi::ITDB_PL_TYPE_MPL,
            PlaylistType::Other(raw) => raw,
        }
    }
}

/// Order the device shows playlist entries in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Manual,
    Title,
    Album,
    Artist,
    Bitrate,
    Genre,
    Filetype,
    TimeModified,
    TrackNumber,
    Size,
    Time,
    Year,
    SampleRate,
    Comment,
    TimeAdded,
    Equalizer,
    Composer,
    PlayCount,
    TimePlayed,
    CdNumber,
    Rating,
    ReleaseDate,
    Bpm,
    Grouping,
    Category,
    Description,
    Other(u32),
}

const SORT_ORDERS: [(u32, SortOrder); 26] = [
    (1, SortOrder::Manual),
    (3, SortOrder::Title),
    (4, SortOrder::Album),
    (5, SortOrder::Artist),
    (6, SortOrder::Bitrate),
    (7, SortOrder::Genre),
    (8, SortOrder::Filetype),
    (9, SortOrder::TimeModified),
    (10, SortOrder::TrackNumber),
    (11, SortOrder::Size),
    (12, SortOrder::Time),
    (13, SortOrder::Year),
    (14, SortOrder::SampleRate),
    (15, SortOrder::Comment),
    (16, SortOrder::TimeAdded),
    (17, SortOrder::Equalizer),
    (18, SortOrder::Composer),
    (20, SortOrder::PlayCount),
    (21, SortOrder::TimePlayed),
    (22, SortOrder::CdNumber),
    (23, SortOrder::Rating),
    (24, SortOrder::ReleaseDate),
    (25, SortOrder::Bpm),
    (26, SortOrder::Grouping),
    (27, SortOrder::Category),
    (28, SortOrder::Description),
];

impl From<u32> for SortOrder {
    fn from(raw: u32) -> Self {
        SORT_ORDERS
            .iter()
            .find(|(code, _)| *code == raw)
            .map_or(SortOrder::Other(raw), |(_, order)| *order)
    }
}

impl From<SortOrder> for u32 {
    fn from(order: SortOrder) -> u32 {
        if let SortOrder::Other(raw) = order {
            return raw;
        }
        SORT_ORDERS
            .iter()
            .find(|(_, o)| *o == order)
            .map_or(ffi::ITDB_PSO_MANUAL, |(code, _)| *code)
    }
}

/// A named, ordered selection of tracks
#[derive(Debug)]
pub struct Playlist {
    handle: NativeHandle<ffi::Itdb_Playlist>,
}

impl Record for Playlist {
    type Raw = ffi::Itdb_Playlist;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        Playlist { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

impl Playlist {
    /// New detached playlist with manual sort order, stamped now.
    pub fn new(name: &str, smart: bool) -> Result<Self> {
        let name = c_string(name)?;
        let raw = unsafe { ffi::itdb_playlist_new(name.as_ptr(), ffi::gboolean::from(smart)) };
        adopt(raw, "itdb_playlist_new")
    }

    /// Copy referencing the same tracks. The copy is detached and gets a
    /// fresh id when added to a database.
    pub fn duplicate(&self) -> Result<Self> {
        adopt(unsafe { ffi::itdb_playlist_duplicate(self.handle.as_ptr()) }, "itdb_playlist_duplicate")
    }

    fn raw(&self) -> *mut ffi::Itdb_Playlist {
        self.handle.as_ptr()
    }

    overlay! {
        string name => name, set_name;
        time timestamp => timestamp, set_timestamp;
        int id: u64 => id, set_id;
        int flag1: u8 => flag1, set_flag1;
        int flag2: u8 => flag2, set_flag2;
        int flag3: u8 => flag3, set_flag3;
        /// Smart playlists are filled by rules on the device
        bool is_spl => is_smart, set_smart;
    }

    pub fn playlist_type(&self) -> PlaylistType {
        PlaylistType::from(unsafe { (*self.raw()).type_ })
    }

    pub fn set_playlist_type(&mut self, kind: PlaylistType) {
        unsafe { (*self.raw()).type_ = kind.into() }
    }

    pub fn is_master(&self) -> bool {
        unsafe { ffi::itdb_playlist_is_mpl(self.raw()) != ffi::FALSE }
    }

    pub fn set_master(&mut self, master: bool) {
        if master {
            unsafe { ffi::itdb_playlist_set_mpl(self.raw()) }
        } else {
            self.set_playlist_type(PlaylistType::Normal);
        }
    }

    pub fn is_podcasts(&self) -> bool {
        unsafe { ffi::itdb_playlist_is_podcasts(self.raw()) != ffi::FALSE }
    }

    pub fn set_podcasts(&mut self, podcasts: bool) {
        if podcasts {
            unsafe { ffi::itdb_playlist_set_podcasts(self.raw()) }
        } else {
            unsafe { (*self.raw()).podcastflag = 0 }
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        SortOrder::from(unsafe { (*self.raw()).sortorder })
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        unsafe { (*self.raw()).sortorder = order.into() }
    }

    /// Address of the database this playlist belongs to, if any.
    pub fn itdb(&self) -> Option<usize> {
        let db = unsafe { (*self.raw()).itdb };
        (!db.is_null()).then_some(db as usize)
    }

    /// Tracks in playlist order. Linking requires the playlist and the
    /// track to be in the same database.
    pub fn tracks(&self) -> LazyList<PlaylistTracks> {
        LazyList::new(PlaylistTracks {
            raw: self.raw(),
            owner: Rc::clone(self.handle.node()),
        })
    }

    pub fn contains_track(&self, track: &Track) -> bool {
        unsafe { ffi::itdb_playlist_contains_track(self.raw(), track.handle().as_ptr()) != ffi::FALSE }
    }

    pub fn track_count(&self) -> usize {
        unsafe { ffi::itdb_playlist_tracks_number(self.raw()) as usize }
    }
}

#[doc(hidden)]
pub struct PlaylistTracks {
    raw: *mut ffi::Itdb_Playlist,
    owner: Rc<Liveness>,
}

impl ListBinding for PlaylistTracks {
    type Item = Track;

    fn head(&self) -> *mut ffi::GList {
        unsafe { (*self.raw).members }
    }

    fn owner(&self) -> &Rc<Liveness> {
        &self.owner
    }

    fn membership(&self) -> Membership {
        Membership::Referencing
    }

    fn link(&self, item: &Track, index: i32) -> Result<()> {
        let db = unsafe { (*self.raw).itdb };
        if db.is_null() {
            return Err(GpodError::Precondition("playlist is not part of a database".into()));
        }
        if item.itdb() != Some(db as usize) {
            return Err(GpodError::Precondition("track is not in the playlist's database".into()));
        }
        let ok = unsafe { ffi::itdb_playlist_add_track(self.raw, item.handle().as_ptr(), index) };
        if ok == ffi::FALSE {
            return Err(GpodError::Precondition("track was not added to the playlist".into()));
        }
        Ok(())
    }

    fn unlink(&self, raw: *mut ffi::Itdb_Track) -> Result<()> {
        unsafe { ffi::itdb_playlist_remove_track(self.raw, raw) };
        Ok(())
    }
}
