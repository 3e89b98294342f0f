//! Track records
//!
//! A [`Track`] is a view over one `Itdb_Track`. Tracks created with
//! [`Track::new`] are owned by the caller until they are pushed into a
//! database's track list; tracks read from a database are borrowed from it.
//! Chapter data and artwork are sub-objects the track owns outright.

use crate::core::handle::{NativeHandle, NativeRecord, Record};
use crate::core::overlay::overlay;
use crate::error::{GpodError, Result};
use crate::record::adopt;
use crate::record::artwork::{Artwork, Pixbuf};
use crate::record::chapter::ChapterData;
use gpod_native as ffi;
use std::path::{PathBuf, MAIN_SEPARATOR};
use tracing::debug;

impl NativeRecord for ffi::Itdb_Track {
    const KIND: &'static str = "track";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_track_free(ptr);
    }
}

/// Media kind of a track.
///
/// The raw field is a bit set; the common single values get their own
/// variant and anything else passes through as [`MediaType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    AudioVideo,
    Audio,
    Movie,
    Podcast,
    VideoPodcast,
    Audiobook,
    MusicVideo,
    TvShow,
    Ringtone,
    Other(u32),
}

impl MediaType {
    pub const fn bits(self) -> u32 {
        match self {
            MediaType::AudioVideo => 0x0000,
            MediaType::Audio => 0x0001,
            MediaType::Movie => 0x0002,
            MediaType::Podcast => 0x0004,
            MediaType::VideoPodcast => 0x0006,
            MediaType::Audiobook => 0x0008,
            MediaType::MusicVideo => 0x0020,
            MediaType::TvShow => 0x0040,
            MediaType::Ringtone => 0x4000,
            MediaType::Other(bits) => bits,
        }
    }

    /// Whether every bit of `other` is set here.
    pub const fn contains(self, other: MediaType) -> bool {
        self.bits() & other.bits() == other.bits()
    }

    pub fn is_video(self) -> bool {
        let video = MediaType::Movie.bits() | MediaType::MusicVideo.bits() | MediaType::TvShow.bits();
        self.bits() & video != 0
    }
}

impl From<u32> for MediaType {
    fn from(bits: u32) -> Self {
        match bits {
            0x0000 => MediaType::AudioVideo,
            0x0001 => MediaType::Audio,
            0x0002 => MediaType::Movie,
            0x0004 => MediaType::Podcast,
            0x0006 => MediaType::VideoPodcast,
            0x0008 => MediaType::Audiobook,
            0x0020 => MediaType::MusicVideo,
            0x0040 => MediaType::TvShow,
            0x4000 => MediaType::Ringtone,
            other => MediaType::Other(other),
        }
    }
}

impl From<MediaType> for u32 {
    fn from(media: MediaType) -> u32 {
        media.bits()
    }
}

/// One song, video or podcast episode
#[derive(Debug)]
pub struct Track {
    handle: NativeHandle<ffi::Itdb_Track>,
}

impl Record for Track {
    type Raw = ffi::Itdb_Track;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        Track { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

impl Track {
    /// Fresh visible audio track with empty chapter data and artwork.
    pub fn new() -> Result<Self> {
        adopt(ffi::itdb_track_new(), "itdb_track_new")
    }

    /// Deep copy not linked into any database.
    pub fn duplicate(&self) -> Result<Self> {
        adopt(unsafe { ffi::itdb_track_duplicate(self.handle.as_ptr()) }, "itdb_track_duplicate")
    }

    fn raw(&self) -> *mut ffi::Itdb_Track {
        self.handle.as_ptr()
    }

    overlay! {
        string title => title, set_title;
        /// Colon-separated path relative to the mountpoint, e.g.
        /// `:iPod_Control:Music:F00:gtkpod000001.mp3`
        string ipod_path => ipod_path, set_ipod_path;
        string album => album, set_album;
        string artist => artist, set_artist;
        string genre => genre, set_genre;
        string filetype => filetype, set_filetype;
        string comment => comment, set_comment;
        string category => category, set_category;
        string composer => composer, set_composer;
        string grouping => grouping, set_grouping;
        string description => description, set_description;
        string podcasturl => podcast_url, set_podcast_url;
        string podcastrss => podcast_rss, set_podcast_rss;
        string subtitle => subtitle, set_subtitle;
        string tvshow => tv_show, set_tv_show;
        string tvepisode => tv_episode, set_tv_episode;
        string tvnetwork => tv_network, set_tv_network;
        string albumartist => album_artist, set_album_artist;
        string keywords => keywords, set_keywords;
        string sort_artist => sort_artist, set_sort_artist;
        string sort_title => sort_title, set_sort_title;
        string sort_album => sort_album, set_sort_album;
        string sort_albumartist => sort_album_artist, set_sort_album_artist;
        string sort_composer => sort_composer, set_sort_composer;
        string sort_tvshow => sort_tv_show, set_sort_tv_show;
    }

    overlay! {
        int id: u32 => id, set_id;
        /// File size in bytes
        int size: u32 => size, set_size;
        /// Length in milliseconds
        int tracklen: i32 => track_length, set_track_length;
        int cd_nr: i32 => cd_number, set_cd_number;
        int cds: i32 => cd_count, set_cd_count;
        int track_nr: i32 => track_number, set_track_number;
        int tracks: i32 => track_count, set_track_count;
        /// kbps
        int bitrate: i32 => bitrate, set_bitrate;
        int samplerate: u16 => sample_rate, set_sample_rate;
        int samplerate2: f32 => sample_rate_float, set_sample_rate_float;
        int year: i32 => year, set_year;
        /// Volume adjustment, -255 to 255
        int volume: i32 => volume, set_volume;
        int soundcheck: u32 => soundcheck, set_soundcheck;
        /// Resume position in milliseconds
        int bookmark_time: u32 => bookmark_time, set_bookmark_time;
        /// Stars times 20
        int rating: u32 => rating, set_rating;
        int app_rating: u8 => app_rating, set_app_rating;
        int playcount: u32 => play_count, set_play_count;
        int playcount2: u32 => play_count2, set_play_count2;
        int recent_playcount: u32 => recent_play_count, set_recent_play_count;
        int skipcount: u32 => skip_count, set_skip_count;
        int recent_skipcount: u32 => recent_skip_count, set_recent_skip_count;
        int bpm: i16 => bpm, set_bpm;
        int type1: u8 => type1, set_type1;
        int type2: u8 => type2, set_type2;
        int starttime: u32 => start_time, set_start_time;
        int stoptime: u32 => stop_time, set_stop_time;
        int dbid: u64 => dbid, set_dbid;
        int dbid2: u64 => dbid2, set_dbid2;
        int drm_userid: u32 => drm_user_id, set_drm_user_id;
        int filetype_marker: u32 => filetype_marker, set_filetype_marker;
        int artwork_count: u16 => artwork_count, set_artwork_count;
        int artwork_size: u32 => artwork_size, set_artwork_size;
        int flag4: u8 => flag4, set_flag4;
        int pregap: u32 => pregap, set_pregap;
        int samplecount: u64 => sample_count, set_sample_count;
        int postgap: u32 => postgap, set_postgap;
        int season_nr: u32 => season_number, set_season_number;
        int episode_nr: u32 => episode_number, set_episode_number;
        int gapless_data: u32 => gapless_data, set_gapless_data;
        int gapless_track_flag: u16 => gapless_track_flag, set_gapless_track_flag;
        int gapless_album_flag: u16 => gapless_album_flag, set_gapless_album_flag;
    }

    overlay! {
        time time_added => time_added, set_time_added;
        time time_modified => time_modified, set_time_modified;
        time time_played => time_played, set_time_played;
        time time_released => time_released, set_time_released;
        time last_skipped => last_skipped, set_last_skipped;
    }

    overlay! {
        bool transferred => transferred, set_transferred;
        bool compilation => compilation, set_compilation;
        bool visible => visible, set_visible;
        bool skip_when_shuffling => skip_when_shuffling, set_skip_when_shuffling;
        bool remember_playback_position => remember_playback_position, set_remember_playback_position;
        bool lyrics_flag => has_lyrics, set_has_lyrics;
        bool movie_flag => movie_flag, set_movie_flag;
        bool explicit_flag => explicit, set_explicit;
    }

    /// Stored inverted: raw 0 means checked.
    pub fn checked(&self) -> bool {
        unsafe { (*self.raw()).checked == 0 }
    }

    pub fn set_checked(&mut self, checked: bool) {
        unsafe { (*self.raw()).checked = u8::from(!checked) }
    }

    /// Raw tri-state byte: 2 unplayed, 1 played, 0 not yet set.
    pub fn mark_unplayed_raw(&self) -> u8 {
        unsafe { (*self.raw()).mark_unplayed }
    }

    pub fn set_mark_unplayed_raw(&mut self, raw: u8) {
        unsafe { (*self.raw()).mark_unplayed = raw }
    }

    /// Shows the "new" bullet on the device.
    pub fn is_unplayed(&self) -> bool {
        self.mark_unplayed_raw() == ffi::ITDB_MARK_UNPLAYED
    }

    pub fn set_unplayed(&mut self, unplayed: bool) {
        let raw = if unplayed {
            ffi::ITDB_MARK_UNPLAYED
        } else {
            ffi::ITDB_MARK_PLAYED
        };
        self.set_mark_unplayed_raw(raw);
    }

    /// Raw tri-state byte: 1 has artwork, 2 none, 0 unknown.
    pub fn has_artwork_raw(&self) -> u8 {
        unsafe { (*self.raw()).has_artwork }
    }

    pub fn set_has_artwork_raw(&mut self, raw: u8) {
        unsafe { (*self.raw()).has_artwork = raw }
    }

    pub fn media_type(&self) -> MediaType {
        MediaType::from(unsafe { (*self.raw()).mediatype })
    }

    pub fn set_media_type(&mut self, media: MediaType) {
        unsafe { (*self.raw()).mediatype = media.bits() }
    }

    /// `ipod_path` with the platform separator instead of colons.
    pub fn ipod_path_local(&self) -> Option<PathBuf> {
        self.ipod_path()
            .map(|p| PathBuf::from(p.replace(':', &MAIN_SEPARATOR.to_string())))
    }

    /// Address of the database this track belongs to, if any. Identity
    /// only; compare against [`Itdb::address`](crate::Itdb::address).
    pub fn itdb(&self) -> Option<usize> {
        let db = unsafe { (*self.raw()).itdb };
        (!db.is_null()).then_some(db as usize)
    }

    /// Chapter data owned by this track.
    pub fn chapter_data(&self) -> Option<ChapterData> {
        unsafe { ChapterData::borrowed((*self.raw()).chapterdata, self.handle.node()) }
    }

    /// Replace the chapter data. The previous chapter data is freed; views
    /// of it panic on their next use.
    pub fn set_chapter_data(&mut self, chapter_data: ChapterData) -> Result<()> {
        if !chapter_data.handle().is_owned() {
            return Err(GpodError::NotOwned);
        }
        unsafe {
            let raw = self.raw();
            let old = std::mem::replace(&mut (*raw).chapterdata, chapter_data.handle().as_ptr());
            ffi::itdb_chapterdata_free(old);
        }
        chapter_data.handle().mark_borrowed(self.handle.node());
        debug!(track = self.address(), chapterdata = chapter_data.address(), "chapter data replaced");
        Ok(())
    }

    /// Artwork owned by this track.
    pub fn artwork(&self) -> Option<Artwork> {
        unsafe { Artwork::borrowed((*self.raw()).artwork, self.handle.node()) }
    }

    /// Replace the artwork; same contract as [`Track::set_chapter_data`].
    pub fn set_artwork(&mut self, artwork: Artwork) -> Result<()> {
        if !artwork.handle().is_owned() {
            return Err(GpodError::NotOwned);
        }
        unsafe {
            let raw = self.raw();
            let old = std::mem::replace(&mut (*raw).artwork, artwork.handle().as_ptr());
            ffi::itdb_artwork_free(old);
            let has = !(*(*raw).artwork).thumbnail.is_null();
            (*raw).has_artwork = if has { ffi::ITDB_HAS_ARTWORK } else { ffi::ITDB_NO_ARTWORK };
        }
        artwork.handle().mark_borrowed(self.handle.node());
        debug!(track = self.address(), artwork = artwork.address(), "artwork replaced");
        Ok(())
    }

    /// Set the cover art from a pixbuf.
    pub fn set_thumbnails_from_pixbuf(&mut self, pixbuf: &Pixbuf) -> Result<()> {
        let ok = unsafe { ffi::itdb_track_set_thumbnails_from_pixbuf(self.raw(), pixbuf.handle().as_ptr()) };
        if ok == ffi::FALSE {
            return Err(GpodError::Precondition("cover art was not accepted".into()));
        }
        Ok(())
    }

    pub fn has_thumbnails(&self) -> bool {
        unsafe { ffi::itdb_track_has_thumbnails(self.raw()) != ffi::FALSE }
    }

    /// Cover art rendered at `width` x `height` (`-1` keeps the stored size).
    pub fn thumbnail(&self, width: i32, height: i32) -> Option<Pixbuf> {
        unsafe { Pixbuf::owned(ffi::itdb_track_get_thumbnail(self.raw(), width, height)) }
    }

    pub fn remove_thumbnails(&mut self) {
        unsafe { ffi::itdb_track_remove_thumbnails(self.raw()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handle::Ownership;
    use chrono::NaiveDate;

    #[test]
    fn test_new_track_defaults() {
        let t = Track::new().unwrap();
        assert!(t.visible());
        assert!(t.checked());
        assert_eq!(t.media_type(), MediaType::Audio);
        assert_eq!(t.mark_unplayed_raw(), ffi::ITDB_MARK_PLAYED);
        assert!(t.itdb().is_none());
        assert_eq!(t.chapter_data().unwrap().ownership(), Ownership::Borrowed);
    }

    #[test]
    fn test_unplayed_sentinel_is_preserved() {
        let mut t = Track::new().unwrap();
        t.set_mark_unplayed_raw(2);
        assert_eq!(t.mark_unplayed_raw(), 2);
        assert!(t.is_unplayed());
        t.set_unplayed(false);
        assert_eq!(t.mark_unplayed_raw(), 1);
        t.set_mark_unplayed_raw(0);
        assert!(!t.is_unplayed());
        assert_eq!(t.mark_unplayed_raw(), 0);
    }

    #[test]
    fn test_checked_is_inverted() {
        let mut t = Track::new().unwrap();
        t.set_checked(false);
        assert_eq!(unsafe { (*t.handle().as_ptr()).checked }, 1);
        t.set_checked(true);
        assert!(t.checked());
    }

    #[test]
    fn test_string_and_time_fields() {
        let mut t = Track::new().unwrap();
        t.set_title(Some("Song")).unwrap();
        t.set_ipod_path(Some(":iPod_Control:Music:F00:a.mp3")).unwrap();
        assert_eq!(t.title().as_deref(), Some("Song"));
        let local = t.ipod_path_local().unwrap();
        assert!(local.ends_with("a.mp3"));
        t.set_title(None).unwrap();
        assert_eq!(t.title(), None);

        let when = NaiveDate::from_ymd_opt(2007, 3, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        t.set_time_added(when);
        assert_eq!(t.time_added(), when);
    }

    #[test]
    fn test_media_type_passes_unknown_bits() {
        assert_eq!(MediaType::from(0x0006), MediaType::VideoPodcast);
        assert_eq!(MediaType::from(0x1_0000), MediaType::Other(0x1_0000));
        assert!(MediaType::VideoPodcast.contains(MediaType::Podcast));
        assert!(MediaType::TvShow.is_video());
        let mut t = Track::new().unwrap();
        t.set_media_type(MediaType::Other(0x8001));
        assert_eq!(u32::from(t.media_type()), 0x8001);
    }

    #[test]
    fn test_set_chapter_data_takes_ownership() {
        let mut t = Track::new().unwrap();
        let cd = ChapterData::new().unwrap();
        cd.add_chapter(1000, "one").unwrap();
        let addr = cd.address();
        t.set_chapter_data(cd).unwrap();
        let now = t.chapter_data().unwrap();
        assert_eq!(now.address(), addr);
        assert_eq!(now.chapters().len(), 1);

        let borrowed = t.chapter_data().unwrap();
        assert!(matches!(t.set_chapter_data(borrowed), Err(GpodError::NotOwned)));
    }

    #[test]
    fn test_thumbnails() {
        let mut t = Track::new().unwrap();
        assert!(!t.has_thumbnails());
        let pb = Pixbuf::new(2, 2, &[5; 12]).unwrap();
        t.set_thumbnails_from_pixbuf(&pb).unwrap();
        assert!(t.has_thumbnails());
        assert_eq!(t.has_artwork_raw(), ffi::ITDB_HAS_ARTWORK);
        assert_eq!(t.thumbnail(1, 1).unwrap().width(), 1);
        t.remove_thumbnails();
        assert!(!t.has_thumbnails());
        assert_eq!(t.has_artwork_raw(), ffi::ITDB_NO_ARTWORK);
    }

    #[test]
    fn test_duplicate_is_owned_and_detached() {
        let mut t = Track::new().unwrap();
        t.set_artist(Some("Band")).unwrap();
        let copy = t.duplicate().unwrap();
        assert_eq!(copy.ownership(), Ownership::Owned);
        assert_eq!(copy.artist().as_deref(), Some("Band"));
        assert_ne!(copy.chapter_data().unwrap().address(), t.chapter_data().unwrap().address());
    }
}
