//! Photo albums

use crate::core::handle::{Liveness, NativeHandle, NativeRecord, Record};
use crate::core::list::{LazyList, ListBinding, Membership};
use crate::core::overlay::overlay;
use crate::error::{c_string, GpodError, Result};
use crate::record::adopt;
use crate::record::artwork::Artwork;
use gpod_native as ffi;
use std::rc::Rc;

impl NativeRecord for ffi::Itdb_PhotoAlbum {
    const KIND: &'static str = "photoalbum";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_photodb_photoalbum_free(ptr);
    }
}

/// Named selection of photos with slideshow settings
#[derive(Debug)]
pub struct PhotoAlbum {
    handle: NativeHandle<ffi::Itdb_PhotoAlbum>,
}

impl Record for PhotoAlbum {
    type Raw = ffi::Itdb_PhotoAlbum;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        PhotoAlbum { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

impl PhotoAlbum {
    /// Detached album with default slideshow settings.
    pub fn new(name: &str) -> Result<Self> {
        let name = c_string(name)?;
        adopt(
            unsafe { ffi::itdb_photodb_photoalbum_new(name.as_ptr()) },
            "itdb_photodb_photoalbum_new",
        )
    }

    overlay! {
        string name => name, set_name;
        /// 1 for the Photo Library, 2 for user albums
        int album_type: u8 => album_type, set_album_type;
        bool playmusic => play_music, set_play_music;
        bool repeat => repeat, set_repeat;
        bool random => random, set_random;
        bool show_titles => show_titles, set_show_titles;
        int transition_direction: u8 => transition_direction, set_transition_direction;
        /// Seconds per slide
        int slide_duration: i32 => slide_duration, set_slide_duration;
        /// Milliseconds
        int transition_duration: i32 => transition_duration, set_transition_duration;
        /// dbid of the track played during the slideshow
        int song_id: u64 => song_id, set_song_id;
        int album_id: i32 => album_id, set_album_id;
        int prev_album_id: i32 => prev_album_id, set_prev_album_id;
    }

    /// Whether this is the Photo Library album holding every photo.
    pub fn is_photo_library(&self) -> bool {
        self.album_type() == ffi::ITDB_PHOTOALBUM_TYPE_MASTER
    }

    /// Address of the photo database the album is in, if any.
    pub fn photodb(&self) -> Option<usize> {
        let db = unsafe { (*self.handle.as_ptr()).photodb };
        (!db.is_null()).then_some(db as usize)
    }

    /// Photos in album order. The database owns them; linking requires
    /// the album and the photo to be in the same database.
    pub fn photos(&self) -> LazyList<AlbumPhotos> {
        LazyList::new(AlbumPhotos {
            raw: self.handle.as_ptr(),
            owner: Rc::clone(self.handle.node()),
        })
    }
}

#[doc(hidden)]
pub struct AlbumPhotos {
    raw: *mut ffi::Itdb_PhotoAlbum,
    owner: Rc<Liveness>,
}

impl AlbumPhotos {
    fn photodb(&self) -> Result<*mut ffi::Itdb_PhotoDB> {
        let db = unsafe { (*self.raw).photodb };
        if db.is_null() {
            return Err(GpodError::Precondition("album is not part of a photo database".into()));
        }
        Ok(db)
    }
}

impl ListBinding for AlbumPhotos {
    type Item = Artwork;

    fn head(&self) -> *mut ffi::GList {
        unsafe { (*self.raw).members }
    }

    fn owner(&self) -> &Rc<Liveness> {
        &self.owner
    }

    fn membership(&self) -> Membership {
        Membership::Referencing
    }

    fn link(&self, item: &Artwork, index: i32) -> Result<()> {
        let db = self.photodb()?;
        let ok = unsafe { ffi::itdb_photodb_photoalbum_add_photo(db, self.raw, item.handle().as_ptr(), index) };
        if ok == ffi::FALSE {
            return Err(GpodError::Precondition("photo is not in the album's database".into()));
        }
        Ok(())
    }

    fn unlink(&self, raw: *mut ffi::Itdb_Artwork) -> Result<()> {
        let db = self.photodb()?;
        unsafe { ffi::itdb_photodb_remove_photo(db, self.raw, raw) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handle::Ownership;

    #[test]
    fn test_new_album_defaults() {
        let mut album = PhotoAlbum::new("Holiday").unwrap();
        assert_eq!(album.name().as_deref(), Some("Holiday"));
        assert_eq!(album.album_type(), ffi::ITDB_PHOTOALBUM_TYPE_NORMAL);
        assert_eq!(album.slide_duration(), 3);
        assert!(!album.is_photo_library());
        assert!(album.photodb().is_none());
        album.set_repeat(true);
        assert!(album.repeat());
    }

    #[test]
    fn test_detached_album_rejects_photos() {
        let album = PhotoAlbum::new("x").unwrap();
        let photo = Artwork::new().unwrap();
        assert!(matches!(album.photos().push(&photo), Err(GpodError::Precondition(_))));
        assert!(album.photos().is_empty());
        assert_eq!(photo.ownership(), Ownership::Owned);
    }
}
