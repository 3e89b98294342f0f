//! Photo database root
//!
//! A [`PhotoDb`] owns every photo and album on the device. Photos only
//! enter through the `add_photo_*` constructors, which also reference them
//! from the Photo Library album; the photo list itself cannot be spliced.

use crate::core::handle::{Liveness, NativeHandle, NativeRecord, Record};
use crate::core::list::{native_position, walk, LazyList, ListBinding, Membership};
use crate::error::{c_path, c_string, check, check_ok, GpodError, Result};
use crate::itdb::parsed;
use crate::record::adopt;
use crate::record::{Artwork, Device, Pixbuf, PhotoAlbum};
use gpod_native as ffi;
use std::path::Path;
use std::ptr;
use std::rc::Rc;
use tracing::{debug, info};

impl NativeRecord for ffi::Itdb_PhotoDB {
    const KIND: &'static str = "photodb";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_photodb_free(ptr);
    }
}

#[derive(Debug)]
pub struct PhotoDb {
    handle: NativeHandle<ffi::Itdb_PhotoDB>,
}

impl Record for PhotoDb {
    type Raw = ffi::Itdb_PhotoDB;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        PhotoDb { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

impl PhotoDb {
    /// Empty database holding only the Photo Library album.
    pub fn create(mountpoint: Option<&Path>) -> Result<Self> {
        let mp = mountpoint.map(c_path).transpose()?;
        let raw = unsafe { ffi::itdb_photodb_create(mp.as_ref().map_or(ptr::null(), |m| m.as_ptr())) };
        adopt(raw, "itdb_photodb_create")
    }

    /// Read the photo database of the iPod at `mountpoint`. A device that
    /// has a `Photos` directory but no database yields an empty one.
    pub fn parse(mountpoint: &Path) -> Result<Self> {
        let mp = c_path(mountpoint)?;
        let mut err = ptr::null_mut();
        let db: PhotoDb = unsafe { parsed(ffi::itdb_photodb_parse(mp.as_ptr(), &mut err), err, "itdb_photodb_parse")? };
        info!(mountpoint = %mountpoint.display(), photos = db.photos().len(), "opened photodb");
        Ok(db)
    }

    fn raw(&self) -> *mut ffi::Itdb_PhotoDB {
        self.handle.as_ptr()
    }

    pub fn write(&self) -> Result<()> {
        let mut err = ptr::null_mut();
        unsafe {
            let ok = ffi::itdb_photodb_write(self.raw(), &mut err);
            check_ok(ok, err, "itdb_photodb_write")?;
        }
        Ok(())
    }

    pub fn device(&self) -> Option<Device> {
        unsafe { Device::borrowed((*self.raw()).device, self.handle.node()) }
    }

    /// Every photo, in database order.
    pub fn photos(&self) -> LazyList<PhotoDbPhotos> {
        LazyList::new(PhotoDbPhotos {
            raw: self.raw(),
            owner: Rc::clone(self.handle.node()),
        })
    }

    /// Albums, Photo Library first.
    pub fn photo_albums(&self) -> LazyList<PhotoDbAlbums> {
        LazyList::new(PhotoDbAlbums {
            raw: self.raw(),
            owner: Rc::clone(self.handle.node()),
        })
    }

    fn adopt_photo(&self, raw: *mut ffi::Itdb_Artwork, err: *mut ffi::GError) -> Result<Artwork> {
        unsafe { check(err)? };
        let photo = unsafe { Artwork::borrowed(raw, self.handle.node()) }
            .ok_or_else(|| GpodError::Precondition("photo was not added".into()))?;
        debug!(id = photo.id(), "photo added");
        Ok(photo)
    }

    /// Add the image file at `path`. `position` of `None` appends.
    pub fn add_photo_from_file(&self, path: &Path, position: Option<usize>, rotation: i32) -> Result<Artwork> {
        let filename = c_path(path)?;
        let pos = native_position(position)?;
        let mut err = ptr::null_mut();
        let raw = unsafe { ffi::itdb_photodb_add_photo(self.raw(), filename.as_ptr(), pos, rotation, &mut err) };
        self.adopt_photo(raw, err)
    }

    pub fn add_photo_from_data(&self, data: &[u8], position: Option<usize>, rotation: i32) -> Result<Artwork> {
        let pos = native_position(position)?;
        let mut err = ptr::null_mut();
        let raw = unsafe {
            ffi::itdb_photodb_add_photo_from_data(self.raw(), data.as_ptr(), data.len(), pos, rotation, &mut err)
        };
        self.adopt_photo(raw, err)
    }

    pub fn add_photo_from_pixbuf(&self, pixbuf: &Pixbuf, position: Option<usize>, rotation: i32) -> Result<Artwork> {
        let pos = native_position(position)?;
        let mut err = ptr::null_mut();
        let raw = unsafe {
            ffi::itdb_photodb_add_photo_from_pixbuf(self.raw(), pixbuf.handle().as_ptr(), pos, rotation, &mut err)
        };
        self.adopt_photo(raw, err)
    }

    fn contains_photo(&self, photo: &Artwork) -> bool {
        let target = photo.handle().as_ptr();
        unsafe { walk::<ffi::Itdb_Artwork>((*self.raw()).photos) }.contains(&target)
    }

    /// With an album, drop the photo from that album only. Without one,
    /// delete it from every album and free it.
    pub fn remove_photo(&self, album: Option<&PhotoAlbum>, photo: Artwork) -> Result<()> {
        if !self.contains_photo(&photo) {
            return Err(GpodError::Precondition("photo is not part of this database".into()));
        }
        let album_raw = match album {
            Some(a) if a.photodb() != Some(self.address()) => {
                return Err(GpodError::Precondition("album is not part of this database".into()));
            }
            Some(a) => a.handle().as_ptr(),
            None => ptr::null_mut(),
        };
        unsafe { ffi::itdb_photodb_remove_photo(self.raw(), album_raw, photo.handle().as_ptr()) };
        Ok(())
    }

    /// New album at `position` (`None` appends).
    pub fn create_album(&self, name: &str, position: Option<usize>) -> Result<PhotoAlbum> {
        let name = c_string(name)?;
        let pos = native_position(position)?;
        let raw = unsafe { ffi::itdb_photodb_photoalbum_create(self.raw(), name.as_ptr(), pos) };
        unsafe { PhotoAlbum::borrowed(raw, self.handle.node()) }
            .ok_or_else(|| GpodError::Precondition("album was not created".into()))
    }

    /// Album called `name`; `None` finds the Photo Library.
    pub fn album_by_name(&self, name: Option<&str>) -> Result<Option<PhotoAlbum>> {
        let name = name.map(c_string).transpose()?;
        let raw = unsafe {
            ffi::itdb_photodb_photoalbum_by_name(self.raw(), name.as_ref().map_or(ptr::null(), |n| n.as_ptr()))
        };
        Ok(unsafe { PhotoAlbum::borrowed(raw, self.handle.node()) })
    }

    pub fn photo_library(&self) -> Option<PhotoAlbum> {
        let raw = unsafe { ffi::itdb_photodb_photoalbum_by_name(self.raw(), ptr::null()) };
        unsafe { PhotoAlbum::borrowed(raw, self.handle.node()) }
    }

    /// Unlink and free an album, optionally deleting its photos too.
    pub fn remove_album(&self, album: PhotoAlbum, remove_pics: bool) -> Result<()> {
        if album.photodb() != Some(self.address()) {
            return Err(GpodError::Precondition("album is not part of this database".into()));
        }
        unsafe {
            ffi::itdb_photodb_photoalbum_remove(self.raw(), album.handle().as_ptr(), ffi::gboolean::from(remove_pics))
        };
        debug!(remove_pics, "album removed");
        Ok(())
    }
}

#[doc(hidden)]
pub struct PhotoDbPhotos {
    raw: *mut ffi::Itdb_PhotoDB,
    owner: Rc<Liveness>,
}

impl ListBinding for PhotoDbPhotos {
    type Item = Artwork;

    fn head(&self) -> *mut ffi::GList {
        unsafe { (*self.raw).photos }
    }

    fn owner(&self) -> &Rc<Liveness> {
        &self.owner
    }

    fn membership(&self) -> Membership {
        Membership::Owning
    }

    fn link(&self, _item: &Artwork, _index: i32) -> Result<()> {
        Err(GpodError::Unsupported("photos are added with PhotoDb::add_photo_*"))
    }

    fn unlink(&self, _raw: *mut ffi::Itdb_Artwork) -> Result<()> {
        Err(GpodError::Unsupported("photos are removed with PhotoDb::remove_photo"))
    }
}

#[doc(hidden)]
pub struct PhotoDbAlbums {
    raw: *mut ffi::Itdb_PhotoDB,
    owner: Rc<Liveness>,
}

impl ListBinding for PhotoDbAlbums {
    type Item = PhotoAlbum;

    fn head(&self) -> *mut ffi::GList {
        unsafe { (*self.raw).photoalbums }
    }

    fn owner(&self) -> &Rc<Liveness> {
        &self.owner
    }

    fn membership(&self) -> Membership {
        Membership::Owning
    }

    fn link(&self, item: &PhotoAlbum, index: i32) -> Result<()> {
        if item.photodb().is_some() {
            return Err(GpodError::AlreadyLinked);
        }
        unsafe { ffi::itdb_photodb_photoalbum_add(self.raw, item.handle().as_ptr(), index) };
        Ok(())
    }

    fn unlink(&self, raw: *mut ffi::Itdb_PhotoAlbum) -> Result<()> {
        unsafe { ffi::itdb_photodb_photoalbum_unlink(raw) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handle::Ownership;
    use tempfile::TempDir;

    fn ppm(rgb: [u8; 3]) -> Vec<u8> {
        let mut data = b"P6\n1 1\n255\n".to_vec();
        data.extend_from_slice(&rgb);
        data
    }

    #[test]
    fn test_create_has_photo_library() {
        let db = PhotoDb::create(None).unwrap();
        assert_eq!(db.photo_albums().len(), 1);
        let lib = db.photo_library().unwrap();
        assert!(lib.is_photo_library());
        assert_eq!(lib.name().as_deref(), Some("Photo Library"));
        assert_eq!(lib.photodb(), Some(db.address()));
    }

    #[test]
    fn test_add_photo_lands_in_library() {
        let db = PhotoDb::create(None).unwrap();
        let photo = db.add_photo_from_data(&ppm([1, 2, 3]), None, 0).unwrap();
        assert_eq!(photo.ownership(), Ownership::Borrowed);
        assert_eq!(db.photos().len(), 1);
        assert!(db.photo_library().unwrap().photos().contains(&photo));
        assert!(matches!(db.photos().push(&photo), Err(GpodError::AlreadyLinked)));
        let loose = Artwork::new().unwrap();
        assert!(matches!(db.photos().push(&loose), Err(GpodError::Unsupported(_))));
        assert_eq!(loose.ownership(), Ownership::Owned);
        assert!(matches!(db.photos().remove_at(0), Err(GpodError::Unsupported(_))));
    }

    #[test]
    fn test_failed_add_leaves_db_unchanged() {
        let db = PhotoDb::create(None).unwrap();
        assert!(db.add_photo_from_data(b"not an image", None, 0).is_err());
        assert!(db.photos().is_empty());
    }

    #[test]
    fn test_album_membership() {
        let db = PhotoDb::create(None).unwrap();
        let photo = db.add_photo_from_data(&ppm([0, 0, 0]), None, 0).unwrap();
        let album = db.create_album("Trip", None).unwrap();
        album.photos().push(&photo).unwrap();
        assert_eq!(album.photos().len(), 1);

        db.remove_photo(Some(&album), db.photos().get(0).unwrap()).unwrap();
        assert!(album.photos().is_empty());
        assert_eq!(db.photos().len(), 1);

        db.remove_photo(None, photo).unwrap();
        assert!(db.photos().is_empty());
        assert!(db.photo_library().unwrap().photos().is_empty());
    }

    #[test]
    fn test_foreign_photo_is_rejected() {
        let db = PhotoDb::create(None).unwrap();
        let loose = Artwork::new().unwrap();
        assert!(matches!(db.remove_photo(None, loose), Err(GpodError::Precondition(_))));
        let album = db.create_album("x", None).unwrap();
        let other = PhotoDb::create(None).unwrap();
        let theirs = other.add_photo_from_data(&ppm([5, 5, 5]), None, 0).unwrap();
        assert!(matches!(album.photos().push(&theirs), Err(GpodError::Precondition(_))));
    }

    #[test]
    fn test_remove_album_with_pictures() {
        let db = PhotoDb::create(None).unwrap();
        let photo = db.add_photo_from_data(&ppm([7, 7, 7]), None, 0).unwrap();
        let album = db.create_album("Gone", Some(1)).unwrap();
        album.photos().push(&photo).unwrap();
        assert_eq!(db.album_by_name(Some("Gone")).unwrap().unwrap().album_id(), album.album_id());
        db.remove_album(album, true).unwrap();
        assert_eq!(db.photo_albums().len(), 1);
        assert!(db.photos().is_empty());
        assert!(db.album_by_name(Some("Gone")).unwrap().is_none());
    }

    #[test]
    fn test_albums_list_moves_ownership() {
        let db = PhotoDb::create(None).unwrap();
        let album = PhotoAlbum::new("Loose").unwrap();
        db.photo_albums().push(&album).unwrap();
        assert_eq!(album.ownership(), Ownership::Borrowed);
        assert!(matches!(db.photo_albums().push(&album), Err(GpodError::AlreadyLinked)));
        assert!(db.photo_albums().remove(&album).unwrap());
        assert_eq!(album.ownership(), Ownership::Owned);
        assert!(album.photodb().is_none());
    }

    #[test]
    fn test_write_and_parse() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("iPod_Control/Photos")).unwrap();
        let empty = PhotoDb::parse(dir.path()).unwrap();
        assert!(empty.photos().is_empty());

        let db = PhotoDb::create(Some(dir.path())).unwrap();
        db.add_photo_from_data(&ppm([4, 5, 6]), None, 0).unwrap();
        db.create_album("Saved", None).unwrap();
        db.write().unwrap();

        let again = PhotoDb::parse(dir.path()).unwrap();
        assert_eq!(again.photos().len(), 1);
        assert!(again.album_by_name(Some("Saved")).unwrap().is_some());
        let pb = again.photos().get(0).unwrap().pixbuf(None, -1, -1).unwrap();
        assert_eq!(pb.pixels(), &[4, 5, 6]);
    }

    #[test]
    fn test_parse_without_photos_dir_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(PhotoDb::parse(dir.path()), Err(GpodError::Native(_))));
    }
}
