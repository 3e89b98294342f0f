//! Artwork, thumbnails and pixel buffers

use crate::core::handle::{NativeHandle, NativeRecord, Record};
use crate::core::list::walk;
use crate::core::overlay::overlay;
use crate::error::{c_path, check, GpodError, Result};
use crate::record::adopt;
use crate::record::device::Device;
use gpod_native as ffi;
use std::path::Path;
use std::ptr;
use tracing::debug;

impl NativeRecord for ffi::Itdb_Pixbuf {
    const KIND: &'static str = "pixbuf";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_pixbuf_free(ptr);
    }
}

impl NativeRecord for ffi::Itdb_Thumb {
    const KIND: &'static str = "thumb";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_thumb_free(ptr);
    }
}

impl NativeRecord for ffi::Itdb_Artwork {
    const KIND: &'static str = "artwork";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_artwork_free(ptr);
    }
}

/// Opaque packed-RGB image
#[derive(Debug)]
pub struct Pixbuf {
    handle: NativeHandle<ffi::Itdb_Pixbuf>,
}

impl Record for Pixbuf {
    type Raw = ffi::Itdb_Pixbuf;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        Pixbuf { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

impl Pixbuf {
    /// Build an image from `width * height * 3` RGB bytes.
    pub fn new(width: u32, height: u32, rgb: &[u8]) -> Result<Self> {
        let raw = unsafe { ffi::itdb_pixbuf_new(width, height, rgb.as_ptr(), rgb.len()) };
        if raw.is_null() {
            return Err(GpodError::Precondition(format!(
                "{} bytes is not a {width}x{height} RGB image",
                rgb.len()
            )));
        }
        adopt(raw, "itdb_pixbuf_new")
    }

    pub fn width(&self) -> u32 {
        unsafe { ffi::itdb_pixbuf_width(self.handle.as_ptr()) }
    }

    pub fn height(&self) -> u32 {
        unsafe { ffi::itdb_pixbuf_height(self.handle.as_ptr()) }
    }

    pub fn pixels(&self) -> &[u8] {
        let mut len = 0usize;
        unsafe {
            let data = ffi::itdb_pixbuf_pixels(self.handle.as_ptr(), &mut len);
            if data.is_null() {
                return &[];
            }
            std::slice::from_raw_parts(data, len)
        }
    }
}

/// Source image of an artwork
#[derive(Debug)]
pub struct Thumbnail {
    handle: NativeHandle<ffi::Itdb_Thumb>,
}

impl Record for Thumbnail {
    type Raw = ffi::Itdb_Thumb;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        Thumbnail { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

fn device_ptr(device: Option<&Device>) -> *const ffi::Itdb_Device {
    device.map_or(ptr::null(), |d| d.handle().as_ptr().cast_const())
}

impl Thumbnail {
    pub fn duplicate(&self) -> Result<Self> {
        adopt(unsafe { ffi::itdb_thumb_duplicate(self.handle.as_ptr()) }, "itdb_thumb_duplicate")
    }

    /// Render at `width` x `height`. `-1` for both picks the largest size
    /// the device stores, or the source size without a device.
    pub fn to_pixbuf_at_size(&self, device: Option<&Device>, width: i32, height: i32) -> Result<Pixbuf> {
        let raw = unsafe { ffi::itdb_thumb_to_pixbuf_at_size(device_ptr(device), self.handle.as_ptr(), width, height) };
        adopt(raw, "itdb_thumb_to_pixbuf_at_size")
    }

    /// One rendition per cover-art format of the device.
    pub fn to_pixbufs(&self, device: Option<&Device>) -> Vec<Pixbuf> {
        unsafe {
            let list = ffi::itdb_thumb_to_pixbufs(device_ptr(device), self.handle.as_ptr());
            let out = walk::<ffi::Itdb_Pixbuf>(list)
                .into_iter()
                .filter_map(|raw| Pixbuf::owned(raw))
                .collect();
            // the pixbufs now belong to the wrappers; only the nodes go
            ffi::g_list_free(list);
            out
        }
    }
}

/// Artwork record of a track or a photo
#[derive(Debug)]
pub struct Artwork {
    handle: NativeHandle<ffi::Itdb_Artwork>,
}

impl Record for Artwork {
    type Raw = ffi::Itdb_Artwork;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        Artwork { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

impl Artwork {
    pub fn new() -> Result<Self> {
        adopt(ffi::itdb_artwork_new(), "itdb_artwork_new")
    }

    /// Deep copy including the thumbnail.
    pub fn duplicate(&self) -> Result<Self> {
        adopt(unsafe { ffi::itdb_artwork_duplicate(self.handle.as_ptr()) }, "itdb_artwork_duplicate")
    }

    overlay! {
        int id: u32 => id, set_id;
        int dbid: u64 => dbid, set_dbid;
        time creation_date => creation_date, set_creation_date;
        time digitized_date => digitized_date, set_digitized_date;
        /// Size in bytes of the stored thumbnail pixels
        int artwork_size: u32 => artwork_size, set_artwork_size;
    }

    /// Star rating, 0 to 5.
    pub fn rating(&self) -> u32 {
        unsafe { (*self.handle.as_ptr()).rating / 20 }
    }

    /// Values above 5 are stored as 5.
    pub fn set_rating(&mut self, stars: u32) {
        unsafe { (*self.handle.as_ptr()).rating = stars.min(5) * 20 }
    }

    /// The thumbnail, owned by this artwork.
    pub fn thumbnail(&self) -> Option<Thumbnail> {
        unsafe { Thumbnail::borrowed((*self.handle.as_ptr()).thumbnail, self.handle.node()) }
    }

    pub fn has_thumbnail(&self) -> bool {
        unsafe { !(*self.handle.as_ptr()).thumbnail.is_null() }
    }

    /// Render the thumbnail; `None` when there is none.
    pub fn pixbuf(&self, device: Option<&Device>, width: i32, height: i32) -> Option<Pixbuf> {
        unsafe {
            Pixbuf::owned(ffi::itdb_artwork_get_pixbuf(
                device_ptr(device),
                self.handle.as_ptr(),
                width,
                height,
            ))
        }
    }

    /// Use a copy of `pixbuf`, turned by `rotation` degrees (0/90/180/270).
    pub fn set_thumbnail_from_pixbuf(&mut self, pixbuf: &Pixbuf, rotation: i32) -> Result<()> {
        let mut err = ptr::null_mut();
        unsafe {
            ffi::itdb_artwork_set_thumbnail_from_pixbuf(self.handle.as_ptr(), pixbuf.handle().as_ptr(), rotation, &mut err);
            check(err)?;
        }
        debug!(addr = self.address(), rotation, "artwork thumbnail from pixbuf");
        Ok(())
    }

    /// Load a binary PPM file.
    pub fn set_thumbnail_from_file(&mut self, path: &Path, rotation: i32) -> Result<()> {
        let filename = c_path(path)?;
        let mut err = ptr::null_mut();
        unsafe {
            ffi::itdb_artwork_set_thumbnail(self.handle.as_ptr(), filename.as_ptr(), rotation, &mut err);
            check(err)
        }
    }

    /// Binary PPM bytes already in memory.
    pub fn set_thumbnail_from_data(&mut self, data: &[u8], rotation: i32) -> Result<()> {
        let mut err = ptr::null_mut();
        unsafe {
            ffi::itdb_artwork_set_thumbnail_from_data(self.handle.as_ptr(), data.as_ptr(), data.len(), rotation, &mut err);
            check(err)
        }
    }

    pub fn remove_thumbnails(&mut self) {
        unsafe { ffi::itdb_artwork_remove_thumbnails(self.handle.as_ptr()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handle::Ownership;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Pixbuf {
        let bytes: Vec<u8> = (0..w * h).flat_map(|_| rgb).collect();
        Pixbuf::new(w, h, &bytes).unwrap()
    }

    #[test]
    fn test_pixbuf_rejects_bad_length() {
        assert!(Pixbuf::new(2, 2, &[0; 5]).is_err());
        let pb = solid(2, 1, [1, 2, 3]);
        assert_eq!(pb.pixels(), &[1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_rating_scale() {
        let mut art = Artwork::new().unwrap();
        art.set_rating(3);
        assert_eq!(art.rating(), 3);
        art.set_rating(9);
        assert_eq!(art.rating(), 5);
    }

    #[test]
    fn test_thumbnail_is_borrowed_and_renders() {
        let mut art = Artwork::new().unwrap();
        assert!(art.thumbnail().is_none());
        art.set_thumbnail_from_pixbuf(&solid(4, 2, [9, 9, 9]), 90).unwrap();
        assert_eq!(art.artwork_size(), 24);
        let thumb = art.thumbnail().unwrap();
        assert_eq!(thumb.ownership(), Ownership::Borrowed);
        let pb = thumb.to_pixbuf_at_size(None, -1, -1).unwrap();
        assert_eq!((pb.width(), pb.height()), (2, 4));
        assert_eq!(thumb.to_pixbufs(None).len(), 1);
        let copy = thumb.duplicate().unwrap();
        assert_eq!(copy.ownership(), Ownership::Owned);
    }

    #[test]
    fn test_bad_rotation_is_native_error() {
        let mut art = Artwork::new().unwrap();
        match art.set_thumbnail_from_pixbuf(&solid(1, 1, [0, 0, 0]), 45) {
            Err(GpodError::Native(e)) => assert!(e.domain.contains("artwork"), "{e}"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!art.has_thumbnail());
    }

    #[test]
    fn test_ppm_data_and_remove() {
        let mut art = Artwork::new().unwrap();
        let mut data = b"P6\n1 1\n255\n".to_vec();
        data.extend_from_slice(&[10, 20, 30]);
        art.set_thumbnail_from_data(&data, 0).unwrap();
        assert_eq!(art.pixbuf(None, -1, -1).unwrap().pixels(), &[10, 20, 30]);
        art.remove_thumbnails();
        assert!(art.pixbuf(None, -1, -1).is_none());
        assert!(art.set_thumbnail_from_data(b"P3 nope", 0).is_err());
    }
}
