//! Artwork records and their thumbnails
//!
//! An `Itdb_Artwork` optionally owns one `Itdb_Thumb`, which holds the
//! source image. Renditions for a device are produced on demand as
//! `Itdb_Pixbuf` values sized to the device's artwork formats.

use crate::device::{generation_of, Itdb_Device};
use crate::error::{set_error, GError, ITDB_ARTWORK_ERROR, ITDB_ARTWORK_ERROR_IMAGE, ITDB_ARTWORK_ERROR_ROTATION};
use crate::glist::{g_list_append, GList};
use crate::ipod_info;
use crate::mem::{self, read_str};
use crate::pixbuf::{pixbuf_from_image, Image, ImageError, Itdb_Pixbuf};
use crate::{gboolean, gpointer, FALSE, TRUE};
use std::fs;
use std::os::raw::{c_char, c_int};
use std::ptr;
use tracing::debug;

#[repr(C)]
#[derive(Debug)]
pub struct Itdb_Artwork {
    pub thumbnail: *mut Itdb_Thumb,
    pub id: u32,
    pub dbid: u64,
    pub unk028: i32,
    /// Star rating times 20
    pub rating: u32,
    pub unk036: i32,
    pub creation_date: i32,
    pub digitized_date: i32,
    pub artwork_size: u32,
}

/// Opaque thumbnail
#[derive(Debug, Clone)]
pub struct Itdb_Thumb {
    pub(crate) image: Image,
}

pub(crate) fn thumb_from_image(image: Image) -> *mut Itdb_Thumb {
    mem::alloc(Itdb_Thumb { image }, "thumb")
}

#[no_mangle]
pub unsafe extern "C" fn itdb_thumb_duplicate(thumb: *const Itdb_Thumb) -> *mut Itdb_Thumb {
    thumb
        .as_ref()
        .map_or(ptr::null_mut(), |t| thumb_from_image(t.image.clone()))
}

#[no_mangle]
pub unsafe extern "C" fn itdb_thumb_free(thumb: *mut Itdb_Thumb) {
    if !thumb.is_null() {
        mem::dealloc(thumb, "thumb");
    }
}

/// Render the thumbnail at `width` x `height`. Non-positive sizes pick the
/// largest rendition the device stores, or the source size without a device.
#[no_mangle]
pub unsafe extern "C" fn itdb_thumb_to_pixbuf_at_size(
    device: *const Itdb_Device,
    thumb: *const Itdb_Thumb,
    width: c_int,
    height: c_int,
) -> *mut Itdb_Pixbuf {
    let Some(thumb) = thumb.as_ref() else {
        return ptr::null_mut();
    };
    let (w, h) = if width <= 0 && height <= 0 {
        generation_of(device)
            .and_then(|g| ipod_info::cover_art_formats(g).last())
            .map_or((-1, -1), |f| (f.width, f.height))
    } else {
        (width, height)
    };
    pixbuf_from_image(thumb.image.scaled(w, h))
}

/// One pixbuf per cover-art rendition the device stores (a single
/// source-sized pixbuf when the device stores none).
#[no_mangle]
pub unsafe extern "C" fn itdb_thumb_to_pixbufs(device: *const Itdb_Device, thumb: *const Itdb_Thumb) -> *mut GList {
    let Some(thumb) = thumb.as_ref() else {
        return ptr::null_mut();
    };
    let formats = generation_of(device).map_or(&[][..], ipod_info::cover_art_formats);
    if formats.is_empty() {
        return g_list_append(ptr::null_mut(), pixbuf_from_image(thumb.image.clone()) as gpointer);
    }
    formats.iter().fold(ptr::null_mut(), |list, f| {
        g_list_append(list, pixbuf_from_image(thumb.image.scaled(f.width, f.height)) as gpointer)
    })
}

#[no_mangle]
pub extern "C" fn itdb_artwork_new() -> *mut Itdb_Artwork {
    mem::alloc(
        Itdb_Artwork {
            thumbnail: ptr::null_mut(),
            id: 0,
            dbid: 0,
            unk028: 0,
            rating: 0,
            unk036: 0,
            creation_date: 0,
            digitized_date: 0,
            artwork_size: 0,
        },
        "artwork",
    )
}

#[no_mangle]
pub unsafe extern "C" fn itdb_artwork_free(artwork: *mut Itdb_Artwork) {
    if artwork.is_null() {
        return;
    }
    itdb_thumb_free((*artwork).thumbnail);
    mem::dealloc(artwork, "artwork");
}

#[no_mangle]
pub unsafe extern "C" fn itdb_artwork_duplicate(artwork: *const Itdb_Artwork) -> *mut Itdb_Artwork {
    let Some(src) = artwork.as_ref() else {
        return ptr::null_mut();
    };
    mem::alloc(
        Itdb_Artwork {
            thumbnail: itdb_thumb_duplicate(src.thumbnail),
            ..*src
        },
        "artwork",
    )
}

unsafe fn install_thumbnail(
    artwork: *mut Itdb_Artwork,
    image: Result<Image, ImageError>,
    rotation: c_int,
    error: *mut *mut GError,
) -> gboolean {
    let Some(art) = artwork.as_mut() else {
        return FALSE;
    };
    let rotated = image.and_then(|img| img.rotated(rotation));
    match rotated {
        Ok(img) => {
            debug!(width = img.width, height = img.height, rotation, "artwork thumbnail set");
            art.artwork_size = img.rgb.len() as u32;
            itdb_thumb_free(art.thumbnail);
            art.thumbnail = thumb_from_image(img);
            TRUE
        }
        Err(e) => {
            let code = match e {
                ImageError::Rotation(_) => ITDB_ARTWORK_ERROR_ROTATION,
                _ => ITDB_ARTWORK_ERROR_IMAGE,
            };
            set_error(error, ITDB_ARTWORK_ERROR, code, e);
            FALSE
        }
    }
}

/// Use an image file (binary PPM) as the artwork thumbnail.
#[no_mangle]
pub unsafe extern "C" fn itdb_artwork_set_thumbnail(
    artwork: *mut Itdb_Artwork,
    filename: *const c_char,
    rotation: c_int,
    error: *mut *mut GError,
) -> gboolean {
    let Some(path) = read_str(filename) else {
        return FALSE;
    };
    match fs::read(&path) {
        Ok(data) => install_thumbnail(artwork, Image::from_ppm(&data), rotation, error),
        Err(e) => {
            set_error(
                error,
                crate::error::G_FILE_ERROR,
                crate::error::file_error_code(&e),
                format!("Failed to read '{}': {}", path, e),
            );
            FALSE
        }
    }
}

/// Use in-memory image data (binary PPM) as the artwork thumbnail.
#[no_mangle]
pub unsafe extern "C" fn itdb_artwork_set_thumbnail_from_data(
    artwork: *mut Itdb_Artwork,
    image_data: *const u8,
    image_data_len: usize,
    rotation: c_int,
    error: *mut *mut GError,
) -> gboolean {
    if image_data.is_null() {
        return FALSE;
    }
    let data = std::slice::from_raw_parts(image_data, image_data_len);
    install_thumbnail(artwork, Image::from_ppm(data), rotation, error)
}

/// Use a copy of `pixbuf` as the artwork thumbnail.
#[no_mangle]
pub unsafe extern "C" fn itdb_artwork_set_thumbnail_from_pixbuf(
    artwork: *mut Itdb_Artwork,
    pixbuf: *const Itdb_Pixbuf,
    rotation: c_int,
    error: *mut *mut GError,
) -> gboolean {
    let Some(pixbuf) = pixbuf.as_ref() else {
        return FALSE;
    };
    install_thumbnail(artwork, Ok(pixbuf.image.clone()), rotation, error)
}

#[no_mangle]
pub unsafe extern "C" fn itdb_artwork_remove_thumbnails(artwork: *mut Itdb_Artwork) {
    let Some(art) = artwork.as_mut() else {
        return;
    };
    itdb_thumb_free(art.thumbnail);
    art.thumbnail = ptr::null_mut();
    art.artwork_size = 0;
}

/// Render the artwork's thumbnail, or NULL if it has none.
#[no_mangle]
pub unsafe extern "C" fn itdb_artwork_get_pixbuf(
    device: *const Itdb_Device,
    artwork: *const Itdb_Artwork,
    width: c_int,
    height: c_int,
) -> *mut Itdb_Pixbuf {
    match artwork.as_ref() {
        Some(art) if !art.thumbnail.is_null() => itdb_thumb_to_pixbuf_at_size(device, art.thumbnail, width, height),
        _ => ptr::null_mut(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::g_error_free;
    use crate::glist::{g_list_free, g_list_length, to_vec};
    use crate::ledger;
    use crate::pixbuf::{itdb_pixbuf_free, itdb_pixbuf_height, itdb_pixbuf_new, itdb_pixbuf_width};

    fn red_pixbuf(w: u32, h: u32) -> *mut Itdb_Pixbuf {
        let rgb: Vec<u8> = (0..w * h).flat_map(|_| [255u8, 0, 0]).collect();
        unsafe { itdb_pixbuf_new(w, h, rgb.as_ptr(), rgb.len()) }
    }

    #[test]
    fn test_thumbnail_render_and_duplicate() {
        let before = ledger::live_allocations();
        unsafe {
            let art = itdb_artwork_new();
            let pb = red_pixbuf(4, 2);
            let mut err = ptr::null_mut();
            assert_eq!(itdb_artwork_set_thumbnail_from_pixbuf(art, pb, 90, &mut err), TRUE);
            itdb_pixbuf_free(pb);

            let out = itdb_artwork_get_pixbuf(ptr::null(), art, -1, -1);
            assert_eq!((itdb_pixbuf_width(out), itdb_pixbuf_height(out)), (2, 4));
            itdb_pixbuf_free(out);

            let copy = itdb_artwork_duplicate(art);
            assert_ne!((*copy).thumbnail, (*art).thumbnail);
            itdb_artwork_free(art);
            let small = itdb_artwork_get_pixbuf(ptr::null(), copy, 1, 1);
            assert_eq!(itdb_pixbuf_width(small), 1);
            itdb_pixbuf_free(small);
            itdb_artwork_free(copy);
        }
        assert_eq!(ledger::live_allocations(), before);
    }

    #[test]
    fn test_bad_rotation_sets_error() {
        unsafe {
            let art = itdb_artwork_new();
            let pb = red_pixbuf(1, 1);
            let mut err = ptr::null_mut();
            assert_eq!(itdb_artwork_set_thumbnail_from_pixbuf(art, pb, 45, &mut err), FALSE);
            assert_eq!((*err).domain, ITDB_ARTWORK_ERROR);
            assert_eq!((*err).code, ITDB_ARTWORK_ERROR_ROTATION);
            assert!((*art).thumbnail.is_null());
            g_error_free(err);
            itdb_pixbuf_free(pb);
            itdb_artwork_free(art);
        }
    }

    #[test]
    fn test_to_pixbufs_without_device_gives_one() {
        unsafe {
            let thumb = thumb_from_image(Image::new(1, 1, vec![1, 2, 3]).unwrap());
            let list = itdb_thumb_to_pixbufs(ptr::null(), thumb);
            assert_eq!(g_list_length(list), 1);
            for pb in to_vec::<Itdb_Pixbuf>(list) {
                itdb_pixbuf_free(pb);
            }
            g_list_free(list);
            itdb_thumb_free(thumb);
        }
    }
}
