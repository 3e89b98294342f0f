//! Photo database root and photo albums
//!
//! The first album of a photo database is the Photo Library (type 1). Every
//! photo in `photos` is a member of it; other albums reference a subset.

use crate::artwork::{
    itdb_artwork_free, itdb_artwork_new, itdb_artwork_set_thumbnail, itdb_artwork_set_thumbnail_from_data,
    itdb_artwork_set_thumbnail_from_pixbuf, Itdb_Artwork,
};
use crate::device::{control_dir, itdb_device_free, itdb_device_new, itdb_device_set_mountpoint, mountpoint_of, Itdb_Device};
use crate::error::{file_error_code, set_error, GError, G_FILE_ERROR, ITDB_FILE_ERROR, ITDB_FILE_ERROR_NOTFOUND};
use crate::glist::{self, g_list_append, g_list_find, g_list_free, g_list_insert, g_list_remove, GList};
use crate::itunesdb::itdb_now;
use crate::mem::{self, dup_str, g_free, read_str};
use crate::persist::{self, PHOTODB_FILE};
use crate::pixbuf::Itdb_Pixbuf;
use crate::{gboolean, gpointer, FALSE, TRUE};
use rand::Rng;
use std::fs;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::{debug, info, warn};

/// Album type of the Photo Library
pub const ITDB_PHOTOALBUM_TYPE_MASTER: u8 = 1;
/// Album type of user albums
pub const ITDB_PHOTOALBUM_TYPE_NORMAL: u8 = 2;

/// Lowest id handed to a new photo
pub const FIRST_PHOTO_ID: u32 = 0x40;

pub const PHOTO_LIBRARY_NAME: &str = "Photo Library";

#[repr(C)]
#[derive(Debug)]
pub struct Itdb_PhotoDB {
    pub photos: *mut GList,
    pub photoalbums: *mut GList,
    pub device: *mut Itdb_Device,
}

#[repr(C)]
#[derive(Debug)]
pub struct Itdb_PhotoAlbum {
    pub photodb: *mut Itdb_PhotoDB,
    pub name: *mut c_char,
    pub members: *mut GList,
    pub album_type: u8,
    pub playmusic: u8,
    pub repeat: u8,
    pub random: u8,
    pub show_titles: u8,
    pub transition_direction: u8,
    pub slide_duration: i32,
    pub transition_duration: i32,
    pub song_id: u64,
    pub album_id: i32,
    pub prev_album_id: i32,
}

/// `<mountpoint>/iPod_Control/Photos`
pub fn photos_dir(mountpoint: &Path) -> PathBuf {
    control_dir(mountpoint).join("Photos")
}

pub fn photodb_path(mountpoint: &Path) -> PathBuf {
    photos_dir(mountpoint).join(PHOTODB_FILE)
}

unsafe fn new_photodb(mountpoint: *const c_char) -> *mut Itdb_PhotoDB {
    let device = itdb_device_new();
    if !mountpoint.is_null() {
        itdb_device_set_mountpoint(device, mountpoint);
    }
    mem::alloc(
        Itdb_PhotoDB {
            photos: ptr::null_mut(),
            photoalbums: ptr::null_mut(),
            device,
        },
        "photodb",
    )
}

/// Empty photo database containing only the Photo Library album.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_create(mountpoint: *const c_char) -> *mut Itdb_PhotoDB {
    let db = new_photodb(mountpoint);
    let name = dup_str(PHOTO_LIBRARY_NAME);
    let master = itdb_photodb_photoalbum_new(name);
    g_free(name as gpointer);
    (*master).album_type = ITDB_PHOTOALBUM_TYPE_MASTER;
    itdb_photodb_photoalbum_add(db, master, -1);
    db
}

/// Read the photo database of the iPod at `mountpoint`. A device without a
/// database file yields an empty one.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_parse(mountpoint: *const c_char, error: *mut *mut GError) -> *mut Itdb_PhotoDB {
    let Some(mp) = read_str(mountpoint).map(PathBuf::from) else {
        return ptr::null_mut();
    };
    let dir = photos_dir(&mp);
    if !dir.is_dir() {
        set_error(
            error,
            ITDB_FILE_ERROR,
            ITDB_FILE_ERROR_NOTFOUND,
            format!("Photos directory not found: '{}'", dir.display()),
        );
        return ptr::null_mut();
    }
    let path = photodb_path(&mp);
    if !path.exists() {
        debug!(path = %path.display(), "no photo database, starting empty");
        return itdb_photodb_create(mountpoint);
    }
    let db = new_photodb(mountpoint);
    match persist::load_photodb(db, &path) {
        Ok(()) => db,
        Err(e) => {
            warn!(error = %e, "itdb_photodb_parse failed");
            e.report(error);
            itdb_photodb_free(db);
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_write(photodb: *mut Itdb_PhotoDB, error: *mut *mut GError) -> gboolean {
    let Some(db) = photodb.as_ref() else {
        return FALSE;
    };
    let Some(mp) = mountpoint_of(db.device) else {
        set_error(error, ITDB_FILE_ERROR, ITDB_FILE_ERROR_NOTFOUND, "Mountpoint not set.");
        return FALSE;
    };
    let dir = photos_dir(&mp);
    if let Err(e) = fs::create_dir_all(&dir) {
        set_error(
            error,
            G_FILE_ERROR,
            file_error_code(&e),
            format!("Problem creating '{}': {}", dir.display(), e),
        );
        return FALSE;
    }
    match persist::save_photodb(photodb, &photodb_path(&mp)) {
        Ok(()) => {
            info!(mountpoint = %mp.display(), "photo database written");
            TRUE
        }
        Err(e) => {
            warn!(error = %e, "itdb_photodb_write failed");
            e.report(error);
            FALSE
        }
    }
}

/// Free the database, its albums, its photos and its device.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_free(photodb: *mut Itdb_PhotoDB) {
    let Some(db) = photodb.as_mut() else {
        return;
    };
    for album in glist::to_vec::<Itdb_PhotoAlbum>(db.photoalbums) {
        (*album).photodb = ptr::null_mut();
        itdb_photodb_photoalbum_free(album);
    }
    g_list_free(db.photoalbums);
    for photo in glist::to_vec::<Itdb_Artwork>(db.photos) {
        itdb_artwork_free(photo);
    }
    g_list_free(db.photos);
    itdb_device_free(db.device);
    mem::dealloc(photodb, "photodb");
}

unsafe fn next_photo_id(db: &Itdb_PhotoDB) -> u32 {
    glist::to_vec::<Itdb_Artwork>(db.photos)
        .into_iter()
        .map(|p| (*p).id + 1)
        .max()
        .unwrap_or(FIRST_PHOTO_ID)
        .max(FIRST_PHOTO_ID)
}

/// Splice a thumbnailed artwork into `photos` and the Photo Library, or
/// free it when the thumbnail could not be set.
unsafe fn adopt_photo(db: *mut Itdb_PhotoDB, photo: *mut Itdb_Artwork, ok: gboolean, pos: c_int) -> *mut Itdb_Artwork {
    if ok == FALSE {
        itdb_artwork_free(photo);
        return ptr::null_mut();
    }
    let d = &mut *db;
    let p = &mut *photo;
    p.id = next_photo_id(d);
    p.dbid = rand::thread_rng().gen_range(1..u64::MAX);
    p.creation_date = itdb_now();
    p.digitized_date = p.creation_date;
    d.photos = g_list_insert(d.photos, photo as gpointer, pos);
    let master = itdb_photodb_photoalbum_by_name(db, ptr::null());
    if let Some(master) = master.as_mut() {
        master.members = g_list_append(master.members, photo as gpointer);
    }
    debug!(id = p.id, "photo added");
    photo
}

/// Add the image file `filename` as a photo at `pos` in `photos`.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_add_photo(
    photodb: *mut Itdb_PhotoDB,
    filename: *const c_char,
    pos: c_int,
    rotation: c_int,
    error: *mut *mut GError,
) -> *mut Itdb_Artwork {
    if photodb.is_null() {
        return ptr::null_mut();
    }
    let photo = itdb_artwork_new();
    let ok = itdb_artwork_set_thumbnail(photo, filename, rotation, error);
    adopt_photo(photodb, photo, ok, pos)
}

#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_add_photo_from_data(
    photodb: *mut Itdb_PhotoDB,
    image_data: *const u8,
    image_data_len: usize,
    pos: c_int,
    rotation: c_int,
    error: *mut *mut GError,
) -> *mut Itdb_Artwork {
    if photodb.is_null() {
        return ptr::null_mut();
    }
    let photo = itdb_artwork_new();
    let ok = itdb_artwork_set_thumbnail_from_data(photo, image_data, image_data_len, rotation, error);
    adopt_photo(photodb, photo, ok, pos)
}

#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_add_photo_from_pixbuf(
    photodb: *mut Itdb_PhotoDB,
    pixbuf: *const Itdb_Pixbuf,
    pos: c_int,
    rotation: c_int,
    error: *mut *mut GError,
) -> *mut Itdb_Artwork {
    if photodb.is_null() {
        return ptr::null_mut();
    }
    let photo = itdb_artwork_new();
    let ok = itdb_artwork_set_thumbnail_from_pixbuf(photo, pixbuf, rotation, error);
    adopt_photo(photodb, photo, ok, pos)
}

/// With a NULL `album`, remove `photo` from every album and from the
/// database and free it. Otherwise remove it from `album` only.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_remove_photo(
    photodb: *mut Itdb_PhotoDB,
    album: *mut Itdb_PhotoAlbum,
    photo: *mut Itdb_Artwork,
) {
    let Some(db) = photodb.as_mut() else {
        return;
    };
    if photo.is_null() {
        return;
    }
    if let Some(album) = album.as_mut() {
        album.members = g_list_remove(album.members, photo as gpointer);
        return;
    }
    for album in glist::to_vec::<Itdb_PhotoAlbum>(db.photoalbums) {
        let a = &mut *album;
        while !g_list_find(a.members, photo as gpointer).is_null() {
            a.members = g_list_remove(a.members, photo as gpointer);
        }
    }
    db.photos = g_list_remove(db.photos, photo as gpointer);
    debug!(id = (*photo).id, "photo removed");
    itdb_artwork_free(photo);
}

/// Detached album with default slideshow settings.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_photoalbum_new(albumname: *const c_char) -> *mut Itdb_PhotoAlbum {
    mem::alloc(
        Itdb_PhotoAlbum {
            photodb: ptr::null_mut(),
            name: mem::g_strdup(albumname),
            members: ptr::null_mut(),
            album_type: ITDB_PHOTOALBUM_TYPE_NORMAL,
            playmusic: 0,
            repeat: 0,
            random: 0,
            show_titles: 0,
            transition_direction: 0,
            slide_duration: 3,
            transition_duration: 0,
            song_id: 0,
            album_id: 0,
            prev_album_id: 0,
        },
        "photoalbum",
    )
}

/// Free an album. Member photos are not freed.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_photoalbum_free(album: *mut Itdb_PhotoAlbum) {
    let Some(a) = album.as_mut() else {
        return;
    };
    g_free(a.name as gpointer);
    g_list_free(a.members);
    mem::dealloc(album, "photoalbum");
}

/// Insert `album` into the database at `pos` (-1 appends).
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_photoalbum_add(
    photodb: *mut Itdb_PhotoDB,
    album: *mut Itdb_PhotoAlbum,
    pos: c_int,
) {
    let (Some(db), Some(a)) = (photodb.as_mut(), album.as_mut()) else {
        return;
    };
    a.photodb = photodb;
    if a.album_id == 0 {
        a.album_id = glist::to_vec::<Itdb_PhotoAlbum>(db.photoalbums)
            .into_iter()
            .map(|x| (*x).album_id)
            .max()
            .unwrap_or(0)
            + 1;
    }
    db.photoalbums = g_list_insert(db.photoalbums, album as gpointer, pos);
}

/// Create an album named `albumname` and insert it at `pos`.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_photoalbum_create(
    photodb: *mut Itdb_PhotoDB,
    albumname: *const c_char,
    pos: c_int,
) -> *mut Itdb_PhotoAlbum {
    if photodb.is_null() {
        return ptr::null_mut();
    }
    let album = itdb_photodb_photoalbum_new(albumname);
    itdb_photodb_photoalbum_add(photodb, album, pos);
    album
}

/// Detach `album` from its database without freeing it.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_photoalbum_unlink(album: *mut Itdb_PhotoAlbum) {
    let Some(a) = album.as_mut() else {
        return;
    };
    if let Some(db) = a.photodb.as_mut() {
        db.photoalbums = g_list_remove(db.photoalbums, album as gpointer);
    }
    a.photodb = ptr::null_mut();
}

/// Unlink and free `album`. With `remove_pics`, its photos are removed from
/// the database as well.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_photoalbum_remove(
    photodb: *mut Itdb_PhotoDB,
    album: *mut Itdb_PhotoAlbum,
    remove_pics: gboolean,
) {
    if photodb.is_null() || album.is_null() {
        return;
    }
    if remove_pics != FALSE {
        for photo in glist::to_vec::<Itdb_Artwork>((*album).members) {
            itdb_photodb_remove_photo(photodb, ptr::null_mut(), photo);
        }
    }
    itdb_photodb_photoalbum_unlink(album);
    itdb_photodb_photoalbum_free(album);
}

/// Album named `albumname`, or the Photo Library when `albumname` is NULL.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_photoalbum_by_name(
    photodb: *mut Itdb_PhotoDB,
    albumname: *const c_char,
) -> *mut Itdb_PhotoAlbum {
    let Some(db) = photodb.as_ref() else {
        return ptr::null_mut();
    };
    let wanted = read_str(albumname);
    glist::to_vec::<Itdb_PhotoAlbum>(db.photoalbums)
        .into_iter()
        .find(|&a| match &wanted {
            None => (*a).album_type == ITDB_PHOTOALBUM_TYPE_MASTER,
            Some(name) => read_str((*a).name).as_deref() == Some(name.as_str()),
        })
        .unwrap_or(ptr::null_mut())
}

/// Reference `photo` from `album` (NULL means the Photo Library) at `pos`.
/// Fails when the photo is not part of the database.
#[no_mangle]
pub unsafe extern "C" fn itdb_photodb_photoalbum_add_photo(
    photodb: *mut Itdb_PhotoDB,
    album: *mut Itdb_PhotoAlbum,
    photo: *mut Itdb_Artwork,
    pos: c_int,
) -> gboolean {
    let Some(db) = photodb.as_ref() else {
        return FALSE;
    };
    if photo.is_null() || g_list_find(db.photos, photo as gpointer).is_null() {
        return FALSE;
    }
    let album = if album.is_null() {
        itdb_photodb_photoalbum_by_name(photodb, ptr::null())
    } else {
        album
    };
    let Some(a) = album.as_mut() else {
        return FALSE;
    };
    a.members = g_list_insert(a.members, photo as gpointer, pos);
    TRUE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glist::{g_list_index, g_list_length};
    use crate::ledger;
    use crate::pixbuf::{itdb_pixbuf_free, itdb_pixbuf_new};
    use std::ffi::CString;
    use tempfile::TempDir;

    unsafe fn pixbuf() -> *mut Itdb_Pixbuf {
        let rgb = vec![0x80u8; 4 * 2 * 3];
        itdb_pixbuf_new(4, 2, rgb.as_ptr(), rgb.len())
    }

    #[test]
    fn test_create_has_photo_library() {
        unsafe {
            let db = itdb_photodb_create(ptr::null());
            let master = itdb_photodb_photoalbum_by_name(db, ptr::null());
            assert!(!master.is_null());
            assert_eq!(read_str((*master).name).as_deref(), Some(PHOTO_LIBRARY_NAME));
            assert_eq!((*master).album_type, ITDB_PHOTOALBUM_TYPE_MASTER);
            itdb_photodb_free(db);
        }
    }

    #[test]
    fn test_add_and_remove_photos() {
        let before = ledger::live_allocations();
        unsafe {
            let db = itdb_photodb_create(ptr::null());
            let pb = pixbuf();
            let mut err = ptr::null_mut();
            let first = itdb_photodb_add_photo_from_pixbuf(db, pb, -1, 0, &mut err);
            let second = itdb_photodb_add_photo_from_pixbuf(db, pb, 0, 90, &mut err);
            itdb_pixbuf_free(pb);
            assert!(err.is_null());
            assert_eq!((*first).id, FIRST_PHOTO_ID);
            assert_eq!((*second).id, FIRST_PHOTO_ID + 1);
            assert_eq!(g_list_index((*db).photos, second as gpointer), 0);

            let album = itdb_photodb_photoalbum_create(db, c"Holiday".as_ptr(), -1);
            assert_eq!(itdb_photodb_photoalbum_add_photo(db, album, first, -1), TRUE);
            assert_eq!(g_list_length((*album).members), 1);

            // remove from one album only
            itdb_photodb_remove_photo(db, album, first);
            assert_eq!(g_list_length((*album).members), 0);
            assert_eq!(g_list_length((*db).photos), 2);

            itdb_photodb_photoalbum_add_photo(db, album, first, -1);
            itdb_photodb_remove_photo(db, ptr::null_mut(), first);
            assert_eq!(g_list_length((*album).members), 0);
            assert_eq!(g_list_length((*db).photos), 1);
            let master = itdb_photodb_photoalbum_by_name(db, ptr::null());
            assert_eq!(g_list_length((*master).members), 1);

            itdb_photodb_free(db);
        }
        assert_eq!(ledger::live_allocations(), before);
    }

    #[test]
    fn test_add_photo_rejects_foreign_photo() {
        unsafe {
            let db = itdb_photodb_create(ptr::null());
            let stray = itdb_artwork_new();
            assert_eq!(itdb_photodb_photoalbum_add_photo(db, ptr::null_mut(), stray, -1), FALSE);
            itdb_artwork_free(stray);
            itdb_photodb_free(db);
        }
    }

    #[test]
    fn test_remove_album_with_pictures() {
        unsafe {
            let db = itdb_photodb_create(ptr::null());
            let pb = pixbuf();
            let photo = itdb_photodb_add_photo_from_pixbuf(db, pb, -1, 0, ptr::null_mut());
            itdb_pixbuf_free(pb);
            let album = itdb_photodb_photoalbum_create(db, c"Trip".as_ptr(), -1);
            itdb_photodb_photoalbum_add_photo(db, album, photo, -1);
            itdb_photodb_photoalbum_remove(db, album, TRUE);
            assert_eq!(g_list_length((*db).photoalbums), 1);
            assert!((*db).photos.is_null());
            itdb_photodb_free(db);
        }
    }

    #[test]
    fn test_parse_requires_photos_dir() {
        let dir = TempDir::new().unwrap();
        let mp = CString::new(dir.path().to_str().unwrap()).unwrap();
        let mut err = ptr::null_mut();
        unsafe {
            assert!(itdb_photodb_parse(mp.as_ptr(), &mut err).is_null());
            assert_eq!((*err).code, ITDB_FILE_ERROR_NOTFOUND);
            crate::error::g_error_free(err);
        }
    }

    #[test]
    fn test_write_then_parse() {
        let dir = TempDir::new().unwrap();
        let mp = CString::new(dir.path().to_str().unwrap()).unwrap();
        let mut err = ptr::null_mut();
        unsafe {
            let db = itdb_photodb_create(mp.as_ptr());
            let pb = pixbuf();
            let photo = itdb_photodb_add_photo_from_pixbuf(db, pb, -1, 0, &mut err);
            itdb_pixbuf_free(pb);
            (*photo).rating = 60;
            let album = itdb_photodb_photoalbum_create(db, c"Kids".as_ptr(), -1);
            itdb_photodb_photoalbum_add_photo(db, album, photo, -1);
            assert_eq!(itdb_photodb_write(db, &mut err), TRUE);
            itdb_photodb_free(db);

            let db = itdb_photodb_parse(mp.as_ptr(), &mut err);
            assert!(err.is_null());
            assert_eq!(g_list_length((*db).photos), 1);
            let kids = itdb_photodb_photoalbum_by_name(db, c"Kids".as_ptr());
            assert_eq!(g_list_length((*kids).members), 1);
            let photo = glist::to_vec::<Itdb_Artwork>((*db).photos)[0];
            assert_eq!((*photo).rating, 60);
            assert!(!(*photo).thumbnail.is_null());
            itdb_photodb_free(db);
        }
    }
}
