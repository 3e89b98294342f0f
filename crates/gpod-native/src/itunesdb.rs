//! iTunes database root

use crate::device::{control_dir, itdb_device_free, itdb_device_new, itdb_device_set_mountpoint, itdb_device_set_sysinfo, itdb_device_write_sysinfo, mountpoint_of, Itdb_Device, SYSINFO_FIELD_MODEL};
use crate::error::{file_error_code, set_error, GError, G_FILE_ERROR, ITDB_FILE_ERROR, ITDB_FILE_ERROR_NOTFOUND};
use crate::glist::{self, g_list_free, GList};
use crate::mem::{self, dup_str, g_free, read_str};
use crate::persist::{self, ITUNESDB_FILE};
use crate::playlist::{itdb_playlist_add, itdb_playlist_free, itdb_playlist_new, itdb_playlist_set_mpl, itdb_playlist_set_podcasts, Itdb_Playlist};
use crate::track::{itdb_track_free, Itdb_Track};
use crate::{gboolean, gpointer, FALSE, TRUE};
use chrono::{Local, Offset, Utc};
use rand::Rng;
use std::ffi::CString;
use std::fs;
use std::os::raw::{c_char, c_uint};
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::{debug, info, warn};

/// Number of `Fnn` music directories created by [`itdb_init_ipod`]
pub const DEFAULT_MUSIC_DIRS: u32 = 20;

#[repr(C)]
#[derive(Debug)]
pub struct Itdb_iTunesDB {
    pub tracks: *mut GList,
    pub playlists: *mut GList,
    pub filename: *mut c_char,
    pub device: *mut Itdb_Device,
    pub version: u32,
    pub id: u64,
    /// Local UTC offset in seconds when the database was created
    pub tzoffset: i32,
}

/// Current time as a 32-bit timestamp.
pub(crate) fn itdb_now() -> i32 {
    Utc::now().timestamp().clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// `<mountpoint>/iPod_Control/iTunes`
pub fn itunes_dir(mountpoint: &Path) -> PathBuf {
    control_dir(mountpoint).join("iTunes")
}

/// `<mountpoint>/iPod_Control/Music`
pub fn music_dir(mountpoint: &Path) -> PathBuf {
    control_dir(mountpoint).join("Music")
}

/// Path of the database file for a mountpoint.
pub fn itunesdb_path(mountpoint: &Path) -> PathBuf {
    itunes_dir(mountpoint).join(ITUNESDB_FILE)
}

#[no_mangle]
pub extern "C" fn itdb_new() -> *mut Itdb_iTunesDB {
    mem::alloc(
        Itdb_iTunesDB {
            tracks: ptr::null_mut(),
            playlists: ptr::null_mut(),
            filename: ptr::null_mut(),
            device: itdb_device_new(),
            version: 0x13,
            id: rand::thread_rng().gen::<u64>(),
            tzoffset: Local::now().offset().fix().local_minus_utc(),
        },
        "itunesdb",
    )
}

/// Free the database with every track, playlist and the device.
#[no_mangle]
pub unsafe extern "C" fn itdb_free(itdb: *mut Itdb_iTunesDB) {
    let Some(db) = itdb.as_mut() else {
        return;
    };
    for pl in glist::to_vec::<Itdb_Playlist>(db.playlists) {
        (*pl).itdb = ptr::null_mut();
        itdb_playlist_free(pl);
    }
    g_list_free(db.playlists);
    for track in glist::to_vec::<Itdb_Track>(db.tracks) {
        (*track).itdb = ptr::null_mut();
        itdb_track_free(track);
    }
    g_list_free(db.tracks);
    g_free(db.filename as gpointer);
    itdb_device_free(db.device);
    debug!(itdb = ?itdb, "itdb freed");
    mem::dealloc(itdb, "itunesdb");
}

/// Parse a database file. The result has no mountpoint.
#[no_mangle]
pub unsafe extern "C" fn itdb_parse_file(filename: *const c_char, error: *mut *mut GError) -> *mut Itdb_iTunesDB {
    let Some(filename) = read_str(filename) else {
        return ptr::null_mut();
    };
    match persist::load_itunesdb(Path::new(&filename)) {
        Ok(itdb) => {
            (*itdb).filename = dup_str(&filename);
            itdb
        }
        Err(e) => {
            warn!(error = %e, "itdb_parse_file failed");
            e.report(error);
            ptr::null_mut()
        }
    }
}

/// Parse the database of the iPod mounted at `mp`.
#[no_mangle]
pub unsafe extern "C" fn itdb_parse(mp: *const c_char, error: *mut *mut GError) -> *mut Itdb_iTunesDB {
    let Some(mountpoint) = read_str(mp).map(PathBuf::from) else {
        return ptr::null_mut();
    };
    if !itunes_dir(&mountpoint).is_dir() {
        set_error(
            error,
            ITDB_FILE_ERROR,
            ITDB_FILE_ERROR_NOTFOUND,
            format!("iTunes directory not found: '{}'", itunes_dir(&mountpoint).display()),
        );
        return ptr::null_mut();
    }
    let Ok(path) = CString::new(itunesdb_path(&mountpoint).to_string_lossy().into_owned()) else {
        return ptr::null_mut();
    };
    let itdb = itdb_parse_file(path.as_ptr(), error);
    if !itdb.is_null() {
        itdb_set_mountpoint(itdb, mp);
        info!(mountpoint = %mountpoint.display(), "itdb parsed");
    }
    itdb
}

/// Write the database to `filename` (NULL reuses the parsed filename).
#[no_mangle]
pub unsafe extern "C" fn itdb_write_file(
    itdb: *mut Itdb_iTunesDB,
    filename: *const c_char,
    error: *mut *mut GError,
) -> gboolean {
    let Some(db) = itdb.as_mut() else {
        return FALSE;
    };
    let target = read_str(filename).or_else(|| read_str(db.filename));
    let Some(target) = target else {
        set_error(error, ITDB_FILE_ERROR, ITDB_FILE_ERROR_NOTFOUND, "No filename set for the iTunes database.");
        return FALSE;
    };
    match persist::save_itunesdb(itdb, Path::new(&target)) {
        Ok(()) => {
            mem::replace_str(&mut db.filename, Some(&target));
            TRUE
        }
        Err(e) => {
            warn!(error = %e, "itdb_write_file failed");
            e.report(error);
            FALSE
        }
    }
}

/// Write the database to the iPod it was parsed from, and SysInfo if it
/// changed.
#[no_mangle]
pub unsafe extern "C" fn itdb_write(itdb: *mut Itdb_iTunesDB, error: *mut *mut GError) -> gboolean {
    let Some(db) = itdb.as_mut() else {
        return FALSE;
    };
    let Some(mountpoint) = mountpoint_of(db.device) else {
        set_error(error, ITDB_FILE_ERROR, ITDB_FILE_ERROR_NOTFOUND, "Mountpoint not set.");
        return FALSE;
    };
    let dir = itunes_dir(&mountpoint);
    if !dir.is_dir() {
        set_error(
            error,
            ITDB_FILE_ERROR,
            ITDB_FILE_ERROR_NOTFOUND,
            format!("iTunes directory not found: '{}'", dir.display()),
        );
        return FALSE;
    }
    let Ok(path) = CString::new(itunesdb_path(&mountpoint).to_string_lossy().into_owned()) else {
        return FALSE;
    };
    if itdb_write_file(itdb, path.as_ptr(), error) == FALSE {
        return FALSE;
    }
    if (*db.device).sysinfo_changed != FALSE && itdb_device_write_sysinfo(db.device, error) == FALSE {
        return FALSE;
    }
    info!(mountpoint = %mountpoint.display(), "itdb written");
    TRUE
}

#[no_mangle]
pub unsafe extern "C" fn itdb_set_mountpoint(itdb: *mut Itdb_iTunesDB, mp: *const c_char) {
    if let Some(db) = itdb.as_mut() {
        itdb_device_set_mountpoint(db.device, mp);
    }
}

/// Borrowed mountpoint string, or NULL.
#[no_mangle]
pub unsafe extern "C" fn itdb_get_mountpoint(itdb: *const Itdb_iTunesDB) -> *const c_char {
    itdb.as_ref()
        .and_then(|db| db.device.as_ref())
        .map_or(ptr::null(), |d| d.mountpoint)
}

fn path_to_c(path: &Path) -> *mut c_char {
    dup_str(&path.to_string_lossy())
}

/// `iPod_Control` below `mountpoint` if it exists (free with `g_free`).
#[no_mangle]
pub unsafe extern "C" fn itdb_get_control_dir(mountpoint: *const c_char) -> *mut c_char {
    match read_str(mountpoint).map(|mp| control_dir(Path::new(&mp))) {
        Some(dir) if dir.is_dir() => path_to_c(&dir),
        _ => ptr::null_mut(),
    }
}

/// `iPod_Control/iTunes` below `mountpoint` if it exists.
#[no_mangle]
pub unsafe extern "C" fn itdb_get_itunes_dir(mountpoint: *const c_char) -> *mut c_char {
    match read_str(mountpoint).map(|mp| itunes_dir(Path::new(&mp))) {
        Some(dir) if dir.is_dir() => path_to_c(&dir),
        _ => ptr::null_mut(),
    }
}

/// `iPod_Control/Music` below `mountpoint` if it exists.
#[no_mangle]
pub unsafe extern "C" fn itdb_get_music_dir(mountpoint: *const c_char) -> *mut c_char {
    match read_str(mountpoint).map(|mp| music_dir(Path::new(&mp))) {
        Some(dir) if dir.is_dir() => path_to_c(&dir),
        _ => ptr::null_mut(),
    }
}

/// Create the directory layout, SysInfo and an empty database with master
/// and podcasts playlists on `mountpoint`.
#[no_mangle]
pub unsafe extern "C" fn itdb_init_ipod(
    mountpoint: *const c_char,
    model_number: *const c_char,
    ipod_name: *const c_char,
    error: *mut *mut GError,
) -> gboolean {
    let Some(mp) = read_str(mountpoint).map(PathBuf::from) else {
        return FALSE;
    };
    let control = control_dir(&mp);
    let mut dirs = vec![
        itunes_dir(&mp),
        control.join("Device"),
        control.join("Artwork"),
        mp.join("Photos"),
        control.join("Photos"),
    ];
    dirs.extend((0..DEFAULT_MUSIC_DIRS).map(|i| music_dir(&mp).join(format!("F{:02}", i))));
    for dir in &dirs {
        if let Err(e) = fs::create_dir_all(dir) {
            set_error(
                error,
                G_FILE_ERROR,
                file_error_code(&e),
                format!("Problem creating iPod directory '{}': {}", dir.display(), e),
            );
            return FALSE;
        }
    }

    let itdb = itdb_new();
    itdb_set_mountpoint(itdb, mountpoint);
    let device = (*itdb).device;
    if !model_number.is_null() {
        let field = CString::new(SYSINFO_FIELD_MODEL).unwrap_or_default();
        itdb_device_set_sysinfo(device, field.as_ptr(), model_number);
    }

    let name = if ipod_name.is_null() { c"iPod".as_ptr() } else { ipod_name };
    let mpl = itdb_playlist_new(name, FALSE);
    itdb_playlist_set_mpl(mpl);
    itdb_playlist_add(itdb, mpl, -1);
    let podcasts = itdb_playlist_new(c"Podcasts".as_ptr(), FALSE);
    itdb_playlist_set_podcasts(podcasts);
    itdb_playlist_add(itdb, podcasts, -1);

    let ok = itdb_write(itdb, error);
    itdb_free(itdb);
    if ok != FALSE {
        info!(mountpoint = %mp.display(), "iPod initialized");
    }
    ok
}

#[no_mangle]
pub unsafe extern "C" fn itdb_tracks_number(itdb: *const Itdb_iTunesDB) -> c_uint {
    itdb.as_ref().map_or(0, |db| glist::g_list_length(db.tracks))
}

#[no_mangle]
pub unsafe extern "C" fn itdb_tracks_number_nontransferred(itdb: *const Itdb_iTunesDB) -> c_uint {
    itdb.as_ref().map_or(0, |db| {
        glist::to_vec::<Itdb_Track>(db.tracks)
            .into_iter()
            .filter(|&t| (*t).transferred == 0)
            .count() as c_uint
    })
}

/// Pick a destination below `Music/Fnn` for `filename` on the iPod at
/// `mountpoint` (or the track's database mountpoint when NULL).
#[no_mangle]
pub unsafe extern "C" fn itdb_cp_get_dest_filename(
    track: *const Itdb_Track,
    mountpoint: *const c_char,
    filename: *const c_char,
    error: *mut *mut GError,
) -> *mut c_char {
    let Some(filename) = read_str(filename) else {
        return ptr::null_mut();
    };
    let mp = read_str(mountpoint).map(PathBuf::from).or_else(|| {
        track
            .as_ref()
            .and_then(|t| t.itdb.as_ref())
            .and_then(|db| mountpoint_of(db.device))
    });
    let Some(mp) = mp else {
        set_error(error, ITDB_FILE_ERROR, ITDB_FILE_ERROR_NOTFOUND, "Mountpoint not set.");
        return ptr::null_mut();
    };
    let music = music_dir(&mp);
    let subdirs: Vec<PathBuf> = match fs::read_dir(&music) {
        Ok(entries) => {
            let mut dirs: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            dirs.sort();
            dirs
        }
        Err(e) => {
            set_error(
                error,
                ITDB_FILE_ERROR,
                ITDB_FILE_ERROR_NOTFOUND,
                format!("Music directory not found: '{}' ({})", music.display(), e),
            );
            return ptr::null_mut();
        }
    };
    if subdirs.is_empty() {
        set_error(
            error,
            ITDB_FILE_ERROR,
            ITDB_FILE_ERROR_NOTFOUND,
            format!("No 'F..' directories found in '{}'", music.display()),
        );
        return ptr::null_mut();
    }
    let ext = Path::new(&filename)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    let mut rng = rand::thread_rng();
    let dir = &subdirs[rng.gen_range(0..subdirs.len())];
    loop {
        let candidate = dir.join(format!("gtkpod{:06}{}", rng.gen_range(0..1_000_000), ext));
        if !candidate.exists() {
            return path_to_c(&candidate);
        }
    }
}

/// Colon-separated iPod path for an absolute `path` below `mountpoint`.
fn ipod_path_for(mountpoint: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(mountpoint).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!(":{}", parts.join(":")))
}

/// Copy `filename` onto the iPod and mark the track as transferred.
#[no_mangle]
pub unsafe extern "C" fn itdb_cp_track_to_ipod(
    track: *mut Itdb_Track,
    filename: *const c_char,
    error: *mut *mut GError,
) -> gboolean {
    let Some(t) = track.as_mut() else {
        return FALSE;
    };
    let Some(mp) = t.itdb.as_ref().and_then(|db| mountpoint_of(db.device)) else {
        set_error(error, ITDB_FILE_ERROR, ITDB_FILE_ERROR_NOTFOUND, "Track is not part of a mounted database.");
        return FALSE;
    };
    if t.transferred != 0 {
        return TRUE;
    }
    let dest = itdb_cp_get_dest_filename(track, ptr::null(), filename, error);
    let Some(dest) = read_str(dest).inspect(|_| g_free(dest as gpointer)) else {
        return FALSE;
    };
    let Some(source) = read_str(filename) else {
        return FALSE;
    };
    if let Err(e) = fs::copy(&source, &dest) {
        set_error(
            error,
            G_FILE_ERROR,
            file_error_code(&e),
            format!("Error copying '{}' to '{}': {}", source, dest, e),
        );
        return FALSE;
    }
    let Some(ipod_path) = ipod_path_for(&mp, Path::new(&dest)) else {
        return FALSE;
    };
    mem::replace_str(&mut t.ipod_path, Some(&ipod_path));
    t.transferred = 1;
    if let Ok(meta) = fs::metadata(&dest) {
        t.size = meta.len().min(u32::MAX as u64) as u32;
    }
    debug!(source = %source, dest = %dest, "track copied to iPod");
    TRUE
}

/// Absolute path of the track's file (free with `g_free`), or NULL.
#[no_mangle]
pub unsafe extern "C" fn itdb_filename_on_ipod(track: *const Itdb_Track) -> *mut c_char {
    let Some(t) = track.as_ref() else {
        return ptr::null_mut();
    };
    let (Some(ipod_path), Some(mp)) = (
        read_str(t.ipod_path),
        t.itdb.as_ref().and_then(|db| mountpoint_of(db.device)),
    ) else {
        return ptr::null_mut();
    };
    let path = ipod_path
        .split(':')
        .filter(|s| !s.is_empty())
        .fold(mp, |acc, part| acc.join(part));
    if path.exists() {
        path_to_c(&path)
    } else {
        ptr::null_mut()
    }
}

/// Nothing to announce on this device family.
#[no_mangle]
pub unsafe extern "C" fn itdb_start_sync(itdb: *mut Itdb_iTunesDB) -> gboolean {
    if itdb.is_null() {
        return FALSE;
    }
    debug!("start sync");
    TRUE
}

#[no_mangle]
pub unsafe extern "C" fn itdb_stop_sync(itdb: *mut Itdb_iTunesDB) -> gboolean {
    if itdb.is_null() {
        return FALSE;
    }
    debug!("stop sync");
    TRUE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::g_error_free;
    use crate::ledger;
    use crate::playlist::itdb_playlist_mpl;
    use crate::track::{itdb_track_add, itdb_track_new};
    use tempfile::TempDir;

    fn c(path: &Path) -> CString {
        CString::new(path.to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_parse_missing_database_reports_notfound() {
        let dir = TempDir::new().unwrap();
        let mut err = ptr::null_mut();
        unsafe {
            let db = itdb_parse(c(dir.path()).as_ptr(), &mut err);
            assert!(db.is_null());
            assert_eq!((*err).domain, ITDB_FILE_ERROR);
            assert_eq!((*err).code, ITDB_FILE_ERROR_NOTFOUND);
            g_error_free(err);
        }
    }

    #[test]
    fn test_init_then_parse() {
        let dir = TempDir::new().unwrap();
        let before = ledger::live_allocations();
        let mp = c(dir.path());
        let mut err = ptr::null_mut();
        unsafe {
            assert_eq!(itdb_init_ipod(mp.as_ptr(), c"xA079".as_ptr(), c"Test".as_ptr(), &mut err), TRUE);
            assert!(err.is_null());
            assert!(dir.path().join("iPod_Control/Music/F19").is_dir());

            let db = itdb_parse(mp.as_ptr(), &mut err);
            assert!(!db.is_null());
            let mpl = itdb_playlist_mpl(db);
            assert_eq!(read_str((*mpl).name).as_deref(), Some("Test"));
            assert!(!crate::playlist::itdb_playlist_podcasts(db).is_null());
            assert_eq!(crate::device::itdb_device_supports_photo((*db).device), TRUE);
            assert_eq!(read_str(itdb_get_mountpoint(db)), Some(dir.path().to_string_lossy().into_owned()));
            itdb_free(db);
        }
        assert_eq!(ledger::live_allocations(), before);
    }

    #[test]
    fn test_copy_track_sets_ipod_path() {
        let dir = TempDir::new().unwrap();
        let mp = c(dir.path());
        let source = dir.path().join("song.MP3");
        fs::write(&source, b"ID3 fake").unwrap();
        let mut err = ptr::null_mut();
        unsafe {
            assert_eq!(itdb_init_ipod(mp.as_ptr(), ptr::null(), ptr::null(), &mut err), TRUE);
            let db = itdb_parse(mp.as_ptr(), &mut err);
            let t = itdb_track_new();
            itdb_track_add(db, t, -1);
            assert_eq!(itdb_tracks_number_nontransferred(db), 1);
            assert_eq!(itdb_cp_track_to_ipod(t, c(&source).as_ptr(), &mut err), TRUE);
            assert!(err.is_null());
            let ipod_path = read_str((*t).ipod_path).unwrap();
            assert!(ipod_path.starts_with(":iPod_Control:Music:F"));
            assert!(ipod_path.ends_with(".mp3"));
            assert_eq!(itdb_tracks_number_nontransferred(db), 0);
            let on_ipod = itdb_filename_on_ipod(t);
            assert_eq!(fs::read(read_str(on_ipod).unwrap()).unwrap(), b"ID3 fake");
            g_free(on_ipod as gpointer);
            itdb_free(db);
        }
    }
}
