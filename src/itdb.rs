//! iTunes database root
//!
//! An [`Itdb`] exclusively owns one native database together with its
//! device, tracks and playlists. Every wrapper read out of it is borrowed
//! and chained to the root's liveness, so touching one after
//! [`Record::dispose`] (or after the root is dropped) panics instead of
//! reading freed memory.

use crate::core::handle::{Liveness, NativeHandle, NativeRecord, Record};
use crate::core::list::{walk, LazyList, ListBinding, Membership};
use crate::core::overlay::{overlay, read_string, take_string};
use crate::error::{c_path, c_string, check, check_ok, GpodError, Result};
use crate::record::adopt;
use crate::record::{Device, Playlist, Track};
use gpod_native as ffi;
use std::path::{Path, PathBuf};
use std::ptr;
use std::rc::Rc;
use tracing::{debug, info};

impl NativeRecord for ffi::Itdb_iTunesDB {
    const KIND: &'static str = "itunesdb";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_free(ptr);
    }
}

/// Turn the result of a native parse into a root, surfacing the `GError`.
pub(crate) unsafe fn parsed<R: Record>(raw: *mut R::Raw, err: *mut ffi::GError, what: &str) -> Result<R> {
    if raw.is_null() {
        check(err)?;
        return Err(GpodError::Precondition(format!("{what} returned NULL")));
    }
    check(err)?;
    adopt(raw, what)
}

/// Music database of one iPod
#[derive(Debug)]
pub struct Itdb {
    handle: NativeHandle<ffi::Itdb_iTunesDB>,
}

impl Record for Itdb {
    type Raw = ffi::Itdb_iTunesDB;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        Itdb { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

impl Itdb {
    /// Empty database without a mountpoint.
    pub fn new() -> Result<Self> {
        adopt(ffi::itdb_new(), "itdb_new")
    }

    /// Parse the database of the iPod mounted at `mountpoint`.
    pub fn parse(mountpoint: &Path) -> Result<Self> {
        let mp = c_path(mountpoint)?;
        let mut err = ptr::null_mut();
        let db: Itdb = unsafe { parsed(ffi::itdb_parse(mp.as_ptr(), &mut err), err, "itdb_parse")? };
        info!(mountpoint = %mountpoint.display(), tracks = db.track_count(), "opened itdb");
        Ok(db)
    }

    /// Parse a database file directly. The result has no mountpoint.
    pub fn parse_file(path: &Path) -> Result<Self> {
        let filename = c_path(path)?;
        let mut err = ptr::null_mut();
        unsafe { parsed(ffi::itdb_parse_file(filename.as_ptr(), &mut err), err, "itdb_parse_file") }
    }

    /// Create the directory tree and an empty database (master playlist
    /// named `name` or "iPod", plus Podcasts) on `mountpoint`.
    pub fn init_ipod(mountpoint: &Path, model_number: Option<&str>, name: Option<&str>) -> Result<()> {
        let mp = c_path(mountpoint)?;
        let model = model_number.map(c_string).transpose()?;
        let name = name.map(c_string).transpose()?;
        let mut err = ptr::null_mut();
        unsafe {
            let ok = ffi::itdb_init_ipod(
                mp.as_ptr(),
                model.as_ref().map_or(ptr::null(), |m| m.as_ptr()),
                name.as_ref().map_or(ptr::null(), |n| n.as_ptr()),
                &mut err,
            );
            check(err)?;
            if ok == ffi::FALSE {
                return Err(GpodError::Precondition("itdb_init_ipod failed".into()));
            }
        }
        info!(mountpoint = %mountpoint.display(), ?model_number, "initialized iPod");
        Ok(())
    }

    fn raw(&self) -> *mut ffi::Itdb_iTunesDB {
        self.handle.as_ptr()
    }

    /// Save to the mountpoint.
    pub fn write(&self) -> Result<()> {
        let mut err = ptr::null_mut();
        unsafe {
            let ok = ffi::itdb_write(self.raw(), &mut err);
            check_ok(ok, err, "itdb_write")?;
        }
        info!(tracks = self.track_count(), "wrote itdb");
        Ok(())
    }

    /// Save to `path`, or to the file the database was read from.
    pub fn write_file(&self, path: Option<&Path>) -> Result<()> {
        let filename = path.map(c_path).transpose()?;
        let mut err = ptr::null_mut();
        unsafe {
            let ok = ffi::itdb_write_file(
                self.raw(),
                filename.as_ref().map_or(ptr::null(), |f| f.as_ptr()),
                &mut err,
            );
            check(err)?;
            if ok == ffi::FALSE {
                return Err(GpodError::Precondition("no file to write to".into()));
            }
        }
        Ok(())
    }

    overlay! {
        int version: u32 => version, set_version;
        int id: u64 => id, set_id;
        /// Seconds east of UTC recorded with the database
        int tzoffset: i32 => tz_offset, set_tz_offset;
    }

    /// File the database was parsed from or last written to.
    pub fn filename(&self) -> Option<PathBuf> {
        unsafe { read_string((*self.raw()).filename) }.map(PathBuf::from)
    }

    pub fn mountpoint(&self) -> Option<PathBuf> {
        unsafe { read_string(ffi::itdb_get_mountpoint(self.raw())) }.map(PathBuf::from)
    }

    pub fn set_mountpoint(&self, mountpoint: &Path) -> Result<()> {
        let mp = c_path(mountpoint)?;
        unsafe { ffi::itdb_set_mountpoint(self.raw(), mp.as_ptr()) };
        debug!(mountpoint = %mountpoint.display(), "itdb mountpoint set");
        Ok(())
    }

    /// Device owned by this database.
    pub fn device(&self) -> Option<Device> {
        unsafe { Device::borrowed((*self.raw()).device, self.handle.node()) }
    }

    /// All tracks. Pushing a track hands it to the database; removing one
    /// also drops it from every playlist and hands it back.
    pub fn tracks(&self) -> LazyList<ItdbTracks> {
        LazyList::new(ItdbTracks {
            raw: self.raw(),
            owner: Rc::clone(self.handle.node()),
        })
    }

    /// All playlists, master first.
    pub fn playlists(&self) -> LazyList<ItdbPlaylists> {
        LazyList::new(ItdbPlaylists {
            raw: self.raw(),
            owner: Rc::clone(self.handle.node()),
        })
    }

    pub fn track_count(&self) -> usize {
        unsafe { ffi::itdb_tracks_number(self.raw()) as usize }
    }

    /// Tracks whose files have not been copied to the device yet.
    pub fn non_transferred_track_count(&self) -> usize {
        unsafe { ffi::itdb_tracks_number_nontransferred(self.raw()) as usize }
    }

    fn borrow_playlist(&self, raw: *mut ffi::Itdb_Playlist) -> Option<Playlist> {
        unsafe { Playlist::borrowed(raw, self.handle.node()) }
    }

    fn borrow_track(&self, raw: *mut ffi::Itdb_Track) -> Option<Track> {
        unsafe { Track::borrowed(raw, self.handle.node()) }
    }

    pub fn master_playlist(&self) -> Option<Playlist> {
        self.borrow_playlist(unsafe { ffi::itdb_playlist_mpl(self.raw()) })
    }

    pub fn podcasts_playlist(&self) -> Option<Playlist> {
        self.borrow_playlist(unsafe { ffi::itdb_playlist_podcasts(self.raw()) })
    }

    pub fn playlist_by_name(&self, name: &str) -> Result<Option<Playlist>> {
        let name = c_string(name)?;
        Ok(self.borrow_playlist(unsafe { ffi::itdb_playlist_by_name(self.raw(), name.as_ptr()) }))
    }

    pub fn playlist_by_id(&self, id: u64) -> Option<Playlist> {
        self.borrow_playlist(unsafe { ffi::itdb_playlist_by_id(self.raw(), id) })
    }

    pub fn track_by_id(&self, id: u32) -> Option<Track> {
        self.borrow_track(unsafe { ffi::itdb_track_by_id(self.raw(), id) })
    }

    pub fn track_by_dbid(&self, dbid: u64) -> Option<Track> {
        self.borrow_track(unsafe { ffi::itdb_track_by_dbid(self.raw(), dbid) })
    }

    fn ensure_member(&self, track: &Track) -> Result<()> {
        if track.itdb() != Some(self.address()) {
            return Err(GpodError::Precondition("track is not part of this database".into()));
        }
        Ok(())
    }

    /// Copy `source` into a `Music/Fnn` directory and point the track at
    /// it. Tracks already marked transferred are left alone.
    pub fn copy_track_to_ipod(&self, track: &Track, source: &Path) -> Result<()> {
        self.ensure_member(track)?;
        let filename = c_path(source)?;
        let mut err = ptr::null_mut();
        unsafe {
            let ok = ffi::itdb_cp_track_to_ipod(track.handle().as_ptr(), filename.as_ptr(), &mut err);
            check(err)?;
            if ok == ffi::FALSE {
                return Err(GpodError::Precondition("track was not copied".into()));
            }
        }
        debug!(source = %source.display(), ipod_path = ?track.ipod_path(), "copied track");
        Ok(())
    }

    /// Fresh destination path for `source` below this database's music
    /// directory.
    pub fn dest_filename(&self, track: Option<&Track>, source: &Path) -> Result<PathBuf> {
        let mp = self.mountpoint().map(|m| c_path(&m)).transpose()?;
        let filename = c_path(source)?;
        let mut err = ptr::null_mut();
        let dest = unsafe {
            let raw = ffi::itdb_cp_get_dest_filename(
                track.map_or(ptr::null(), |t| t.handle().as_ptr().cast_const()),
                mp.as_ref().map_or(ptr::null(), |m| m.as_ptr()),
                filename.as_ptr(),
                &mut err,
            );
            check(err)?;
            take_string(raw)
        };
        dest.map(PathBuf::from)
            .ok_or_else(|| GpodError::Precondition("no destination filename".into()))
    }

    fn mountpoint_dir(&self, lookup: unsafe extern "C" fn(*const libc::c_char) -> *mut libc::c_char) -> Result<Option<PathBuf>> {
        let Some(mp) = self.mountpoint() else {
            return Ok(None);
        };
        let mp = c_path(&mp)?;
        Ok(unsafe { take_string(lookup(mp.as_ptr())) }.map(PathBuf::from))
    }

    /// `iPod_Control` below the mountpoint, if it exists.
    pub fn control_path(&self) -> Result<Option<PathBuf>> {
        self.mountpoint_dir(ffi::itdb_get_control_dir)
    }

    pub fn itunes_path(&self) -> Result<Option<PathBuf>> {
        self.mountpoint_dir(ffi::itdb_get_itunes_dir)
    }

    pub fn music_path(&self) -> Result<Option<PathBuf>> {
        self.mountpoint_dir(ffi::itdb_get_music_dir)
    }

    /// Absolute path of a track's file, when it exists on the device.
    pub fn local_path(&self, track: &Track) -> Option<PathBuf> {
        unsafe { take_string(ffi::itdb_filename_on_ipod(track.handle().as_ptr())) }.map(PathBuf::from)
    }

    pub fn start_sync(&self) -> Result<()> {
        if unsafe { ffi::itdb_start_sync(self.raw()) } == ffi::FALSE {
            return Err(GpodError::Precondition("start_sync refused".into()));
        }
        Ok(())
    }

    pub fn stop_sync(&self) -> Result<()> {
        if unsafe { ffi::itdb_stop_sync(self.raw()) } == ffi::FALSE {
            return Err(GpodError::Precondition("stop_sync refused".into()));
        }
        Ok(())
    }
}

#[doc(hidden)]
pub struct ItdbTracks {
    raw: *mut ffi::Itdb_iTunesDB,
    owner: Rc<Liveness>,
}

impl ListBinding for ItdbTracks {
    type Item = Track;

    fn head(&self) -> *mut ffi::GList {
        unsafe { (*self.raw).tracks }
    }

    fn owner(&self) -> &Rc<Liveness> {
        &self.owner
    }

    fn membership(&self) -> Membership {
        Membership::Owning
    }

    fn link(&self, item: &Track, index: i32) -> Result<()> {
        if item.itdb().is_some() {
            return Err(GpodError::AlreadyLinked);
        }
        unsafe { ffi::itdb_track_add(self.raw, item.handle().as_ptr(), index) };
        Ok(())
    }

    fn unlink(&self, raw: *mut ffi::Itdb_Track) -> Result<()> {
        // A detached track must not stay referenced by any playlist.
        unsafe {
            for pl in walk::<ffi::Itdb_Playlist>((*self.raw).playlists) {
                ffi::itdb_playlist_remove_track(pl, raw);
            }
            ffi::itdb_track_unlink(raw);
        }
        Ok(())
    }
}

#[doc(hidden)]
pub struct ItdbPlaylists {
    raw: *mut ffi::Itdb_iTunesDB,
    owner: Rc<Liveness>,
}

impl ListBinding for ItdbPlaylists {
    type Item = Playlist;

    fn head(&self) -> *mut ffi::GList {
        unsafe { (*self.raw).playlists }
    }

    fn owner(&self) -> &Rc<Liveness> {
        &self.owner
    }

    fn membership(&self) -> Membership {
        Membership::Owning
    }

    fn link(&self, item: &Playlist, index: i32) -> Result<()> {
        if item.itdb().is_some() {
            return Err(GpodError::AlreadyLinked);
        }
        unsafe { ffi::itdb_playlist_add(self.raw, item.handle().as_ptr(), index) };
        Ok(())
    }

    fn unlink(&self, raw: *mut ffi::Itdb_Playlist) -> Result<()> {
        unsafe { ffi::itdb_playlist_unlink(raw) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handle::Ownership;
    use tempfile::TempDir;

    fn ipod() -> (TempDir, Itdb) {
        let dir = TempDir::new().unwrap();
        Itdb::init_ipod(dir.path(), Some("xA079"), Some("Test iPod")).unwrap();
        let db = Itdb::parse(dir.path()).unwrap();
        (dir, db)
    }

    #[test]
    fn test_parse_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        match Itdb::parse(dir.path()) {
            Err(GpodError::Native(e)) => assert!(e.is_not_found(), "{e}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_init_creates_master_and_podcasts() {
        let (dir, db) = ipod();
        assert_eq!(db.mountpoint().as_deref(), Some(dir.path()));
        let master = db.master_playlist().unwrap();
        assert_eq!(master.name().as_deref(), Some("Test iPod"));
        assert!(db.podcasts_playlist().unwrap().is_podcasts());
        assert_eq!(db.playlists().len(), 2);
        assert!(db.device().unwrap().supports_photo());
        assert!(db.control_path().unwrap().unwrap().ends_with("iPod_Control"));
    }

    #[test]
    fn test_push_and_remove_track_transfers_ownership() {
        let (_dir, db) = ipod();
        let t = Track::new().unwrap();
        db.tracks().push(&t).unwrap();
        assert_eq!(t.ownership(), Ownership::Borrowed);
        assert_eq!(t.itdb(), Some(db.address()));
        assert_ne!(t.dbid(), 0);
        assert!(matches!(db.tracks().push(&t), Err(GpodError::AlreadyLinked)));

        let master = db.master_playlist().unwrap();
        master.tracks().push(&t).unwrap();
        assert!(db.tracks().remove(&t).unwrap());
        assert_eq!(t.ownership(), Ownership::Owned);
        assert_eq!(master.track_count(), 0);
        assert!(t.itdb().is_none());
    }

    #[test]
    fn test_borrowed_track_cannot_move_to_another_db() {
        let (_a, one) = ipod();
        let (_b, two) = ipod();
        let t = Track::new().unwrap();
        one.tracks().push(&t).unwrap();
        let view = one.tracks().get(0).unwrap();
        assert!(matches!(two.tracks().push(&view), Err(GpodError::NotOwned)));
        assert!(matches!(two.master_playlist().unwrap().tracks().push(&view), Err(GpodError::Precondition(_))));
    }

    #[test]
    fn test_write_and_reparse() {
        let (dir, db) = ipod();
        let mut t = Track::new().unwrap();
        t.set_title(Some("Kept")).unwrap();
        db.tracks().push(&t).unwrap();
        let dbid = t.dbid();
        db.write().unwrap();
        drop(t);
        db.dispose();

        let again = Itdb::parse(dir.path()).unwrap();
        assert_eq!(again.track_by_dbid(dbid).unwrap().title().as_deref(), Some("Kept"));
    }

    #[test]
    fn test_copy_track_to_ipod() {
        let (dir, db) = ipod();
        let source = dir.path().join("in.OGG");
        std::fs::write(&source, b"OggS").unwrap();
        let t = Track::new().unwrap();
        assert!(matches!(db.copy_track_to_ipod(&t, &source), Err(GpodError::Precondition(_))));
        db.tracks().push(&t).unwrap();
        assert_eq!(db.non_transferred_track_count(), 1);
        db.copy_track_to_ipod(&t, &source).unwrap();
        assert!(t.transferred());
        assert_eq!(db.non_transferred_track_count(), 0);
        let local = db.local_path(&t).unwrap();
        assert_eq!(std::fs::read(local).unwrap(), b"OggS");
        let dest = db.dest_filename(None, Path::new("x.M4A")).unwrap();
        assert!(dest.to_string_lossy().ends_with(".m4a"));
    }

    #[test]
    #[should_panic(expected = "used after its owning root was disposed")]
    fn test_view_after_dispose_panics() {
        let (_dir, db) = ipod();
        let master = db.master_playlist().unwrap();
        db.dispose();
        let _ = master.name();
    }
}
