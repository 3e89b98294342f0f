//! Memory safety tests
//!
//! The native ledger counts live allocations per thread, so each test can
//! check that everything it allocated was freed exactly once.
//!
//! Run with sanitizers:
//! - RUSTFLAGS="-Z sanitizer=address" cargo +nightly test --test memory_safety
//! - RUSTFLAGS="-Z sanitizer=leak" cargo +nightly test --test memory_safety

use gpod_native::ledger;
use gpod_rs::{Artwork, Itdb, PhotoDb, Pixbuf, Playlist, Record, Track};
use tempfile::TempDir;

struct Baseline {
    live: usize,
    rejected: usize,
}

impl Baseline {
    fn take() -> Self {
        Baseline {
            live: ledger::live_allocations(),
            rejected: ledger::rejected_frees(),
        }
    }

    fn assert_clean(&self) {
        assert_eq!(ledger::live_allocations(), self.live, "leaked native allocations");
        assert_eq!(ledger::rejected_frees(), self.rejected, "double or foreign free");
    }
}

#[test]
fn test_no_memory_leaks_basic() {
    let base = Baseline::take();
    for i in 0..50 {
        let db = Itdb::new().unwrap();
        let pl = Playlist::new(&format!("pl{i}"), false).unwrap();
        db.playlists().push(&pl).unwrap();
        for j in 0..5 {
            let mut t = Track::new().unwrap();
            t.set_title(Some(&format!("{i}-{j}"))).unwrap();
            db.tracks().push(&t).unwrap();
            pl.tracks().push(&t).unwrap();
        }
        let removed = db.tracks().remove_at(2).unwrap();
        drop(removed);
        db.dispose();
    }
    base.assert_clean();
}

#[test]
fn test_no_double_free() {
    let base = Baseline::take();
    let t = Track::new().unwrap();
    t.handle().release();
    t.handle().release();
    drop(t);

    let db = Itdb::new().unwrap();
    let view = db.master_playlist();
    assert!(view.is_none());
    db.handle().release();
    drop(db);
    base.assert_clean();
}

#[test]
fn test_removed_track_outlives_database() {
    let base = Baseline::take();
    let db = Itdb::new().unwrap();
    let mut t = Track::new().unwrap();
    t.set_album(Some("kept")).unwrap();
    db.tracks().push(&t).unwrap();
    let owned = db.tracks().remove_at(0).unwrap();
    assert_eq!(t.album().as_deref(), Some("kept"));
    db.dispose();

    assert_eq!(owned.album().as_deref(), Some("kept"));
    drop(owned);
    drop(t);
    base.assert_clean();
}

#[test]
fn test_parse_write_cycle_is_clean() {
    let dir = TempDir::new().unwrap();
    let base = Baseline::take();
    Itdb::init_ipod(dir.path(), Some("MA079"), None).unwrap();
    for _ in 0..3 {
        let db = Itdb::parse(dir.path()).unwrap();
        let t = Track::new().unwrap();
        db.tracks().push(&t).unwrap();
        db.write().unwrap();
    }
    let db = Itdb::parse(dir.path()).unwrap();
    assert_eq!(db.track_count(), 3);
    drop(db);

    assert!(Itdb::parse(&dir.path().join("missing")).is_err());
    base.assert_clean();
}

#[test]
fn test_artwork_and_photos_are_clean() {
    let base = Baseline::take();
    let pb = Pixbuf::new(2, 2, &[0u8; 12]).unwrap();
    let mut art = Artwork::new().unwrap();
    art.set_thumbnail_from_pixbuf(&pb, 0).unwrap();
    let mut t = Track::new().unwrap();
    t.set_artwork(art).unwrap();
    assert!(t.has_thumbnails());
    let _rendered = t.thumbnail(1, 1).unwrap();

    let photos = PhotoDb::create(None).unwrap();
    let photo = photos.add_photo_from_pixbuf(&pb, None, 90).unwrap();
    let album = photos.create_album("a", None).unwrap();
    album.photos().push(&photo).unwrap();
    assert!(photos.add_photo_from_data(b"junk", None, 0).is_err());
    drop((album, photo, photos, t, pb, _rendered));
    base.assert_clean();
}

#[test]
#[should_panic(expected = "used after its owning root was disposed")]
fn test_record_view_after_dispose_panics() {
    let db = Itdb::new().unwrap();
    db.tracks().push(&Track::new().unwrap()).unwrap();
    let view = db.tracks().get(0).unwrap();
    db.dispose();
    let _ = view.title();
}

#[test]
#[should_panic(expected = "list used after its owning root was disposed")]
fn test_list_after_dispose_panics() {
    let db = Itdb::new().unwrap();
    let list = db.playlists();
    db.dispose();
    let _ = list.len();
}

#[test]
#[should_panic(expected = "used after its owning root was disposed")]
fn test_sub_object_after_owner_drop_panics() {
    let t = Track::new().unwrap();
    let cd = t.chapter_data().unwrap();
    drop(t);
    cd.add_chapter(1, "late").unwrap();
}

#[test]
#[should_panic(expected = "used after release")]
fn test_snapshot_entry_freed_before_visit_panics() {
    let db = Itdb::new().unwrap();
    for _ in 0..3 {
        db.tracks().push(&Track::new().unwrap()).unwrap();
    }
    for (i, t) in db.tracks().iter().enumerate() {
        if i == 0 {
            drop(db.tracks().remove_at(2).unwrap());
        }
        let _ = t.title();
    }
}

#[test]
#[should_panic(expected = "used after release")]
fn test_disposed_owned_record_panics() {
    let t = Track::new().unwrap();
    t.handle().release();
    let _ = t.title();
}
