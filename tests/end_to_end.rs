//! End-to-end: initialize a device tree, fill it, write it, read it back.

use gpod_rs::{ChapterData, DatabaseBuilder, Itdb, IpodGeneration, Playlist, Record, Track};
use std::fs;
use tempfile::TempDir;

fn track(artist: &str, title: &str) -> Track {
    let mut t = Track::new().unwrap();
    t.set_artist(Some(artist)).unwrap();
    t.set_title(Some(title)).unwrap();
    t
}

#[test]
fn test_master_removal_keeps_track_in_database() {
    let dir = TempDir::new().unwrap();
    Itdb::init_ipod(dir.path(), Some("MA079"), Some("E2E")).unwrap();
    {
        let db = Itdb::parse(dir.path()).unwrap();
        let master = db.master_playlist().unwrap();
        for (artist, title) in [("A", "one"), ("B", "two"), ("C", "three")] {
            let t = track(artist, title);
            db.tracks().push(&t).unwrap();
            master.tracks().push(&t).unwrap();
        }
        db.write().unwrap();
    }

    let db = Itdb::parse(dir.path()).unwrap();
    assert_eq!(db.tracks().len(), 3);
    assert_eq!(db.playlists().len(), 2);
    let masters: Vec<Playlist> = db.playlists().iter().filter(|p| p.is_master()).collect();
    assert_eq!(masters.len(), 1);
    let master = &masters[0];
    assert_eq!(master.track_count(), 3);

    let removed = master.tracks().remove_at(1).unwrap();
    assert_eq!(removed.title().as_deref(), Some("two"));
    assert_eq!(master.track_count(), 2);
    assert_eq!(db.track_count(), 3);
    assert!(db.tracks().contains(&removed));
}

#[test]
fn test_write_and_reopen_preserves_structure() {
    let dir = TempDir::new().unwrap();
    let db = DatabaseBuilder::new()
        .mountpoint(dir.path())
        .model_number("MA079")
        .ipod_name("Shelf")
        .create_if_missing()
        .open_itdb()
        .unwrap();
    let master = db.master_playlist().unwrap();

    let mut book = track("Narrator", "Chaptered");
    book.set_remember_playback_position(true);
    let cd = ChapterData::new().unwrap();
    cd.add_chapter(0, "Start").unwrap();
    cd.add_chapter(60_000, "Middle").unwrap();
    book.set_chapter_data(cd).unwrap();
    db.tracks().push(&book).unwrap();
    master.tracks().push(&book).unwrap();

    let plain = track("Band", "Song");
    db.tracks().push(&plain).unwrap();
    master.tracks().push(&plain).unwrap();

    let favs = Playlist::new("Favs", false).unwrap();
    db.playlists().push(&favs).unwrap();
    favs.tracks().push(&plain).unwrap();
    let book_dbid = book.dbid();

    db.write().unwrap();
    db.dispose();

    let again = Itdb::parse(dir.path()).unwrap();
    assert_eq!(again.track_count(), 2);
    assert_eq!(again.playlists().len(), 3);
    let master = again.master_playlist().unwrap();
    assert!(master.is_master());
    assert_eq!(master.name().as_deref(), Some("Shelf"));
    assert_eq!(master.track_count(), 2);

    let favs = again.playlist_by_name("Favs").unwrap().unwrap();
    let members: Vec<Option<String>> = favs.tracks().iter().map(|t| t.title()).collect();
    assert_eq!(members, vec![Some("Song".to_string())]);

    let book = again.track_by_dbid(book_dbid).unwrap();
    assert!(book.remember_playback_position());
    let chapters = book.chapter_data().unwrap().chapters();
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters.get(0).unwrap().start_position(), 1);
    assert_eq!(chapters.get(1).unwrap().title().as_deref(), Some("Middle"));

    let info = again.device().unwrap().ipod_info().unwrap();
    assert_eq!(info.generation(), IpodGeneration::PHOTO);
}

#[test]
fn test_copy_files_and_write_file() {
    let dir = TempDir::new().unwrap();
    Itdb::init_ipod(dir.path(), None, None).unwrap();
    let db = Itdb::parse(dir.path()).unwrap();
    assert_eq!(db.master_playlist().unwrap().name().as_deref(), Some("iPod"));

    let source = dir.path().join("song.mp3");
    fs::write(&source, vec![7u8; 1024]).unwrap();
    let t = track("X", "Y");
    db.tracks().push(&t).unwrap();
    db.copy_track_to_ipod(&t, &source).unwrap();
    assert_eq!(t.size(), 1024);
    let ipod_path = t.ipod_path().unwrap();
    assert!(ipod_path.starts_with(":iPod_Control:Music:F"), "{ipod_path}");
    assert!(db.local_path(&t).unwrap().starts_with(db.music_path().unwrap().unwrap()));

    let export = dir.path().join("export.json");
    db.write_file(Some(&export)).unwrap();
    assert_eq!(db.filename().as_deref(), Some(export.as_path()));
    let copy = Itdb::parse_file(&export).unwrap();
    assert_eq!(copy.track_count(), 1);
    assert!(copy.mountpoint().is_none());

    db.start_sync().unwrap();
    db.stop_sync().unwrap();
}

#[test]
fn test_smart_and_podcast_playlists_survive() {
    let dir = TempDir::new().unwrap();
    Itdb::init_ipod(dir.path(), Some("MA079"), None).unwrap();
    let db = Itdb::parse(dir.path()).unwrap();
    let smart = Playlist::new("Rules", true).unwrap();
    db.playlists().insert(1, &smart).unwrap();
    let id = smart.id();
    db.write().unwrap();
    drop(db);

    let again = Itdb::parse(dir.path()).unwrap();
    let smart = again.playlist_by_id(id).unwrap();
    assert!(smart.is_smart());
    assert_eq!(again.playlists().index_of(&smart), Some(1));
    assert!(again.podcasts_playlist().unwrap().is_podcasts());
}
