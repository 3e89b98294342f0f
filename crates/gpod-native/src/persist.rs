//! On-disk snapshot of the databases
//!
//! Both databases are stored as JSON documents under the device's control
//! directory. Track ids are renumbered on every write (starting at 52) and
//! playlists refer to their members by those ids; photo albums refer to
//! photos by artwork id.

use crate::artwork::{thumb_from_image, Itdb_Artwork};
use crate::chapterdata::{itdb_chapterdata_add_chapter, itdb_chapterdata_remove_chapters, Itdb_Chapter, Itdb_Chapterdata};
use crate::error::{
    file_error_code, set_error, GError, G_FILE_ERROR, ITDB_FILE_ERROR, ITDB_FILE_ERROR_CORRUPT,
    ITDB_FILE_ERROR_ITDB_CORRUPT, ITDB_FILE_ERROR_NOTFOUND, ITDB_FILE_ERROR_RENAME,
};
use crate::glist;
use crate::itunesdb::{itdb_free, itdb_new, Itdb_iTunesDB};
use crate::mem::{self, dup_opt, read_str};
use crate::photodb::{itdb_photodb_photoalbum_add, itdb_photodb_photoalbum_new, Itdb_PhotoAlbum, Itdb_PhotoDB};
use crate::pixbuf::Image;
use crate::playlist::{itdb_playlist_add, itdb_playlist_add_track, itdb_playlist_new, Itdb_Playlist};
use crate::track::{itdb_track_add, itdb_track_new, Itdb_Track};
use crate::{gpointer, FALSE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::CString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Snapshot format version
pub const FORMAT_VERSION: u32 = 1;

/// First track id handed out when renumbering
pub const FIRST_TRACK_ID: u32 = 52;

pub const ITUNESDB_FILE: &str = "iTunesDB.json";
pub const PHOTODB_FILE: &str = "Photo Database.json";

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt database '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not rename '{from}' to '{to}': {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("database '{path}': {owner} references unknown id {id}")]
    DanglingMember { path: PathBuf, owner: String, id: u32 },

    #[error("database '{path}' has unsupported format version {version}")]
    Version { path: PathBuf, version: u32 },
}

impl PersistError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Report into a `GError` slot.
    pub(crate) unsafe fn report(&self, slot: *mut *mut GError) {
        let (domain, code) = match self {
            Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                (ITDB_FILE_ERROR, ITDB_FILE_ERROR_NOTFOUND)
            }
            Self::Io { source, .. } => (G_FILE_ERROR, file_error_code(source)),
            Self::Json { .. } | Self::Version { .. } => (ITDB_FILE_ERROR, ITDB_FILE_ERROR_CORRUPT),
            Self::Rename { .. } => (ITDB_FILE_ERROR, ITDB_FILE_ERROR_RENAME),
            Self::DanglingMember { .. } => (ITDB_FILE_ERROR, ITDB_FILE_ERROR_ITDB_CORRUPT),
        };
        set_error(slot, domain, code, self);
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterRecord {
    pub startpos: u32,
    pub title: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterDataRecord {
    pub unk024: u32,
    pub unk028: u32,
    pub unk032: u32,
    pub chapters: Vec<ChapterRecord>,
}

impl ChapterDataRecord {
    unsafe fn capture(cd: *const Itdb_Chapterdata) -> Option<Self> {
        let cd = cd.as_ref()?;
        let chapters = glist::to_vec::<Itdb_Chapter>(cd.chapters)
            .into_iter()
            .map(|c| ChapterRecord {
                startpos: (*c).startpos,
                title: read_str((*c).chaptertitle),
            })
            .collect();
        Some(Self {
            unk024: cd.unk024,
            unk028: cd.unk028,
            unk032: cd.unk032,
            chapters,
        })
    }

    unsafe fn fill(&self, cd: *mut Itdb_Chapterdata) {
        itdb_chapterdata_remove_chapters(cd);
        (*cd).unk024 = self.unk024;
        (*cd).unk028 = self.unk028;
        (*cd).unk032 = self.unk032;
        for chapter in &self.chapters {
            let title = CString::new(chapter.title.clone().unwrap_or_default().replace('\0', ""))
                .unwrap_or_default();
            if itdb_chapterdata_add_chapter(cd, chapter.startpos, title.as_ptr()) == FALSE {
                tracing::warn!("chapter dropped while loading");
            }
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkRecord {
    pub id: u32,
    pub dbid: u64,
    pub unk028: i32,
    pub rating: u32,
    pub unk036: i32,
    pub creation_date: i32,
    pub digitized_date: i32,
    pub artwork_size: u32,
    pub thumbnail: Option<Image>,
}

impl ArtworkRecord {
    pub(crate) unsafe fn capture(art: *const Itdb_Artwork) -> Option<Self> {
        let art = art.as_ref()?;
        Some(Self {
            id: art.id,
            dbid: art.dbid,
            unk028: art.unk028,
            rating: art.rating,
            unk036: art.unk036,
            creation_date: art.creation_date,
            digitized_date: art.digitized_date,
            artwork_size: art.artwork_size,
            thumbnail: art.thumbnail.as_ref().map(|t| t.image.clone()),
        })
    }

    pub(crate) unsafe fn fill(&self, art: *mut Itdb_Artwork) {
        let a = &mut *art;
        a.id = self.id;
        a.dbid = self.dbid;
        a.unk028 = self.unk028;
        a.rating = self.rating;
        a.unk036 = self.unk036;
        a.creation_date = self.creation_date;
        a.digitized_date = self.digitized_date;
        a.artwork_size = self.artwork_size;
        crate::artwork::itdb_thumb_free(a.thumbnail);
        a.thumbnail = self
            .thumbnail
            .clone()
            .map_or(std::ptr::null_mut(), thumb_from_image);
    }
}

macro_rules! track_record {
    (strings: [$($s:ident),* $(,)?], scalars: [$($f:ident: $t:ty),* $(,)?]) => {
        #[derive(Debug, Default, Serialize, Deserialize)]
        #[serde(default)]
        pub struct TrackRecord {
            $(pub $s: Option<String>,)*
            $(pub $f: $t,)*
            pub chapterdata: Option<ChapterDataRecord>,
            pub artwork: Option<ArtworkRecord>,
        }

        impl TrackRecord {
            unsafe fn capture(t: &Itdb_Track) -> Self {
                Self {
                    $($s: read_str(t.$s),)*
                    $($f: t.$f,)*
                    chapterdata: ChapterDataRecord::capture(t.chapterdata),
                    artwork: ArtworkRecord::capture(t.artwork),
                }
            }

            /// Fresh unlinked track holding this record's values.
            unsafe fn restore(&self) -> *mut Itdb_Track {
                let track = itdb_track_new();
                let t = &mut *track;
                $(t.$s = dup_opt(self.$s.as_deref());)*
                $(t.$f = self.$f;)*
                if let Some(cd) = &self.chapterdata {
                    cd.fill(t.chapterdata);
                }
                if let Some(art) = &self.artwork {
                    art.fill(t.artwork);
                }
                track
            }
        }
    };
}

track_record! {
    strings: [
        title, ipod_path, album, artist, genre, filetype, comment, category, composer,
        grouping, description, podcasturl, podcastrss, subtitle, tvshow, tvepisode,
        tvnetwork, albumartist, keywords, sort_artist, sort_title, sort_album,
        sort_albumartist, sort_composer, sort_tvshow,
    ],
    scalars: [
        id: u32, size: u32, tracklen: i32, cd_nr: i32, cds: i32, track_nr: i32, tracks: i32,
        bitrate: i32, samplerate: u16, samplerate_low: u16, year: i32, volume: i32,
        soundcheck: u32, time_added: i32, time_modified: i32, time_played: i32,
        bookmark_time: u32, rating: u32, playcount: u32, playcount2: u32,
        recent_playcount: u32, transferred: i32, bpm: i16, app_rating: u8, type1: u8,
        type2: u8, compilation: u8, starttime: u32, stoptime: u32, checked: u8, dbid: u64,
        drm_userid: u32, visible: u32, filetype_marker: u32, artwork_count: u16,
        artwork_size: u32, samplerate2: f32, time_released: i32, has_artwork: u8,
        skip_when_shuffling: u8, remember_playback_position: u8, flag4: u8, dbid2: u64,
        lyrics_flag: u8, movie_flag: u8, mark_unplayed: u8, explicit_flag: u8,
        skipcount: u32, recent_skipcount: u32, last_skipped: i32, pregap: u32,
        samplecount: u64, postgap: u32, mediatype: u32, season_nr: u32, episode_nr: u32,
        gapless_data: u32, gapless_track_flag: u16, gapless_album_flag: u16,
    ]
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistRecord {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_: u8,
    pub flag1: u8,
    pub flag2: u8,
    pub flag3: u8,
    pub is_spl: bool,
    pub timestamp: i32,
    pub id: u64,
    pub sortorder: u32,
    pub podcastflag: u32,
    /// Member track ids
    pub members: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseRecord {
    pub version: u32,
    pub id: u64,
    pub tzoffset: i32,
    pub tracks: Vec<TrackRecord>,
    pub playlists: Vec<PlaylistRecord>,
}

impl Default for DatabaseRecord {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            id: 0,
            tzoffset: 0,
            tracks: Vec::new(),
            playlists: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoAlbumRecord {
    pub name: Option<String>,
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
    /// Member artwork ids
    pub members: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoDatabaseRecord {
    pub version: u32,
    pub photos: Vec<ArtworkRecord>,
    pub albums: Vec<PhotoAlbumRecord>,
}

impl Default for PhotoDatabaseRecord {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            photos: Vec::new(),
            albums: Vec::new(),
        }
    }
}

fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let bytes = fs::read(path).map_err(|e| PersistError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write through a temporary file and rename it into place.
fn write_document<T: Serialize>(path: &Path, doc: &T) -> Result<(), PersistError> {
    let bytes = serde_json::to_vec_pretty(doc).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|e| PersistError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|source| PersistError::Rename {
        from: tmp.clone(),
        to: path.to_path_buf(),
        source,
    })
}

fn check_version(path: &Path, version: u32) -> Result<(), PersistError> {
    if version == 0 || version > FORMAT_VERSION {
        return Err(PersistError::Version {
            path: path.to_path_buf(),
            version,
        });
    }
    Ok(())
}

/// Load an iTunes database snapshot into a fresh, device-less database.
pub unsafe fn load_itunesdb(path: &Path) -> Result<*mut Itdb_iTunesDB, PersistError> {
    let doc: DatabaseRecord = read_document(path)?;
    check_version(path, doc.version)?;

    let itdb = itdb_new();
    (*itdb).id = doc.id;
    (*itdb).tzoffset = doc.tzoffset;

    let mut by_id = HashMap::with_capacity(doc.tracks.len());
    for record in &doc.tracks {
        let track = record.restore();
        itdb_track_add(itdb, track, -1);
        by_id.insert(record.id, track);
    }
    for record in &doc.playlists {
        let pl = itdb_playlist_new(std::ptr::null(), FALSE);
        let p = &mut *pl;
        p.name = dup_opt(record.name.as_deref());
        p.type_ = record.type_;
        p.flag1 = record.flag1;
        p.flag2 = record.flag2;
        p.flag3 = record.flag3;
        p.is_spl = crate::gbool(record.is_spl);
        p.timestamp = record.timestamp;
        p.id = record.id;
        p.sortorder = record.sortorder;
        p.podcastflag = record.podcastflag;
        itdb_playlist_add(itdb, pl, -1);
        for id in &record.members {
            match by_id.get(id) {
                Some(&track) => {
                    itdb_playlist_add_track(pl, track, -1);
                }
                None => {
                    itdb_free(itdb);
                    return Err(PersistError::DanglingMember {
                        path: path.to_path_buf(),
                        owner: format!("playlist {:?}", record.name),
                        id: *id,
                    });
                }
            }
        }
    }
    info!(
        path = %path.display(),
        tracks = doc.tracks.len(),
        playlists = doc.playlists.len(),
        "iTunes database loaded"
    );
    Ok(itdb)
}

/// Renumber track ids and write `itdb` to `path`.
pub unsafe fn save_itunesdb(itdb: *mut Itdb_iTunesDB, path: &Path) -> Result<(), PersistError> {
    let db = &*itdb;
    let tracks = glist::to_vec::<Itdb_Track>(db.tracks);
    for (i, &t) in tracks.iter().enumerate() {
        (*t).id = FIRST_TRACK_ID + i as u32;
    }
    let playlists = glist::to_vec::<Itdb_Playlist>(db.playlists)
        .into_iter()
        .map(|pl| {
            let p = &*pl;
            PlaylistRecord {
                name: read_str(p.name),
                type_: p.type_,
                flag1: p.flag1,
                flag2: p.flag2,
                flag3: p.flag3,
                is_spl: p.is_spl != FALSE,
                timestamp: p.timestamp,
                id: p.id,
                sortorder: p.sortorder,
                podcastflag: p.podcastflag,
                members: glist::to_vec::<Itdb_Track>(p.members)
                    .into_iter()
                    .map(|t| (*t).id)
                    .collect(),
            }
        })
        .collect();
    let doc = DatabaseRecord {
        version: FORMAT_VERSION,
        id: db.id,
        tzoffset: db.tzoffset,
        tracks: tracks.iter().map(|&t| TrackRecord::capture(&*t)).collect(),
        playlists,
    };
    write_document(path, &doc)?;
    debug!(path = %path.display(), tracks = doc.tracks.len(), "iTunes database written");
    Ok(())
}

/// Load a photo database snapshot into `db`, which must be empty.
pub unsafe fn load_photodb(db: *mut Itdb_PhotoDB, path: &Path) -> Result<(), PersistError> {
    let doc: PhotoDatabaseRecord = read_document(path)?;
    check_version(path, doc.version)?;

    let mut by_id = HashMap::with_capacity(doc.photos.len());
    for record in &doc.photos {
        let art = crate::artwork::itdb_artwork_new();
        record.fill(art);
        (*db).photos = glist::g_list_append((*db).photos, art as gpointer);
        by_id.insert(record.id, art);
    }
    for record in &doc.albums {
        let name = CString::new(record.name.clone().unwrap_or_default().replace('\0', "")).unwrap_or_default();
        let album = itdb_photodb_photoalbum_new(name.as_ptr());
        let a = &mut *album;
        if record.name.is_none() {
            mem::replace_str(&mut a.name, None);
        }
        a.album_type = record.album_type;
        a.playmusic = record.playmusic;
        a.repeat = record.repeat;
        a.random = record.random;
        a.show_titles = record.show_titles;
        a.transition_direction = record.transition_direction;
        a.slide_duration = record.slide_duration;
        a.transition_duration = record.transition_duration;
        a.song_id = record.song_id;
        a.album_id = record.album_id;
        a.prev_album_id = record.prev_album_id;
        itdb_photodb_photoalbum_add(db, album, -1);
        for id in &record.members {
            match by_id.get(id) {
                Some(&photo) => a.members = glist::g_list_append(a.members, photo as gpointer),
                None => {
                    return Err(PersistError::DanglingMember {
                        path: path.to_path_buf(),
                        owner: format!("album {:?}", record.name),
                        id: *id,
                    })
                }
            }
        }
    }
    info!(path = %path.display(), photos = doc.photos.len(), albums = doc.albums.len(), "photo database loaded");
    Ok(())
}

pub unsafe fn save_photodb(db: *const Itdb_PhotoDB, path: &Path) -> Result<(), PersistError> {
    let db = &*db;
    let photos = glist::to_vec::<Itdb_Artwork>(db.photos)
        .into_iter()
        .filter_map(|art| ArtworkRecord::capture(art))
        .collect();
    let albums = glist::to_vec::<Itdb_PhotoAlbum>(db.photoalbums)
        .into_iter()
        .map(|album| {
            let a = &*album;
            PhotoAlbumRecord {
                name: read_str(a.name),
                album_type: a.album_type,
                playmusic: a.playmusic,
                repeat: a.repeat,
                random: a.random,
                show_titles: a.show_titles,
                transition_direction: a.transition_direction,
                slide_duration: a.slide_duration,
                transition_duration: a.transition_duration,
                song_id: a.song_id,
                album_id: a.album_id,
                prev_album_id: a.prev_album_id,
                members: glist::to_vec::<Itdb_Artwork>(a.members)
                    .into_iter()
                    .map(|p| (*p).id)
                    .collect(),
            }
        })
        .collect();
    write_document(
        path,
        &PhotoDatabaseRecord {
            version: FORMAT_VERSION,
            photos,
            albums,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itunesdb::itdb_free;
    use crate::playlist::{itdb_playlist_mpl, itdb_playlist_set_mpl};
    use crate::mem::dup_str;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_renumbers_and_keeps_membership() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ITUNESDB_FILE);
        unsafe {
            let db = itdb_new();
            let mpl = itdb_playlist_new(c"iPod".as_ptr(), FALSE);
            itdb_playlist_set_mpl(mpl);
            itdb_playlist_add(db, mpl, -1);
            for title in ["a", "b"] {
                let t = itdb_track_new();
                (*t).title = dup_str(title);
                (*t).mark_unplayed = 2;
                itdb_track_add(db, t, -1);
                itdb_playlist_add_track(mpl, t, 0);
            }
            save_itunesdb(db, &path).unwrap();
            itdb_free(db);

            let db = load_itunesdb(&path).unwrap();
            let tracks = glist::to_vec::<Itdb_Track>((*db).tracks);
            assert_eq!(tracks.len(), 2);
            assert_eq!((*tracks[0]).id, FIRST_TRACK_ID);
            assert_eq!((*tracks[1]).mark_unplayed, 2);
            let mpl = itdb_playlist_mpl(db);
            let members = glist::to_vec::<Itdb_Track>((*mpl).members);
            assert_eq!(read_str((*members[0]).title).as_deref(), Some("b"));
            itdb_free(db);
        }
    }

    #[test]
    fn test_dangling_member_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ITUNESDB_FILE);
        fs::write(&path, r#"{"version":1,"tracks":[],"playlists":[{"name":"x","members":[99]}]}"#).unwrap();
        let err = unsafe { load_itunesdb(&path) }.unwrap_err();
        assert!(matches!(err, PersistError::DanglingMember { id: 99, .. }));
    }

    #[test]
    fn test_future_version_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ITUNESDB_FILE);
        fs::write(&path, r#"{"version":9}"#).unwrap();
        assert!(matches!(unsafe { load_itunesdb(&path) }, Err(PersistError::Version { version: 9, .. })));
    }
}
