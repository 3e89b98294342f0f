//! # gpod-rs - Ownership-tracking iPod database bindings
//!
//! `gpod-rs` wraps the records of an iPod music database (tracks,
//! playlists, chapters, artwork) and photo database (photos, albums) held
//! in native memory by `gpod-native`. Every wrapper knows whether it owns
//! its record or borrows it from a container, so records are freed exactly
//! once no matter how they move between lists.
//!
//! - **Owned vs borrowed** wrappers with explicit ownership transfer on list insert/remove
//! - **Lazy lists** that read the native list on every access
//! - **Field overlays** that read and write record fields in place
//! - **Use-after-dispose detection** for every wrapper derived from a database
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gpod_rs::{Itdb, Playlist, Record, Result, Track};
//! use std::path::Path;
//!
//! # fn main() -> Result<()> {
//! let mountpoint = Path::new("/media/ipod");
//! Itdb::init_ipod(mountpoint, Some("MA079"), Some("My iPod"))?;
//! let db = Itdb::parse(mountpoint)?;
//!
//! let mut track = Track::new()?;
//! track.set_title(Some("Intro"))?;
//! db.tracks().push(&track)?; // the database owns it now
//!
//! let playlist = Playlist::new("Favourites", false)?;
//! db.playlists().push(&playlist)?;
//! playlist.tracks().push(&track)?;
//!
//! db.write()?;
//! db.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! ## Opening with options
//!
//! ```rust,no_run
//! use gpod_rs::{DatabaseBuilder, Result};
//!
//! # fn main() -> Result<()> {
//! let db = DatabaseBuilder::new()
//!     .mountpoint("/media/ipod")
//!     .model_number("MA079")
//!     .ipod_name("Kitchen")
//!     .create_if_missing()
//!     .open_itdb()?;
//! println!("{} tracks", db.track_count());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod itdb;
pub mod photodb;
pub mod record;

pub use crate::core::{LazyList, Membership, Ownership, Record};
pub use crate::core::time::set_utc_offset;
pub use crate::error::{GpodError, NativeError, Result};
pub use crate::itdb::Itdb;
pub use crate::photodb::PhotoDb;
pub use crate::record::{
    Artwork, Chapter, ChapterData, Device, IpodGeneration, IpodInfo, IpodModel, MediaType, PhotoAlbum, Pixbuf,
    Playlist, PlaylistType, SortOrder, Thumbnail, Track,
};

use std::path::PathBuf;
use tracing::{debug, info};

/// Options for opening the databases of one mounted iPod
///
/// # Examples
///
/// ```rust,no_run
/// use gpod_rs::DatabaseBuilder;
///
/// let photos = DatabaseBuilder::new()
///     .mountpoint("/media/ipod")
///     .create_if_missing()
///     .open_photodb()?;
/// # Ok::<(), gpod_rs::GpodError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseBuilder {
    mountpoint: Option<PathBuf>,
    model_number: Option<String>,
    ipod_name: Option<String>,
    create_if_missing: bool,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        DatabaseBuilder {
            mountpoint: None,
            model_number: None,
            ipod_name: None,
            create_if_missing: false,
        }
    }

    /// Where the iPod is mounted (required)
    pub fn mountpoint<P: Into<PathBuf>>(mut self, mountpoint: P) -> Self {
        self.mountpoint = Some(mountpoint.into());
        self
    }

    /// Model number written to SysInfo when a database is created
    pub fn model_number<S: Into<String>>(mut self, model_number: S) -> Self {
        self.model_number = Some(model_number.into());
        self
    }

    /// Name of the master playlist when a database is created
    pub fn ipod_name<S: Into<String>>(mut self, name: S) -> Self {
        self.ipod_name = Some(name.into());
        self
    }

    /// Initialize the device instead of failing when no database exists
    pub fn create_if_missing(mut self) -> Self {
        self.create_if_missing = true;
        self
    }

    fn require_mountpoint(&self) -> Result<&PathBuf> {
        self.mountpoint
            .as_ref()
            .ok_or_else(|| GpodError::Precondition("mountpoint must be set".into()))
    }

    /// Open the music database.
    pub fn open_itdb(self) -> Result<Itdb> {
        let mountpoint = self.require_mountpoint()?;
        match Itdb::parse(mountpoint) {
            Err(GpodError::Native(e)) if e.is_not_found() && self.create_if_missing => {
                info!(mountpoint = %mountpoint.display(), "no database, initializing iPod");
                Itdb::init_ipod(mountpoint, self.model_number.as_deref(), self.ipod_name.as_deref())?;
                Itdb::parse(mountpoint)
            }
            other => other,
        }
    }

    /// Open the photo database.
    pub fn open_photodb(self) -> Result<PhotoDb> {
        let mountpoint = self.require_mountpoint()?;
        match PhotoDb::parse(mountpoint) {
            Err(GpodError::Native(e)) if e.is_not_found() && self.create_if_missing => {
                debug!(mountpoint = %mountpoint.display(), "no photo directory, starting empty photo database");
                PhotoDb::create(Some(mountpoint))
            }
            other => other,
        }
    }
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builder_requires_mountpoint() {
        assert!(matches!(DatabaseBuilder::new().open_itdb(), Err(GpodError::Precondition(_))));
    }

    #[test]
    fn test_builder_without_create_fails_on_empty_dir() {
        let dir = TempDir::new().unwrap();
        let res = DatabaseBuilder::new().mountpoint(dir.path()).open_itdb();
        assert!(matches!(res, Err(GpodError::Native(e)) if e.is_not_found()));
    }

    #[test]
    fn test_builder_creates_itdb() {
        let dir = TempDir::new().unwrap();
        let db = DatabaseBuilder::new()
            .mountpoint(dir.path())
            .model_number("xA079")
            .ipod_name("Kitchen")
            .create_if_missing()
            .open_itdb()
            .unwrap();
        assert_eq!(db.master_playlist().unwrap().name().as_deref(), Some("Kitchen"));
        assert_eq!(db.device().unwrap().ipod_info().unwrap().generation(), IpodGeneration::PHOTO);

        // second open parses what the first one created
        let again = DatabaseBuilder::new().mountpoint(dir.path()).open_itdb().unwrap();
        assert_eq!(again.playlists().len(), 2);
    }

    #[test]
    fn test_builder_creates_photodb() {
        let dir = TempDir::new().unwrap();
        let db = DatabaseBuilder::default()
            .mountpoint(dir.path())
            .create_if_missing()
            .open_photodb()
            .unwrap();
        assert!(db.photo_library().is_some());
        db.write().unwrap();
        assert!(DatabaseBuilder::new().mountpoint(dir.path()).open_photodb().is_ok());
    }
}
