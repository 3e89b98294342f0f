//! Record types: typed wrappers over each native record kind

pub mod artwork;
pub mod chapter;
pub mod device;
pub mod ipod_info;
pub mod photo_album;
pub mod playlist;
pub mod track;

pub use artwork::{Artwork, Pixbuf, Thumbnail};
pub use chapter::{Chapter, ChapterData};
pub use device::Device;
pub use ipod_info::{IpodGeneration, IpodInfo, IpodModel};
pub use photo_album::PhotoAlbum;
pub use playlist::{Playlist, PlaylistType, SortOrder};
pub use track::{MediaType, Track};

use crate::core::handle::Record;
use crate::error::{GpodError, Result};

/// Take ownership of a record a native constructor just returned.
pub(crate) fn adopt<R: Record>(ptr: *mut R::Raw, what: &str) -> Result<R> {
    unsafe { R::owned(ptr) }.ok_or_else(|| GpodError::Precondition(format!("{what} returned NULL")))
}
