//! Read-only registry of known iPod models

use crate::core::overlay::read_string;
use gpod_native as ffi;
use std::fmt;

/// Hardware generation code. Unknown codes pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpodGeneration(pub u32);

impl IpodGeneration {
    pub const UNKNOWN: Self = Self(ffi::ITDB_IPOD_GENERATION_UNKNOWN);
    pub const FIRST: Self = Self(ffi::ITDB_IPOD_GENERATION_FIRST);
    pub const SECOND: Self = Self(ffi::ITDB_IPOD_GENERATION_SECOND);
    pub const THIRD: Self = Self(ffi::ITDB_IPOD_GENERATION_THIRD);
    pub const FOURTH: Self = Self(ffi::ITDB_IPOD_GENERATION_FOURTH);
    pub const PHOTO: Self = Self(ffi::ITDB_IPOD_GENERATION_PHOTO);
    pub const MOBILE: Self = Self(ffi::ITDB_IPOD_GENERATION_MOBILE);
    pub const MINI_1: Self = Self(ffi::ITDB_IPOD_GENERATION_MINI_1);
    pub const MINI_2: Self = Self(ffi::ITDB_IPOD_GENERATION_MINI_2);
    pub const SHUFFLE_1: Self = Self(ffi::ITDB_IPOD_GENERATION_SHUFFLE_1);
    pub const SHUFFLE_2: Self = Self(ffi::ITDB_IPOD_GENERATION_SHUFFLE_2);
    pub const SHUFFLE_3: Self = Self(ffi::ITDB_IPOD_GENERATION_SHUFFLE_3);
    pub const NANO_1: Self = Self(ffi::ITDB_IPOD_GENERATION_NANO_1);
    pub const NANO_2: Self = Self(ffi::ITDB_IPOD_GENERATION_NANO_2);
    pub const NANO_3: Self = Self(ffi::ITDB_IPOD_GENERATION_NANO_3);
    pub const NANO_4: Self = Self(ffi::ITDB_IPOD_GENERATION_NANO_4);
    pub const VIDEO_1: Self = Self(ffi::ITDB_IPOD_GENERATION_VIDEO_1);
    pub const VIDEO_2: Self = Self(ffi::ITDB_IPOD_GENERATION_VIDEO_2);
    pub const CLASSIC_1: Self = Self(ffi::ITDB_IPOD_GENERATION_CLASSIC_1);
    pub const CLASSIC_2: Self = Self(ffi::ITDB_IPOD_GENERATION_CLASSIC_2);
    pub const TOUCH_1: Self = Self(ffi::ITDB_IPOD_GENERATION_TOUCH_1);
    pub const IPHONE_1: Self = Self(ffi::ITDB_IPOD_GENERATION_IPHONE_1);

    /// Display name from the native table, e.g. "Nano (1st Gen.)".
    pub fn name(self) -> Option<String> {
        unsafe { read_string(ffi::itdb_info_get_ipod_generation_string(self.0)) }
    }
}

impl fmt::Display for IpodGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(&name),
            None => write!(f, "generation {}", self.0),
        }
    }
}

/// Model (color/variant) code. Unknown codes pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpodModel(pub u32);

impl IpodModel {
    pub const INVALID: Self = Self(ffi::ITDB_IPOD_MODEL_INVALID);
    pub const UNKNOWN: Self = Self(ffi::ITDB_IPOD_MODEL_UNKNOWN);
    pub const COLOR: Self = Self(ffi::ITDB_IPOD_MODEL_COLOR);
    pub const REGULAR: Self = Self(ffi::ITDB_IPOD_MODEL_REGULAR);
    pub const MINI: Self = Self(ffi::ITDB_IPOD_MODEL_MINI);
    pub const SHUFFLE: Self = Self(ffi::ITDB_IPOD_MODEL_SHUFFLE);
    pub const NANO_WHITE: Self = Self(ffi::ITDB_IPOD_MODEL_NANO_WHITE);
    pub const NANO_BLACK: Self = Self(ffi::ITDB_IPOD_MODEL_NANO_BLACK);
    pub const VIDEO_WHITE: Self = Self(ffi::ITDB_IPOD_MODEL_VIDEO_WHITE);
    pub const VIDEO_BLACK: Self = Self(ffi::ITDB_IPOD_MODEL_VIDEO_BLACK);
    pub const MOBILE_1: Self = Self(ffi::ITDB_IPOD_MODEL_MOBILE_1);
    pub const IPHONE_1: Self = Self(ffi::ITDB_IPOD_MODEL_IPHONE_1);
    pub const CLASSIC_SILVER: Self = Self(ffi::ITDB_IPOD_MODEL_CLASSIC_SILVER);
    pub const CLASSIC_BLACK: Self = Self(ffi::ITDB_IPOD_MODEL_CLASSIC_BLACK);
    pub const TOUCH_BLACK: Self = Self(ffi::ITDB_IPOD_MODEL_TOUCH_BLACK);

    pub fn name(self) -> Option<String> {
        unsafe { read_string(ffi::itdb_info_get_ipod_model_name_string(self.0)) }
    }
}

impl fmt::Display for IpodModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(&name),
            None => write!(f, "model {}", self.0),
        }
    }
}

/// One row of the static model table. Never freed.
#[derive(Clone, Copy)]
pub struct IpodInfo {
    row: &'static ffi::Itdb_IpodInfo,
}

impl IpodInfo {
    pub(crate) fn from_static(row: &'static ffi::Itdb_IpodInfo) -> Self {
        IpodInfo { row }
    }

    /// Every row of the native table.
    pub fn table() -> Vec<IpodInfo> {
        let mut rows = Vec::new();
        let mut cursor = ffi::itdb_info_get_ipod_info_table();
        // SAFETY: the table is static and terminated by a NULL model number
        unsafe {
            while let Some(row) = cursor.as_ref() {
                if row.model_number.is_null() {
                    break;
                }
                rows.push(IpodInfo { row });
                cursor = cursor.add(1);
            }
        }
        rows
    }

    /// Look a model number up, ignoring a leading region letter and case
    /// ("MA450" and "A450" name the same row).
    pub fn find_by_model_number(model_number: &str) -> Option<IpodInfo> {
        let wanted = model_number.trim();
        let wanted = match wanted.as_bytes().first() {
            Some(b) if b.is_ascii_alphabetic() && wanted.len() > 4 => &wanted[1..],
            _ => wanted,
        };
        // rows 0 and 1 are the Invalid/Unknown placeholders
        Self::table()
            .into_iter()
            .skip(2)
            .find(|info| info.model_number().eq_ignore_ascii_case(wanted))
    }

    pub fn model_number(&self) -> String {
        unsafe { read_string(self.row.model_number) }.unwrap_or_default()
    }

    /// Capacity in GB (negative when not meaningful)
    pub fn capacity(&self) -> f64 {
        self.row.capacity
    }

    pub fn model(&self) -> IpodModel {
        IpodModel(self.row.ipod_model)
    }

    pub fn generation(&self) -> IpodGeneration {
        IpodGeneration(self.row.ipod_generation)
    }

    pub fn model_name(&self) -> Option<String> {
        self.model().name()
    }

    pub fn generation_name(&self) -> Option<String> {
        self.generation().name()
    }

    pub fn music_dirs(&self) -> u32 {
        self.row.musicdirs
    }
}

impl PartialEq for IpodInfo {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.row, other.row)
    }
}

impl Eq for IpodInfo {}

impl fmt::Debug for IpodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpodInfo")
            .field("model_number", &self.model_number())
            .field("capacity", &self.capacity())
            .field("model", &self.model())
            .field("generation", &self.generation())
            .finish()
    }
}
