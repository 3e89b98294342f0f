//! Static iPod model registry
//!
//! One row per known model number. Rows 0 and 1 are the "Invalid" and
//! "Unknown" placeholders; the table ends with a row whose `model_number`
//! is NULL. Rows are never freed.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

pub type Itdb_IpodGeneration = u32;
pub type Itdb_IpodModel = u32;

pub const ITDB_IPOD_GENERATION_UNKNOWN: Itdb_IpodGeneration = 0;
pub const ITDB_IPOD_GENERATION_FIRST: Itdb_IpodGeneration = 1;
pub const ITDB_IPOD_GENERATION_SECOND: Itdb_IpodGeneration = 2;
pub const ITDB_IPOD_GENERATION_THIRD: Itdb_IpodGeneration = 3;
pub const ITDB_IPOD_GENERATION_FOURTH: Itdb_IpodGeneration = 4;
pub const ITDB_IPOD_GENERATION_PHOTO: Itdb_IpodGeneration = 5;
pub const ITDB_IPOD_GENERATION_MOBILE: Itdb_IpodGeneration = 6;
pub const ITDB_IPOD_GENERATION_MINI_1: Itdb_IpodGeneration = 7;
pub const ITDB_IPOD_GENERATION_MINI_2: Itdb_IpodGeneration = 8;
pub const ITDB_IPOD_GENERATION_SHUFFLE_1: Itdb_IpodGeneration = 9;
pub const ITDB_IPOD_GENERATION_SHUFFLE_2: Itdb_IpodGeneration = 10;
pub const ITDB_IPOD_GENERATION_SHUFFLE_3: Itdb_IpodGeneration = 11;
pub const ITDB_IPOD_GENERATION_NANO_1: Itdb_IpodGeneration = 12;
pub const ITDB_IPOD_GENERATION_NANO_2: Itdb_IpodGeneration = 13;
pub const ITDB_IPOD_GENERATION_NANO_3: Itdb_IpodGeneration = 14;
pub const ITDB_IPOD_GENERATION_NANO_4: Itdb_IpodGeneration = 15;
pub const ITDB_IPOD_GENERATION_VIDEO_1: Itdb_IpodGeneration = 16;
pub const ITDB_IPOD_GENERATION_VIDEO_2: Itdb_IpodGeneration = 17;
pub const ITDB_IPOD_GENERATION_CLASSIC_1: Itdb_IpodGeneration = 18;
pub const ITDB_IPOD_GENERATION_CLASSIC_2: Itdb_IpodGeneration = 19;
pub const ITDB_IPOD_GENERATION_TOUCH_1: Itdb_IpodGeneration = 20;
pub const ITDB_IPOD_GENERATION_IPHONE_1: Itdb_IpodGeneration = 21;

pub const ITDB_IPOD_MODEL_INVALID: Itdb_IpodModel = 0;
pub const ITDB_IPOD_MODEL_UNKNOWN: Itdb_IpodModel = 1;
pub const ITDB_IPOD_MODEL_COLOR: Itdb_IpodModel = 2;
pub const ITDB_IPOD_MODEL_COLOR_U2: Itdb_IpodModel = 3;
pub const ITDB_IPOD_MODEL_REGULAR: Itdb_IpodModel = 4;
pub const ITDB_IPOD_MODEL_REGULAR_U2: Itdb_IpodModel = 5;
pub const ITDB_IPOD_MODEL_MINI: Itdb_IpodModel = 6;
pub const ITDB_IPOD_MODEL_MINI_BLUE: Itdb_IpodModel = 7;
pub const ITDB_IPOD_MODEL_MINI_PINK: Itdb_IpodModel = 8;
pub const ITDB_IPOD_MODEL_MINI_GREEN: Itdb_IpodModel = 9;
pub const ITDB_IPOD_MODEL_MINI_GOLD: Itdb_IpodModel = 10;
pub const ITDB_IPOD_MODEL_SHUFFLE: Itdb_IpodModel = 11;
pub const ITDB_IPOD_MODEL_NANO_WHITE: Itdb_IpodModel = 12;
pub const ITDB_IPOD_MODEL_NANO_BLACK: Itdb_IpodModel = 13;
pub const ITDB_IPOD_MODEL_VIDEO_WHITE: Itdb_IpodModel = 14;
pub const ITDB_IPOD_MODEL_VIDEO_BLACK: Itdb_IpodModel = 15;
pub const ITDB_IPOD_MODEL_MOBILE_1: Itdb_IpodModel = 16;
pub const ITDB_IPOD_MODEL_VIDEO_U2: Itdb_IpodModel = 17;
pub const ITDB_IPOD_MODEL_NANO_SILVER: Itdb_IpodModel = 18;
pub const ITDB_IPOD_MODEL_NANO_BLUE: Itdb_IpodModel = 19;
pub const ITDB_IPOD_MODEL_NANO_GREEN: Itdb_IpodModel = 20;
pub const ITDB_IPOD_MODEL_NANO_PINK: Itdb_IpodModel = 21;
pub const ITDB_IPOD_MODEL_NANO_RED: Itdb_IpodModel = 22;
pub const ITDB_IPOD_MODEL_IPHONE_1: Itdb_IpodModel = 23;
pub const ITDB_IPOD_MODEL_SHUFFLE_SILVER: Itdb_IpodModel = 24;
pub const ITDB_IPOD_MODEL_SHUFFLE_PINK: Itdb_IpodModel = 25;
pub const ITDB_IPOD_MODEL_SHUFFLE_BLUE: Itdb_IpodModel = 26;
pub const ITDB_IPOD_MODEL_SHUFFLE_GREEN: Itdb_IpodModel = 27;
pub const ITDB_IPOD_MODEL_SHUFFLE_ORANGE: Itdb_IpodModel = 28;
pub const ITDB_IPOD_MODEL_SHUFFLE_PURPLE: Itdb_IpodModel = 29;
pub const ITDB_IPOD_MODEL_SHUFFLE_RED: Itdb_IpodModel = 30;
pub const ITDB_IPOD_MODEL_CLASSIC_SILVER: Itdb_IpodModel = 31;
pub const ITDB_IPOD_MODEL_CLASSIC_BLACK: Itdb_IpodModel = 32;
pub const ITDB_IPOD_MODEL_TOUCH_BLACK: Itdb_IpodModel = 33;

#[repr(C)]
#[derive(Debug)]
pub struct Itdb_IpodInfo {
    pub model_number: *const c_char,
    /// Capacity in GB; negative when not meaningful
    pub capacity: f64,
    pub ipod_model: Itdb_IpodModel,
    pub ipod_generation: Itdb_IpodGeneration,
    /// Number of `Fnn` music directories
    pub musicdirs: u32,
}

// Rows only point at 'static C string literals.
unsafe impl Sync for Itdb_IpodInfo {}

const fn row(
    model_number: &'static CStr,
    capacity: f64,
    ipod_model: Itdb_IpodModel,
    ipod_generation: Itdb_IpodGeneration,
    musicdirs: u32,
) -> Itdb_IpodInfo {
    Itdb_IpodInfo {
        model_number: model_number.as_ptr(),
        capacity,
        ipod_model,
        ipod_generation,
        musicdirs,
    }
}

static IPOD_INFO_TABLE: [Itdb_IpodInfo; 82] = [
    row(c"Invalid", 0.0, ITDB_IPOD_MODEL_INVALID, ITDB_IPOD_GENERATION_UNKNOWN, 0),
    row(c"Unknown", 0.0, ITDB_IPOD_MODEL_UNKNOWN, ITDB_IPOD_GENERATION_UNKNOWN, 0),
    // scroll wheel
    row(c"8513", 5.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_FIRST, 20),
    row(c"8541", 5.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_FIRST, 20),
    row(c"8697", 5.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_FIRST, 20),
    row(c"8709", 10.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_FIRST, 20),
    // touch wheel
    row(c"8737", 10.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_SECOND, 20),
    row(c"8740", 10.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_SECOND, 20),
    row(c"8738", 20.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_SECOND, 50),
    row(c"8741", 20.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_SECOND, 50),
    // dock connector
    row(c"8976", 10.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_THIRD, 20),
    row(c"8946", 15.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_THIRD, 50),
    row(c"9460", 15.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_THIRD, 50),
    row(c"9244", 20.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_THIRD, 50),
    row(c"8948", 30.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_THIRD, 50),
    row(c"9245", 40.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_THIRD, 50),
    // click wheel
    row(c"9282", 20.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_FOURTH, 50),
    row(c"9787", 25.0, ITDB_IPOD_MODEL_REGULAR_U2, ITDB_IPOD_GENERATION_FOURTH, 50),
    row(c"9268", 40.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_FOURTH, 50),
    row(c"E436", 40.0, ITDB_IPOD_MODEL_REGULAR, ITDB_IPOD_GENERATION_FOURTH, 50),
    // mini
    row(c"9160", 4.0, ITDB_IPOD_MODEL_MINI, ITDB_IPOD_GENERATION_MINI_1, 6),
    row(c"9436", 4.0, ITDB_IPOD_MODEL_MINI_BLUE, ITDB_IPOD_GENERATION_MINI_1, 6),
    row(c"9435", 4.0, ITDB_IPOD_MODEL_MINI_PINK, ITDB_IPOD_GENERATION_MINI_1, 6),
    row(c"9434", 4.0, ITDB_IPOD_MODEL_MINI_GREEN, ITDB_IPOD_GENERATION_MINI_1, 6),
    row(c"9437", 4.0, ITDB_IPOD_MODEL_MINI_GOLD, ITDB_IPOD_GENERATION_MINI_1, 6),
    row(c"9800", 4.0, ITDB_IPOD_MODEL_MINI, ITDB_IPOD_GENERATION_MINI_2, 6),
    row(c"9802", 4.0, ITDB_IPOD_MODEL_MINI_BLUE, ITDB_IPOD_GENERATION_MINI_2, 6),
    row(c"9804", 4.0, ITDB_IPOD_MODEL_MINI_PINK, ITDB_IPOD_GENERATION_MINI_2, 6),
    row(c"9806", 4.0, ITDB_IPOD_MODEL_MINI_GREEN, ITDB_IPOD_GENERATION_MINI_2, 6),
    row(c"9801", 6.0, ITDB_IPOD_MODEL_MINI, ITDB_IPOD_GENERATION_MINI_2, 20),
    row(c"9803", 6.0, ITDB_IPOD_MODEL_MINI_BLUE, ITDB_IPOD_GENERATION_MINI_2, 20),
    // photo
    row(c"A079", 20.0, ITDB_IPOD_MODEL_COLOR, ITDB_IPOD_GENERATION_PHOTO, 50),
    row(c"A127", 20.0, ITDB_IPOD_MODEL_COLOR_U2, ITDB_IPOD_GENERATION_PHOTO, 50),
    row(c"9829", 30.0, ITDB_IPOD_MODEL_COLOR, ITDB_IPOD_GENERATION_PHOTO, 50),
    row(c"9585", 40.0, ITDB_IPOD_MODEL_COLOR, ITDB_IPOD_GENERATION_PHOTO, 50),
    row(c"9830", 60.0, ITDB_IPOD_MODEL_COLOR, ITDB_IPOD_GENERATION_PHOTO, 50),
    row(c"9586", 60.0, ITDB_IPOD_MODEL_COLOR, ITDB_IPOD_GENERATION_PHOTO, 50),
    row(c"S492", 30.0, ITDB_IPOD_MODEL_COLOR, ITDB_IPOD_GENERATION_PHOTO, 50),
    // shuffle
    row(c"9724", 0.5, ITDB_IPOD_MODEL_SHUFFLE, ITDB_IPOD_GENERATION_SHUFFLE_1, 3),
    row(c"9725", 1.0, ITDB_IPOD_MODEL_SHUFFLE, ITDB_IPOD_GENERATION_SHUFFLE_1, 3),
    row(c"A546", 1.0, ITDB_IPOD_MODEL_SHUFFLE_SILVER, ITDB_IPOD_GENERATION_SHUFFLE_2, 3),
    row(c"A947", 1.0, ITDB_IPOD_MODEL_SHUFFLE_PINK, ITDB_IPOD_GENERATION_SHUFFLE_2, 3),
    row(c"A949", 1.0, ITDB_IPOD_MODEL_SHUFFLE_BLUE, ITDB_IPOD_GENERATION_SHUFFLE_2, 3),
    row(c"A951", 1.0, ITDB_IPOD_MODEL_SHUFFLE_GREEN, ITDB_IPOD_GENERATION_SHUFFLE_2, 3),
    row(c"A953", 1.0, ITDB_IPOD_MODEL_SHUFFLE_ORANGE, ITDB_IPOD_GENERATION_SHUFFLE_2, 3),
    row(c"B225", 1.0, ITDB_IPOD_MODEL_SHUFFLE_SILVER, ITDB_IPOD_GENERATION_SHUFFLE_3, 3),
    row(c"B233", 1.0, ITDB_IPOD_MODEL_SHUFFLE_PURPLE, ITDB_IPOD_GENERATION_SHUFFLE_3, 3),
    row(c"B227", 1.0, ITDB_IPOD_MODEL_SHUFFLE_BLUE, ITDB_IPOD_GENERATION_SHUFFLE_3, 3),
    row(c"B229", 1.0, ITDB_IPOD_MODEL_SHUFFLE_GREEN, ITDB_IPOD_GENERATION_SHUFFLE_3, 3),
    row(c"B518", 2.0, ITDB_IPOD_MODEL_SHUFFLE_SILVER, ITDB_IPOD_GENERATION_SHUFFLE_3, 3),
    row(c"B524", 2.0, ITDB_IPOD_MODEL_SHUFFLE_RED, ITDB_IPOD_GENERATION_SHUFFLE_3, 3),
    // nano
    row(c"A350", 1.0, ITDB_IPOD_MODEL_NANO_WHITE, ITDB_IPOD_GENERATION_NANO_1, 3),
    row(c"A352", 1.0, ITDB_IPOD_MODEL_NANO_BLACK, ITDB_IPOD_GENERATION_NANO_1, 3),
    row(c"A004", 2.0, ITDB_IPOD_MODEL_NANO_WHITE, ITDB_IPOD_GENERATION_NANO_1, 3),
    row(c"A099", 2.0, ITDB_IPOD_MODEL_NANO_BLACK, ITDB_IPOD_GENERATION_NANO_1, 3),
    row(c"A005", 4.0, ITDB_IPOD_MODEL_NANO_WHITE, ITDB_IPOD_GENERATION_NANO_1, 6),
    row(c"A107", 4.0, ITDB_IPOD_MODEL_NANO_BLACK, ITDB_IPOD_GENERATION_NANO_1, 6),
    row(c"A477", 2.0, ITDB_IPOD_MODEL_NANO_SILVER, ITDB_IPOD_GENERATION_NANO_2, 3),
    row(c"A426", 4.0, ITDB_IPOD_MODEL_NANO_SILVER, ITDB_IPOD_GENERATION_NANO_2, 6),
    row(c"A428", 4.0, ITDB_IPOD_MODEL_NANO_BLUE, ITDB_IPOD_GENERATION_NANO_2, 6),
    row(c"A487", 4.0, ITDB_IPOD_MODEL_NANO_GREEN, ITDB_IPOD_GENERATION_NANO_2, 6),
    row(c"A489", 4.0, ITDB_IPOD_MODEL_NANO_PINK, ITDB_IPOD_GENERATION_NANO_2, 6),
    row(c"A725", 4.0, ITDB_IPOD_MODEL_NANO_RED, ITDB_IPOD_GENERATION_NANO_2, 6),
    row(c"A497", 8.0, ITDB_IPOD_MODEL_NANO_BLACK, ITDB_IPOD_GENERATION_NANO_2, 14),
    row(c"A978", 4.0, ITDB_IPOD_MODEL_NANO_SILVER, ITDB_IPOD_GENERATION_NANO_3, 6),
    row(c"A980", 8.0, ITDB_IPOD_MODEL_NANO_SILVER, ITDB_IPOD_GENERATION_NANO_3, 14),
    row(c"B261", 8.0, ITDB_IPOD_MODEL_NANO_BLACK, ITDB_IPOD_GENERATION_NANO_3, 14),
    row(c"B257", 8.0, ITDB_IPOD_MODEL_NANO_RED, ITDB_IPOD_GENERATION_NANO_3, 14),
    // video
    row(c"A002", 30.0, ITDB_IPOD_MODEL_VIDEO_WHITE, ITDB_IPOD_GENERATION_VIDEO_1, 50),
    row(c"A146", 30.0, ITDB_IPOD_MODEL_VIDEO_BLACK, ITDB_IPOD_GENERATION_VIDEO_1, 50),
    row(c"A003", 60.0, ITDB_IPOD_MODEL_VIDEO_WHITE, ITDB_IPOD_GENERATION_VIDEO_1, 50),
    row(c"A147", 60.0, ITDB_IPOD_MODEL_VIDEO_BLACK, ITDB_IPOD_GENERATION_VIDEO_1, 50),
    row(c"A444", 30.0, ITDB_IPOD_MODEL_VIDEO_WHITE, ITDB_IPOD_GENERATION_VIDEO_2, 50),
    row(c"A664", 30.0, ITDB_IPOD_MODEL_VIDEO_U2, ITDB_IPOD_GENERATION_VIDEO_2, 50),
    row(c"A448", 80.0, ITDB_IPOD_MODEL_VIDEO_WHITE, ITDB_IPOD_GENERATION_VIDEO_2, 50),
    // classic
    row(c"B029", 80.0, ITDB_IPOD_MODEL_CLASSIC_SILVER, ITDB_IPOD_GENERATION_CLASSIC_1, 50),
    row(c"B147", 80.0, ITDB_IPOD_MODEL_CLASSIC_BLACK, ITDB_IPOD_GENERATION_CLASSIC_1, 50),
    row(c"B150", 160.0, ITDB_IPOD_MODEL_CLASSIC_BLACK, ITDB_IPOD_GENERATION_CLASSIC_1, 50),
    // touch and phones
    row(c"A623", 8.0, ITDB_IPOD_MODEL_TOUCH_BLACK, ITDB_IPOD_GENERATION_TOUCH_1, 14),
    row(c"A501", -1.0, ITDB_IPOD_MODEL_IPHONE_1, ITDB_IPOD_GENERATION_IPHONE_1, 14),
    row(c"mobile1", -1.0, ITDB_IPOD_MODEL_MOBILE_1, ITDB_IPOD_GENERATION_MOBILE, 6),
    Itdb_IpodInfo {
        model_number: ptr::null(),
        capacity: 0.0,
        ipod_model: 0,
        ipod_generation: 0,
        musicdirs: 0,
    },
];

static MODEL_NAMES: [&CStr; 34] = [
    c"Invalid",
    c"Unknown",
    c"Color",
    c"Color U2",
    c"Grayscale",
    c"Grayscale U2",
    c"Mini (Silver)",
    c"Mini (Blue)",
    c"Mini (Pink)",
    c"Mini (Green)",
    c"Mini (Gold)",
    c"Shuffle",
    c"Nano (White)",
    c"Nano (Black)",
    c"Video (White)",
    c"Video (Black)",
    c"Mobile (1)",
    c"Video U2",
    c"Nano (Silver)",
    c"Nano (Blue)",
    c"Nano (Green)",
    c"Nano (Pink)",
    c"Nano (Red)",
    c"iPhone (1)",
    c"Shuffle (Silver)",
    c"Shuffle (Pink)",
    c"Shuffle (Blue)",
    c"Shuffle (Green)",
    c"Shuffle (Orange)",
    c"Shuffle (Purple)",
    c"Shuffle (Red)",
    c"Classic (Silver)",
    c"Classic (Black)",
    c"Touch (Black)",
];

static GENERATION_NAMES: [&CStr; 22] = [
    c"Unknown",
    c"Regular (1st Gen.)",
    c"Regular (2nd Gen.)",
    c"Regular (3rd Gen.)",
    c"Regular (4th Gen.)",
    c"Photo",
    c"Mobile Phones",
    c"Mini (1st Gen.)",
    c"Mini (2nd Gen.)",
    c"Shuffle (1st Gen.)",
    c"Shuffle (2nd Gen.)",
    c"Shuffle (3rd Gen.)",
    c"Nano (1st Gen.)",
    c"Nano (2nd Gen.)",
    c"Nano Video (3rd Gen.)",
    c"Nano Video (4th Gen.)",
    c"Video (1st Gen.)",
    c"Video (2nd Gen.)",
    c"Classic",
    c"Classic (2nd Gen.)",
    c"Touch",
    c"iPhone",
];

/// Size of one stored artwork rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtworkFormat {
    pub format_id: i32,
    pub width: i32,
    pub height: i32,
}

const fn fmt(format_id: i32, width: i32, height: i32) -> ArtworkFormat {
    ArtworkFormat {
        format_id,
        width,
        height,
    }
}

static PHOTO_COVER_ART: [ArtworkFormat; 2] = [fmt(1017, 56, 56), fmt(1016, 140, 140)];
static PHOTO_PHOTO: [ArtworkFormat; 4] = [
    fmt(1009, 42, 30),
    fmt(1015, 130, 88),
    fmt(1013, 220, 176),
    fmt(1019, 720, 480),
];
static NANO_COVER_ART: [ArtworkFormat; 2] = [fmt(1031, 42, 42), fmt(1027, 100, 100)];
static NANO_PHOTO: [ArtworkFormat; 2] = [fmt(1032, 42, 37), fmt(1023, 176, 132)];
static VIDEO_COVER_ART: [ArtworkFormat; 2] = [fmt(1028, 100, 100), fmt(1029, 200, 200)];
static VIDEO_PHOTO: [ArtworkFormat; 4] = [
    fmt(1036, 50, 41),
    fmt(1015, 130, 88),
    fmt(1024, 320, 240),
    fmt(1019, 720, 480),
];
static CLASSIC_COVER_ART: [ArtworkFormat; 3] =
    [fmt(1061, 56, 56), fmt(1055, 128, 128), fmt(1060, 320, 320)];
static CLASSIC_PHOTO: [ArtworkFormat; 3] =
    [fmt(1067, 720, 480), fmt(1024, 320, 240), fmt(1066, 64, 64)];
static TOUCH_COVER_ART: [ArtworkFormat; 2] = [fmt(3001, 256, 256), fmt(3002, 128, 128)];

/// Cover-art renditions a generation stores; empty when artwork is unsupported.
pub fn cover_art_formats(generation: Itdb_IpodGeneration) -> &'static [ArtworkFormat] {
    match generation {
        ITDB_IPOD_GENERATION_PHOTO => &PHOTO_COVER_ART,
        ITDB_IPOD_GENERATION_NANO_1 | ITDB_IPOD_GENERATION_NANO_2 => &NANO_COVER_ART,
        ITDB_IPOD_GENERATION_VIDEO_1 | ITDB_IPOD_GENERATION_VIDEO_2 => &VIDEO_COVER_ART,
        ITDB_IPOD_GENERATION_NANO_3
        | ITDB_IPOD_GENERATION_NANO_4
        | ITDB_IPOD_GENERATION_CLASSIC_1
        | ITDB_IPOD_GENERATION_CLASSIC_2 => &CLASSIC_COVER_ART,
        ITDB_IPOD_GENERATION_TOUCH_1 | ITDB_IPOD_GENERATION_IPHONE_1 => &TOUCH_COVER_ART,
        _ => &[],
    }
}

/// Photo renditions a generation stores; empty when photos are unsupported.
pub fn photo_formats(generation: Itdb_IpodGeneration) -> &'static [ArtworkFormat] {
    match generation {
        ITDB_IPOD_GENERATION_PHOTO => &PHOTO_PHOTO,
        ITDB_IPOD_GENERATION_NANO_1 | ITDB_IPOD_GENERATION_NANO_2 => &NANO_PHOTO,
        ITDB_IPOD_GENERATION_VIDEO_1 | ITDB_IPOD_GENERATION_VIDEO_2 => &VIDEO_PHOTO,
        ITDB_IPOD_GENERATION_NANO_3
        | ITDB_IPOD_GENERATION_NANO_4
        | ITDB_IPOD_GENERATION_CLASSIC_1
        | ITDB_IPOD_GENERATION_CLASSIC_2 => &CLASSIC_PHOTO,
        _ => &[],
    }
}

pub fn supports_video(generation: Itdb_IpodGeneration) -> bool {
    matches!(
        generation,
        ITDB_IPOD_GENERATION_NANO_3
            | ITDB_IPOD_GENERATION_NANO_4
            | ITDB_IPOD_GENERATION_VIDEO_1
            | ITDB_IPOD_GENERATION_VIDEO_2
            | ITDB_IPOD_GENERATION_CLASSIC_1
            | ITDB_IPOD_GENERATION_CLASSIC_2
            | ITDB_IPOD_GENERATION_TOUCH_1
            | ITDB_IPOD_GENERATION_IPHONE_1
    )
}

pub fn supports_podcast(generation: Itdb_IpodGeneration) -> bool {
    !matches!(
        generation,
        ITDB_IPOD_GENERATION_UNKNOWN
            | ITDB_IPOD_GENERATION_FIRST
            | ITDB_IPOD_GENERATION_SECOND
            | ITDB_IPOD_GENERATION_THIRD
            | ITDB_IPOD_GENERATION_MOBILE
    )
}

pub fn supports_chapter_image(generation: Itdb_IpodGeneration) -> bool {
    matches!(
        generation,
        ITDB_IPOD_GENERATION_NANO_3
            | ITDB_IPOD_GENERATION_NANO_4
            | ITDB_IPOD_GENERATION_CLASSIC_1
            | ITDB_IPOD_GENERATION_CLASSIC_2
            | ITDB_IPOD_GENERATION_TOUCH_1
            | ITDB_IPOD_GENERATION_IPHONE_1
    )
}

/// The whole table including the placeholder rows, without the terminator.
pub fn ipod_info_rows() -> &'static [Itdb_IpodInfo] {
    &IPOD_INFO_TABLE[..IPOD_INFO_TABLE.len() - 1]
}

/// Row for a SysInfo `ModelNumStr` value. A leading region letter
/// (`xA079`, `MA079`) is skipped; matching is by case-insensitive prefix.
/// Unmatched values give the "Unknown" row.
pub fn lookup_model(model_num: &str) -> &'static Itdb_IpodInfo {
    let wanted = match model_num.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => &model_num[1..],
        _ => model_num,
    };
    ipod_info_rows()
        .iter()
        .skip(2)
        .find(|row| {
            // SAFETY: every non-terminator row points at a C string literal
            let number = unsafe { CStr::from_ptr(row.model_number) }.to_bytes();
            wanted.len() >= number.len()
                && wanted.as_bytes()[..number.len()].eq_ignore_ascii_case(number)
        })
        .unwrap_or(&IPOD_INFO_TABLE[1])
}

/// Start of the model table; walk until `model_number` is NULL.
#[no_mangle]
pub extern "C" fn itdb_info_get_ipod_info_table() -> *const Itdb_IpodInfo {
    IPOD_INFO_TABLE.as_ptr()
}

#[no_mangle]
pub unsafe extern "C" fn itdb_info_get_ipod_model_name_string(model: Itdb_IpodModel) -> *const c_char {
    MODEL_NAMES
        .get(model as usize)
        .map_or(ptr::null(), |name| name.as_ptr())
}

#[no_mangle]
pub unsafe extern "C" fn itdb_info_get_ipod_generation_string(
    generation: Itdb_IpodGeneration,
) -> *const c_char {
    GENERATION_NAMES
        .get(generation as usize)
        .map_or(ptr::null(), |name| name.as_ptr())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(info: &Itdb_IpodInfo) -> String {
        unsafe { CStr::from_ptr(info.model_number) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_table_is_null_terminated() {
        let rows = ipod_info_rows();
        assert_eq!(rows.len(), IPOD_INFO_TABLE.len() - 1);
        assert!(IPOD_INFO_TABLE[IPOD_INFO_TABLE.len() - 1].model_number.is_null());
        assert!(rows.iter().all(|r| !r.model_number.is_null()));
    }

    #[test]
    fn test_lookup_skips_region_letter() {
        let info = lookup_model("xA079");
        assert_eq!(number(info), "A079");
        assert_eq!(info.ipod_generation, ITDB_IPOD_GENERATION_PHOTO);
        assert_eq!(number(lookup_model("MB029LL")), "B029");
        assert_eq!(number(lookup_model("xZZZZ")), "Unknown");
    }

    #[test]
    fn test_capabilities_by_generation() {
        assert!(supports_video(ITDB_IPOD_GENERATION_VIDEO_1));
        assert!(!supports_video(ITDB_IPOD_GENERATION_PHOTO));
        assert!(!cover_art_formats(ITDB_IPOD_GENERATION_PHOTO).is_empty());
        assert!(photo_formats(ITDB_IPOD_GENERATION_SHUFFLE_1).is_empty());
        assert!(!supports_podcast(ITDB_IPOD_GENERATION_FIRST));
        assert!(supports_chapter_image(ITDB_IPOD_GENERATION_CLASSIC_1));
    }

    #[test]
    fn test_name_strings() {
        let name = unsafe { CStr::from_ptr(itdb_info_get_ipod_generation_string(ITDB_IPOD_GENERATION_NANO_3)) };
        assert_eq!(name.to_str().unwrap(), "Nano Video (3rd Gen.)");
        assert!(unsafe { itdb_info_get_ipod_model_name_string(999) }.is_null());
    }
}
