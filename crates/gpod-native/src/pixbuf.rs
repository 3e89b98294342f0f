//! Opaque RGB pixel buffers
//!
//! `Itdb_Pixbuf` is the image value exchanged with callers. Thumbnails keep
//! their pixels in the same [`Image`] representation. Only binary PPM (`P6`,
//! maxval 255) is understood as a file/data format.

use crate::ledger::{self, AllocKind};
use serde::{Deserialize, Serialize};
use std::ptr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("pixel buffer length {len} does not match {width}x{height} RGB")]
    BadLength { width: u32, height: u32, len: usize },

    #[error("not a binary PPM image")]
    NotPpm,

    #[error("truncated PPM image")]
    Truncated,

    #[error("unsupported rotation: {0} degrees")]
    Rotation(i32),

    #[error("empty image")]
    Empty,
}

/// Packed 8-bit RGB image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Image {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty);
        }
        if rgb.len() != width as usize * height as usize * 3 {
            return Err(ImageError::BadLength {
                width,
                height,
                len: rgb.len(),
            });
        }
        Ok(Self { width, height, rgb })
    }

    /// Parse a binary PPM (`P6`) image.
    pub fn from_ppm(data: &[u8]) -> Result<Self, ImageError> {
        let mut fields = Vec::with_capacity(4);
        let mut pos = 0;
        while fields.len() < 4 {
            while pos < data.len() && (data[pos].is_ascii_whitespace() || data[pos] == b'#') {
                if data[pos] == b'#' {
                    while pos < data.len() && data[pos] != b'\n' {
                        pos += 1;
                    }
                } else {
                    pos += 1;
                }
            }
            let start = pos;
            while pos < data.len() && !data[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if start == pos {
                return Err(ImageError::Truncated);
            }
            fields.push(&data[start..pos]);
        }
        if fields[0] != b"P6" {
            return Err(ImageError::NotPpm);
        }
        let parse = |f: &[u8]| -> Result<u32, ImageError> {
            std::str::from_utf8(f)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or(ImageError::NotPpm)
        };
        let (width, height, maxval) = (parse(fields[1])?, parse(fields[2])?, parse(fields[3])?);
        if maxval != 255 {
            return Err(ImageError::NotPpm);
        }
        // single whitespace byte separates the header from the raster
        pos += 1;
        let len = width as usize * height as usize * 3;
        let raster = data.get(pos..pos + len).ok_or(ImageError::Truncated)?;
        Self::new(width, height, raster.to_vec())
    }

    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.rgb);
        out
    }

    /// Nearest-neighbour resize. Non-positive dimensions keep the stored
    /// size, or follow the other dimension's aspect ratio.
    pub fn scaled(&self, width: i32, height: i32) -> Image {
        let (w, h) = match (width > 0, height > 0) {
            (false, false) => return self.clone(),
            (true, true) => (width as u32, height as u32),
            (true, false) => {
                let w = width as u32;
                (w, ((self.height as u64 * w as u64) / self.width as u64).max(1) as u32)
            }
            (false, true) => {
                let h = height as u32;
                (((self.width as u64 * h as u64) / self.height as u64).max(1) as u32, h)
            }
        };
        if w == self.width && h == self.height {
            return self.clone();
        }
        let mut rgb = Vec::with_capacity(w as usize * h as usize * 3);
        for y in 0..h {
            let sy = (y as u64 * self.height as u64 / h as u64) as usize;
            for x in 0..w {
                let sx = (x as u64 * self.width as u64 / w as u64) as usize;
                let i = (sy * self.width as usize + sx) * 3;
                rgb.extend_from_slice(&self.rgb[i..i + 3]);
            }
        }
        Image {
            width: w,
            height: h,
            rgb,
        }
    }

    /// Rotate clockwise by a multiple of 90 degrees.
    pub fn rotated(&self, degrees: i32) -> Result<Image, ImageError> {
        let turns = match degrees.rem_euclid(360) {
            0 => 0,
            90 => 1,
            180 => 2,
            270 => 3,
            _ => return Err(ImageError::Rotation(degrees)),
        };
        let mut img = self.clone();
        for _ in 0..turns {
            img = img.rotate_once();
        }
        Ok(img)
    }

    fn rotate_once(&self) -> Image {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut rgb = vec![0u8; self.rgb.len()];
        for y in 0..h {
            for x in 0..w {
                // (x, y) -> (h - 1 - y, x) in a h-wide image
                let src = (y * w + x) * 3;
                let dst = (x * h + (h - 1 - y)) * 3;
                rgb[dst..dst + 3].copy_from_slice(&self.rgb[src..src + 3]);
            }
        }
        Image {
            width: self.height,
            height: self.width,
            rgb,
        }
    }
}

/// Opaque image value.
#[derive(Debug)]
pub struct Itdb_Pixbuf {
    pub(crate) image: Image,
}

pub(crate) fn pixbuf_from_image(image: Image) -> *mut Itdb_Pixbuf {
    let pixbuf = Box::into_raw(Box::new(Itdb_Pixbuf { image }));
    ledger::register(pixbuf as usize, AllocKind::Pixbuf);
    pixbuf
}

/// Create a pixbuf from packed RGB bytes. Returns NULL when the length
/// does not match the dimensions.
#[no_mangle]
pub unsafe extern "C" fn itdb_pixbuf_new(
    width: u32,
    height: u32,
    rgb: *const u8,
    len: usize,
) -> *mut Itdb_Pixbuf {
    if rgb.is_null() {
        return ptr::null_mut();
    }
    let bytes = std::slice::from_raw_parts(rgb, len).to_vec();
    match Image::new(width, height, bytes) {
        Ok(image) => pixbuf_from_image(image),
        Err(e) => {
            tracing::warn!(error = %e, "itdb_pixbuf_new rejected buffer");
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn itdb_pixbuf_width(pixbuf: *const Itdb_Pixbuf) -> u32 {
    pixbuf.as_ref().map_or(0, |p| p.image.width)
}

#[no_mangle]
pub unsafe extern "C" fn itdb_pixbuf_height(pixbuf: *const Itdb_Pixbuf) -> u32 {
    pixbuf.as_ref().map_or(0, |p| p.image.height)
}

/// Borrow the packed RGB bytes; `len` receives their length.
#[no_mangle]
pub unsafe extern "C" fn itdb_pixbuf_pixels(pixbuf: *const Itdb_Pixbuf, len: *mut usize) -> *const u8 {
    match pixbuf.as_ref() {
        Some(p) => {
            if !len.is_null() {
                *len = p.image.rgb.len();
            }
            p.image.rgb.as_ptr()
        }
        None => ptr::null(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn itdb_pixbuf_free(pixbuf: *mut Itdb_Pixbuf) {
    if !pixbuf.is_null() && ledger::release(pixbuf as usize, AllocKind::Pixbuf) {
        drop(Box::from_raw(pixbuf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Image {
        // 2x1: red, blue
        Image::new(2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap()
    }

    #[test]
    fn test_ppm_parse_with_comment() {
        let mut data = b"P6\n# made by hand\n2 1\n255\n".to_vec();
        data.extend_from_slice(&checker().rgb);
        assert_eq!(Image::from_ppm(&data).unwrap(), checker());
        assert_eq!(Image::from_ppm(&checker().to_ppm()).unwrap(), checker());
    }

    #[test]
    fn test_ppm_rejects_ascii_and_truncation() {
        assert_eq!(Image::from_ppm(b"P3\n1 1\n255\n0 0 0"), Err(ImageError::NotPpm));
        assert_eq!(Image::from_ppm(b"P6\n2 2\n255\n\x00\x00"), Err(ImageError::Truncated));
    }

    #[test]
    fn test_rotation() {
        let img = checker();
        let quarter = img.rotated(90).unwrap();
        assert_eq!((quarter.width, quarter.height), (1, 2));
        // red ends up on top after a clockwise turn of a left-to-right strip
        assert_eq!(&quarter.rgb[0..3], &[255, 0, 0]);
        assert_eq!(img.rotated(360).unwrap(), img);
        assert_eq!(img.rotated(45), Err(ImageError::Rotation(45)));
    }

    #[test]
    fn test_scaling_keeps_aspect() {
        let img = Image::new(4, 2, vec![7; 24]).unwrap();
        let s = img.scaled(2, -1);
        assert_eq!((s.width, s.height), (2, 1));
        assert_eq!(img.scaled(-1, -1), img);
        assert_eq!(img.scaled(8, 8).rgb.len(), 8 * 8 * 3);
    }
}
