//!
//! # Avatar normalization
//!
//! Uploads are accepted as jpg/jpeg/png files up to 1 MB and stored as a
//! square 250x250 PNG, replacing whatever was there before.

use std::io::Cursor;

use image::imageops::FilterType;
use image::ImageFormat;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

/// Hard cap on the uploaded file size, enforced while the multipart stream is
/// being read.
pub const MAX_AVATAR_BYTES: usize = 1_000_000;

/// Stored avatars are exactly this many pixels on each side.
pub const AVATAR_DIMENSION: u32 = 250;

lazy_static! {
    static ref IMAGE_FILENAME: Regex = Regex::new(r"\.(jpg|jpeg|png)$").unwrap();
}

/// Checks the uploaded filename against the accepted image extensions.
pub fn acceptable_filename(filename: &str) -> bool {
    IMAGE_FILENAME.is_match(filename)
}

/// Decodes the uploaded bytes and re-encodes them as a 250x250 PNG.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let original = image::load_from_memory(bytes)?;

    let resized = original.resize_exact(AVATAR_DIMENSION, AVATAR_DIMENSION, FilterType::Lanczos3);

    let mut buffer = Vec::new();
    resized.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;

    Ok(buffer)
}
