//! Output file naming.
//!
//! Formatted images are saved as `<prefix><stem>.<ext>`, where the prefix
//! defaults to `instagram-` and the extension follows the encoded format,
//! not the input. A PNG source encoded as JPEG under a size budget becomes
//! `instagram-photo.jpg`:
//!
//! - `beach.jpeg` + JPEG → `instagram-beach.jpg`
//! - `scan.tiff` + PNG → `instagram-scan.png`
//! - `IMG_0042` + JPEG → `instagram-IMG_0042.jpg`
//! - `holiday.photo.png` + PNG → `instagram-holiday.photo.png`

use crate::types::OutputFormat;
use std::path::Path;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "instagram-";

/// Build the output file name for `original` encoded as `format`.
///
/// Directory components of `original` are dropped; only the file stem is kept.
pub fn output_file_name(prefix: &str, original: &str, format: OutputFormat) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{prefix}{stem}.{}", format.extension())
}

/// Insert `-n` before the extension: `a.jpg` → `a-2.jpg`.
pub fn with_counter(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{n}.{ext}"),
        _ => format!("{name}-{n}"),
    }
}
