//! Shared result types handed back to callers.
//!
//! [`ProcessedResult`] is what the normalizer produces for one image and
//! what the batch layer, the CLI report and file writing consume.

use crate::naming;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::fmt;

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Jpeg => write!(f, "JPEG"),
            OutputFormat::Png => write!(f, "PNG"),
        }
    }
}

/// A normalized, encoded square image.
///
/// `width == height` always. `processed_size` is the length of `bytes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedResult {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// Size of the input file in bytes.
    pub original_size: u64,
    pub processed_size: u64,
    /// Name of the input file, unchanged.
    pub file_name: String,
    /// Quality of the final encode (1.0 for PNG).
    pub quality: f32,
    /// The size search lowered quality at least once.
    pub was_compressed: bool,
    pub encode_attempts: u32,
}

impl ProcessedResult {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// `data:` URI with the base64-encoded image, for inline embedding.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }

    /// Download name using the default `instagram-` prefix.
    pub fn suggested_file_name(&self) -> String {
        naming::output_file_name(naming::DEFAULT_PREFIX, &self.file_name, self.format)
    }
}
