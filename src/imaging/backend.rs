//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: decode, render and encode. The normalization logic in
//! [`operations`](super::operations) only talks to this trait, so the size
//! search and the batch layer can be tested against a mock that never
//! touches a pixel codec.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::compose::CompositionPlan;
use super::params::Quality;
use crate::types::OutputFormat;
use image::{DynamicImage, RgbImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Input is not a supported raster image, or is truncated/corrupt.
    #[error("could not decode image: {0}")]
    Decode(String),
    /// No usable encoder for the requested output.
    #[error("encoder unavailable: {0}")]
    EncodeUnavailable(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A fully decoded input image.
///
/// Immutable once decoded and owned by the pipeline invocation that
/// produced it.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: DynamicImage,
    byte_len: u64,
    file_name: String,
}

impl SourceImage {
    /// Wrap decoded pixels. Returns `None` for a zero-sized image.
    pub fn new(pixels: DynamicImage, byte_len: u64, file_name: impl Into<String>) -> Option<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return None;
        }
        Some(Self {
            pixels,
            byte_len,
            file_name: file_name.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Size of the encoded input in bytes.
    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// The square working surface, fully opaque once rendered.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbImage,
}

impl Canvas {
    /// Wrap a rendered buffer. Returns `None` unless it is square.
    pub fn new(pixels: RgbImage) -> Option<Self> {
        (pixels.width() == pixels.height()).then_some(Self { pixels })
    }

    pub fn side(&self) -> u32 {
        self.pixels.width()
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.side()) * u64::from(self.side())
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Output encoding for one encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Png,
    Jpeg(Quality),
}

impl Encoding {
    pub fn format(self) -> OutputFormat {
        match self {
            Encoding::Png => OutputFormat::Png,
            Encoding::Jpeg(_) => OutputFormat::Jpeg,
        }
    }
}

/// Trait for image backends.
///
/// Implementations must be stateless across calls (or internally
/// synchronized): batch processing shares one backend across rayon workers.
pub trait ImageBackend: Sync {
    /// Decode raw bytes into a pixel-addressable image.
    fn decode(&self, bytes: &[u8], file_name: &str) -> Result<SourceImage, BackendError>;

    /// Replay a composition plan onto a fresh canvas.
    fn render(&self, source: &SourceImage, plan: &CompositionPlan) -> Result<Canvas, BackendError>;

    /// Encode a canvas. The returned bytes are exactly what callers receive.
    fn encode(&self, canvas: &Canvas, encoding: Encoding) -> Result<Vec<u8>, BackendError>;
}
