//! High-level normalization operations.
//!
//! These functions combine calculations with backend execution: validate
//! options, decode, plan the composition, render, then run the
//! size-constrained encode.

use super::backend::{BackendError, Canvas, Encoding, ImageBackend};
use super::compose::plan_composition;
use super::params::{EncodingLimits, OptionsError, ProcessingOptions, Quality};
use super::rust_backend::RustBackend;
use crate::types::ProcessedResult;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("encoder unavailable: {0}")]
    EncodeUnavailable(String),
    #[error("image too large: {0}")]
    TooLarge(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BackendError> for FormatError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode(msg) => FormatError::Decode(msg),
            BackendError::EncodeUnavailable(msg) => FormatError::EncodeUnavailable(msg),
        }
    }
}

impl From<OptionsError> for FormatError {
    fn from(err: OptionsError) -> Self {
        FormatError::InvalidOptions(err.0)
    }
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, FormatError>;

/// Outcome of [`encode_within_budget`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub encoding: Encoding,
    /// Quality of the returned bytes. PNG reports full quality.
    pub quality: Quality,
    /// At least one quality reduction happened.
    pub was_compressed: bool,
    /// Number of encoder calls, including the first.
    pub attempts: u32,
}

/// Encode `canvas`, trading JPEG quality for size until `max_size_bytes`
/// is met or the quality floor is reached.
///
/// Without a budget the canvas is encoded once: PNG, or JPEG at
/// `limits.large_image_quality` when the canvas has more than
/// `limits.lossless_pixel_limit` pixels.
///
/// Missing the budget at the floor is not an error; the floor encoding is
/// returned and callers that need a hard cap compare its length themselves.
pub fn encode_within_budget(
    backend: &impl ImageBackend,
    canvas: &Canvas,
    start: Quality,
    max_size_bytes: Option<u64>,
    limits: &EncodingLimits,
) -> Result<EncodedImage> {
    let Some(max) = max_size_bytes else {
        let encoding = if canvas.pixel_count() > limits.lossless_pixel_limit {
            Encoding::Jpeg(limits.large_image_quality)
        } else {
            Encoding::Png
        };
        let bytes = backend.encode(canvas, encoding)?;
        let quality = match encoding {
            Encoding::Jpeg(q) => q,
            Encoding::Png => Quality::MAX,
        };
        return Ok(EncodedImage {
            bytes,
            encoding,
            quality,
            was_compressed: false,
            attempts: 1,
        });
    };

    let mut quality = start;
    let mut bytes = backend.encode(canvas, Encoding::Jpeg(quality))?;
    let mut attempts = 1;
    let mut was_compressed = false;
    debug!(quality = quality.fraction(), size = bytes.len(), max, "initial encode");

    while bytes.len() as u64 > max && quality > limits.quality_floor {
        quality = quality.step_down(limits.quality_step, limits.quality_floor);
        bytes = backend.encode(canvas, Encoding::Jpeg(quality))?;
        attempts += 1;
        was_compressed = true;
        debug!(quality = quality.fraction(), size = bytes.len(), max, "re-encoded");
    }

    if bytes.len() as u64 > max {
        warn!(
            quality = quality.fraction(),
            size = bytes.len(),
            max,
            "size budget not met at quality floor"
        );
    }

    Ok(EncodedImage {
        bytes,
        encoding: Encoding::Jpeg(quality),
        quality,
        was_compressed,
        attempts,
    })
}

/// Run the whole pipeline for one image with the [`RustBackend`].
pub fn normalize(
    bytes: &[u8],
    file_name: &str,
    options: &ProcessingOptions,
    limits: &EncodingLimits,
) -> Result<ProcessedResult> {
    normalize_with_backend(&RustBackend::new(), bytes, file_name, options, limits)
}

/// Run the whole pipeline for one image (allows testing with mock).
pub fn normalize_with_backend(
    backend: &impl ImageBackend,
    bytes: &[u8],
    file_name: &str,
    options: &ProcessingOptions,
    limits: &EncodingLimits,
) -> Result<ProcessedResult> {
    options.validate()?;
    limits.validate()?;

    let source = backend.decode(bytes, file_name)?;
    let plan = plan_composition((source.width(), source.height()), options);
    debug!(
        file = file_name,
        source_width = source.width(),
        source_height = source.height(),
        canvas = plan.canvas_side,
        "planned composition"
    );
    if plan.canvas_side > limits.max_canvas_side {
        return Err(FormatError::TooLarge(format!(
            "{file_name}: {}x{} needs a {}px canvas, limit is {}px",
            source.width(),
            source.height(),
            plan.canvas_side,
            limits.max_canvas_side
        )));
    }

    let canvas = backend.render(&source, &plan)?;
    let original_size = source.byte_len();
    drop(source);

    let encoded = encode_within_budget(
        backend,
        &canvas,
        options.quality,
        options.max_size_bytes,
        limits,
    )?;
    let side = canvas.side();
    drop(canvas);

    info!(
        file = file_name,
        side,
        size = encoded.bytes.len(),
        quality = encoded.quality.fraction(),
        compressed = encoded.was_compressed,
        "normalized"
    );

    Ok(ProcessedResult {
        processed_size: encoded.bytes.len() as u64,
        format: encoded.encoding.format(),
        bytes: encoded.bytes,
        width: side,
        height: side,
        original_size,
        file_name: file_name.to_string(),
        quality: encoded.quality.fraction(),
        was_compressed: encoded.was_compressed,
        encode_attempts: encoded.attempts,
    })
}
