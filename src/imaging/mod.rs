//! Image normalization in pure Rust, on the `image` crate.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (format sniffed from bytes) |
//! | **Dimensions** | [`resolve_dimensions`]: keep or scale to `min_size` |
//! | **Compose** | [`plan_composition`]: fill/backdrop, shadow layers, subject |
//! | **Render** | `resize_exact` (Lanczos3), `imageops::blur`, `imageops::overlay` |
//! | **Encode** | PNG, or JPEG with a quality-for-size search |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for canvas geometry (unit testable)
//! - **Parameters**: Options, quality and encoder limits
//! - **Compose**: Immutable draw-command plans
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`normalize`] and [`encode_within_budget`], combining the above

pub mod backend;
mod calculations;
pub mod compose;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Canvas, Dimensions, Encoding, ImageBackend, SourceImage};
pub use calculations::{canvas_side, centered_offset, resolve_dimensions};
pub use compose::{CompositionPlan, DrawCommand, plan_composition};
pub use operations::{
    EncodedImage, FormatError, encode_within_budget, normalize, normalize_with_backend,
};
pub use params::{
    BackgroundType, EncodingLimits, MIN_SIZE_LOWER, MIN_SIZE_UPPER, OptionsError,
    ProcessingOptions, Quality,
};
pub use rust_backend::{RustBackend, supported_input_extensions};
