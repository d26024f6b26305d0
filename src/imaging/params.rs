//! Parameter types for the normalization pipeline.
//!
//! These structs describe *what* to produce, not *how* to produce it. They
//! are the interface between callers (CLI, config, batch) and the
//! [`operations`](super::operations) module, which turns them into a
//! composition plan and an encode strategy.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality, stored as a whole percentage (0–100).
//! - [`BackgroundType`]: Solid white fill or a blurred copy of the subject.
//! - [`ProcessingOptions`]: Per-image settings: minimum size, starting quality,
//!   byte budget, shadow and background.
//! - [`EncodingLimits`]: Tunable constants of the size search: quality floor,
//!   step, lossless pixel limit and the quality used for very large images.
//!
//! Validation is strict: out-of-range values are rejected with
//! [`OptionsError`], never clamped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accepted `min_size`.
pub const MIN_SIZE_LOWER: u32 = 320;
/// Largest accepted `min_size`.
pub const MIN_SIZE_UPPER: u32 = 2048;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct OptionsError(pub String);

/// Quality setting for lossy encoding.
///
/// Callers speak in fractions (`0.0..=1.0`, as the canvas API does); the
/// value is held as whole percent so stepping down by 0.05 lands exactly on
/// 0.50 instead of drifting past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const MAX: Quality = Quality(100);

    /// Build from a fraction. Returns `None` outside `0.0..=1.0` or for NaN.
    pub fn from_fraction(value: f32) -> Option<Self> {
        if !(0.0..=1.0).contains(&value) {
            return None;
        }
        Some(Self((value * 100.0).round() as u8))
    }

    pub fn from_percent(percent: u8) -> Option<Self> {
        (percent <= 100).then_some(Self(percent))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    pub fn fraction(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Quality as handed to the JPEG encoder, which rejects 0.
    pub fn encoder_value(self) -> u8 {
        self.0.max(1)
    }

    /// One step lower, never below `floor`.
    pub fn step_down(self, step: Quality, floor: Quality) -> Quality {
        Quality(self.0.saturating_sub(step.0).max(floor.0))
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::MAX
    }
}

/// How the canvas behind the subject is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundType {
    /// Plain white fill.
    #[default]
    Solid,
    /// Heavily blurred, slightly darkened copy of the subject.
    Blurred,
}

/// Per-image processing settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    /// Lower bound for the shorter side when scaling (px).
    pub min_size: u32,
    /// Starting quality for lossy encodes.
    pub quality: Quality,
    /// Byte budget for the encoded output. `None` disables the size search.
    pub max_size_bytes: Option<u64>,
    /// Keep the source resolution when both sides already reach `min_size`.
    pub preserve_original_size: bool,
    /// Draw the layered soft shadow under the subject.
    pub enable_shadow: bool,
    pub background: BackgroundType,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            min_size: 1080,
            quality: Quality::MAX,
            max_size_bytes: None,
            preserve_original_size: true,
            enable_shadow: true,
            background: BackgroundType::Solid,
        }
    }
}

impl ProcessingOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !(MIN_SIZE_LOWER..=MIN_SIZE_UPPER).contains(&self.min_size) {
            return Err(OptionsError(format!(
                "min_size must be {MIN_SIZE_LOWER}-{MIN_SIZE_UPPER}, got {}",
                self.min_size
            )));
        }
        if self.max_size_bytes == Some(0) {
            return Err(OptionsError("max_size_bytes must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Constants steering the size-constrained encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingLimits {
    /// Lowest quality the size search will go to.
    pub quality_floor: Quality,
    /// Amount subtracted per re-encode.
    pub quality_step: Quality,
    /// Above this many canvas pixels an unconstrained encode is JPEG, not PNG.
    pub lossless_pixel_limit: u64,
    /// JPEG quality used for canvases past `lossless_pixel_limit`.
    pub large_image_quality: Quality,
    /// Largest canvas side that will be rendered. Images whose plan exceeds
    /// it fail with [`FormatError::TooLarge`](super::FormatError::TooLarge).
    pub max_canvas_side: u32,
}

impl Default for EncodingLimits {
    fn default() -> Self {
        Self {
            quality_floor: Quality(50),
            quality_step: Quality(5),
            lossless_pixel_limit: 4096 * 4096,
            large_image_quality: Quality(92),
            max_canvas_side: 8192,
        }
    }
}

impl EncodingLimits {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.quality_step.percent() == 0 {
            return Err(OptionsError("quality_step must be greater than 0".into()));
        }
        if self.quality_floor.percent() == 0 {
            return Err(OptionsError("quality_floor must be greater than 0".into()));
        }
        if self.lossless_pixel_limit == 0 {
            return Err(OptionsError(
                "lossless_pixel_limit must be greater than 0".into(),
            ));
        }
        if self.max_canvas_side < MIN_SIZE_LOWER {
            return Err(OptionsError(format!(
                "max_canvas_side must be at least {MIN_SIZE_LOWER}"
            )));
        }
        Ok(())
    }

    /// Upper bound on encodes for a budgeted search starting at `start`.
    pub fn max_attempts(&self, start: Quality) -> u32 {
        let span = u32::from(start.percent().saturating_sub(self.quality_floor.percent()));
        span.div_ceil(u32::from(self.quality_step.percent())) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_from_fraction_rounds_to_percent() {
        assert_eq!(Quality::from_fraction(0.9).unwrap().percent(), 90);
        assert_eq!(Quality::from_fraction(0.925).unwrap().percent(), 93);
        assert_eq!(Quality::from_fraction(1.0).unwrap().percent(), 100);
    }

    #[test]
    fn quality_rejects_out_of_range() {
        assert!(Quality::from_fraction(1.01).is_none());
        assert!(Quality::from_fraction(-0.1).is_none());
        assert!(Quality::from_fraction(f32::NAN).is_none());
        assert!(Quality::from_percent(101).is_none());
    }

    #[test]
    fn quality_steps_land_on_floor() {
        let step = Quality(5);
        let floor = Quality(50);
        let mut q = Quality::MAX;
        for _ in 0..10 {
            q = q.step_down(step, floor);
        }
        assert_eq!(q, floor);
        assert_eq!(q.fraction(), 0.5);
        assert_eq!(Quality(53).step_down(step, floor), floor);
    }

    #[test]
    fn encoder_value_never_zero() {
        assert_eq!(Quality(0).encoder_value(), 1);
        assert_eq!(Quality(85).encoder_value(), 85);
    }

    #[test]
    fn default_options() {
        let o = ProcessingOptions::default();
        assert_eq!(o.min_size, 1080);
        assert_eq!(o.quality, Quality::MAX);
        assert_eq!(o.max_size_bytes, None);
        assert!(o.preserve_original_size);
        assert!(o.enable_shadow);
        assert_eq!(o.background, BackgroundType::Solid);
    }

    #[test]
    fn validate_rejects_min_size_out_of_range() {
        for bad in [0, 319, 2049] {
            let o = ProcessingOptions {
                min_size: bad,
                ..Default::default()
            };
            assert!(o.validate().is_err(), "min_size {bad} should be rejected");
        }
        for good in [320, 1080, 2048] {
            let o = ProcessingOptions {
                min_size: good,
                ..Default::default()
            };
            assert!(o.validate().is_ok());
        }
    }

    #[test]
    fn validate_rejects_zero_budget() {
        let o = ProcessingOptions {
            max_size_bytes: Some(0),
            ..Default::default()
        };
        assert!(o.validate().is_err());
    }

    #[test]
    fn default_limits() {
        let l = EncodingLimits::default();
        assert_eq!(l.quality_floor.fraction(), 0.5);
        assert_eq!(l.quality_step.fraction(), 0.05);
        assert_eq!(l.lossless_pixel_limit, 16_777_216);
        assert_eq!(l.large_image_quality.fraction(), 0.92);
        assert_eq!(l.max_canvas_side, 8192);
        assert!(l.validate().is_ok());
    }

    #[test]
    fn max_attempts_bound() {
        let l = EncodingLimits::default();
        // 1.0 → 0.5 in 0.05 steps: 10 reductions + the first encode
        assert_eq!(l.max_attempts(Quality::MAX), 11);
        assert_eq!(l.max_attempts(Quality(93)), 10);
        assert_eq!(l.max_attempts(Quality(50)), 1);
        assert_eq!(l.max_attempts(Quality(30)), 1);
    }

    #[test]
    fn zero_step_is_invalid() {
        let l = EncodingLimits {
            quality_step: Quality(0),
            ..Default::default()
        };
        assert!(l.validate().is_err());
    }

    #[test]
    fn canvas_limit_below_min_size_is_invalid() {
        let l = EncodingLimits {
            max_canvas_side: MIN_SIZE_LOWER - 1,
            ..Default::default()
        };
        assert!(l.validate().is_err());
    }
}
