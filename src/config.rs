//! Formatter configuration module.
//!
//! Handles loading, validating, and merging `instaframe.toml`. Stock
//! defaults are serialized to a TOML value, the user file is merged over it
//! key by key, and the result is deserialized and validated.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! min_size = 1080                # Shorter side target, 320-2048 px
//! quality = 1.0                  # Starting JPEG quality, 0.0-1.0
//! size_limit = true              # false disables the size search (PNG output)
//! max_file_size_mb = 8.0         # Size budget in MiB
//! preserve_original_size = true  # Keep large sources at native resolution
//! shadow = true                  # Soft shadow under the photo
//! background = "solid"           # "solid" or "blurred"
//! file_prefix = "instagram-"     # Prepended to output file names
//!
//! [encoding]
//! quality_floor = 0.5            # Lowest quality the size search reaches
//! quality_step = 0.05            # Reduction per re-encode
//! lossless_pixel_limit = 16777216
//! large_image_quality = 0.92
//! max_canvas_side = 8192         # Larger canvases fail for that image
//!
//! [processing]
//! max_processes = 4              # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse, override just the values you want:
//!
//! ```toml
//! [output]
//! background = "blurred"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    BackgroundType, EncodingLimits, MIN_SIZE_LOWER, MIN_SIZE_UPPER, ProcessingOptions, Quality,
};
use crate::naming::DEFAULT_PREFIX;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "instaframe.toml";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Formatter configuration loaded from `instaframe.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatterConfig {
    /// What each formatted image looks like.
    pub output: OutputConfig,
    /// Size search tuning.
    pub encoding: EncodingConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl FormatterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let out = &self.output;
        if !(MIN_SIZE_LOWER..=MIN_SIZE_UPPER).contains(&out.min_size) {
            return Err(ConfigError::Validation(format!(
                "output.min_size must be {MIN_SIZE_LOWER}-{MIN_SIZE_UPPER}"
            )));
        }
        check_fraction("output.quality", out.quality)?;
        if !(out.max_file_size_mb.is_finite() && out.max_file_size_mb > 0.0) {
            return Err(ConfigError::Validation(
                "output.max_file_size_mb must be greater than 0".into(),
            ));
        }

        let enc = &self.encoding;
        check_fraction("encoding.quality_floor", enc.quality_floor)?;
        check_fraction("encoding.quality_step", enc.quality_step)?;
        check_fraction("encoding.large_image_quality", enc.large_image_quality)?;
        if enc.quality_floor <= 0.0 {
            return Err(ConfigError::Validation(
                "encoding.quality_floor must be greater than 0".into(),
            ));
        }
        if enc.quality_step < 0.01 {
            return Err(ConfigError::Validation(
                "encoding.quality_step must be at least 0.01".into(),
            ));
        }
        if enc.lossless_pixel_limit == 0 {
            return Err(ConfigError::Validation(
                "encoding.lossless_pixel_limit must be greater than 0".into(),
            ));
        }
        if enc.max_canvas_side < MIN_SIZE_LOWER {
            return Err(ConfigError::Validation(format!(
                "encoding.max_canvas_side must be at least {MIN_SIZE_LOWER}"
            )));
        }
        Ok(())
    }

    /// Per-image options described by the `[output]` section.
    pub fn to_processing_options(&self) -> ProcessingOptions {
        let out = &self.output;
        ProcessingOptions {
            min_size: out.min_size,
            quality: quality(out.quality),
            max_size_bytes: out
                .size_limit
                .then(|| mb_to_bytes(out.max_file_size_mb)),
            preserve_original_size: out.preserve_original_size,
            enable_shadow: out.shadow,
            background: out.background,
        }
    }

    /// Size search limits described by the `[encoding]` section.
    pub fn to_encoding_limits(&self) -> EncodingLimits {
        let enc = &self.encoding;
        EncodingLimits {
            quality_floor: quality(enc.quality_floor),
            quality_step: quality(enc.quality_step),
            lossless_pixel_limit: enc.lossless_pixel_limit,
            large_image_quality: quality(enc.large_image_quality),
            max_canvas_side: enc.max_canvas_side,
        }
    }
}

fn check_fraction(key: &str, value: f32) -> Result<(), ConfigError> {
    if Quality::from_fraction(value).is_none() {
        return Err(ConfigError::Validation(format!("{key} must be 0.0-1.0")));
    }
    Ok(())
}

// Only reached after validate(), which guarantees the range.
fn quality(value: f32) -> Quality {
    Quality::from_fraction(value).unwrap_or(Quality::MAX)
}

/// Convert a budget in MiB to bytes, the way the size search measures it.
pub fn mb_to_bytes(mb: f64) -> u64 {
    (mb * BYTES_PER_MB).floor() as u64
}

/// Per-image output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub min_size: u32,
    pub quality: f32,
    /// Run the size search against `max_file_size_mb`. When off, output
    /// is written without a budget.
    pub size_limit: bool,
    /// Size budget in MiB.
    pub max_file_size_mb: f64,
    pub preserve_original_size: bool,
    pub shadow: bool,
    pub background: BackgroundType,
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            min_size: 1080,
            quality: 1.0,
            size_limit: true,
            max_file_size_mb: 8.0,
            preserve_original_size: true,
            shadow: true,
            background: BackgroundType::Solid,
            file_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Size search tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    pub quality_floor: f32,
    pub quality_step: f32,
    /// Canvases with more pixels than this are never encoded as PNG.
    pub lossless_pixel_limit: u64,
    pub large_image_quality: f32,
    /// Largest canvas side rendered; bigger plans fail for that image.
    pub max_canvas_side: u32,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        let limits = EncodingLimits::default();
        Self {
            quality_floor: limits.quality_floor.fraction(),
            quality_step: limits.quality_step.fraction(),
            lossless_pixel_limit: limits.lossless_pixel_limit,
            large_image_quality: limits.large_image_quality.fraction(),
            max_canvas_side: limits.max_canvas_side,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Stock defaults as a TOML value, the base every user file merges onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(FormatterConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults: {e}")))
}

/// Deep-merge `overlay` into `base`. Tables merge key by key; any other
/// overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. A missing file is `None`.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge `overlay` onto `base`, deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<FormatterConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: FormatterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<FormatterConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Fully commented stock config, printed by `instaframe gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Instaframe Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The file is read from ./instaframe.toml unless --config points elsewhere.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Target for the shorter side, in pixels (320-2048). Smaller photos are
# scaled up so their shorter side reaches it.
min_size = 1080

# Starting JPEG quality (0.0-1.0) when a size budget is set.
quality = 1.0

# Lower JPEG quality until the file fits max_file_size_mb.
# Set to false to skip the size search and write PNG instead.
size_limit = true

# Size budget in MiB, used while size_limit is on.
max_file_size_mb = 8.0

# Keep photos that already reach min_size at their own resolution.
preserve_original_size = true

# Draw a soft shadow under the photo.
shadow = true

# Canvas background: "solid" (white) or "blurred" (blurred copy of the photo).
background = "solid"

# Prepended to every output file name.
file_prefix = "instagram-"

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# Lowest quality the size search will go to.
quality_floor = 0.5

# Amount quality drops per re-encode.
quality_step = 0.05

# Canvases with more pixels than this are written as JPEG even without a
# size budget.
lossless_pixel_limit = 16777216

# JPEG quality for those very large canvases.
large_image_quality = 0.92

# Largest canvas side, in pixels. Very thin strips scaled up to min_size
# would need enormous canvases; such images fail instead of being rendered.
max_canvas_side = 8192

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
