//! Pure Rust backend on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with format sniffing |
//! | Subject scaling | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Backdrop | `resize_to_fill` + `imageops::blur` on a reduced working copy |
//! | Shadow layers | alpha mask + `imageops::blur` + `imageops::overlay` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//!
//! Blurs run on a copy whose side is at most [`BLUR_WORK_SIDE`] pixels with
//! the sigma scaled to match, then get upscaled. A 60 px Gaussian on a
//! 4000 px canvas costs the same as a 4 px one on 256 px, and the result
//! is visually identical for soft halos and backdrops.

use super::backend::{BackendError, Canvas, Encoding, ImageBackend, SourceImage};
use super::calculations::blur_work_scale;
use super::compose::{CompositionPlan, DrawCommand};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::LazyLock;

/// Longest side of the working copy used for blurs.
pub const BLUR_WORK_SIDE: u32 = 256;

const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Side of the working copy for a canvas of `side`, and the scale back up.
fn work_geometry(side: u32) -> (u32, f32) {
    let scale = blur_work_scale(side, BLUR_WORK_SIDE);
    let work_side = ((side as f32 / scale).round() as u32).max(1);
    (work_side, scale)
}

/// Canvas `shadowBlur` convention: the Gaussian sigma is half the radius.
fn work_sigma(blur_radius: u32, scale: f32) -> f32 {
    blur_radius as f32 / 2.0 / scale
}

fn blur_and_upscale(work: RgbaImage, sigma: f32, side: u32) -> RgbaImage {
    let blurred = if sigma > 0.0 {
        imageops::blur(&work, sigma)
    } else {
        work
    };
    if blurred.width() == side {
        blurred
    } else {
        imageops::resize(&blurred, side, side, FilterType::Triangle)
    }
}

fn fill(canvas: &mut RgbaImage, rgb: [u8; 3]) {
    let color = Rgba([rgb[0], rgb[1], rgb[2], 255]);
    for px in canvas.pixels_mut() {
        *px = color;
    }
}

/// Cover-scaled, blurred and darkened copy of the source.
fn blurred_backdrop(source: &DynamicImage, side: u32, blur_radius: u32, overlay_alpha: f32) -> RgbaImage {
    let (work_side, scale) = work_geometry(side);
    let mut work = source
        .resize_to_fill(work_side, work_side, FilterType::Triangle)
        .to_rgba8();

    let keep = 1.0 - overlay_alpha.clamp(0.0, 1.0);
    for px in work.pixels_mut() {
        for channel in &mut px.0[..3] {
            *channel = (f32::from(*channel) * keep).round() as u8;
        }
        px.0[3] = 255;
    }

    blur_and_upscale(work, work_sigma(blur_radius, scale), side)
}

/// Subject alpha, shrunk and positioned on a transparent working canvas.
fn shadow_mask(subject: &RgbaImage, plan: &CompositionPlan) -> (RgbaImage, f32) {
    let (work_side, scale) = work_geometry(plan.canvas_side);
    let mask_w = ((plan.subject_width as f32 / scale).round() as u32).clamp(1, work_side);
    let mask_h = ((plan.subject_height as f32 / scale).round() as u32).clamp(1, work_side);
    let shrunk = if (mask_w, mask_h) == subject.dimensions() {
        subject.clone()
    } else {
        imageops::resize(subject, mask_w, mask_h, FilterType::Triangle)
    };

    let ox = (plan.offset_x as f32 / scale).round() as u32;
    let oy = (plan.offset_y as f32 / scale).round() as u32;
    let mut mask = RgbaImage::new(work_side, work_side);
    for (x, y, px) in shrunk.enumerate_pixels() {
        let (mx, my) = (x + ox, y + oy);
        if mx < work_side && my < work_side {
            mask.put_pixel(mx, my, Rgba([0, 0, 0, px.0[3]]));
        }
    }
    (mask, scale)
}

/// One black soft-shadow pass at full canvas size.
fn shadow_layer(mask: &RgbaImage, scale: f32, side: u32, blur_radius: u32, alpha: f32) -> RgbaImage {
    let mut work = mask.clone();
    for px in work.pixels_mut() {
        px.0[3] = (f32::from(px.0[3]) * alpha).round() as u8;
    }
    blur_and_upscale(work, work_sigma(blur_radius, scale), side)
}

fn scale_subject(source: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    if (source.width(), source.height()) == (width, height) {
        source.to_rgba8()
    } else {
        source
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgba8()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8], file_name: &str) -> Result<SourceImage, BackendError> {
        // The reader borrows `bytes` and is consumed by `decode`, so it is
        // released on every return path.
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(format!("{file_name}: {e}")))?;
        if reader.format().is_none() {
            return Err(BackendError::Decode(format!(
                "{file_name}: unrecognized image format"
            )));
        }
        let pixels = reader
            .decode()
            .map_err(|e| BackendError::Decode(format!("{file_name}: {e}")))?;

        SourceImage::new(pixels, bytes.len() as u64, file_name)
            .ok_or_else(|| BackendError::Decode(format!("{file_name}: image has no pixels")))
    }

    fn render(&self, source: &SourceImage, plan: &CompositionPlan) -> Result<Canvas, BackendError> {
        let side = plan.canvas_side;
        let subject = scale_subject(source.pixels(), plan.subject_width, plan.subject_height);
        let mut canvas = RgbaImage::new(side, side);
        let mut mask: Option<(RgbaImage, f32)> = None;

        for command in &plan.commands {
            match *command {
                DrawCommand::Fill(rgb) => fill(&mut canvas, rgb),
                DrawCommand::Backdrop {
                    blur_radius,
                    overlay_alpha,
                } => {
                    canvas = blurred_backdrop(source.pixels(), side, blur_radius, overlay_alpha);
                }
                DrawCommand::Shadow { blur_radius, alpha } => {
                    let (mask, scale) = mask.get_or_insert_with(|| shadow_mask(&subject, plan));
                    let layer = shadow_layer(mask, *scale, side, blur_radius, alpha);
                    imageops::overlay(&mut canvas, &layer, 0, 0);
                }
                DrawCommand::Subject => {
                    imageops::overlay(
                        &mut canvas,
                        &subject,
                        i64::from(plan.offset_x),
                        i64::from(plan.offset_y),
                    );
                }
            }
        }

        Canvas::new(DynamicImage::ImageRgba8(canvas).to_rgb8())
            .ok_or_else(|| BackendError::EncodeUnavailable("rendered canvas is not square".into()))
    }

    fn encode(&self, canvas: &Canvas, encoding: Encoding) -> Result<Vec<u8>, BackendError> {
        let pixels = canvas.pixels();
        let (w, h) = pixels.dimensions();
        let mut buf = Vec::new();

        let result = match encoding {
            Encoding::Png => {
                PngEncoder::new(&mut buf).write_image(pixels.as_raw(), w, h, ExtendedColorType::Rgb8)
            }
            Encoding::Jpeg(quality) => JpegEncoder::new_with_quality(&mut buf, quality.encoder_value())
                .write_image(pixels.as_raw(), w, h, ExtendedColorType::Rgb8),
        };
        result.map_err(|e| {
            BackendError::EncodeUnavailable(format!("{} encode failed: {e}", encoding.format()))
        })?;

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::compose::plan_composition;
    use crate::imaging::params::{BackgroundType, ProcessingOptions, Quality};
    use image::{Rgb, RgbImage};

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn source(img: DynamicImage) -> SourceImage {
        SourceImage::new(img, 0, "test.png").unwrap()
    }

    fn opts(background: BackgroundType, enable_shadow: bool) -> ProcessingOptions {
        ProcessingOptions {
            min_size: 320,
            background,
            enable_shadow,
            ..Default::default()
        }
    }

    #[test]
    fn decode_png_bytes() {
        let bytes = png_bytes(&solid(200, 150, [10, 20, 30]));
        let decoded = RustBackend::new().decode(&bytes, "a.png").unwrap();
        assert_eq!(decoded.width(), 200);
        assert_eq!(decoded.height(), 150);
        assert_eq!(decoded.byte_len(), bytes.len() as u64);
        assert_eq!(decoded.file_name(), "a.png");
    }

    #[test]
    fn decode_garbage_errors() {
        let result = RustBackend::new().decode(b"definitely not an image", "notes.txt");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn decode_truncated_png_errors() {
        let bytes = png_bytes(&solid(64, 64, [1, 2, 3]));
        let truncated = &bytes[..bytes.len() / 2];
        let result = RustBackend::new().decode(truncated, "cut.png");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn decode_empty_errors() {
        let result = RustBackend::new().decode(&[], "empty.jpg");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn render_solid_without_shadow() {
        // 40x20 red → subject 640x320 on a 640 canvas, offset y = 160
        let src = source(solid(40, 20, [255, 0, 0]));
        let plan = plan_composition((40, 20), &opts(BackgroundType::Solid, false));
        let canvas = RustBackend::new().render(&src, &plan).unwrap();

        assert_eq!(canvas.side(), 640);
        let px = canvas.pixels();
        assert_eq!(px.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(px.get_pixel(320, 157), &Rgb([255, 255, 255]));
        assert_eq!(px.get_pixel(320, 320), &Rgb([255, 0, 0]));
    }

    #[test]
    fn render_shadow_darkens_padding_near_subject() {
        let src = source(solid(40, 20, [255, 0, 0]));
        let plan = plan_composition((40, 20), &opts(BackgroundType::Solid, true));
        let canvas = RustBackend::new().render(&src, &plan).unwrap();

        let px = canvas.pixels();
        // Just above the subject's top edge: inside the halo
        let near = px.get_pixel(320, 157);
        assert!(near.0[0] < 240, "expected shadow near subject, got {near:?}");
        // Far corner is untouched
        assert_eq!(px.get_pixel(0, 0), &Rgb([255, 255, 255]));
        // Subject stays crisp
        assert_eq!(px.get_pixel(320, 320), &Rgb([255, 0, 0]));
    }

    #[test]
    fn render_blurred_backdrop_is_darkened() {
        let src = source(solid(40, 20, [255, 255, 255]));
        let plan = plan_composition((40, 20), &opts(BackgroundType::Blurred, false));
        let canvas = RustBackend::new().render(&src, &plan).unwrap();

        // White source under a 15% black overlay → about 217
        let corner = canvas.pixels().get_pixel(0, 0);
        for channel in corner.0 {
            assert!((210..=220).contains(&channel), "got {corner:?}");
        }
        assert_eq!(canvas.pixels().get_pixel(320, 320), &Rgb([255, 255, 255]));
    }

    #[test]
    fn encode_png_and_jpeg() {
        let canvas = Canvas::new(RgbImage::from_pixel(32, 32, Rgb([9, 9, 9]))).unwrap();
        let backend = RustBackend::new();

        let png = backend.encode(&canvas, Encoding::Png).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

        let jpeg = backend
            .encode(&canvas, Encoding::Jpeg(Quality::from_fraction(0.8).unwrap()))
            .unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn lower_quality_encodes_smaller() {
        let noisy = RgbImage::from_fn(128, 128, |x, y| {
            let v = (x.wrapping_mul(7919) ^ y.wrapping_mul(104_729)) as u8;
            Rgb([v, v.wrapping_mul(3), v.wrapping_add(91)])
        });
        let canvas = Canvas::new(noisy).unwrap();
        let backend = RustBackend::new();

        let high = backend
            .encode(&canvas, Encoding::Jpeg(Quality::MAX))
            .unwrap();
        let low = backend
            .encode(&canvas, Encoding::Jpeg(Quality::from_fraction(0.5).unwrap()))
            .unwrap();
        assert!(low.len() < high.len());
    }
}
