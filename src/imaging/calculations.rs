//! Pure calculation functions for canvas geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Resolve the size the subject is drawn at.
///
/// Keeps the source size when `preserve_original` is set and both sides
/// already reach `min_size`. Otherwise scales so the shorter side equals
/// `min_size`, preserving aspect ratio (up or down).
///
/// # Examples
/// ```
/// # use instaframe::imaging::resolve_dimensions;
/// // Height is below the minimum, so the image is scaled up
/// assert_eq!(resolve_dimensions((2000, 1000), 1080, true), (2160, 1080));
///
/// // Already large enough on both axes: kept as-is
/// assert_eq!(resolve_dimensions((3000, 2000), 1080, true), (3000, 2000));
/// ```
pub fn resolve_dimensions(source: (u32, u32), min_size: u32, preserve_original: bool) -> (u32, u32) {
    let (src_w, src_h) = source;

    if preserve_original && src_w >= min_size && src_h >= min_size {
        return (src_w, src_h);
    }

    let aspect = src_w as f64 / src_h as f64;
    if aspect > 1.0 {
        // Landscape: height is the short edge
        let w = (min_size as f64 * aspect).round() as u32;
        (w, min_size)
    } else {
        // Portrait or square: width is the short edge
        let h = (min_size as f64 / aspect).round() as u32;
        (min_size, h)
    }
}

/// Side length of the square canvas holding a subject of `dims`.
pub fn canvas_side(dims: (u32, u32)) -> u32 {
    dims.0.max(dims.1)
}

/// Top-left position that centers `subject` on a square canvas of `side`.
pub fn centered_offset(side: u32, subject: (u32, u32)) -> (u32, u32) {
    (
        side.saturating_sub(subject.0) / 2,
        side.saturating_sub(subject.1) / 2,
    )
}

/// Blur radius as a fraction of the canvas side, so effects look the same
/// at every output resolution.
pub fn proportional_radius(side: u32, ratio: f32) -> u32 {
    (side as f32 * ratio).round() as u32
}

/// Downscale factor for running a blur on a working copy no larger than
/// `work_side`. Returns 1.0 when the canvas is already small enough.
pub fn blur_work_scale(side: u32, work_side: u32) -> f32 {
    if side <= work_side || work_side == 0 {
        1.0
    } else {
        side as f32 / work_side as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // resolve_dimensions tests
    // =========================================================================

    #[test]
    fn landscape_below_minimum_scales_height() {
        // 2000x1000 with height < 1080: scale so height = 1080
        assert_eq!(resolve_dimensions((2000, 1000), 1080, true), (2160, 1080));
    }

    #[test]
    fn small_square_upscales() {
        assert_eq!(resolve_dimensions((500, 500), 1080, true), (1080, 1080));
    }

    #[test]
    fn large_source_preserved() {
        assert_eq!(resolve_dimensions((1200, 800), 800, true), (1200, 800));
        assert_eq!(resolve_dimensions((1080, 1080), 1080, true), (1080, 1080));
    }

    #[test]
    fn large_source_downscaled_without_preserve() {
        // 4000x3000 → height 1080, width 1440
        assert_eq!(resolve_dimensions((4000, 3000), 1080, false), (1440, 1080));
    }

    #[test]
    fn portrait_scales_width() {
        // 600x900 (2:3) → width 1080, height 1620
        assert_eq!(resolve_dimensions((600, 900), 1080, true), (1080, 1620));
    }

    #[test]
    fn rounding_applies_to_long_side() {
        // 1000x333 aspect ≈ 3.003 → 1080 * 3.003 = 3243.24
        assert_eq!(resolve_dimensions((1000, 333), 1080, false), (3243, 1080));
    }

    #[test]
    fn one_pixel_sources() {
        assert_eq!(resolve_dimensions((1, 1), 320, true), (320, 320));
        assert_eq!(resolve_dimensions((2, 1), 320, true), (640, 320));
    }

    // =========================================================================
    // canvas / offset tests
    // =========================================================================

    #[test]
    fn canvas_side_is_longer_edge() {
        assert_eq!(canvas_side((2160, 1080)), 2160);
        assert_eq!(canvas_side((1080, 1620)), 1620);
        assert_eq!(canvas_side((1080, 1080)), 1080);
    }

    #[test]
    fn offsets_center_landscape() {
        assert_eq!(centered_offset(2160, (2160, 1080)), (0, 540));
    }

    #[test]
    fn offsets_center_portrait() {
        assert_eq!(centered_offset(1620, (1080, 1620)), (270, 0));
    }

    #[test]
    fn square_subject_has_no_offset() {
        assert_eq!(centered_offset(1080, (1080, 1080)), (0, 0));
    }

    #[test]
    fn odd_padding_rounds_down() {
        assert_eq!(centered_offset(1001, (1001, 500)), (0, 250));
    }

    // =========================================================================
    // blur helpers
    // =========================================================================

    #[test]
    fn shadow_radii_scale_with_canvas() {
        assert_eq!(proportional_radius(1080, 0.03), 32);
        assert_eq!(proportional_radius(1080, 0.02), 22);
        assert_eq!(proportional_radius(2160, 0.03), 65);
    }

    #[test]
    fn work_scale_only_shrinks() {
        assert_eq!(blur_work_scale(200, 256), 1.0);
        assert_eq!(blur_work_scale(1024, 256), 4.0);
    }
}
