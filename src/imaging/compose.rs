//! Composition plans: the ordered draw commands that build a canvas.
//!
//! A [`CompositionPlan`] is computed from the source size and the
//! [`ProcessingOptions`] before any pixel is touched. Backends replay the
//! commands in order onto a fresh canvas, so nothing like a canvas
//! context's mutable shadow/fill state can leak between steps or between
//! concurrently processed images.
//!
//! ```text
//! solid, shadow on       blurred, shadow off
//! ─────────────────      ───────────────────
//! Fill(white)            Backdrop { .. }
//! Shadow (ambient)       Subject
//! Shadow (core)
//! Shadow (lift)
//! Subject
//! ```

use super::calculations::{canvas_side, centered_offset, proportional_radius, resolve_dimensions};
use super::params::{BackgroundType, ProcessingOptions};

/// Solid background color.
pub const BACKGROUND_WHITE: [u8; 3] = [255, 255, 255];

/// Backdrop blur radius relative to the canvas side.
pub const BACKDROP_BLUR_RATIO: f32 = 0.05;

/// Opacity of the black overlay darkening the blurred backdrop.
pub const BACKDROP_OVERLAY_ALPHA: f32 = 0.15;

/// One pass of the layered drop shadow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowLayer {
    /// Blur radius relative to the canvas side.
    pub blur_ratio: f32,
    /// Opacity of the black shadow color.
    pub alpha: f32,
}

/// Ambient halo, core shadow and lift pass, drawn in this order.
pub const SHADOW_LAYERS: [ShadowLayer; 3] = [
    ShadowLayer {
        blur_ratio: 0.03,
        alpha: 0.25,
    },
    ShadowLayer {
        blur_ratio: 0.02,
        alpha: 0.60,
    },
    ShadowLayer {
        blur_ratio: 0.02,
        alpha: 0.18,
    },
];

/// A single step of canvas construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// Paint the whole canvas with an opaque color.
    Fill([u8; 3]),
    /// Cover the canvas with a blurred copy of the source, then darken it.
    Backdrop {
        blur_radius: u32,
        overlay_alpha: f32,
    },
    /// Black soft shadow shaped like the subject, at the subject's position.
    Shadow { blur_radius: u32, alpha: f32 },
    /// The subject itself, sharp, scaled to the planned size.
    Subject,
}

/// Geometry plus draw commands for one canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    pub canvas_side: u32,
    /// Size the subject is drawn at.
    pub subject_width: u32,
    pub subject_height: u32,
    /// Subject top-left corner, shared by every command.
    pub offset_x: u32,
    pub offset_y: u32,
    pub commands: Vec<DrawCommand>,
}

impl CompositionPlan {
    pub fn subject_dimensions(&self) -> (u32, u32) {
        (self.subject_width, self.subject_height)
    }

    /// Number of shadow passes in the plan.
    pub fn shadow_passes(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Shadow { .. }))
            .count()
    }
}

/// Build the composition plan for a source of `source` dimensions.
pub fn plan_composition(source: (u32, u32), options: &ProcessingOptions) -> CompositionPlan {
    let (subject_width, subject_height) =
        resolve_dimensions(source, options.min_size, options.preserve_original_size);
    let side = canvas_side((subject_width, subject_height));
    let (offset_x, offset_y) = centered_offset(side, (subject_width, subject_height));

    let mut commands = Vec::with_capacity(2 + SHADOW_LAYERS.len());

    commands.push(match options.background {
        BackgroundType::Solid => DrawCommand::Fill(BACKGROUND_WHITE),
        BackgroundType::Blurred => DrawCommand::Backdrop {
            blur_radius: proportional_radius(side, BACKDROP_BLUR_RATIO),
            overlay_alpha: BACKDROP_OVERLAY_ALPHA,
        },
    });

    if options.enable_shadow {
        commands.extend(SHADOW_LAYERS.iter().map(|layer| DrawCommand::Shadow {
            blur_radius: proportional_radius(side, layer.blur_ratio),
            alpha: layer.alpha,
        }));
    }

    commands.push(DrawCommand::Subject);

    CompositionPlan {
        canvas_side: side,
        subject_width,
        subject_height,
        offset_x,
        offset_y,
        commands,
    }
}
