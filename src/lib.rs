//! # Instaframe
//!
//! Turns arbitrary photos into square, upload-ready images. The photo is
//! scaled so its shorter side reaches a minimum size, centered on a square
//! canvas over a white or blurred backdrop with an optional soft shadow, and
//! encoded as PNG or as JPEG under a byte budget.
//!
//! # Pipeline
//!
//! ```text
//! bytes → decode → resolve size → plan composition → render → encode (size search)
//! ```
//!
//! Each image is independent; a batch runs them on rayon's pool and returns
//! one outcome per input, in input order.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Dimension math, composition plans, the `image`-crate backend and the size-constrained encode |
//! | [`batch`] | Parallel formatting of many inputs with per-item errors and progress events |
//! | [`config`] | `instaframe.toml` loading, merging over stock defaults, validation |
//! | [`types`] | `ProcessedResult` and `OutputFormat`, shared by every layer |
//! | [`naming`] | Output file names (`instagram-` prefix, format extension) |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Plans Before Pixels
//!
//! Composition is described as an immutable list of draw commands
//! ([`imaging::plan_composition`]) before any pixel is touched. The geometry
//! and layer order are unit tested without decoding, and the backend just
//! replays the list.
//!
//! ## Quality In Whole Percent
//!
//! The size search lowers JPEG quality in steps of 0.05 down to 0.5. Quality
//! is held as an integer percentage so the sequence is exactly
//! 1.00, 0.95, ..., 0.50 and never slips below the floor.
//!
//! ## Index-Keyed Batches
//!
//! Results are associated with inputs by position, never by name or content,
//! so duplicates stay distinct and a failure only affects its own item.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod types;
