//! Parameter definitions with units and documented semantics.
//!
//! All tunables live here with:
//! - Units (decibels, pixels, degrees, world units)
//! - Documented ranges and meanings
//! - A `Default` matching the reference look of the visualizer

mod audio;
mod render;

// Re-export all types
pub use audio::{AnalyserConfig, BandLayout};
pub use render::RenderConfig;
