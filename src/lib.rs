//! Spectraplane library - audio-reactive cover art visualizer
//!
//! Audio flows through an analyser tap, gets reduced to a handful of band
//! averages each frame and lands in the uniforms of a textured plane.

pub mod artwork;
pub mod audio;
pub mod bands;
pub mod cli;
pub mod error;
pub mod logging;
pub mod params;
pub mod render_loop;
pub mod rendering;
pub mod uniforms;
