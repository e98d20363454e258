//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use crate::params::{AnalyserConfig, BandLayout, RenderConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Spectraplane")]
#[command(about = "Audio-reactive visualizer that warps cover art to the music", long_about = None)]
pub struct Args {
    /// Audio file to load at startup (drop files on the window to switch)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Band layout: five (default) or single
    #[arg(long, value_name = "LAYOUT", default_value = "five")]
    pub bands: String,

    /// Analyser FFT window (power of two, 32..=32768)
    #[arg(long, value_name = "SAMPLES", default_value = "256")]
    pub fft_size: usize,

    /// Magnitude mapped to byte 0 (dB)
    #[arg(long, value_name = "DB", default_value = "-90", allow_hyphen_values = true)]
    pub min_db: f32,

    /// Magnitude mapped to byte 255 (dB)
    #[arg(long, value_name = "DB", default_value = "-10", allow_hyphen_values = true)]
    pub max_db: f32,

    /// Analyser smoothing time constant (0..=1)
    #[arg(long, value_name = "TAU", default_value = "0.8")]
    pub smoothing: f32,

    /// Default texture shown when the file has no cover art
    #[arg(long, value_name = "IMAGE")]
    pub texture: Option<PathBuf>,

    /// Default log filter (overridden by RUST_LOG)
    #[arg(long, value_name = "FILTER", default_value = "info")]
    pub log_level: String,

    /// Window width (pixels)
    #[arg(long, value_name = "PX", default_value = "900")]
    pub width: u32,

    /// Window height (pixels)
    #[arg(long, value_name = "PX", default_value = "900")]
    pub height: u32,
}

impl Args {
    /// Parse band layout from command-line arguments
    pub fn parse_band_layout(&self) -> BandLayout {
        match self.bands.to_lowercase().as_str() {
            "five" | "5" => {
                info!("Bands: five (radial shader)");
                BandLayout::Five
            }
            "single" | "1" => {
                info!("Bands: single (ripple shader)");
                BandLayout::Single
            }
            other => {
                warn!("Unknown band layout '{}', using five", other);
                BandLayout::Five
            }
        }
    }

    /// Analyser settings; checked when the graph is built
    pub fn analyser_config(&self) -> AnalyserConfig {
        AnalyserConfig {
            fft_size: self.fft_size,
            min_decibels: self.min_db,
            max_decibels: self.max_db,
            smoothing_time_constant: self.smoothing,
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            window_width: self.width,
            window_height: self.height,
            ..RenderConfig::default()
        }
    }
}
