//! Spectrum analysis configuration and band layouts.

use crate::error::AudioError;

/// Spectrum tap configuration (mirrors a browser analyser node)
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyserConfig {
    /// FFT window size in samples (power of 2, 32..=32768)
    /// Frames produced by the tap are `fft_size / 2` bins long.
    pub fft_size: usize,

    /// Magnitude mapped to byte 0 (dBFS)
    pub min_decibels: f32,

    /// Magnitude mapped to byte 255 (dBFS)
    pub max_decibels: f32,

    /// Weight of the previous frame when smoothing magnitudes over time (0..=1)
    pub smoothing_time_constant: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            min_decibels: -90.0,
            max_decibels: -10.0,
            smoothing_time_constant: 0.8,
        }
    }
}

impl AnalyserConfig {
    /// Number of bins in every frame produced with this configuration
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, dB range ordered, etc.)
    pub fn validate(&self) -> Result<(), AudioError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(AudioError::InvalidConfig(format!(
                "FFT size must be a power of 2 in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(self.min_decibels < self.max_decibels) {
            return Err(AudioError::InvalidConfig(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(AudioError::InvalidConfig(format!(
                "smoothing time constant must be in 0..=1, got {}",
                self.smoothing_time_constant
            )));
        }
        Ok(())
    }
}

/// How many band scalars the shader consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandLayout {
    /// Five radial rings, `u_freq0..u_freq4`
    #[default]
    Five,

    /// One overall energy value, `u_freq`
    Single,
}

const FIVE_BAND_NAMES: [&str; 5] = ["u_freq0", "u_freq1", "u_freq2", "u_freq3", "u_freq4"];
const SINGLE_BAND_NAMES: [&str; 1] = ["u_freq"];

impl BandLayout {
    pub fn band_count(self) -> usize {
        self.uniform_names().len()
    }

    /// Uniform slot names in band order (lowest frequency first)
    pub fn uniform_names(self) -> &'static [&'static str] {
        match self {
            Self::Five => &FIVE_BAND_NAMES,
            Self::Single => &SINGLE_BAND_NAMES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_analyser_config() {
        let config = AnalyserConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.frequency_bin_count(), 128);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AnalyserConfig::default();
        config.fft_size = 300;
        assert!(config.validate().is_err());

        let mut config = AnalyserConfig::default();
        config.fft_size = 16;
        assert!(config.validate().is_err());

        let mut config = AnalyserConfig::default();
        config.min_decibels = -10.0;
        config.max_decibels = -90.0;
        assert!(config.validate().is_err());

        let mut config = AnalyserConfig::default();
        config.smoothing_time_constant = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_band_layout_names() {
        assert_eq!(BandLayout::Five.band_count(), 5);
        assert_eq!(BandLayout::Five.uniform_names()[4], "u_freq4");
        assert_eq!(BandLayout::Single.uniform_names(), &["u_freq"]);
    }
}
