//! Spectrum tap: a rolling time-domain window with byte-scaled FFT magnitudes.
//!
//! The audio thread writes output samples in, the render thread reads
//! spectrum frames out. Both sides only hold a lock long enough to copy
//! one window of samples.

use parking_lot::Mutex;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::error::AudioError;
use crate::params::AnalyserConfig;

/// Instantaneous frequency-magnitude snapshot, one byte per bin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpectrumFrame(Vec<u8>);

impl SpectrumFrame {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SpectrumFrame {
    fn from(bins: Vec<u8>) -> Self {
        Self(bins)
    }
}

/// Ring of the most recent `fft_size` mono samples
struct SampleWindow {
    samples: Vec<f32>,
    write: usize,
}

impl SampleWindow {
    fn new(size: usize) -> Self {
        Self {
            samples: vec![0.0; size],
            write: 0,
        }
    }

    fn push(&mut self, sample: f32) {
        self.samples[self.write] = sample;
        self.write = (self.write + 1) % self.samples.len();
    }

    /// Copy the window oldest-first into `out` (same length)
    fn copy_ordered(&self, out: &mut [f32]) {
        let (newer, older) = self.samples.split_at(self.write);
        out[..older.len()].copy_from_slice(older);
        out[older.len()..].copy_from_slice(newer);
    }
}

/// Scratch buffers and smoothing history owned by the reader side
struct AnalysisState {
    window: Vec<f32>,
    time_domain: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

/// Live analysis endpoint of the playback graph
pub struct SpectrumTap {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    input: Mutex<SampleWindow>,
    analysis: Mutex<AnalysisState>,
}

impl SpectrumTap {
    /// Create a tap with a fixed configuration
    pub fn new(config: AnalyserConfig) -> Result<Self, AudioError> {
        config.validate()?;

        let size = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(size);
        let scratch_len = fft.get_inplace_scratch_len();

        let analysis = AnalysisState {
            window: (0..size).map(|i| blackman_window(i, size)).collect(),
            time_domain: vec![0.0; size],
            spectrum: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            smoothed: vec![0.0; config.frequency_bin_count()],
        };

        Ok(Self {
            input: Mutex::new(SampleWindow::new(size)),
            analysis: Mutex::new(analysis),
            fft,
            config,
        })
    }

    /// Frame length produced by this tap, fixed for its lifetime
    pub fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    /// Feed interleaved output samples, down-mixed to mono by averaging channels
    pub fn write_interleaved(&self, data: &[f32], channels: usize) {
        let channels = channels.max(1);
        let scale = 1.0 / channels as f32;
        let mut window = self.input.lock();
        for frame in data.chunks_exact(channels) {
            window.push(frame.iter().sum::<f32>() * scale);
        }
    }

    /// Compute the current byte spectrum into `frame`
    ///
    /// Blackman window → FFT → |X| / N → temporal smoothing → dB → byte scale.
    /// Reading does not consume samples; two reads in a row see the same window.
    pub fn byte_frequency_data(&self, frame: &mut SpectrumFrame) {
        let bins = self.frequency_bin_count();
        let size = self.config.fft_size;
        let tau = self.config.smoothing_time_constant;
        let min_db = self.config.min_decibels;
        let range_scale = 255.0 / (self.config.max_decibels - min_db);

        let mut state = self.analysis.lock();
        let state = &mut *state;

        self.input.lock().copy_ordered(&mut state.time_domain);

        for ((dst, &sample), &w) in state
            .spectrum
            .iter_mut()
            .zip(&state.time_domain)
            .zip(&state.window)
        {
            *dst = Complex::new(sample * w, 0.0);
        }

        self.fft
            .process_with_scratch(&mut state.spectrum, &mut state.scratch);

        frame.0.resize(bins, 0);
        let norm = 1.0 / size as f32;
        for ((out, smoothed), bin) in frame
            .0
            .iter_mut()
            .zip(state.smoothed.iter_mut())
            .zip(&state.spectrum)
        {
            let magnitude = bin.norm() * norm;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
            *out = magnitude_to_byte(*smoothed, min_db, range_scale);
        }
    }
}

/// Map a linear magnitude onto 0..=255 across the configured dB range
fn magnitude_to_byte(magnitude: f32, min_db: f32, range_scale: f32) -> u8 {
    if !(magnitude > 0.0) {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    (range_scale * (db - min_db)).floor().clamp(0.0, 255.0) as u8
}

/// Blackman window (a0 = 0.42, a1 = 0.5, a2 = 0.08)
pub fn blackman_window(index: usize, size: usize) -> f32 {
    let x = index as f32 / size as f32;
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}
