//! Named shader uniforms and the bridge that publishes band values into them.

use bytemuck::{Pod, Zeroable};

use crate::bands::BandVector;
use crate::params::BandLayout;

pub const TEXTURE_SLOT: &str = "u_texture";
pub const INTENSITY_SLOT: &str = "u_intensity";
pub const TIME_SLOT: &str = "u_time";

/// Scalar block uploaded to the GPU each frame
///
/// Band slots fill `freq` in band order; the single-band shader reads
/// `freq[0]` as `u_freq`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShaderParams {
    pub freq: [f32; 5],
    pub intensity: f32,
    pub time: f32,
    pub _padding: f32,
}

/// CPU-side scalar uniforms of the plane material, addressed by name
#[derive(Debug, Clone)]
pub struct UniformSet {
    band_names: &'static [&'static str],
    bands: [f32; 5],
    intensity: f32,
    time: f32,
}

impl UniformSet {
    /// All band slots start at 0
    pub fn new(layout: BandLayout, intensity: f32) -> Self {
        Self {
            band_names: layout.uniform_names(),
            bands: [0.0; 5],
            intensity,
            time: 0.0,
        }
    }

    /// Write a scalar slot; unknown names are ignored and return `false`
    pub fn set(&mut self, name: &str, value: f32) -> bool {
        if let Some(index) = self.band_names.iter().position(|&n| n == name) {
            self.bands[index] = value;
            return true;
        }
        match name {
            INTENSITY_SLOT => self.intensity = value,
            TIME_SLOT => self.time = value,
            _ => return false,
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        if let Some(index) = self.band_names.iter().position(|&n| n == name) {
            return Some(self.bands[index]);
        }
        match name {
            INTENSITY_SLOT => Some(self.intensity),
            TIME_SLOT => Some(self.time),
            _ => None,
        }
    }

    pub fn to_shader_params(&self) -> ShaderParams {
        ShaderParams {
            freq: self.bands,
            intensity: self.intensity,
            time: self.time,
            _padding: 0.0,
        }
    }
}

/// Writes band averages into `u_freq*` slots
#[derive(Debug, Clone)]
pub struct UniformBridge {
    names: &'static [&'static str],
}

impl UniformBridge {
    pub fn new(layout: BandLayout) -> Self {
        Self {
            names: layout.uniform_names(),
        }
    }

    /// Publish `bands` in band order; a missing target skips the write
    pub fn publish(&self, bands: &BandVector, target: Option<&mut UniformSet>) {
        let Some(target) = target else {
            return;
        };
        for (name, &value) in self.names.iter().zip(bands.as_slice()) {
            target.set(name, value);
        }
    }
}
