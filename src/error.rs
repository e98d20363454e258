//! Error types for the audio and rendering halves of the visualizer.

use thiserror::Error;

/// Audio device, decoding and configuration failures
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Invalid audio config: {0}")]
    InvalidConfig(String),

    #[error("No audio output device found")]
    NoOutputDevice,

    #[error("Failed to query output config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Unsupported output sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Failed to read audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode audio: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("Audio file contains no decodable track")]
    NoTrack,
}

/// GPU setup and texture failures
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("Failed to find suitable GPU adapter")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("Failed to load texture: {0}")]
    Texture(#[from] image::ImageError),
}
