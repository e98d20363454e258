//! Audio playback and spectrum analysis.
//!
//! Plays a decoded file through the output device and taps the output
//! for byte-scaled frequency spectra read by the render loop.

mod analyser;
mod decoder;
mod graph;
mod playback;
mod session;
mod source;

// Re-export public types
pub use analyser::{blackman_window, SpectrumFrame, SpectrumTap};
pub use decoder::{decode, Pcm};
pub use graph::{AudioContext, AudioGraph, OutputBackend};
pub use playback::{ControlStatus, PlaybackController, PlaybackState};
pub use session::{AudioFile, AudioSession, SourceBuffer, SourceRegistry, SourceStatus, SourceUrl};
pub use source::{SpectrumSource, TapSlot};
