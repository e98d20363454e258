//! Playback graph: source → output device, with the spectrum tap on the output.
//!
//! An [`AudioContext`] owns one graph and the output stream pulling from it.
//! The graph renders interleaved samples on demand, so the same code path
//! serves the cpal callback and headless pulls.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::analyser::SpectrumTap;
use super::decoder::Pcm;
use super::session::SourceBuffer;
use crate::error::AudioError;
use crate::params::AnalyserConfig;

/// Where rendered audio goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputBackend {
    /// Default output device of the default cpal host
    Device,

    /// No device; the graph is pulled manually via [`AudioGraph::render`]
    Null { sample_rate: u32, channels: u16 },
}

#[derive(Default)]
struct Transport {
    source: Option<Arc<SourceBuffer>>,
    /// Read position in source frames (fractional when rates differ)
    position: f64,
    playing: bool,
}

/// Source playback plus the tap it feeds
pub struct AudioGraph {
    sample_rate: u32,
    channels: u16,
    transport: Mutex<Transport>,
    tap: Arc<SpectrumTap>,
}

impl AudioGraph {
    pub fn new(sample_rate: u32, channels: u16, tap: Arc<SpectrumTap>) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
            transport: Mutex::new(Transport::default()),
            tap,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn tap(&self) -> &Arc<SpectrumTap> {
        &self.tap
    }

    /// Swap the bound source; playback pauses at position 0
    pub fn bind(&self, source: Option<Arc<SourceBuffer>>) {
        let mut transport = self.transport.lock();
        transport.source = source;
        transport.position = 0.0;
        transport.playing = false;
    }

    /// Start or resume; a source that already played to its end restarts from 0
    pub fn start(&self) {
        let mut transport = self.transport.lock();
        let at_end = transport
            .source
            .as_ref()
            .and_then(|s| s.pcm())
            .is_some_and(|pcm| transport.position >= pcm.frames() as f64);
        if at_end {
            transport.position = 0.0;
        }
        transport.playing = true;
    }

    /// Pause and rewind to the start
    pub fn halt(&self) {
        let mut transport = self.transport.lock();
        transport.playing = false;
        transport.position = 0.0;
    }

    pub fn is_playing(&self) -> bool {
        self.transport.lock().playing
    }

    pub fn position_secs(&self) -> f32 {
        let transport = self.transport.lock();
        match transport.source.as_ref().and_then(|s| s.pcm()) {
            Some(pcm) => (transport.position / pcm.sample_rate.max(1) as f64) as f32,
            None => 0.0,
        }
    }

    /// Fill `out` with interleaved output samples and feed them to the tap
    ///
    /// Paused, unbound or still-decoding sources render silence. Reaching the
    /// end of the source stops the transport and holds the end position.
    pub fn render(&self, out: &mut [f32]) {
        let channels = self.channels as usize;
        out.fill(0.0);
        {
            let mut guard = self.transport.lock();
            let transport = &mut *guard;
            if transport.playing {
                if let Some(pcm) = transport.source.as_ref().and_then(|s| s.pcm()) {
                    let step = pcm.sample_rate as f64 / self.sample_rate as f64;
                    if render_pcm(pcm, &mut transport.position, step, out, channels) {
                        transport.playing = false;
                        debug!("Playback reached end of source");
                    }
                }
            }
        }
        self.tap.write_interleaved(out, channels);
    }
}

/// Resample `pcm` from `position` into `out`; returns true once the source is exhausted
fn render_pcm(pcm: &Pcm, position: &mut f64, step: f64, out: &mut [f32], channels: usize) -> bool {
    let src_channels = pcm.channels.max(1) as usize;
    let frames = pcm.frames();

    for frame in out.chunks_exact_mut(channels) {
        let index = *position as usize;
        if index >= frames {
            return true;
        }
        let next = (index + 1).min(frames - 1);
        let frac = (*position - index as f64) as f32;

        for (channel, sample) in frame.iter_mut().enumerate() {
            let src = channel.min(src_channels - 1);
            let a = pcm.samples[index * src_channels + src];
            let b = pcm.samples[next * src_channels + src];
            *sample = a + (b - a) * frac;
        }
        *position += step;
    }

    *position >= frames as f64
}

/// A running graph and the stream that keeps it audible
pub struct AudioContext {
    graph: Arc<AudioGraph>,
    _stream: Option<cpal::Stream>,
}

impl AudioContext {
    /// Build a graph with a fresh tap and open the output for `backend`
    pub fn open(backend: &OutputBackend, analyser: &AnalyserConfig) -> Result<Self, AudioError> {
        let tap = Arc::new(SpectrumTap::new(analyser.clone())?);
        match backend {
            OutputBackend::Null {
                sample_rate,
                channels,
            } => Ok(Self {
                graph: Arc::new(AudioGraph::new(*sample_rate, *channels, tap)),
                _stream: None,
            }),
            OutputBackend::Device => open_device(tap),
        }
    }

    pub fn graph(&self) -> &Arc<AudioGraph> {
        &self.graph
    }
}

fn open_device(tap: Arc<SpectrumTap>) -> Result<AudioContext, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;

    let supported = device.default_output_config()?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    info!(
        "Audio: {} @ {}Hz x{}",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        config.sample_rate.0,
        config.channels
    );

    let graph = Arc::new(AudioGraph::new(config.sample_rate.0, config.channels, tap));
    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, Arc::clone(&graph))?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, Arc::clone(&graph))?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, Arc::clone(&graph))?,
        other => return Err(AudioError::UnsupportedSampleFormat(format!("{other:?}"))),
    };
    stream.play()?;

    Ok(AudioContext {
        graph,
        _stream: Some(stream),
    })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: Arc<AudioGraph>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut mix = Vec::<f32>::new();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            mix.resize(data.len(), 0.0);
            graph.render(&mut mix);
            for (dst, &src) in data.iter_mut().zip(&mix) {
                *dst = T::from_sample(src);
            }
        },
        |err| warn!("Audio stream error: {}", err),
        None,
    )?;
    Ok(stream)
}
