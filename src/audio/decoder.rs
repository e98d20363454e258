//! In-memory audio decoding to interleaved f32 PCM.

use std::io::Cursor;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::AudioError;

/// Most interleaved samples kept per file (512 MiB of f32, ~23 min of 48 kHz stereo)
pub const MAX_DECODED_SAMPLES: usize = 1 << 27;

/// Decoded audio at its native rate and channel count
#[derive(Debug, Clone)]
pub struct Pcm {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples, `frames() * channels` long
    pub samples: Vec<f32>,
}

impl Pcm {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate.max(1) as f32
    }
}

/// Decode a whole file held in memory
///
/// `extension` is only a probing hint; the container is sniffed either way.
/// The whole track is held as f32 PCM, so anything past
/// [`MAX_DECODED_SAMPLES`] is dropped with a warning.
pub fn decode(bytes: Arc<[u8]>, extension: Option<&str>) -> Result<Pcm, AudioError> {
    decode_limited(bytes, extension, MAX_DECODED_SAMPLES)
}

fn decode_limited(
    bytes: Arc<[u8]>,
    extension: Option<&str>,
    max_samples: usize,
) -> Result<Pcm, AudioError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoTrack)?;
    let track_id = track.id;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);
    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt frames are skipped, the rest of the stream still plays
                warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;

        let needed = decoded.capacity() * spec.channels.count();
        if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            let room = max_samples - samples.len();
            if buf.samples().len() > room {
                // Keep whole frames only
                let keep = room - room % spec.channels.count().max(1);
                samples.extend_from_slice(&buf.samples()[..keep]);
                warn!("Audio truncated at {} samples", samples.len());
                break;
            }
            samples.extend_from_slice(buf.samples());
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(AudioError::NoTrack);
    }

    let pcm = Pcm {
        sample_rate,
        channels,
        samples,
    };
    debug!(
        "Decoded {} frames @ {}Hz x{} ({:.1}s)",
        pcm.frames(),
        pcm.sample_rate,
        pcm.channels,
        pcm.duration_secs()
    );
    Ok(pcm)
}
