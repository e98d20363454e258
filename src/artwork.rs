//! Cover art: extraction from audio metadata and the texture it replaces.

use std::io::Cursor;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use image::{imageops::FilterType, DynamicImage, ImageFormat, Rgba, RgbaImage};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{Limit, MetadataOptions, MetadataRevision};
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::AudioFile;
use crate::error::RenderError;

/// Largest texture edge uploaded to the GPU (default wgpu limit)
pub const MAX_TEXTURE_DIM: u32 = 8192;

/// Largest embedded picture read from a file (bytes)
const MAX_VISUAL_BYTES: usize = 16 * 1024 * 1024;

/// Embedded picture as found in the audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub mime_format: String,
    pub bytes: Vec<u8>,
}

/// First embedded picture of an audio file, if any
///
/// Probe errors are treated the same as a file without art.
pub fn extract_cover_art(file: &AudioFile) -> Option<CoverArt> {
    let mss = MediaSourceStream::new(
        Box::new(Cursor::new(file.bytes().clone())),
        Default::default(),
    );
    let mut hint = Hint::new();
    if let Some(ext) = file.extension() {
        hint.with_extension(ext);
    }
    let meta_opts = MetadataOptions {
        limit_visual_bytes: Limit::Maximum(MAX_VISUAL_BYTES),
        ..Default::default()
    };

    let mut probed = match symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &meta_opts,
    ) {
        Ok(probed) => probed,
        Err(e) => {
            debug!("No metadata for '{}': {}", file.name(), e);
            return None;
        }
    };

    let from_revision = |rev: &MetadataRevision| {
        rev.visuals().first().map(|visual| CoverArt {
            mime_format: visual.media_type.clone(),
            bytes: visual.data.to_vec(),
        })
    };

    // Container-level tags (e.g. MP4 atoms) first, then tags read while probing (ID3v2)
    let art = probed
        .format
        .metadata()
        .current()
        .and_then(from_revision);
    art.or_else(|| {
        probed
            .metadata
            .get()
            .as_ref()
            .and_then(|m| m.current())
            .and_then(from_revision)
    })
}

/// Extract cover art on a worker thread, tagged with the load generation
fn spawn_extraction(
    file: AudioFile,
    generation: u64,
    results: Sender<(u64, Option<CoverArt>)>,
) {
    let spawned = thread::Builder::new()
        .name("cover-art".to_string())
        .spawn(move || {
            let art = extract_cover_art(&file);
            debug!(
                "Cover art for '{}': {}",
                file.name(),
                art.as_ref().map_or("none", |a| a.mime_format.as_str())
            );
            // Receiver gone means the app is shutting down
            let _ = results.send((generation, art));
        });

    if let Err(e) = spawned {
        warn!("Could not start cover art extraction: {}", e);
    }
}

/// Cover art lookups for successive file selections
///
/// Each request bumps a generation counter; only the result for the newest
/// selection is ever handed back, however late older lookups finish.
pub struct ArtworkFeed {
    generation: u64,
    tx: Sender<(u64, Option<CoverArt>)>,
    rx: Receiver<(u64, Option<CoverArt>)>,
}

impl Default for ArtworkFeed {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            generation: 0,
            tx,
            rx,
        }
    }
}

impl ArtworkFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a lookup for a newly selected file, superseding earlier ones
    pub fn request(&mut self, file: AudioFile) {
        self.generation += 1;
        spawn_extraction(file, self.generation, self.tx.clone());
    }

    /// Drain finished lookups; returns the result for the latest request, if it arrived
    pub fn poll(&self) -> Option<Option<CoverArt>> {
        let mut latest = None;
        while let Ok((generation, art)) = self.rx.try_recv() {
            if generation == self.generation {
                latest = Some(art);
            } else {
                debug!("Dropping stale cover art (generation {})", generation);
            }
        }
        latest
    }
}

/// Which image the plane currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureChoice {
    Default,
    Cover,
}

/// Default texture plus the currently bound image
pub struct Artwork {
    default_image: RgbaImage,
    cover_image: Option<RgbaImage>,
}

impl Artwork {
    pub fn new(default_image: RgbaImage) -> Self {
        Self {
            default_image,
            cover_image: None,
        }
    }

    /// Default texture from a file, or the built-in one when `path` is `None`
    pub fn with_default_from(path: Option<&Path>) -> Result<Self, RenderError> {
        let image = match path {
            Some(path) => fit_texture(image::open(path)?).to_rgba8(),
            None => builtin_default_image(),
        };
        Ok(Self::new(image))
    }

    pub fn choice(&self) -> TextureChoice {
        if self.cover_image.is_some() {
            TextureChoice::Cover
        } else {
            TextureChoice::Default
        }
    }

    /// Image that should be bound to `u_texture`
    pub fn current_image(&self) -> &RgbaImage {
        self.cover_image.as_ref().unwrap_or(&self.default_image)
    }

    /// Swap to `cover` (or back to the default); returns whether the bound image changed
    ///
    /// Art that fails to decode falls back to the default texture.
    pub fn apply(&mut self, cover: Option<&CoverArt>) -> bool {
        let next = cover.and_then(|art| match decode_cover(art) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Ignoring undecodable cover art ({}): {}", art.mime_format, e);
                None
            }
        });

        let changed = !(next.is_none() && self.cover_image.is_none());
        self.cover_image = next;
        changed
    }
}

fn decode_cover(art: &CoverArt) -> Result<RgbaImage, image::ImageError> {
    let image = match ImageFormat::from_mime_type(&art.mime_format) {
        Some(format) => image::load_from_memory_with_format(&art.bytes, format)
            .or_else(|_| image::load_from_memory(&art.bytes))?,
        None => image::load_from_memory(&art.bytes)?,
    };
    Ok(fit_texture(image).to_rgba8())
}

fn fit_texture(image: DynamicImage) -> DynamicImage {
    if image.width() > MAX_TEXTURE_DIM || image.height() > MAX_TEXTURE_DIM {
        image.resize(MAX_TEXTURE_DIM, MAX_TEXTURE_DIM, FilterType::Triangle)
    } else {
        image
    }
}

/// Concentric-ring placeholder so the radial distortion reads without cover art
pub fn builtin_default_image() -> RgbaImage {
    const SIZE: u32 = 512;
    RgbaImage::from_fn(SIZE, SIZE, |x, y| {
        let u = x as f32 / SIZE as f32 - 0.5;
        let v = y as f32 / SIZE as f32 - 0.5;
        let r = (u * u + v * v).sqrt();
        let ring = ((r * 40.0).sin() * 0.5 + 0.5) * 255.0;
        let fade = (1.0 - r * 1.4).clamp(0.0, 1.0);
        Rgba([
            (ring * fade) as u8,
            (90.0 * fade + 20.0) as u8,
            (255.0 - ring * 0.6) as u8,
            255,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_art(width: u32, height: u32) -> CoverArt {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        CoverArt {
            mime_format: "image/png".to_string(),
            bytes,
        }
    }

    fn artwork() -> Artwork {
        Artwork::new(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])))
    }

    #[test]
    fn test_cover_then_none_reverts_to_default() {
        let mut art = artwork();
        assert_eq!(art.choice(), TextureChoice::Default);

        assert!(art.apply(Some(&png_art(3, 2))));
        assert_eq!(art.choice(), TextureChoice::Cover);
        assert_eq!(art.current_image().dimensions(), (3, 2));

        assert!(art.apply(None));
        assert_eq!(art.choice(), TextureChoice::Default);
        assert_eq!(art.current_image().dimensions(), (4, 4));
    }

    #[test]
    fn test_none_to_none_is_unchanged() {
        let mut art = artwork();
        assert!(!art.apply(None));
    }

    #[test]
    fn test_bad_art_falls_back_to_default() {
        let mut art = artwork();
        art.apply(Some(&png_art(2, 2)));

        let broken = CoverArt {
            mime_format: "image/jpeg".to_string(),
            bytes: vec![1, 2, 3],
        };
        assert!(art.apply(Some(&broken)));
        assert_eq!(art.choice(), TextureChoice::Default);
    }

    #[test]
    fn test_mislabelled_art_is_sniffed() {
        let mut art = artwork();
        let mut png = png_art(5, 5);
        png.mime_format = "image/jpeg".to_string();

        art.apply(Some(&png));
        assert_eq!(art.choice(), TextureChoice::Cover);
    }

    #[test]
    fn test_extract_from_non_audio_is_none() {
        let file = AudioFile::from_bytes("junk.mp3", vec![0x13u8; 256]);
        assert!(extract_cover_art(&file).is_none());
    }

    const PNG_BYTES: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

    /// ID3v2.3 tag with one APIC frame followed by silent MPEG-1 Layer III frames
    fn id3_tagged_mp3() -> Vec<u8> {
        let mut apic = vec![0x00];
        apic.extend_from_slice(b"image/png\0");
        apic.push(0x03);
        apic.push(0x00);
        apic.extend_from_slice(&PNG_BYTES);

        let mut frame = b"APIC".to_vec();
        frame.extend_from_slice(&(apic.len() as u32).to_be_bytes());
        frame.extend_from_slice(&[0, 0]);
        frame.extend_from_slice(&apic);

        // Tag size is syncsafe; small enough that plain bytes are already valid
        let mut bytes = b"ID3".to_vec();
        bytes.extend_from_slice(&[3, 0, 0]);
        bytes.extend_from_slice(&[0, 0, 0, frame.len() as u8]);
        bytes.extend_from_slice(&frame);

        // 128 kbps, 44.1 kHz, no padding: 417 bytes per frame
        for _ in 0..20 {
            let mut mpeg = vec![0u8; 417];
            mpeg[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
            bytes.extend_from_slice(&mpeg);
        }
        bytes
    }

    /// FLAC stream header with STREAMINFO and a PICTURE block
    fn flac_with_picture() -> Vec<u8> {
        let mut bytes = b"fLaC".to_vec();

        // STREAMINFO: 4096-sample blocks, 44.1 kHz, stereo, 16 bit
        bytes.extend_from_slice(&[0x00, 0, 0, 34]);
        bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0u8; 16]);

        let mime = b"image/png";
        let mut picture = Vec::new();
        picture.extend_from_slice(&3u32.to_be_bytes());
        picture.extend_from_slice(&(mime.len() as u32).to_be_bytes());
        picture.extend_from_slice(mime);
        picture.extend_from_slice(&0u32.to_be_bytes());
        picture.extend_from_slice(&1u32.to_be_bytes());
        picture.extend_from_slice(&1u32.to_be_bytes());
        picture.extend_from_slice(&32u32.to_be_bytes());
        picture.extend_from_slice(&0u32.to_be_bytes());
        picture.extend_from_slice(&(PNG_BYTES.len() as u32).to_be_bytes());
        picture.extend_from_slice(&PNG_BYTES);

        // Last metadata block, type 6
        let len = picture.len() as u32;
        bytes.push(0x80 | 6);
        bytes.extend_from_slice(&len.to_be_bytes()[1..]);
        bytes.extend_from_slice(&picture);
        bytes
    }

    #[test]
    fn test_extract_id3_apic() {
        let file = AudioFile::from_bytes("tagged.mp3", id3_tagged_mp3());

        let art = extract_cover_art(&file).expect("APIC frame should be found");
        assert_eq!(art.mime_format, "image/png");
        assert_eq!(art.bytes, PNG_BYTES.to_vec());
    }

    #[test]
    fn test_extract_flac_picture_block() {
        let file = AudioFile::from_bytes("tagged.flac", flac_with_picture());

        let art = extract_cover_art(&file).expect("PICTURE block should be found");
        assert_eq!(art.mime_format, "image/png");
        assert_eq!(art.bytes, PNG_BYTES.to_vec());
    }

    #[test]
    fn test_feed_drops_results_from_older_selections() {
        let mut feed = ArtworkFeed::new();
        feed.generation = 2;

        // Newer result lands first, then the superseded lookup finishes
        feed.tx.send((2, None)).unwrap();
        feed.tx.send((1, Some(png_art(1, 1)))).unwrap();
        assert_eq!(feed.poll(), Some(None));

        feed.tx.send((1, Some(png_art(1, 1)))).unwrap();
        assert_eq!(feed.poll(), None);
    }

    #[test]
    fn test_feed_delivers_latest_request() {
        let mut feed = ArtworkFeed::new();
        feed.request(AudioFile::from_bytes("first.mp3", vec![0x13u8; 64]));
        feed.request(AudioFile::from_bytes("second.mp3", id3_tagged_mp3()));

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        let result = loop {
            if let Some(result) = feed.poll() {
                break result;
            }
            assert!(std::time::Instant::now() < deadline, "no cover art result");
            std::thread::sleep(std::time::Duration::from_millis(5));
        };

        assert_eq!(result.map(|art| art.mime_format), Some("image/png".to_string()));
    }

    #[test]
    fn test_builtin_default_image() {
        let image = builtin_default_image();
        assert_eq!(image.dimensions(), (512, 512));
    }
}
