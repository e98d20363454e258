//! Audio sessions: selected files, their source handles and background decoding.
//!
//! Every selected file is registered under an opaque [`SourceUrl`]. A URL is
//! single-owner: it cannot be cloned and revoking consumes it, so releasing
//! the same source twice does not compile and a leaked one shows up in
//! [`SourceRegistry::live_count`].

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use tracing::{debug, warn};

use super::decoder::{self, Pcm};
use crate::error::AudioError;

/// A user-selected audio file held in memory
#[derive(Debug, Clone)]
pub struct AudioFile {
    name: String,
    extension: Option<String>,
    bytes: Arc<[u8]>,
}

impl AudioFile {
    /// Read a file from disk
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    /// Wrap bytes that are already in memory; the extension hint comes from `name`
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let extension = Path::new(&name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        Self {
            name,
            extension,
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }
}

/// Opaque handle for one registered source
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SourceUrl(u64);

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:spectraplane/{}", self.0)
    }
}

/// Decoding progress of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Decoding,
    Ready,
    Failed,
}

/// PCM behind a source URL, filled in by a decode worker
#[derive(Debug, Default)]
pub struct SourceBuffer {
    name: String,
    pcm: OnceLock<Pcm>,
    failed: AtomicBool,
}

impl SourceBuffer {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Build an already-decoded source
    pub fn from_pcm(name: &str, pcm: Pcm) -> Self {
        let source = Self::new(name);
        let _ = source.pcm.set(pcm);
        source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded samples, once available
    pub fn pcm(&self) -> Option<&Pcm> {
        self.pcm.get()
    }

    pub fn status(&self) -> SourceStatus {
        if self.pcm.get().is_some() {
            SourceStatus::Ready
        } else if self.failed.load(Ordering::Acquire) {
            SourceStatus::Failed
        } else {
            SourceStatus::Decoding
        }
    }

    fn fulfil(&self, result: Result<Pcm, AudioError>) {
        match result {
            Ok(pcm) => {
                let _ = self.pcm.set(pcm);
            }
            Err(e) => {
                warn!("Could not decode '{}': {}", self.name, e);
                self.failed.store(true, Ordering::Release);
            }
        }
    }

    /// Decode `file` on a worker thread; playback reads silence until it lands
    pub fn decode_in_background(self: &Arc<Self>, file: &AudioFile) {
        let source = Arc::clone(self);
        let bytes = Arc::clone(&file.bytes);
        let extension = file.extension.clone();

        let spawned = thread::Builder::new()
            .name("decode".to_string())
            .spawn(move || source.fulfil(decoder::decode(bytes, extension.as_deref())));

        if let Err(e) = spawned {
            self.fulfil(Err(AudioError::Io(e)));
        }
    }
}

/// Live source URLs and the buffers they keep alive
#[derive(Debug, Default)]
pub struct SourceRegistry {
    next_id: u64,
    live: HashMap<u64, Arc<SourceBuffer>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new source for `file`
    pub fn create(&mut self, file: &AudioFile) -> (SourceUrl, Arc<SourceBuffer>) {
        self.next_id += 1;
        let url = SourceUrl(self.next_id);
        let source = Arc::new(SourceBuffer::new(file.name()));
        self.live.insert(url.0, Arc::clone(&source));
        debug!("Created {} for '{}'", url, file.name());
        (url, source)
    }

    /// Release a URL; returns whether it was still live
    pub fn revoke(&mut self, url: SourceUrl) -> bool {
        let released = self.live.remove(&url.0).is_some();
        debug!("Revoked {}", url);
        released
    }

    /// Source behind a live URL; `None` once revoked
    pub fn resolve(&self, url: &SourceUrl) -> Option<Arc<SourceBuffer>> {
        self.live.get(&url.0).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// The currently selected file and the source URL minted for it
#[derive(Debug)]
pub struct AudioSession {
    pub file: AudioFile,
    pub url: SourceUrl,
    pub source: Arc<SourceBuffer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_hint_from_name() {
        let file = AudioFile::from_bytes("Track.MP3", vec![1u8, 2, 3]);
        assert_eq!(file.extension(), Some("mp3"));
        assert_eq!(file.bytes().len(), 3);

        let file = AudioFile::from_bytes("noext", Vec::<u8>::new());
        assert_eq!(file.extension(), None);
    }

    #[test]
    fn test_registry_create_and_revoke() {
        let mut registry = SourceRegistry::new();
        let file = AudioFile::from_bytes("a.wav", vec![0u8; 4]);

        let (first, _) = registry.create(&file);
        let (second, _) = registry.create(&file);
        assert_ne!(first, second);
        assert_eq!(registry.live_count(), 2);

        assert!(registry.revoke(first));
        assert_eq!(registry.live_count(), 1);
        assert!(registry.resolve(&second).is_some());
    }

    #[test]
    fn test_url_display() {
        assert_eq!(SourceUrl(7).to_string(), "blob:spectraplane/7");
    }

    #[test]
    fn test_failed_decode_reports_failure() {
        let mut registry = SourceRegistry::new();
        let file = AudioFile::from_bytes("bad.mp3", vec![0x42u8; 64]);
        let (_url, source) = registry.create(&file);

        source.fulfil(decoder::decode(Arc::clone(file.bytes()), file.extension()));
        assert_eq!(source.status(), SourceStatus::Failed);
        assert!(source.pcm().is_none());
    }
}
