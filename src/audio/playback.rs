//! Playback controller: file selection, play/stop and the audio graph lifecycle.
//!
//! The graph (and the tap inside it) is built on the first `play()` and then
//! kept for the life of the controller. Selecting another file only rebinds
//! the source; [`PlaybackController::reset_graph`] is the one way to tear the
//! graph down so that the next `play()` builds a fresh one.

use std::sync::Arc;
use tracing::{debug, info};

use super::graph::{AudioContext, OutputBackend};
use super::session::{AudioFile, AudioSession, SourceRegistry, SourceStatus};
use super::source::{SpectrumSource, TapSlot};
use crate::error::AudioError;
use crate::params::AnalyserConfig;

/// Transport state as seen by the control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loaded,
    Playing,
    Stopped,
}

/// What the control surface needs to enable its buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStatus {
    pub has_file: bool,
    pub is_playing: bool,
}

/// Lifecycle of the audio graph
enum GraphState {
    Uninitialized,
    Running(AudioContext),
}

pub struct PlaybackController {
    backend: OutputBackend,
    analyser: AnalyserConfig,
    registry: SourceRegistry,
    session: Option<AudioSession>,
    graph: GraphState,
    tap_slot: TapSlot,
    state: PlaybackState,
}

impl PlaybackController {
    pub fn new(backend: OutputBackend, analyser: AnalyserConfig) -> Self {
        Self {
            backend,
            analyser,
            registry: SourceRegistry::new(),
            session: None,
            graph: GraphState::Uninitialized,
            tap_slot: TapSlot::new(),
            state: PlaybackState::Idle,
        }
    }

    /// Render-side view of the tap this controller publishes
    pub fn spectrum_source(&self) -> SpectrumSource {
        SpectrumSource::new(self.tap_slot.clone())
    }

    /// Current state; a source that played to its end reads as `Stopped`
    pub fn state(&self) -> PlaybackState {
        match (&self.state, &self.graph) {
            (PlaybackState::Playing, GraphState::Running(ctx)) if !ctx.graph().is_playing() => {
                PlaybackState::Stopped
            }
            (state, _) => *state,
        }
    }

    pub fn controls(&self) -> ControlStatus {
        ControlStatus {
            has_file: self.session.is_some(),
            is_playing: self.state() == PlaybackState::Playing,
        }
    }

    pub fn session(&self) -> Option<&AudioSession> {
        self.session.as_ref()
    }

    pub fn source_status(&self) -> Option<SourceStatus> {
        self.session.as_ref().map(|s| s.source.status())
    }

    pub fn position_secs(&self) -> f32 {
        match &self.graph {
            GraphState::Running(ctx) => ctx.graph().position_secs(),
            GraphState::Uninitialized => 0.0,
        }
    }

    pub fn has_graph(&self) -> bool {
        matches!(self.graph, GraphState::Running(_))
    }

    pub fn live_sources(&self) -> usize {
        self.registry.live_count()
    }

    /// Handle a file picker result; only the first file is used
    pub fn select(&mut self, files: impl IntoIterator<Item = AudioFile>) {
        if let Some(file) = files.into_iter().next() {
            self.load(file);
        }
    }

    /// Replace the current source with `file`
    ///
    /// Order: stop playback, revoke the previous URL, mint the new one, bind
    /// it to the running graph (if any) and start decoding in the background.
    pub fn load(&mut self, file: AudioFile) {
        self.stop();

        if let Some(previous) = self.session.take() {
            self.registry.revoke(previous.url);
        }

        let (url, source) = self.registry.create(&file);
        source.decode_in_background(&file);

        if let GraphState::Running(ctx) = &self.graph {
            ctx.graph().bind(Some(Arc::clone(&source)));
        }

        info!("Loaded '{}' as {}", file.name(), url);
        self.session = Some(AudioSession { file, url, source });
        self.state = PlaybackState::Loaded;
    }

    /// Start playback, building the audio graph on first use
    ///
    /// No-op without a loaded file or while already playing.
    pub fn play(&mut self) -> Result<(), AudioError> {
        let Some(session) = &self.session else {
            debug!("play() ignored: no file loaded");
            return Ok(());
        };
        if self.state() == PlaybackState::Playing {
            return Ok(());
        }
        let source = Arc::clone(&session.source);

        self.ensure_graph()?;
        if let GraphState::Running(ctx) = &self.graph {
            ctx.graph().start();
        }

        debug!("Playing '{}'", source.name());
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Pause and rewind to the start; no-op unless playing
    pub fn stop(&mut self) {
        if self.state() != PlaybackState::Playing {
            return;
        }
        if let GraphState::Running(ctx) = &self.graph {
            ctx.graph().halt();
        }
        debug!("Stopped");
        self.state = PlaybackState::Stopped;
    }

    /// Tear down the graph and tap; the next `play()` builds new ones
    pub fn reset_graph(&mut self) {
        self.stop();
        self.tap_slot.clear();
        if matches!(self.graph, GraphState::Running(_)) {
            info!("Audio graph torn down");
        }
        self.graph = GraphState::Uninitialized;
        self.state = if self.session.is_some() {
            PlaybackState::Loaded
        } else {
            PlaybackState::Idle
        };
    }

    /// Stop, drop the graph and release the current source URL
    pub fn close(&mut self) {
        self.reset_graph();
        if let Some(session) = self.session.take() {
            self.registry.revoke(session.url);
        }
        self.state = PlaybackState::Idle;
    }

    /// Idempotent graph initializer (Uninitialized → Running)
    fn ensure_graph(&mut self) -> Result<(), AudioError> {
        if let GraphState::Running(_) = self.graph {
            return Ok(());
        }

        let ctx = AudioContext::open(&self.backend, &self.analyser)?;
        // The graph plays whatever the session URL currently resolves to
        let source = self
            .session
            .as_ref()
            .and_then(|s| self.registry.resolve(&s.url));
        ctx.graph().bind(source);

        // Visible to the render loop only once fully wired
        self.tap_slot.publish(Arc::clone(ctx.graph().tap()));
        info!(
            "Audio graph ready ({}Hz, fft {})",
            ctx.graph().sample_rate(),
            self.analyser.fft_size
        );
        self.graph = GraphState::Running(ctx);
        Ok(())
    }

    /// Pull `out` from the graph directly (null backend)
    pub fn render_into(&self, out: &mut [f32]) {
        match &self.graph {
            GraphState::Running(ctx) => ctx.graph().render(out),
            GraphState::Uninitialized => out.fill(0.0),
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.close();
    }
}
