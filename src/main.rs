//! Spectraplane - cover art that breathes with the music
//!
//! Drop an audio file on the window (or pass it on the command line), press
//! Space to play and watch the plane ripple with the spectrum.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use spectraplane::artwork::{Artwork, ArtworkFeed};
use spectraplane::audio::{AudioFile, OutputBackend, PlaybackController};
use spectraplane::cli::Args;
use spectraplane::logging;
use spectraplane::params::{BandLayout, RenderConfig};
use spectraplane::render_loop::{FrameScheduler, RenderLoop};
use spectraplane::rendering::RenderSystem;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Audio and per-frame work
    controller: PlaybackController,
    scheduler: FrameScheduler,

    // Texture selection
    artwork: Artwork,
    art_feed: ArtworkFeed,

    // Configuration
    layout: BandLayout,
    render_config: RenderConfig,

    // Time tracking
    start_time: Instant,
}

impl App {
    fn new(args: &Args) -> anyhow::Result<Self> {
        let layout = args.parse_band_layout();
        let analyser = args.analyser_config();
        analyser.validate().context("Invalid analyser settings")?;

        let artwork = Artwork::with_default_from(args.texture.as_deref())
            .context("Failed to load default texture")?;

        let controller = PlaybackController::new(OutputBackend::Device, analyser);
        let mut scheduler = FrameScheduler::new();
        scheduler.register(Box::new(RenderLoop::new(
            controller.spectrum_source(),
            layout,
        )));

        let mut app = Self {
            window: None,
            render_system: None,
            controller,
            scheduler,
            artwork,
            art_feed: ArtworkFeed::new(),
            layout,
            render_config: args.render_config(),
            start_time: Instant::now(),
        };

        if let Some(path) = &args.file {
            app.open_path(path);
        }

        Ok(app)
    }

    /// Select a file from disk; unreadable files are logged and ignored
    fn open_path(&mut self, path: &Path) {
        match AudioFile::open(path) {
            Ok(file) => self.select(file),
            Err(e) => warn!("Cannot open {}: {}", path.display(), e),
        }
    }

    fn select(&mut self, file: AudioFile) {
        info!("Selected '{}'", file.name());
        self.art_feed.request(file.clone());
        self.controller.select([file]);
    }

    /// Apply the newest finished cover art lookup, if any
    fn drain_cover_art(&mut self) {
        let Some(art) = self.art_feed.poll() else {
            return;
        };
        if self.artwork.apply(art.as_ref()) {
            if let Some(render_system) = self.render_system.as_mut() {
                render_system.set_texture(self.artwork.current_image());
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode, event_loop: &winit::event_loop::ActiveEventLoop) {
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                if let Err(e) = self.controller.play() {
                    error!("Playback failed: {}", e);
                }
            }
            KeyCode::KeyS => self.controller.stop(),
            KeyCode::KeyR => self.controller.reset_graph(),
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        // Create window
        let window_attributes = Window::default_attributes()
            .with_title("Spectraplane")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        // Initialize rendering system
        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.layout,
            &self.render_config,
            self.artwork.current_image(),
        ));
        match render_system {
            Ok(render_system) => self.render_system = Some(render_system),
            Err(e) => {
                error!("Failed to initialise renderer: {}", e);
                event_loop.exit();
                return;
            }
        }

        info!("Spectraplane is running");
        info!("Space: play  S: stop  R: reset audio graph  Esc: quit");

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::DroppedFile(path) => self.open_path(&path),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(key),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(key, event_loop),
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        self.controller.close();
    }
}

impl App {
    /// Render a single frame
    fn render_frame(&mut self) {
        self.drain_cover_art();

        // Get current time
        let time_s = self.start_time.elapsed().as_secs_f32();

        let uniforms = self.render_system.as_mut().map(|r| r.uniforms_mut());
        self.scheduler.run_frame(uniforms, time_s);

        // Render
        if let Some(render_system) = self.render_system.as_mut() {
            if let Err(e) = render_system.render() {
                error!("Render error: {}", e);
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    info!("Spectraplane - audio-reactive cover art");

    let mut app = App::new(&args)?;
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
