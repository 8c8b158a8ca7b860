//! Wavepool - two water surfaces that move to a playing track.
//!
//! The left surface follows the high band of the spectrum, the right follows
//! the low band. A floating panel exposes every shader parameter for live
//! tuning, playback toggles with space, and the mouse orbits the camera.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context as _};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use wavepool::analysis::{extract, BandIntensity, BandPlan};
use wavepool::audio::{AudioSystem, PlaybackEvent, PlaybackState, Track};
use wavepool::camera::OrbitController;
use wavepool::cli::Args;
use wavepool::panel::ParameterPanel;
use wavepool::params::{AnalyserConfig, BandConfig, RenderConfig};
use wavepool::rendering::{capped_surface_size, RenderSystem, SurfaceUniforms};
use wavepool::surface::{SurfaceId, SurfaceSet};

/// Main application state: the single owning context for every subsystem
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,
    panel: Option<ParameterPanel>,

    // Audio
    audio: Option<AudioSystem>,
    pending_track: Option<Track>,
    playback: PlaybackState,

    // Scene state
    surfaces: SurfaceSet,
    camera: OrbitController,

    // Configuration
    render_config: RenderConfig,
    analyser_config: AnalyserConfig,
    band_plan: BandPlan,

    // Per-frame extraction scratch
    snapshot: Vec<u8>,
    intensity: BandIntensity,

    // Input and time tracking
    mouse_down: bool,
    last_cursor: Option<(f64, f64)>,
    start_time: Instant,
    last_frame: Instant,
}

impl App {
    fn new(args: &Args) -> anyhow::Result<Self> {
        let track = Track::load(&args.track)
            .with_context(|| format!("loading track {}", args.track.display()))?;

        info!(
            sample_rate = track.sample_rate_hz,
            duration_secs = track.duration_secs(),
            "track loaded"
        );

        let analyser_config = args.analyser_config(track.sample_rate_hz);
        analyser_config.validate().map_err(|e| anyhow!(e))?;

        let band_plan = BandConfig::default().plan(&analyser_config);
        let snapshot = vec![0u8; analyser_config.bin_count()];

        Ok(Self {
            window: None,
            render_system: None,
            panel: None,
            audio: None,
            pending_track: Some(track),
            playback: PlaybackState::default(),
            surfaces: SurfaceSet::new(),
            camera: OrbitController::new(),
            render_config: RenderConfig::default(),
            analyser_config,
            band_plan,
            snapshot,
            intensity: BandIntensity::default(),
            mouse_down: false,
            last_cursor: None,
            start_time: Instant::now(),
            last_frame: Instant::now(),
        })
    }

    /// Toggle playback, driving the state machine and the audio stream
    fn toggle_playback(&mut self) {
        let event = if self.playback.is_active() {
            PlaybackEvent::Paused
        } else {
            PlaybackEvent::Started
        };

        if let Some(audio) = &mut self.audio {
            match event {
                PlaybackEvent::Started => {
                    // The sampler pipeline is set up at the same point the
                    // first playback starts, so sample() is never called
                    // before start()
                    audio.sampler_mut().start();
                    audio.set_playing(true);
                }
                PlaybackEvent::Paused => audio.set_playing(false),
            }
        }

        self.playback = self.playback.transition(event);
        info!(state = ?self.playback, "playback toggled");
    }

    /// Render a single frame
    fn render_frame(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.camera.update(dt);

        // Panel edits first, so manual tuning lands in this frame
        let mut panel_frame = None;
        if let (Some(panel), Some(window)) = (self.panel.as_mut(), self.window.as_ref()) {
            panel_frame = Some(panel.run(
                window,
                &mut self.surfaces,
                self.playback,
                self.intensity,
            ));
        }

        // While audio plays, the extractor owns the displacement uniforms;
        // when idle they stay frozen at their last value
        if self.playback.is_active() {
            if let Some(audio) = &self.audio {
                match audio.sampler().sample_into(&mut self.snapshot) {
                    Ok(()) => {
                        self.intensity = extract(&self.snapshot, &self.band_plan);
                        self.surfaces
                            .set_displacement(SurfaceId::Left, self.intensity.high);
                        self.surfaces
                            .set_displacement(SurfaceId::Right, self.intensity.low);
                    }
                    // Rendering carries on with the last displacement
                    Err(e) => warn!("spectrum sampling failed: {}", e),
                }
            }
        }

        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };

        let time_s = self.start_time.elapsed().as_secs_f32();
        let (view_proj, _) = self.camera.view_proj(&self.render_config);

        for id in [SurfaceId::Left, SurfaceId::Right] {
            let uniforms = SurfaceUniforms::new(view_proj, id, self.surfaces.params(id), time_s);
            render_system.update_surface(id, &uniforms);
        }

        if let Err(e) = render_system.render(panel_frame) {
            error!("render error: {:?}", e);
        }
    }

    fn handle_resize(&mut self, width: u32, height: u32) {
        let scale_factor = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
        let (width, height) = capped_surface_size(
            (width, height),
            scale_factor,
            self.render_config.max_pixel_ratio,
        );

        self.render_config.window_width = width;
        self.render_config.window_height = height;

        if let Some(render_system) = self.render_system.as_mut() {
            render_system.resize(width, height);
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

        let window_attributes = Window::default_attributes()
            .with_title("Wavepool - Audio-Reactive Water")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let render_system =
            match pollster::block_on(RenderSystem::new(Arc::clone(&window), &self.surfaces.mesh)) {
                Ok(rs) => rs,
                Err(e) => {
                    error!("failed to initialize rendering: {}", e);
                    event_loop.exit();
                    return;
                }
            };

        let Some(track) = self.pending_track.take() else {
            return;
        };
        let audio = match AudioSystem::new(track, self.analyser_config.clone()) {
            Ok(audio) => audio,
            Err(e) => {
                error!("failed to initialize audio: {}", e);
                event_loop.exit();
                return;
            }
        };

        let panel = ParameterPanel::new(&window);

        info!("wavepool is running; space toggles playback, ESC quits");

        let size = window.inner_size();
        self.window = Some(window);
        self.render_system = Some(render_system);
        self.audio = Some(audio);
        self.panel = Some(panel);
        self.handle_resize(size.width, size.height);
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // The panel sees every event first and may capture pointer/keyboard
        let consumed = match (self.panel.as_mut(), self.window.as_ref()) {
            (Some(panel), Some(window)) => panel.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } if !consumed => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Space => self.toggle_playback(),
                _ => {}
            },
            WindowEvent::Resized(size) => {
                self.handle_resize(size.width, size.height);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let over_panel = self.panel.as_ref().is_some_and(|p| p.wants_pointer());
                self.mouse_down = state == ElementState::Pressed && !over_panel;
                self.camera.set_dragging(self.mouse_down);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((last_x, last_y)) = self.last_cursor {
                    self.camera.on_cursor_delta(
                        (position.x - last_x) as f32,
                        (position.y - last_y) as f32,
                    );
                }
                self.last_cursor = Some((position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } if !consumed => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                if !self.panel.as_ref().is_some_and(|p| p.wants_pointer()) {
                    self.camera.on_scroll(scroll);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut app = App::new(&args)?;

    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
