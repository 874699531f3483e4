//! Core engine implementation
//!
//! [`Engine`] is the single explicit context of a running application: it owns the timing
//! context, the rendering context and its lights, the scene graph, the current camera, the
//! GPU backend and the presentation surface. Nothing is reached through globals; every
//! subsystem gets what it needs from here during the frame.
//!
//! A frame is: advance time → process input → update scene → follow camera anchor →
//! update camera → render → present.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::camera::{Camera, CameraParameters};
use crate::config::{Config, ConfigError};
use crate::core::EngineConfig;
use crate::foundation::math::constants::DEG_TO_RAD;
use crate::foundation::time::TimeContext;
use crate::input::{InputEvent, KeyBindings, KeyCode};
use crate::render::{FrameInput, FrameReport, GpuBackend, PresentationSurface, RenderError, RenderingContext, ResourceLibrary};
use crate::scene::{LoadReport, ObjectFactory, SceneDescription, SceneError, SceneGraph, SceneSettings};

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// A frame was requested with no current camera
    #[error("No current camera")]
    NoCurrentCamera,

    /// Scene loading failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Rendering failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Configuration could not be read
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The presentation surface failed
    #[error("Surface error: {0}")]
    Surface(String),
}

/// One step of [`Engine::shutdown`], in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    /// Scene roots dropped
    SceneCleared,
    /// Current camera dropped
    CameraReleased,
    /// Light collections emptied
    LightsCleared,
    /// Render targets released through the backend
    RendererReleased,
    /// Presentation surface closed
    SurfaceClosed,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            Self::SceneCleared => "scene cleared",
            Self::CameraReleased => "camera released",
            Self::LightsCleared => "lights cleared",
            Self::RendererReleased => "renderer released",
            Self::SurfaceClosed => "surface closed",
        };
        f.write_str(step)
    }
}

/// Main engine struct
pub struct Engine<B: GpuBackend, S: PresentationSurface, R: ResourceLibrary> {
    config: EngineConfig,
    time: TimeContext,
    rendering: RenderingContext,
    scene: SceneGraph,
    camera: Option<Camera>,
    bindings: KeyBindings,
    backend: B,
    surface: S,
    resources: R,
    running: bool,
    shut_down: bool,
}

impl<B: GpuBackend, S: PresentationSurface, R: ResourceLibrary> Engine<B, S, R> {
    /// Create an engine; loads `config.scene_path` when set
    pub fn new(config: EngineConfig, backend: B, surface: S, resources: R) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        log::info!("Initializing engine...");

        let mut engine = Self {
            time: TimeContext::new(config.time_scale),
            rendering: RenderingContext::new(&config.renderer),
            scene: SceneGraph::new(ObjectFactory::new(&config.object_dir)),
            camera: None,
            bindings: KeyBindings::default(),
            backend,
            surface,
            resources,
            running: true,
            shut_down: false,
            config,
        };

        engine.sync_window_size();
        if let Some(path) = engine.config.scene_path.clone() {
            engine.load_scene(path)?;
        }
        Ok(engine)
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Timing context
    pub fn time(&self) -> &TimeContext {
        &self.time
    }

    /// Rendering context
    pub fn rendering(&self) -> &RenderingContext {
        &self.rendering
    }

    /// Mutable rendering context
    pub fn rendering_mut(&mut self) -> &mut RenderingContext {
        &mut self.rendering
    }

    /// Scene graph
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Mutable scene graph
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// GPU backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable GPU backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Presentation surface
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable presentation surface
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Key bindings
    pub fn bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.bindings
    }

    /// Whether the frame loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ask the frame loop to stop after the current frame
    pub fn request_exit(&mut self) {
        self.running = false;
    }

    /// Make `camera` current, dropping the previous one
    pub fn set_current_camera(&mut self, mut camera: Camera) {
        camera.set_clip_planes(self.config.renderer.near_plane, self.config.renderer.far_plane);
        if let Some(previous) = self.camera.replace(camera) {
            log::debug!("Replaced {} camera", previous.kind());
        }
    }

    /// The current camera
    pub fn current_camera(&self) -> Result<&Camera, EngineError> {
        self.camera.as_ref().ok_or(EngineError::NoCurrentCamera)
    }

    /// The current camera, mutably
    pub fn current_camera_mut(&mut self) -> Result<&mut Camera, EngineError> {
        self.camera.as_mut().ok_or(EngineError::NoCurrentCamera)
    }

    /// Replace the loaded scene with a description file
    pub fn load_scene(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, EngineError> {
        let path = path.as_ref();
        let description = SceneDescription::load_from_file(path).map_err(SceneError::from)?;
        log::info!("Loading scene {}", path.display());
        Ok(self.load_scene_description(&description))
    }

    /// Replace the loaded scene with a description
    ///
    /// The previous objects and lights are dropped first. The description's camera becomes
    /// current and its post-processing parameters go to the renderer.
    pub fn load_scene_description(&mut self, description: &SceneDescription) -> LoadReport {
        self.scene.clear();
        self.rendering.lights_mut().clear();

        let loaded = self.scene.load(description, self.rendering.lights_mut(), &self.resources);
        self.apply_settings(loaded.settings);
        loaded.report
    }

    fn apply_settings(&mut self, settings: SceneSettings) {
        let SceneSettings { camera, post_process } = settings;
        log::info!("Current camera: {} at {:?}", camera.kind, camera.position);
        self.set_current_camera(Camera::from_parameters(&camera));
        self.rendering.renderer_mut().set_post_process_parameters(post_process);
    }

    /// Snapshot of the current camera's parameters
    pub fn camera_parameters(&self) -> Result<CameraParameters, EngineError> {
        self.current_camera().map(Camera::parameters)
    }

    /// Drain the surface's input and apply it
    pub fn process_events(&mut self) {
        for event in self.surface.poll_input() {
            self.handle_event(event);
        }
    }

    /// Apply one input event
    pub fn handle_event(&mut self, event: InputEvent) {
        log::trace!("Input: {:?}", event);
        match event {
            InputEvent::CloseRequested | InputEvent::KeyPressed(KeyCode::Escape) => {
                log::info!("Exit requested");
                self.running = false;
            }
            InputEvent::KeyPressed(KeyCode::Digit(digit)) => {
                self.rendering.renderer_mut().set_debug_view(i32::from(digit));
            }
            InputEvent::DebugView(view) => self.rendering.renderer_mut().set_debug_view(view),
            InputEvent::KeyPressed(key) | InputEvent::KeyReleased(key) => {
                let pressed = matches!(event, InputEvent::KeyPressed(_));
                if let (Some(flags), Some(camera)) = (self.bindings.motion_for(key), self.camera.as_mut()) {
                    camera.set_motion(flags, pressed);
                }
            }
            InputEvent::MouseMoved { dx, dy } => {
                if let Some(camera) = self.camera.as_mut() {
                    let scale = camera.state().rotation_speed() * self.config.mouse_sensitivity * DEG_TO_RAD;
                    camera.update_orientation(-dx * scale, -dy * scale);
                }
            }
            InputEvent::Analog { x, y } => {
                if let Some(camera) = self.camera.as_mut() {
                    camera.set_analog(x, y);
                }
                self.scene.set_player_analog(x, y);
            }
            InputEvent::Resized { width, height } => {
                self.surface.resize(width, height);
                self.sync_window_size();
            }
        }
    }

    /// Mirror the surface's actual size into the window configuration
    fn sync_window_size(&mut self) {
        let (width, height) = self.surface.size();
        let window = &mut self.config.window;
        if (window.width, window.height) != (width, height) {
            log::debug!("Surface size {}x{} (configured {}x{})", width, height, window.width, window.height);
            window.width = width;
            window.height = height;
        }
    }

    /// Run one frame timed by the wall clock
    pub fn frame(&mut self) -> Result<FrameReport, EngineError> {
        self.time.update();
        self.step()
    }

    /// Run one frame of exactly `delta_time` seconds
    pub fn advance(&mut self, delta_time: f32) -> Result<FrameReport, EngineError> {
        self.time.advance(delta_time);
        self.step()
    }

    fn step(&mut self) -> Result<FrameReport, EngineError> {
        if self.camera.is_none() {
            return Err(EngineError::NoCurrentCamera);
        }
        let scaled_time = self.time.scaled_time();
        let elapsed_time = self.time.elapsed_time();

        self.process_events();
        self.scene.update(scaled_time, elapsed_time);

        let anchor = self.scene.camera_anchor();
        let camera = self.camera.as_mut().ok_or(EngineError::NoCurrentCamera)?;
        if let Some(anchor) = anchor {
            camera.set_pivot(anchor);
        }
        camera.update(scaled_time);

        let items = self.scene.render_items();
        let input = FrameInput {
            items: &items,
            skybox: self.scene.skybox(),
            aspect_ratio: self.config.window.aspect_ratio(),
        };
        let report = self.rendering.render(&mut self.backend, camera, &input)?;
        self.surface.present().map_err(EngineError::Surface)?;

        log::debug!(
            "Frame {} done: {} passes, {} skipped",
            report.frame,
            report.executed.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Run frames until exit is requested or `max_frames` is reached; returns frames run
    pub fn run(&mut self) -> Result<u64, EngineError> {
        log::info!("Starting main loop...");
        let mut frames = 0;
        while self.running {
            if self.config.max_frames.is_some_and(|max| frames >= max) {
                break;
            }
            self.frame()?;
            frames += 1;
        }
        log::info!("Main loop finished after {} frames", frames);
        Ok(frames)
    }

    /// Release everything in dependency order, the surface last
    ///
    /// Runs once; later calls (including the one from `Drop`) return no steps.
    pub fn shutdown(&mut self) -> Vec<TeardownStep> {
        if self.shut_down {
            return Vec::new();
        }
        self.shut_down = true;
        self.running = false;

        let mut steps = Vec::with_capacity(5);
        self.scene.clear();
        steps.push(TeardownStep::SceneCleared);

        self.camera = None;
        steps.push(TeardownStep::CameraReleased);

        self.rendering.lights_mut().clear();
        steps.push(TeardownStep::LightsCleared);

        self.rendering.renderer_mut().release(&mut self.backend);
        steps.push(TeardownStep::RendererReleased);

        self.surface.close();
        steps.push(TeardownStep::SurfaceClosed);

        for step in &steps {
            log::info!("Shutdown: {}", step);
        }
        steps
    }
}

impl<B: GpuBackend, S: PresentationSurface, R: ResourceLibrary> Drop for Engine<B, S, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
