//! Headless scene viewer
//!
//! Loads a scene description, replays a short scripted input session against the headless
//! backend and logs what every frame rendered. Useful for checking scene files without a GPU.

use std::process::ExitCode;

use deferred_engine::foundation::logging;
use deferred_engine::input::{InputEvent, KeyCode};
use deferred_engine::prelude::*;
use deferred_engine::render::headless::{HeadlessBackend, MemoryLibrary, ScriptedSurface};
use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = "config.toml";
const FRAME_TIME: f32 = 1.0 / 60.0;

/// Viewer configuration: the engine section plus the resources the headless library provides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ViewerConfig {
    engine: EngineConfig,
    meshes: Vec<String>,
    textures: Vec<String>,
    demo_frames: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default().with_scene("resources/scenes/demo_scene.ron"),
            meshes: Vec::new(),
            textures: Vec::new(),
            demo_frames: 240,
        }
    }
}

impl Config for ViewerConfig {}

fn main() -> ExitCode {
    let config = match ViewerConfig::load_from_file(CONFIG_PATH) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Could not read {CONFIG_PATH} ({error}), using defaults");
            ViewerConfig::default()
        }
    };
    logging::init_with_level(&config.engine.log_level);

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("Scene viewer failed: {}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(config: ViewerConfig) -> Result<(), EngineError> {
    let mut library = MemoryLibrary::new();
    for mesh in &config.meshes {
        library.add_mesh(mesh.as_str());
    }
    for texture in &config.textures {
        library.add_texture(texture.as_str());
    }

    let window = &config.engine.window;
    let mut surface = ScriptedSurface::new(window.width, window.height);
    for frame in 0..config.demo_frames {
        surface.push_frame(scripted_input(frame));
    }
    surface.push_frame(vec![InputEvent::CloseRequested]);

    log::info!("Opening '{}' ({}x{})", window.title, window.width, window.height);
    let mut engine = Engine::new(config.engine.clone(), HeadlessBackend::new(), surface, library)?;

    while engine.is_running() {
        let report = engine.advance(FRAME_TIME)?;
        if !report.skipped.is_empty() {
            for skipped in &report.skipped {
                log::warn!("Frame {}: {} skipped ({})", report.frame, skipped.pass, skipped.reason);
            }
        }
        if report.frame % 60 == 0 {
            let lights: usize = LightKind::ALL.into_iter().map(|kind| report.lights_drawn(kind)).sum();
            log::info!(
                "Frame {}: {} passes, {} lights, debug view {:?}",
                report.frame,
                report.executed.len(),
                lights,
                report.debug_view
            );
        }
        let commands = engine.backend_mut().take_commands();
        log::debug!("Frame {}: {} backend commands", report.frame, commands.len());
    }

    for step in engine.shutdown() {
        log::debug!("Teardown: {}", step);
    }
    Ok(())
}

/// Input for one frame of the demo session
///
/// Orbit and zoom the camera, steer the ship, then step through every debug view.
fn scripted_input(frame: u32) -> Vec<InputEvent> {
    let debug_views = RenderTarget::DEBUG_VIEWS.len() as u32;
    match frame {
        10 => vec![InputEvent::KeyPressed(KeyCode::A)],
        40 => vec![InputEvent::KeyReleased(KeyCode::A), InputEvent::KeyPressed(KeyCode::W)],
        70 => vec![InputEvent::KeyReleased(KeyCode::W)],
        80..=99 => vec![InputEvent::MouseMoved { dx: 2.0, dy: -1.0 }],
        100 => vec![InputEvent::Analog { x: 0.6, y: 0.8 }],
        130 => vec![InputEvent::Analog { x: 0.0, y: 0.0 }],
        f if (140..140 + debug_views * 10).contains(&f) && (f - 140) % 10 == 0 => {
            let view = u8::try_from((f - 140) / 10 + 1).unwrap_or(0);
            vec![InputEvent::KeyPressed(KeyCode::Digit(view))]
        }
        f if f == 140 + debug_views * 10 => vec![InputEvent::KeyPressed(KeyCode::Digit(0))],
        _ => Vec::new(),
    }
}
