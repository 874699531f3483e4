//! End-to-end frame tests: scene load, input, render passes and teardown through [`Engine`]

use approx::assert_relative_eq;

use crate::camera::{CameraKind, CameraParameters};
use crate::config::{Config, ConfigError, ConfigFormat};
use crate::core::EngineConfig;
use crate::foundation::math::constants::DEG_TO_RAD;
use crate::foundation::math::{Mat4, Vec3};
use crate::input::{InputEvent, KeyCode};
use crate::render::headless::{BackendCommand, HeadlessBackend, MemoryLibrary, ScriptedSurface};
use crate::render::{LightKind, ParamValue, RenderError, RenderPass, RenderTarget};
use crate::scene::{ComponentDescription, ObjectDescription, SceneDescription, SceneError};
use crate::{Engine, EngineError, TeardownStep};

type TestEngine = Engine<HeadlessBackend, ScriptedSurface, MemoryLibrary>;

const FULL_SCENE: &str = r#"#![enable(implicit_some)]
(
    settings: (
        camera: (type: "sphere", position: (x: 0.0, y: 0.0, z: 0.0, radius: 12.0)),
        postprocess: (parameters: (toneMappingKey: 0.4, colorLUT: "textures/warm_lut.ron")),
    ),
    sceneobject: [
        (x: 5.0, ressourcecomponent: "ship"),
        (y: 8.0, light: (type: "omni", Radius: (value: 20.0))),
        (x: 2.0, y: 6.0, light: (type: "spot")),
        (x: -2.0, y: 6.0, light: (type: "spotshadow", InnerAngle: (value: 10.0))),
        (x: 1.0, y: 1.0, light: (type: "directional", Multiplier: (value: 0.5))),
        (scale: 100.0, skybox: (material: "textures/sky")),
    ],
)"#;

fn ship() -> ObjectDescription {
    ObjectDescription {
        name: "ship".to_string(),
        components: vec![
            ComponentDescription::Render {
                mesh: "meshes/ship".to_string(),
                offset: [0.0; 3],
                rotation: [0.0; 3],
                scale: 1.0,
            },
            ComponentDescription::Camera { offset: [0.0, 1.0, 0.0] },
        ],
    }
}

fn engine_with(config: EngineConfig, backend: HeadlessBackend, surface: ScriptedSurface) -> TestEngine {
    let library = MemoryLibrary::new().with_mesh("meshes/ship").with_texture("textures/sky");
    let mut engine = Engine::new(config, backend, surface, library).unwrap();
    engine.scene_mut().factory_mut().register(ship());
    engine
}

fn engine() -> TestEngine {
    engine_with(EngineConfig::default(), HeadlessBackend::new(), ScriptedSurface::new(640, 480))
}

fn scene(text: &str) -> SceneDescription {
    SceneDescription::from_str_as(text, ConfigFormat::Ron).unwrap()
}

#[test]
fn test_scene_without_camera_settings_gets_default_first_person_camera() {
    let mut engine = engine();
    engine.load_scene_description(&scene(r#"(sceneobject: [])"#));

    let camera = engine.camera_parameters().unwrap();
    let defaults = CameraParameters::default();
    assert_eq!(camera.kind, CameraKind::FirstPerson);
    assert_eq!(camera.position, Vec3::zeros());
    assert_relative_eq!(camera.fov, defaults.fov);
    assert_relative_eq!(camera.position_speed, defaults.position_speed);
    assert_relative_eq!(camera.rotation_speed, defaults.rotation_speed);
}

#[test]
fn test_full_scene_fills_one_collection_per_light_kind() {
    let mut engine = engine();
    let report = engine.load_scene_description(&scene(FULL_SCENE));

    assert!(report.errors.is_empty());
    assert_eq!(report.objects, 1);
    assert!(report.skybox);
    let lights = engine.rendering().lights();
    for kind in LightKind::ALL {
        assert_eq!(lights.count(kind), 1, "{kind}");
    }
    assert_eq!(engine.camera_parameters().unwrap().kind, CameraKind::Orbital);

    let post_process = engine.rendering().renderer().post_process_parameters();
    assert_relative_eq!(post_process.tone_mapping_key, 0.4);
    assert_eq!(post_process.color_lut, "textures/warm_lut.ron");
}

#[test]
fn test_reloading_replaces_previous_scene() {
    let mut engine = engine();
    engine.load_scene_description(&scene(FULL_SCENE));
    engine.load_scene_description(&scene(FULL_SCENE));

    assert_eq!(engine.rendering().lights().len(), 4);
    assert_eq!(engine.scene().len(), 1);
}

#[test]
fn test_unknown_light_and_missing_object_are_skipped() {
    let mut engine = engine();
    let report = engine.load_scene_description(&scene(
        r#"#![enable(implicit_some)]
        (sceneobject: [
            (light: (type: "area")),
            (ressourcecomponent: "ghost"),
            (light: (type: "omni")),
            (ressourcecomponent: "ship"),
        ])"#,
    ));

    assert_eq!(report.errors.len(), 2);
    assert!(matches!(&report.errors[0].1, SceneError::UnknownLightType(token) if token == "area"));
    assert!(matches!(&report.errors[1].1, SceneError::ResourceMissing { name, .. } if name == "ghost"));
    assert_eq!(engine.rendering().lights().count(LightKind::Omni), 1);
    assert_eq!(engine.scene().len(), 1);
}

#[test]
fn test_frame_without_camera_fails() {
    let mut engine = engine();
    assert!(matches!(engine.advance(0.016), Err(EngineError::NoCurrentCamera)));
    assert!(matches!(engine.current_camera(), Err(EngineError::NoCurrentCamera)));
}

#[test]
fn test_frame_runs_every_pass_and_presents() {
    let mut engine = engine();
    engine.load_scene_description(&scene(FULL_SCENE));

    let report = engine.advance(0.016).unwrap();
    for pass in [RenderPass::Skybox, RenderPass::Geometry, RenderPass::Shadow, RenderPass::Composite] {
        assert!(report.ran(pass), "{pass}");
    }
    for kind in LightKind::ALL {
        assert_eq!(report.lights_drawn(kind), 1, "{kind}");
    }
    assert!(report.skipped.is_empty());
    assert_eq!(engine.surface().presented(), 1);
    assert!(engine.backend().commands().contains(&BackendCommand::Blit(RenderTarget::Final)));
}

#[test]
fn test_orbital_camera_follows_anchor() {
    let mut engine = engine();
    engine.load_scene_description(&scene(FULL_SCENE));
    engine.advance(0.016).unwrap();

    let camera = engine.camera_parameters().unwrap();
    assert_eq!(camera.position, Vec3::new(5.0, 1.0, 0.0));
    assert_relative_eq!(camera.radius, 12.0);
}

#[test]
fn test_missing_target_skips_pass_and_keeps_going() {
    let backend = HeadlessBackend::new().with_unready_target(RenderTarget::GBufferAlbedo);
    let mut engine = engine_with(EngineConfig::default(), backend, ScriptedSurface::new(640, 480));
    engine.load_scene_description(&scene(FULL_SCENE));

    let report = engine.advance(0.016).unwrap();
    assert_eq!(
        report.skip_reason(RenderPass::Geometry),
        Some(&RenderError::NotReady(RenderTarget::GBufferAlbedo))
    );
    assert!(!engine
        .backend()
        .commands()
        .contains(&BackendCommand::Clear(RenderTarget::GBufferPositions)));
    assert!(report.ran(RenderPass::Composite));
    assert_eq!(engine.surface().presented(), 1);
}

#[test]
fn test_digit_key_selects_debug_view() {
    let surface = ScriptedSurface::new(640, 480)
        .with_frame(vec![InputEvent::KeyPressed(KeyCode::Digit(2))])
        .with_frame(vec![InputEvent::DebugView(42)]);
    let mut engine = engine_with(EngineConfig::default(), HeadlessBackend::new(), surface);
    engine.load_scene_description(&scene(FULL_SCENE));

    let report = engine.advance(0.016).unwrap();
    assert_eq!(report.debug_view, Some(RenderTarget::DEBUG_VIEWS[1]));
    assert!(report.ran(RenderPass::DebugBlit));
    assert!(!report.ran(RenderPass::Composite));

    let report = engine.advance(0.016).unwrap();
    assert_eq!(engine.rendering().renderer().debug_view(), 0);
    assert_eq!(report.debug_view, None);
    assert!(report.ran(RenderPass::Composite));
}

#[test]
fn test_mouse_motion_turns_camera() {
    let surface = ScriptedSurface::new(640, 480).with_frame(vec![InputEvent::MouseMoved { dx: 10.0, dy: -4.0 }]);
    let mut engine = engine_with(EngineConfig::default(), HeadlessBackend::new(), surface);
    engine.load_scene_description(&scene(r#"(sceneobject: [])"#));
    engine.advance(0.016).unwrap();

    let rotation_speed = CameraParameters::DEFAULT_ROTATION_SPEED;
    let camera = engine.camera_parameters().unwrap();
    assert_relative_eq!(camera.rotation.y, -10.0 * rotation_speed * DEG_TO_RAD, epsilon = 1e-6);
    assert_relative_eq!(camera.rotation.x, 4.0 * rotation_speed * DEG_TO_RAD, epsilon = 1e-6);
}

#[test]
fn test_held_key_moves_first_person_camera() {
    let surface = ScriptedSurface::new(640, 480).with_frame(vec![InputEvent::KeyPressed(KeyCode::W)]);
    let mut engine = engine_with(EngineConfig::default(), HeadlessBackend::new(), surface);
    engine.load_scene_description(&scene(r#"(sceneobject: [])"#));

    engine.advance(1.0).unwrap();
    let first = engine.camera_parameters().unwrap().position;
    assert_relative_eq!(first.z, -CameraParameters::DEFAULT_POSITION_SPEED, epsilon = 1e-6);
    assert_relative_eq!(first.x, 0.0, epsilon = 1e-6);

    // still held on the next frame
    engine.advance(1.0).unwrap();
    let second = engine.camera_parameters().unwrap().position;
    assert_relative_eq!(second.z, -2.0 * CameraParameters::DEFAULT_POSITION_SPEED, epsilon = 1e-6);

    engine.handle_event(InputEvent::KeyReleased(KeyCode::W));
    engine.advance(1.0).unwrap();
    assert_eq!(engine.camera_parameters().unwrap().position, second);
}

#[test]
fn test_set_current_camera_replaces_and_applies_clip_planes() {
    let mut config = EngineConfig::default();
    config.renderer.near_plane = 0.5;
    config.renderer.far_plane = 250.0;
    let mut engine = engine_with(config, HeadlessBackend::new(), ScriptedSurface::new(640, 480));
    engine.load_scene_description(&scene(r#"(sceneobject: [])"#));
    assert_eq!(engine.current_camera().unwrap().kind(), CameraKind::FirstPerson);

    let parameters = CameraParameters {
        kind: CameraKind::Orbital,
        ..CameraParameters::default()
    };
    engine.set_current_camera(crate::camera::Camera::from_parameters(&parameters));

    let camera = engine.current_camera().unwrap();
    assert_eq!(camera.kind(), CameraKind::Orbital);
    assert_eq!(camera.state().clip_planes(), (0.5, 250.0));
}

#[test]
fn test_run_stops_at_frame_cap() {
    let config = EngineConfig::default().with_max_frames(3);
    let mut engine = engine_with(config, HeadlessBackend::new(), ScriptedSurface::new(640, 480));
    engine.load_scene_description(&scene(FULL_SCENE));

    assert_eq!(engine.run().unwrap(), 3);
    assert_eq!(engine.surface().presented(), 3);
    assert_eq!(engine.rendering().renderer().frame_count(), 3);
}

#[test]
fn test_escape_stops_run_after_current_frame() {
    let surface = ScriptedSurface::new(640, 480).with_frame(vec![InputEvent::KeyPressed(KeyCode::Escape)]);
    let mut engine = engine_with(EngineConfig::default(), HeadlessBackend::new(), surface);
    engine.load_scene_description(&scene(FULL_SCENE));

    assert_eq!(engine.run().unwrap(), 1);
    assert!(!engine.is_running());
}

#[test]
fn test_shutdown_runs_once_in_order() {
    let mut engine = engine();
    engine.load_scene_description(&scene(FULL_SCENE));
    engine.advance(0.016).unwrap();

    let steps = engine.shutdown();
    assert_eq!(
        steps,
        vec![
            TeardownStep::SceneCleared,
            TeardownStep::CameraReleased,
            TeardownStep::LightsCleared,
            TeardownStep::RendererReleased,
            TeardownStep::SurfaceClosed,
        ]
    );
    assert!(engine.scene().is_empty());
    assert!(engine.rendering().lights().is_empty());
    assert!(engine.backend().is_released());
    assert!(engine.surface().is_closed());
    assert!(matches!(engine.current_camera(), Err(EngineError::NoCurrentCamera)));

    assert!(engine.shutdown().is_empty());
    assert_eq!(
        engine
            .backend()
            .commands()
            .iter()
            .filter(|command| **command == BackendCommand::ReleaseTargets)
            .count(),
        1
    );
}

#[test]
fn test_scene_file_round_trip_and_missing_file() {
    let dir = std::env::temp_dir().join(format!("deferred_engine_scene_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("scene.ron");
    std::fs::write(&path, FULL_SCENE).unwrap();

    let mut engine = engine();
    let report = engine.load_scene(&path).unwrap();
    assert_eq!(report.lights.len(), 4);

    let missing = engine.load_scene(dir.join("missing.ron"));
    assert!(matches!(missing, Err(EngineError::Scene(SceneError::Description(ConfigError::Io(_))))));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = EngineConfig::default();
    config.window.width = 0;
    let result = Engine::new(config, HeadlessBackend::new(), ScriptedSurface::new(0, 0), MemoryLibrary::new());
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
}

fn last_projection(commands: &[BackendCommand]) -> Mat4 {
    commands
        .iter()
        .rev()
        .find_map(|command| match command {
            BackendCommand::SetParameter(name, ParamValue::Mat4(matrix)) if name == "projection" => Some(*matrix),
            _ => None,
        })
        .unwrap()
}

#[test]
fn test_projection_follows_surface_size() {
    let surface = ScriptedSurface::new(640, 320)
        .with_frame(Vec::new())
        .with_frame(vec![InputEvent::Resized { width: 900, height: 900 }]);
    let mut engine = engine_with(EngineConfig::default(), HeadlessBackend::new(), surface);
    engine.load_scene_description(&scene(FULL_SCENE));
    assert_eq!((engine.config().window.width, engine.config().window.height), (640, 320));

    engine.advance(0.016).unwrap();
    let projection = last_projection(&engine.backend_mut().take_commands());
    assert_relative_eq!(projection[(1, 1)] / projection[(0, 0)], 2.0, epsilon = 1e-5);

    engine.advance(0.016).unwrap();
    let projection = last_projection(&engine.backend_mut().take_commands());
    assert_relative_eq!(engine.config().window.aspect_ratio(), 1.0);
    assert_relative_eq!(projection[(1, 1)], projection[(0, 0)], epsilon = 1e-5);
}

#[test]
fn test_configured_shadow_map_size_reaches_shadow_pass() {
    let mut config = EngineConfig::default();
    config.renderer.shadow_map_size = 512;
    let mut engine = engine_with(config, HeadlessBackend::new(), ScriptedSurface::new(640, 480));
    engine.load_scene_description(&scene(FULL_SCENE));

    let report = engine.advance(0.016).unwrap();
    assert!(report.ran(RenderPass::Shadow));
    assert_eq!(engine.rendering().renderer().shadow_map_size(), 512);
    assert!(engine
        .backend()
        .commands()
        .contains(&BackendCommand::SetParameter("shadowMapSize".to_string(), ParamValue::Int(512))));
}
