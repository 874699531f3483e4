//! Multi-pass deferred renderer
//!
//! Every frame runs the same sequence of passes against a [`GpuBackend`]:
//!
//! 1. **Geometry**: clears the GBuffer, draws the skybox first, then every render item
//! 2. **Shadow**: renders one shadow map layer per shadow-casting spot light
//! 3. **Lighting**: accumulates every light, one shading program per light kind
//! 4. **Composite**: combines albedo and light accumulation with post-processing, or, when a
//!    debug view is selected, blits that intermediate target to the screen instead
//!
//! A pass whose target is not allocated is skipped and the target keeps its previous content.
//! A pass whose program is not ready clears its targets instead. Either way the frame goes on
//! and the skip shows up in the returned [`FrameReport`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::core::RendererConfig;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{BackendResult, GpuBackend, MeshHandle, ParamValue, RenderTarget, ShadingProgram};
use crate::render::lighting::{LightCollections, LightKind};
use crate::render::RenderError;

/// Color lookup table used when a scene names none
pub const NEUTRAL_COLOR_LUT: &str = "textures/neutral_lut.ron";

/// Post-processing parameters handed to the composite pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessParameters {
    /// Tone mapping key value
    pub tone_mapping_key: f32,
    /// Glow intensity multiplier
    pub glow_multiplier: f32,
    /// Bright pass threshold
    pub bright_pass_threshold: f32,
    /// Bright pass offset
    pub bright_pass_offset: f32,
    /// Eye adaptation base time
    pub adaptation_base_time: f32,
    /// Color lookup table texture
    pub color_lut: String,
}

impl Default for PostProcessParameters {
    fn default() -> Self {
        Self {
            tone_mapping_key: 0.5,
            glow_multiplier: 1.0,
            bright_pass_threshold: 1.0,
            bright_pass_offset: 10.0,
            adaptation_base_time: 0.9,
            color_lut: NEUTRAL_COLOR_LUT.to_string(),
        }
    }
}

/// A mesh to draw in the geometry pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    /// Mesh resource
    pub mesh: MeshHandle,
    /// World matrix
    pub model: Mat4,
}

/// Skybox drawn behind the scene
#[derive(Debug, Clone, PartialEq)]
pub struct Skybox {
    /// Uniform scale of the sky dome
    pub scale: f32,
    /// Cube map material; `None` when it did not resolve
    pub material: Option<String>,
}

/// Scene data the renderer consumes for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// Geometry to rasterize
    pub items: &'a [RenderItem],
    /// Optional skybox
    pub skybox: Option<&'a Skybox>,
    /// Viewport width over height
    pub aspect_ratio: f32,
}

/// Passes a frame can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPass {
    /// GBuffer fill
    Geometry,
    /// Skybox draw inside the geometry pass
    Skybox,
    /// Shadow map rendering
    Shadow,
    /// Light accumulation for one light kind
    Lighting(LightKind),
    /// Final composition
    Composite,
    /// Debug view blit replacing the composite
    DebugBlit,
}

impl fmt::Display for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lighting(kind) => write!(f, "lighting ({kind})"),
            other => write!(f, "{}", format!("{other:?}").to_lowercase()),
        }
    }
}

/// A pass that did not run and why
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPass {
    /// The pass
    pub pass: RenderPass,
    /// Missing resource
    pub reason: RenderError,
}

/// What a frame did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Frame number, starting at 1
    pub frame: u64,
    /// Passes that ran, in order
    pub executed: Vec<RenderPass>,
    /// Passes that were skipped
    pub skipped: Vec<SkippedPass>,
    /// Lights accumulated per kind
    pub lights_drawn: HashMap<LightKind, usize>,
    /// Intermediate target shown instead of the composite
    pub debug_view: Option<RenderTarget>,
}

impl FrameReport {
    /// Whether a pass ran
    pub fn ran(&self, pass: RenderPass) -> bool {
        self.executed.contains(&pass)
    }

    /// Reason a pass was skipped, if it was
    pub fn skip_reason(&self, pass: RenderPass) -> Option<&RenderError> {
        self.skipped.iter().find(|skipped| skipped.pass == pass).map(|skipped| &skipped.reason)
    }

    /// Lights of a kind accumulated this frame
    pub fn lights_drawn(&self, kind: LightKind) -> usize {
        self.lights_drawn.get(&kind).copied().unwrap_or(0)
    }
}

/// Program used to accumulate a light kind
fn program_for(kind: LightKind) -> ShadingProgram {
    match kind {
        LightKind::Omni => ShadingProgram::Omni,
        LightKind::Spot => ShadingProgram::Spot,
        LightKind::SpotShadow => ShadingProgram::SpotShadow,
        LightKind::Directional => ShadingProgram::Directional,
    }
}

fn check_ready<B: GpuBackend + ?Sized>(
    backend: &B,
    targets: &[RenderTarget],
    programs: &[ShadingProgram],
) -> BackendResult<()> {
    if let Some(target) = targets.iter().find(|target| !backend.target_ready(**target)) {
        return Err(RenderError::NotReady(*target));
    }
    if let Some(program) = programs.iter().find(|program| !backend.program_ready(**program)) {
        return Err(RenderError::ProgramNotReady(*program));
    }
    Ok(())
}

fn clear_targets<B: GpuBackend + ?Sized>(backend: &mut B, targets: &[RenderTarget]) -> BackendResult<()> {
    backend.begin_pass(targets)?;
    for target in targets {
        backend.clear_target(*target)?;
    }
    backend.end_pass()
}

/// Camera matrices shared by every pass of a frame
struct FrameMatrices {
    view: Mat4,
    projection: Mat4,
    camera_position: Vec3,
}

impl FrameMatrices {
    fn upload<B: GpuBackend + ?Sized>(&self, backend: &mut B) -> BackendResult<()> {
        backend.set_parameter("view", ParamValue::Mat4(self.view))?;
        backend.set_parameter("projection", ParamValue::Mat4(self.projection))?;
        backend.set_parameter("cameraPosition", ParamValue::Vec3(self.camera_position))
    }
}

/// Deferred renderer state: debug view selection and post-processing parameters
#[derive(Debug, Clone)]
pub struct DeferredRenderer {
    debug_view: i32,
    shadow_map_size: u32,
    post_process: PostProcessParameters,
    frame_count: u64,
}

impl Default for DeferredRenderer {
    fn default() -> Self {
        Self::new(&RendererConfig::default())
    }
}

impl DeferredRenderer {
    /// Create a renderer
    pub fn new(config: &RendererConfig) -> Self {
        let mut renderer = Self {
            debug_view: 0,
            shadow_map_size: config.shadow_map_size.max(1),
            post_process: PostProcessParameters::default(),
            frame_count: 0,
        };
        renderer.set_debug_view(config.debug_view);
        renderer
    }

    /// Select what reaches the screen: 0 = composite, N = Nth intermediate target
    ///
    /// Out-of-range values are logged and fall back to the composite.
    pub fn set_debug_view(&mut self, view: i32) {
        let in_range = usize::try_from(view).is_ok_and(|index| index <= RenderTarget::DEBUG_VIEWS.len());
        if in_range {
            if view != self.debug_view {
                log::info!("Debug view set to {}", view);
            }
            self.debug_view = view;
        } else {
            log::warn!(
                "Debug view {} out of range (0..={}), showing composite",
                view,
                RenderTarget::DEBUG_VIEWS.len()
            );
            self.debug_view = 0;
        }
    }

    /// Selected debug view
    pub fn debug_view(&self) -> i32 {
        self.debug_view
    }

    /// Intermediate target shown instead of the composite
    pub fn debug_target(&self) -> Option<RenderTarget> {
        let index = usize::try_from(self.debug_view).ok()?.checked_sub(1)?;
        RenderTarget::DEBUG_VIEWS.get(index).copied()
    }

    /// Replace the post-processing parameters
    pub fn set_post_process_parameters(&mut self, parameters: PostProcessParameters) {
        self.post_process = parameters;
    }

    /// Current post-processing parameters
    pub fn post_process_parameters(&self) -> &PostProcessParameters {
        &self.post_process
    }

    /// Edge length of each shadow map layer in texels
    pub fn shadow_map_size(&self) -> u32 {
        self.shadow_map_size
    }

    /// Frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Render one frame
    ///
    /// Fails only on a stale camera or a backend error; missing targets and programs
    /// become skipped passes in the report.
    pub fn render<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        camera: &Camera,
        lights: &LightCollections,
        frame: &FrameInput<'_>,
    ) -> Result<FrameReport, RenderError> {
        let matrices = FrameMatrices {
            view: *camera.view_matrix()?,
            projection: camera.projection_matrix(frame.aspect_ratio),
            camera_position: camera.state().position(),
        };

        self.frame_count += 1;
        let mut report = FrameReport {
            frame: self.frame_count,
            ..FrameReport::default()
        };

        self.geometry_pass(backend, &matrices, frame, &mut report)?;
        if !lights.spot_shadow().is_empty() {
            let result = check_ready(backend, &[RenderTarget::ShadowMap], &[ShadingProgram::ShadowDepth])
                .and_then(|()| self.shadow_pass(backend, lights, frame));
            Self::settle(backend, &mut report, RenderPass::Shadow, &[RenderTarget::ShadowMap], result)?;
        }
        Self::lighting_pass(backend, &matrices, lights, &mut report)?;

        match self.debug_target() {
            Some(target) => {
                let result = check_ready(backend, &[target], &[ShadingProgram::DebugBlit])
                    .and_then(|()| Self::debug_blit(backend, target));
                if Self::settle(backend, &mut report, RenderPass::DebugBlit, &[], result)? {
                    report.debug_view = Some(target);
                }
            }
            None => {
                let result = check_ready(backend, &[RenderTarget::Final], &[ShadingProgram::Composite])
                    .and_then(|()| self.composite_pass(backend, camera));
                Self::settle(backend, &mut report, RenderPass::Composite, &[RenderTarget::Final], result)?;
            }
        }

        log::trace!(
            "Frame {}: {} passes run, {} skipped",
            report.frame,
            report.executed.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Release every GPU-side target through the backend
    pub fn release<B: GpuBackend + ?Sized>(&mut self, backend: &mut B) {
        backend.release_targets();
        log::info!("Renderer targets released after {} frames", self.frame_count);
    }

    /// Turn a pass result into a report entry; `Ok(true)` when the pass ran
    ///
    /// When only the program was missing, `targets` are cleared so they don't show stale content.
    fn settle<B: GpuBackend + ?Sized>(
        backend: &mut B,
        report: &mut FrameReport,
        pass: RenderPass,
        targets: &[RenderTarget],
        result: BackendResult<()>,
    ) -> Result<bool, RenderError> {
        match result {
            Ok(()) => {
                report.executed.push(pass);
                Ok(true)
            }
            Err(reason @ (RenderError::NotReady(_) | RenderError::ProgramNotReady(_))) => {
                log::warn!("Skipping {} pass: {}", pass, reason);
                if matches!(reason, RenderError::ProgramNotReady(_)) && !targets.is_empty() {
                    clear_targets(backend, targets)?;
                }
                report.skipped.push(SkippedPass { pass, reason });
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    fn geometry_pass<B: GpuBackend + ?Sized>(
        &self,
        backend: &mut B,
        matrices: &FrameMatrices,
        frame: &FrameInput<'_>,
        report: &mut FrameReport,
    ) -> Result<(), RenderError> {
        let ready = check_ready(backend, &RenderTarget::GBUFFER, &[ShadingProgram::Geometry]);
        if ready.is_err() {
            Self::settle(backend, report, RenderPass::Geometry, &RenderTarget::GBUFFER, ready)?;
            return Ok(());
        }

        backend.begin_pass(&RenderTarget::GBUFFER)?;
        for target in RenderTarget::GBUFFER {
            backend.clear_target(target)?;
        }

        if let Some(Skybox { scale, material: Some(material) }) = frame.skybox {
            if backend.program_ready(ShadingProgram::Skybox) {
                // sky follows the camera: rotation only
                let mut sky_view = matrices.view;
                sky_view.fixed_view_mut::<3, 1>(0, 3).fill(0.0);
                backend.bind_program(ShadingProgram::Skybox)?;
                backend.set_parameter("view", ParamValue::Mat4(sky_view))?;
                backend.set_parameter("projection", ParamValue::Mat4(matrices.projection))?;
                backend.set_parameter("skyboxScale", ParamValue::Float(*scale))?;
                backend.set_parameter("skyboxTexture", ParamValue::Texture(material.clone()))?;
                backend.draw_fullscreen_quad()?;
                report.executed.push(RenderPass::Skybox);
            } else {
                let reason = RenderError::ProgramNotReady(ShadingProgram::Skybox);
                log::warn!("Skipping {} pass: {}", RenderPass::Skybox, reason);
                report.skipped.push(SkippedPass { pass: RenderPass::Skybox, reason });
            }
        }

        backend.bind_program(ShadingProgram::Geometry)?;
        matrices.upload(backend)?;
        for item in frame.items {
            backend.draw_mesh(item.mesh, &item.model)?;
        }
        backend.end_pass()?;
        report.executed.push(RenderPass::Geometry);
        Ok(())
    }

    fn shadow_pass<B: GpuBackend + ?Sized>(
        &self,
        backend: &mut B,
        lights: &LightCollections,
        frame: &FrameInput<'_>,
    ) -> BackendResult<()> {
        backend.begin_pass(&[RenderTarget::ShadowMap])?;
        backend.clear_target(RenderTarget::ShadowMap)?;
        backend.bind_program(ShadingProgram::ShadowDepth)?;
        let size = i32::try_from(self.shadow_map_size).unwrap_or(i32::MAX);
        backend.set_parameter("shadowMapSize", ParamValue::Int(size))?;
        for (layer, light) in (0_i32..).zip(lights.spot_shadow()) {
            backend.set_parameter("shadowLayer", ParamValue::Int(layer))?;
            backend.set_parameter("lightViewProjection", ParamValue::Mat4(light.shadow_view_projection()))?;
            for item in frame.items {
                backend.draw_mesh(item.mesh, &item.model)?;
            }
        }
        backend.end_pass()
    }

    fn lighting_pass<B: GpuBackend + ?Sized>(
        backend: &mut B,
        matrices: &FrameMatrices,
        lights: &LightCollections,
        report: &mut FrameReport,
    ) -> Result<(), RenderError> {
        let kinds: Vec<LightKind> = LightKind::ALL.into_iter().filter(|kind| lights.count(*kind) > 0).collect();

        if let Err(reason) = check_ready(backend, &[RenderTarget::LightAccumulation], &[]) {
            for kind in kinds {
                Self::settle(backend, report, RenderPass::Lighting(kind), &[], Err(reason.clone()))?;
            }
            return Ok(());
        }

        backend.begin_pass(&[RenderTarget::LightAccumulation])?;
        backend.clear_target(RenderTarget::LightAccumulation)?;
        for kind in kinds {
            let program = program_for(kind);
            let ready = if kind == LightKind::SpotShadow {
                check_ready(backend, &[RenderTarget::ShadowMap], &[program])
            } else {
                check_ready(backend, &[], &[program])
            };
            let result = ready.and_then(|()| Self::accumulate(backend, matrices, lights, kind));
            if Self::settle(backend, report, RenderPass::Lighting(kind), &[], result)? {
                report.lights_drawn.insert(kind, lights.count(kind));
            }
        }
        backend.end_pass()
    }

    fn accumulate<B: GpuBackend + ?Sized>(
        backend: &mut B,
        matrices: &FrameMatrices,
        lights: &LightCollections,
        kind: LightKind,
    ) -> BackendResult<()> {
        backend.bind_program(program_for(kind))?;
        matrices.upload(backend)?;
        backend.set_parameter("gPositions", ParamValue::Target(RenderTarget::GBufferPositions))?;
        backend.set_parameter("gNormals", ParamValue::Target(RenderTarget::GBufferNormals))?;
        backend.set_parameter("gAlbedo", ParamValue::Target(RenderTarget::GBufferAlbedo))?;

        match kind {
            LightKind::Omni => {
                for light in lights.omni() {
                    backend.upload_uniform_block("OmniLight", bytemuck::bytes_of(&light.to_uniform()))?;
                    backend.draw_light_volume(&light.bounding_box())?;
                }
            }
            LightKind::Spot => {
                for light in lights.spot() {
                    backend.upload_uniform_block("SpotLight", bytemuck::bytes_of(&light.to_uniform()))?;
                    backend.draw_light_volume(&light.bounding_box())?;
                }
            }
            LightKind::SpotShadow => {
                backend.set_parameter("shadowMap", ParamValue::Target(RenderTarget::ShadowMap))?;
                for (layer, light) in (0_i32..).zip(lights.spot_shadow()) {
                    backend.set_parameter("shadowLayer", ParamValue::Int(layer))?;
                    backend.set_parameter("lightViewProjection", ParamValue::Mat4(light.shadow_view_projection()))?;
                    backend.upload_uniform_block("SpotLight", bytemuck::bytes_of(&light.spot.to_uniform()))?;
                    backend.draw_light_volume(&light.spot.bounding_box())?;
                }
            }
            LightKind::Directional => {
                for light in lights.directional() {
                    backend.upload_uniform_block("DirectionalLight", bytemuck::bytes_of(&light.to_uniform()))?;
                    backend.draw_fullscreen_quad()?;
                }
            }
        }
        Ok(())
    }

    fn composite_pass<B: GpuBackend + ?Sized>(&self, backend: &mut B, camera: &Camera) -> BackendResult<()> {
        let post = &self.post_process;
        backend.begin_pass(&[RenderTarget::Final])?;
        backend.bind_program(ShadingProgram::Composite)?;
        backend.set_parameter("gAlbedo", ParamValue::Target(RenderTarget::GBufferAlbedo))?;
        backend.set_parameter("lightAccumulation", ParamValue::Target(RenderTarget::LightAccumulation))?;
        backend.set_parameter("toneMappingKey", ParamValue::Float(post.tone_mapping_key))?;
        backend.set_parameter("glowMultiplier", ParamValue::Float(post.glow_multiplier))?;
        backend.set_parameter("brightPassThreshold", ParamValue::Float(post.bright_pass_threshold))?;
        backend.set_parameter("brightPassOffset", ParamValue::Float(post.bright_pass_offset))?;
        backend.set_parameter("adaptationBaseTime", ParamValue::Float(post.adaptation_base_time))?;
        backend.set_parameter("colorLUT", ParamValue::Texture(post.color_lut.clone()))?;
        backend.set_parameter("dofParameters", ParamValue::Vec4(camera.state().effective_dof()))?;
        backend.draw_fullscreen_quad()?;
        backend.end_pass()?;
        backend.blit_to_screen(RenderTarget::Final)
    }

    fn debug_blit<B: GpuBackend + ?Sized>(backend: &mut B, target: RenderTarget) -> BackendResult<()> {
        backend.bind_program(ShadingProgram::DebugBlit)?;
        backend.set_parameter("source", ParamValue::Target(target))?;
        backend.blit_to_screen(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraParameters;
    use crate::foundation::math::Vec4;
    use crate::render::headless::{BackendCommand, HeadlessBackend};
    use crate::render::lighting::{DirectionalLight, LightProperties, OmniLight, SceneLight, SpotLight, SpotShadow};

    fn camera() -> Camera {
        Camera::from_parameters(&CameraParameters::default())
    }

    fn all_lights() -> LightCollections {
        let mut lights = LightCollections::new();
        let spot = SpotLight::new(LightProperties::default(), 8.0, 0.3, 0.5);
        lights.insert(SceneLight::Omni(OmniLight::new(LightProperties::default(), 4.0)));
        lights.insert(SceneLight::Omni(OmniLight::new(LightProperties::default(), 2.0)));
        lights.insert(SceneLight::Spot(spot.clone()));
        lights.insert(SceneLight::SpotShadow(SpotShadow::new(spot)));
        lights.insert(SceneLight::Directional(DirectionalLight::new(LightProperties::default())));
        lights
    }

    fn items() -> Vec<RenderItem> {
        vec![RenderItem { mesh: MeshHandle(0), model: Mat4::identity() }]
    }

    fn frame(items: &[RenderItem]) -> FrameInput<'_> {
        FrameInput { items, skybox: None, aspect_ratio: 16.0 / 9.0 }
    }

    fn bound_programs(commands: &[BackendCommand]) -> Vec<ShadingProgram> {
        commands
            .iter()
            .filter_map(|command| match command {
                BackendCommand::BindProgram(program) => Some(*program),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_full_frame_runs_passes_in_order() {
        let mut renderer = DeferredRenderer::default();
        let mut backend = HeadlessBackend::new();
        let items = items();
        let report = renderer.render(&mut backend, &camera(), &all_lights(), &frame(&items)).unwrap();

        assert_eq!(
            report.executed,
            vec![
                RenderPass::Geometry,
                RenderPass::Shadow,
                RenderPass::Lighting(LightKind::Omni),
                RenderPass::Lighting(LightKind::Spot),
                RenderPass::Lighting(LightKind::SpotShadow),
                RenderPass::Lighting(LightKind::Directional),
                RenderPass::Composite,
            ]
        );
        assert!(report.skipped.is_empty());
        assert_eq!(report.lights_drawn(LightKind::Omni), 2);
        assert_eq!(report.lights_drawn(LightKind::Directional), 1);
        assert_eq!(
            bound_programs(backend.commands()),
            vec![
                ShadingProgram::Geometry,
                ShadingProgram::ShadowDepth,
                ShadingProgram::Omni,
                ShadingProgram::Spot,
                ShadingProgram::SpotShadow,
                ShadingProgram::Directional,
                ShadingProgram::Composite,
            ]
        );
        assert_eq!(backend.commands().last(), Some(&BackendCommand::Blit(RenderTarget::Final)));
    }

    #[test]
    fn test_light_volumes_per_light() {
        let mut renderer = DeferredRenderer::default();
        let mut backend = HeadlessBackend::new();
        renderer.render(&mut backend, &camera(), &all_lights(), &frame(&[])).unwrap();

        let volumes = backend
            .commands()
            .iter()
            .filter(|command| matches!(command, BackendCommand::DrawLightVolume(_)))
            .count();
        // two omni, one spot, one shadowed spot
        assert_eq!(volumes, 4);
    }

    #[test]
    fn test_missing_accumulation_target_skips_lighting() {
        let mut renderer = DeferredRenderer::default();
        let mut backend = HeadlessBackend::new().with_unready_target(RenderTarget::LightAccumulation);
        let items = items();
        let report = renderer.render(&mut backend, &camera(), &all_lights(), &frame(&items)).unwrap();

        for kind in LightKind::ALL {
            assert_eq!(
                report.skip_reason(RenderPass::Lighting(kind)),
                Some(&RenderError::NotReady(RenderTarget::LightAccumulation))
            );
            assert_eq!(report.lights_drawn(kind), 0);
        }
        assert!(report.ran(RenderPass::Geometry));
        assert!(report.ran(RenderPass::Composite));
        assert!(!backend
            .commands()
            .contains(&BackendCommand::BeginPass(vec![RenderTarget::LightAccumulation])));
    }

    #[test]
    fn test_missing_program_clears_targets() {
        let mut renderer = DeferredRenderer::default();
        let mut backend = HeadlessBackend::new().with_unready_program(ShadingProgram::Geometry);
        let report = renderer.render(&mut backend, &camera(), &LightCollections::new(), &frame(&[])).unwrap();

        assert_eq!(
            report.skip_reason(RenderPass::Geometry),
            Some(&RenderError::ProgramNotReady(ShadingProgram::Geometry))
        );
        let commands = backend.commands();
        assert_eq!(commands[0], BackendCommand::BeginPass(RenderTarget::GBUFFER.to_vec()));
        assert_eq!(commands[1], BackendCommand::Clear(RenderTarget::GBufferPositions));
        assert!(report.ran(RenderPass::Composite));
    }

    #[test]
    fn test_unready_light_program_skips_only_its_kind() {
        let mut renderer = DeferredRenderer::default();
        let mut backend = HeadlessBackend::new().with_unready_program(ShadingProgram::Spot);
        let report = renderer.render(&mut backend, &camera(), &all_lights(), &frame(&[])).unwrap();

        assert!(report.skip_reason(RenderPass::Lighting(LightKind::Spot)).is_some());
        assert!(report.ran(RenderPass::Lighting(LightKind::Omni)));
        assert!(report.ran(RenderPass::Lighting(LightKind::Directional)));
    }

    #[test]
    fn test_debug_view_short_circuits_composite() {
        let mut renderer = DeferredRenderer::default();
        renderer.set_debug_view(4);
        assert_eq!(renderer.debug_target(), Some(RenderTarget::LightAccumulation));

        let mut backend = HeadlessBackend::new();
        let report = renderer.render(&mut backend, &camera(), &all_lights(), &frame(&[])).unwrap();
        assert_eq!(report.debug_view, Some(RenderTarget::LightAccumulation));
        assert!(report.ran(RenderPass::DebugBlit));
        assert!(!report.ran(RenderPass::Composite));
        assert_eq!(backend.commands().last(), Some(&BackendCommand::Blit(RenderTarget::LightAccumulation)));
    }

    #[test]
    fn test_out_of_range_debug_view_shows_composite() {
        let mut renderer = DeferredRenderer::default();
        renderer.set_debug_view(2);
        renderer.set_debug_view(42);
        assert_eq!(renderer.debug_view(), 0);
        renderer.set_debug_view(-1);
        assert_eq!(renderer.debug_target(), None);
    }

    #[test]
    fn test_composite_uploads_post_process_parameters() {
        let mut renderer = DeferredRenderer::default();
        renderer.set_post_process_parameters(PostProcessParameters {
            tone_mapping_key: 0.25,
            color_lut: "textures/warm.ron".to_string(),
            ..PostProcessParameters::default()
        });
        let mut camera = camera();
        camera.set_motion(crate::camera::MotionFlags::DOF_NEAR_FORWARD, true);
        camera.update(1.0);

        let mut backend = HeadlessBackend::new();
        renderer.render(&mut backend, &camera, &LightCollections::new(), &frame(&[])).unwrap();
        let commands = backend.commands();
        assert!(commands.contains(&BackendCommand::SetParameter(
            "toneMappingKey".to_string(),
            ParamValue::Float(0.25)
        )));
        assert!(commands.contains(&BackendCommand::SetParameter(
            "colorLUT".to_string(),
            ParamValue::Texture("textures/warm.ron".to_string())
        )));
        let dof: Vec4 = camera.state().effective_dof();
        assert!(commands.contains(&BackendCommand::SetParameter("dofParameters".to_string(), ParamValue::Vec4(dof))));
    }

    #[test]
    fn test_skybox_drawn_before_geometry() {
        let mut renderer = DeferredRenderer::default();
        let mut backend = HeadlessBackend::new();
        let skybox = Skybox { scale: 500.0, material: Some("textures/sky".to_string()) };
        let items = items();
        let input = FrameInput { items: &items, skybox: Some(&skybox), aspect_ratio: 1.0 };
        let report = renderer.render(&mut backend, &camera(), &LightCollections::new(), &input).unwrap();

        assert_eq!(report.executed[..2], [RenderPass::Skybox, RenderPass::Geometry]);
        assert_eq!(
            bound_programs(backend.commands())[..2],
            [ShadingProgram::Skybox, ShadingProgram::Geometry]
        );
    }

    #[test]
    fn test_shadow_pass_uses_configured_map_size() {
        let config = RendererConfig { shadow_map_size: 2048, ..RendererConfig::default() };
        let mut renderer = DeferredRenderer::new(&config);
        assert_eq!(renderer.shadow_map_size(), 2048);

        let mut backend = HeadlessBackend::new();
        let items = items();
        renderer.render(&mut backend, &camera(), &all_lights(), &frame(&items)).unwrap();
        let commands = backend.commands();
        let bind = commands
            .iter()
            .position(|command| command == &BackendCommand::BindProgram(ShadingProgram::ShadowDepth))
            .unwrap();
        assert_eq!(
            commands[bind + 1],
            BackendCommand::SetParameter("shadowMapSize".to_string(), ParamValue::Int(2048))
        );
    }

    #[test]
    fn test_no_shadow_casters_binds_no_map_size() {
        let mut renderer = DeferredRenderer::default();
        let mut backend = HeadlessBackend::new();
        let mut lights = LightCollections::new();
        lights.insert(SceneLight::Omni(OmniLight::new(LightProperties::default(), 4.0)));
        renderer.render(&mut backend, &camera(), &lights, &frame(&[])).unwrap();

        assert!(!backend
            .commands()
            .iter()
            .any(|command| matches!(command, BackendCommand::SetParameter(name, _) if name == "shadowMapSize")));
    }

    #[test]
    fn test_stale_camera_is_rejected() {
        let mut renderer = DeferredRenderer::default();
        let mut camera = camera();
        camera.update_orientation(0.1, 0.0);
        let mut backend = HeadlessBackend::new();
        let result = renderer.render(&mut backend, &camera, &LightCollections::new(), &frame(&[]));
        assert!(matches!(result, Err(RenderError::InvalidCamera(_))));
        assert!(backend.commands().is_empty());
    }
}
