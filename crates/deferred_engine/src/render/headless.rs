//! Headless backend, resource library and surface
//!
//! Runs the full pipeline without a GPU or a window. Every backend call is appended to a
//! command log, which is what the demo prints and what the tests assert against.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::foundation::bounds::AABB;
use crate::foundation::math::Mat4;
use crate::input::InputEvent;
use crate::render::backend::{
    BackendResult, GpuBackend, MeshHandle, ParamValue, PresentationSurface, RenderTarget, ResourceLibrary,
    ShadingProgram,
};
use crate::render::RenderError;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// `begin_pass`
    BeginPass(Vec<RenderTarget>),
    /// `clear_target`
    Clear(RenderTarget),
    /// `bind_program`
    BindProgram(ShadingProgram),
    /// `set_parameter`
    SetParameter(String, ParamValue),
    /// `upload_uniform_block`, with the uploaded size in bytes
    UploadUniform(String, usize),
    /// `draw_mesh`
    DrawMesh(MeshHandle, Mat4),
    /// `draw_fullscreen_quad`
    DrawFullscreenQuad,
    /// `draw_light_volume`
    DrawLightVolume(AABB),
    /// `end_pass`
    EndPass,
    /// `blit_to_screen`
    Blit(RenderTarget),
    /// `release_targets`
    ReleaseTargets,
}

/// Backend that records commands instead of issuing them
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    commands: Vec<BackendCommand>,
    unready_targets: HashSet<RenderTarget>,
    unready_programs: HashSet<ShadingProgram>,
    released: bool,
}

impl HeadlessBackend {
    /// Create a backend with every target and program ready
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a target as not allocated
    pub fn with_unready_target(mut self, target: RenderTarget) -> Self {
        self.unready_targets.insert(target);
        self
    }

    /// Mark a program as not compiled
    pub fn with_unready_program(mut self, program: ShadingProgram) -> Self {
        self.unready_programs.insert(program);
        self
    }

    /// Set the readiness of a target
    pub fn set_target_ready(&mut self, target: RenderTarget, ready: bool) {
        if ready {
            self.unready_targets.remove(&target);
        } else {
            self.unready_targets.insert(target);
        }
    }

    /// Commands recorded so far
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the log empty
    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Whether `release_targets` was called
    pub fn is_released(&self) -> bool {
        self.released
    }

    fn record(&mut self, command: BackendCommand) -> BackendResult<()> {
        if self.released {
            return Err(RenderError::Backend(format!("{command:?} issued after targets were released")));
        }
        log::trace!("backend: {:?}", command);
        self.commands.push(command);
        Ok(())
    }
}

impl GpuBackend for HeadlessBackend {
    fn target_ready(&self, target: RenderTarget) -> bool {
        !self.released && !self.unready_targets.contains(&target)
    }

    fn program_ready(&self, program: ShadingProgram) -> bool {
        !self.released && !self.unready_programs.contains(&program)
    }

    fn begin_pass(&mut self, targets: &[RenderTarget]) -> BackendResult<()> {
        if let Some(target) = targets.iter().find(|target| !self.target_ready(**target)) {
            return Err(RenderError::NotReady(*target));
        }
        self.record(BackendCommand::BeginPass(targets.to_vec()))
    }

    fn clear_target(&mut self, target: RenderTarget) -> BackendResult<()> {
        self.record(BackendCommand::Clear(target))
    }

    fn bind_program(&mut self, program: ShadingProgram) -> BackendResult<()> {
        if !self.program_ready(program) {
            return Err(RenderError::ProgramNotReady(program));
        }
        self.record(BackendCommand::BindProgram(program))
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) -> BackendResult<()> {
        self.record(BackendCommand::SetParameter(name.to_string(), value))
    }

    fn upload_uniform_block(&mut self, name: &str, data: &[u8]) -> BackendResult<()> {
        self.record(BackendCommand::UploadUniform(name.to_string(), data.len()))
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, model: &Mat4) -> BackendResult<()> {
        self.record(BackendCommand::DrawMesh(mesh, *model))
    }

    fn draw_fullscreen_quad(&mut self) -> BackendResult<()> {
        self.record(BackendCommand::DrawFullscreenQuad)
    }

    fn draw_light_volume(&mut self, bounds: &AABB) -> BackendResult<()> {
        self.record(BackendCommand::DrawLightVolume(*bounds))
    }

    fn end_pass(&mut self) -> BackendResult<()> {
        self.record(BackendCommand::EndPass)
    }

    fn blit_to_screen(&mut self, source: RenderTarget) -> BackendResult<()> {
        if !self.target_ready(source) {
            return Err(RenderError::NotReady(source));
        }
        self.record(BackendCommand::Blit(source))
    }

    fn release_targets(&mut self) {
        if !self.released {
            self.commands.push(BackendCommand::ReleaseTargets);
            self.released = true;
        }
    }
}

/// In-memory resource library
#[derive(Debug, Default, Clone)]
pub struct MemoryLibrary {
    meshes: HashMap<String, MeshHandle>,
    textures: HashSet<String>,
}

impl MemoryLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh under a name, returning its handle
    pub fn add_mesh(&mut self, name: impl Into<String>) -> MeshHandle {
        let next = MeshHandle(u32::try_from(self.meshes.len()).unwrap_or(u32::MAX));
        *self.meshes.entry(name.into()).or_insert(next)
    }

    /// Register a texture or material name
    pub fn add_texture(&mut self, name: impl Into<String>) {
        self.textures.insert(name.into());
    }

    /// Builder form of [`MemoryLibrary::add_mesh`]
    pub fn with_mesh(mut self, name: impl Into<String>) -> Self {
        self.add_mesh(name);
        self
    }

    /// Builder form of [`MemoryLibrary::add_texture`]
    pub fn with_texture(mut self, name: impl Into<String>) -> Self {
        self.add_texture(name);
        self
    }
}

impl ResourceLibrary for MemoryLibrary {
    fn load_mesh(&self, name: &str) -> Option<MeshHandle> {
        self.meshes.get(name).copied()
    }

    fn has_texture(&self, name: &str) -> bool {
        self.textures.contains(name)
    }
}

/// Offscreen surface that replays scripted input, one batch per frame
#[derive(Debug)]
pub struct ScriptedSurface {
    width: u32,
    height: u32,
    script: VecDeque<Vec<InputEvent>>,
    presented: u64,
    closed: bool,
}

impl ScriptedSurface {
    /// Create a surface of the given size with no scripted input
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            script: VecDeque::new(),
            presented: 0,
            closed: false,
        }
    }

    /// Queue the events returned by the next unscripted `poll_input`
    pub fn push_frame(&mut self, events: Vec<InputEvent>) {
        self.script.push_back(events);
    }

    /// Builder form of [`ScriptedSurface::push_frame`]
    pub fn with_frame(mut self, events: Vec<InputEvent>) -> Self {
        self.push_frame(events);
        self
    }

    /// Number of frames presented
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl PresentationSurface for ScriptedSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    fn present(&mut self) -> Result<(), String> {
        if self.closed {
            return Err("present on a closed surface".to_string());
        }
        self.presented += 1;
        Ok(())
    }

    fn poll_input(&mut self) -> Vec<InputEvent> {
        self.script.pop_front().unwrap_or_default()
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
