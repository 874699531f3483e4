//! Backend abstraction traits for the rendering system
//!
//! The deferred renderer never talks to a graphics API directly. It drives a [`GpuBackend`]
//! (render targets, shading programs, named parameters, draws) and reads resources through a
//! [`ResourceLibrary`]. Frames end up on a [`PresentationSurface`], which also hands back the
//! input events gathered since the last frame.

use std::fmt;

use crate::foundation::bounds::AABB;
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::input::InputEvent;
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// GPU-side render targets used by the deferred pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// World-space positions
    GBufferPositions,
    /// World-space normals
    GBufferNormals,
    /// Albedo and material ids
    GBufferAlbedo,
    /// Accumulated light contribution
    LightAccumulation,
    /// Layered shadow map for shadow-casting spot lights
    ShadowMap,
    /// Composited frame
    Final,
}

impl RenderTarget {
    /// Targets written by the geometry pass
    pub const GBUFFER: [RenderTarget; 3] = [Self::GBufferPositions, Self::GBufferNormals, Self::GBufferAlbedo];

    /// Intermediate targets a debug view can show; debug view `N` shows entry `N - 1`
    pub const DEBUG_VIEWS: [RenderTarget; 5] = [
        Self::GBufferPositions,
        Self::GBufferNormals,
        Self::GBufferAlbedo,
        Self::LightAccumulation,
        Self::ShadowMap,
    ];

    /// Every target the renderer allocates
    pub const ALL: [RenderTarget; 6] = [
        Self::GBufferPositions,
        Self::GBufferNormals,
        Self::GBufferAlbedo,
        Self::LightAccumulation,
        Self::ShadowMap,
        Self::Final,
    ];
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GBufferPositions => "gbuffer.positions",
            Self::GBufferNormals => "gbuffer.normals",
            Self::GBufferAlbedo => "gbuffer.albedo",
            Self::LightAccumulation => "light_accumulation",
            Self::ShadowMap => "shadow_map",
            Self::Final => "final",
        };
        f.write_str(name)
    }
}

/// Shading programs the pipeline binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingProgram {
    /// Writes the GBuffer
    Geometry,
    /// Draws the skybox behind the scene
    Skybox,
    /// Point light accumulation
    Omni,
    /// Spot light accumulation
    Spot,
    /// Spot light accumulation with shadow map lookup
    SpotShadow,
    /// Directional light accumulation
    Directional,
    /// Depth-only shadow map rendering
    ShadowDepth,
    /// Final composition and post-processing
    Composite,
    /// Copies an intermediate target to the screen
    DebugBlit,
}

impl fmt::Display for ShadingProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Value of a named program parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Scalar
    Float(f32),
    /// Integer
    Int(i32),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// 4x4 matrix
    Mat4(Mat4),
    /// Texture resource by name
    Texture(String),
    /// Render target sampled as a texture
    Target(RenderTarget),
}

/// Opaque handle to a mesh owned by the resource library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Main rendering backend trait
///
/// Implementations own the render targets and compiled programs. Readiness is queried
/// before every pass so the renderer can skip work instead of failing the frame.
pub trait GpuBackend {
    /// Whether a render target is allocated
    fn target_ready(&self, target: RenderTarget) -> bool;

    /// Whether a program is compiled and linked
    fn program_ready(&self, program: ShadingProgram) -> bool;

    /// Start rendering into a set of targets
    fn begin_pass(&mut self, targets: &[RenderTarget]) -> BackendResult<()>;

    /// Clear a target to its neutral value
    fn clear_target(&mut self, target: RenderTarget) -> BackendResult<()>;

    /// Activate a program for subsequent draws
    fn bind_program(&mut self, program: ShadingProgram) -> BackendResult<()>;

    /// Set a named parameter on the bound program
    fn set_parameter(&mut self, name: &str, value: ParamValue) -> BackendResult<()>;

    /// Upload a named uniform block for the bound program
    fn upload_uniform_block(&mut self, name: &str, data: &[u8]) -> BackendResult<()>;

    /// Draw a mesh with a model matrix
    fn draw_mesh(&mut self, mesh: MeshHandle, model: &Mat4) -> BackendResult<()>;

    /// Draw a screen-covering quad
    fn draw_fullscreen_quad(&mut self) -> BackendResult<()>;

    /// Draw the proxy geometry bounding a light's area of influence
    fn draw_light_volume(&mut self, bounds: &AABB) -> BackendResult<()>;

    /// Finish the current pass
    fn end_pass(&mut self) -> BackendResult<()>;

    /// Copy a target to the screen
    fn blit_to_screen(&mut self, source: RenderTarget) -> BackendResult<()>;

    /// Free every render target and program
    fn release_targets(&mut self);
}

/// Load-by-name access to shared resources
pub trait ResourceLibrary {
    /// Look up a mesh; `None` when the resource is missing
    fn load_mesh(&self, name: &str) -> Option<MeshHandle>;

    /// Whether a texture or material resolves
    fn has_texture(&self, name: &str) -> bool;
}

/// Window or offscreen surface frames are presented to
pub trait PresentationSurface {
    /// Current size in pixels
    fn size(&self) -> (u32, u32);

    /// Resize the surface
    fn resize(&mut self, width: u32, height: u32);

    /// Present the finished frame
    fn present(&mut self) -> Result<(), String>;

    /// Drain input events gathered since the last call
    fn poll_input(&mut self) -> Vec<InputEvent>;

    /// Destroy the surface
    fn close(&mut self);
}
