//! # Rendering System
//!
//! Deferred rendering over an abstract GPU backend.
//!
//! ## Architecture
//!
//! - **Backend traits**: [`GpuBackend`], [`ResourceLibrary`] and [`PresentationSurface`] are the
//!   only contact points with a graphics API, asset storage and the window system
//! - **Lighting**: the four light kinds and their per-kind collections
//! - **Deferred renderer**: geometry, shadow, lighting and composite passes with a debug view
//! - **Rendering context**: owns the renderer and the light collections the scene loader fills
//! - **Headless**: a command-recording backend used by tests and the demo viewer

pub mod backend;
pub mod deferred;
pub mod headless;
pub mod lighting;

use thiserror::Error;

use crate::camera::{Camera, CameraError};
use crate::core::RendererConfig;

pub use backend::{
    BackendResult, GpuBackend, MeshHandle, ParamValue, PresentationSurface, RenderTarget, ResourceLibrary,
    ShadingProgram,
};
pub use deferred::{
    DeferredRenderer, FrameInput, FrameReport, PostProcessParameters, RenderItem, RenderPass, Skybox, SkippedPass,
    NEUTRAL_COLOR_LUT,
};
pub use lighting::{
    DirectionalLight, LightCollections, LightKind, LightProperties, OmniLight, SceneLight, SpotLight, SpotShadow,
};

/// High-level rendering error types
///
/// Missing targets and programs are recoverable: the renderer turns them into skipped passes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A render target is not allocated
    #[error("Render target {0} is not ready")]
    NotReady(RenderTarget),

    /// A shading program is not compiled or linked
    #[error("Shading program {0} is not ready")]
    ProgramNotReady(ShadingProgram),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// The camera's derived state is stale
    #[error("Invalid camera: {0}")]
    InvalidCamera(#[from] CameraError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Renderer plus the light collections it draws
///
/// The scene loader fills the collections; the renderer walks them every frame.
#[derive(Debug, Default)]
pub struct RenderingContext {
    renderer: DeferredRenderer,
    lights: LightCollections,
}

impl RenderingContext {
    /// Create a context with empty light collections
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            renderer: DeferredRenderer::new(config),
            lights: LightCollections::new(),
        }
    }

    /// The deferred renderer
    pub fn renderer(&self) -> &DeferredRenderer {
        &self.renderer
    }

    /// Mutable access to the deferred renderer
    pub fn renderer_mut(&mut self) -> &mut DeferredRenderer {
        &mut self.renderer
    }

    /// Light collections
    pub fn lights(&self) -> &LightCollections {
        &self.lights
    }

    /// Mutable light collections, filled during scene load
    pub fn lights_mut(&mut self) -> &mut LightCollections {
        &mut self.lights
    }

    /// Render one frame from a camera
    pub fn render<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        camera: &Camera,
        frame: &FrameInput<'_>,
    ) -> RenderResult<FrameReport> {
        self.renderer.render(backend, camera, &self.lights, frame)
    }
}
