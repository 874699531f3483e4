//! # Deferred Engine
//!
//! Engine core for scene-graph driven deferred rendering.
//!
//! ## Features
//!
//! - **Cameras**: first-person and orbital variants behind one update contract
//! - **Declarative scenes**: RON or TOML scene descriptions with defaults for every attribute
//! - **Component trees**: objects composed from render, camera, movement and player components
//! - **Lighting**: omni, spot, shadow-casting spot and directional lights in separate collections
//! - **Deferred pipeline**: geometry, shadow, lighting and composite passes with a debug view
//! - **Headless backend**: the whole frame runs without a GPU, recording backend commands
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deferred_engine::prelude::*;
//! use deferred_engine::render::headless::{HeadlessBackend, MemoryLibrary, ScriptedSurface};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default()
//!         .with_scene("resources/scenes/demo_scene.ron")
//!         .with_max_frames(60);
//!     let surface = ScriptedSurface::new(config.window.width, config.window.height);
//!     let mut engine = Engine::new(config, HeadlessBackend::new(), surface, MemoryLibrary::new())?;
//!     engine.run()?;
//!     engine.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;

pub mod camera;
pub mod input;
pub mod render;
pub mod scene;

mod engine;

#[cfg(test)]
mod engine_tests;

pub use engine::{Engine, EngineError, TeardownStep};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        camera::{Camera, CameraKind, CameraParameters, MotionFlags},
        core::{Config, ConfigFormat, EngineConfig, RendererConfig, WindowConfig},
        foundation::{
            bounds::AABB,
            math::{Mat4, Transform, Vec2, Vec3, Vec4},
            time::TimeContext,
        },
        input::{InputEvent, KeyBindings, KeyCode},
        render::{
            FrameInput, FrameReport, GpuBackend, LightCollections, LightKind, PresentationSurface, RenderError,
            RenderPass, RenderTarget, RenderingContext, ResourceLibrary, SceneLight,
        },
        scene::{CompositeComponent, ObjectFactory, SceneDescription, SceneError, SceneGraph},
        Engine, EngineError, TeardownStep,
    };
}
