//! # Engine Configuration
//!
//! Configuration records for the engine context: presentation surface size, logging,
//! scene/object locations, renderer tuning and timing. Every field has a default so a
//! partial TOML or RON file is enough to start the engine.

use serde::{Serialize, Deserialize};

use crate::config::Config;

/// # Window Configuration
///
/// Size and title handed to the presentation surface on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Window width in pixels
    pub width: u32,
    /// Window height in pixels
    pub height: u32,
}

impl WindowConfig {
    /// Width / height ratio used for the projection matrix
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Deferred Engine".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// # Renderer Configuration
///
/// Tuning for the deferred pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Intermediate buffer to display instead of the composite (0 = final composite)
    pub debug_view: i32,
    /// Edge length of the square shadow map used by shadow-casting spot lights
    pub shadow_map_size: u32,
    /// Distance to near clipping plane
    pub near_plane: f32,
    /// Distance to far clipping plane
    pub far_plane: f32,
}

impl RendererConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.near_plane <= 0.0 {
            return Err("Near plane must be greater than zero".to_string());
        }
        if self.far_plane <= self.near_plane {
            return Err("Far plane must be beyond the near plane".to_string());
        }
        if self.shadow_map_size == 0 {
            return Err("Shadow map size must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            debug_view: 0,
            shadow_map_size: 1024,
            near_plane: 0.1,
            far_plane: 1000.0,
        }
    }
}

/// # Engine Configuration
///
/// Top-level configuration applications load at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Presentation surface configuration
    pub window: WindowConfig,
    /// Default log filter (overridden by `RUST_LOG`)
    pub log_level: String,
    /// Scene description to load at startup
    pub scene_path: Option<String>,
    /// Directory holding named object descriptions for the object factory
    pub object_dir: String,
    /// Renderer configuration
    pub renderer: RendererConfig,
    /// Multiplier applied to frame time before gameplay updates
    pub time_scale: f32,
    /// Multiplier applied to mouse deltas before they reach the camera
    pub mouse_sensitivity: f32,
    /// Stop the frame loop after this many frames (headless runs)
    pub max_frames: Option<u64>,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            window: WindowConfig::default(),
            log_level: "info".to_string(),
            scene_path: None,
            object_dir: "resources/objects".to_string(),
            renderer: RendererConfig::default(),
            time_scale: 1.0,
            mouse_sensitivity: 1.0,
            max_frames: None,
        }
    }

    /// Set the scene to load at startup
    pub fn with_scene(mut self, path: impl Into<String>) -> Self {
        self.scene_path = Some(path.into());
        self
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Cap the number of frames the loop runs
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err("Window dimensions must be non-zero".to_string());
        }
        if self.time_scale < 0.0 {
            return Err("Time scale cannot be negative".to_string());
        }
        self.renderer.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}
