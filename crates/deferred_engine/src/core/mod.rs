//! # Core Engine Module
//!
//! Shared configuration records used by the engine context and applications.

pub mod config;

pub use config::{EngineConfig, RendererConfig, WindowConfig};

// Re-export the file-backed config trait next to the records it loads
pub use crate::config::{Config, ConfigError, ConfigFormat};
