//! # Scene Management
//!
//! - [`description`]: the declarative scene document and its defaults
//! - [`components`]: component trees built for each scene object
//! - [`factory`]: named object descriptions turned into component trees
//! - [`scene_graph`]: the loaded roots, updated once per frame in load order

pub mod components;
pub mod description;
pub mod factory;
pub mod scene_graph;

use thiserror::Error;

use crate::config::ConfigError;

pub use components::{Component, ComponentType, CompositeComponent};
pub use description::{SceneDescription, SceneSettings};
pub use factory::{ComponentDescription, ObjectDescription, ObjectFactory};
pub use scene_graph::{LoadReport, LoadedScene, ObjectHandle, SceneGraph};

/// Scene loading errors
///
/// Apart from `Description`, these describe a single element; the loader logs them and
/// moves on to the next one.
#[derive(Error, Debug)]
pub enum SceneError {
    /// A malformed element
    #[error("Malformed {element}: {reason}")]
    Load {
        /// Element name
        element: String,
        /// What is wrong with it
        reason: String,
    },

    /// A resource lookup failed
    #[error("Missing {kind} '{name}'")]
    ResourceMissing {
        /// Resource kind (object, mesh, texture)
        kind: &'static str,
        /// Resource name
        name: String,
    },

    /// A light type token matched no light kind
    #[error("Unknown light type '{0}'")]
    UnknownLightType(String),

    /// The description document could not be read
    #[error("Scene description error: {0}")]
    Description(#[from] ConfigError),
}
