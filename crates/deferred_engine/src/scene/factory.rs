//! Object factory
//!
//! Builds component trees from named object descriptions. Descriptions are registered up
//! front or read lazily from `<object_dir>/<name>.ron`, and cached once parsed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::foundation::math::{Transform, Vec3};
use crate::render::ResourceLibrary;

use super::components::{
    CameraComponent, Component, CompositeComponent, MovementComponent, PlayerComponent, RenderComponent,
};
use super::SceneError;

/// Named blueprint of a component tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectDescription {
    /// Name the scene description refers to
    pub name: String,
    /// Direct children of the root composite
    pub components: Vec<ComponentDescription>,
}

impl Config for ObjectDescription {}

/// Blueprint of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentDescription {
    /// Mesh placed relative to the owner
    Render {
        /// Mesh resource name
        mesh: String,
        /// Offset from the owner
        #[serde(default)]
        offset: [f32; 3],
        /// Euler rotation in radians
        #[serde(default)]
        rotation: [f32; 3],
        /// Uniform scale
        #[serde(default = "unit_scale")]
        scale: f32,
    },
    /// Camera anchor
    Camera {
        /// Pivot offset from the owner
        #[serde(default)]
        offset: [f32; 3],
    },
    /// Heading and speed
    Movement {
        /// Speed limit (0 = none)
        #[serde(default)]
        max_speed: f32,
    },
    /// Analog controller
    Player {
        /// Turn rate in radians per second
        rotation_speed: f32,
        /// Speed at full stick deflection
        max_speed: f32,
    },
    /// Nested composite
    Composite(ObjectDescription),
}

fn unit_scale() -> f32 {
    1.0
}

/// Creates component trees by name
#[derive(Debug, Clone)]
pub struct ObjectFactory {
    object_dir: PathBuf,
    descriptions: HashMap<String, ObjectDescription>,
}

impl ObjectFactory {
    /// Create a factory reading descriptions from `object_dir`
    pub fn new(object_dir: impl Into<PathBuf>) -> Self {
        Self {
            object_dir: object_dir.into(),
            descriptions: HashMap::new(),
        }
    }

    /// Directory descriptions are read from
    pub fn object_dir(&self) -> &Path {
        &self.object_dir
    }

    /// Register a description, replacing any with the same name
    pub fn register(&mut self, description: ObjectDescription) {
        log::debug!("Registered object description '{}'", description.name);
        self.descriptions.insert(description.name.clone(), description);
    }

    /// Whether a description is known without touching the filesystem
    pub fn is_registered(&self, name: &str) -> bool {
        self.descriptions.contains_key(name)
    }

    /// Build the tree for `name`; `None` when the description or one of its resources is missing
    ///
    /// Failures are logged here so callers can simply skip the placement.
    pub fn load_object<R: ResourceLibrary + ?Sized>(&mut self, name: &str, resources: &R) -> Option<CompositeComponent> {
        match self.try_load_object(name, resources) {
            Ok(object) => Some(object),
            Err(error) => {
                log::warn!("Cannot create object '{}': {}", name, error);
                None
            }
        }
    }

    /// Build the tree for `name`, reporting why it failed
    pub fn try_load_object<R: ResourceLibrary + ?Sized>(
        &mut self,
        name: &str,
        resources: &R,
    ) -> Result<CompositeComponent, SceneError> {
        let description = self.description(name)?;
        build(&description, resources)
    }

    fn description(&mut self, name: &str) -> Result<ObjectDescription, SceneError> {
        if let Some(description) = self.descriptions.get(name) {
            return Ok(description.clone());
        }

        let path = self.object_dir.join(format!("{name}.ron"));
        if !path.is_file() {
            return Err(SceneError::ResourceMissing {
                kind: "object",
                name: name.to_string(),
            });
        }
        let mut description = ObjectDescription::load_from_file(&path)?;
        if description.name.is_empty() {
            description.name = name.to_string();
        }
        log::debug!("Loaded object description '{}' from {}", name, path.display());
        self.descriptions.insert(name.to_string(), description.clone());
        Ok(description)
    }
}

fn build<R: ResourceLibrary + ?Sized>(
    description: &ObjectDescription,
    resources: &R,
) -> Result<CompositeComponent, SceneError> {
    let mut composite = CompositeComponent::new(description.name.as_str());
    for component in &description.components {
        let child = match component {
            ComponentDescription::Render { mesh, offset, rotation, scale } => {
                let handle = resources.load_mesh(mesh).ok_or_else(|| SceneError::ResourceMissing {
                    kind: "mesh",
                    name: mesh.clone(),
                })?;
                let local = Transform::from_placement(Vec3::from(*offset), Vec3::from(*rotation), *scale);
                Component::Render(RenderComponent::new(mesh.as_str(), handle, local))
            }
            ComponentDescription::Camera { offset } => Component::Camera(CameraComponent::new(Vec3::from(*offset))),
            ComponentDescription::Movement { max_speed } => Component::Movement(MovementComponent::new(*max_speed)),
            ComponentDescription::Player { rotation_speed, max_speed } => {
                Component::Player(PlayerComponent::new(*rotation_speed, *max_speed))
            }
            ComponentDescription::Composite(nested) => Component::Composite(build(nested, resources)?),
        };
        composite.add_child(child);
    }
    Ok(composite)
}
