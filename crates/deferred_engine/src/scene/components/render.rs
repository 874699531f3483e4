//! Render component: a mesh placed relative to its owner

use crate::foundation::math::{Mat4, Transform};
use crate::render::{MeshHandle, RenderItem};

/// Mesh-bearing leaf of a component tree
#[derive(Debug, Clone, PartialEq)]
pub struct RenderComponent {
    mesh_name: String,
    mesh: MeshHandle,
    /// Placement relative to the owning composite
    pub local: Transform,
    world: Mat4,
}

impl RenderComponent {
    /// Create a render component for a resolved mesh
    pub fn new(mesh_name: impl Into<String>, mesh: MeshHandle, local: Transform) -> Self {
        let world = local.to_matrix();
        Self {
            mesh_name: mesh_name.into(),
            mesh,
            local,
            world,
        }
    }

    /// Resource name the mesh was loaded from
    pub fn mesh_name(&self) -> &str {
        &self.mesh_name
    }

    /// Mesh handle
    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    /// World matrix from the last propagation
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    /// Place this mesh under its owner's world matrix
    pub fn set_parent_matrix(&mut self, parent: &Mat4) {
        self.world = parent * self.local.to_matrix();
    }

    /// Draw request for the geometry pass
    pub fn render_item(&self) -> RenderItem {
        RenderItem {
            mesh: self.mesh,
            model: self.world,
        }
    }
}
