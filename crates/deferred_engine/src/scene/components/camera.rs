//! Camera component: anchors the orbital camera's pivot to an object

use crate::foundation::math::Vec3;

/// Marks an object the camera follows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraComponent {
    /// Pivot offset from the owner's position
    pub offset: Vec3,
}

impl CameraComponent {
    /// Create an anchor with an offset
    pub fn new(offset: Vec3) -> Self {
        Self { offset }
    }

    /// Pivot for an owner at `owner_position`
    pub fn anchor(&self, owner_position: Vec3) -> Vec3 {
        owner_position + self.offset
    }
}
