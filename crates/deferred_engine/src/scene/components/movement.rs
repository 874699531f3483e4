//! Movement component for objects that travel along a heading
//!
//! Heading is a rotation around the up axis; zero faces -Z, matching the camera convention.

use crate::foundation::math::{utils, Vec3};

/// Heading and speed requested by a controller (see [`super::PlayerComponent`])
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    /// Target heading in radians
    pub heading: f32,
    /// Target speed in units per second
    pub speed: f32,
}

/// Component for objects that move
#[derive(Debug, Clone, PartialEq)]
pub struct MovementComponent {
    /// Heading in radians around the up axis
    pub heading: f32,

    /// Speed in units per second
    pub speed: f32,

    /// Speed limit (0 = no limit)
    pub max_speed: f32,
}

impl Default for MovementComponent {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl MovementComponent {
    /// Create a stationary movement component with a speed limit
    pub fn new(max_speed: f32) -> Self {
        Self {
            heading: 0.0,
            speed: 0.0,
            max_speed: max_speed.max(0.0),
        }
    }

    /// Apply a controller's steering
    pub fn steer(&mut self, steering: Steering) {
        self.heading = utils::wrap_angle(steering.heading);
        self.speed = if self.max_speed > 0.0 {
            steering.speed.clamp(0.0, self.max_speed)
        } else {
            steering.speed.max(0.0)
        };
    }

    /// Unit vector of the current heading
    pub fn forward(&self) -> Vec3 {
        utils::direction_from_angles(0.0, self.heading)
    }

    /// Velocity in units per second
    pub fn velocity(&self) -> Vec3 {
        self.forward() * self.speed
    }

    /// Displacement over `delta_time` seconds
    pub fn displacement(&self, delta_time: f32) -> Vec3 {
        self.velocity() * delta_time
    }
}
