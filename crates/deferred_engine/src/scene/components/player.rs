//! Player component: turns analog stick input into steering
//!
//! Each tick the player turns from its current heading towards the stick heading along the
//! shorter way round the circle, never faster than its rotation speed, and hands the result
//! to the sibling [`super::MovementComponent`].

use crate::foundation::math::{constants, utils};

use super::movement::Steering;

/// Stick magnitude under which input is ignored
pub const DEAD_ZONE: f32 = 0.1;

/// Analog-driven controller
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerComponent {
    analog_x: f32,
    analog_y: f32,
    /// Rotation around the up axis
    ry: f32,
    /// Rotation around the right axis
    rx: f32,
    /// Maximum turn rate in radians per second
    pub rotation_speed: f32,
    /// Speed at full stick deflection
    pub max_speed: f32,
}

impl PlayerComponent {
    /// Create a player facing -Z
    pub fn new(rotation_speed: f32, max_speed: f32) -> Self {
        Self {
            analog_x: 0.0,
            analog_y: 0.0,
            ry: 0.0,
            rx: 0.0,
            rotation_speed,
            max_speed,
        }
    }

    /// Horizontal stick value in [-1, 1]
    pub fn set_analog_x(&mut self, value: f32) {
        self.analog_x = value.clamp(-1.0, 1.0);
    }

    /// Vertical stick value in [-1, 1]
    pub fn set_analog_y(&mut self, value: f32) {
        self.analog_y = value.clamp(-1.0, 1.0);
    }

    /// Add to the yaw (`alpha`) and pitch (`phi`) angles
    pub fn update_angles(&mut self, add_to_alpha: f32, add_to_phi: f32) {
        self.ry = utils::wrap_angle(self.ry + add_to_alpha);
        self.rx += add_to_phi;
    }

    /// Current heading in radians, in [0, 2π)
    pub fn heading(&self) -> f32 {
        self.ry
    }

    /// Accumulated pitch in radians
    pub fn pitch(&self) -> f32 {
        self.rx
    }

    /// Heading the stick points at, if it is outside the dead zone
    pub fn stick_heading(&self) -> Option<f32> {
        (self.stick_magnitude() > DEAD_ZONE).then(|| (-self.analog_x).atan2(self.analog_y))
    }

    fn stick_magnitude(&self) -> f32 {
        self.analog_x.hypot(self.analog_y).min(1.0)
    }

    /// Turn towards the stick for `delta_time` seconds and produce the steering to apply
    pub fn update(&mut self, delta_time: f32) -> Steering {
        let Some(target) = self.stick_heading() else {
            return Steering { heading: self.ry, speed: 0.0 };
        };

        let difference = angle_difference(self.ry, target);
        let step = (self.rotation_speed * delta_time).min(difference.abs());
        self.ry = utils::wrap_angle(self.ry + step * rotation_direction(self.ry, target));

        Steering {
            heading: self.ry,
            speed: self.max_speed * self.stick_magnitude(),
        }
    }
}

/// Which way to turn from `current` to reach `destination`: 1, -1 or 0 when already there
pub fn rotation_direction(current: f32, destination: f32) -> f32 {
    let difference = angle_difference(current, destination);
    if difference > f32::EPSILON {
        1.0
    } else if difference < -f32::EPSILON {
        -1.0
    } else {
        0.0
    }
}

/// Shortest signed rotation from `from` to `to`, in (-π, π]
pub fn angle_difference(from: f32, to: f32) -> f32 {
    let difference = (to - from).rem_euclid(constants::TAU);
    if difference > constants::PI {
        difference - constants::TAU
    } else {
        difference
    }
}
