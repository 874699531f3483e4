//! Orbital ("sphere") camera: input changes the orbit radius and angle around a pivot

use super::state::{CameraState, MotionFlags};
use crate::foundation::math::{utils, Vec3};

/// The camera never gets closer to its pivot than this
pub const MIN_ORBIT_RADIUS: f32 = 0.1;

/// Camera orbiting a pivot point at a given radius
///
/// The position is always `pivot - radius * direction`, so the camera keeps looking at the
/// pivot whatever the orientation.
#[derive(Debug, Clone)]
pub struct OrbitalCamera {
    state: CameraState,
    pivot: Vec3,
    radius: f32,
}

impl OrbitalCamera {
    /// Create an orbital camera; the state's position is taken as the pivot
    pub fn new(mut state: CameraState, radius: f32) -> Self {
        let pivot = state.position();
        let radius = radius.max(MIN_ORBIT_RADIUS);
        state.set_position(orbit_position(pivot, radius, state.rx(), state.ry()));
        state.recompute_derived();
        Self { state, pivot, radius }
    }

    /// Shared camera state
    pub fn state(&self) -> &CameraState {
        &self.state
    }

    /// Mutable shared camera state
    pub fn state_mut(&mut self) -> &mut CameraState {
        &mut self.state
    }

    /// Orbit centre
    pub fn pivot(&self) -> Vec3 {
        self.pivot
    }

    /// Distance to the pivot
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Move the orbit centre
    pub fn set_pivot(&mut self, pivot: Vec3) {
        if pivot != self.pivot {
            self.pivot = pivot;
            self.place();
        }
    }

    /// Accumulate orientation deltas and re-place the camera on its orbit
    pub fn update_orientation(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.state.update_orientation(delta_yaw, delta_pitch);
        self.place();
    }

    /// Forward/backward zoom, strafe orbits around the pivot
    pub fn update_digital(&mut self, flags: MotionFlags, delta_time: f32) {
        if flags.is_empty() {
            return;
        }
        let zoom_speed = self.state.position_speed() * delta_time;
        let orbit_speed = self.state.rotation_speed() * delta_time;

        if flags.contains(MotionFlags::FORWARD) {
            self.radius -= zoom_speed;
        }
        if flags.contains(MotionFlags::BACKWARD) {
            self.radius += zoom_speed;
        }
        let mut delta_yaw = 0.0;
        if flags.contains(MotionFlags::STRAFE_LEFT) {
            delta_yaw += orbit_speed;
        }
        if flags.contains(MotionFlags::STRAFE_RIGHT) {
            delta_yaw -= orbit_speed;
        }
        if flags.contains(MotionFlags::DOF_NEAR_FORWARD) {
            self.state.adjust_dof_offset(zoom_speed);
        }
        if flags.contains(MotionFlags::DOF_NEAR_BACKWARD) {
            self.state.adjust_dof_offset(-zoom_speed);
        }

        self.radius = self.radius.max(MIN_ORBIT_RADIUS);
        self.state.update_orientation(delta_yaw, 0.0);
        self.place();
    }

    /// Analog Y zooms, analog X orbits
    pub fn update_analog(&mut self, delta_time: f32) {
        let analog = self.state.analog();
        if analog.x == 0.0 && analog.y == 0.0 {
            return;
        }
        self.radius = (self.radius - self.state.position_speed() * delta_time * analog.y).max(MIN_ORBIT_RADIUS);
        self.state.update_orientation(-self.state.rotation_speed() * delta_time * analog.x, 0.0);
        self.place();
    }

    fn place(&mut self) {
        let position = orbit_position(self.pivot, self.radius, self.state.rx(), self.state.ry());
        self.state.set_position(position);
    }
}

fn orbit_position(pivot: Vec3, radius: f32, rx: f32, ry: f32) -> Vec3 {
    pivot - radius * utils::direction_from_angles(rx, ry)
}
