//! First-person camera: input moves the position directly along direction and right

use super::state::{CameraState, MotionFlags};
use crate::foundation::math::Vec3;

/// Position and dof offset change produced by one digital update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionDelta {
    /// World-space translation
    pub translation: Vec3,
    /// Change of the depth-of-field near offset
    pub dof_offset: f32,
}

/// Sum the contribution of every active flag
///
/// Flags combine without normalization, so diagonal motion is faster than axial motion.
/// Strafing only uses the horizontal components of the right vector.
pub fn digital_delta(flags: MotionFlags, speed: f32, delta_time: f32, direction: Vec3, right: Vec3) -> MotionDelta {
    let moving_speed = speed * delta_time;
    let mut translation = Vec3::zeros();
    let mut dof_offset = 0.0;

    if flags.contains(MotionFlags::FORWARD) {
        translation += moving_speed * direction;
    }
    if flags.contains(MotionFlags::BACKWARD) {
        translation -= moving_speed * direction;
    }
    if flags.contains(MotionFlags::STRAFE_LEFT) {
        translation.x += moving_speed * right.x;
        translation.z += moving_speed * right.z;
    }
    if flags.contains(MotionFlags::STRAFE_RIGHT) {
        translation.x -= moving_speed * right.x;
        translation.z -= moving_speed * right.z;
    }
    if flags.contains(MotionFlags::DOF_NEAR_FORWARD) {
        dof_offset += moving_speed;
    }
    if flags.contains(MotionFlags::DOF_NEAR_BACKWARD) {
        dof_offset -= moving_speed;
    }

    MotionDelta { translation, dof_offset }
}

/// Free-flying camera
#[derive(Debug, Clone)]
pub struct FirstPersonCamera {
    state: CameraState,
}

impl FirstPersonCamera {
    /// Wrap a camera state
    pub fn new(state: CameraState) -> Self {
        Self { state }
    }

    /// Shared camera state
    pub fn state(&self) -> &CameraState {
        &self.state
    }

    /// Mutable shared camera state
    pub fn state_mut(&mut self) -> &mut CameraState {
        &mut self.state
    }

    /// Apply the active motion flags for `delta_time` seconds
    pub fn update_digital(&mut self, flags: MotionFlags, delta_time: f32) {
        if flags.is_empty() {
            return;
        }
        let delta = digital_delta(
            flags,
            self.state.position_speed(),
            delta_time,
            self.state.direction(),
            self.state.right(),
        );
        self.state.translate(delta.translation);
        self.state.adjust_dof_offset(delta.dof_offset);
    }

    /// Apply the stored analog stick values for `delta_time` seconds
    pub fn update_analog(&mut self, delta_time: f32) {
        let analog = self.state.analog();
        if analog.x == 0.0 && analog.y == 0.0 {
            return;
        }
        let moving_speed = self.state.position_speed() * delta_time;
        let right = self.state.right();
        let mut translation = moving_speed * self.state.direction() * analog.y;
        translation.x -= moving_speed * right.x * analog.x;
        translation.z -= moving_speed * right.z * analog.x;
        self.state.translate(translation);
    }
}
