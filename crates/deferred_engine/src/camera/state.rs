//! Shared camera state and the derived-vector update
//!
//! Every camera variant owns one [`CameraState`]. Position and the two orientation angles are
//! the only inputs; direction, right vector and view matrix are derived from them by
//! [`CameraState::recompute_derived`] and are never written directly.

use bitflags::bitflags;

use super::CameraError;
use crate::foundation::math::{constants, utils, Mat4, Mat4Ext, Vec2, Vec3, Vec4, WORLD_UP};

/// Below this length the up/direction cross product is treated as degenerate
const DEGENERATE_CROSS_EPSILON: f32 = 1e-6;

bitflags! {
    /// Motion requests currently active on a camera
    ///
    /// Flags are independent; combined flags add their contributions without normalization.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MotionFlags: u32 {
        /// Move along the view direction
        const FORWARD = 1 << 0;
        /// Move against the view direction
        const BACKWARD = 1 << 1;
        /// Strafe along the right vector (horizontal components only)
        const STRAFE_LEFT = 1 << 2;
        /// Strafe against the right vector (horizontal components only)
        const STRAFE_RIGHT = 1 << 3;
        /// Push the depth-of-field near plane forward
        const DOF_NEAR_FORWARD = 1 << 4;
        /// Pull the depth-of-field near plane backward
        const DOF_NEAR_BACKWARD = 1 << 5;
    }
}

/// Operand order used to derive the right vector from up and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightDerivation {
    /// `cross(up, direction)`, used while pitch lies strictly inside (-π/2, π/2)
    UpCrossDirection,
    /// `cross(direction, up)`, used once the camera has pitched over a pole
    DirectionCrossUp,
}

impl RightDerivation {
    /// Pick the operand order for a pitch angle
    pub fn for_pitch(pitch: f32) -> Self {
        if pitch > -constants::HALF_PI && pitch < constants::HALF_PI {
            Self::UpCrossDirection
        } else {
            Self::DirectionCrossUp
        }
    }

    /// Compute the normalized right vector
    ///
    /// Exactly at a pole the cross product vanishes; both branches converge to the yaw-only
    /// horizontal vector there, which is used instead.
    pub fn right_vector(self, up: Vec3, direction: Vec3, yaw: f32) -> Vec3 {
        let right = match self {
            Self::UpCrossDirection => up.cross(&direction),
            Self::DirectionCrossUp => direction.cross(&up),
        };
        if right.norm() > DEGENERATE_CROSS_EPSILON {
            right.normalize()
        } else {
            Vec3::new(-yaw.cos(), 0.0, yaw.sin())
        }
    }
}

/// Camera state shared by all variants
#[derive(Debug, Clone)]
pub struct CameraState {
    position: Vec3,
    /// Pitch in radians
    rx: f32,
    /// Yaw in radians
    ry: f32,

    direction: Vec3,
    right: Vec3,
    up: Vec3,
    view_matrix: Mat4,

    /// Vertical field of view in degrees
    fov: f32,
    near: f32,
    far: f32,

    /// near blur, focal plane, far blur, max far blur
    dof: Vec4,
    dof_offset: f32,

    position_speed: f32,
    rotation_speed: f32,

    flags: MotionFlags,
    analog: Vec2,
    needs_update: bool,
}

impl CameraState {
    /// Create a camera state and compute its derived vectors
    pub fn new(position: Vec3, rotation: Vec2, fov: f32, dof: Vec4, speed: Vec2) -> Self {
        let mut state = Self {
            position,
            rx: rotation.x,
            ry: rotation.y,
            direction: Vec3::new(0.0, 0.0, -1.0),
            right: Vec3::new(-1.0, 0.0, 0.0),
            up: WORLD_UP,
            view_matrix: Mat4::identity(),
            fov,
            near: 0.1,
            far: 1000.0,
            dof,
            dof_offset: 0.0,
            position_speed: speed.x,
            rotation_speed: speed.y,
            flags: MotionFlags::empty(),
            analog: Vec2::zeros(),
            needs_update: true,
        };
        state.recompute_derived();
        state
    }

    /// Recompute direction, right vector and view matrix from position and angles
    pub fn recompute_derived(&mut self) {
        self.direction = utils::direction_from_angles(self.rx, self.ry);
        self.right = RightDerivation::for_pitch(self.rx).right_vector(self.up, self.direction, self.ry);
        self.view_matrix = Mat4::rotation_xy(-self.rx, self.ry) * Mat4::new_translation(&-self.position);
        self.needs_update = false;
        log::trace!(
            "Camera derived state recomputed: pos={:?} rX={:.3} rY={:.3}",
            self.position, self.rx, self.ry
        );
    }

    /// Cached view matrix
    ///
    /// Fails when position or orientation changed since the last [`Self::recompute_derived`].
    pub fn view_matrix(&self) -> Result<&Mat4, CameraError> {
        if self.needs_update {
            Err(CameraError::StaleDerivedState)
        } else {
            Ok(&self.view_matrix)
        }
    }

    /// Perspective projection for the given aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective(utils::deg_to_rad(self.fov), aspect, self.near, self.far)
    }

    /// Accumulate yaw and pitch deltas (radians). Pitch is not clamped.
    pub fn update_orientation(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.ry += delta_yaw;
        self.rx += delta_pitch;
        self.needs_update = true;
    }

    /// Overwrite both orientation angles
    pub fn set_orientation(&mut self, rx: f32, ry: f32) {
        self.rx = rx;
        self.ry = ry;
        self.needs_update = true;
    }

    /// Move the camera by a world-space offset
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.needs_update = true;
    }

    /// Place the camera at a world-space position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.needs_update = true;
    }

    /// Shift the depth-of-field near plane offset
    pub fn adjust_dof_offset(&mut self, delta: f32) {
        self.dof_offset += delta;
    }

    /// Set or clear motion flags
    pub fn set_motion(&mut self, flags: MotionFlags, active: bool) {
        self.flags.set(flags, active);
    }

    /// Store analog stick values, clamped to [-1, 1]
    pub fn set_analog(&mut self, x: f32, y: f32) {
        self.analog = Vec2::new(x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0));
    }

    /// Override the clipping planes
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Pitch angle in radians
    pub fn rx(&self) -> f32 {
        self.rx
    }

    /// Yaw angle in radians
    pub fn ry(&self) -> f32 {
        self.ry
    }

    /// Derived view direction
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Derived right vector (`cross(up, direction)` in the upright branch)
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Up axis
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Vertical field of view in degrees
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Near and far clipping planes
    pub fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// Depth-of-field parameters as authored
    pub fn dof_parameters(&self) -> Vec4 {
        self.dof
    }

    /// Depth-of-field parameters with the near offset applied to near blur and focal plane
    pub fn effective_dof(&self) -> Vec4 {
        Vec4::new(self.dof.x + self.dof_offset, self.dof.y + self.dof_offset, self.dof.z, self.dof.w)
    }

    /// Accumulated dof near offset
    pub fn dof_offset(&self) -> f32 {
        self.dof_offset
    }

    /// Position speed in units per second
    pub fn position_speed(&self) -> f32 {
        self.position_speed
    }

    /// Rotation speed
    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    /// Active motion flags
    pub fn motion_flags(&self) -> MotionFlags {
        self.flags
    }

    /// Stored analog values (x, y)
    pub fn analog(&self) -> Vec2 {
        self.analog
    }

    /// Whether derived state is stale
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state_with(rx: f32, ry: f32) -> CameraState {
        CameraState::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec2::new(rx, ry),
            45.0,
            Vec4::new(-10.0, 15.0, 150.0, 1.0),
            Vec2::new(0.05, 0.1),
        )
    }

    #[test]
    fn test_branch_selection_follows_open_interval() {
        for i in -99..=99 {
            let pitch = constants::HALF_PI * i as f32 / 100.0;
            assert_eq!(RightDerivation::for_pitch(pitch), RightDerivation::UpCrossDirection);
        }
        for &pitch in &[constants::HALF_PI, -constants::HALF_PI, 2.0, -2.0, constants::PI, 4.0, -5.5] {
            assert_eq!(RightDerivation::for_pitch(pitch), RightDerivation::DirectionCrossUp);
        }
    }

    #[test]
    fn test_right_vector_uses_selected_cross_product() {
        let upright = state_with(0.4, 1.3);
        let expected = WORLD_UP.cross(&upright.direction()).normalize();
        assert_relative_eq!(upright.right(), expected, epsilon = 1e-6);

        let flipped = state_with(2.2, 1.3);
        let expected = flipped.direction().cross(&WORLD_UP).normalize();
        assert_relative_eq!(flipped.right(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_right_vector_is_unit_length_everywhere() {
        for i in -40..=40 {
            for j in -8..=8 {
                let rx = i as f32 * 0.1;
                let ry = j as f32 * 0.4;
                let state = state_with(rx, ry);
                assert_relative_eq!(state.right().norm(), 1.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_right_vector_at_exact_pole_falls_back_to_yaw() {
        let state = state_with(constants::HALF_PI, 0.7);
        assert_relative_eq!(state.right().norm(), 1.0, epsilon = 1e-5);
        assert!(state.right().y.abs() < 1e-5);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut state = state_with(0.3, -0.8);
        let first = *state.view_matrix().unwrap();
        state.recompute_derived();
        let second = *state.view_matrix().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_view_matrix_places_camera_at_origin_looking_down_negative_z() {
        let state = state_with(-0.5, 2.1);
        let view = state.view_matrix().unwrap();
        let eye = view.transform_point(&nalgebra::Point3::from(state.position()));
        assert_relative_eq!(eye.coords, Vec3::zeros(), epsilon = 1e-5);

        let ahead = view.transform_point(&nalgebra::Point3::from(state.position() + state.direction()));
        assert_relative_eq!(ahead.coords, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_mutation_marks_view_matrix_stale() {
        let mut state = state_with(0.0, 0.0);
        state.update_orientation(0.1, 0.2);
        assert!(matches!(state.view_matrix(), Err(CameraError::StaleDerivedState)));

        state.recompute_derived();
        assert_relative_eq!(state.ry(), 0.1);
        assert_relative_eq!(state.rx(), 0.2);
        assert!(state.view_matrix().is_ok());

        state.translate(Vec3::new(1.0, 0.0, 0.0));
        assert!(state.needs_update());
    }

    #[test]
    fn test_pitch_is_not_clamped() {
        let mut state = state_with(0.0, 0.0);
        state.update_orientation(0.0, 3.0);
        state.recompute_derived();
        assert_relative_eq!(state.rx(), 3.0);
    }

    #[test]
    fn test_analog_values_are_clamped() {
        let mut state = state_with(0.0, 0.0);
        state.set_analog(2.0, -3.0);
        assert_eq!(state.analog(), Vec2::new(1.0, -1.0));
    }
}
