//! # Camera System
//!
//! Cameras are a closed family of variants sharing one [`CameraState`] and one update
//! contract:
//!
//! - [`Camera::update_orientation`] accumulates yaw/pitch deltas
//! - [`Camera::update_digital`] / [`Camera::update_analog`] turn input into motion; this is the
//!   only place the variants differ
//! - [`Camera::recompute_derived`] rebuilds direction, right vector and view matrix
//! - [`Camera::view_matrix`] reads the cached matrix and refuses to hand out a stale one
//!
//! Cameras are built from [`CameraParameters`], the record a scene description resolves to.

mod state;
mod first_person;
mod orbital;

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::config::Config;
use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};

pub use state::{CameraState, MotionFlags, RightDerivation};
pub use first_person::{digital_delta, FirstPersonCamera, MotionDelta};
pub use orbital::{OrbitalCamera, MIN_ORBIT_RADIUS};

/// Camera errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// The view matrix was requested after a mutation without recomputing derived state
    #[error("View matrix read before derived camera state was recomputed")]
    StaleDerivedState,
}

/// Camera variant selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraKind {
    /// Free-flying camera ("firstperson")
    #[default]
    FirstPerson,
    /// Camera orbiting a pivot ("sphere")
    Orbital,
}

impl CameraKind {
    /// Token used in scene descriptions
    pub fn token(self) -> &'static str {
        match self {
            Self::FirstPerson => "firstperson",
            Self::Orbital => "sphere",
        }
    }
}

impl fmt::Display for CameraKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for CameraKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firstperson" => Ok(Self::FirstPerson),
            "sphere" => Ok(Self::Orbital),
            other => Err(format!("unknown camera type '{other}'")),
        }
    }
}

/// Everything needed to construct a camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParameters {
    /// Variant to build
    pub kind: CameraKind,
    /// Position (first-person) or pivot (orbital)
    pub position: Vec3,
    /// Pitch (x) and yaw (y) in radians
    pub rotation: Vec2,
    /// Orbit radius, only used by the orbital variant
    pub radius: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// near blur, focal plane, far blur, max far blur
    pub dof: Vec4,
    /// Position speed
    pub position_speed: f32,
    /// Rotation speed
    pub rotation_speed: f32,
}

impl CameraParameters {
    /// Default field of view in degrees
    pub const DEFAULT_FOV: f32 = 45.0;
    /// Default depth-of-field vector
    pub const DEFAULT_DOF: [f32; 4] = [-10.0, 15.0, 150.0, 1.0];
    /// Default position speed
    pub const DEFAULT_POSITION_SPEED: f32 = 0.05;
    /// Default rotation speed
    pub const DEFAULT_ROTATION_SPEED: f32 = 0.1;
    /// Default orbit radius
    pub const DEFAULT_RADIUS: f32 = 10.0;
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            kind: CameraKind::FirstPerson,
            position: Vec3::zeros(),
            rotation: Vec2::zeros(),
            radius: Self::DEFAULT_RADIUS,
            fov: Self::DEFAULT_FOV,
            dof: Vec4::from(Self::DEFAULT_DOF),
            position_speed: Self::DEFAULT_POSITION_SPEED,
            rotation_speed: Self::DEFAULT_ROTATION_SPEED,
        }
    }
}

impl Config for CameraParameters {}

/// The camera family
#[derive(Debug, Clone)]
pub enum Camera {
    /// First-person camera
    FirstPerson(FirstPersonCamera),
    /// Orbital camera
    Orbital(OrbitalCamera),
}

impl Camera {
    /// Build a camera from its parameters; derived state is valid on return
    pub fn from_parameters(parameters: &CameraParameters) -> Self {
        let state = CameraState::new(
            parameters.position,
            parameters.rotation,
            parameters.fov,
            parameters.dof,
            Vec2::new(parameters.position_speed, parameters.rotation_speed),
        );
        match parameters.kind {
            CameraKind::FirstPerson => Self::FirstPerson(FirstPersonCamera::new(state)),
            CameraKind::Orbital => Self::Orbital(OrbitalCamera::new(state, parameters.radius)),
        }
    }

    /// Snapshot the parameters that rebuild this camera in its current pose
    pub fn parameters(&self) -> CameraParameters {
        let state = self.state();
        let (position, radius) = match self {
            Self::FirstPerson(_) => (state.position(), CameraParameters::DEFAULT_RADIUS),
            Self::Orbital(camera) => (camera.pivot(), camera.radius()),
        };
        CameraParameters {
            kind: self.kind(),
            position,
            rotation: Vec2::new(state.rx(), state.ry()),
            radius,
            fov: state.fov(),
            dof: state.dof_parameters(),
            position_speed: state.position_speed(),
            rotation_speed: state.rotation_speed(),
        }
    }

    /// Variant of this camera
    pub fn kind(&self) -> CameraKind {
        match self {
            Self::FirstPerson(_) => CameraKind::FirstPerson,
            Self::Orbital(_) => CameraKind::Orbital,
        }
    }

    /// Shared camera state
    pub fn state(&self) -> &CameraState {
        match self {
            Self::FirstPerson(camera) => camera.state(),
            Self::Orbital(camera) => camera.state(),
        }
    }

    fn state_mut(&mut self) -> &mut CameraState {
        match self {
            Self::FirstPerson(camera) => camera.state_mut(),
            Self::Orbital(camera) => camera.state_mut(),
        }
    }

    /// Accumulate yaw and pitch deltas in radians
    pub fn update_orientation(&mut self, delta_yaw: f32, delta_pitch: f32) {
        match self {
            Self::FirstPerson(camera) => camera.state_mut().update_orientation(delta_yaw, delta_pitch),
            Self::Orbital(camera) => camera.update_orientation(delta_yaw, delta_pitch),
        }
    }

    /// Apply motion flags for `delta_time` seconds
    pub fn update_digital(&mut self, flags: MotionFlags, delta_time: f32) {
        match self {
            Self::FirstPerson(camera) => camera.update_digital(flags, delta_time),
            Self::Orbital(camera) => camera.update_digital(flags, delta_time),
        }
    }

    /// Apply the stored analog values for `delta_time` seconds
    pub fn update_analog(&mut self, delta_time: f32) {
        match self {
            Self::FirstPerson(camera) => camera.update_analog(delta_time),
            Self::Orbital(camera) => camera.update_analog(delta_time),
        }
    }

    /// Recompute direction, right vector and view matrix
    pub fn recompute_derived(&mut self) {
        self.state_mut().recompute_derived();
    }

    /// Per-frame update: stored flags, stored analog values, then derived state if dirty
    pub fn update(&mut self, delta_time: f32) {
        let flags = self.state().motion_flags();
        self.update_digital(flags, delta_time);
        self.update_analog(delta_time);
        if self.state().needs_update() {
            self.recompute_derived();
        }
    }

    /// Cached view matrix
    pub fn view_matrix(&self) -> Result<&Mat4, CameraError> {
        self.state().view_matrix()
    }

    /// Projection matrix for an aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        self.state().projection_matrix(aspect)
    }

    /// Set or clear motion flags
    pub fn set_motion(&mut self, flags: MotionFlags, active: bool) {
        self.state_mut().set_motion(flags, active);
    }

    /// Store analog stick values
    pub fn set_analog(&mut self, x: f32, y: f32) {
        self.state_mut().set_analog(x, y);
    }

    /// Override the clipping planes
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.state_mut().set_clip_planes(near, far);
    }

    /// Re-centre an orbital camera; first-person cameras ignore pivots
    pub fn set_pivot(&mut self, pivot: Vec3) -> bool {
        match self {
            Self::FirstPerson(_) => false,
            Self::Orbital(camera) => {
                camera.set_pivot(pivot);
                true
            }
        }
    }
}
