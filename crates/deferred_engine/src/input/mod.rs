//! Input events and key bindings
//!
//! Device polling belongs to the presentation surface; the engine only sees the
//! [`InputEvent`]s it hands back each frame. [`KeyBindings`] maps keys to camera motion flags.

use std::collections::HashMap;

use crate::camera::MotionFlags;

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// W key
    W,
    /// A key
    A,
    /// S key
    S,
    /// D key
    D,
    /// R key
    R,
    /// F key
    F,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Escape key
    Escape,
    /// Digit keys 0-9, used to pick the debug view
    Digit(u8),
}

/// Events produced by the presentation surface
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Key was pressed
    KeyPressed(KeyCode),
    /// Key was released
    KeyReleased(KeyCode),
    /// Relative mouse motion in pixels
    MouseMoved {
        /// Horizontal delta
        dx: f32,
        /// Vertical delta
        dy: f32,
    },
    /// Analog stick position in [-1, 1]
    Analog {
        /// Horizontal axis
        x: f32,
        /// Vertical axis
        y: f32,
    },
    /// Select the renderer debug view (0 = final composite)
    DebugView(i32),
    /// Surface was resized
    Resized {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
    /// The user asked to close the surface
    CloseRequested,
}

/// Key to motion flag mapping
#[derive(Debug, Clone)]
pub struct KeyBindings {
    motion: HashMap<KeyCode, MotionFlags>,
}

impl KeyBindings {
    /// Create an empty binding table
    pub fn empty() -> Self {
        Self { motion: HashMap::new() }
    }

    /// Bind a key to a motion flag set
    pub fn bind(mut self, key: KeyCode, flags: MotionFlags) -> Self {
        self.motion.insert(key, flags);
        self
    }

    /// Motion flags bound to a key
    pub fn motion_for(&self, key: KeyCode) -> Option<MotionFlags> {
        self.motion.get(&key).copied()
    }
}

impl Default for KeyBindings {
    /// WASD / arrows move, R/F move the dof near plane
    fn default() -> Self {
        Self::empty()
            .bind(KeyCode::W, MotionFlags::FORWARD)
            .bind(KeyCode::Up, MotionFlags::FORWARD)
            .bind(KeyCode::S, MotionFlags::BACKWARD)
            .bind(KeyCode::Down, MotionFlags::BACKWARD)
            .bind(KeyCode::A, MotionFlags::STRAFE_LEFT)
            .bind(KeyCode::Left, MotionFlags::STRAFE_LEFT)
            .bind(KeyCode::D, MotionFlags::STRAFE_RIGHT)
            .bind(KeyCode::Right, MotionFlags::STRAFE_RIGHT)
            .bind(KeyCode::R, MotionFlags::DOF_NEAR_FORWARD)
            .bind(KeyCode::F, MotionFlags::DOF_NEAR_BACKWARD)
    }
}
