//! 2D transform: translation plus rotation about the origin.

use glam::Vec2;

/// Position and rotation (radians, counter-clockwise). Scale-free.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2 {
    pub position: Vec2,
    pub rotation: f32,
}

impl Transform2 {
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
    };

    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
        }
    }

    /// Compose with a child transform: the child's offset is rotated into
    /// this frame and rotations add. Associative, with `IDENTITY` as the
    /// neutral element.
    pub fn compose(&self, local: Transform2) -> Transform2 {
        Transform2 {
            position: self.position + Vec2::from_angle(self.rotation).rotate(local.position),
            rotation: self.rotation + local.rotation,
        }
    }

    /// Rotate a direction vector by this transform's rotation.
    pub fn rotate_vec(&self, v: Vec2) -> Vec2 {
        Vec2::from_angle(self.rotation).rotate(v)
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}
