//! Simulation components for ECS entities.

use glam::Vec2;

/// Linear and angular motion state.
#[derive(Debug, Clone, Copy)]
pub struct Motion {
    pub velocity: Vec2,
    /// Radians per second, clamped by the response pass.
    pub angular_velocity: f32,
}

impl Motion {
    pub fn new(velocity: Vec2, angular_velocity: f32) -> Self {
        Self {
            velocity,
            angular_velocity,
        }
    }

    pub fn from_velocity(velocity: Vec2) -> Self {
        Self::new(velocity, 0.0)
    }
}

impl Default for Motion {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 0.0)
    }
}

/// Entity lifecycle marker.
///
/// Hosts mark entities `Deletable` between ticks; the rebuild stage skips
/// them and the response pass treats manifold entries pointing at them as
/// stale. Despawning remains the host's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityState {
    #[default]
    Active,
    Deletable,
}
