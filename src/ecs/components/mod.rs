//! ECS components (transform, motion, lifecycle).

pub mod physics;

pub use physics::*;

// The 2D transform doubles as plain geometry, so it lives in `geom` and is
// used as a component directly.
pub use crate::geom::Transform2;
