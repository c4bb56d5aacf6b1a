//! hecs integration: component types and a convenience prelude.

pub mod components;

pub mod prelude {
    pub use super::components::{EntityState, Motion, Transform2};
    pub use crate::physics::contact::Manifold;
    pub use crate::physics::hitbox::{Hitbox, HitboxComponent};
    pub use crate::physics::{PhysicsConfig, PhysicsWorld};
}
