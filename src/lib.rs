//! Keel 2D Engine
//!
//! The simulation core of a 2D engine: spatial indexing and continuous
//! collision detection/resolution over composite oriented-box hitboxes.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **geom** - 2D primitives (transforms, axis-aligned rects, oriented boxes)
//! 2. **ecs** - hecs component types (transform, motion, lifecycle)
//! 3. **physics** - the per-tick pipeline: quad-tree broad phase,
//!    separating-axis narrow phase, time-of-impact search, manifold
//!    construction, positional correction and velocity response
//!
//! Rendering, windowing, and asset handling are host concerns: the host
//! feeds entities into a [`hecs::World`], calls [`PhysicsWorld::step`] once
//! per frame, and may walk [`PhysicsWorld::tree`] to draw debug overlays.
//!
//! With the default `parallel` feature the detect phase fans out over a
//! rayon thread pool; disabling it runs the identical pipeline serially.

pub mod ecs;
pub mod geom;
pub mod physics;

// Re-export commonly used types
pub use geom::{OrthoRect, RectBox, Transform2};

pub use physics::{
    broadphase::{ColliderProxy, QuadTree, TreeItem},
    contact::{ContactPoint, Manifold, ManifoldEntry, RawContact},
    hitbox::{Hitbox, HitboxComponent},
    toi::{approach_test, ApproachResult},
    ConfigError, PhysicsConfig, PhysicsWorld, StepStats,
};

pub use ecs::components::{EntityState, Motion};
