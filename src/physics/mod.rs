//! 2D continuous collision pipeline: spatial indexing, time-of-impact
//! search, and manifold-based correction.
//!
//! # Architecture
//!
//! Each fixed substep runs six strictly ordered stages:
//!
//! 1. Rebuild — integrate motion, re-derive hitboxes, rebuild the quad-tree
//! 2. Detect — per-entity broad+narrow phase queries (fork-join parallel)
//! 3. Manifold build — collapse raw overlaps into per-partner entries
//! 4. Positional correction — apply averaged correction displacements
//! 5. Response — velocity reflection along contact normals
//! 6. Commit — settle hitboxes, remember this substep's partners
//!
//! The spatial index is rebuilt from scratch every substep and frozen for
//! the duration of stage 2, which is what makes the parallel queries
//! race-free: workers share the tree read-only and each writes only its own
//! entity's contact buffer.

pub mod broadphase;
pub mod contact;
pub mod hitbox;
pub mod motion;
pub mod narrowphase;
pub mod solver;
pub mod toi;

use glam::Vec2;
use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::ecs::components::physics::EntityState;
use crate::geom::OrthoRect;

use self::broadphase::{ColliderProxy, QuadTree};
use self::contact::{Manifold, RawContact};
use self::hitbox::Hitbox;
use self::narrowphase::DetectCounters;

/// Configuration for the collision pipeline.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// World region covered by the spatial index root. Fixed for the life
    /// of the world; entities leaving it are clamped to the index root.
    pub world_bounds: OrthoRect,
    /// Items a tree node holds before splitting. Default: 4.
    pub tree_capacity: usize,
    /// Maximum tree subdivision depth. Default: 8.
    pub tree_max_depth: u32,
    /// Fixed timestep for simulation updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of substeps per frame. Default: 4.
    pub max_substeps: u32,
    /// Defensive cap on time-of-impact bisection iterations. Default: 48.
    pub max_toi_iterations: u32,
    /// Fraction of the smaller pair member's tight-bound short side that
    /// the relative per-substep displacement must exceed before a swept
    /// search runs. Default: 0.5.
    pub sweep_activation_ratio: f32,
    /// Restitution applied along the contact normal. Default: 0.8.
    pub restitution: f32,
    /// Fraction of the contact-arm cross product fed into angular
    /// velocity. Default: 0.05.
    pub spin_transfer: f32,
    /// Angular speed clamp in radians per second. Default: 8.0.
    pub max_angular_velocity: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            world_bounds: OrthoRect::from_center(Vec2::ZERO, Vec2::splat(65536.0)),
            tree_capacity: 4,
            tree_max_depth: 8,
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            max_toi_iterations: 48,
            sweep_activation_ratio: 0.5,
            restitution: 0.8,
            spin_transfer: 0.05,
            max_angular_velocity: 8.0,
        }
    }
}

/// Reasons a [`PhysicsConfig`] is rejected at world construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("world bounds must be finite and non-empty")]
    InvalidWorldBounds,
    #[error("tree capacity must be at least 1")]
    ZeroTreeCapacity,
    #[error("fixed timestep must be positive")]
    InvalidTimestep,
    #[error("iteration caps and tuning ratios must be positive")]
    InvalidTuning,
}

impl PhysicsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let size = self.world_bounds.size();
        if !self.world_bounds.is_finite() || size.x <= 0.0 || size.y <= 0.0 {
            return Err(ConfigError::InvalidWorldBounds);
        }
        if self.tree_capacity == 0 {
            return Err(ConfigError::ZeroTreeCapacity);
        }
        if !(self.fixed_timestep > 0.0) {
            return Err(ConfigError::InvalidTimestep);
        }
        if self.max_substeps == 0
            || self.max_toi_iterations == 0
            || !(self.sweep_activation_ratio > 0.0)
            || !(self.max_angular_velocity > 0.0)
        {
            return Err(ConfigError::InvalidTuning);
        }
        Ok(())
    }
}

/// Counters for the most recent substep.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepStats {
    pub active_entities: u32,
    /// Insertions clamped to the index root because their bound left the
    /// world region.
    pub clamped_inserts: u32,
    /// Broad-phase candidate pairs examined (directed).
    pub candidate_pairs: u32,
    /// Raw component-pair contacts recorded by the detect phase.
    pub raw_contacts: u32,
    /// Entities holding at least one manifold entry.
    pub manifolds: u32,
    pub toi_invocations: u32,
    pub toi_cap_hits: u32,
    /// Substeps executed by the last `step` call.
    pub substeps: u32,
}

/// The simulation world: owns the spatial index and drives the per-tick
/// pipeline over an externally owned entity registry.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    accumulator: f64,
    tree: QuadTree<ColliderProxy>,
    stats: StepStats,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let tree = QuadTree::new(config.world_bounds, config.tree_capacity, config.tree_max_depth);
        Ok(Self {
            config,
            accumulator: 0.0,
            tree,
            stats: StepStats::default(),
        })
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Read-only view of the spatial index as of the last substep, for
    /// debug overlays and diagnostics.
    pub fn tree(&self) -> &QuadTree<ColliderProxy> {
        &self.tree
    }

    /// Counters from the most recent substep.
    pub fn stats(&self) -> StepStats {
        self.stats
    }

    /// Step the simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator so simulation behavior is
    /// independent of the host frame rate.
    pub fn step(&mut self, world: &mut hecs::World, delta_time: f64) {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.fixed_step(world, self.config.fixed_timestep as f32);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            self.accumulator = 0.0;
        }
        self.stats.substeps = substeps;
    }

    fn fixed_step(&mut self, world: &mut hecs::World, dt: f32) {
        let mut stats = StepStats::default();

        // 1. Rebuild: advance motion, then reindex every active entity.
        motion::integrate(world, dt);
        self.tree.clear();
        for (entity, (hitbox, state)) in world.query::<(&Hitbox, &EntityState)>().iter() {
            if *state == EntityState::Deletable {
                continue;
            }
            stats.active_entities += 1;
            let clamped = self.tree.insert(ColliderProxy {
                entity,
                hitbox: hitbox.clone(),
            });
            if clamped {
                stats.clamped_inserts += 1;
                tracing::debug!(entity = ?entity, "hitbox left world bounds, clamped to index root");
            }
        }

        // 2. Detect: fork-join over the frozen tree. Each worker reads the
        // shared index and returns its own entity's contacts.
        let results = Self::detect(&self.tree, &self.config, &mut stats);

        // 3. Manifold build.
        let (toi_invocations, toi_cap_hits) =
            contact::build_manifolds(world, results, &self.config, 1);
        stats.toi_invocations += toi_invocations;
        stats.toi_cap_hits += toi_cap_hits;
        for (_, manifold) in world.query::<&Manifold>().iter() {
            if manifold.is_colliding() {
                stats.manifolds += 1;
            }
        }

        // 4. Positional correction.
        solver::positional_correction(world);

        // 5. Response.
        solver::velocity_response(world, &self.config);

        // 6. Commit.
        motion::commit(world);

        stats.substeps = self.stats.substeps;
        self.stats = stats;
    }

    fn detect(
        tree: &QuadTree<ColliderProxy>,
        config: &PhysicsConfig,
        stats: &mut StepStats,
    ) -> Vec<(hecs::Entity, Vec<RawContact>)> {
        let mut probes: Vec<&ColliderProxy> = Vec::new();
        tree.for_each_node(&mut |node| probes.extend(node.items().iter()));

        #[cfg(feature = "parallel")]
        let raw: Vec<(hecs::Entity, Vec<RawContact>, DetectCounters)> = probes
            .par_iter()
            .map(|&probe| {
                let (contacts, counters) = narrowphase::detect_entity(probe, tree, config, 1);
                (probe.entity, contacts, counters)
            })
            .collect();

        #[cfg(not(feature = "parallel"))]
        let raw: Vec<(hecs::Entity, Vec<RawContact>, DetectCounters)> = probes
            .iter()
            .map(|&probe| {
                let (contacts, counters) = narrowphase::detect_entity(probe, tree, config, 1);
                (probe.entity, contacts, counters)
            })
            .collect();

        let mut merged = DetectCounters::default();
        let mut results = Vec::with_capacity(raw.len());
        for (entity, contacts, counters) in raw {
            merged.merge(counters);
            stats.raw_contacts += contacts.len() as u32;
            results.push((entity, contacts));
        }
        stats.candidate_pairs += merged.candidates;
        stats.toi_invocations += merged.toi_invocations;
        stats.toi_cap_hits += merged.toi_cap_hits;
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::Motion;
    use crate::geom::Transform2;
    use crate::physics::hitbox::HitboxComponent;
    use std::f32::consts::FRAC_PI_4;

    fn test_config() -> PhysicsConfig {
        PhysicsConfig {
            world_bounds: OrthoRect::from_center(Vec2::ZERO, Vec2::splat(1024.0)),
            ..PhysicsConfig::default()
        }
    }

    fn spawn_box(
        world: &mut hecs::World,
        position: Vec2,
        rotation: f32,
        half_extents: Vec2,
        velocity: Vec2,
    ) -> hecs::Entity {
        let trans = Transform2::new(position, rotation);
        world.spawn((
            trans,
            Motion::from_velocity(velocity),
            Hitbox::new(
                vec![HitboxComponent::new(Transform2::IDENTITY, half_extents)],
                trans,
            ),
            Manifold::new(),
            EntityState::Active,
        ))
    }

    #[test]
    fn test_config_validation() {
        assert!(PhysicsWorld::new(PhysicsConfig::default()).is_ok());

        let bad = PhysicsConfig {
            fixed_timestep: 0.0,
            ..PhysicsConfig::default()
        };
        assert!(matches!(
            PhysicsWorld::new(bad),
            Err(ConfigError::InvalidTimestep)
        ));

        let bad = PhysicsConfig {
            world_bounds: OrthoRect::new(Vec2::ZERO, Vec2::ZERO),
            ..PhysicsConfig::default()
        };
        assert!(matches!(
            PhysicsWorld::new(bad),
            Err(ConfigError::InvalidWorldBounds)
        ));
    }

    #[test]
    fn test_overlapping_pair_gets_symmetric_manifolds() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(test_config()).unwrap();

        let a = spawn_box(&mut world, Vec2::ZERO, 0.0, Vec2::splat(0.5), Vec2::ZERO);
        let b = spawn_box(
            &mut world,
            Vec2::new(0.5, 0.0),
            0.0,
            Vec2::splat(0.5),
            Vec2::ZERO,
        );

        physics.fixed_step(&mut world, 1.0 / 60.0);

        let manifold_a = world.get::<&Manifold>(a).unwrap();
        let manifold_b = world.get::<&Manifold>(b).unwrap();
        assert_eq!(manifold_a.entries.len(), 1);
        assert_eq!(manifold_b.entries.len(), 1);
        assert_eq!(manifold_a.entries[0].other, b);
        assert_eq!(manifold_b.entries[0].other, a);
        assert_eq!(physics.stats().manifolds, 2);
    }

    #[test]
    fn test_rough_overlap_without_exact_yields_no_manifold() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(test_config()).unwrap();

        // Two diamonds whose axis-aligned bounds overlap at the corner gap.
        let a = spawn_box(&mut world, Vec2::ZERO, FRAC_PI_4, Vec2::splat(1.0), Vec2::ZERO);
        let b = spawn_box(
            &mut world,
            Vec2::new(2.4, 2.4),
            FRAC_PI_4,
            Vec2::splat(1.0),
            Vec2::ZERO,
        );

        physics.fixed_step(&mut world, 1.0 / 60.0);

        assert!(!world.get::<&Manifold>(a).unwrap().is_colliding());
        assert!(!world.get::<&Manifold>(b).unwrap().is_colliding());
        assert_eq!(physics.stats().manifolds, 0);
    }

    #[test]
    fn test_multi_component_pairs_collapse_to_one_entry() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(test_config()).unwrap();

        // Two-lobe subject; both lobes overlap the wide object.
        let trans = Transform2::IDENTITY;
        let subject = world.spawn((
            trans,
            Motion::default(),
            Hitbox::new(
                vec![
                    HitboxComponent::new(
                        Transform2::from_position(Vec2::new(-0.6, 0.0)),
                        Vec2::splat(0.5),
                    ),
                    HitboxComponent::new(
                        Transform2::from_position(Vec2::new(0.6, 0.0)),
                        Vec2::splat(0.5),
                    ),
                ],
                trans,
            ),
            Manifold::new(),
            EntityState::Active,
        ));
        let object = spawn_box(
            &mut world,
            Vec2::new(0.0, 0.6),
            0.0,
            Vec2::new(2.0, 0.5),
            Vec2::ZERO,
        );

        physics.fixed_step(&mut world, 1.0 / 60.0);

        let manifold = world.get::<&Manifold>(subject).unwrap();
        assert_eq!(manifold.entries.len(), 1, "one entry per partner");
        assert_eq!(manifold.entries[0].other, object);
        assert!(manifold.entries[0].points.len() >= 2);
    }

    #[test]
    fn test_tunneling_pair_detected_and_corrected() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(test_config()).unwrap();

        let bullet = spawn_box(
            &mut world,
            Vec2::new(-250.0, 0.0),
            0.0,
            Vec2::splat(0.5),
            Vec2::new(500.0, 0.0),
        );
        let wall = spawn_box(&mut world, Vec2::ZERO, 0.0, Vec2::new(5.0, 20.0), Vec2::ZERO);

        // One substep moves the bullet 500 units, straight through the wall.
        physics.fixed_step(&mut world, 1.0);

        let manifold = world.get::<&Manifold>(bullet).unwrap();
        assert!(manifold.is_colliding(), "tunneling pair missed");
        assert_eq!(manifold.entries[0].other, wall);
        assert!(physics.stats().toi_invocations > 0);

        // The correction pulled the bullet back to the impact
        // configuration instead of leaving it on the far side.
        let position = world.get::<&Transform2>(bullet).unwrap().position;
        assert!(
            position.x < 0.0,
            "bullet should sit at the near face, got {position}"
        );
    }

    #[test]
    fn test_deletable_entities_excluded() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(test_config()).unwrap();

        let a = spawn_box(&mut world, Vec2::ZERO, 0.0, Vec2::splat(0.5), Vec2::ZERO);
        let b = spawn_box(
            &mut world,
            Vec2::new(0.5, 0.0),
            0.0,
            Vec2::splat(0.5),
            Vec2::ZERO,
        );
        *world.get::<&mut EntityState>(b).unwrap() = EntityState::Deletable;

        physics.fixed_step(&mut world, 1.0 / 60.0);

        assert_eq!(physics.stats().active_entities, 1);
        assert!(!world.get::<&Manifold>(a).unwrap().is_colliding());
        assert_eq!(physics.tree().len(), 1);
    }

    #[test]
    fn test_out_of_bounds_entity_still_simulated() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(test_config()).unwrap();

        let far = Vec2::new(5000.0, 0.0);
        let a = spawn_box(&mut world, far, 0.0, Vec2::splat(0.5), Vec2::ZERO);
        let b = spawn_box(
            &mut world,
            far + Vec2::new(0.5, 0.0),
            0.0,
            Vec2::splat(0.5),
            Vec2::ZERO,
        );

        physics.fixed_step(&mut world, 1.0 / 60.0);

        assert_eq!(physics.stats().clamped_inserts, 2);
        assert!(world.get::<&Manifold>(a).unwrap().is_colliding());
        assert!(world.get::<&Manifold>(b).unwrap().is_colliding());
    }

    #[test]
    fn test_step_accumulates_substeps() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(test_config()).unwrap();
        spawn_box(
            &mut world,
            Vec2::ZERO,
            0.0,
            Vec2::splat(0.5),
            Vec2::new(60.0, 0.0),
        );

        // Two fixed timesteps worth of time.
        physics.step(&mut world, 2.0 / 60.0);
        assert_eq!(physics.stats().substeps, 2);

        // Far more than max_substeps worth: the accumulator clamps.
        physics.step(&mut world, 10.0);
        assert_eq!(physics.stats().substeps, physics.config().max_substeps);
    }

    #[test]
    fn test_tree_exposed_for_diagnostics() {
        let mut world = hecs::World::new();
        let mut physics = PhysicsWorld::new(test_config()).unwrap();
        for i in 0..20 {
            spawn_box(
                &mut world,
                Vec2::new(i as f32 * 10.0 - 100.0, 0.0),
                0.0,
                Vec2::splat(0.5),
                Vec2::ZERO,
            );
        }

        physics.fixed_step(&mut world, 1.0 / 60.0);

        assert_eq!(physics.tree().len(), 20);
        let mut nodes = 0;
        physics.tree().for_each_node(&mut |node| {
            assert!(node.boundary().size().x > 0.0);
            nodes += 1;
        });
        assert!(nodes >= 1);
    }
}
