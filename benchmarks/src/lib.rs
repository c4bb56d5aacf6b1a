//! Shared world setup for the keel benchmarks.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use keel::{EntityState, Hitbox, HitboxComponent, Manifold, Motion, Transform2};

pub const WORLD_HALF_EXTENT: f32 = 4096.0;

pub fn bench_rng() -> Pcg64Mcg {
    Pcg64Mcg::seed_from_u64(0x5EED)
}

/// A single-lobe hitbox at a random pose.
pub fn random_hitbox(rng: &mut impl Rng) -> (Transform2, Hitbox) {
    let trans = Transform2::new(
        Vec2::new(
            rng.random_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
            rng.random_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
        ),
        rng.random_range(0.0..std::f32::consts::TAU),
    );
    let hitbox = Hitbox::new(
        vec![HitboxComponent::new(
            Transform2::IDENTITY,
            Vec2::new(rng.random_range(10.0..40.0), rng.random_range(10.0..40.0)),
        )],
        trans,
    );
    (trans, hitbox)
}

/// Populate a registry with `count` moving box entities.
pub fn setup_world(count: usize) -> hecs::World {
    let mut rng = bench_rng();
    let mut world = hecs::World::new();
    for _ in 0..count {
        let (trans, hitbox) = random_hitbox(&mut rng);
        world.spawn((
            trans,
            Motion::new(
                Vec2::new(rng.random_range(-60.0..60.0), rng.random_range(-60.0..60.0)),
                0.0,
            ),
            hitbox,
            Manifold::new(),
            EntityState::Active,
        ));
    }
    world
}
