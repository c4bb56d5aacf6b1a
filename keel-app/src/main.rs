//! Headless host for the keel collision core.
//!
//! Plays the role of the surrounding application: owns the entity
//! registry, spawns a randomized world, steps the simulation at a fixed
//! cadence, and consumes the diagnostic surfaces a renderer would draw.

use glam::Vec2;
use rand::{Rng, SeedableRng};

use keel::{
    EntityState, Hitbox, HitboxComponent, Manifold, Motion, OrthoRect, PhysicsConfig,
    PhysicsWorld, Transform2,
};

const WORLD_HALF_EXTENT: f32 = 12000.0;
const ENTITY_COUNT: usize = 2000;
const SIMULATED_SECONDS: u32 = 10;

fn random_component(rng: &mut impl Rng) -> HitboxComponent {
    HitboxComponent::new(
        Transform2::new(
            Vec2::new(rng.random_range(-80.0..80.0), rng.random_range(-80.0..80.0)),
            rng.random_range(0.0..std::f32::consts::TAU),
        ),
        Vec2::new(rng.random_range(50.0..80.0), rng.random_range(50.0..80.0)),
    )
}

fn spawn_entity(world: &mut hecs::World, rng: &mut impl Rng) {
    let trans = Transform2::new(
        Vec2::new(
            rng.random_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
            rng.random_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
        ),
        rng.random_range(0.0..std::f32::consts::TAU),
    );

    // Two oriented lobes per entity, offset and tilted like debris.
    let hitbox = Hitbox::new(vec![random_component(rng), random_component(rng)], trans);

    world.spawn((
        trans,
        Motion::new(
            Vec2::new(rng.random_range(-600.0..600.0), rng.random_range(-600.0..600.0)),
            rng.random_range(-1.0..1.0),
        ),
        hitbox,
        Manifold::new(),
        EntityState::Active,
    ));
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = PhysicsConfig {
        world_bounds: OrthoRect::from_center(Vec2::ZERO, Vec2::splat(WORLD_HALF_EXTENT * 1.25)),
        ..PhysicsConfig::default()
    };
    let dt = config.fixed_timestep;
    let mut physics = PhysicsWorld::new(config)?;

    let mut world = hecs::World::new();
    let mut rng = rand_pcg::Pcg64Mcg::seed_from_u64(0xC0FFEE);
    for _ in 0..ENTITY_COUNT {
        spawn_entity(&mut world, &mut rng);
    }
    tracing::info!(entities = ENTITY_COUNT, "world populated");

    let mut retiring: Vec<hecs::Entity> = Vec::new();
    for frame in 0..SIMULATED_SECONDS * 60 {
        physics.step(&mut world, dt);

        // The host retires a few entities now and then: marked deletable
        // one frame (the pipeline skips them), despawned the next.
        for entity in retiring.drain(..) {
            world.despawn(entity)?;
        }
        if frame % 120 == 119 {
            retiring = world
                .query::<(&Manifold, &EntityState)>()
                .iter()
                .filter(|(_, (manifold, state))| {
                    manifold.is_colliding() && **state == EntityState::Active
                })
                .map(|(entity, _)| entity)
                .take(5)
                .collect();
            for entity in &retiring {
                *world.get::<&mut EntityState>(*entity)? = EntityState::Deletable;
            }
        }

        if frame % 60 == 59 {
            let stats = physics.stats();
            tracing::info!(
                second = (frame + 1) / 60,
                active = stats.active_entities,
                candidates = stats.candidate_pairs,
                contacts = stats.raw_contacts,
                manifolds = stats.manifolds,
                toi = stats.toi_invocations,
                "tick"
            );
        }
    }

    // What a renderer's debug overlay would walk.
    let mut nodes = 0usize;
    let mut deepest_items = 0usize;
    physics.tree().for_each_node(&mut |node| {
        nodes += 1;
        deepest_items = deepest_items.max(node.items().len());
    });
    tracing::info!(
        nodes,
        items = physics.tree().len(),
        busiest_node = deepest_items,
        "final spatial index"
    );

    Ok(())
}
