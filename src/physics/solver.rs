//! Positional correction and velocity response passes.

use glam::Vec2;

use crate::ecs::components::physics::{EntityState, Motion};
use crate::geom::Transform2;

use super::contact::Manifold;
use super::hitbox::Hitbox;
use super::PhysicsConfig;

/// Stage 4: average the correction vectors owed to every partner and apply
/// the result as an immediate displacement.
pub fn positional_correction(world: &mut hecs::World) {
    for (_, (trans, hitbox, manifold, state)) in
        world.query_mut::<(&mut Transform2, &mut Hitbox, &Manifold, &EntityState)>()
    {
        if *state == EntityState::Deletable || manifold.entries.is_empty() {
            continue;
        }
        let sum: Vec2 = manifold.entries.iter().map(|entry| entry.correction).sum();
        let average = sum / manifold.entries.len() as f32;
        if average != Vec2::ZERO {
            trans.position += average;
            hitbox.set_transform(*trans);
        }
    }
}

/// Stage 5: velocity response against the first manifold entry.
///
/// The reflected normal velocity is split evenly between the pair; each
/// side applies its own half, so the pass stays per-entity and order-free.
/// Deltas are accumulated over a read-only sweep and applied afterwards.
/// Entries whose partner is gone or marked deletable are stale and skipped.
pub fn velocity_response(world: &mut hecs::World, config: &PhysicsConfig) {
    let mut deltas: Vec<(hecs::Entity, Vec2, f32)> = Vec::new();

    for (entity, (trans, motion, manifold, state)) in world
        .query::<(&Transform2, &Motion, &Manifold, &EntityState)>()
        .iter()
    {
        if *state == EntityState::Deletable {
            continue;
        }
        // Source behavior: only the first colliding partner responds.
        let Some(entry) = manifold.entries.first() else {
            continue;
        };
        if !world.contains(entry.other) {
            continue;
        }
        if let Ok(other_state) = world.get::<&EntityState>(entry.other) {
            if *other_state == EntityState::Deletable {
                continue;
            }
        }

        let other_velocity = world
            .get::<&Motion>(entry.other)
            .map(|m| m.velocity)
            .unwrap_or(Vec2::ZERO);
        let normal = entry.normal;
        if normal == Vec2::ZERO {
            continue;
        }

        let relative = motion.velocity - other_velocity;
        let along_normal = relative.dot(normal);
        if along_normal >= 0.0 {
            // Already separating.
            continue;
        }

        let delta_v = normal * (-(1.0 + config.restitution) * along_normal * 0.5);
        let arm = entry.position - trans.position;
        let delta_w = arm.perp_dot(delta_v) * config.spin_transfer;
        deltas.push((entity, delta_v, delta_w));
    }

    for (entity, delta_v, delta_w) in deltas {
        if let Ok(mut motion) = world.get::<&mut Motion>(entity) {
            motion.velocity += delta_v;
            motion.angular_velocity = (motion.angular_velocity + delta_w)
                .clamp(-config.max_angular_velocity, config.max_angular_velocity);
        }
    }
}
