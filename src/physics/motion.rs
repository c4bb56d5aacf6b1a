//! Motion integration and end-of-substep commit.

use crate::ecs::components::physics::{EntityState, Motion};
use crate::geom::Transform2;

use super::contact::Manifold;
use super::hitbox::Hitbox;

/// Stage 1 advance: move every active entity by its velocity and re-derive
/// its hitbox from the new transform.
pub fn integrate(world: &mut hecs::World, dt: f32) {
    for (_, (trans, motion, hitbox, state)) in
        world.query_mut::<(&mut Transform2, &Motion, &mut Hitbox, &EntityState)>()
    {
        if *state == EntityState::Deletable {
            continue;
        }
        trans.position += motion.velocity * dt;
        trans.rotation += motion.angular_velocity * dt;
        hitbox.set_transform(*trans);
    }
}

/// Stage 6 commit: snapshot this substep's manifold partners for the next
/// substep's resting heuristic and settle every hitbox.
pub fn commit(world: &mut hecs::World) {
    for (_, (hitbox, manifold, state)) in
        world.query_mut::<(&mut Hitbox, &mut Manifold, &EntityState)>()
    {
        if *state == EntityState::Deletable {
            continue;
        }
        manifold.commit_partners();
        hitbox.settle();
    }
}
