//! Narrow-phase contact gathering: exact component-pair tests, intersection
//! points, and the per-entity detect routine run inside the fork-join phase.

use glam::Vec2;

use crate::geom::RectBox;

use super::broadphase::{ColliderProxy, QuadTree, TreeItem};
use super::contact::RawContact;
use super::hitbox::Hitbox;
use super::toi::approach_test;
use super::PhysicsConfig;

/// Representative intersection point of two overlapping oriented boxes:
/// the mean of each box's corners contained in the other, falling back to
/// the midpoint of the centers for edge-cross overlaps with no contained
/// corner.
pub fn intersection_point(a: &RectBox, b: &RectBox) -> Vec2 {
    let mut sum = Vec2::ZERO;
    let mut count = 0u32;
    for corner in a.corners() {
        if b.contains_point(*corner) {
            sum += *corner;
            count += 1;
        }
    }
    for corner in b.corners() {
        if a.contains_point(*corner) {
            sum += *corner;
            count += 1;
        }
    }
    if count > 0 {
        sum / count as f32
    } else {
        (a.center() + b.center()) * 0.5
    }
}

/// Outward surface normal of `object` at a nearby point, blending the two
/// closest edge normals by the point's normalized offset along each axis.
/// Face-center points yield the face normal; corner regions a diagonal
/// blend.
pub fn avg_edge_normal(point: Vec2, object: &RectBox) -> Vec2 {
    let d = point - object.center();
    let axes = object.axes();
    let he = object.half_extents();
    let weighted = axes[0] * (d.dot(axes[0]) / he.x) + axes[1] * (d.dot(axes[1]) / he.y);
    weighted.normalize_or(axes[0])
}

/// Counters gathered by one detect worker, merged into the step stats.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DetectCounters {
    pub candidates: u32,
    pub toi_invocations: u32,
    pub toi_cap_hits: u32,
}

impl DetectCounters {
    pub(crate) fn merge(&mut self, other: DetectCounters) {
        self.candidates += other.candidates;
        self.toi_invocations += other.toi_invocations;
        self.toi_cap_hits += other.toi_cap_hits;
    }
}

/// Relative displacement below which a candidate pair is not worth a swept
/// search: a configured fraction of the smaller pair member's tight-bound
/// short side.
pub(crate) fn sweep_threshold(a: &Hitbox, b: &Hitbox, config: &PhysicsConfig) -> f32 {
    let side = |hitbox: &Hitbox| {
        let size = hitbox.min_wrap_bound().size();
        size.x.min(size.y)
    };
    config.sweep_activation_ratio * side(a).min(side(b))
}

/// Detect overlaps for one entity against the frozen spatial index.
///
/// Runs the endpoint pass (rough wrap-bound filter, then exact tests per
/// component pair) for every broad-phase candidate; candidates that fail it
/// while moving fast relative to the subject get a swept time-of-impact
/// search from their settled configurations, so that tunneling pairs are
/// still captured. Writes only to the returned buffers, which is what makes
/// the surrounding fork-join phase race-free.
pub(crate) fn detect_entity(
    probe: &ColliderProxy,
    tree: &QuadTree<ColliderProxy>,
    config: &PhysicsConfig,
    substeps: u32,
) -> (Vec<RawContact>, DetectCounters) {
    let mut contacts = Vec::new();
    let mut counters = DetectCounters::default();
    let bound = probe.bound();

    tree.candidates(&bound, &mut |other| {
        if other.entity == probe.entity {
            return;
        }
        counters.candidates += 1;

        let endpoint_hits = endpoint_contacts(probe, other, &mut contacts);
        if endpoint_hits {
            return;
        }

        let rel_move = probe.hitbox.back_trace_unit_move(substeps)
            - other.hitbox.back_trace_unit_move(substeps);
        if rel_move.length() < sweep_threshold(&probe.hitbox, &other.hitbox, config) {
            return;
        }
        swept_contacts(probe, other, config, &mut contacts, &mut counters);
    });

    (contacts, counters)
}

/// Exact tests at the current positions. Returns whether any pair hit.
fn endpoint_contacts(
    probe: &ColliderProxy,
    other: &ColliderProxy,
    contacts: &mut Vec<RawContact>,
) -> bool {
    if !probe.hitbox.rough_collides(&other.hitbox) {
        return false;
    }
    let mut found = false;
    for (i, a) in probe.hitbox.components().iter().enumerate() {
        for (j, b) in other.hitbox.components().iter().enumerate() {
            if a.shape.rough_overlaps(&b.shape) && a.shape.exact_overlaps(&b.shape) {
                let point = intersection_point(&a.shape, &b.shape);
                contacts.push(RawContact {
                    other: other.entity,
                    subject_component: i,
                    object_component: j,
                    point,
                    normal: avg_edge_normal(point, &b.shape),
                    correction: None,
                });
                found = true;
            }
        }
    }
    found
}

/// Swept search from the settled configurations of a fast pair whose
/// endpoint positions do not overlap.
fn swept_contacts(
    probe: &ColliderProxy,
    other: &ColliderProxy,
    config: &PhysicsConfig,
    contacts: &mut Vec<RawContact>,
    counters: &mut DetectCounters,
) {
    let mut subject = probe.hitbox.clone();
    subject.translate(-subject.back_trace_move());
    let mut object = other.hitbox.clone();
    object.translate(-object.back_trace_move());

    // A pair already overlapping at its settled configuration is a resting
    // contact, not a tunneling one; the endpoint pass owns it.
    if subject.rough_collides(&object) && subject.collides_with(&object) {
        return;
    }

    counters.toi_invocations += 1;
    let result = approach_test(
        &mut subject,
        &mut object,
        probe.hitbox.back_trace_move(),
        other.hitbox.back_trace_move(),
        config.max_toi_iterations,
    );
    if !result.converged {
        counters.toi_cap_hits += 1;
        tracing::warn!(
            subject = ?probe.entity,
            object = ?other.entity,
            "time-of-impact search hit its iteration cap"
        );
    }
    if !result.hit {
        return;
    }

    // Pull the subject back from its tunneled endpoint onto the impact
    // configuration found by the search.
    let correction = subject.trans().position - probe.hitbox.trans().position;
    for (i, a) in subject.components().iter().enumerate() {
        for (j, b) in object.components().iter().enumerate() {
            if a.shape.rough_overlaps(&b.shape) && a.shape.exact_overlaps(&b.shape) {
                let point = intersection_point(&a.shape, &b.shape);
                contacts.push(RawContact {
                    other: other.entity,
                    subject_component: i,
                    object_component: j,
                    point,
                    normal: avg_edge_normal(point, &b.shape),
                    correction: Some(correction),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Transform2;
    use approx::assert_abs_diff_eq;

    fn square(center: Vec2, half: f32) -> RectBox {
        RectBox::new(Transform2::from_position(center), Vec2::splat(half))
    }

    #[test]
    fn test_intersection_point_centered_in_overlap() {
        let a = square(Vec2::ZERO, 0.5);
        let b = square(Vec2::new(0.5, 0.0), 0.5);
        let p = intersection_point(&a, &b);
        assert_abs_diff_eq!(p.x, 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_intersection_point_cross_fallback() {
        // Plus-sign overlap: no corner of either box inside the other.
        let horizontal = RectBox::new(Transform2::IDENTITY, Vec2::new(3.0, 0.4));
        let vertical = RectBox::new(Transform2::IDENTITY, Vec2::new(0.4, 3.0));
        let p = intersection_point(&horizontal, &vertical);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_face_normal() {
        let b = square(Vec2::ZERO, 0.5);
        let n = avg_edge_normal(Vec2::new(0.5, 0.0), &b);
        assert_abs_diff_eq!(n.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(n.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_corner_normal_blends() {
        let b = square(Vec2::ZERO, 0.5);
        let n = avg_edge_normal(Vec2::new(0.5, 0.5), &b);
        let expected = std::f32::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(n.x, expected, epsilon = 1e-5);
        assert_abs_diff_eq!(n.y, expected, epsilon = 1e-5);
    }

    #[test]
    fn test_normal_is_unit_and_outward() {
        let object = RectBox::new(Transform2::new(Vec2::new(2.0, 1.0), 0.6), Vec2::new(1.5, 0.5));
        let point = Vec2::new(3.0, 2.0);
        let n = avg_edge_normal(point, &object);
        assert_abs_diff_eq!(n.length(), 1.0, epsilon = 1e-5);
        // Outward: moving along the normal increases distance from the center.
        assert!(n.dot(point - object.center()) > 0.0);
    }
}
