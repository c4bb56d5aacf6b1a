//! Composite hitbox: ordered oriented-box components under one entity transform.

use glam::Vec2;

use crate::geom::{OrthoRect, RectBox, Transform2};

/// One shape component of a composite hitbox.
///
/// `local` is the offset transform relative to the owning entity; `shape`
/// is the derived world-space box and is rebuilt whenever the owner moves.
#[derive(Debug, Clone, Copy)]
pub struct HitboxComponent {
    pub local: Transform2,
    pub shape: RectBox,
}

impl HitboxComponent {
    pub fn new(local: Transform2, half_extents: Vec2) -> Self {
        Self {
            local,
            shape: RectBox::new(local, half_extents),
        }
    }
}

/// Composite hitbox attached to one entity.
///
/// Tracks the transform it last settled at so the displacement accumulated
/// over the current substep (the back-trace move) is always available to
/// the time-of-impact solver. The cached wrap bounds maintain the broad
/// phase invariant: the max wrap bound contains every component at both the
/// current and the back-traced position.
#[derive(Debug, Clone)]
pub struct Hitbox {
    components: Vec<HitboxComponent>,
    trans: Transform2,
    last_settled: Transform2,
    min_bound: OrthoRect,
    max_bound: OrthoRect,
}

impl Hitbox {
    /// Build a hitbox from its components and the owning entity transform.
    ///
    /// Zero-extent or non-finite components are rejected: an assertion in
    /// debug builds, silently dropped in release builds.
    pub fn new(components: Vec<HitboxComponent>, trans: Transform2) -> Self {
        debug_assert!(
            components.iter().all(Self::component_valid),
            "hitbox component with zero or non-finite extents"
        );
        let components: Vec<_> = components
            .into_iter()
            .filter(|component| Self::component_valid(component))
            .collect();

        let mut hitbox = Self {
            components,
            trans,
            last_settled: trans,
            min_bound: OrthoRect::new(trans.position, trans.position),
            max_bound: OrthoRect::new(trans.position, trans.position),
        };
        hitbox.set_transform(trans);
        hitbox
    }

    fn component_valid(component: &HitboxComponent) -> bool {
        let he = component.shape.half_extents();
        he.x > 0.0 && he.y > 0.0 && he.is_finite() && component.local.is_finite()
    }

    pub fn components(&self) -> &[HitboxComponent] {
        &self.components
    }

    pub fn trans(&self) -> Transform2 {
        self.trans
    }

    pub fn last_settled(&self) -> Transform2 {
        self.last_settled
    }

    /// Move the owner to a new transform, re-deriving every component's
    /// world shape and both wrap bounds.
    pub fn set_transform(&mut self, trans: Transform2) {
        self.trans = trans;
        for component in &mut self.components {
            component.shape.set_transform(trans.compose(component.local));
        }
        self.recompute_bounds();
    }

    /// Pure translation fast path used by the time-of-impact stepping loop.
    pub fn translate(&mut self, delta: Vec2) {
        self.trans.position += delta;
        for component in &mut self.components {
            component.shape.translate(delta);
        }
        self.min_bound = self.min_bound.translated(delta);
        self.max_bound = self.min_bound.union(&self.min_bound.translated(-self.back_trace_move()));
    }

    fn recompute_bounds(&mut self) {
        let mut bounds = self
            .components
            .iter()
            .map(|component| component.shape.bounding());
        self.min_bound = match bounds.next() {
            Some(first) => bounds.fold(first, |acc, b| acc.union(&b)),
            None => OrthoRect::new(self.trans.position, self.trans.position),
        };
        self.max_bound = self
            .min_bound
            .union(&self.min_bound.translated(-self.back_trace_move()));
    }

    /// Tight bound over the current component shapes.
    pub fn min_wrap_bound(&self) -> OrthoRect {
        self.min_bound
    }

    /// Motion-inflated bound: covers the components at the current and the
    /// back-traced position, so fast movers stay visible to the broad phase.
    pub fn max_wrap_bound(&self) -> OrthoRect {
        self.max_bound
    }

    /// Displacement since the last settled state.
    pub fn back_trace_move(&self) -> Vec2 {
        self.trans.position - self.last_settled.position
    }

    /// Back-trace displacement normalized over the tick's substep count.
    pub fn back_trace_unit_move(&self, substeps: u32) -> Vec2 {
        self.back_trace_move() / substeps.max(1) as f32
    }

    /// Record the current transform as the settled state (end-of-substep
    /// commit). Collapses the max wrap bound back onto the tight bound.
    pub fn settle(&mut self) {
        self.last_settled = self.trans;
        self.max_bound = self.min_bound;
    }

    /// Broad filter: tight-bound overlap.
    pub fn rough_collides(&self, other: &Hitbox) -> bool {
        self.min_bound.overlaps(&other.min_bound)
    }

    /// Exact test over all component pairs, short-circuiting on the first hit.
    pub fn collides_with(&self, other: &Hitbox) -> bool {
        for a in &self.components {
            for b in &other.components {
                if a.shape.rough_overlaps(&b.shape) && a.shape.exact_overlaps(&b.shape) {
                    return true;
                }
            }
        }
        false
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        self.components
            .iter()
            .any(|component| component.shape.contains_point(point))
    }
}
