//! Broad-phase spatial index: a region quad-tree over motion-inflated wrap bounds.
//!
//! The tree is cleared and rebuilt once per substep; during the detect
//! phase it is frozen and shared read-only across worker threads.

use glam::Vec2;

use crate::geom::OrthoRect;

use super::hitbox::Hitbox;

/// Capability interface for anything stored in the spatial index.
pub trait TreeItem {
    /// Bound used for placement and candidate enumeration.
    fn bound(&self) -> OrthoRect;
    /// Cheap pre-filter against another item.
    fn rough_intersects(&self, other: &Self) -> bool;
    /// Precise test, only run on rough survivors.
    fn exact_intersects(&self, other: &Self) -> bool;
    fn contains_point(&self, point: Vec2) -> bool;
}

/// Region quad-tree node.
///
/// Items live in the smallest node whose boundary fully contains their
/// bound; items straddling a child split stay in the parent, and leaves at
/// maximum depth hold arbitrarily many items. The root boundary is fixed
/// for the life of the tree.
#[derive(Debug)]
pub struct QuadTree<T> {
    boundary: OrthoRect,
    capacity: usize,
    /// Splits remaining below this node.
    depth: u32,
    items: Vec<T>,
    children: Option<Box<[QuadTree<T>; 4]>>,
}

impl<T: TreeItem> QuadTree<T> {
    pub fn new(boundary: OrthoRect, capacity: usize, max_depth: u32) -> Self {
        Self {
            boundary,
            capacity: capacity.max(1),
            depth: max_depth,
            items: Vec::new(),
            children: None,
        }
    }

    pub fn boundary(&self) -> OrthoRect {
        self.boundary
    }

    /// Items stored directly on this node (excluding children).
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Total number of items in this node and every descendant.
    pub fn len(&self) -> usize {
        let mut count = self.items.len();
        if let Some(children) = &self.children {
            for child in children.iter() {
                count += child.len();
            }
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all items and child nodes; the root boundary stays fixed.
    pub fn clear(&mut self) {
        self.items.clear();
        self.children = None;
    }

    /// Insert an item, descending to the smallest fully-containing node.
    ///
    /// An item whose bound is not fully inside the root boundary is clamped:
    /// it is kept on the root node and `true` is returned so the caller can
    /// report the condition.
    pub fn insert(&mut self, item: T) -> bool {
        let bound = item.bound();
        if self.boundary.contains_rect(&bound) {
            self.insert_inner(item, &bound);
            false
        } else {
            self.items.push(item);
            true
        }
    }

    fn insert_inner(&mut self, item: T, bound: &OrthoRect) {
        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                if child.boundary.contains_rect(bound) {
                    return child.insert_inner(item, bound);
                }
            }
            self.items.push(item);
        } else if self.items.len() < self.capacity || self.depth == 0 {
            self.items.push(item);
        } else {
            self.split();
            self.insert_inner(item, bound);
        }
    }

    /// Create the four child quadrants and push down every contained item.
    fn split(&mut self) {
        let mut children = Box::new(
            self.boundary
                .quadrants()
                .map(|quadrant| QuadTree::new(quadrant, self.capacity, self.depth - 1)),
        );
        for item in std::mem::take(&mut self.items) {
            let bound = item.bound();
            match children
                .iter_mut()
                .find(|child| child.boundary.contains_rect(&bound))
            {
                Some(child) => child.insert_inner(item, &bound),
                None => self.items.push(item),
            }
        }
        self.children = Some(children);
    }

    /// Whether any stored item overlaps the probe (rough test, then exact).
    /// Short-circuits on the first hit.
    pub fn any_overlap(&self, probe: &T) -> bool {
        let bound = probe.bound();
        // Root items are tested unconditionally: clamped out-of-bounds
        // items are kept here.
        if self.hit_in_items(probe) {
            return true;
        }
        match &self.children {
            Some(children) => children.iter().any(|child| child.any_overlap_in(probe, &bound)),
            None => false,
        }
    }

    fn any_overlap_in(&self, probe: &T, bound: &OrthoRect) -> bool {
        if !self.boundary.overlaps(bound) {
            return false;
        }
        if self.hit_in_items(probe) {
            return true;
        }
        match &self.children {
            Some(children) => children.iter().any(|child| child.any_overlap_in(probe, bound)),
            None => false,
        }
    }

    fn hit_in_items(&self, probe: &T) -> bool {
        self.items
            .iter()
            .any(|item| item.rough_intersects(probe) && item.exact_intersects(probe))
    }

    /// Visit every item whose stored bound intersects the query bound.
    ///
    /// This is the candidate enumeration used by the detect phase; exact
    /// testing is the caller's job.
    pub fn candidates<'a>(&'a self, bound: &OrthoRect, visitor: &mut impl FnMut(&'a T)) {
        for item in &self.items {
            if item.bound().overlaps(bound) {
                visitor(item);
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.candidates_in(bound, visitor);
            }
        }
    }

    fn candidates_in<'a>(&'a self, bound: &OrthoRect, visitor: &mut impl FnMut(&'a T)) {
        if !self.boundary.overlaps(bound) {
            return;
        }
        for item in &self.items {
            if item.bound().overlaps(bound) {
                visitor(item);
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.candidates_in(bound, visitor);
            }
        }
    }

    /// Pre-order traversal over nodes, for diagnostics and debug overlays.
    pub fn for_each_node<'a>(&'a self, visitor: &mut impl FnMut(&'a QuadTree<T>)) {
        visitor(self);
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.for_each_node(visitor);
            }
        }
    }
}

/// Frozen per-substep snapshot of one entity's collision state, as stored
/// in the spatial index.
#[derive(Debug, Clone)]
pub struct ColliderProxy {
    pub entity: hecs::Entity,
    pub hitbox: Hitbox,
}

impl TreeItem for ColliderProxy {
    fn bound(&self) -> OrthoRect {
        self.hitbox.max_wrap_bound()
    }

    fn rough_intersects(&self, other: &Self) -> bool {
        self.hitbox.rough_collides(&other.hitbox)
    }

    fn exact_intersects(&self, other: &Self) -> bool {
        self.hitbox.collides_with(&other.hitbox)
    }

    fn contains_point(&self, point: Vec2) -> bool {
        self.hitbox.contains_point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{RectBox, Transform2};
    use rand::{Rng, SeedableRng};

    #[derive(Debug, Clone)]
    struct TestBox(RectBox);

    impl TestBox {
        fn new(center: Vec2, half_extents: Vec2) -> Self {
            Self(RectBox::new(Transform2::from_position(center), half_extents))
        }
    }

    impl TreeItem for TestBox {
        fn bound(&self) -> OrthoRect {
            self.0.bounding()
        }
        fn rough_intersects(&self, other: &Self) -> bool {
            self.0.rough_overlaps(&other.0)
        }
        fn exact_intersects(&self, other: &Self) -> bool {
            self.0.exact_overlaps(&other.0)
        }
        fn contains_point(&self, point: Vec2) -> bool {
            self.0.contains_point(point)
        }
    }

    fn world_tree() -> QuadTree<TestBox> {
        QuadTree::new(
            OrthoRect::from_center(Vec2::ZERO, Vec2::splat(100.0)),
            4,
            6,
        )
    }

    #[test]
    fn test_split_on_capacity() {
        let mut tree = world_tree();
        // Five items clustered in one quadrant force a split.
        for i in 0..5 {
            tree.insert(TestBox::new(Vec2::new(50.0 + i as f32, 50.0), Vec2::splat(0.4)));
        }
        assert_eq!(tree.len(), 5);

        let mut nodes = 0;
        tree.for_each_node(&mut |_| nodes += 1);
        assert!(nodes > 1, "tree should have split: {nodes} nodes");
    }

    #[test]
    fn test_items_contained_in_their_node() {
        let mut rng = rand_pcg::Pcg64Mcg::seed_from_u64(11);
        let mut boxes = Vec::new();
        for _ in 0..200 {
            let center = Vec2::new(rng.random_range(-90.0..90.0), rng.random_range(-90.0..90.0));
            let half = Vec2::new(rng.random_range(0.2..3.0), rng.random_range(0.2..3.0));
            boxes.push(TestBox::new(center, half));
        }

        // Rebuild-consistency invariant: after clear + reinsert of every
        // item, each stored item's bound lies inside the boundary of the
        // node that stores it.
        let mut tree = world_tree();
        for round in 0..2 {
            tree.clear();
            for b in &boxes {
                assert!(!tree.insert(b.clone()));
            }
            assert_eq!(tree.len(), 200, "round {round}");
            tree.for_each_node(&mut |node| {
                for item in node.items() {
                    assert!(node.boundary().contains_rect(&item.bound()));
                }
            });
        }
    }

    #[test]
    fn test_clear_keeps_boundary() {
        let mut tree = world_tree();
        for i in 0..32 {
            tree.insert(TestBox::new(Vec2::splat(i as f32), Vec2::splat(0.5)));
        }
        let boundary = tree.boundary();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.boundary(), boundary);
    }

    #[test]
    fn test_query_matches_brute_force() {
        let mut rng = rand_pcg::Pcg64Mcg::seed_from_u64(23);
        let mut boxes = Vec::new();
        for _ in 0..120 {
            let center = Vec2::new(rng.random_range(-80.0..80.0), rng.random_range(-80.0..80.0));
            let half = Vec2::new(rng.random_range(0.5..6.0), rng.random_range(0.5..6.0));
            boxes.push(TestBox::new(center, half));
        }
        let mut tree = world_tree();
        for b in &boxes {
            tree.insert(b.clone());
        }

        // No false negatives against the O(n^2) ground truth.
        for (i, a) in boxes.iter().enumerate() {
            for (j, b) in boxes.iter().enumerate() {
                if i == j || !a.exact_intersects(b) {
                    continue;
                }
                let mut found = false;
                tree.candidates(&a.bound(), &mut |candidate| {
                    if candidate.exact_intersects(a)
                        && candidate.0.center() == boxes[j].0.center()
                    {
                        found = true;
                    }
                });
                assert!(found, "pair ({i}, {j}) missed by the index");
            }
        }
    }

    #[test]
    fn test_any_overlap_probe() {
        let mut tree = world_tree();
        tree.insert(TestBox::new(Vec2::new(10.0, 10.0), Vec2::splat(1.0)));
        tree.insert(TestBox::new(Vec2::new(-40.0, 20.0), Vec2::splat(1.0)));

        let hit = TestBox::new(Vec2::new(10.5, 10.5), Vec2::splat(1.0));
        let miss = TestBox::new(Vec2::new(60.0, -60.0), Vec2::splat(1.0));
        assert!(tree.any_overlap(&hit));
        assert!(!tree.any_overlap(&miss));
    }

    #[test]
    fn test_out_of_bounds_insert_clamped_and_reported() {
        let mut tree = world_tree();
        let outside = TestBox::new(Vec2::new(500.0, 0.0), Vec2::splat(2.0));
        assert!(tree.insert(outside));
        assert_eq!(tree.len(), 1);

        // Still discoverable by a probe at its true position.
        let probe = TestBox::new(Vec2::new(501.0, 0.0), Vec2::splat(2.0));
        assert!(tree.any_overlap(&probe));

        let mut seen = 0;
        tree.candidates(
            &OrthoRect::from_center(Vec2::new(500.0, 0.0), Vec2::splat(5.0)),
            &mut |_| seen += 1,
        );
        assert_eq!(seen, 1);
    }
}
