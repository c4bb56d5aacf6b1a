//! Oriented rectangle with cached corners and edge normals.

use glam::Vec2;

use super::rect::OrthoRect;
use super::transform::Transform2;

/// An oriented rectangle: a world transform plus half extents.
///
/// Corners and edge-normal axes are derived whenever the transform changes;
/// they are never mutated independently. Corner order is counter-clockwise
/// starting from the (+x, +y) local corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectBox {
    trans: Transform2,
    half_extents: Vec2,
    corners: [Vec2; 4],
    /// Unit edge normals: the rotated local x and y axes.
    axes: [Vec2; 2],
}

impl RectBox {
    pub fn new(trans: Transform2, half_extents: Vec2) -> Self {
        let mut boxed = Self {
            trans,
            half_extents,
            corners: [Vec2::ZERO; 4],
            axes: [Vec2::X, Vec2::Y],
        };
        boxed.derive();
        boxed
    }

    fn derive(&mut self) {
        let x_axis = Vec2::from_angle(self.trans.rotation);
        let y_axis = x_axis.perp();
        let ex = x_axis * self.half_extents.x;
        let ey = y_axis * self.half_extents.y;
        let c = self.trans.position;
        self.axes = [x_axis, y_axis];
        self.corners = [c + ex + ey, c - ex + ey, c - ex - ey, c + ex - ey];
    }

    pub fn trans(&self) -> Transform2 {
        self.trans
    }

    pub fn half_extents(&self) -> Vec2 {
        self.half_extents
    }

    pub fn center(&self) -> Vec2 {
        self.trans.position
    }

    pub fn corners(&self) -> &[Vec2; 4] {
        &self.corners
    }

    pub fn axes(&self) -> &[Vec2; 2] {
        &self.axes
    }

    pub fn set_transform(&mut self, trans: Transform2) {
        self.trans = trans;
        self.derive();
    }

    /// Shift the box without touching its rotation. Pure translation needs
    /// no trigonometry, which keeps the time-of-impact stepping loop cheap.
    pub fn translate(&mut self, delta: Vec2) {
        self.trans.position += delta;
        for corner in &mut self.corners {
            *corner += delta;
        }
    }

    /// Axis-aligned bound over the four corners.
    pub fn bounding(&self) -> OrthoRect {
        OrthoRect::from_points(self.corners.iter().copied())
    }

    /// Broad-phase filter: axis-aligned bound overlap.
    pub fn rough_overlaps(&self, other: &RectBox) -> bool {
        self.bounding().overlaps(&other.bounding())
    }

    /// Separating-axis test over the four edge normals of the two boxes.
    ///
    /// Degenerate inputs (NaN transform) report no overlap.
    pub fn exact_overlaps(&self, other: &RectBox) -> bool {
        if !self.trans.is_finite() || !other.trans.is_finite() {
            return false;
        }
        for axis in self.axes.iter().chain(other.axes.iter()) {
            let (min_a, max_a) = self.project_onto(*axis);
            let (min_b, max_b) = other.project_onto(*axis);
            if max_a < min_b || max_b < min_a {
                return false;
            }
        }
        true
    }

    /// Project the corners onto a unit axis, returning (min, max).
    pub fn project_onto(&self, axis: Vec2) -> (f32, f32) {
        let mut min = self.corners[0].dot(axis);
        let mut max = min;
        for corner in &self.corners[1..] {
            let d = corner.dot(axis);
            min = min.min(d);
            max = max.max(d);
        }
        (min, max)
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        let d = point - self.trans.position;
        d.dot(self.axes[0]).abs() <= self.half_extents.x
            && d.dot(self.axes[1]).abs() <= self.half_extents.y
    }
}
