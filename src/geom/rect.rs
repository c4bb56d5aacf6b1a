//! Axis-aligned rectangle used for wrap bounds and quad-tree boundaries.

use glam::Vec2;

/// Axis-aligned rectangle described by its min and max corners.
///
/// Overlap and containment tests are written so that NaN coordinates never
/// report a hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl OrthoRect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Tight bound over a point set. Returns a degenerate rect at the
    /// origin for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut iter = points.into_iter();
        let first = match iter.next() {
            Some(p) => p,
            None => return Self::new(Vec2::ZERO, Vec2::ZERO),
        };
        let mut rect = Self::new(first, first);
        for p in iter {
            rect.min = rect.min.min(p);
            rect.max = rect.max.max(p);
        }
        rect
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Closed-interval overlap test.
    #[inline]
    pub fn overlaps(&self, other: &OrthoRect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Whether `other` lies entirely inside this rectangle.
    #[inline]
    pub fn contains_rect(&self, other: &OrthoRect) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    #[inline]
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn union(&self, other: &OrthoRect) -> OrthoRect {
        OrthoRect {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn translated(&self, delta: Vec2) -> OrthoRect {
        OrthoRect {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    pub fn expanded(&self, by: Vec2) -> OrthoRect {
        OrthoRect {
            min: self.min - by,
            max: self.max + by,
        }
    }

    /// Clamp this rectangle into `bounds`, preserving corner ordering.
    pub fn clamped_to(&self, bounds: &OrthoRect) -> OrthoRect {
        OrthoRect {
            min: self.min.clamp(bounds.min, bounds.max),
            max: self.max.clamp(bounds.min, bounds.max),
        }
    }

    /// The four child quadrants, ordered [bottom-left, bottom-right,
    /// top-left, top-right].
    pub fn quadrants(&self) -> [OrthoRect; 4] {
        let c = self.center();
        [
            OrthoRect::new(self.min, c),
            OrthoRect::new(Vec2::new(c.x, self.min.y), Vec2::new(self.max.x, c.y)),
            OrthoRect::new(Vec2::new(self.min.x, c.y), Vec2::new(c.x, self.max.y)),
            OrthoRect::new(c, self.max),
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}
