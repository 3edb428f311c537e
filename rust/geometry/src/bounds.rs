// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes

use nalgebra::Point3;
use smallvec::SmallVec;

/// Axis-aligned box in f64 precision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from two opposite corners (in any order)
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    #[inline]
    pub fn from_corners(min: [f64; 3], max: [f64; 3]) -> Self {
        Self::new(Point3::from(min), Point3::from(max))
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.coords.iter().chain(self.max.coords.iter()).all(|v| v.is_finite())
    }

    #[inline]
    pub fn extent(&self) -> [f64; 3] {
        let d = self.max - self.min;
        [d.x.max(0.0), d.y.max(0.0), d.z.max(0.0)]
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        let [x, y, z] = self.extent();
        x * y * z
    }

    /// Whether the interiors overlap (touching faces do not count)
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
            && self.min.z < other.max.z
            && other.min.z < self.max.z
    }

    /// Overlapping box, if the interiors overlap
    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Aabb {
            min: Point3::new(
                self.min.x.max(other.min.x),
                self.min.y.max(other.min.y),
                self.min.z.max(other.min.z),
            ),
            max: Point3::new(
                self.max.x.min(other.max.x),
                self.max.y.min(other.max.y),
                self.max.z.min(other.max.z),
            ),
        })
    }

    /// Smallest box containing both
    pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Split `self \ other` into at most six disjoint boxes
    ///
    /// Slabs are cut along X first, then Y, then Z, so the pieces never
    /// overlap each other.
    pub fn subtract(&self, other: &Aabb) -> SmallVec<[Aabb; 6]> {
        let mut pieces = SmallVec::new();
        let Some(cut) = self.intersection(other) else {
            pieces.push(*self);
            return pieces;
        };

        let mut rest = *self;
        for axis in 0..3 {
            if rest.min[axis] < cut.min[axis] {
                let mut slab = rest;
                slab.max[axis] = cut.min[axis];
                pieces.push(slab);
            }
            if cut.max[axis] < rest.max[axis] {
                let mut slab = rest;
                slab.min[axis] = cut.max[axis];
                pieces.push(slab);
            }
            rest.min[axis] = cut.min[axis];
            rest.max[axis] = cut.max[axis];
        }
        pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_at(x: f64) -> Aabb {
        Aabb::from_corners([x, 0.0, 0.0], [x + 1.0, 1.0, 1.0])
    }

    #[test]
    fn test_corner_order_is_normalized() {
        let b = Aabb::from_corners([2.0, 2.0, 2.0], [0.0, 0.0, 0.0]);
        assert_eq!(b.min, Point3::origin());
        assert_relative_eq!(b.volume(), 8.0);
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        assert!(!unit_at(0.0).overlaps(&unit_at(1.0)));
        assert!(unit_at(0.0).overlaps(&unit_at(0.5)));
        assert!(unit_at(0.0).intersection(&unit_at(1.0)).is_none());
    }

    #[test]
    fn test_subtract_volume() {
        let big = Aabb::from_corners([0.0, 0.0, 0.0], [3.0, 3.0, 3.0]);
        let hole = Aabb::from_corners([1.0, 1.0, 1.0], [2.0, 2.0, 2.0]);
        let pieces = big.subtract(&hole);
        assert_eq!(pieces.len(), 6);
        let total: f64 = pieces.iter().map(|p| p.volume()).sum();
        assert_relative_eq!(total, 26.0, epsilon = 1e-12);
        for (i, a) in pieces.iter().enumerate() {
            for b in pieces.iter().skip(i + 1) {
                assert!(!a.overlaps(b));
            }
        }
    }

    #[test]
    fn test_subtract_disjoint_keeps_box() {
        let pieces = unit_at(0.0).subtract(&unit_at(5.0));
        assert_eq!(pieces.as_slice(), &[unit_at(0.0)]);
    }
}
