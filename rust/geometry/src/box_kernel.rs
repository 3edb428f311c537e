// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Box-set solid kernel
//!
//! Represents a solid as a set of interior-disjoint axis-aligned boxes.
//! Union and intersection stay exact inside that representation, which makes
//! this kernel a good stand-in for openings, sleeves and other orthogonal
//! elements when no host kernel is available.

use crate::bounds::Aabb;
use crate::{Error, Result, SolidKernel};
use smallvec::SmallVec;

/// Solid made of interior-disjoint boxes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxSolid {
    boxes: SmallVec<[Aabb; 4]>,
}

impl BoxSolid {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_box(aabb: Aabb) -> Self {
        let mut boxes = SmallVec::new();
        boxes.push(aabb);
        Self { boxes }
    }

    /// Cuboid spanning two opposite corners
    pub fn cuboid(min: [f64; 3], max: [f64; 3]) -> Self {
        Self::from_box(Aabb::from_corners(min, max))
    }

    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.boxes.iter().all(Aabb::is_finite) {
            Ok(())
        } else {
            Err(Error::degenerate("box solid has non-finite coordinates"))
        }
    }

    fn bounds(&self) -> Option<Aabb> {
        let mut iter = self.boxes.iter();
        let first = *iter.next()?;
        Some(iter.fold(first, |acc, b| acc.merged(b)))
    }
}

/// Kernel over [`BoxSolid`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxKernel;

impl BoxKernel {
    pub fn new() -> Self {
        Self
    }
}

impl SolidKernel for BoxKernel {
    type Shape = BoxSolid;

    fn volume(&self, shape: &BoxSolid) -> f64 {
        shape.boxes.iter().map(Aabb::volume).sum()
    }

    /// `a ∪ b` computed as `a` plus the parts of `b` outside `a`
    fn union(&self, a: &BoxSolid, b: &BoxSolid) -> Result<BoxSolid> {
        a.check()?;
        b.check()?;

        let mut result = a.clone();
        for piece in &b.boxes {
            let mut remaining: SmallVec<[Aabb; 6]> = SmallVec::new();
            remaining.push(*piece);
            for existing in &a.boxes {
                remaining = remaining
                    .iter()
                    .flat_map(|r| r.subtract(existing))
                    .collect();
                if remaining.is_empty() {
                    break;
                }
            }
            result
                .boxes
                .extend(remaining.into_iter().filter(|r| r.volume() > 0.0));
        }
        Ok(result)
    }

    fn intersect(&self, a: &BoxSolid, b: &BoxSolid) -> Result<BoxSolid> {
        a.check()?;
        b.check()?;

        let mut result = BoxSolid::empty();
        for x in &a.boxes {
            for y in &b.boxes {
                if let Some(overlap) = x.intersection(y) {
                    result.boxes.push(overlap);
                }
            }
        }
        Ok(result)
    }

    fn bounds(&self, shape: &BoxSolid) -> Option<Aabb> {
        shape.bounds()
    }
}
