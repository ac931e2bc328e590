// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerance-based vertex welding
//!
//! A grid spatial hash with cubic cells of side `tolerance`. Lookups check
//! the 3x3x3 neighbourhood, so any stored vertex within tolerance is found.

use nalgebra::Point3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Smallest cell edge, keeps exact-match welding (tolerance 0) well defined
const MIN_CELL: f64 = 1e-9;

#[derive(Debug)]
pub struct VertexWelder {
    tolerance_sq: f64,
    cell_size: f64,
    grid: FxHashMap<(i64, i64, i64), SmallVec<[u32; 4]>>,
    merged: usize,
}

impl VertexWelder {
    pub fn new(tolerance: f64) -> Self {
        let tolerance = if tolerance.is_finite() { tolerance.max(0.0) } else { 0.0 };
        Self {
            tolerance_sq: tolerance * tolerance,
            cell_size: tolerance.max(MIN_CELL),
            grid: FxHashMap::default(),
            merged: 0,
        }
    }

    /// Number of insertions that resolved to an existing vertex
    #[inline]
    pub fn merged(&self) -> usize {
        self.merged
    }

    /// Return the index of a stored vertex within tolerance of `p`, or push
    /// `p` onto `vertices` and return its new index.
    pub fn find_or_insert(&mut self, p: Point3<f64>, vertices: &mut Vec<Point3<f64>>) -> u32 {
        let (cx, cy, cz) = self.cell_coords(&p);

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &index in bucket {
                        if (vertices[index as usize] - p).norm_squared() <= self.tolerance_sq {
                            self.merged += 1;
                            return index;
                        }
                    }
                }
            }
        }

        let index = vertices.len() as u32;
        vertices.push(p);
        self.grid.entry((cx, cy, cz)).or_default().push(index);
        index
    }

    fn cell_coords(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_duplicates_merge() {
        let mut welder = VertexWelder::new(0.0);
        let mut vertices = Vec::new();
        let a = welder.find_or_insert(Point3::new(1.0, 2.0, 3.0), &mut vertices);
        let b = welder.find_or_insert(Point3::new(1.0, 2.0, 3.0), &mut vertices);
        let c = welder.find_or_insert(Point3::new(1.0, 2.0, 3.1), &mut vertices);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(vertices.len(), 2);
        assert_eq!(welder.merged(), 1);
    }

    #[test]
    fn test_tolerance_across_cell_boundary() {
        let mut welder = VertexWelder::new(1e-4);
        let mut vertices = Vec::new();
        let a = welder.find_or_insert(Point3::new(0.99995, 0.0, 0.0), &mut vertices);
        let b = welder.find_or_insert(Point3::new(1.00004, 0.0, 0.0), &mut vertices);
        assert_eq!(a, b);
    }
}
