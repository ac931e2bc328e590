// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Point3, Vector3};

/// Indexed triangle mesh with optional per-face group names.
///
/// Built once by a loader and never mutated afterwards. Every face index is
/// guaranteed to resolve within `vertices`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions in the canonical frame
    pub vertices: Vec<Point3<f64>>,
    /// Triangle indices (i0, i1, i2)
    pub faces: Vec<[u32; 3]>,
    /// Group per face, indexing into `groups`
    pub face_groups: Vec<Option<u32>>,
    /// Group names in order of first appearance
    pub groups: Vec<String>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get triangle count
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// True when at least one face carries a group name
    #[inline]
    pub fn has_groups(&self) -> bool {
        self.face_groups.iter().any(Option::is_some)
    }

    /// Group index of a face
    #[inline]
    pub fn group_index(&self, face: usize) -> Option<u32> {
        self.face_groups.get(face).copied().flatten()
    }

    /// Group name of a face
    #[inline]
    pub fn group_name(&self, face: usize) -> Option<&str> {
        self.group_index(face)
            .and_then(|g| self.groups.get(g as usize))
            .map(String::as_str)
    }

    /// Corner positions of a face
    #[inline]
    pub fn triangle(&self, face: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[face];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Unnormalized face normal (length = 2 x area)
    #[inline]
    pub fn face_cross(&self, face: usize) -> Vector3<f64> {
        let [a, b, c] = self.triangle(face);
        (b - a).cross(&(c - a))
    }

    /// Triangle area
    #[inline]
    pub fn face_area(&self, face: usize) -> f64 {
        self.face_cross(face).norm() * 0.5
    }

    /// Unit face normal, `None` for zero-area faces
    #[inline]
    pub fn face_normal(&self, face: usize) -> Option<Vector3<f64>> {
        self.face_cross(face).try_normalize(f64::EPSILON)
    }

    /// Calculate bounds (min, max) over all vertices
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        if self.vertices.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
        let mut max = Point3::new(f64::MIN, f64::MIN, f64::MIN);

        for v in &self.vertices {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }

        (min, max)
    }

    /// Total surface area
    pub fn surface_area(&self) -> f64 {
        (0..self.faces.len()).map(|f| self.face_area(f)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Mesh {
        Mesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![[0, 1, 2]],
            face_groups: vec![Some(0)],
            groups: vec!["shelf".to_string()],
        }
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.face_count(), 0);
        assert!(!mesh.has_groups());
    }

    #[test]
    fn test_face_queries() {
        let mesh = unit_triangle();
        assert!((mesh.face_area(0) - 0.5).abs() < 1e-12);
        assert_eq!(mesh.face_normal(0), Some(Vector3::z()));
        assert_eq!(mesh.group_name(0), Some("shelf"));
        assert_eq!(mesh.group_name(5), None);
    }

    #[test]
    fn test_bounds() {
        let mesh = unit_triangle();
        let (min, max) = mesh.bounds();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));
    }
}
