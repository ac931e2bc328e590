// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared-edge face adjacency
//!
//! Two faces are neighbours only when they share an undirected edge.
//! Touching at a single vertex never connects them.

use std::collections::VecDeque;

use joinery_core::Mesh;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Normalize an edge so (a, b) and (b, a) hash the same
#[inline]
fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Face adjacency over a subset of a mesh's faces.
///
/// Faces are addressed by their position in the subset ("local" index).
#[derive(Debug, Clone)]
pub struct EdgeAdjacency {
    faces: Vec<u32>,
    neighbours: Vec<SmallVec<[u32; 3]>>,
}

impl EdgeAdjacency {
    pub fn build(mesh: &Mesh, faces: &[u32]) -> Self {
        let mut edge_to_faces: FxHashMap<(u32, u32), SmallVec<[u32; 2]>> = FxHashMap::default();
        edge_to_faces.reserve(faces.len() * 3 / 2);

        for (local, &f) in faces.iter().enumerate() {
            let [a, b, c] = mesh.faces[f as usize];
            for edge in [edge_key(a, b), edge_key(b, c), edge_key(c, a)] {
                edge_to_faces.entry(edge).or_default().push(local as u32);
            }
        }

        let mut neighbours: Vec<SmallVec<[u32; 3]>> = vec![SmallVec::new(); faces.len()];
        for sharing in edge_to_faces.values() {
            for (i, &f) in sharing.iter().enumerate() {
                for &g in &sharing[i + 1..] {
                    if f != g {
                        neighbours[f as usize].push(g);
                        neighbours[g as usize].push(f);
                    }
                }
            }
        }
        // Hash iteration order must not leak into traversal order
        for list in &mut neighbours {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            faces: faces.to_vec(),
            neighbours,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Mesh face index of a local face
    #[inline]
    pub fn face(&self, local: usize) -> u32 {
        self.faces[local]
    }

    /// Local neighbours of a local face
    #[inline]
    pub fn neighbours(&self, local: usize) -> &[u32] {
        &self.neighbours[local]
    }

    /// Edge-connected components as sorted mesh face indices.
    ///
    /// Components are ordered by their lowest face index when the subset
    /// itself is sorted ascending.
    pub fn components(&self) -> Vec<Vec<u32>> {
        let n = self.faces.len();
        let mut visited = vec![false; n];
        let mut components = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }

            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            visited[start] = true;
            queue.push_back(start);

            while let Some(local) = queue.pop_front() {
                component.push(self.faces[local]);
                for &next in &self.neighbours[local] {
                    let next = next as usize;
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }

            component.sort_unstable();
            components.push(component);
        }

        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::fixtures::add_box;
    use nalgebra::Point3;

    #[test]
    fn test_two_boxes_two_components() {
        let mut mesh = Mesh::new();
        add_box(&mut mesh, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0], None);
        add_box(&mut mesh, [3.0, 0.0, 0.0], [1.0, 1.0, 1.0], None);
        let faces: Vec<u32> = (0..24).collect();
        let components = EdgeAdjacency::build(&mesh, &faces).components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0], (0..12).collect::<Vec<_>>());
        assert_eq!(components[1], (12..24).collect::<Vec<_>>());
    }

    #[test]
    fn test_shared_vertex_does_not_connect() {
        // Two triangles meeting only at vertex 0
        let mesh = Mesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(-1.0, 0.0, 0.0),
                Point3::new(0.0, -1.0, 0.0),
            ],
            faces: vec![[0, 1, 2], [0, 3, 4]],
            face_groups: vec![None, None],
            groups: vec![],
        };
        let adjacency = EdgeAdjacency::build(&mesh, &[0, 1]);
        assert!(adjacency.neighbours(0).is_empty());
        assert_eq!(adjacency.components().len(), 2);
    }

    #[test]
    fn test_subset_addresses_local_faces() {
        let mut mesh = Mesh::new();
        add_box(&mut mesh, [0.0, 0.0, 0.0], [1.0, 1.0, 1.0], None);
        // Bottom quad only: faces 0 and 1 share the diagonal
        let adjacency = EdgeAdjacency::build(&mesh, &[0, 1]);
        assert_eq!(adjacency.neighbours(0), &[1]);
        assert_eq!(adjacency.face(1), 1);
    }
}
