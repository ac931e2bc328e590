// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Incremental mesh assembly shared by every format parser
//!
//! Parsers push raw vertices and polygon index lists; the builder converts
//! positions into the canonical frame, validates indices, triangulates,
//! drops degenerate faces and keeps the group table. Nothing here fails on
//! a single bad face: those become warnings.

use nalgebra::Point3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::format::MeshFormat;
use crate::frame::Frame;
use crate::loader::LoadedMesh;
use crate::mesh::Mesh;
use crate::triangulation::triangulate_polygon;
use crate::warning::{DropReason, GeometryWarning};
use crate::weld::VertexWelder;

/// Relative area below which a triangle counts as degenerate
const DEGENERATE_RATIO: f64 = 1e-12;

pub struct MeshBuilder {
    format: MeshFormat,
    frame: Frame,
    vertices: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
    face_groups: Vec<Option<u32>>,
    groups: Vec<String>,
    group_lookup: FxHashMap<String, u32>,
    current_group: Option<String>,
    welder: Option<VertexWelder>,
    warnings: Vec<GeometryWarning>,
    face_records: usize,
}

impl MeshBuilder {
    pub fn new(format: MeshFormat, frame: Frame) -> Self {
        Self {
            format,
            frame,
            vertices: Vec::new(),
            faces: Vec::new(),
            face_groups: Vec::new(),
            groups: Vec::new(),
            group_lookup: FxHashMap::default(),
            current_group: None,
            welder: None,
            warnings: Vec::new(),
            face_records: 0,
        }
    }

    /// Merge vertices closer than `tolerance` (canonical units) on insert
    pub fn with_welding(mut self, tolerance: f64) -> Self {
        self.welder = Some(VertexWelder::new(tolerance));
        self
    }

    pub fn format(&self) -> MeshFormat {
        self.format
    }

    /// Vertices stored so far (after welding)
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Add a source-frame vertex and return its index
    pub fn add_vertex(&mut self, p: Point3<f64>) -> u32 {
        let p = self.frame.apply(p);
        match self.welder.as_mut() {
            Some(welder) => welder.find_or_insert(p, &mut self.vertices),
            None => {
                self.vertices.push(p);
                (self.vertices.len() - 1) as u32
            }
        }
    }

    /// Switch the group assigned to subsequent faces. Blank names clear it.
    pub fn set_group(&mut self, name: Option<&str>) {
        self.current_group = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
    }

    /// Add one source face given as 0-based vertex indices.
    ///
    /// Every call counts as one source record, whether or not the face
    /// survives, so warnings point back at the file.
    pub fn add_face(&mut self, indices: &[i64]) {
        self.face_records += 1;
        let record = self.face_records;
        let vertex_count = self.vertices.len();

        if let Some(&bad) = indices
            .iter()
            .find(|&&i| i < 0 || i as u64 >= vertex_count as u64)
        {
            self.drop_face(
                record,
                DropReason::IndexOutOfRange {
                    index: bad,
                    vertex_count,
                },
            );
            return;
        }

        // Collapse repeated neighbours (welded STL facets produce these)
        let mut polygon: SmallVec<[u32; 8]> = SmallVec::new();
        for &i in indices {
            let i = i as u32;
            if polygon.last() != Some(&i) {
                polygon.push(i);
            }
        }
        while polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon.pop();
        }

        if polygon.len() < 3 {
            self.drop_face(record, DropReason::Degenerate);
            return;
        }

        let group = self.resolve_group();
        let before = self.faces.len();

        if polygon.len() == 3 {
            let tri = [polygon[0], polygon[1], polygon[2]];
            if !self.is_degenerate(&tri) {
                self.faces.push(tri);
            }
        } else {
            let points: SmallVec<[Point3<f64>; 8]> = polygon
                .iter()
                .map(|&i| self.vertices[i as usize])
                .collect();
            if let Some(triangles) = triangulate_polygon(&points) {
                for [a, b, c] in triangles {
                    let tri = [polygon[a], polygon[b], polygon[c]];
                    if !self.is_degenerate(&tri) {
                        self.faces.push(tri);
                    }
                }
            }
        }

        let added = self.faces.len() - before;
        if added == 0 {
            self.drop_face(record, DropReason::Degenerate);
        } else {
            self.face_groups.extend(std::iter::repeat(group).take(added));
        }
    }

    /// Count a source face the parser already knows is unusable
    pub fn reject_face(&mut self, reason: DropReason) {
        self.face_records += 1;
        self.drop_face(self.face_records, reason);
    }

    fn drop_face(&mut self, record: usize, reason: DropReason) {
        self.warnings.push(GeometryWarning::FaceDropped {
            face: record,
            reason,
        });
    }

    fn resolve_group(&mut self) -> Option<u32> {
        let name = self.current_group.as_ref()?;
        if let Some(&index) = self.group_lookup.get(name) {
            return Some(index);
        }
        let index = self.groups.len() as u32;
        self.groups.push(name.clone());
        self.group_lookup.insert(name.clone(), index);
        Some(index)
    }

    fn is_degenerate(&self, tri: &[u32; 3]) -> bool {
        let [a, b, c] = tri.map(|i| self.vertices[i as usize]);
        let ab = b - a;
        let ac = c - a;
        let bc = c - b;
        let longest_sq = ab
            .norm_squared()
            .max(ac.norm_squared())
            .max(bc.norm_squared());
        if longest_sq == 0.0 {
            return true;
        }
        ab.cross(&ac).norm() <= DEGENERATE_RATIO * longest_sq
    }

    /// Finish the mesh.
    ///
    /// Fails when nothing usable was read: no vertices, no face records, or
    /// every face dropped.
    pub fn finish(mut self) -> Result<LoadedMesh> {
        if self.vertices.is_empty() {
            return Err(Error::malformed(self.format, "mesh", "no vertices"));
        }
        if self.face_records == 0 {
            return Err(Error::malformed(self.format, "mesh", "no faces"));
        }
        if self.faces.is_empty() {
            return Err(Error::malformed(
                self.format,
                "mesh",
                format!("all {} faces are degenerate or invalid", self.face_records),
            ));
        }

        if let Some(welder) = &self.welder {
            if welder.merged() > 0 {
                self.warnings.push(GeometryWarning::VerticesWelded {
                    merged: welder.merged(),
                });
            }
        }

        let non_manifold = count_non_manifold_edges(&self.faces);
        if non_manifold > 0 {
            self.warnings
                .push(GeometryWarning::NonManifoldEdges { count: non_manifold });
        }

        let dropped = self
            .warnings
            .iter()
            .filter(|w| matches!(w, GeometryWarning::FaceDropped { .. }))
            .count();
        tracing::debug!(
            format = %self.format,
            vertices = self.vertices.len(),
            triangles = self.faces.len(),
            groups = self.groups.len(),
            face_records = self.face_records,
            dropped_faces = dropped,
            "Mesh assembled"
        );

        Ok(LoadedMesh {
            mesh: Mesh {
                vertices: self.vertices,
                faces: self.faces,
                face_groups: self.face_groups,
                groups: self.groups,
            },
            format: self.format,
            warnings: self.warnings,
        })
    }
}

/// Count undirected edges used by more than two triangles
pub fn count_non_manifold_edges(faces: &[[u32; 3]]) -> usize {
    let mut edge_uses: FxHashMap<(u32, u32), u32> = FxHashMap::default();
    for &[a, b, c] in faces {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            *edge_uses.entry((u.min(v), u.max(v))).or_insert(0) += 1;
        }
    }
    edge_uses.values().filter(|&&n| n > 2).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::UpAxis;

    fn builder() -> MeshBuilder {
        MeshBuilder::new(MeshFormat::Obj, Frame::default())
    }

    fn square(b: &mut MeshBuilder) {
        b.add_vertex(Point3::new(0.0, 0.0, 0.0));
        b.add_vertex(Point3::new(1.0, 0.0, 0.0));
        b.add_vertex(Point3::new(1.0, 1.0, 0.0));
        b.add_vertex(Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_quad_is_triangulated() {
        let mut b = builder();
        square(&mut b);
        b.add_face(&[0, 1, 2, 3]);
        let loaded = b.finish().unwrap();
        assert_eq!(loaded.mesh.face_count(), 2);
        assert!(loaded.warnings.is_empty());
        assert!((loaded.mesh.surface_area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_face_dropped_with_warning() {
        let mut b = builder();
        square(&mut b);
        b.add_face(&[0, 1, 2]);
        b.add_face(&[0, 1, 9]);
        let loaded = b.finish().unwrap();
        assert_eq!(loaded.mesh.face_count(), 1);
        assert_eq!(
            loaded.warnings,
            vec![GeometryWarning::FaceDropped {
                face: 2,
                reason: DropReason::IndexOutOfRange {
                    index: 9,
                    vertex_count: 4
                }
            }]
        );
    }

    #[test]
    fn test_degenerate_faces() {
        let mut b = builder();
        square(&mut b);
        b.add_face(&[0, 0, 1]);
        b.add_vertex(Point3::new(2.0, 0.0, 0.0));
        b.add_face(&[0, 1, 4]);
        b.add_face(&[0, 1, 2]);
        let loaded = b.finish().unwrap();
        assert_eq!(loaded.mesh.face_count(), 1);
        assert_eq!(loaded.warnings.len(), 2);
        assert!(loaded.warnings.iter().all(|w| matches!(
            w,
            GeometryWarning::FaceDropped {
                reason: DropReason::Degenerate,
                ..
            }
        )));
    }

    #[test]
    fn test_finish_errors() {
        assert!(matches!(
            builder().finish(),
            Err(Error::MalformedGeometry { .. })
        ));

        let mut b = builder();
        square(&mut b);
        assert!(matches!(
            b.finish(),
            Err(Error::MalformedGeometry { reason, .. }) if reason == "no faces"
        ));

        let mut b = builder();
        square(&mut b);
        b.add_face(&[0, 0, 0]);
        assert!(matches!(b.finish(), Err(Error::MalformedGeometry { .. })));
    }

    #[test]
    fn test_groups_in_order_of_first_face() {
        let mut b = builder();
        square(&mut b);
        b.set_group(Some("unused"));
        b.set_group(Some("door"));
        b.add_face(&[0, 1, 2]);
        b.set_group(None);
        b.add_face(&[0, 2, 3]);
        b.set_group(Some("  "));
        b.set_group(Some("door"));
        b.add_face(&[0, 1, 3]);
        let mesh = b.finish().unwrap().mesh;
        assert_eq!(mesh.groups, vec!["door".to_string()]);
        assert_eq!(mesh.face_groups, vec![Some(0), None, Some(0)]);
    }

    #[test]
    fn test_welding_and_frame() {
        let mut b =
            MeshBuilder::new(MeshFormat::Stl, Frame::new(UpAxis::Y, 2.0)).with_welding(1e-6);
        let a = b.add_vertex(Point3::new(0.0, 1.0, 0.0));
        let again = b.add_vertex(Point3::new(0.0, 1.0, 0.0));
        assert_eq!(a, again);
        assert_eq!(b.vertex_count(), 1);
        b.add_vertex(Point3::new(1.0, 0.0, 0.0));
        b.add_vertex(Point3::new(0.0, 0.0, 1.0));
        b.add_face(&[0, 1, 2]);
        let loaded = b.finish().unwrap();
        assert_eq!(loaded.mesh.vertices[0], Point3::new(0.0, 0.0, 2.0));
        assert!(loaded
            .warnings
            .contains(&GeometryWarning::VerticesWelded { merged: 1 }));
    }

    #[test]
    fn test_non_manifold_edges_counted() {
        // Three fins sharing the edge 0-1
        let faces = [[0, 1, 2], [1, 0, 3], [0, 1, 4]];
        assert_eq!(count_non_manifold_edges(&faces), 1);
        assert_eq!(count_non_manifold_edges(&faces[..2]), 0);
    }
}
