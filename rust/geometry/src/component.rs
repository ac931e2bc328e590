// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Furniture components: views over a shared mesh

use std::sync::Arc;

use joinery_core::Mesh;
use nalgebra::Point3;

use crate::bounds::Aabb;
use crate::measure::Measurements;

/// One discrete piece of furniture found in a scene.
///
/// Holds the parent mesh by `Arc` plus the indices of its faces; vertex data
/// is never copied.
#[derive(Debug, Clone)]
pub struct Component {
    /// Ordinal within its segmentation
    pub id: usize,
    /// Source group name, if the mesh had one for these faces
    pub group: Option<String>,
    /// Zero-based part index when the group held disjoint geometry
    pub part: Option<usize>,
    pub bounds: Aabb,
    pub volume: f64,
    pub surface_area: f64,
    pub centroid: Point3<f64>,
    mesh: Arc<Mesh>,
    faces: Vec<u32>,
}

impl Component {
    pub(crate) fn new(
        id: usize,
        group: Option<String>,
        part: Option<usize>,
        mesh: Arc<Mesh>,
        faces: Vec<u32>,
        measurements: Measurements,
    ) -> Self {
        Self {
            id,
            group,
            part,
            bounds: measurements.bounds,
            volume: measurements.volume,
            surface_area: measurements.surface_area,
            centroid: measurements.centroid,
            mesh,
            faces,
        }
    }

    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Face indices into [`Component::mesh`], ascending
    #[inline]
    pub fn faces(&self) -> &[u32] {
        &self.faces
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Human-readable name: `drawer_1`, `drawer_1#2` for a split group,
    /// `component-3` for ungrouped geometry.
    pub fn label(&self) -> String {
        match (&self.group, self.part) {
            (Some(name), Some(part)) => format!("{}#{}", name, part + 1),
            (Some(name), None) => name.clone(),
            (None, _) => format!("component-{}", self.id),
        }
    }

    /// Whether two components view the same faces of the same mesh
    pub fn same_geometry(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.mesh, &other.mesh) && self.faces == other.faces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{fixtures::single_box, measure};

    fn component(group: Option<&str>, part: Option<usize>) -> Component {
        let mesh = Arc::new(single_box([1.0, 1.0, 1.0]));
        let faces: Vec<u32> = (0..12).collect();
        let m = measure(&mesh, &faces).unwrap();
        Component::new(7, group.map(str::to_string), part, mesh, faces, m)
    }

    #[test]
    fn test_labels() {
        assert_eq!(component(Some("door"), None).label(), "door");
        assert_eq!(component(Some("door"), Some(1)).label(), "door#2");
        assert_eq!(component(None, None).label(), "component-7");
    }

    #[test]
    fn test_view_shares_mesh() {
        let a = component(None, None);
        let b = a.clone();
        assert!(a.same_geometry(&b));
        assert_eq!(a.face_count(), 12);
        assert_eq!(a.mesh().vertex_count(), 8);
    }
}
