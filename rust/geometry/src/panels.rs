// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar panel detection
//!
//! Faces are grown into regions over shared edges while their normal stays
//! close to the seed's. Flat rectangular regions of useful size are the
//! sheets a joiner would cut.

use joinery_core::Mesh;
use nalgebra::Vector3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::adjacency::EdgeAdjacency;

/// A planar face region
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarRegion {
    /// Mesh face indices, in growth order
    pub faces: Vec<u32>,
    /// Seed face normal
    pub normal: Vector3<f64>,
    pub area: f64,
    /// Region area over its in-plane bounding rectangle
    pub rectangularity: f64,
}

/// Region-growing parameters
#[derive(Debug, Clone, Copy)]
pub struct PanelCriteria {
    pub normal_tolerance_deg: f64,
    pub rectangularity_min: f64,
    pub min_area_fraction: f64,
}

/// Grow planar regions over `faces`. Degenerate faces join no region.
pub fn planar_regions(mesh: &Mesh, faces: &[u32], normal_tolerance_deg: f64) -> Vec<PlanarRegion> {
    let adjacency = EdgeAdjacency::build(mesh, faces);
    let normals: Vec<Option<Vector3<f64>>> = faces
        .iter()
        .map(|&f| mesh.face_normal(f as usize))
        .collect();
    let cos_tolerance = normal_tolerance_deg.to_radians().cos();

    let mut visited = vec![false; faces.len()];
    let mut regions = Vec::new();

    for seed in 0..faces.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let Some(seed_normal) = normals[seed] else {
            continue;
        };

        let mut members = vec![seed];
        let mut cursor = 0;
        while cursor < members.len() {
            let local = members[cursor];
            cursor += 1;
            for &next in adjacency.neighbours(local) {
                let next = next as usize;
                if visited[next] {
                    continue;
                }
                if let Some(n) = normals[next] {
                    if n.dot(&seed_normal) >= cos_tolerance {
                        visited[next] = true;
                        members.push(next);
                    }
                }
            }
        }

        let region_faces: Vec<u32> = members.iter().map(|&l| adjacency.face(l)).collect();
        let area = region_faces.iter().map(|&f| mesh.face_area(f as usize)).sum();
        let rectangularity = rectangularity(mesh, &region_faces, &seed_normal, area);
        regions.push(PlanarRegion {
            faces: region_faces,
            normal: seed_normal,
            area,
            rectangularity,
        });
    }

    regions
}

/// Number of regions that qualify as panels
pub fn count_panels(mesh: &Mesh, faces: &[u32], criteria: &PanelCriteria) -> usize {
    let surface: f64 = faces.iter().map(|&f| mesh.face_area(f as usize)).sum();
    if surface <= 0.0 {
        return 0;
    }
    let min_area = criteria.min_area_fraction * surface;

    planar_regions(mesh, faces, criteria.normal_tolerance_deg)
        .iter()
        .filter(|r| r.area >= min_area && r.rectangularity >= criteria.rectangularity_min)
        .count()
}

/// Area over the bounding rectangle aligned with the longest boundary edge
fn rectangularity(mesh: &Mesh, faces: &[u32], normal: &Vector3<f64>, area: f64) -> f64 {
    // Boundary edges are used by exactly one face of the region
    let mut edge_use: FxHashMap<(u32, u32), u32> = FxHashMap::default();
    for &f in faces {
        let [a, b, c] = mesh.faces[f as usize];
        for (p, q) in [(a, b), (b, c), (c, a)] {
            *edge_use.entry((p.min(q), p.max(q))).or_insert(0) += 1;
        }
    }

    let mut boundary: SmallVec<[(u32, u32); 16]> = edge_use
        .into_iter()
        .filter(|&(_, uses)| uses == 1)
        .map(|(edge, _)| edge)
        .collect();
    boundary.sort_unstable();

    let in_plane = |d: Vector3<f64>| d - normal * d.dot(normal);
    let mut axis: Option<Vector3<f64>> = None;
    let mut longest = 0.0;
    for &(p, q) in &boundary {
        let d = in_plane(mesh.vertices[q as usize] - mesh.vertices[p as usize]);
        let len = d.norm();
        if len > longest {
            longest = len;
            axis = Some(d / len);
        }
    }
    let Some(u) = axis else {
        return 0.0;
    };
    let v = normal.cross(&u);

    let (mut u_min, mut u_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut v_min, mut v_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &f in faces {
        for &i in &mesh.faces[f as usize] {
            let p = mesh.vertices[i as usize].coords;
            let (pu, pv) = (p.dot(&u), p.dot(&v));
            u_min = u_min.min(pu);
            u_max = u_max.max(pu);
            v_min = v_min.min(pv);
            v_max = v_max.max(pv);
        }
    }

    let rect = (u_max - u_min) * (v_max - v_min);
    if rect > 0.0 {
        (area / rect).min(1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::fixtures::single_box;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn criteria() -> PanelCriteria {
        PanelCriteria {
            normal_tolerance_deg: 10.0,
            rectangularity_min: 0.85,
            min_area_fraction: 0.02,
        }
    }

    #[test]
    fn test_box_has_six_panels() {
        let mesh = single_box([0.6, 0.4, 0.7]);
        let faces: Vec<u32> = (0..12).collect();
        let regions = planar_regions(&mesh, &faces, 10.0);
        assert_eq!(regions.len(), 6);
        for region in &regions {
            assert_relative_eq!(region.rectangularity, 1.0, epsilon = 1e-9);
        }
        assert_eq!(count_panels(&mesh, &faces, &criteria()), 6);
    }

    #[test]
    fn test_small_faces_below_area_fraction() {
        // Thin strip sides of a 1 x 1 x 0.001 sheet are tiny
        let mesh = single_box([1.0, 1.0, 0.001]);
        let faces: Vec<u32> = (0..12).collect();
        assert_eq!(count_panels(&mesh, &faces, &criteria()), 2);
    }

    #[test]
    fn test_triangle_is_not_rectangular() {
        let mesh = Mesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![[0, 1, 2]],
            face_groups: vec![None],
            groups: vec![],
        };
        let regions = planar_regions(&mesh, &[0], 10.0);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].rectangularity < 0.85);
    }
}
