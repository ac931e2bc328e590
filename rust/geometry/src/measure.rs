// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Area, volume and centroid of a face subset

use joinery_core::Mesh;
use nalgebra::{Point3, Vector3};

use crate::bounds::Aabb;

/// Aggregate measurements of a set of mesh faces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    pub bounds: Aabb,
    pub surface_area: f64,
    /// Absolute enclosed volume
    pub volume: f64,
    /// Area-weighted centroid
    pub centroid: Point3<f64>,
}

/// Measure the faces `faces` of `mesh`.
///
/// Volume is the signed-tetrahedron sum taken about the centroid, so it is
/// exact for closed surfaces regardless of where they sit. Open surfaces
/// still yield a (less meaningful) number rather than an error.
pub fn measure(mesh: &Mesh, faces: &[u32]) -> Option<Measurements> {
    let bounds = Aabb::from_points(
        faces
            .iter()
            .flat_map(|&f| mesh.faces[f as usize].iter())
            .map(|&v| &mesh.vertices[v as usize]),
    )?;

    let mut surface_area = 0.0;
    let mut weighted = Vector3::zeros();
    for &f in faces {
        let [a, b, c] = mesh.triangle(f as usize);
        let area = (b - a).cross(&(c - a)).norm() * 0.5;
        surface_area += area;
        weighted += (a.coords + b.coords + c.coords) * (area / 3.0);
    }

    let centroid = if surface_area > 0.0 {
        Point3::from(weighted / surface_area)
    } else {
        bounds.center()
    };

    let mut six_volume = 0.0;
    for &f in faces {
        let [a, b, c] = mesh.triangle(f as usize);
        six_volume += (a - centroid).dot(&(b - centroid).cross(&(c - centroid)));
    }

    Some(Measurements {
        bounds,
        surface_area,
        volume: (six_volume / 6.0).abs(),
        centroid,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use joinery_core::Mesh;
    use nalgebra::Point3;

    /// Closed axis-aligned box, 12 outward-facing triangles, appended to `mesh`
    pub fn add_box(mesh: &mut Mesh, min: [f64; 3], size: [f64; 3], group: Option<u32>) {
        let base = mesh.vertices.len() as u32;
        for i in 0..8u32 {
            mesh.vertices.push(Point3::new(
                min[0] + if i & 1 != 0 { size[0] } else { 0.0 },
                min[1] + if i & 2 != 0 { size[1] } else { 0.0 },
                min[2] + if i & 4 != 0 { size[2] } else { 0.0 },
            ));
        }
        let quads = [
            [0, 2, 3, 1], // bottom (-z)
            [4, 5, 7, 6], // top (+z)
            [0, 1, 5, 4], // front (-y)
            [2, 6, 7, 3], // back (+y)
            [0, 4, 6, 2], // left (-x)
            [1, 3, 7, 5], // right (+x)
        ];
        for [a, b, c, d] in quads {
            mesh.faces.push([base + a, base + b, base + c]);
            mesh.faces.push([base + a, base + c, base + d]);
            mesh.face_groups.push(group);
            mesh.face_groups.push(group);
        }
    }

    pub fn single_box(size: [f64; 3]) -> Mesh {
        let mut mesh = Mesh::new();
        add_box(&mut mesh, [0.0, 0.0, 0.0], size, None);
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_measurements() {
        let mesh = single_box([0.5, 0.5, 0.5]);
        let faces: Vec<u32> = (0..12).collect();
        let m = measure(&mesh, &faces).unwrap();
        assert_relative_eq!(m.surface_area, 1.5, epsilon = 1e-12);
        assert_relative_eq!(m.volume, 0.125, epsilon = 1e-12);
        assert_relative_eq!(m.centroid, Point3::new(0.25, 0.25, 0.25), epsilon = 1e-12);
    }

    #[test]
    fn test_volume_is_translation_invariant() {
        let mut far = Mesh::new();
        add_box(&mut far, [1000.0, -500.0, 20.0], [2.0, 1.0, 0.5], None);
        let faces: Vec<u32> = (0..12).collect();
        let m = measure(&far, &faces).unwrap();
        assert_relative_eq!(m.volume, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_subset() {
        let mesh = single_box([1.0, 1.0, 1.0]);
        assert!(measure(&mesh, &[]).is_none());
    }
}
