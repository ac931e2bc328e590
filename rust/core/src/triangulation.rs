// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation for faces with more than three corners
//!
//! Polygons are projected onto their best-fit plane (Newell normal) and
//! triangulated there with earcutr. Convex polygons take a fan.

use nalgebra::{Point2, Point3, Vector3};

/// Check if a polygon is convex (all cross products have same sign)
#[inline]
fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() > 1e-12 {
            let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false;
            }
        }
    }

    true
}

#[inline]
fn fan_triangulate(n: usize) -> Vec<[usize; 3]> {
    (1..n - 1).map(|i| [0, i, i + 1]).collect()
}

/// Newell normal of a polygon, `None` when it encloses no area
pub fn polygon_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let mut normal = Vector3::<f64>::zeros();
    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal.try_normalize(1e-12)
}

/// Project 3D points onto the plane through the first point with `normal`.
///
/// The (u, v) basis is right-handed with respect to `normal`, so a polygon
/// wound counter-clockwise about its normal stays counter-clockwise in 2D.
pub fn project_to_2d(points_3d: &[Point3<f64>], normal: &Vector3<f64>) -> Vec<Point2<f64>> {
    let Some(origin) = points_3d.first() else {
        return Vec::new();
    };

    // Axis least parallel to the normal for a stable cross product
    let abs_x = normal.x.abs();
    let abs_y = normal.y.abs();
    let abs_z = normal.z.abs();
    let reference = if abs_x <= abs_y && abs_x <= abs_z {
        Vector3::x()
    } else if abs_y <= abs_z {
        Vector3::y()
    } else {
        Vector3::z()
    };

    let u_axis = reference.cross(normal).normalize();
    let v_axis = normal.cross(&u_axis);

    points_3d
        .iter()
        .map(|p| {
            let v = p - origin;
            Point2::new(v.dot(&u_axis), v.dot(&v_axis))
        })
        .collect()
}

/// Triangulate a simple 3D polygon.
///
/// Returns corner triples indexing into `points`, wound like the input
/// polygon. `None` when the polygon is degenerate or earcut fails.
pub fn triangulate_polygon(points: &[Point3<f64>]) -> Option<Vec<[usize; 3]>> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    if n == 3 {
        return Some(vec![[0, 1, 2]]);
    }

    let normal = polygon_normal(points)?;
    let projected = project_to_2d(points, &normal);

    if is_convex(&projected) {
        return Some(fan_triangulate(n));
    }

    let mut flat = Vec::with_capacity(n * 2);
    for p in &projected {
        flat.push(p.x);
        flat.push(p.y);
    }

    let indices = earcutr::earcut(&flat, &[], 2).ok()?;
    if indices.is_empty() {
        return None;
    }

    // earcut output winding is not tied to the input, restore it
    let triangles = indices
        .chunks_exact(3)
        .map(|t| {
            let (a, b, c) = (projected[t[0]], projected[t[1]], projected[t[2]]);
            let signed = (b - a).perp(&(c - a));
            if signed < 0.0 {
                [t[0], t[2], t[1]]
            } else {
                [t[0], t[1], t[2]]
            }
        })
        .collect();
    Some(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_fans() {
        let quad = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let tris = triangulate_polygon(&quad).unwrap();
        assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_concave_polygon_keeps_winding() {
        // L-shape in the XZ plane, wound counter-clockwise about -Y
        let l_shape = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 2.0),
            Point3::new(0.0, 0.0, 2.0),
        ];
        let normal = polygon_normal(&l_shape).unwrap();
        let tris = triangulate_polygon(&l_shape).unwrap();
        assert_eq!(tris.len(), 4);

        let mut area = 0.0;
        for [a, b, c] in tris {
            let cross = (l_shape[b] - l_shape[a]).cross(&(l_shape[c] - l_shape[a]));
            assert!(cross.dot(&normal) > 0.0);
            area += cross.norm() * 0.5;
        }
        assert!((area - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_polygon_rejected() {
        let line = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ];
        assert!(triangulate_polygon(&line).is_none());
    }
}
