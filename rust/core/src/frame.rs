// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinate frame normalization
//!
//! Every loader hands out positions in one canonical frame: right-handed,
//! Z up, in the scene's own length unit times an explicit caller scale.
//! Height-dependent features downstream rely on this.

use nalgebra::Point3;

/// Axis a source file treats as "up"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UpAxis {
    X,
    Y,
    Z,
}

impl UpAxis {
    /// Parse a COLLADA `<up_axis>` value (`X_UP`, `Y_UP`, `Z_UP`)
    pub fn from_collada(value: &str) -> Option<Self> {
        match value.trim() {
            "X_UP" => Some(UpAxis::X),
            "Y_UP" => Some(UpAxis::Y),
            "Z_UP" => Some(UpAxis::Z),
            _ => None,
        }
    }
}

/// Rotation to Z-up plus uniform scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub up: UpAxis,
    pub scale: f64,
}

impl Frame {
    pub fn new(up: UpAxis, scale: f64) -> Self {
        Self { up, scale }
    }

    /// Map a source-frame point into the canonical frame.
    ///
    /// Both non-trivial cases are proper rotations (determinant +1), so
    /// handedness and face winding survive the conversion.
    #[inline]
    pub fn apply(&self, p: Point3<f64>) -> Point3<f64> {
        let rotated = match self.up {
            UpAxis::Z => p,
            // +90 degrees about X
            UpAxis::Y => Point3::new(p.x, -p.z, p.y),
            // -90 degrees about Y
            UpAxis::X => Point3::new(-p.z, p.y, p.x),
        };
        if self.scale == 1.0 {
            rotated
        } else {
            Point3::from(rotated.coords * self.scale)
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(UpAxis::Z, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_y_up_maps_to_z_up() {
        let frame = Frame::new(UpAxis::Y, 1.0);
        let up = frame.apply(Point3::new(0.0, 1.0, 0.0));
        assert_eq!(up, Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_x_up_maps_to_z_up() {
        let frame = Frame::new(UpAxis::X, 1.0);
        let up = frame.apply(Point3::new(1.0, 0.0, 0.0));
        assert_eq!(up, Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_rotation_preserves_handedness() {
        for up in [UpAxis::X, UpAxis::Y, UpAxis::Z] {
            let frame = Frame::new(up, 1.0);
            let ex = frame.apply(Point3::new(1.0, 0.0, 0.0)).coords;
            let ey = frame.apply(Point3::new(0.0, 1.0, 0.0)).coords;
            let ez = frame.apply(Point3::new(0.0, 0.0, 1.0)).coords;
            let det = ex.cross(&ey).dot(&ez);
            assert!((det - 1.0).abs() < 1e-12, "{:?} flips handedness", up);
        }
    }

    #[test]
    fn test_scale_applied_after_rotation() {
        let frame = Frame::new(UpAxis::Z, 0.001);
        let p = frame.apply(Point3::new(500.0, 250.0, 1000.0));
        assert!((p.coords - Vector3::new(0.5, 0.25, 1.0)).norm() < 1e-12);
    }
}
