// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Segmentation and feature extraction over meshes loaded from text fixtures.

use std::fmt::Write;
use std::sync::Arc;

use approx::assert_relative_eq;
use joinery_core::{Category, GeometryWarning, LoadOptions, MeshFormat, MeshLoader};
use joinery_geometry::{Component, FeatureConfig, FeatureExtractor, Segmenter};

/// Corner `i` of a box: bit 0 = x, bit 1 = y, bit 2 = z
fn corner(min: [f64; 3], size: [f64; 3], i: usize) -> [f64; 3] {
    [
        min[0] + if i & 1 != 0 { size[0] } else { 0.0 },
        min[1] + if i & 2 != 0 { size[1] } else { 0.0 },
        min[2] + if i & 4 != 0 { size[2] } else { 0.0 },
    ]
}

/// Outward quads in corner indices
const QUADS: [[usize; 4]; 6] = [
    [0, 2, 3, 1],
    [4, 5, 7, 6],
    [0, 1, 5, 4],
    [2, 6, 7, 3],
    [0, 4, 6, 2],
    [1, 3, 7, 5],
];

/// Append a box to an OBJ document, optionally under a group
fn obj_box(obj: &mut String, group: Option<&str>, min: [f64; 3], size: [f64; 3]) {
    let base = obj.lines().filter(|l| l.starts_with("v ")).count();
    if let Some(group) = group {
        writeln!(obj, "g {}", group).unwrap();
    }
    for i in 0..8 {
        let [x, y, z] = corner(min, size, i);
        writeln!(obj, "v {} {} {}", x, y, z).unwrap();
    }
    for [a, b, c, d] in QUADS {
        writeln!(obj, "f {} {} {} {}", base + a + 1, base + b + 1, base + c + 1, base + d + 1)
            .unwrap();
    }
}

/// Append a box as an ASCII STL solid
fn stl_box(stl: &mut String, name: &str, min: [f64; 3], size: [f64; 3]) {
    writeln!(stl, "solid {}", name).unwrap();
    for [a, b, c, d] in QUADS {
        for tri in [[a, b, c], [a, c, d]] {
            stl.push_str("facet normal 0 0 0\nouter loop\n");
            for i in tri {
                let [x, y, z] = corner(min, size, i);
                writeln!(stl, "vertex {} {} {}", x, y, z).unwrap();
            }
            stl.push_str("endloop\nendfacet\n");
        }
    }
    writeln!(stl, "endsolid {}", name).unwrap();
}

fn load(text: &str, format: MeshFormat) -> Arc<joinery_core::Mesh> {
    let loaded = MeshLoader::new()
        .load(text.as_bytes(), format, &LoadOptions::default())
        .unwrap();
    Arc::new(loaded.mesh)
}

fn labels(components: &[Component]) -> Vec<String> {
    components.iter().map(Component::label).collect()
}

#[test]
fn test_segmentation_is_idempotent() {
    let mut obj = String::new();
    obj_box(&mut obj, Some("cabinet_base"), [0.0, 0.0, 0.0], [0.8, 0.85, 0.55]);
    obj_box(&mut obj, Some("door_left"), [0.0, 0.0, 0.55], [0.4, 0.7, 0.02]);
    obj_box(&mut obj, None, [2.0, 0.0, 0.0], [0.3, 0.3, 0.3]);
    let mesh = load(&obj, MeshFormat::Obj);

    let segmenter = Segmenter::default();
    let first = segmenter.segment(&mesh);
    let second = segmenter.segment(&mesh);

    assert_eq!(first.components.len(), 3);
    assert_eq!(labels(&first.components), labels(&second.components));
    for (a, b) in first.components.iter().zip(&second.components) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.faces(), b.faces());
    }
    assert_eq!(first.warnings, second.warnings);
}

#[test]
fn test_named_group_with_two_parts() {
    let mut obj = String::new();
    obj_box(&mut obj, Some("shelves"), [0.0, 0.0, 0.3], [0.8, 0.018, 0.3]);
    obj_box(&mut obj, None, [0.0, 0.0, 0.9], [0.8, 0.018, 0.3]);
    // The second box inherits the open group
    let mesh = load(&obj, MeshFormat::Obj);

    let seg = Segmenter::default().segment(&mesh);
    assert_eq!(labels(&seg.components), ["shelves#1", "shelves#2"]);
    assert!(seg
        .warnings
        .iter()
        .any(|w| matches!(w, GeometryWarning::GroupSplit { parts: 2, .. })));
}

#[test]
fn test_shared_vertex_without_shared_edge_stays_apart() {
    // Boxes touch only at the corner (1, 1, 1); welding makes it one vertex
    let mut stl = String::new();
    stl_box(&mut stl, "", [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
    stl_box(&mut stl, "", [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]);
    let mesh = load(&stl, MeshFormat::Stl);
    assert_eq!(mesh.vertex_count(), 15);

    let seg = Segmenter::default().segment(&mesh);
    assert_eq!(seg.components.len(), 2);
    assert_relative_eq!(seg.components[0].volume, 1.0, epsilon = 1e-9);
    assert_relative_eq!(seg.components[1].volume, 1.0, epsilon = 1e-9);
}

#[test]
fn test_drawer_cube_features() {
    let mut obj = String::new();
    obj_box(&mut obj, Some("drawer_1"), [0.0, 0.0, 0.0], [0.5, 0.5, 0.5]);
    let mesh = load(&obj, MeshFormat::Obj);

    let components = Segmenter::default().segment(&mesh).components;
    assert_eq!(components.len(), 1);

    let extractor = FeatureExtractor::new(FeatureConfig::default(), &components);
    let features = extractor.extract(&components[0]);
    assert_relative_eq!(features.volume, 0.125, epsilon = 1e-9);
    assert_relative_eq!(features.surface_area, 1.5, epsilon = 1e-9);
    assert_relative_eq!(features.height, 0.5, epsilon = 1e-9);
    assert_eq!(features.panel_count, 6);
    assert_eq!(features.name_hint, Some(Category::DrawerUnit));

    // Pure: the same input gives bit-identical output
    assert_eq!(features, extractor.extract(&components[0]));
}
