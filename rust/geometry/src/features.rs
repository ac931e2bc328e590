// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-component geometric features
//!
//! Dimensions are measured in the canonical Z-up frame. Width and depth are
//! taken in the component's own horizontal orientation, so a cabinet rotated
//! about the vertical axis reports the same numbers.

use std::fmt;

use joinery_core::{name_hint, Category, NameHint};
use nalgebra::Point3;
use rayon::prelude::*;

use crate::bounds::Aabb;
use crate::component::Component;
use crate::panels::{count_panels, PanelCriteria};

/// Feature extraction parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeatureConfig {
    /// Max angle between a face and its region seed
    pub normal_tolerance_deg: f64,
    /// Min region area over bounding rectangle area for a panel
    pub rectangularity_min: f64,
    /// Min panel area as a fraction of the component surface
    pub min_panel_area_fraction: f64,
    /// Box inflation when counting touching components
    pub proximity_margin: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            normal_tolerance_deg: 10.0,
            rectangularity_min: 0.85,
            min_panel_area_fraction: 0.02,
            proximity_margin: 0.01,
        }
    }
}

/// Feature names, for table-driven consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Feature {
    Width,
    Height,
    Depth,
    VolumeToSurface,
    PanelCount,
    AdjacencyCount,
    Volume,
    SurfaceArea,
    Flatness,
    Elongation,
    FillRatio,
}

impl Feature {
    pub const ALL: [Feature; 11] = [
        Feature::Width,
        Feature::Height,
        Feature::Depth,
        Feature::VolumeToSurface,
        Feature::PanelCount,
        Feature::AdjacencyCount,
        Feature::Volume,
        Feature::SurfaceArea,
        Feature::Flatness,
        Feature::Elongation,
        Feature::FillRatio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Width => "width",
            Feature::Height => "height",
            Feature::Depth => "depth",
            Feature::VolumeToSurface => "volume_to_surface",
            Feature::PanelCount => "panel_count",
            Feature::AdjacencyCount => "adjacency_count",
            Feature::Volume => "volume",
            Feature::SurfaceArea => "surface_area",
            Feature::Flatness => "flatness",
            Feature::Elongation => "elongation",
            Feature::FillRatio => "fill_ratio",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric description of one component
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureVector {
    /// Larger horizontal extent
    pub width: f64,
    /// Vertical extent
    pub height: f64,
    /// Smaller horizontal extent
    pub depth: f64,
    pub volume_to_surface: f64,
    pub panel_count: usize,
    /// Other components within the proximity margin
    pub adjacency_count: usize,
    pub volume: f64,
    pub surface_area: f64,
    /// Smallest over largest dimension
    pub flatness: f64,
    /// Middle over largest dimension
    pub elongation: f64,
    /// Volume over oriented bounding-box volume, in [0, 1]
    pub fill_ratio: f64,
    /// Category suggested by the group name
    pub name_hint: Option<Category>,
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Width => self.width,
            Feature::Height => self.height,
            Feature::Depth => self.depth,
            Feature::VolumeToSurface => self.volume_to_surface,
            Feature::PanelCount => self.panel_count as f64,
            Feature::AdjacencyCount => self.adjacency_count as f64,
            Feature::Volume => self.volume,
            Feature::SurfaceArea => self.surface_area,
            Feature::Flatness => self.flatness,
            Feature::Elongation => self.elongation,
            Feature::FillRatio => self.fill_ratio,
        }
    }
}

/// Extracts features with knowledge of the whole scene.
///
/// Adjacency needs every component's bounds, so the extractor is built from
/// the full component list once.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    scene: Vec<(usize, Aabb)>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig, components: &[Component]) -> Self {
        let scene = components.iter().map(|c| (c.id, c.bounds)).collect();
        Self { config, scene }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn extract(&self, component: &Component) -> FeatureVector {
        let [width, depth] = horizontal_extents(component);
        let height = component.bounds.extents().z;

        let mut dims = [width, height, depth];
        dims.sort_by(f64::total_cmp);
        let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };

        let criteria = PanelCriteria {
            normal_tolerance_deg: self.config.normal_tolerance_deg,
            rectangularity_min: self.config.rectangularity_min,
            min_area_fraction: self.config.min_panel_area_fraction,
        };

        let hint = component.group.as_deref().and_then(|name| match name_hint(name) {
            NameHint::Furniture { category, .. } => Some(category),
            _ => None,
        });

        FeatureVector {
            width,
            height,
            depth,
            volume_to_surface: ratio(component.volume, component.surface_area),
            panel_count: count_panels(component.mesh(), component.faces(), &criteria),
            adjacency_count: self.adjacency_count(component),
            volume: component.volume,
            surface_area: component.surface_area,
            flatness: ratio(dims[0], dims[2]),
            elongation: ratio(dims[1], dims[2]),
            fill_ratio: ratio(component.volume, width * height * depth).clamp(0.0, 1.0),
            name_hint: hint,
        }
    }

    /// Features for every component, in input order
    pub fn extract_all(&self, components: &[Component]) -> Vec<FeatureVector> {
        let start = std::time::Instant::now();
        let features: Vec<FeatureVector> =
            components.par_iter().map(|c| self.extract(c)).collect();
        tracing::debug!(
            components = components.len(),
            extract_time_ms = start.elapsed().as_millis(),
            "Features extracted"
        );
        features
    }

    fn adjacency_count(&self, component: &Component) -> usize {
        let inflated = component.bounds.inflate(self.config.proximity_margin);
        self.scene
            .iter()
            .filter(|(id, bounds)| *id != component.id && inflated.intersects(bounds))
            .count()
    }
}

/// Edges steeper than this (rise over length) are not horizontal
const HORIZONTAL_SLOPE: f64 = 0.1;

/// Candidate orientations tried per component
const MAX_ORIENTATIONS: usize = 8;

/// [larger, smaller] horizontal extent in the orientation that gives the
/// tightest footprint. Candidates are the directions of the longest
/// horizontal edges.
fn horizontal_extents(component: &Component) -> [f64; 2] {
    let mesh = component.mesh();

    let mut edges: Vec<(f64, f64)> = Vec::new();
    for &f in component.faces() {
        let [a, b, c] = mesh.triangle(f as usize);
        for d in [b - a, c - b, a - c] {
            let len = d.norm();
            if len > 0.0 && d.z.abs() <= HORIZONTAL_SLOPE * len {
                // Rotations by multiples of 90 degrees leave extents unchanged
                let angle = d.y.atan2(d.x).rem_euclid(std::f64::consts::FRAC_PI_2);
                edges.push((len, angle));
            }
        }
    }
    edges.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.total_cmp(&b.1)));

    let mut angles: Vec<f64> = vec![0.0];
    for (_, angle) in edges {
        if angles.len() > MAX_ORIENTATIONS {
            break;
        }
        if angles.iter().all(|a| (a - angle).abs() > 1e-6) {
            angles.push(angle);
        }
    }

    let mut best: Option<(f64, [f64; 2])> = None;
    for angle in angles {
        let extents = footprint(component, angle);
        let area = extents[0] * extents[1];
        if best.map_or(true, |(a, _)| area < a - 1e-12) {
            best = Some((area, extents));
        }
    }
    best.map(|(_, e)| e).unwrap_or([0.0, 0.0])
}

/// Horizontal extents after rotating by `-angle` about Z
fn footprint(component: &Component, angle: f64) -> [f64; 2] {
    let mesh = component.mesh();
    let (sin, cos) = (-angle).sin_cos();

    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &f in component.faces() {
        for &v in &mesh.faces[f as usize] {
            let p: Point3<f64> = mesh.vertices[v as usize];
            let x = p.x * cos - p.y * sin;
            let y = p.x * sin + p.y * cos;
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }

    let (a, b) = (x_max - x_min, y_max - y_min);
    if !(a.is_finite() && b.is_finite()) {
        return [0.0, 0.0];
    }
    [a.max(b), a.min(b)]
}
