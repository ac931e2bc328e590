// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene segmentation
//!
//! Splits a loaded mesh into furniture components. Named groups are honoured
//! first, then each candidate is broken into its shared-edge connected parts.
//! Tiny fragments and obvious building elements are dropped with a warning.

use std::sync::Arc;

use joinery_core::{name_hint, GeometryWarning, Mesh, NameHint};
use rustc_hash::FxHashMap;

use crate::adjacency::EdgeAdjacency;
use crate::component::Component;
use crate::measure::measure;

/// Segmentation thresholds
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SegmentConfig {
    /// Components with fewer faces are noise
    pub min_faces: usize,
    /// Components enclosing less volume are noise
    pub min_volume: f64,
    /// Drop groups named like walls, floors, appliances
    pub exclude_non_furniture: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_faces: 4,
            min_volume: 1e-9,
            exclude_non_furniture: true,
        }
    }
}

/// Components of a scene plus what was dropped on the way
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub components: Vec<Component>,
    pub warnings: Vec<GeometryWarning>,
}

/// Faces sharing one group value, in face order
struct Candidate {
    group: Option<u32>,
    faces: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmentConfig,
}

impl Segmenter {
    pub fn new(config: SegmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Segment `mesh` into components.
    ///
    /// Output order depends only on face order: candidates by their first
    /// face, parts by their lowest face. Running twice gives identical
    /// results.
    pub fn segment(&self, mesh: &Arc<Mesh>) -> Segmentation {
        let start = std::time::Instant::now();
        let mut components = Vec::new();
        let mut warnings = Vec::new();

        for candidate in candidates(mesh) {
            let name = candidate
                .group
                .and_then(|g| mesh.groups.get(g as usize))
                .cloned();

            if let Some(name) = &name {
                if self.config.exclude_non_furniture {
                    if let NameHint::NonFurniture { keyword } = name_hint(name) {
                        warnings.push(GeometryWarning::ComponentExcluded {
                            label: name.clone(),
                            keyword: keyword.to_string(),
                        });
                        continue;
                    }
                }
            }

            let parts = EdgeAdjacency::build(mesh, &candidate.faces).components();
            let split = name.is_some() && parts.len() > 1;
            if split {
                warnings.push(GeometryWarning::GroupSplit {
                    group: name.clone().unwrap_or_default(),
                    parts: parts.len(),
                });
            }

            for (index, faces) in parts.into_iter().enumerate() {
                let Some(measurements) = measure(mesh, &faces) else {
                    continue;
                };
                let part = split.then_some(index);

                if faces.len() < self.config.min_faces
                    || measurements.volume < self.config.min_volume
                {
                    warnings.push(GeometryWarning::ComponentDiscarded {
                        label: discarded_label(name.as_deref(), part, faces[0]),
                        faces: faces.len(),
                        volume: measurements.volume,
                    });
                    continue;
                }

                components.push(Component::new(
                    components.len(),
                    name.clone(),
                    part,
                    Arc::clone(mesh),
                    faces,
                    measurements,
                ));
            }
        }

        tracing::info!(
            faces = mesh.face_count(),
            components = components.len(),
            warnings = warnings.len(),
            segment_time_ms = start.elapsed().as_millis(),
            "Segmentation complete"
        );

        Segmentation {
            components,
            warnings,
        }
    }
}

/// Bucket faces by group value in order of first appearance
fn candidates(mesh: &Mesh) -> Vec<Candidate> {
    let mut index: FxHashMap<Option<u32>, usize> = FxHashMap::default();
    let mut candidates: Vec<Candidate> = Vec::new();

    for face in 0..mesh.face_count() {
        let group = mesh.group_index(face);
        let slot = *index.entry(group).or_insert_with(|| {
            candidates.push(Candidate {
                group,
                faces: Vec::new(),
            });
            candidates.len() - 1
        });
        candidates[slot].faces.push(face as u32);
    }

    candidates
}

fn discarded_label(name: Option<&str>, part: Option<usize>, first_face: u32) -> String {
    match (name, part) {
        (Some(name), Some(part)) => format!("{}#{}", name, part + 1),
        (Some(name), None) => name.to_string(),
        (None, _) => format!("faces@{}", first_face),
    }
}
