// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Non-fatal geometry diagnostics
//!
//! Warnings are collected and returned next to a successful result instead of
//! being raised. Design exports are routinely imperfect, so none of these
//! abort a pipeline run.

use std::fmt;

use crate::category::Category;

/// Why a face did not make it into the mesh
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum DropReason {
    /// A vertex reference points outside the vertex list
    IndexOutOfRange { index: i64, vertex_count: usize },
    /// Repeated vertices or zero area
    Degenerate,
}

/// A recorded, non-fatal issue
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum GeometryWarning {
    /// Source face (1-based record ordinal within its file) was dropped
    FaceDropped { face: usize, reason: DropReason },
    /// Edges shared by more than two faces
    NonManifoldEdges { count: usize },
    /// Coincident vertices merged while welding
    VerticesWelded { merged: usize },
    /// A named group held disjoint geometry and was split
    GroupSplit { group: String, parts: usize },
    /// Component below the minimum size, treated as ingestion noise
    ComponentDiscarded {
        label: String,
        faces: usize,
        volume: f64,
    },
    /// Component named after a non-furniture element (wall, floor, ...)
    ComponentExcluded { label: String, keyword: String },
    /// Classification fell below the acceptance threshold
    LowConfidence {
        component: usize,
        category: Category,
        confidence: f64,
    },
}

impl fmt::Display for GeometryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryWarning::FaceDropped { face, reason } => match reason {
                DropReason::IndexOutOfRange {
                    index,
                    vertex_count,
                } => write!(
                    f,
                    "face {} dropped: vertex index {} outside 0..{}",
                    face, index, vertex_count
                ),
                DropReason::Degenerate => write!(f, "face {} dropped: degenerate", face),
            },
            GeometryWarning::NonManifoldEdges { count } => {
                write!(f, "{} non-manifold edges", count)
            }
            GeometryWarning::VerticesWelded { merged } => {
                write!(f, "{} coincident vertices welded", merged)
            }
            GeometryWarning::GroupSplit { group, parts } => {
                write!(f, "group '{}' split into {} disconnected parts", group, parts)
            }
            GeometryWarning::ComponentDiscarded {
                label,
                faces,
                volume,
            } => write!(
                f,
                "component '{}' discarded as noise ({} faces, volume {:.3e})",
                label, faces, volume
            ),
            GeometryWarning::ComponentExcluded { label, keyword } => {
                write!(f, "component '{}' excluded: looks like '{}'", label, keyword)
            }
            GeometryWarning::LowConfidence {
                component,
                category,
                confidence,
            } => write!(
                f,
                "component {} classified {} with low confidence {:.2}",
                component, category, confidence
            ),
        }
    }
}
