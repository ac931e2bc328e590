// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Joinery-Lite Geometry
//!
//! Scene segmentation and per-component feature extraction over meshes
//! loaded by `joinery-core`, using nalgebra for the vector math and rayon
//! for parallel extraction.

pub mod adjacency;
pub mod bounds;
pub mod component;
pub mod features;
pub mod measure;
pub mod panels;
pub mod segment;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};

pub use adjacency::EdgeAdjacency;
pub use bounds::Aabb;
pub use component::Component;
pub use features::{Feature, FeatureConfig, FeatureExtractor, FeatureVector};
pub use measure::{measure, Measurements};
pub use panels::{count_panels, planar_regions, PanelCriteria, PlanarRegion};
pub use segment::{SegmentConfig, Segmentation, Segmenter};
