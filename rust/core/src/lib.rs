// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Joinery-Lite Core
//!
//! Mesh ingestion for furniture scenes exported from design tools.
//!
//! ## Overview
//!
//! - **Formats**: OBJ, COLLADA (.dae), STL (binary and ASCII) and PLY
//! - **Canonical frame**: every loader returns right-handed, Z-up
//!   coordinates scaled by an explicit caller factor
//! - **Repairs as warnings**: out-of-range and degenerate faces are dropped
//!   and reported, never fatal
//! - **Groups**: OBJ `g`/`o`, named STL solids and COLLADA nodes become
//!   per-face group names
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use joinery_core::{LoadOptions, MeshFormat, MeshLoader};
//!
//! let loader = MeshLoader::new();
//! let loaded = loader.load(bytes, MeshFormat::Obj, &LoadOptions::default())?;
//! println!(
//!     "{} triangles in {} groups, {} warnings",
//!     loaded.mesh.face_count(),
//!     loaded.mesh.groups.len(),
//!     loaded.warnings.len()
//! );
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: serialization for format tags, warnings, categories and
//!   load options

pub mod builder;
pub mod category;
pub mod error;
pub mod format;
pub mod formats;
pub mod frame;
pub mod loader;
pub mod mesh;
pub mod parser;
pub mod triangulation;
pub mod warning;
pub mod weld;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector3};

pub use builder::MeshBuilder;
pub use category::{name_hint, Category, NameHint};
pub use error::{Error, Result};
pub use format::MeshFormat;
pub use frame::{Frame, UpAxis};
pub use loader::{LoadOptions, LoadedMesh, MeshLoader, MeshParser};
pub use mesh::Mesh;
pub use warning::{DropReason, GeometryWarning};
