// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh Loader - dispatch from a format tag to its parser
//!
//! Each [`MeshParser`] handles one [`MeshFormat`]. The router holds them
//! behind `Arc<dyn MeshParser>` so a custom parser can replace a default one.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::format::MeshFormat;
use crate::formats::{DaeParser, ObjParser, PlyParser, StlParser};
use crate::frame::{Frame, UpAxis};
use crate::mesh::Mesh;
use crate::warning::GeometryWarning;

/// Caller-controlled load settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoadOptions {
    /// Override the file's up axis (default: the format's convention, or
    /// `<up_axis>` for COLLADA)
    pub up_axis: Option<UpAxis>,
    /// Uniform scale applied after frame conversion. Units are never inferred.
    pub unit_scale: f64,
    /// Distance under which STL vertices are welded, in output units
    pub weld_tolerance: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            up_axis: None,
            unit_scale: 1.0,
            weld_tolerance: 1e-6,
        }
    }
}

impl LoadOptions {
    /// Frame for a file whose own up axis is `native`
    pub fn frame(&self, native: UpAxis) -> Frame {
        Frame::new(self.up_axis.unwrap_or(native), self.unit_scale)
    }
}

/// A parsed mesh plus whatever was dropped or repaired on the way
#[derive(Debug, Clone)]
pub struct LoadedMesh {
    pub mesh: Mesh,
    pub format: MeshFormat,
    pub warnings: Vec<GeometryWarning>,
}

/// One parser per mesh encoding
pub trait MeshParser: Send + Sync {
    /// Parse raw file bytes into a canonical-frame mesh
    fn parse(&self, bytes: &[u8], options: &LoadOptions) -> Result<LoadedMesh>;

    /// Format handled by this parser
    fn format(&self) -> MeshFormat;
}

/// Routes file bytes to the parser registered for their format
pub struct MeshLoader {
    parsers: HashMap<MeshFormat, Arc<dyn MeshParser>>,
}

impl MeshLoader {
    /// Create a loader with the OBJ, COLLADA, STL and PLY parsers
    pub fn new() -> Self {
        let mut loader = Self::empty();
        loader.register(Box::new(ObjParser));
        loader.register(Box::new(DaeParser));
        loader.register(Box::new(StlParser));
        loader.register(Box::new(PlyParser));
        loader
    }

    /// Create a loader without any parser
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Register a parser, replacing any previous one for its format
    pub fn register(&mut self, parser: Box<dyn MeshParser>) {
        let parser: Arc<dyn MeshParser> = Arc::from(parser);
        self.parsers.insert(parser.format(), parser);
    }

    #[inline]
    pub fn supports(&self, format: MeshFormat) -> bool {
        self.parsers.contains_key(&format)
    }

    /// Load a mesh from raw bytes
    pub fn load(
        &self,
        bytes: &[u8],
        format: MeshFormat,
        options: &LoadOptions,
    ) -> Result<LoadedMesh> {
        let parser = self
            .parsers
            .get(&format)
            .ok_or_else(|| Error::unsupported(format.as_str()))?;

        let start = std::time::Instant::now();
        let loaded = parser.parse(bytes, options)?;

        tracing::info!(
            format = %format,
            bytes = bytes.len(),
            vertices = loaded.mesh.vertex_count(),
            faces = loaded.mesh.face_count(),
            groups = loaded.mesh.groups.len(),
            warnings = loaded.warnings.len(),
            load_time_ms = start.elapsed().as_millis(),
            "Mesh loaded"
        );
        if !loaded.warnings.is_empty() {
            tracing::warn!(
                format = %format,
                count = loaded.warnings.len(),
                first = %loaded.warnings[0],
                "Mesh loaded with warnings"
            );
        }

        Ok(loaded)
    }

    /// Load a mesh given a textual format tag (`"obj"`, `"collada"`, ...)
    pub fn load_tagged(
        &self,
        bytes: &[u8],
        tag: &str,
        options: &LoadOptions,
    ) -> Result<LoadedMesh> {
        let format: MeshFormat = tag.parse()?;
        self.load(bytes, format, options)
    }
}

impl Default for MeshLoader {
    fn default() -> Self {
        Self::new()
    }
}
