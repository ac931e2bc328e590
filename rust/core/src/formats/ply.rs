// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stanford PLY, ASCII and binary, read through ply-rs. PLY is Z-up.

use std::io::Cursor;

use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use smallvec::SmallVec;

use crate::builder::MeshBuilder;
use crate::error::{Error, Result};
use crate::format::MeshFormat;
use crate::frame::UpAxis;
use crate::loader::{LoadOptions, LoadedMesh, MeshParser};

pub struct PlyParser;

fn scalar(element: &DefaultElement, key: &str) -> Option<f64> {
    let value = match element.get(key)? {
        Property::Float(v) => *v as f64,
        Property::Double(v) => *v,
        Property::Char(v) => *v as f64,
        Property::UChar(v) => *v as f64,
        Property::Short(v) => *v as f64,
        Property::UShort(v) => *v as f64,
        Property::Int(v) => *v as f64,
        Property::UInt(v) => *v as f64,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn index_list(element: &DefaultElement) -> Option<SmallVec<[i64; 8]>> {
    for key in ["vertex_indices", "vertex_index"] {
        let Some(prop) = element.get(key) else {
            continue;
        };
        let list: SmallVec<[i64; 8]> = match prop {
            Property::ListInt(v) => v.iter().map(|&i| i as i64).collect(),
            Property::ListUInt(v) => v.iter().map(|&i| i as i64).collect(),
            Property::ListShort(v) => v.iter().map(|&i| i as i64).collect(),
            Property::ListUShort(v) => v.iter().map(|&i| i as i64).collect(),
            Property::ListChar(v) => v.iter().map(|&i| i as i64).collect(),
            Property::ListUChar(v) => v.iter().map(|&i| i as i64).collect(),
            _ => return None,
        };
        return Some(list);
    }
    None
}

impl MeshParser for PlyParser {
    fn parse(&self, bytes: &[u8], options: &LoadOptions) -> Result<LoadedMesh> {
        let mut reader = Cursor::new(bytes);
        let parser = Parser::<DefaultElement>::new();

        let header = parser
            .read_header(&mut reader)
            .map_err(|e| Error::malformed(MeshFormat::Ply, "header", e.to_string()))?;
        let payload = parser
            .read_payload(&mut reader, &header)
            .map_err(|e| Error::malformed(MeshFormat::Ply, "payload", e.to_string()))?;

        let mut builder = MeshBuilder::new(MeshFormat::Ply, options.frame(UpAxis::Z));

        if let Some(vertices) = payload.get("vertex") {
            for (i, element) in vertices.iter().enumerate() {
                let coords = (
                    scalar(element, "x"),
                    scalar(element, "y"),
                    scalar(element, "z"),
                );
                let (Some(x), Some(y), Some(z)) = coords else {
                    return Err(Error::malformed(
                        MeshFormat::Ply,
                        format!("vertex {}", i),
                        "missing or non-finite x/y/z",
                    ));
                };
                builder.add_vertex(Point3::new(x, y, z));
            }
        }

        if let Some(faces) = payload.get("face") {
            for (i, element) in faces.iter().enumerate() {
                let indices = index_list(element).ok_or_else(|| {
                    Error::malformed(
                        MeshFormat::Ply,
                        format!("face {}", i),
                        "no integer vertex_indices list",
                    )
                })?;
                builder.add_face(&indices);
            }
        }

        builder.finish()
    }

    fn format(&self) -> MeshFormat {
        MeshFormat::Ply
    }
}
