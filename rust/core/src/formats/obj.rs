// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ
//!
//! Only `v`, `f`, `g` and `o` carry meaning here. Texture coordinates,
//! normals, materials and smoothing groups are skipped. OBJ is Y-up.

use nalgebra::Point3;
use nom::{
    character::complete::char,
    combinator::{eof, opt},
    multi::{many1, separated_list1},
    sequence::{pair, preceded, terminated},
    IResult,
};
use smallvec::SmallVec;

use crate::builder::MeshBuilder;
use crate::error::{Error, Result};
use crate::format::MeshFormat;
use crate::frame::UpAxis;
use crate::loader::{LoadOptions, LoadedMesh, MeshParser};
use crate::parser::{float, integer, logical_lines, ws, ws1};

pub struct ObjParser;

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`; only the position index is kept
fn vertex_ref(input: &str) -> IResult<&str, i64> {
    let (rest, v) = integer(input)?;
    let (rest, _) = opt(pair(
        char('/'),
        pair(opt(integer), opt(pair(char('/'), opt(integer)))),
    ))(rest)?;
    Ok((rest, v))
}

fn face_refs(input: &str) -> IResult<&str, Vec<i64>> {
    terminated(many1(preceded(ws, vertex_ref)), pair(ws, eof))(input)
}

fn coordinates(input: &str) -> IResult<&str, Vec<f64>> {
    terminated(
        preceded(ws, separated_list1(ws1, float)),
        pair(ws, eof),
    )(input)
}

/// Resolve a 1-based or negative (relative) OBJ index to 0-based.
/// Zero is invalid and maps to -1 so the builder reports it.
#[inline]
fn resolve_index(raw: i64, vertex_count: usize) -> i64 {
    match raw {
        r if r > 0 => r - 1,
        r if r < 0 => vertex_count as i64 + r,
        _ => -1,
    }
}

impl MeshParser for ObjParser {
    fn parse(&self, bytes: &[u8], options: &LoadOptions) -> Result<LoadedMesh> {
        let text = String::from_utf8_lossy(bytes);
        let mut builder = MeshBuilder::new(MeshFormat::Obj, options.frame(UpAxis::Y));

        for (line_no, line) in logical_lines(&text) {
            let content = match line.find('#') {
                Some(pos) => &line[..pos],
                None => &line[..],
            };
            let content = content.trim();
            if content.is_empty() {
                continue;
            }

            let (keyword, rest) = content
                .split_once(|c: char| c == ' ' || c == '\t')
                .unwrap_or((content, ""));

            match keyword {
                "v" => {
                    let (_, coords) = coordinates(rest).map_err(|_| {
                        Error::malformed(
                            MeshFormat::Obj,
                            format!("line {}", line_no),
                            "vertex record is not a list of numbers",
                        )
                    })?;
                    if coords.len() < 3 || coords[..3].iter().any(|c| !c.is_finite()) {
                        return Err(Error::malformed(
                            MeshFormat::Obj,
                            format!("line {}", line_no),
                            "vertex record needs three finite coordinates",
                        ));
                    }
                    builder.add_vertex(Point3::new(coords[0], coords[1], coords[2]));
                }
                "f" | "fo" => {
                    let (_, refs) = face_refs(rest).map_err(|_| {
                        Error::malformed(
                            MeshFormat::Obj,
                            format!("line {}", line_no),
                            "face record is not a list of vertex references",
                        )
                    })?;
                    let count = builder.vertex_count();
                    let indices: SmallVec<[i64; 8]> =
                        refs.iter().map(|&r| resolve_index(r, count)).collect();
                    builder.add_face(&indices);
                }
                "g" | "o" => {
                    let name = rest.trim();
                    builder.set_group((!name.is_empty()).then_some(name));
                }
                _ => {}
            }
        }

        builder.finish()
    }

    fn format(&self) -> MeshFormat {
        MeshFormat::Obj
    }
}
