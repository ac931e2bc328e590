// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STL, binary and ASCII
//!
//! STL stores every facet with its own copy of each corner, so vertices are
//! welded on insert or no two facets would ever share an edge. Each named
//! ASCII `solid` becomes a group. STL is Z-up.

use nalgebra::Point3;
use nom::{
    bytes::complete::tag_no_case,
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::{opt, verify},
    multi::{many0, many1},
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::builder::MeshBuilder;
use crate::error::{Error, Result};
use crate::format::{is_binary_stl, MeshFormat};
use crate::frame::UpAxis;
use crate::loader::{LoadOptions, LoadedMesh, MeshParser};
use crate::parser::float;

pub struct StlParser;

const HEADER_LEN: usize = 84;
const RECORD_LEN: usize = 50;

impl MeshParser for StlParser {
    fn parse(&self, bytes: &[u8], options: &LoadOptions) -> Result<LoadedMesh> {
        let mut builder = MeshBuilder::new(MeshFormat::Stl, options.frame(UpAxis::Z))
            .with_welding(options.weld_tolerance);

        if is_binary_stl(bytes) {
            parse_binary(bytes, &mut builder)?;
        } else if looks_ascii(bytes) {
            let text = String::from_utf8_lossy(bytes);
            parse_ascii(&text, &mut builder)?;
        } else if bytes.len() >= HEADER_LEN {
            let declared = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]);
            return Err(Error::malformed(
                MeshFormat::Stl,
                "byte 80",
                format!(
                    "binary header declares {} triangles but the file holds {} bytes",
                    declared,
                    bytes.len()
                ),
            ));
        } else {
            return Err(Error::malformed(
                MeshFormat::Stl,
                "header",
                "too short for binary STL and not ASCII STL",
            ));
        }

        builder.finish()
    }

    fn format(&self) -> MeshFormat {
        MeshFormat::Stl
    }
}

fn looks_ascii(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..]
        .get(..5)
        .is_some_and(|head| head.eq_ignore_ascii_case(b"solid"))
}

#[inline]
fn read_f32(bytes: &[u8], offset: usize) -> f64 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]) as f64
}

/// Caller guarantees the exact binary size layout
fn parse_binary(bytes: &[u8], builder: &mut MeshBuilder) -> Result<()> {
    let count = (bytes.len() - HEADER_LEN) / RECORD_LEN;

    for record in 0..count {
        // Skip the 12-byte facet normal
        let base = HEADER_LEN + record * RECORD_LEN + 12;
        let mut corners = [0i64; 3];
        for (corner, slot) in corners.iter_mut().enumerate() {
            let offset = base + corner * 12;
            let p = Point3::new(
                read_f32(bytes, offset),
                read_f32(bytes, offset + 4),
                read_f32(bytes, offset + 8),
            );
            if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
                return Err(Error::malformed(
                    MeshFormat::Stl,
                    format!("byte {}", offset),
                    "non-finite vertex coordinate",
                ));
            }
            *slot = builder.add_vertex(p) as i64;
        }
        builder.add_face(&corners);
    }

    Ok(())
}

fn finite(input: &str) -> IResult<&str, f64> {
    verify(float, |v: &f64| v.is_finite())(input)
}

fn point(input: &str) -> IResult<&str, Point3<f64>> {
    let (input, x) = preceded(multispace1, finite)(input)?;
    let (input, y) = preceded(multispace1, finite)(input)?;
    let (input, z) = preceded(multispace1, finite)(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    preceded(multispace0, tag_no_case(kw))
}

/// `facet [normal x y z] outer loop (vertex x y z)+ endloop endfacet`
fn facet(input: &str) -> IResult<&str, Vec<Point3<f64>>> {
    let (input, _) = keyword("facet")(input)?;
    let (input, _) = opt(preceded(
        preceded(multispace1, tag_no_case("normal")),
        point,
    ))(input)?;
    let (input, _) = keyword("outer")(input)?;
    let (input, _) = preceded(multispace1, tag_no_case("loop"))(input)?;
    let (input, corners) = many1(preceded(keyword("vertex"), point))(input)?;
    let (input, _) = keyword("endloop")(input)?;
    let (input, _) = keyword("endfacet")(input)?;
    Ok((input, corners))
}

fn solid_header(input: &str) -> IResult<&str, &str> {
    preceded(keyword("solid"), not_line_ending)(input)
}

fn solid_footer(input: &str) -> IResult<&str, &str> {
    preceded(keyword("endsolid"), not_line_ending)(input)
}

fn line_of(text: &str, rest: &str) -> String {
    let offset = text.len() - rest.trim_start().len();
    let line = text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1;
    format!("line {}", line)
}

fn parse_ascii(text: &str, builder: &mut MeshBuilder) -> Result<()> {
    let mut rest = text;

    loop {
        if rest.trim_start().is_empty() {
            return Ok(());
        }

        let (after_header, name) = solid_header(rest).map_err(|_| {
            Error::malformed(MeshFormat::Stl, line_of(text, rest), "expected 'solid'")
        })?;
        let name = name.trim();
        builder.set_group((!name.is_empty()).then_some(name));

        let (after_facets, facets) = many0(facet)(after_header).map_err(|_| {
            Error::malformed(MeshFormat::Stl, line_of(text, after_header), "invalid facet")
        })?;
        for corners in facets {
            let indices: SmallVec<[i64; 4]> = corners
                .into_iter()
                .map(|p| builder.add_vertex(p) as i64)
                .collect();
            builder.add_face(&indices);
        }

        let (after_footer, _) = solid_footer(after_facets).map_err(|_| {
            Error::malformed(
                MeshFormat::Stl,
                line_of(text, after_facets),
                "expected 'facet' or 'endsolid'",
            )
        })?;
        rest = after_footer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warning::GeometryWarning;

    const TWO_SOLIDS: &str = "solid door_left
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 1 1 0
    endloop
  endfacet
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 1 0
      vertex 0 1 0
    endloop
  endfacet
endsolid door_left
solid shelf
  facet normal 0 0 1
    outer loop
      vertex 0 0 2
      vertex 1 0 2
      vertex 1 1 2
    endloop
  endfacet
endsolid
";

    fn binary(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let mut bytes = vec![0u8; 80];
        bytes.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for tri in triangles {
            bytes.extend_from_slice(&[0u8; 12]);
            for corner in tri {
                for c in corner {
                    bytes.extend_from_slice(&c.to_le_bytes());
                }
            }
            bytes.extend_from_slice(&[0u8; 2]);
        }
        bytes
    }

    #[test]
    fn test_ascii_solids_become_groups_and_weld() {
        let loaded = StlParser
            .parse(TWO_SOLIDS.as_bytes(), &LoadOptions::default())
            .unwrap();
        let mesh = loaded.mesh;
        assert_eq!(mesh.face_count(), 3);
        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.groups, vec!["door_left", "shelf"]);
        assert_eq!(mesh.face_groups, vec![Some(0), Some(0), Some(1)]);
        assert!(loaded
            .warnings
            .contains(&GeometryWarning::VerticesWelded { merged: 2 }));
    }

    #[test]
    fn test_binary() {
        let bytes = binary(&[
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
            [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        ]);
        let loaded = StlParser.parse(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.mesh.face_count(), 2);
        assert_eq!(loaded.mesh.vertex_count(), 4);
        assert!(!loaded.mesh.has_groups());
    }

    #[test]
    fn test_binary_header_starting_with_solid() {
        let mut bytes = binary(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        bytes[..5].copy_from_slice(b"solid");
        let loaded = StlParser.parse(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.mesh.face_count(), 1);
    }

    #[test]
    fn test_zero_facets_is_malformed() {
        let err = StlParser
            .parse(b"solid empty\nendsolid empty\n", &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedGeometry { .. }));

        let err = StlParser.parse(&binary(&[]), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedGeometry { .. }));
    }

    #[test]
    fn test_broken_facet_reports_line() {
        let text = "solid x\n facet normal 0 0 1\n  outer loop\n   vertex 0 0 oops\n";
        let err = StlParser
            .parse(text.as_bytes(), &LoadOptions::default())
            .unwrap_err();
        match err {
            Error::MalformedGeometry { region, .. } => assert_eq!(region, "line 2"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_truncated_binary() {
        let mut bytes = binary(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        bytes.truncate(100);
        let err = StlParser.parse(&bytes, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedGeometry { region, .. } if region == "byte 80"));
    }
}
