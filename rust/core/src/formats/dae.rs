// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! COLLADA (.dae)
//!
//! The document is streamed once with quick-xml into a compact description
//! of geometries and visual-scene nodes, then instantiated. Every
//! `<instance_geometry>` adds its own transformed copy of the geometry; a
//! geometry no node references is emitted once, untransformed.
//!
//! Supported primitives: `<triangles>`, `<polylist>` and `<polygons>`.
//! Lines, strips and fans are skipped. `<unit>` is read but never applied:
//! callers pass `unit_scale` explicitly.

use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector3};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::builder::MeshBuilder;
use crate::error::{Error, Result};
use crate::format::MeshFormat;
use crate::frame::UpAxis;
use crate::loader::{LoadOptions, LoadedMesh, MeshParser};
use crate::parser::{float_list, integer_list};
use crate::warning::DropReason;

pub struct DaeParser;

#[derive(Debug, Default)]
struct Source {
    floats: Vec<f64>,
    stride: usize,
}

#[derive(Debug)]
struct Input {
    semantic: String,
    source: String,
    offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrimitiveKind {
    Triangles,
    Polylist,
    Polygons,
}

impl PrimitiveKind {
    fn tag(&self) -> &'static str {
        match self {
            PrimitiveKind::Triangles => "triangles",
            PrimitiveKind::Polylist => "polylist",
            PrimitiveKind::Polygons => "polygons",
        }
    }
}

#[derive(Debug)]
struct Primitive {
    kind: PrimitiveKind,
    inputs: Vec<Input>,
    vcount: Vec<i64>,
    /// One entry per `<p>` element
    lists: Vec<Vec<i64>>,
}

#[derive(Debug, Default)]
struct Geometry {
    id: String,
    name: Option<String>,
    sources: FxHashMap<String, Source>,
    /// `<vertices id>` to its POSITION source id
    vertices: FxHashMap<String, String>,
    primitives: Vec<Primitive>,
}

impl Geometry {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    fn region(&self, element: &str) -> String {
        format!("<{}> in <geometry id=\"{}\">", element, self.id)
    }
}

#[derive(Debug)]
struct SceneNode {
    name: Option<String>,
    transform: Matrix4<f64>,
    instances: Vec<String>,
    children: Vec<usize>,
}

/// Everything the instantiation step needs from the document
#[derive(Debug, Default)]
struct Document {
    up_axis: Option<UpAxis>,
    geometries: Vec<Geometry>,
    nodes: Vec<SceneNode>,
    roots: Vec<usize>,
}

/// Streaming state while reading the XML
#[derive(Default)]
struct DocumentReader {
    doc: Document,
    path: Vec<Vec<u8>>,
    text: String,
    geometry: Option<Geometry>,
    source: Option<(String, Source)>,
    float_array_id: String,
    vertices_id: Option<String>,
    primitive: Option<Primitive>,
    node_stack: Vec<usize>,
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| std::str::from_utf8(&a.value).ok().map(str::to_string))
}

fn url_target(url: &str) -> String {
    url.trim_start_matches('#').to_string()
}

fn malformed(region: impl Into<String>, reason: impl Into<String>) -> Error {
    Error::malformed(MeshFormat::Dae, region, reason)
}

impl DocumentReader {
    /// `<library_nodes>` templates are only reachable through
    /// `<instance_node>`, which is not followed
    fn in_visual_scene(&self) -> bool {
        self.path.iter().any(|p| p == b"visual_scene")
    }

    fn parent(&self) -> Option<&[u8]> {
        self.path.len().checked_sub(2).map(|i| self.path[i].as_slice())
    }

    fn start(&mut self, e: &BytesStart<'_>) {
        let local = e.local_name();
        match local.as_ref() {
            b"up_axis" | b"p" | b"vcount" | b"matrix" | b"translate" | b"rotate" | b"scale" => {
                self.text.clear();
            }
            b"float_array" => {
                self.text.clear();
                self.float_array_id = attr(e, b"id").unwrap_or_default();
            }
            b"unit" => {
                tracing::debug!(
                    meter = attr(e, b"meter").as_deref().unwrap_or("1"),
                    "Ignoring COLLADA <unit>; scale comes from load options"
                );
            }
            b"geometry" => {
                self.geometry = Some(Geometry {
                    id: attr(e, b"id").unwrap_or_default(),
                    name: attr(e, b"name"),
                    ..Default::default()
                });
            }
            b"source" if self.geometry.is_some() => {
                let id = attr(e, b"id").unwrap_or_default();
                self.source = Some((id, Source { floats: Vec::new(), stride: 1 }));
            }
            b"accessor" => {
                if let Some((_, source)) = self.source.as_mut() {
                    source.stride = attr(e, b"stride")
                        .and_then(|s| s.trim().parse().ok())
                        .unwrap_or(1);
                }
            }
            b"vertices" if self.geometry.is_some() => {
                self.vertices_id = attr(e, b"id");
            }
            b"triangles" | b"polylist" | b"polygons" if self.geometry.is_some() => {
                let kind = match local.as_ref() {
                    b"triangles" => PrimitiveKind::Triangles,
                    b"polylist" => PrimitiveKind::Polylist,
                    _ => PrimitiveKind::Polygons,
                };
                self.primitive = Some(Primitive {
                    kind,
                    inputs: Vec::new(),
                    vcount: Vec::new(),
                    lists: Vec::new(),
                });
            }
            b"input" => self.input(e),
            b"node" if self.in_visual_scene() => {
                let index = self.doc.nodes.len();
                self.doc.nodes.push(SceneNode {
                    name: attr(e, b"name").or_else(|| attr(e, b"id")),
                    transform: Matrix4::identity(),
                    instances: Vec::new(),
                    children: Vec::new(),
                });
                match self.node_stack.last() {
                    Some(&parent) => self.doc.nodes[parent].children.push(index),
                    None => self.doc.roots.push(index),
                }
                self.node_stack.push(index);
            }
            b"instance_geometry" => {
                if let (Some(&node), Some(url)) = (self.node_stack.last(), attr(e, b"url")) {
                    self.doc.nodes[node].instances.push(url_target(&url));
                }
            }
            _ => {}
        }
    }

    fn input(&mut self, e: &BytesStart<'_>) {
        let semantic = attr(e, b"semantic").unwrap_or_default();
        let source = attr(e, b"source").map(|s| url_target(&s)).unwrap_or_default();

        if let Some(primitive) = self.primitive.as_mut() {
            let offset = attr(e, b"offset")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0);
            primitive.inputs.push(Input {
                semantic,
                source,
                offset,
            });
        } else if let (Some(geometry), Some(id)) = (self.geometry.as_mut(), &self.vertices_id) {
            if semantic == "POSITION" {
                geometry.vertices.insert(id.clone(), source);
            }
        }
    }

    fn end(&mut self, local: &[u8]) -> Result<()> {
        match local {
            b"up_axis" => self.doc.up_axis = UpAxis::from_collada(&self.text),
            b"float_array" => {
                let floats = float_list(&self.text).ok_or_else(|| {
                    malformed(
                        format!("<float_array id=\"{}\">", self.float_array_id),
                        "not a list of finite numbers",
                    )
                })?;
                if let Some((_, source)) = self.source.as_mut() {
                    source.floats = floats;
                }
            }
            b"source" => {
                if let (Some(geometry), Some((id, source))) =
                    (self.geometry.as_mut(), self.source.take())
                {
                    geometry.sources.insert(id, source);
                }
            }
            b"vertices" => self.vertices_id = None,
            b"p" | b"vcount" => {
                let Some(primitive) = self.primitive.as_mut() else {
                    return Ok(());
                };
                let values = integer_list(&self.text).ok_or_else(|| {
                    let element = String::from_utf8_lossy(local).into_owned();
                    let region = match &self.geometry {
                        Some(g) => g.region(&element),
                        None => format!("<{}>", element),
                    };
                    malformed(region, "not a list of integers")
                })?;
                if local == b"p" {
                    primitive.lists.push(values);
                } else {
                    primitive.vcount = values;
                }
            }
            b"triangles" | b"polylist" | b"polygons" => {
                if let (Some(geometry), Some(primitive)) =
                    (self.geometry.as_mut(), self.primitive.take())
                {
                    geometry.primitives.push(primitive);
                }
            }
            b"geometry" => {
                if let Some(geometry) = self.geometry.take() {
                    self.doc.geometries.push(geometry);
                }
            }
            b"matrix" | b"translate" | b"rotate" | b"scale" => self.transform(local)?,
            b"node" if self.in_visual_scene() => {
                self.node_stack.pop();
            }
            _ => {}
        }
        Ok(())
    }

    /// Fold a node transform element into the node's local matrix
    fn transform(&mut self, local: &[u8]) -> Result<()> {
        if self.parent() != Some(b"node".as_slice()) {
            return Ok(());
        }
        let Some(&node) = self.node_stack.last() else {
            return Ok(());
        };

        let element = String::from_utf8_lossy(local).into_owned();
        let values = float_list(&self.text)
            .ok_or_else(|| malformed(format!("<{}>", element), "not a list of numbers"))?;
        let expected = match local {
            b"matrix" => 16,
            b"rotate" => 4,
            _ => 3,
        };
        if values.len() != expected {
            return Err(malformed(
                format!("<{}>", element),
                format!("expected {} values, found {}", expected, values.len()),
            ));
        }

        let matrix = match local {
            b"matrix" => Matrix4::from_row_slice(&values),
            b"translate" => {
                Matrix4::new_translation(&Vector3::new(values[0], values[1], values[2]))
            }
            b"rotate" => {
                match Unit::try_new(Vector3::new(values[0], values[1], values[2]), 1e-12) {
                    Some(axis) => {
                        Rotation3::from_axis_angle(&axis, values[3].to_radians()).to_homogeneous()
                    }
                    None => Matrix4::identity(),
                }
            }
            _ => Matrix4::new_nonuniform_scaling(&Vector3::new(values[0], values[1], values[2])),
        };

        let node = &mut self.doc.nodes[node];
        node.transform *= matrix;
        Ok(())
    }
}

fn read_document(text: &str) -> Result<Document> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut state = DocumentReader::default();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            malformed(format!("byte {}", reader.buffer_position()), e.to_string())
        })?;
        match event {
            Event::Start(ref e) => {
                state.path.push(e.local_name().as_ref().to_vec());
                state.start(e);
            }
            Event::Empty(ref e) => {
                let local = e.local_name().as_ref().to_vec();
                state.path.push(local.clone());
                state.start(e);
                state.end(&local)?;
                state.path.pop();
            }
            Event::Text(ref t) => {
                let content = t.unescape().map_err(|e| {
                    malformed(format!("byte {}", reader.buffer_position()), e.to_string())
                })?;
                if !state.text.is_empty() {
                    state.text.push(' ');
                }
                state.text.push_str(&content);
            }
            Event::End(ref e) => {
                let local = e.local_name().as_ref().to_vec();
                state.end(&local)?;
                state.path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(state.doc)
}

/// Emits geometry instances into the builder
struct Instancer<'a> {
    doc: &'a Document,
    by_id: FxHashMap<&'a str, usize>,
    instanced: Vec<bool>,
}

impl<'a> Instancer<'a> {
    fn new(doc: &'a Document) -> Self {
        let by_id = doc
            .geometries
            .iter()
            .enumerate()
            .map(|(i, g)| (g.id.as_str(), i))
            .collect();
        Self {
            doc,
            by_id,
            instanced: vec![false; doc.geometries.len()],
        }
    }

    fn walk(
        &mut self,
        node: usize,
        parent: &Matrix4<f64>,
        inherited: Option<&'a str>,
        builder: &mut MeshBuilder,
    ) -> Result<()> {
        let doc = self.doc;
        let scene_node = &doc.nodes[node];
        let world = parent * scene_node.transform;
        let name = scene_node.name.as_deref().or(inherited);

        for url in &scene_node.instances {
            let Some(&index) = self.by_id.get(url.as_str()) else {
                tracing::debug!(url = %url, "instance_geometry points at an unknown geometry");
                continue;
            };
            self.instanced[index] = true;
            let geometry = &doc.geometries[index];
            builder.set_group(Some(name.unwrap_or(geometry.label())));
            emit_geometry(geometry, &world, builder)?;
        }

        for &child in &scene_node.children {
            self.walk(child, &world, name, builder)?;
        }
        Ok(())
    }
}

/// Resolve the POSITION source feeding a primitive and the offset of its index
fn position_input<'g>(
    geometry: &'g Geometry,
    primitive: &'g Primitive,
) -> Result<(&'g str, &'g Source, usize)> {
    let input = primitive
        .inputs
        .iter()
        .find(|i| i.semantic == "VERTEX")
        .or_else(|| primitive.inputs.iter().find(|i| i.semantic == "POSITION"))
        .ok_or_else(|| {
            malformed(
                geometry.region(primitive.kind.tag()),
                "no VERTEX or POSITION input",
            )
        })?;

    let source_id = geometry
        .vertices
        .get(&input.source)
        .unwrap_or(&input.source)
        .as_str();
    let source = geometry.sources.get(source_id).ok_or_else(|| {
        malformed(
            geometry.region(primitive.kind.tag()),
            format!("unknown position source '{}'", source_id),
        )
    })?;
    if source.stride < 3 {
        return Err(malformed(
            format!("<source id=\"{}\">", source_id),
            format!("position stride {} is below 3", source.stride),
        ));
    }
    Ok((source_id, source, input.offset))
}

fn emit_geometry(
    geometry: &Geometry,
    world: &Matrix4<f64>,
    builder: &mut MeshBuilder,
) -> Result<()> {
    // Mirroring transforms flip the winding
    let flip = world.fixed_view::<3, 3>(0, 0).determinant() < 0.0;
    // Instance vertex block per position source: (first index, count)
    let mut bases: FxHashMap<&str, (i64, i64)> = FxHashMap::default();

    for primitive in &geometry.primitives {
        let (source_id, source, offset) = position_input(geometry, primitive)?;
        let &mut (base, count) = bases.entry(source_id).or_insert_with(|| {
            let base = builder.vertex_count() as i64;
            for chunk in source.floats.chunks_exact(source.stride) {
                let p = world.transform_point(&Point3::new(chunk[0], chunk[1], chunk[2]));
                builder.add_vertex(p);
            }
            (base, (source.floats.len() / source.stride) as i64)
        });

        let stride = primitive
            .inputs
            .iter()
            .map(|i| i.offset + 1)
            .max()
            .unwrap_or(1);

        let emit = |corners: &[i64], builder: &mut MeshBuilder| {
            let mut polygon: SmallVec<[i64; 8]> = SmallVec::new();
            for chunk in corners.chunks_exact(stride) {
                let raw = chunk[offset];
                if raw < 0 || raw >= count {
                    builder.reject_face(DropReason::IndexOutOfRange {
                        index: raw,
                        vertex_count: count as usize,
                    });
                    return;
                }
                polygon.push(base + raw);
            }
            if flip {
                polygon.reverse();
            }
            builder.add_face(&polygon);
        };

        let region = || geometry.region(primitive.kind.tag());
        match primitive.kind {
            PrimitiveKind::Triangles => {
                let indices: Vec<i64> = primitive.lists.concat();
                if indices.len() % (stride * 3) != 0 {
                    return Err(malformed(
                        region(),
                        format!("{} indices do not form whole triangles", indices.len()),
                    ));
                }
                for corners in indices.chunks_exact(stride * 3) {
                    emit(corners, builder);
                }
            }
            PrimitiveKind::Polylist => {
                let indices: Vec<i64> = primitive.lists.concat();
                let mut cursor = 0usize;
                for &n in &primitive.vcount {
                    let end = usize::try_from(n)
                        .ok()
                        .and_then(|n| n.checked_mul(stride))
                        .and_then(|len| cursor.checked_add(len))
                        .ok_or_else(|| malformed(region(), format!("bad <vcount> entry {}", n)))?;
                    let Some(corners) = indices.get(cursor..end) else {
                        return Err(malformed(region(), "<vcount> exceeds the index list"));
                    };
                    emit(corners, builder);
                    cursor = end;
                }
                if cursor != indices.len() {
                    return Err(malformed(region(), "<vcount> does not cover the index list"));
                }
            }
            PrimitiveKind::Polygons => {
                for corners in &primitive.lists {
                    if corners.len() % stride != 0 {
                        return Err(malformed(region(), "polygon index list has a partial vertex"));
                    }
                    emit(corners, builder);
                }
            }
        }
    }
    Ok(())
}

impl MeshParser for DaeParser {
    fn parse(&self, bytes: &[u8], options: &LoadOptions) -> Result<LoadedMesh> {
        let text = String::from_utf8_lossy(bytes);
        let doc = read_document(&text)?;

        // COLLADA defaults to Y-up when <up_axis> is absent
        let native = doc.up_axis.unwrap_or(UpAxis::Y);
        let mut builder = MeshBuilder::new(MeshFormat::Dae, options.frame(native));

        let mut instancer = Instancer::new(&doc);
        let identity = Matrix4::identity();
        for &root in &doc.roots {
            instancer.walk(root, &identity, None, &mut builder)?;
        }

        for (index, geometry) in doc.geometries.iter().enumerate() {
            if !instancer.instanced[index] {
                builder.set_group(Some(geometry.label()));
                emit_geometry(geometry, &identity, &mut builder)?;
            }
        }

        tracing::debug!(
            geometries = doc.geometries.len(),
            nodes = doc.nodes.len(),
            up_axis = ?native,
            "COLLADA document read"
        );

        builder.finish()
    }

    fn format(&self) -> MeshFormat {
        MeshFormat::Dae
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const BOX_GEOMETRY: &str = r##"
    <geometry id="panel-mesh" name="panel">
      <mesh>
        <source id="panel-pos">
          <float_array id="panel-pos-array" count="12">0 0 0  1 0 0  1 0 1  0 0 1</float_array>
          <technique_common>
            <accessor source="#panel-pos-array" count="4" stride="3"/>
          </technique_common>
        </source>
        <vertices id="panel-vtx">
          <input semantic="POSITION" source="#panel-pos"/>
        </vertices>
        <polylist count="1">
          <input semantic="VERTEX" source="#panel-vtx" offset="0"/>
          <input semantic="NORMAL" source="#panel-nrm" offset="1"/>
          <vcount>4</vcount>
          <p>0 0 1 0 2 0 3 0</p>
        </polylist>
      </mesh>
    </geometry>"##;

    fn document(scene: &str, up: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset><unit name="inch" meter="0.0254"/><up_axis>{}</up_axis></asset>
  <library_geometries>{}</library_geometries>
  <library_visual_scenes><visual_scene id="scene">{}</visual_scene></library_visual_scenes>
</COLLADA>"#,
            up, BOX_GEOMETRY, scene
        )
    }

    fn load(xml: &str) -> Result<LoadedMesh> {
        DaeParser.parse(xml.as_bytes(), &LoadOptions::default())
    }

    #[test]
    fn test_uninstanced_geometry_emitted_once() {
        let loaded = load(&document("", "Z_UP")).unwrap();
        let mesh = loaded.mesh;
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.groups, vec!["panel"]);
        assert_relative_eq!(mesh.surface_area(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_instances_use_nearest_named_node() {
        let scene = r##"
        <node name="door_left">
          <translate>2 0 0</translate>
          <node id="inner">
            <instance_geometry url="#panel-mesh"/>
          </node>
        </node>
        <node>
          <scale>2 2 2</scale>
          <instance_geometry url="#panel-mesh"/>
        </node>"##;
        let mesh = load(&document(scene, "Z_UP")).unwrap().mesh;
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 4);
        assert_eq!(mesh.groups, vec!["inner", "panel"]);

        let (min, max) = mesh.bounds();
        assert_relative_eq!(min.x, 0.0);
        assert_relative_eq!(max.x, 3.0);
        assert_relative_eq!(max.z, 2.0);
        // The scaled copy has four times the area
        assert_relative_eq!(mesh.surface_area(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_y_up_document_is_rotated() {
        let mesh = load(&document("", "Y_UP")).unwrap().mesh;
        let (min, max) = mesh.bounds();
        // Source z in [0, 1] becomes canonical -y
        assert_relative_eq!(min.y, -1.0);
        assert_relative_eq!(max.y, 0.0);
        assert_relative_eq!(max.z, 0.0);
    }

    #[test]
    fn test_mirrored_instance_keeps_outward_winding() {
        let scene = r##"
        <node name="m">
          <scale>-1 1 1</scale>
          <instance_geometry url="#panel-mesh"/>
        </node>"##;
        let plain = load(&document("", "Z_UP")).unwrap().mesh;
        let mirrored = load(&document(scene, "Z_UP")).unwrap().mesh;
        let n_plain = plain.face_normal(0).unwrap();
        let n_mirrored = mirrored.face_normal(0).unwrap();
        assert_relative_eq!(n_plain.y, n_mirrored.y, epsilon = 1e-12);
    }

    #[test]
    fn test_bad_float_array_region() {
        let xml = document("", "Z_UP").replace("0 0 0  1 0 0", "0 0 zero 1 0 0");
        let err = load(&xml).unwrap_err();
        assert_eq!(
            err,
            Error::malformed(
                MeshFormat::Dae,
                "<float_array id=\"panel-pos-array\">",
                "not a list of finite numbers"
            )
        );
    }

    #[test]
    fn test_out_of_range_index_is_warning() {
        let xml = document("", "Z_UP")
            .replace("<vcount>4</vcount>", "<vcount>4 3</vcount>")
            .replace("<p>0 0 1 0 2 0 3 0</p>", "<p>0 0 1 0 2 0 3 0 0 0 1 0 9 0</p>");
        let loaded = load(&xml).unwrap();
        assert_eq!(loaded.mesh.face_count(), 2);
        assert_eq!(loaded.warnings.len(), 1);
    }

    #[test]
    fn test_bad_vcount_is_malformed() {
        for vcount in ["9223372036854775807", "-4", "4 9223372036854775807"] {
            let xml = document("", "Z_UP")
                .replace("<vcount>4</vcount>", &format!("<vcount>{}</vcount>", vcount));
            assert!(
                matches!(load(&xml), Err(Error::MalformedGeometry { .. })),
                "{}",
                vcount
            );
        }
    }

    #[test]
    fn test_truncated_xml_is_malformed() {
        let err = load("<COLLADA><library_geometries><geometry id=\"g\"><mesh>").unwrap_err();
        assert!(matches!(err, Error::MalformedGeometry { .. }));
    }
}
