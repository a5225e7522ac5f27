//! Wavefront OBJ codec with MTL material support
//!
//! The reader is lenient: a malformed line is logged at warn level and
//! skipped, and parsing continues with the next line. This matches how OBJ
//! files exist in the wild, where exporters disagree on optional fields.
//!
//! Vertex colors use the common unofficial extension of three extra values on
//! a `v` line, each in [0, 1].

use crate::{CloudSink, CloudSource};
use log::warn;
use nalgebra::{Point2, Point3};
use polyrast_core::{PackedArray, Result, VertexMesh};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Receives parsed OBJ statements in file order.
///
/// Every method has a no-op default so implementations only handle what they
/// care about. Indexes have already been converted from the file's 1-based
/// (or negative, relative-to-end) convention into 0-based array indexes.
pub trait ObjHandler {
    /// An `mtllib` statement naming an MTL file
    fn library(&mut self, _name: &str) {}

    /// A `usemtl` statement. Geometry that follows belongs to this material.
    fn material(&mut self, _name: &str) {}

    fn vertex(&mut self, _x: f64, _y: f64, _z: f64) {}

    /// Vertex with the RGB color extension, each channel in [0, 1]
    fn vertex_with_color(&mut self, _x: f64, _y: f64, _z: f64, _r: f64, _g: f64, _b: f64) {}

    fn vertex_normal(&mut self, _x: f64, _y: f64, _z: f64) {}

    fn vertex_texture(&mut self, _x: f64, _y: f64) {}

    fn point(&mut self, _vertex: usize) {}

    fn line(&mut self, _vertexes: &[usize]) {}

    /// A face with `vertex_count` corners. `indexes` holds the same number of
    /// values per corner, interleaved in vertex/texture/normal order.
    fn face(&mut self, _indexes: &[usize], _vertex_count: usize) {}

    /// Checked after every statement; return true to stop parsing early
    fn stop_early(&self) -> bool {
        false
    }
}

/// Parses OBJ text, reporting each statement to `handler`.
///
/// Lines ending in `\` continue onto the next line. Comment lines and lines
/// that fail to parse are skipped; the latter are logged.
pub fn parse_obj<R: BufRead>(reader: R, handler: &mut dyn ObjHandler) -> Result<()> {
    let mut pending = String::new();
    let mut vertex_count: i64 = 0;
    let mut indexes: Vec<usize> = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let chunk = line.trim();
        if chunk.is_empty() {
            continue;
        }

        // Merge continuation lines before splitting into words
        if let Some(stripped) = chunk.strip_suffix('\\') {
            if !pending.is_empty() {
                pending.push(' ');
            }
            pending.push_str(stripped.trim_end());
            continue;
        }
        let statement = if pending.is_empty() {
            chunk.to_string()
        } else {
            let merged = format!("{pending} {chunk}");
            pending.clear();
            merged
        };

        let words: Vec<&str> = statement.split_whitespace().collect();
        if let Err(message) = process_statement(&words, &mut vertex_count, &mut indexes, handler) {
            warn!(
                "line {}: bad object description '{}': {}",
                line_number + 1,
                words[0],
                message
            );
        }
        if handler.stop_early() {
            return Ok(());
        }
    }
    Ok(())
}

fn process_statement(
    words: &[&str],
    vertex_count: &mut i64,
    indexes: &mut Vec<usize>,
    handler: &mut dyn ObjHandler,
) -> std::result::Result<(), String> {
    match words[0] {
        "v" => {
            let x = word_f64(words, 1)?;
            let y = word_f64(words, 2)?;
            let z = word_f64(words, 3)?;
            // optional RGB color extension
            if words.len() == 7 {
                let r = word_f64(words, 4)?;
                let g = word_f64(words, 5)?;
                let b = word_f64(words, 6)?;
                handler.vertex_with_color(x, y, z, r, g, b);
            } else {
                handler.vertex(x, y, z);
            }
            *vertex_count += 1;
        }
        "vn" => {
            let x = word_f64(words, 1)?;
            let y = word_f64(words, 2)?;
            let z = word_f64(words, 3)?;
            handler.vertex_normal(x, y, z);
        }
        "vt" => {
            let x = word_f64(words, 1)?;
            let y = word_f64(words, 2)?;
            handler.vertex_texture(x, y);
        }
        "p" => {
            let index = word_i64(words, 1)?;
            handler.point(ensure_index(index, *vertex_count)?);
        }
        "l" => {
            indexes.clear();
            for word in &words[1..] {
                let index = word
                    .parse::<i64>()
                    .map_err(|_| format!("bad index '{word}'"))?;
                indexes.push(ensure_index(index, *vertex_count)?);
            }
            handler.line(indexes);
        }
        "f" => {
            read_face_indexes(words, *vertex_count, indexes)?;
            handler.face(indexes, words.len() - 1);
        }
        "mtllib" => handler.library(words.get(1).ok_or("missing library name")?),
        "usemtl" => handler.material(words.get(1).ok_or("missing material name")?),
        unknown => return Err(format!("unknown object type '{unknown}'")),
    }
    Ok(())
}

fn word_f64(words: &[&str], index: usize) -> std::result::Result<f64, String> {
    let word = words.get(index).ok_or("missing value")?;
    word.parse().map_err(|_| format!("bad number '{word}'"))
}

fn word_i64(words: &[&str], index: usize) -> std::result::Result<i64, String> {
    let word = words.get(index).ok_or("missing value")?;
    word.parse().map_err(|_| format!("bad index '{word}'"))
}

/// Converts a 1-based or negative relative index into an array index
fn ensure_index(found: i64, vertex_count: i64) -> std::result::Result<usize, String> {
    let index = if found > 0 {
        found - 1
    } else {
        vertex_count + found
    };
    if index < 0 {
        return Err(format!("index out of range: {found}"));
    }
    Ok(index as usize)
}

fn read_face_indexes(
    words: &[&str],
    vertex_count: i64,
    indexes: &mut Vec<usize>,
) -> std::result::Result<(), String> {
    indexes.clear();
    for word in &words[1..] {
        for part in word.split('/') {
            let value = part
                .parse::<i64>()
                .map_err(|_| format!("bad index '{word}'"))?;
            indexes.push(ensure_index(value, vertex_count)?);
        }
    }
    Ok(())
}

/// Writes OBJ statements as text. Low level companion to the save functions.
pub struct ObjTextWriter<W: Write> {
    output: W,
    vertex_count: usize,
    // vertexes written at the time of the last face
    face_watermark: usize,
}

impl<W: Write> ObjTextWriter<W> {
    pub fn new(output: W) -> Self {
        Self {
            output,
            vertex_count: 0,
            face_watermark: 0,
        }
    }

    pub fn add_comment(&mut self, comment: &str) -> Result<()> {
        writeln!(self.output, "# {comment}")?;
        Ok(())
    }

    pub fn add_library(&mut self, name: &str) -> Result<()> {
        writeln!(self.output, "mtllib {name}")?;
        Ok(())
    }

    pub fn add_material(&mut self, name: &str) -> Result<()> {
        writeln!(self.output, "usemtl {name}")?;
        Ok(())
    }

    pub fn add_vertex(&mut self, x: f64, y: f64, z: f64) -> Result<()> {
        writeln!(self.output, "v {x} {y} {z}")?;
        self.vertex_count += 1;
        Ok(())
    }

    /// Vertex with the RGB color extension, each channel in [0, 1]
    pub fn add_vertex_rgb(
        &mut self,
        x: f64,
        y: f64,
        z: f64,
        red: f64,
        green: f64,
        blue: f64,
    ) -> Result<()> {
        writeln!(self.output, "v {x} {y} {z} {red} {green} {blue}")?;
        self.vertex_count += 1;
        Ok(())
    }

    pub fn add_vertex_normal(&mut self, x: f64, y: f64, z: f64) -> Result<()> {
        writeln!(self.output, "vn {x} {y} {z}")?;
        Ok(())
    }

    pub fn add_texture_vertex(&mut self, x: f64, y: f64) -> Result<()> {
        writeln!(self.output, "vt {x} {y}")?;
        Ok(())
    }

    /// Point statement. Non-negative is a 0-based index, negative is relative
    /// to the most recently written vertex.
    pub fn add_point(&mut self, vertex: i64) -> Result<()> {
        if vertex >= 0 {
            writeln!(self.output, "p {}", vertex + 1)?;
        } else {
            writeln!(self.output, "p {vertex}")?;
        }
        Ok(())
    }

    /// Face statement. With `Some(indexes)` each 0-based index is written
    /// `type_count` times as a `/`-separated tuple, the shared-index layout
    /// used when vertex, texture, and normal pools run in parallel. With
    /// `None` the face references the vertexes written since the last face,
    /// as negative relative indexes.
    pub fn add_face(&mut self, indexes: Option<&[usize]>, type_count: usize) -> Result<()> {
        write!(self.output, "f")?;
        match indexes {
            Some(indexes) => {
                for &index in indexes {
                    write!(self.output, " {}", index + 1)?;
                    for _ in 1..type_count {
                        write!(self.output, "/{}", index + 1)?;
                    }
                }
            }
            None => {
                let count = self.vertex_count - self.face_watermark;
                for i in 0..count {
                    write!(self.output, " {}", i as i64 - count as i64)?;
                }
            }
        }
        writeln!(self.output)?;
        self.face_watermark = self.vertex_count;
        Ok(())
    }
}

/// Writes a point cloud as OBJ, one `v`/`p` pair per point
pub fn save_cloud<W: Write>(cloud: &dyn CloudSource, output: W) -> Result<()> {
    let mut obj = ObjTextWriter::new(output);
    obj.add_comment("Created by polyrast")?;

    let has_color = cloud.has_color();
    for i in 0..cloud.len() {
        let p = cloud.position(i);
        if has_color {
            add_rgb_vertex(&mut obj, &p, cloud.rgb(i))?;
        } else {
            obj.add_vertex(p.x, p.y, p.z)?;
        }
        obj.add_point(-1)?;
    }
    Ok(())
}

/// Writes a mesh as OBJ. A non-empty texture name produces `mtllib`/`usemtl`
/// statements referencing a sibling MTL file named after the texture.
pub fn save_mesh<W: Write>(mesh: &VertexMesh, output: W) -> Result<()> {
    let mut obj = ObjTextWriter::new(output);
    obj.add_comment("Created by polyrast")?;

    if !mesh.texture_name.is_empty() {
        let base = base_name(&mesh.texture_name);
        obj.add_library(&format!("{base}.mtl"))?;
        obj.add_material(&base)?;
    }

    let has_vertex_colors = !mesh.rgb.is_empty();

    for i in 0..mesh.vertexes.len() {
        let p = mesh.vertexes.get(i);
        if has_vertex_colors {
            add_rgb_vertex(&mut obj, &p, mesh.rgb[i])?;
        } else {
            obj.add_vertex(p.x, p.y, p.z)?;
        }
    }

    for i in 0..mesh.normals.len() {
        let n = mesh.normals.get(i);
        obj.add_vertex_normal(n.x as f64, n.y as f64, n.z as f64)?;
    }

    for i in 0..mesh.texture.len() {
        let p = mesh.texture.get(i);
        obj.add_texture_vertex(p.x as f64, p.y as f64)?;
    }

    // how many vertex attribute pools the face tuples reference
    let mut type_count = 0;
    if !mesh.vertexes.is_empty() {
        type_count += 1;
    }
    if !mesh.normals.is_empty() {
        type_count += 1;
    }
    if !mesh.texture.is_empty() {
        type_count += 1;
    }

    for face in 0..mesh.len() {
        let idx0 = mesh.face_offsets[face];
        let idx1 = mesh.face_offsets[face + 1];
        obj.add_face(Some(&mesh.face_vertexes[idx0..idx1]), type_count)?;
    }
    Ok(())
}

/// Writes the MTL file a textured mesh refers to, with a fixed material
/// template carrying the texture in `map_Kd`
pub fn save_mtl<W: Write>(texture_file: &str, output: &mut W) -> Result<()> {
    let base = base_name(texture_file);
    writeln!(output, "newmtl {base}")?;
    writeln!(output, "Ka 1.0 1.0 1.0")?;
    writeln!(output, "Kd 1.0 1.0 1.0")?;
    writeln!(output, "Ks 0.0 0.0 0.0")?;
    writeln!(output, "d 1.0")?;
    writeln!(output, "Ns 0.0")?;
    writeln!(output, "illum 0")?;
    writeln!(output, "map_Kd {texture_file}")?;
    Ok(())
}

/// Reads vertexes from OBJ text into a point cloud, ignoring all geometry
pub fn load_cloud<R: BufRead>(input: R, output: &mut dyn CloudSink) -> Result<()> {
    struct Handler<'a> {
        output: &'a mut dyn CloudSink,
        started: bool,
    }

    impl Handler<'_> {
        fn ensure_started(&mut self, has_color: bool) {
            if !self.started {
                self.output.initialize(0, has_color);
                self.started = true;
            }
        }
    }

    impl ObjHandler for Handler<'_> {
        fn vertex(&mut self, x: f64, y: f64, z: f64) {
            self.ensure_started(false);
            self.output.add(Point3::new(x, y, z), 0);
        }

        fn vertex_with_color(&mut self, x: f64, y: f64, z: f64, r: f64, g: f64, b: f64) {
            self.ensure_started(true);
            self.output.add(Point3::new(x, y, z), convert_to_int(r, g, b));
        }
    }

    parse_obj(input, &mut Handler { output, started: false })
}

/// Reads OBJ text into a mesh. Material statements are ignored since a stream
/// has no file system to resolve MTL references against; use
/// [`ObjFileLoader`] when loading from disk.
pub fn load_mesh<R: BufRead>(input: R, output: &mut VertexMesh) -> Result<()> {
    output.reset();

    struct Handler<'a> {
        mesh: &'a mut VertexMesh,
    }

    impl ObjHandler for Handler<'_> {
        fn vertex(&mut self, x: f64, y: f64, z: f64) {
            self.mesh.vertexes.append(Point3::new(x, y, z));
        }

        fn vertex_with_color(&mut self, x: f64, y: f64, z: f64, r: f64, g: f64, b: f64) {
            self.mesh.vertexes.append(Point3::new(x, y, z));
            self.mesh.rgb.push(convert_to_int(r, g, b));
        }

        fn vertex_normal(&mut self, x: f64, y: f64, z: f64) {
            self.mesh
                .normals
                .append(Point3::new(x as f32, y as f32, z as f32));
        }

        fn vertex_texture(&mut self, x: f64, y: f64) {
            self.mesh.texture.append(Point2::new(x as f32, y as f32));
        }

        fn face(&mut self, indexes: &[usize], vertex_count: usize) {
            add_face_to_mesh(indexes, vertex_count, self.mesh);
        }
    }

    parse_obj(input, &mut Handler { mesh: output })
}

/// Splits the interleaved vertex/texture/normal face tuple into the mesh's
/// parallel index arrays
fn add_face_to_mesh(indexes: &[usize], vertex_count: usize, output: &mut VertexMesh) {
    let has_texture = !output.texture.is_empty();
    let has_normals = output.has_normals();

    let type_count = indexes.len() / vertex_count;
    for corner in 0..vertex_count {
        let mut index = corner * type_count;
        output.face_vertexes.push(indexes[index]);
        index += 1;

        if has_texture && type_count > 1 {
            output.face_vertex_textures.push(indexes[index]);
            index += 1;
        }
        if has_normals && index < (corner + 1) * type_count {
            output.face_vertex_normals.push(indexes[index]);
        }
    }
    output.face_offsets.push(output.face_vertexes.len());
}

/// Converts [0, 1] color channels into packed 0xRRGGBB
fn convert_to_int(red: f64, green: f64, blue: f64) -> u32 {
    let r = (255.0 * red + 0.5) as u32;
    let g = (255.0 * green + 0.5) as u32;
    let b = (255.0 * blue + 0.5) as u32;
    r << 16 | g << 8 | b
}

fn add_rgb_vertex<W: Write>(obj: &mut ObjTextWriter<W>, p: &Point3<f64>, rgb: u32) -> Result<()> {
    let red = (rgb >> 16 & 0xFF) as f64 / 255.0;
    let green = (rgb >> 8 & 0xFF) as f64 / 255.0;
    let blue = (rgb & 0xFF) as f64 / 255.0;
    obj.add_vertex_rgb(p.x, p.y, p.z, red, green, blue)
}

fn base_name(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("material")
        .to_string()
}

/// Loads an OBJ file and its MTL materials from disk.
///
/// A single OBJ file can define several shapes with different texture maps;
/// each `usemtl` starts a new mesh keyed by the material name, with its
/// texture file taken from the MTL's `map_Kd`. Geometry seen before any
/// material lands in a mesh with an empty name.
pub struct ObjFileLoader {
    shapes: Vec<(String, VertexMesh)>,
    ignored_material: bool,
}

impl ObjFileLoader {
    /// Loads every shape in the file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut handler = LoaderHandler::new(path, false);
        parse_obj(BufReader::new(File::open(path)?), &mut handler)?;
        Ok(Self {
            shapes: handler.shapes,
            ignored_material: handler.ignored_material,
        })
    }

    /// Loads only the first shape into `output`. Returns true when the file
    /// defined further materials that were skipped.
    pub fn load_single<P: AsRef<Path>>(path: P, output: &mut VertexMesh) -> Result<bool> {
        let path = path.as_ref();
        let mut handler = LoaderHandler::new(path, true);
        parse_obj(BufReader::new(File::open(path)?), &mut handler)?;

        output.reset();
        if let Some((_, mesh)) = handler.shapes.into_iter().next() {
            *output = mesh;
        }
        Ok(handler.ignored_material)
    }

    /// Shapes in file order, keyed by material name
    pub fn shapes(&self) -> &[(String, VertexMesh)] {
        &self.shapes
    }

    /// True when materials beyond the first were skipped by a single-shape
    /// load
    pub fn ignored_material(&self) -> bool {
        self.ignored_material
    }
}

struct LoaderHandler {
    base_dir: PathBuf,
    material_to_texture: HashMap<String, String>,
    shapes: Vec<(String, VertexMesh)>,
    single: bool,
    first: bool,
    ignored_material: bool,
    stop: bool,
}

impl LoaderHandler {
    fn new(obj_path: &Path, single: bool) -> Self {
        let base_dir = obj_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            base_dir,
            material_to_texture: HashMap::new(),
            shapes: vec![(String::new(), VertexMesh::new())],
            single,
            first: true,
            ignored_material: false,
            stop: false,
        }
    }

    fn active(&mut self) -> &mut VertexMesh {
        let last = self.shapes.len() - 1;
        &mut self.shapes[last].1
    }

    fn read_mtl(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path)?;
        let mut material = String::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let mut words = line.split_whitespace();
            let command = match words.next() {
                Some(word) => word,
                None => continue,
            };
            let value = match words.next() {
                Some(word) => word,
                None => continue,
            };
            match command {
                "newmtl" => material = value.to_string(),
                "map_Kd" => {
                    self.material_to_texture
                        .insert(material.clone(), value.to_string());
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl ObjHandler for LoaderHandler {
    fn library(&mut self, name: &str) {
        let path = self.base_dir.join(name);
        if let Err(e) = self.read_mtl(&path) {
            warn!("failed to read MTL '{}': {e}", path.display());
        }
    }

    fn material(&mut self, name: &str) {
        let active_empty = self.active().vertexes.is_empty();

        if self.single {
            if !self.first || !active_empty {
                self.ignored_material = true;
                self.stop = true;
                return;
            }
            // keep using the default mesh, just give it the material's name
            let last = self.shapes.len() - 1;
            self.shapes[last].0 = name.to_string();
        } else {
            // drop the unused default mesh
            if self.first && active_empty {
                self.shapes.pop();
            }
            self.shapes.push((name.to_string(), VertexMesh::new()));
        }
        self.first = false;

        match self.material_to_texture.get(name) {
            Some(texture) => {
                let texture = texture.clone();
                self.active().texture_name = texture;
            }
            None => warn!("unknown material '{name}'"),
        }
    }

    fn vertex(&mut self, x: f64, y: f64, z: f64) {
        self.active().vertexes.append(Point3::new(x, y, z));
    }

    fn vertex_with_color(&mut self, x: f64, y: f64, z: f64, r: f64, g: f64, b: f64) {
        let rgb = convert_to_int(r, g, b);
        let active = self.active();
        active.vertexes.append(Point3::new(x, y, z));
        active.rgb.push(rgb);
    }

    fn vertex_normal(&mut self, x: f64, y: f64, z: f64) {
        self.active()
            .normals
            .append(Point3::new(x as f32, y as f32, z as f32));
    }

    fn vertex_texture(&mut self, x: f64, y: f64) {
        self.active()
            .texture
            .append(Point2::new(x as f32, y as f32));
    }

    fn face(&mut self, indexes: &[usize], vertex_count: usize) {
        let last = self.shapes.len() - 1;
        add_face_to_mesh(indexes, vertex_count, &mut self.shapes[last].1);
    }

    fn stop_early(&self) -> bool {
        self.stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SliceCloud, VecCloudSink};
    use std::fs;
    use std::io::Cursor;

    #[test]
    fn encode_decode_cloud() {
        for color_test in [false, true] {
            let mut points = Vec::new();
            let mut colors = Vec::new();
            for i in 0..10u32 {
                colors.push(i * 125);
                let i = i as f64;
                points.push(Point3::new(i * 123.45, i - 1.01, i + 2.34));
            }

            let mut encoded = Vec::new();
            let cloud = SliceCloud {
                points: &points,
                colors: if color_test { Some(&colors) } else { None },
            };
            save_cloud(&cloud, &mut encoded).unwrap();

            let mut found = VecCloudSink::new();
            load_cloud(Cursor::new(encoded), &mut found).unwrap();

            assert_eq!(points.len(), found.points.len());
            for (expected, found) in points.iter().zip(&found.points) {
                assert_eq!(expected, found);
            }
            if color_test {
                assert_eq!(colors, found.colors);
            } else {
                assert!(found.colors.is_empty());
            }
        }
    }

    #[test]
    fn encode_decode_mesh() {
        for color_test in [false, true] {
            let mut mesh = VertexMesh::new();
            for i in 0..10usize {
                mesh.vertexes.append(Point3::new(i as f64, 2.0, 3.0));
                if color_test {
                    mesh.rgb.push(i as u32 * 18);
                }
                for corner in 0..3 {
                    mesh.face_vertexes.push((i * 3 + corner) % 10);
                }
                mesh.face_offsets.push(mesh.face_vertexes.len());
            }

            let mut encoded = Vec::new();
            save_mesh(&mesh, &mut encoded).unwrap();

            let mut found = VertexMesh::new();
            load_mesh(Cursor::new(encoded), &mut found).unwrap();

            assert_eq!(mesh.vertexes.len(), found.vertexes.len());
            assert_eq!(mesh.face_vertexes, found.face_vertexes);
            assert_eq!(mesh.face_offsets, found.face_offsets);
            assert_eq!(mesh.rgb, found.rgb);
            for i in 0..mesh.vertexes.len() {
                assert_eq!(mesh.vertexes.get(i), found.vertexes.get(i));
            }
        }
    }

    #[test]
    fn negative_indexes_reference_from_end() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mut mesh = VertexMesh::new();
        load_mesh(Cursor::new(text.as_bytes()), &mut mesh).unwrap();

        assert_eq!(1, mesh.len());
        assert_eq!(vec![0, 1, 2], mesh.face_vertexes);
    }

    #[test]
    fn face_triplets_fill_attribute_indexes() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
                    vt 0 0\nvt 1 0\nvt 0 1\n\
                    vn 0 0 1\nvn 0 0 1\nvn 0 0 1\n\
                    f 1/1/1 2/2/2 3/3/3\n";
        let mut mesh = VertexMesh::new();
        load_mesh(Cursor::new(text.as_bytes()), &mut mesh).unwrap();

        assert_eq!(1, mesh.len());
        assert_eq!(vec![0, 1, 2], mesh.face_vertexes);
        assert_eq!(vec![0, 1, 2], mesh.face_vertex_textures);
        assert_eq!(vec![0, 1, 2], mesh.face_vertex_normals);
        assert_eq!(3, mesh.texture.len());
        assert_eq!(3, mesh.normals.len());
    }

    /// Bad lines are skipped without aborting the parse
    #[test]
    fn malformed_lines_are_skipped() {
        let text = "v 0 0 0\nv zebra 0 0\nv 1 0 0\nnope 1 2 3\nv 0 1 0\nf 1 2 3\n";
        let mut mesh = VertexMesh::new();
        load_mesh(Cursor::new(text.as_bytes()), &mut mesh).unwrap();

        assert_eq!(3, mesh.vertexes.len());
        assert_eq!(1, mesh.len());
        assert_eq!(vec![0, 1, 2], mesh.face_vertexes);
    }

    #[test]
    fn continuation_lines_are_merged() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 \\\n3\n";
        let mut mesh = VertexMesh::new();
        load_mesh(Cursor::new(text.as_bytes()), &mut mesh).unwrap();

        assert_eq!(1, mesh.len());
        assert_eq!(vec![0, 1, 2], mesh.face_vertexes);
    }

    #[test]
    fn writer_relative_face() {
        let mut encoded = Vec::new();
        let mut obj = ObjTextWriter::new(&mut encoded);
        obj.add_vertex(1.0, 0.0, 0.0).unwrap();
        obj.add_vertex(0.0, 1.0, 0.0).unwrap();
        obj.add_vertex(0.0, 0.0, 1.0).unwrap();
        obj.add_face(None, 0).unwrap();

        let text = String::from_utf8(encoded).unwrap();
        assert!(text.contains("f -3 -2 -1"));

        let mut mesh = VertexMesh::new();
        load_mesh(Cursor::new(text.as_bytes()), &mut mesh).unwrap();
        assert_eq!(vec![0, 1, 2], mesh.face_vertexes);
    }

    #[test]
    fn textured_mesh_writes_material_statements() {
        let mut mesh = VertexMesh::new();
        mesh.texture_name = "images/color.png".to_string();
        mesh.add_face_vectors(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        mesh.add_texture(3, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);

        let mut encoded = Vec::new();
        save_mesh(&mesh, &mut encoded).unwrap();
        let text = String::from_utf8(encoded).unwrap();

        assert!(text.contains("mtllib color.mtl"));
        assert!(text.contains("usemtl color"));
        assert!(text.contains("f 1/1 2/2 3/3"));
    }

    #[test]
    fn mtl_template() {
        let mut encoded = Vec::new();
        save_mtl("stuff/color.png", &mut encoded).unwrap();
        let text = String::from_utf8(encoded).unwrap();

        assert!(text.starts_with("newmtl color\n"));
        assert!(text.contains("map_Kd stuff/color.png"));
    }

    #[test]
    fn load_from_files_with_materials() {
        let obj_file = "test_loader_shape.obj";
        let mtl_file = "test_loader_shape.mtl";

        fs::write(
            mtl_file,
            "newmtl painted\nKd 1.0 1.0 1.0\nmap_Kd painted.png\n",
        )
        .unwrap();
        fs::write(
            obj_file,
            format!(
                "mtllib {mtl_file}\nusemtl painted\n\
                 v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n"
            ),
        )
        .unwrap();

        let mut mesh = VertexMesh::new();
        let ignored = ObjFileLoader::load_single(obj_file, &mut mesh).unwrap();
        assert!(!ignored);
        assert_eq!("painted.png", mesh.texture_name);
        assert_eq!(1, mesh.len());

        let loader = ObjFileLoader::load(obj_file).unwrap();
        assert_eq!(1, loader.shapes().len());
        assert_eq!("painted", loader.shapes()[0].0);

        let _ = fs::remove_file(obj_file);
        let _ = fs::remove_file(mtl_file);
    }

    /// A second material aborts a single-mesh load and flags it
    #[test]
    fn single_load_ignores_second_material() {
        let obj_file = "test_loader_multi.obj";

        fs::write(
            obj_file,
            "usemtl first\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n\
             usemtl second\nv 5 0 0\nv 6 0 0\nv 5 1 0\nf 4 5 6\n",
        )
        .unwrap();

        let mut mesh = VertexMesh::new();
        let ignored = ObjFileLoader::load_single(obj_file, &mut mesh).unwrap();
        assert!(ignored);
        assert_eq!(1, mesh.len());
        assert_eq!(3, mesh.vertexes.len());

        let loader = ObjFileLoader::load(obj_file).unwrap();
        assert_eq!(2, loader.shapes().len());
        assert_eq!("first", loader.shapes()[0].0);
        assert_eq!("second", loader.shapes()[1].0);

        let _ = fs::remove_file(obj_file);
    }
}
