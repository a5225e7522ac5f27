//! PLY codec for point clouds and meshes
//!
//! Supports ASCII and binary encodings in either byte order, with float or
//! double vertex precision on write. Vertices may carry normals and uchar RGB
//! colors; faces are variable-length index lists with optional interleaved
//! texture coordinates. The texture image file name rides along as a
//! `comment TextureFile <name>` header line.
//!
//! Parsing is strict: malformed headers or payloads abort with
//! [`Error::Parse`], unlike the lenient OBJ reader.

use crate::{CloudSink, CloudSource};
use log::warn;
use nalgebra::Point3;
use polyrast_core::{Error, PackedArray, Result, VertexMesh};
use std::io::{Read, Write};

/// Byte order of a binary PLY payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Read access a PLY encoder pulls vertex and face data from
pub trait PlySource {
    fn vertex_count(&self) -> usize;

    fn polygon_count(&self) -> usize;

    fn has_color(&self) -> bool;

    fn is_textured(&self) -> bool;

    fn has_vertex_normals(&self) -> bool;

    fn vertex(&self, which: usize) -> Point3<f64>;

    fn vertex_normal(&self, which: usize) -> Point3<f64>;

    fn color(&self, which: usize) -> u32;

    /// Copies the vertex indexes of a polygon into `output`
    fn indexes(&self, which: usize, output: &mut Vec<usize>);

    /// Copies interleaved (x, y) texture coordinates of a polygon into
    /// `output`, two values per vertex
    fn texture_coords(&self, which: usize, output: &mut Vec<f32>);

    fn texture_name(&self) -> &str {
        ""
    }
}

/// Write access a PLY decoder pushes parsed data into
pub trait PlySink {
    fn initialize(&mut self, vertexes: usize, faces: usize, color: bool);

    fn add_vertex(&mut self, x: f64, y: f64, z: f64, rgb: u32);

    fn add_vertex_normal(&mut self, nx: f64, ny: f64, nz: f64);

    fn add_polygon(&mut self, indexes: &[usize]);

    /// Texture coordinates for the most recently added polygon, `count`
    /// interleaved (x, y) pairs
    fn add_texture(&mut self, count: usize, coordinates: &[f32]);

    fn set_texture_name(&mut self, _name: &str) {}
}

/// Encodes a mesh as ASCII PLY. `colors` adds a uchar RGB property per vertex.
pub fn save_mesh_ascii<W: Write>(
    mesh: &VertexMesh,
    colors: Option<&[u32]>,
    output: &mut W,
) -> Result<()> {
    save_ascii(&MeshPlySource { mesh, colors }, output)
}

/// Encodes a mesh as binary PLY with the requested byte order and precision
pub fn save_mesh_binary<W: Write>(
    mesh: &VertexMesh,
    colors: Option<&[u32]>,
    order: ByteOrder,
    save_as_float: bool,
    output: &mut W,
) -> Result<()> {
    save_binary(&MeshPlySource { mesh, colors }, order, save_as_float, output)
}

/// Encodes a point cloud as ASCII PLY
pub fn save_cloud_ascii<W: Write>(
    cloud: &dyn CloudSource,
    save_rgb: bool,
    output: &mut W,
) -> Result<()> {
    save_ascii(&CloudPlySource { cloud, save_rgb }, output)
}

/// Encodes a point cloud as binary PLY
pub fn save_cloud_binary<W: Write>(
    cloud: &dyn CloudSource,
    order: ByteOrder,
    save_rgb: bool,
    save_as_float: bool,
    output: &mut W,
) -> Result<()> {
    save_binary(&CloudPlySource { cloud, save_rgb }, order, save_as_float, output)
}

/// Decodes a PLY stream into a mesh. Vertex colors land in `mesh.rgb`.
pub fn read_mesh<R: Read>(input: &mut R, mesh: &mut VertexMesh) -> Result<()> {
    read(input, &mut MeshPlySink { mesh, has_color: false })
}

/// Decodes a PLY stream into a point cloud, ignoring any face data
pub fn read_cloud<R: Read>(input: &mut R, output: &mut dyn CloudSink) -> Result<()> {
    read(input, &mut CloudPlySink { output })
}

pub fn save_ascii<W: Write>(data: &dyn PlySource, output: &mut W) -> Result<()> {
    write_header(data, None, output)?;

    let color = data.has_color();

    for i in 0..data.vertex_count() {
        let p = data.vertex(i);
        write!(output, "{} {} {}", p.x, p.y, p.z)?;
        if data.has_vertex_normals() {
            let n = data.vertex_normal(i);
            write!(output, " {} {} {}", n.x, n.y, n.z)?;
        }
        if color {
            let rgb = data.color(i);
            write!(
                output,
                " {} {} {}",
                rgb >> 16 & 0xFF,
                rgb >> 8 & 0xFF,
                rgb & 0xFF
            )?;
        }
        writeln!(output)?;
    }

    let mut indexes = Vec::new();
    let mut coords = Vec::new();
    for i in 0..data.polygon_count() {
        data.indexes(i, &mut indexes);
        write!(output, "{}", indexes.len())?;
        for idx in &indexes {
            write!(output, " {idx}")?;
        }
        writeln!(output)?;

        if !data.is_textured() {
            continue;
        }

        data.texture_coords(i, &mut coords);
        check_coordinate_count(&indexes, &coords)?;
        write!(output, "{}", coords.len())?;
        for value in &coords {
            write!(output, " {value}")?;
        }
        writeln!(output)?;
    }
    output.flush()?;
    Ok(())
}

pub fn save_binary<W: Write>(
    data: &dyn PlySource,
    order: ByteOrder,
    save_as_float: bool,
    output: &mut W,
) -> Result<()> {
    write_header(data, Some((order, save_as_float)), output)?;

    let color = data.has_color();
    let mut buffer = Vec::new();

    for i in 0..data.vertex_count() {
        buffer.clear();
        let p = data.vertex(i);
        put_real(&mut buffer, p.x, save_as_float, order);
        put_real(&mut buffer, p.y, save_as_float, order);
        put_real(&mut buffer, p.z, save_as_float, order);

        if data.has_vertex_normals() {
            let n = data.vertex_normal(i);
            put_real(&mut buffer, n.x, save_as_float, order);
            put_real(&mut buffer, n.y, save_as_float, order);
            put_real(&mut buffer, n.z, save_as_float, order);
        }

        if color {
            let rgb = data.color(i);
            buffer.push((rgb >> 16) as u8);
            buffer.push((rgb >> 8) as u8);
            buffer.push(rgb as u8);
        }
        output.write_all(&buffer)?;
    }

    let mut indexes = Vec::new();
    let mut coords = Vec::new();
    for i in 0..data.polygon_count() {
        data.indexes(i, &mut indexes);
        if indexes.len() > 255 {
            return Err(Error::InvalidData(format!(
                "Face with {} vertexes exceeds the 255 limit of a uchar list",
                indexes.len()
            )));
        }
        buffer.clear();
        buffer.push(indexes.len() as u8);
        for &idx in &indexes {
            put_i32(&mut buffer, idx as i32, order);
        }
        output.write_all(&buffer)?;

        if !data.is_textured() {
            continue;
        }

        data.texture_coords(i, &mut coords);
        check_coordinate_count(&indexes, &coords)?;
        buffer.clear();
        buffer.push(coords.len() as u8);
        for &value in &coords {
            put_f32(&mut buffer, value, order);
        }
        output.write_all(&buffer)?;
    }
    output.flush()?;
    Ok(())
}

/// Decodes a PLY stream, pushing everything parsed into `output`
pub fn read(input: &mut dyn Read, output: &mut dyn PlySink) -> Result<()> {
    let mut header = Header::default();
    read_header(input, &mut header)?;

    let vertex_count = header
        .vertex_count
        .ok_or_else(|| Error::Parse("File is missing vertex count".to_string()))?;
    let format = header
        .format
        .ok_or_else(|| Error::Parse("Format is never specified".to_string()))?;

    output.initialize(vertex_count, header.triangle_count, header.rgb);
    if !header.texture_name.is_empty() {
        let name = header.texture_name.clone();
        output.set_texture_name(&name);
    }

    match format {
        Format::Ascii => read_payload_ascii(output, input, &mut header, vertex_count),
        Format::BinaryLittle => {
            read_payload_binary(output, input, &header, vertex_count, ByteOrder::LittleEndian)
        }
        Format::BinaryBig => {
            read_payload_binary(output, input, &header, vertex_count, ByteOrder::BigEndian)
        }
    }
}

fn check_coordinate_count(indexes: &[usize], coords: &[f32]) -> Result<()> {
    if coords.len() != indexes.len() * 2 {
        return Err(Error::InvalidData(format!(
            "Expected {} texture coordinate values, found {}",
            indexes.len() * 2,
            coords.len()
        )));
    }
    Ok(())
}

/// Writes the header. `binary` selects the binary format line and the real
/// number precision; `None` means ASCII.
fn write_header<W: Write>(
    data: &dyn PlySource,
    binary: Option<(ByteOrder, bool)>,
    output: &mut W,
) -> Result<()> {
    writeln!(output, "ply")?;
    match binary {
        None => writeln!(output, "format ascii 1.0")?,
        Some((ByteOrder::LittleEndian, _)) => writeln!(output, "format binary_little_endian 1.0")?,
        Some((ByteOrder::BigEndian, _)) => writeln!(output, "format binary_big_endian 1.0")?,
    }
    writeln!(output, "comment Created using polyrast")?;
    if !data.texture_name().is_empty() {
        writeln!(output, "comment TextureFile {}", data.texture_name())?;
    }

    let real = match binary {
        Some((_, false)) => "double",
        _ => "float",
    };

    writeln!(output, "element vertex {}", data.vertex_count())?;
    writeln!(output, "property {real} x")?;
    writeln!(output, "property {real} y")?;
    writeln!(output, "property {real} z")?;
    if data.has_vertex_normals() {
        writeln!(output, "property {real} nx")?;
        writeln!(output, "property {real} ny")?;
        writeln!(output, "property {real} nz")?;
    }
    if data.has_color() {
        writeln!(output, "property uchar red")?;
        writeln!(output, "property uchar green")?;
        writeln!(output, "property uchar blue")?;
    }
    if data.polygon_count() > 0 {
        writeln!(output, "element face {}", data.polygon_count())?;
        writeln!(output, "property list uchar int vertex_indices")?;
        if data.is_textured() {
            writeln!(output, "property list uchar float texcoord")?;
        }
    }
    writeln!(output, "end_header")?;
    Ok(())
}

fn read_header(input: &mut dyn Read, header: &mut Header) -> Result<()> {
    let line = read_line(input)?.ok_or_else(|| Error::Parse("Missing first line".to_string()))?;
    if !line.eq_ignore_ascii_case("ply") {
        return Err(Error::Parse("Expected PLY at start of file".to_string()));
    }

    let mut previous_vertex = false;
    loop {
        let line = read_next_line(input, header)?;
        if line == "end_header" {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() < 2 {
            return Err(Error::Parse(format!("Expected more than one word: '{line}'")));
        }

        if words[0] == "format" {
            header.format = Some(match words[1] {
                "ascii" => Format::Ascii,
                "binary_little_endian" => Format::BinaryLittle,
                "binary_big_endian" => Format::BinaryBig,
                _ => return Err(Error::Parse(format!("Unknown format {}", words[1]))),
            });
        } else if words[0] == "element" {
            previous_vertex = false;
            if words.len() < 3 {
                return Err(Error::Parse(format!("Malformed element: '{line}'")));
            }
            let count = words[2]
                .parse::<usize>()
                .map_err(|_| Error::Parse(format!("Bad element count: '{line}'")))?;
            match words[1] {
                "vertex" => {
                    previous_vertex = true;
                    header.vertex_count = Some(count);
                }
                "face" => header.triangle_count = count,
                _ => {}
            }
        } else if words[0] == "property" && words[1] == "list" {
            if words.len() != 5 {
                return Err(Error::Parse(format!(
                    "Unexpected number of words in list property, count={}",
                    words.len()
                )));
            }
            header.properties.push(PropertyList {
                label: words[4].to_string(),
                count_type: DataType::parse(words[2])?,
                value_type: DataType::parse(words[3])?,
            });
        } else if words[0] == "property" && previous_vertex {
            if words.len() < 3 {
                return Err(Error::Parse(format!("Malformed property: '{line}'")));
            }
            let data = DataType::parse(words[1])?;
            let var = match words[2].to_ascii_lowercase().as_str() {
                "x" => VarType::X,
                "y" => VarType::Y,
                "z" => VarType::Z,
                "nx" => VarType::Nx,
                "ny" => VarType::Ny,
                "nz" => VarType::Nz,
                "red" => VarType::R,
                "green" => VarType::G,
                "blue" => VarType::B,
                _ => VarType::Unknown,
            };
            header.data_words.push(DataWord { var, data });
        } else {
            return Err(Error::Parse(format!("Unknown header element: '{line}'")));
        }
    }

    for word in &header.data_words {
        match word.var {
            VarType::R | VarType::G | VarType::B => header.rgb = true,
            VarType::Nx | VarType::Ny | VarType::Nz => header.normals = true,
            _ => {}
        }
    }
    Ok(())
}

fn read_payload_ascii(
    output: &mut dyn PlySink,
    input: &mut dyn Read,
    header: &mut Header,
    vertex_count: usize,
) -> Result<()> {
    let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
    let (mut nx, mut ny, mut nz) = (0.0, 0.0, 0.0);
    let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);

    for _ in 0..vertex_count {
        let line = read_next_line(input, header)?;
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() != header.data_words.len() {
            return Err(Error::Parse(format!("Unexpected number of words: '{line}'")));
        }

        let mut real = 0.0;
        let mut integer = 0i64;
        for (word, d) in words.iter().zip(&header.data_words) {
            match d.data {
                DataType::Float | DataType::Double => {
                    real = word
                        .parse::<f64>()
                        .map_err(|_| Error::Parse(format!("Bad real number '{word}'")))?;
                }
                _ => {
                    integer = word
                        .parse::<i64>()
                        .map_err(|_| Error::Parse(format!("Bad integer '{word}'")))?;
                }
            }
            match d.var {
                VarType::X => x = real,
                VarType::Y => y = real,
                VarType::Z => z = real,
                VarType::Nx => nx = real,
                VarType::Ny => ny = real,
                VarType::Nz => nz = real,
                VarType::R => r = integer as u32,
                VarType::G => g = integer as u32,
                VarType::B => b = integer as u32,
                VarType::Unknown => {}
            }
        }

        output.add_vertex(x, y, z, r << 16 | g << 8 | b);
        if header.normals {
            output.add_vertex_normal(nx, ny, nz);
        }
    }

    let properties = header.properties.clone();
    let mut indexes = Vec::new();
    let mut coords = Vec::new();
    for _ in 0..header.triangle_count {
        for property in &properties {
            let line = read_next_line(input, header)?;
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                return Err(Error::Parse("Empty list property line".to_string()));
            }
            let count = words[0]
                .parse::<usize>()
                .map_err(|_| Error::Parse(format!("Bad list count '{}'", words[0])))?;
            if words.len() != count + 1 {
                return Err(Error::Parse(format!("Unexpected number of words: '{line}'")));
            }

            match property.label.as_str() {
                "vertex_indices" => {
                    indexes.clear();
                    for word in &words[1..] {
                        let index = word
                            .parse::<usize>()
                            .map_err(|_| Error::Parse(format!("Bad vertex index '{word}'")))?;
                        if index > vertex_count {
                            return Err(Error::Parse(format!("Vertex index out of range: {index}")));
                        }
                        indexes.push(index);
                    }
                    output.add_polygon(&indexes);
                }
                "texcoord" => {
                    coords.clear();
                    for word in &words[1..] {
                        coords.push(
                            word.parse::<f32>()
                                .map_err(|_| Error::Parse(format!("Bad coordinate '{word}'")))?,
                        );
                    }
                    output.add_texture(count / 2, &coords);
                }
                _ => warn!("Unknown list property '{}'", property.label),
            }
        }
    }
    Ok(())
}

fn read_payload_binary(
    output: &mut dyn PlySink,
    input: &mut dyn Read,
    header: &Header,
    vertex_count: usize,
    order: ByteOrder,
) -> Result<()> {
    let vertex_bytes: usize = header.data_words.iter().map(|w| w.data.size()).sum();

    // big enough for one vertex or a 255 element list of any supported type
    let mut line = vec![0u8; vertex_bytes.max(255 * 8)];

    let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
    let (mut nx, mut ny, mut nz) = (0.0, 0.0, 0.0);
    let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);

    for _ in 0..vertex_count {
        input.read_exact(&mut line[..vertex_bytes])?;

        let mut location = 0;
        let mut real = 0.0;
        let mut integer = 0i64;
        for d in &header.data_words {
            let bytes = &line[location..location + d.data.size()];
            match d.data {
                DataType::Float => real = get_f32(bytes, order) as f64,
                DataType::Double => real = get_f64(bytes, order),
                DataType::Char => integer = bytes[0] as i8 as i64,
                DataType::Uchar => integer = bytes[0] as i64,
                DataType::Short => integer = get_i16(bytes, order) as i64,
                DataType::Ushort => integer = get_i16(bytes, order) as u16 as i64,
                DataType::Int | DataType::Uint => integer = get_i32(bytes, order) as i64,
            }
            location += d.data.size();
            match d.var {
                VarType::X => x = real,
                VarType::Y => y = real,
                VarType::Z => z = real,
                VarType::Nx => nx = real,
                VarType::Ny => ny = real,
                VarType::Nz => nz = real,
                VarType::R => r = integer as u32,
                VarType::G => g = integer as u32,
                VarType::B => b = integer as u32,
                VarType::Unknown => {}
            }
        }

        output.add_vertex(x, y, z, r << 16 | g << 8 | b);
        if header.normals {
            output.add_vertex_normal(nx, ny, nz);
        }
    }

    for _ in 0..header.triangle_count {
        for property in &header.properties {
            if property.count_type != DataType::Uchar {
                return Err(Error::Parse(format!(
                    "Expected unsigned byte for count type, not {:?}",
                    property.count_type
                )));
            }
            match property.label.as_str() {
                "vertex_indices" => read_polygon(input, order, &mut line, vertex_count, output)?,
                "texcoord" => {
                    read_texture_coords(input, property.value_type, order, &mut line, output)?
                }
                _ => warn!("Unknown list property '{}'", property.label),
            }
        }
    }
    Ok(())
}

fn read_polygon(
    input: &mut dyn Read,
    order: ByteOrder,
    line: &mut [u8],
    vertex_count: usize,
    output: &mut dyn PlySink,
) -> Result<()> {
    input.read_exact(&mut line[..1])?;
    let count = line[0] as usize;
    input.read_exact(&mut line[..count * 4])?;

    let mut indexes = Vec::with_capacity(count);
    for word in 0..count {
        let index = get_i32(&line[word * 4..word * 4 + 4], order);
        if index < 0 || index as usize > vertex_count {
            return Err(Error::Parse(format!("Vertex index out of range: {index}")));
        }
        indexes.push(index as usize);
    }
    output.add_polygon(&indexes);
    Ok(())
}

fn read_texture_coords(
    input: &mut dyn Read,
    value_type: DataType,
    order: ByteOrder,
    line: &mut [u8],
    output: &mut dyn PlySink,
) -> Result<()> {
    if value_type != DataType::Float {
        return Err(Error::Parse(format!(
            "Expected float texture coordinates, not {value_type:?}"
        )));
    }
    input.read_exact(&mut line[..1])?;
    let count = line[0] as usize;
    input.read_exact(&mut line[..count * 4])?;

    let mut coords = Vec::with_capacity(count);
    for word in 0..count {
        coords.push(get_f32(&line[word * 4..word * 4 + 4], order));
    }
    output.add_texture(count / 2, &coords);
    Ok(())
}

/// Reads one `\n` terminated line, dropping any `\r`. `None` at end of stream.
fn read_line(input: &mut dyn Read) -> Result<Option<String>> {
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        if input.read(&mut byte)? == 0 {
            if bytes.is_empty() {
                return Ok(None);
            }
            break;
        }
        if byte[0] == b'\n' {
            break;
        }
        if byte[0] != b'\r' {
            bytes.push(byte[0]);
        }
    }
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| Error::Parse("Line is not valid UTF-8".to_string()))
}

/// Next non-comment line. Comment lines are skipped but a
/// `comment TextureFile <name>` is captured into the header.
fn read_next_line(input: &mut dyn Read, header: &mut Header) -> Result<String> {
    loop {
        let line = read_line(input)?
            .ok_or_else(|| Error::Parse("Unexpected end of file".to_string()))?;
        if let Some(rest) = line.strip_prefix("comment") {
            if let Some(name) = rest.trim().strip_prefix("TextureFile") {
                header.texture_name = name.trim().to_string();
            }
            continue;
        }
        return Ok(line);
    }
}

fn put_real(buffer: &mut Vec<u8>, value: f64, as_float: bool, order: ByteOrder) {
    match (as_float, order) {
        (true, ByteOrder::LittleEndian) => buffer.extend_from_slice(&(value as f32).to_le_bytes()),
        (true, ByteOrder::BigEndian) => buffer.extend_from_slice(&(value as f32).to_be_bytes()),
        (false, ByteOrder::LittleEndian) => buffer.extend_from_slice(&value.to_le_bytes()),
        (false, ByteOrder::BigEndian) => buffer.extend_from_slice(&value.to_be_bytes()),
    }
}

fn put_f32(buffer: &mut Vec<u8>, value: f32, order: ByteOrder) {
    match order {
        ByteOrder::LittleEndian => buffer.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => buffer.extend_from_slice(&value.to_be_bytes()),
    }
}

fn put_i32(buffer: &mut Vec<u8>, value: i32, order: ByteOrder) {
    match order {
        ByteOrder::LittleEndian => buffer.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => buffer.extend_from_slice(&value.to_be_bytes()),
    }
}

fn get_f32(bytes: &[u8], order: ByteOrder) -> f32 {
    let mut array = [0u8; 4];
    array.copy_from_slice(&bytes[..4]);
    match order {
        ByteOrder::LittleEndian => f32::from_le_bytes(array),
        ByteOrder::BigEndian => f32::from_be_bytes(array),
    }
}

fn get_f64(bytes: &[u8], order: ByteOrder) -> f64 {
    let mut array = [0u8; 8];
    array.copy_from_slice(&bytes[..8]);
    match order {
        ByteOrder::LittleEndian => f64::from_le_bytes(array),
        ByteOrder::BigEndian => f64::from_be_bytes(array),
    }
}

fn get_i16(bytes: &[u8], order: ByteOrder) -> i16 {
    let mut array = [0u8; 2];
    array.copy_from_slice(&bytes[..2]);
    match order {
        ByteOrder::LittleEndian => i16::from_le_bytes(array),
        ByteOrder::BigEndian => i16::from_be_bytes(array),
    }
}

fn get_i32(bytes: &[u8], order: ByteOrder) -> i32 {
    let mut array = [0u8; 4];
    array.copy_from_slice(&bytes[..4]);
    match order {
        ByteOrder::LittleEndian => i32::from_le_bytes(array),
        ByteOrder::BigEndian => i32::from_be_bytes(array),
    }
}

#[derive(Debug, Default)]
struct Header {
    data_words: Vec<DataWord>,
    vertex_count: Option<usize>,
    triangle_count: usize,
    rgb: bool,
    normals: bool,
    properties: Vec<PropertyList>,
    format: Option<Format>,
    texture_name: String,
}

#[derive(Debug, Clone)]
struct PropertyList {
    label: String,
    count_type: DataType,
    value_type: DataType,
}

#[derive(Debug, Clone, Copy)]
struct DataWord {
    var: VarType,
    data: DataType,
}

#[derive(Debug, Clone, Copy)]
enum VarType {
    X,
    Y,
    Z,
    Nx,
    Ny,
    Nz,
    R,
    G,
    B,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataType {
    Float,
    Double,
    Char,
    Short,
    Int,
    Uchar,
    Ushort,
    Uint,
}

impl DataType {
    fn parse(word: &str) -> Result<Self> {
        Ok(match word.to_ascii_lowercase().as_str() {
            "float" => DataType::Float,
            "double" => DataType::Double,
            "char" => DataType::Char,
            "short" => DataType::Short,
            "int" => DataType::Int,
            "uchar" => DataType::Uchar,
            "ushort" => DataType::Ushort,
            "uint" => DataType::Uint,
            _ => return Err(Error::Parse(format!("Unsupported data type '{word}'"))),
        })
    }

    fn size(&self) -> usize {
        match self {
            DataType::Char | DataType::Uchar => 1,
            DataType::Short | DataType::Ushort => 2,
            DataType::Float | DataType::Int | DataType::Uint => 4,
            DataType::Double => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Ascii,
    BinaryLittle,
    BinaryBig,
}

struct MeshPlySource<'a> {
    mesh: &'a VertexMesh,
    colors: Option<&'a [u32]>,
}

impl PlySource for MeshPlySource<'_> {
    fn vertex_count(&self) -> usize {
        self.mesh.vertexes.len()
    }

    fn polygon_count(&self) -> usize {
        self.mesh.len()
    }

    fn has_color(&self) -> bool {
        self.colors.is_some()
    }

    fn is_textured(&self) -> bool {
        self.mesh.is_textured()
    }

    fn has_vertex_normals(&self) -> bool {
        // the normal pool is per-vertex only when the counts line up
        self.mesh.has_normals() && self.mesh.normals.len() == self.mesh.vertexes.len()
    }

    fn vertex(&self, which: usize) -> Point3<f64> {
        self.mesh.vertexes.get(which)
    }

    fn vertex_normal(&self, which: usize) -> Point3<f64> {
        let n = self.mesh.normals.get(which);
        Point3::new(n.x as f64, n.y as f64, n.z as f64)
    }

    fn color(&self, which: usize) -> u32 {
        match self.colors {
            Some(colors) => colors[which],
            None => 0,
        }
    }

    fn indexes(&self, which: usize, output: &mut Vec<usize>) {
        let idx0 = self.mesh.face_offsets[which];
        let idx1 = self.mesh.face_offsets[which + 1];
        output.clear();
        output.extend_from_slice(&self.mesh.face_vertexes[idx0..idx1]);
    }

    fn texture_coords(&self, which: usize, output: &mut Vec<f32>) {
        let idx0 = self.mesh.face_offsets[which];
        let idx1 = self.mesh.face_offsets[which + 1];
        output.clear();
        for i in idx0..idx1 {
            let p = self.mesh.texture.get(i);
            output.push(p.x);
            output.push(p.y);
        }
    }

    fn texture_name(&self) -> &str {
        &self.mesh.texture_name
    }
}

struct CloudPlySource<'a> {
    cloud: &'a dyn CloudSource,
    save_rgb: bool,
}

impl PlySource for CloudPlySource<'_> {
    fn vertex_count(&self) -> usize {
        self.cloud.len()
    }

    fn polygon_count(&self) -> usize {
        0
    }

    fn has_color(&self) -> bool {
        self.save_rgb
    }

    fn is_textured(&self) -> bool {
        false
    }

    fn has_vertex_normals(&self) -> bool {
        false
    }

    fn vertex(&self, which: usize) -> Point3<f64> {
        self.cloud.position(which)
    }

    fn vertex_normal(&self, _which: usize) -> Point3<f64> {
        Point3::origin()
    }

    fn color(&self, which: usize) -> u32 {
        self.cloud.rgb(which)
    }

    fn indexes(&self, _which: usize, output: &mut Vec<usize>) {
        output.clear();
    }

    fn texture_coords(&self, _which: usize, output: &mut Vec<f32>) {
        output.clear();
    }
}

struct MeshPlySink<'a> {
    mesh: &'a mut VertexMesh,
    has_color: bool,
}

impl PlySink for MeshPlySink<'_> {
    fn initialize(&mut self, vertexes: usize, faces: usize, color: bool) {
        self.mesh.reset();
        self.mesh.vertexes.reserve(vertexes);
        self.mesh.face_vertexes.reserve(faces * 3);
        self.has_color = color;
    }

    fn add_vertex(&mut self, x: f64, y: f64, z: f64, rgb: u32) {
        self.mesh.vertexes.append(Point3::new(x, y, z));
        if self.has_color {
            self.mesh.rgb.push(rgb);
        }
    }

    fn add_vertex_normal(&mut self, nx: f64, ny: f64, nz: f64) {
        self.mesh
            .normals
            .append(Point3::new(nx as f32, ny as f32, nz as f32));
    }

    fn add_polygon(&mut self, indexes: &[usize]) {
        self.mesh
            .face_offsets
            .push(self.mesh.face_vertexes.len() + indexes.len());
        self.mesh.face_vertexes.extend_from_slice(indexes);
    }

    fn add_texture(&mut self, count: usize, coordinates: &[f32]) {
        self.mesh.add_texture(count, coordinates);
    }

    fn set_texture_name(&mut self, name: &str) {
        self.mesh.texture_name = name.to_string();
    }
}

struct CloudPlySink<'a> {
    output: &'a mut dyn CloudSink,
}

impl PlySink for CloudPlySink<'_> {
    fn initialize(&mut self, vertexes: usize, _faces: usize, color: bool) {
        self.output.initialize(vertexes, color);
    }

    fn add_vertex(&mut self, x: f64, y: f64, z: f64, rgb: u32) {
        self.output.add(Point3::new(x, y, z), rgb);
    }

    fn add_vertex_normal(&mut self, _nx: f64, _ny: f64, _nz: f64) {}

    fn add_polygon(&mut self, _indexes: &[usize]) {}

    fn add_texture(&mut self, _count: usize, _coordinates: &[f32]) {}
}
