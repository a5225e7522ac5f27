//! Reading and writing point clouds and meshes
//!
//! Supports PLY (ASCII and binary, either endian) and Wavefront OBJ with its
//! MTL material files. Codecs speak to the rest of the library through small
//! capability traits so they never depend on one concrete container: clouds
//! move through [`CloudSource`]/[`CloudSink`] and meshes through adapters
//! around [`polyrast_core::VertexMesh`].

pub mod obj;
pub mod ply;

use nalgebra::Point3;
use polyrast_core::{Error, PackedArray, Result, VertexMesh};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read access to an ordered set of 3D points with optional per-point color
pub trait CloudSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_color(&self) -> bool;

    fn position(&self, index: usize) -> Point3<f64>;

    /// Color of the point in 0xRRGGBB. Only meaningful when
    /// [`has_color`](Self::has_color) is true.
    fn rgb(&self, index: usize) -> u32;
}

/// Write access for codecs producing a point cloud
pub trait CloudSink {
    /// Called once before any points are added. `count` is an estimate and
    /// may be zero when the format doesn't declare one up front.
    fn initialize(&mut self, count: usize, has_color: bool);

    fn add(&mut self, position: Point3<f64>, rgb: u32);
}

/// Borrowed-slice cloud
pub struct SliceCloud<'a> {
    pub points: &'a [Point3<f64>],
    pub colors: Option<&'a [u32]>,
}

impl CloudSource for SliceCloud<'_> {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn has_color(&self) -> bool {
        self.colors.is_some()
    }

    fn position(&self, index: usize) -> Point3<f64> {
        self.points[index]
    }

    fn rgb(&self, index: usize) -> u32 {
        match self.colors {
            Some(colors) => colors[index],
            None => 0,
        }
    }
}

/// Owning cloud container that codecs can decode into
#[derive(Debug, Clone, Default)]
pub struct VecCloudSink {
    pub points: Vec<Point3<f64>>,
    pub colors: Vec<u32>,
    has_color: bool,
}

impl VecCloudSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CloudSink for VecCloudSink {
    fn initialize(&mut self, count: usize, has_color: bool) {
        self.points.clear();
        self.colors.clear();
        self.points.reserve(count);
        if has_color {
            self.colors.reserve(count);
        }
        self.has_color = has_color;
    }

    fn add(&mut self, position: Point3<f64>, rgb: u32) {
        self.points.push(position);
        if self.has_color {
            self.colors.push(rgb);
        }
    }
}

impl CloudSource for VecCloudSink {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn has_color(&self) -> bool {
        self.has_color
    }

    fn position(&self, index: usize) -> Point3<f64> {
        self.points[index]
    }

    fn rgb(&self, index: usize) -> u32 {
        if self.has_color {
            self.colors[index]
        } else {
            0
        }
    }
}

/// Cloud view over a packed point array
pub struct PackedCloud<'a, A: PackedArray<Point3<f64>>> {
    pub points: &'a A,
    pub colors: Option<&'a [u32]>,
}

impl<A: PackedArray<Point3<f64>>> CloudSource for PackedCloud<'_, A> {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn has_color(&self) -> bool {
        self.colors.is_some()
    }

    fn position(&self, index: usize) -> Point3<f64> {
        self.points.get(index)
    }

    fn rgb(&self, index: usize) -> u32 {
        match self.colors {
            Some(colors) => colors[index],
            None => 0,
        }
    }
}

/// Auto-detect the format from the file extension and read a point cloud
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<VecCloudSink> {
    let path = path.as_ref();
    let mut cloud = VecCloudSink::new();
    match extension(path).as_deref() {
        Some("ply") => {
            let mut input = BufReader::new(File::open(path)?);
            ply::read_cloud(&mut input, &mut cloud)?;
        }
        Some("obj") => {
            let input = BufReader::new(File::open(path)?);
            obj::load_cloud(input, &mut cloud)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!(
                "Unsupported point cloud format: {:?}",
                path.extension()
            )))
        }
    }
    Ok(cloud)
}

/// Auto-detect the format from the file extension and read a mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<VertexMesh> {
    let path = path.as_ref();
    let mut mesh = VertexMesh::new();
    match extension(path).as_deref() {
        Some("ply") => {
            let mut input = BufReader::new(File::open(path)?);
            ply::read_mesh(&mut input, &mut mesh)?;
        }
        Some("obj") => {
            obj::ObjFileLoader::load_single(path, &mut mesh)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!(
                "Unsupported mesh format: {:?}",
                path.extension()
            )))
        }
    }
    Ok(mesh)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}
