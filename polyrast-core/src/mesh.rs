//! Polygonal mesh data model built on packed arrays

use crate::packed::{PackedArray, PackedBlockVec, PackedVec};
use nalgebra::{Point2, Point3, Vector3};

/// A 3D mesh of convex polygonal faces.
///
/// Block-allocated packed arrays are used for vertex data since a mesh can
/// contain a very large number of points. Faces are stored as a flat index
/// list plus an offset table: face `i` occupies
/// `face_vertexes[face_offsets[i]..face_offsets[i + 1]]`.
///
/// Face indexes are not validated when appended; an out-of-range index is a
/// caller defect that surfaces when the index is dereferenced.
#[derive(Debug, Clone)]
pub struct VertexMesh {
    /// 3D location of each vertex
    pub vertexes: PackedBlockVec<Point3<f64>>,

    /// 2D texture coordinates as a fraction of width/height, 0.0 to 1.0.
    /// One per face-vertex instance, indexed in parallel with `face_vertexes`.
    pub texture: PackedBlockVec<Point2<f32>>,

    /// Normal vector pool, referenced by `face_normals` and
    /// `face_vertex_normals`
    pub normals: PackedVec<Point3<f32>>,

    /// Optional per-vertex color in 0xRRGGBB format
    pub rgb: Vec<u32>,

    /// Flat list of vertex indexes, one run per face
    pub face_vertexes: Vec<usize>,

    /// Index into `normals` for each face
    pub face_normals: Vec<usize>,

    /// Start index of each face plus the end of the last face
    pub face_offsets: Vec<usize>,

    /// Texture coordinate index for each face-vertex instance
    pub face_vertex_textures: Vec<usize>,

    /// Normal index for each face-vertex instance
    pub face_vertex_normals: Vec<usize>,

    /// Name of the texture image file associated with this mesh
    pub texture_name: String,
}

impl VertexMesh {
    pub fn new() -> Self {
        Self {
            vertexes: PackedBlockVec::new(),
            texture: PackedBlockVec::new(),
            normals: PackedVec::new(),
            rgb: Vec::new(),
            face_vertexes: Vec::new(),
            face_normals: Vec::new(),
            face_offsets: vec![0],
            face_vertex_textures: Vec::new(),
            face_vertex_normals: Vec::new(),
            texture_name: String::new(),
        }
    }

    /// Number of faces in the mesh
    pub fn len(&self) -> usize {
        self.face_offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of vertexes in the specified face
    pub fn face_size(&self, which: usize) -> usize {
        self.face_offsets[which + 1] - self.face_offsets[which]
    }

    /// Copies the vertex referenced by face-vertex instance `which`
    pub fn shape_vertex(&self, which: usize) -> Point3<f64> {
        self.vertexes.get(self.face_vertexes[which])
    }

    /// Copies the vertexes of a face into `output`
    pub fn face_vectors(&self, which: usize, output: &mut Vec<Point3<f64>>) {
        let idx0 = self.face_offsets[which];
        let idx1 = self.face_offsets[which + 1];

        output.clear();
        output.reserve(idx1 - idx0);
        for i in idx0..idx1 {
            output.push(self.vertexes.get(self.face_vertexes[i]));
        }
    }

    /// Adds a new face. Its vertexes are appended to the vertex pool and a
    /// fresh index run referencing them is created.
    pub fn add_face_vectors(&mut self, shape: &[Point3<f64>]) {
        let idx0 = self.vertexes.len();
        for i in 0..shape.len() {
            self.face_vertexes.push(idx0 + i);
        }
        self.face_offsets.push(idx0 + shape.len());
        self.vertexes.append_all(shape);
    }

    /// Copies the texture coordinates of a face into `output`
    pub fn texture_coords(&self, which: usize, output: &mut Vec<Point2<f32>>) {
        let idx0 = self.face_offsets[which];
        let idx1 = self.face_offsets[which + 1];

        output.clear();
        output.reserve(idx1 - idx0);
        for i in idx0..idx1 {
            output.push(self.texture.get(i));
        }
    }

    /// Appends texture coordinates onto the end of the texture array. The
    /// offset table is not touched; the caller must keep the coordinate count
    /// in sync with the face-vertex count.
    ///
    /// `coordinates` is interleaved `[x0, y0, x1, y1, ...]` with `count`
    /// points.
    pub fn add_texture(&mut self, count: usize, coordinates: &[f32]) {
        for i in 0..count {
            self.texture
                .append(Point2::new(coordinates[i * 2], coordinates[i * 2 + 1]));
        }
    }

    /// Copies the normal of the specified face
    pub fn face_normal(&self, face: usize) -> Point3<f32> {
        self.normals.get(self.face_normals[face])
    }

    pub fn is_textured(&self) -> bool {
        !self.texture.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_face_normals(&self) -> bool {
        !self.face_normals.is_empty()
    }

    /// Derives one normal per face from its first three vertexes via the
    /// cross product. The mesh winding must be consistent with a right-handed
    /// +z-forward camera convention. Only correct for planar convex faces.
    pub fn compute_face_normals(&mut self) {
        self.face_normals.clear();
        self.face_normals.reserve(self.len());

        for face in 0..self.len() {
            let idx0 = self.face_offsets[face];

            let v1 = self.points_to_vector(idx0, idx0 + 1);
            let v2 = self.points_to_vector(idx0 + 1, idx0 + 2);
            let norm = v1.cross(&v2).normalize();

            self.face_normals.push(self.normals.len());
            self.normals
                .append(Point3::new(norm.x as f32, norm.y as f32, norm.z as f32));
        }
    }

    fn points_to_vector(&self, idx_a: usize, idx_b: usize) -> Vector3<f64> {
        let a = self.vertexes.get(self.face_vertexes[idx_a]);
        let b = self.vertexes.get(self.face_vertexes[idx_b]);
        b - a
    }

    /// Makes this mesh identical in value to `src`
    pub fn set_to(&mut self, src: &Self) {
        self.vertexes.set_to(&src.vertexes);
        self.texture.set_to(&src.texture);
        self.normals.set_to(&src.normals);
        self.rgb.clone_from(&src.rgb);
        self.face_vertexes.clone_from(&src.face_vertexes);
        self.face_normals.clone_from(&src.face_normals);
        self.face_offsets.clone_from(&src.face_offsets);
        self.face_vertex_textures.clone_from(&src.face_vertex_textures);
        self.face_vertex_normals.clone_from(&src.face_vertex_normals);
        self.texture_name.clone_from(&src.texture_name);
    }

    /// Clears all arrays and reinitializes the offset table
    pub fn reset(&mut self) {
        self.vertexes.reset();
        self.texture.reset();
        self.normals.reset();
        self.rgb.clear();
        self.face_vertexes.clear();
        self.face_normals.clear();
        self.face_offsets.clear();
        self.face_offsets.push(0);
        self.face_vertex_textures.clear();
        self.face_vertex_normals.clear();
        self.texture_name.clear();
    }
}

impl Default for VertexMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only polygon iteration for consumers that need only untextured
/// geometric access to a mesh.
pub trait MeshPolygonAccess {
    /// Number of polygons
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the vertexes of polygon `which` into `output`
    fn polygon(&self, which: usize, output: &mut Vec<Point3<f64>>);
}

impl MeshPolygonAccess for VertexMesh {
    fn len(&self) -> usize {
        VertexMesh::len(self)
    }

    fn polygon(&self, which: usize, output: &mut Vec<Point3<f64>>) {
        self.face_vectors(which, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn random_shape(rng: &mut StdRng, count: usize) -> Vec<Point3<f64>> {
        (0..count)
            .map(|_| Point3::new(rng.gen(), rng.gen(), rng.gen()))
            .collect()
    }

    #[test]
    fn add_face_vectors() {
        let mut rng = StdRng::seed_from_u64(456);
        let shape_a = random_shape(&mut rng, 3);
        let shape_b = random_shape(&mut rng, 4);

        let mut mesh = VertexMesh::new();
        mesh.add_face_vectors(&shape_a);
        mesh.add_face_vectors(&shape_b);

        assert_eq!(2, mesh.len());
        assert_eq!(shape_a.len() + shape_b.len(), mesh.vertexes.len());
        assert_eq!(mesh.vertexes.len(), mesh.face_vertexes.len());

        let mut found = Vec::new();
        mesh.face_vectors(0, &mut found);
        assert_eq!(shape_a, found);
        mesh.face_vectors(1, &mut found);
        assert_eq!(shape_b, found);
    }

    #[test]
    fn offset_table_invariants() {
        let mut rng = StdRng::seed_from_u64(567);
        let mut mesh = VertexMesh::new();
        for size in [3, 5, 4, 3] {
            mesh.add_face_vectors(&random_shape(&mut rng, size));
        }

        assert_eq!(mesh.len() + 1, mesh.face_offsets.len());
        assert_eq!(0, mesh.face_offsets[0]);
        for w in mesh.face_offsets.windows(2) {
            assert!(w[0] <= w[1]);
        }
        assert_eq!(
            mesh.face_vertexes.len(),
            *mesh.face_offsets.last().unwrap()
        );
        assert_eq!(5, mesh.face_size(1));
    }

    #[test]
    fn get_texture_per_face() {
        let mut rng = StdRng::seed_from_u64(678);
        let mut mesh = VertexMesh::new();
        mesh.add_face_vectors(&random_shape(&mut rng, 3));
        mesh.add_face_vectors(&random_shape(&mut rng, 4));
        mesh.add_face_vectors(&random_shape(&mut rng, 5));

        mesh.add_texture(3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        mesh.add_texture(4, &[0.0; 12]);
        mesh.add_texture(5, &[0.0; 10]);

        let mut found = Vec::new();
        mesh.texture_coords(0, &mut found);
        assert_eq!(3, found.len());
        assert_eq!(Point2::new(1.0, 2.0), found[0]);
        assert_eq!(Point2::new(3.0, 4.0), found[1]);
        assert_eq!(Point2::new(5.0, 6.0), found[2]);
        mesh.texture_coords(1, &mut found);
        assert_eq!(4, found.len());
        mesh.texture_coords(2, &mut found);
        assert_eq!(5, found.len());
    }

    #[test]
    fn compute_face_normals_winding() {
        let shape = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let reversed: Vec<_> = shape.iter().rev().copied().collect();

        let mut mesh = VertexMesh::new();
        mesh.add_face_vectors(&shape);
        mesh.add_face_vectors(&reversed);
        mesh.compute_face_normals();

        let n0 = mesh.face_normal(0);
        let n1 = mesh.face_normal(1);
        assert_relative_eq!(n0.z, -1.0, epsilon = 1e-6);
        assert_relative_eq!(n1.z, 1.0, epsilon = 1e-6);
        assert_relative_eq!(n0.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(n0.y, 0.0, epsilon = 1e-6);

        // a non-triangle face uses only its first three vertexes
        let quad = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(2.0, 9.0, 0.0),
        ];
        mesh.reset();
        mesh.add_face_vectors(&quad);
        mesh.compute_face_normals();
        assert_relative_eq!(mesh.face_normal(0).z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn set_to_and_reset() {
        let mut rng = StdRng::seed_from_u64(789);
        let mut mesh = VertexMesh::new();
        mesh.add_face_vectors(&random_shape(&mut rng, 4));
        mesh.add_texture(4, &[0.5; 8]);
        mesh.rgb.extend([1, 2, 3, 4]);
        mesh.texture_name = "color.png".to_string();
        mesh.compute_face_normals();

        let mut copy = VertexMesh::new();
        copy.set_to(&mesh);

        assert_eq!(mesh.len(), copy.len());
        assert_eq!(mesh.face_offsets, copy.face_offsets);
        assert_eq!(mesh.face_vertexes, copy.face_vertexes);
        assert_eq!(mesh.rgb, copy.rgb);
        assert_eq!(mesh.texture_name, copy.texture_name);
        for i in 0..mesh.vertexes.len() {
            assert_eq!(mesh.vertexes.get(i), copy.vertexes.get(i));
        }

        copy.reset();
        assert_eq!(0, copy.len());
        assert_eq!(vec![0], copy.face_offsets);
        assert!(copy.texture_name.is_empty());
        assert!(copy.vertexes.is_empty());
    }

    #[test]
    fn polygon_access_wraps_mesh() {
        let mut rng = StdRng::seed_from_u64(890);
        let shape = random_shape(&mut rng, 3);

        let mut mesh = VertexMesh::new();
        mesh.add_face_vectors(&shape);

        let access: &dyn MeshPolygonAccess = &mesh;
        assert_eq!(1, access.len());
        let mut found = Vec::new();
        access.polygon(0, &mut found);
        assert_eq!(shape, found);
    }
}
