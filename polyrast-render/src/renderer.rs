//! Mesh rasterizer producing a depth image and a color image

use crate::camera::CameraModel;
use crate::image::{ImageF32, ImageRgb8};
use log::debug;
use nalgebra::{Isometry3, Point2, Point3, Vector3};
use polyrast_core::{Error, PackedArray, Result, VertexMesh};

/// Axis-aligned integer rectangle with exclusive upper bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RectI32 {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

/// Renders a 3D mesh into a depth image and a color image.
///
/// The rendering engine is basic by design and makes the following
/// assumptions: every face is convex, has a single color unless texture
/// mapped, and all colors are opaque. Configure the camera and
/// [`world_to_view`](Self::world_to_view) before calling
/// [`render`](Self::render); each call reinitializes both output images.
///
/// Not reentrant: scratch buffers are reused across faces and across calls.
pub struct MeshRenderer {
    /// Color that background pixels are set to, in 0xRRGGBB. Default white.
    pub default_color_rgb: u32,

    /// Transform from world (what the mesh is in) to the camera view
    pub world_to_view: Isometry3<f64>,

    /// If true a face is only rendered when its normal points towards the
    /// camera
    pub check_face_normal: bool,

    /// If true the per-face color function is always used, even when texture
    /// information is available
    pub force_surface_color: bool,

    /// Returns the color of a face given its index. Default is red.
    surface_color: Box<dyn Fn(usize) -> u32>,

    depth_image: ImageF32,
    rgb_image: ImageRgb8,
    texture_image: ImageRgb8,

    camera: Option<Box<dyn CameraModel>>,
    resolution: (usize, usize),
    rendered_count: usize,

    // scratch buffers reused across faces and across calls
    mesh_cam: Vec<Point3<f64>>,
    polygon_proj: Vec<Point2<f64>>,
    polygon_tex: Vec<Point2<f32>>,
}

impl Default for MeshRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshRenderer {
    pub fn new() -> Self {
        Self {
            default_color_rgb: 0xFFFFFF,
            world_to_view: Isometry3::identity(),
            check_face_normal: false,
            force_surface_color: false,
            surface_color: Box::new(|_| 0xFF0000),
            depth_image: ImageF32::new(1, 1),
            rgb_image: ImageRgb8::new(1, 1),
            texture_image: ImageRgb8::new(1, 1),
            camera: None,
            resolution: (0, 0),
            rendered_count: 0,
            mesh_cam: Vec::new(),
            polygon_proj: Vec::new(),
            polygon_tex: Vec::new(),
        }
    }

    /// Specifies the intrinsic camera model
    pub fn set_camera(&mut self, camera: impl CameraModel + 'static) {
        self.resolution = (camera.width(), camera.height());
        self.camera = Some(Box::new(camera));
    }

    /// Specifies the function that colors untextured faces
    pub fn set_surface_color(&mut self, color: impl Fn(usize) -> u32 + 'static) {
        self.surface_color = Box::new(color);
    }

    /// Specifies the image sampled when texture mapping
    pub fn set_texture_image(&mut self, image: ImageRgb8) {
        self.texture_image = image;
    }

    /// Rendered depth image. NaN marks pixels with no depth information.
    /// Valid until the next call to [`render`](Self::render).
    pub fn depth_image(&self) -> &ImageF32 {
        &self.depth_image
    }

    /// Rendered color image. Valid until the next call to
    /// [`render`](Self::render).
    pub fn rgb_image(&self) -> &ImageRgb8 {
        &self.rgb_image
    }

    /// Number of faces actually rendered by the last call to
    /// [`render`](Self::render)
    pub fn rendered_count(&self) -> usize {
        self.rendered_count
    }

    /// Renders the mesh, overwriting the depth and color images.
    ///
    /// Faces behind the camera or facing away (when
    /// [`check_face_normal`](Self::check_face_normal) is set) are silently
    /// skipped. Fails if the camera has not been configured.
    pub fn render(&mut self, mesh: &VertexMesh) -> Result<()> {
        if self.camera.is_none() {
            return Err(Error::InvalidConfig("camera is not set".to_string()));
        }
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err(Error::InvalidConfig(
                "camera resolution must be positive".to_string(),
            ));
        }
        let camera = match self.camera.take() {
            Some(c) => c,
            None => unreachable!(),
        };

        // Normals for visibility culling. The mesh is borrowed immutably, so
        // when it carries none they are derived into local scratch storage.
        let scratch_normals = if self.check_face_normal && !mesh.has_face_normals() {
            Some(face_normals_of(mesh))
        } else {
            None
        };

        self.initialize_images();

        let mut rendered = 0;

        let world_to_view = self.world_to_view;
        let world_camera = world_to_view.inverse_transform_point(&Point3::origin());

        // Decide between texture mapping and a per-face color
        let use_color = self.force_surface_color || !mesh.is_textured();

        let mut mesh_cam = std::mem::take(&mut self.mesh_cam);
        let mut polygon_proj = std::mem::take(&mut self.polygon_proj);
        let mut polygon_tex = std::mem::take(&mut self.polygon_tex);

        for face in 0..mesh.len() {
            let idx0 = mesh.face_offsets[face];
            let idx1 = mesh.face_offsets[face + 1];

            // skip pathological case
            if idx0 >= idx1 {
                continue;
            }

            polygon_proj.clear();
            mesh_cam.clear();

            if !use_color {
                mesh.texture_coords(face, &mut polygon_tex);
            }

            // Prune using the normal vector before doing any projection work
            if self.check_face_normal {
                let visible = match &scratch_normals {
                    Some(normals) => {
                        front_facing(&normals[face], &mesh.shape_vertex(idx0), &world_camera)
                    }
                    None => is_front_visible(mesh, face, idx0, &world_camera),
                };
                if !visible {
                    continue;
                }
            }

            let mut behind_camera = false;
            for i in idx0..idx1 {
                let world = mesh.vertexes.get(mesh.face_vertexes[i]);
                let cam = world_to_view * world;

                // If any part is behind the camera skip the whole face. Not
                // ideal, but it keeps the code simple, fast, and free of
                // rendering artifacts from singular projections.
                if cam.z <= 0.0 {
                    behind_camera = true;
                    break;
                }

                let norm_x = cam.x / cam.z;
                let norm_y = cam.y / cam.z;
                polygon_proj.push(camera.norm_to_pixel(norm_x, norm_y));
                mesh_cam.push(cam);
            }

            if behind_camera {
                continue;
            }

            if use_color {
                self.project_surface_color(&mesh_cam, &polygon_proj, face);
            } else {
                self.project_surface_texture(&mesh_cam, &polygon_proj, &polygon_tex);
            }

            rendered += 1;
        }

        self.mesh_cam = mesh_cam;
        self.polygon_proj = polygon_proj;
        self.polygon_tex = polygon_tex;
        self.camera = Some(camera);
        self.rendered_count = rendered;

        debug!("total faces rendered: {rendered}");
        Ok(())
    }

    fn initialize_images(&mut self) {
        let (width, height) = self.resolution;
        self.depth_image.reshape(width, height);
        self.rgb_image.reshape(width, height);
        self.rgb_image.fill_rgb(self.default_color_rgb);
        self.depth_image.fill(f32::NAN);
    }

    /// Renders the polygon as a single color. Every pixel of the AABB the
    /// polygon projects into is tested for containment, depth tested, and
    /// written on success.
    ///
    /// The whole face uses the depth of its first vertex; depth is not
    /// interpolated across a flat-colored face.
    fn project_surface_color(
        &mut self,
        mesh_cam: &[Point3<f64>],
        poly_proj: &[Point2<f64>],
        shape_idx: usize,
    ) {
        let depth = mesh_cam[0].z as f32;
        let color = (self.surface_color)(shape_idx);

        let (width, height) = self.resolution;
        let mut aabb = RectI32::default();
        compute_bounding_box(width, height, poly_proj, &mut aabb);

        for pixel_y in aabb.y0..aabb.y1 {
            for pixel_x in aabb.x0..aabb.x1 {
                let (ix, iy) = (pixel_x as usize, pixel_y as usize);

                // See if this is the closest point appearing at this pixel
                let pixel_depth = self.depth_image.get(ix, iy);
                if !pixel_depth.is_nan() && depth >= pixel_depth {
                    continue;
                }

                let point = Point2::new(pixel_x as f64, pixel_y as f64);
                if !contains_convex(poly_proj, &point) {
                    continue;
                }

                self.depth_image.set(ix, iy, depth);
                self.rgb_image.set_rgb(ix, iy, color);
            }
        }
    }

    /// Projection with texture mapping. The convex polygon is broken into a
    /// triangle fan around vertex 0 and barycentric coordinates map pixels
    /// into the texture image.
    ///
    /// Depth interpolates affinely in screen space while texture coordinates
    /// are perspective corrected with the usual 1/z weighting.
    fn project_surface_texture(
        &mut self,
        mesh_cam: &[Point3<f64>],
        poly_proj: &[Point2<f64>],
        poly_tex: &[Point2<f32>],
    ) {
        let (width, height) = self.resolution;

        // Scale factor to normalize pixel coordinates for numerical reasons
        let scale = width.max(height) as f32;

        let tex_width = self.texture_image.width();
        let tex_height = self.texture_image.height();

        for vert_c in 2..poly_proj.len() {
            let vert_a = 0;
            let vert_b = vert_c - 1;

            let z0 = mesh_cam[vert_a].z as f32;
            let z1 = mesh_cam[vert_b].z as f32;
            let z2 = mesh_cam[vert_c].z as f32;

            let ax = poly_proj[vert_a].x as f32 / scale;
            let ay = poly_proj[vert_a].y as f32 / scale;
            let bx = poly_proj[vert_b].x as f32 / scale;
            let by = poly_proj[vert_b].y as f32 / scale;
            let cx = poly_proj[vert_c].x as f32 / scale;
            let cy = poly_proj[vert_c].y as f32 / scale;

            let area = edge_function(ax, ay, bx, by, cx, cy);

            let t0 = poly_tex[vert_a];
            let t1 = poly_tex[vert_b];
            let t2 = poly_tex[vert_c];

            // Intersection testing is done with this sub-triangle only
            let work_tri = [poly_proj[vert_a], poly_proj[vert_b], poly_proj[vert_c]];

            let mut aabb = RectI32::default();
            compute_bounding_box(width, height, &work_tri, &mut aabb);

            for pixel_y in aabb.y0..aabb.y1 {
                let py = pixel_y as f32 / scale;

                for pixel_x in aabb.x0..aabb.x1 {
                    let px = pixel_x as f32 / scale;

                    let point = Point2::new(pixel_x as f64, pixel_y as f64);
                    if !contains_convex(&work_tri, &point) {
                        continue;
                    }

                    let (ix, iy) = (pixel_x as usize, pixel_y as usize);
                    let pixel_depth = self.depth_image.get(ix, iy);

                    let alpha = edge_function(bx, by, cx, cy, px, py) / area;
                    let beta = edge_function(cx, cy, ax, ay, px, py) / area;
                    let gamma = edge_function(ax, ay, bx, by, px, py) / area;

                    // depth of the face at this pixel
                    let depth = alpha * z0 + beta * z1 + gamma * z2;

                    if !pixel_depth.is_nan() && depth >= pixel_depth {
                        continue;
                    }

                    // Perspective correct interpolation. The naive version
                    // without 1/z is affine and visibly distorts the texture.
                    let one_over_w = alpha / z0 + beta / z1 + gamma / z2;
                    let u = (alpha * t0.x / z0 + beta * t1.x / z1 + gamma * t2.x / z2) / one_over_w;
                    let v = (alpha * t0.y / z0 + beta * t1.y / z1 + gamma * t2.y / z2) / one_over_w;

                    // back to pixel coordinates in the texture image
                    let pix_tex_x = u * (tex_width - 1) as f32;
                    let pix_tex_y = (1.0 - v) * (tex_height - 1) as f32;

                    let color = self.interpolate_texture_rgb(pix_tex_x, pix_tex_y);

                    self.depth_image.set(ix, iy, depth);
                    self.rgb_image.set_rgb(ix, iy, color);
                }
            }
        }
    }

    /// Samples the texture image at a fractional pixel coordinate
    fn interpolate_texture_rgb(&self, px: f32, py: f32) -> u32 {
        let values = self.texture_image.bilinear(px, py);
        let r = (values[0] + 0.5) as u32;
        let g = (values[1] + 0.5) as u32;
        let b = (values[2] + 0.5) as u32;
        (r << 16) | (g << 8) | b
    }
}

/// Uses the face normal to decide if the front of the face can be seen from
/// `world_camera`. The test is done entirely in world coordinates, before any
/// projection work.
pub fn is_front_visible(
    mesh: &VertexMesh,
    face: usize,
    idx0: usize,
    world_camera: &Point3<f64>,
) -> bool {
    let normal = mesh.face_normal(face);
    let normal = Vector3::new(normal.x as f64, normal.y as f64, normal.z as f64);
    front_facing(&normal, &mesh.shape_vertex(idx0), world_camera)
}

fn front_facing(normal: &Vector3<f64>, vertex: &Point3<f64>, world_camera: &Point3<f64>) -> bool {
    // vector from the camera to a vertex on the face
    let v = vertex - world_camera;

    // Don't render when viewing the face from behind or edge-on
    v.dot(normal) < 0.0
}

/// One normal per face derived from its first three vertexes
fn face_normals_of(mesh: &VertexMesh) -> Vec<Vector3<f64>> {
    (0..mesh.len())
        .map(|face| {
            let idx0 = mesh.face_offsets[face];
            let a = mesh.shape_vertex(idx0);
            let b = mesh.shape_vertex(idx0 + 1);
            let c = mesh.shape_vertex(idx0 + 2);
            (b - a).cross(&(c - b)).normalize()
        })
        .collect()
}

/// Computes the AABB of the projected polygon clipped to the image.
///
/// The lower bound is inclusive and the upper bound exclusive, matching image
/// pixel indexing: `x1 = ceil(max_x) + 1` before clipping.
pub fn compute_bounding_box(
    width: usize,
    height: usize,
    polygon: &[Point2<f64>],
    aabb: &mut RectI32,
) {
    if polygon.is_empty() {
        *aabb = RectI32::default();
        return;
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in polygon {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    aabb.x0 = (min_x.floor() as i32).max(0);
    aabb.y0 = (min_y.floor() as i32).max(0);
    aabb.x1 = (max_x.ceil() as i32 + 1).min(width as i32);
    aabb.y1 = (max_y.ceil() as i32 + 1).min(height as i32);
}

/// Even-odd crossing test for a point inside a convex polygon
fn contains_convex(polygon: &[Point2<f64>], p: &Point2<f64>) -> bool {
    if polygon.is_empty() {
        return false;
    }

    let n = polygon.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = &polygon[i];
        let b = &polygon[j];
        if (a.y > p.y) != (b.y > p.y)
            && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn edge_function(x0: f32, y0: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    (x2 - x0) * (y1 - y0) - (y2 - y0) * (x1 - x0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PinholeCamera;
    use std::f64::consts::PI;

    /// Render a simple shape. Makes sure it runs and modifies the image.
    #[test]
    fn all_together() {
        let mut mesh = VertexMesh::new();
        mesh.vertexes.append(Point3::new(-1.0, -1.0, 10.0));
        mesh.vertexes.append(Point3::new(1.0, -1.0, 10.0));
        mesh.vertexes.append(Point3::new(1.0, 1.0, 10.0));
        mesh.vertexes.append(Point3::new(-1.0, 1.0, 10.0));
        mesh.face_vertexes.extend([0, 1, 2, 3]);
        mesh.face_offsets.push(4);

        let mut alg = MeshRenderer::new();

        // turn off culling to simplify this test
        alg.check_face_normal = false;
        alg.set_camera(PinholeCamera::from_hfov(90.0, 300, 200));

        alg.render(&mesh).unwrap();

        let mut count = 0;
        for y in 0..200 {
            for x in 0..300 {
                if alg.rgb_image().get_rgb(x, y) != 0xFFFFFF {
                    count += 1;
                }
            }
        }

        assert_ne!(0, count);
        assert_eq!(1, alg.rendered_count());
    }

    #[test]
    fn render_without_camera_fails() {
        let mut alg = MeshRenderer::new();
        assert!(alg.render(&VertexMesh::new()).is_err());
    }

    #[test]
    fn bounding_box() {
        let polygon = [
            Point2::new(-5.0, -1.0),
            Point2::new(-5.0, 100.0),
            Point2::new(90.0, 100.0),
            Point2::new(90.0, -1.0),
        ];

        // It should be bounded by the image
        let mut aabb = RectI32::default();
        compute_bounding_box(60, 50, &polygon, &mut aabb);
        assert_eq!(0, aabb.x0);
        assert_eq!(0, aabb.y0);
        assert_eq!(60, aabb.x1);
        assert_eq!(50, aabb.y1);

        // upper extent shouldn't be bounded by the image.
        // Needs to handle the exclusive upper extent properly.
        compute_bounding_box(200, 200, &polygon, &mut aabb);
        assert_eq!(0, aabb.x0);
        assert_eq!(0, aabb.y0);
        assert_eq!(91, aabb.x1);
        assert_eq!(101, aabb.y1);
    }

    /// Tests the projection by having it fill in a known rectangle
    #[test]
    fn surface_color_fills_rectangle() {
        let mut alg = MeshRenderer::new();
        alg.resolution = (100, 120);
        alg.initialize_images();

        // Projected polygon on the image, an axis-aligned rectangle
        let polygon = [
            Point2::new(10.0, 15.0),
            Point2::new(40.0, 15.0),
            Point2::new(40.0, 35.0),
            Point2::new(10.0, 35.0),
        ];

        // the face will have a depth of 10
        let mut shape_in_camera = vec![Point3::new(0.0, 0.0, 0.0); polygon.len()];
        shape_in_camera[0] = Point3::new(0.0, 0.0, 10.0);

        alg.project_surface_color(&shape_in_camera, &polygon, 0);

        // Verify by counting the written pixels
        let mut count_depth = 0;
        let mut count_rgb = 0;
        for y in 0..120 {
            for x in 0..100 {
                if alg.depth_image().get(x, y) == 10.0 {
                    count_depth += 1;
                }
                if alg.rgb_image().get_rgb(x, y) != 0xFFFFFF {
                    count_rgb += 1;
                }
            }
        }

        assert_eq!(600, count_depth);
        assert_eq!(600, count_rgb);
    }

    #[test]
    fn surface_texture_fills_rectangle() {
        let mut alg = MeshRenderer::new();
        alg.resolution = (100, 120);
        alg.initialize_images();

        // 1x1 texture so every sample returns the same non-background color
        alg.set_texture_image(ImageRgb8::from_raw(1, 1, vec![1, 1, 1]));

        let polygon = [
            Point2::new(10.0, 15.0),
            Point2::new(40.0, 15.0),
            Point2::new(40.0, 35.0),
            Point2::new(10.0, 35.0),
        ];

        // All points have a depth of 10
        let shape_in_camera = vec![Point3::new(0.0, 0.0, 10.0); polygon.len()];

        // Texture coordinates with reasonable values
        let poly_texture: Vec<Point2<f32>> = polygon
            .iter()
            .map(|p| Point2::new(p.x as f32 / 50.0, p.y as f32 / 50.0))
            .collect();

        alg.project_surface_texture(&shape_in_camera, &polygon, &poly_texture);

        let mut count_depth = 0;
        let mut count_rgb = 0;
        for y in 0..120 {
            for x in 0..100 {
                if !alg.depth_image().get(x, y).is_nan() {
                    count_depth += 1;
                }
                if alg.rgb_image().get_rgb(x, y) != 0xFFFFFF {
                    count_rgb += 1;
                }
            }
        }

        assert_eq!(600, count_depth);
        assert_eq!(600, count_rgb);
    }

    /// Rotate in a circle and check two handcrafted scenarios per angle
    #[test]
    fn front_visibility_sweep() {
        let mut mesh = VertexMesh::new();
        let r = 5.0;
        let point_cam = Point3::new(0.0, 2.0, 2.0);

        for i in 0..30 {
            let yaw = PI * i as f64 / 15.0;
            let c = yaw.cos();
            let s = yaw.sin();

            // normal towards the camera: visible
            mesh.reset();
            mesh.face_normals.push(0);
            mesh.normals.append(Point3::new(-c as f32, -s as f32, 0.0));
            mesh.face_vertexes.push(0);
            mesh.vertexes.append(Point3::new(r * c, 2.0 + r * s, 2.0));

            assert!(is_front_visible(&mesh, 0, 0, &point_cam));

            // normal away from the camera: culled
            mesh.reset();
            mesh.face_vertexes.push(0);
            mesh.vertexes.append(Point3::new(r * c, 2.0 + r * s, 2.0));
            mesh.face_normals.push(0);
            mesh.normals.append(Point3::new(c as f32, s as f32, 0.0));

            assert!(!is_front_visible(&mesh, 0, 0, &point_cam));
        }
    }

    /// Culling with derived normals: a quad facing the camera renders, the
    /// reversed winding does not
    #[test]
    fn render_culls_back_faces() {
        let shape = [
            Point3::new(-1.0, -1.0, 10.0),
            Point3::new(-1.0, 1.0, 10.0),
            Point3::new(1.0, 1.0, 10.0),
            Point3::new(1.0, -1.0, 10.0),
        ];

        let mut facing = VertexMesh::new();
        facing.add_face_vectors(&shape);

        let reversed: Vec<_> = shape.iter().rev().copied().collect();
        let mut away = VertexMesh::new();
        away.add_face_vectors(&reversed);

        let mut alg = MeshRenderer::new();
        alg.check_face_normal = true;
        alg.set_camera(PinholeCamera::from_hfov(90.0, 300, 200));

        alg.render(&facing).unwrap();
        assert_eq!(1, alg.rendered_count());

        alg.render(&away).unwrap();
        assert_eq!(0, alg.rendered_count());
    }
}
