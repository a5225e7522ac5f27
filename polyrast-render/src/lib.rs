//! Software mesh rendering for polyrast
//!
//! Projects a [`polyrast_core::VertexMesh`] into a depth-buffered 2D image
//! given a camera model and a rigid world-to-view transform. The rasterizer
//! is intentionally simple: faces are assumed convex and opaque, rendering is
//! single threaded, and a call to [`MeshRenderer::render`] overwrites the
//! previous output images.

pub mod camera;
pub mod image;
pub mod renderer;

pub use camera::*;
pub use image::*;
pub use renderer::*;
