//! Camera models used by the renderer

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Intrinsic camera model consumed by the renderer.
///
/// A camera supplies the two coordinate transforms between pixels and
/// normalized image coordinates plus its resolution. Implementations must be
/// pure; whatever lens model is configured is encapsulated behind these two
/// functions.
pub trait CameraModel {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Pixel coordinate to normalized image coordinate
    fn pixel_to_norm(&self, px: f64, py: f64) -> Point2<f64>;

    /// Normalized image coordinate to pixel coordinate
    fn norm_to_pixel(&self, nx: f64, ny: f64) -> Point2<f64>;
}

/// Distortion-free pinhole camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinholeCamera {
    pub fx: f64,
    pub fy: f64,
    pub skew: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: usize,
    pub height: usize,
}

impl PinholeCamera {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: usize, height: usize) -> Self {
        Self {
            fx,
            fy,
            skew: 0.0,
            cx,
            cy,
            width,
            height,
        }
    }

    /// Creates an intrinsic model from a horizontal field of view in degrees
    /// and the image shape. The principal point is at the image center and
    /// the pixels are square.
    pub fn from_hfov(hfov_deg: f64, width: usize, height: usize) -> Self {
        let f = (width as f64 / 2.0) / (hfov_deg.to_radians() / 2.0).tan();
        Self::new(f, f, width as f64 / 2.0, height as f64 / 2.0, width, height)
    }
}

impl CameraModel for PinholeCamera {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel_to_norm(&self, px: f64, py: f64) -> Point2<f64> {
        let ny = (py - self.cy) / self.fy;
        let nx = (px - self.cx - self.skew * ny) / self.fx;
        Point2::new(nx, ny)
    }

    fn norm_to_pixel(&self, nx: f64, ny: f64) -> Point2<f64> {
        Point2::new(
            self.fx * nx + self.skew * ny + self.cx,
            self.fy * ny + self.cy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pixel_norm_round_trip() {
        let camera = PinholeCamera::from_hfov(90.0, 300, 200);

        for (px, py) in [(0.0, 0.0), (150.0, 100.0), (299.0, 17.5), (42.25, 199.0)] {
            let norm = camera.pixel_to_norm(px, py);
            let pixel = camera.norm_to_pixel(norm.x, norm.y);
            assert_relative_eq!(px, pixel.x, epsilon = 1e-10);
            assert_relative_eq!(py, pixel.y, epsilon = 1e-10);
        }
    }

    #[test]
    fn hfov_covers_image_width() {
        // With a 90 degree hfov the ray at the left edge of the image has
        // normalized x = -1
        let camera = PinholeCamera::from_hfov(90.0, 300, 200);
        let norm = camera.pixel_to_norm(0.0, 100.0);
        assert_relative_eq!(norm.x, -1.0, epsilon = 1e-10);
        assert_relative_eq!(norm.y, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn principal_point_projects_to_center() {
        let camera = PinholeCamera::from_hfov(80.0, 640, 480);
        let pixel = camera.norm_to_pixel(0.0, 0.0);
        assert_relative_eq!(pixel.x, 320.0);
        assert_relative_eq!(pixel.y, 240.0);
    }
}
