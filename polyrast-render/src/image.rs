//! Minimal image rasters used by the renderer

/// Single-band f32 image, used for the depth buffer. NaN marks pixels with
/// no depth information.
#[derive(Debug, Clone)]
pub struct ImageF32 {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl ImageF32 {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Changes the shape. Pixel contents are unspecified afterwards.
    pub fn reshape(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data.resize(width * height, 0.0);
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Interleaved 3-band 8-bit image. Colors move in and out as packed
/// 0xRRGGBB values.
#[derive(Debug, Clone)]
pub struct ImageRgb8 {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl ImageRgb8 {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    /// Wraps raw interleaved RGB data. The buffer length must be
    /// `width * height * 3`.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Self {
        assert_eq!(width * height * 3, data.len());
        Self {
            width,
            height,
            data,
        }
    }

    /// Changes the shape. Pixel contents are unspecified afterwards.
    pub fn reshape(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data.resize(width * height * 3, 0);
    }

    pub fn fill_rgb(&mut self, color: u32) {
        let rgb = [(color >> 16) as u8, (color >> 8) as u8, color as u8];
        for pixel in self.data.chunks_exact_mut(3) {
            pixel.copy_from_slice(&rgb);
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get_rgb(&self, x: usize, y: usize) -> u32 {
        let i = (y * self.width + x) * 3;
        (self.data[i] as u32) << 16 | (self.data[i + 1] as u32) << 8 | self.data[i + 2] as u32
    }

    pub fn set_rgb(&mut self, x: usize, y: usize, color: u32) {
        let i = (y * self.width + x) * 3;
        self.data[i] = (color >> 16) as u8;
        self.data[i + 1] = (color >> 8) as u8;
        self.data[i + 2] = color as u8;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bilinear interpolation at a fractional pixel coordinate with an
    /// edge-extend border policy.
    pub fn bilinear(&self, px: f32, py: f32) -> [f32; 3] {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let fx = px.clamp(0.0, max_x);
        let fy = py.clamp(0.0, max_y);

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let ax = fx - x0 as f32;
        let ay = fy - y0 as f32;

        let mut out = [0.0f32; 3];
        for (band, value) in out.iter_mut().enumerate() {
            let i00 = (y0 * self.width + x0) * 3 + band;
            let i10 = (y0 * self.width + x1) * 3 + band;
            let i01 = (y1 * self.width + x0) * 3 + band;
            let i11 = (y1 * self.width + x1) * 3 + band;

            let top = self.data[i00] as f32 * (1.0 - ax) + self.data[i10] as f32 * ax;
            let bottom = self.data[i01] as f32 * (1.0 - ax) + self.data[i11] as f32 * ax;
            *value = top * (1.0 - ay) + bottom * ay;
        }
        out
    }
}
