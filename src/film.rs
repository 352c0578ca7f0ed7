use glam::{UVec2, Vec3};

use crate::math::linear_to_srgb;

/// Progressive accumulation buffer, one persistent radiance sum per pixel.
///
/// Sums are only ever added to while a session runs; display reads divide by
/// the frame count without touching the stored values.
pub struct Film {
    res: UVec2,
    pixels: Vec<Vec3>,
}

impl Film {
    pub fn new(res: UVec2) -> Self {
        Self {
            res,
            pixels: vec![Vec3::ZERO; (res.x * res.y) as usize],
        }
    }

    pub fn res(&self) -> UVec2 {
        self.res
    }

    pub fn pixels(&self) -> &[Vec3] {
        &self.pixels
    }

    /// Mutable cell access for a frame dispatch; each pixel task owns
    /// exactly one cell.
    pub fn pixels_mut(&mut self) -> &mut [Vec3] {
        &mut self.pixels
    }

    /// Accumulated sum at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[(y * self.res.x + x) as usize]
    }

    /// Adds a frame's sample into the pixel's running sum.
    pub fn add_sample(&mut self, x: u32, y: u32, radiance: Vec3) {
        self.pixels[(y * self.res.x + x) as usize] += radiance;
    }

    /// Tonemapped read-out for display: average over `frame_count` frames,
    /// sRGB encoded, row-major RGB8.
    pub fn to_srgb(&self, frame_count: u32) -> Vec<u8> {
        let scale = 1.0 / frame_count.max(1) as f32;
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for sum in &self.pixels {
            let ldr = linear_to_srgb(*sum * scale) * 255.0;
            out.push(ldr.x.round() as u8);
            out.push(ldr.y.round() as u8);
            out.push(ldr.z.round() as u8);
        }
        out
    }
}
