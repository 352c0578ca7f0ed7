use glam::Vec3;

/// Balance heuristic for combining light and BSDF sampling strategies.
/// The epsilon in the denominator keeps the weight defined when both pdfs
/// collapse toward zero.
pub fn balance_heuristic(pdf_a: f32, pdf_b: f32) -> f32 {
    pdf_a / (pdf_a + pdf_b).max(1e-4)
}

/// Rec. 709 luminance of a linear RGB value.
pub fn luminance(c: Vec3) -> f32 {
    c.dot(Vec3::new(0.212_671, 0.715_160, 0.072_169))
}

/// Orthonormal shading frame around a normal.
#[derive(Copy, Clone, Debug)]
pub struct Onb {
    pub tangent: Vec3,
    pub binormal: Vec3,
    pub normal: Vec3,
}

impl Onb {
    /// Builds a frame around `normal`, which is assumed to be unit length.
    pub fn from_normal(normal: Vec3) -> Self {
        let binormal = if normal.x.abs() > normal.z.abs() {
            Vec3::new(-normal.y, normal.x, 0.0)
        } else {
            Vec3::new(0.0, -normal.z, normal.y)
        }
        .normalize();
        let tangent = binormal.cross(normal).normalize();
        Self {
            tangent,
            binormal,
            normal,
        }
    }

    /// Transforms a frame-local direction into world space.
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        v.x * self.tangent + v.y * self.binormal + v.z * self.normal
    }
}

/// Piecewise sRGB transfer function, applied per channel.
pub fn linear_to_srgb(c: Vec3) -> Vec3 {
    fn encode(x: f32) -> f32 {
        if x <= 0.003_130_8 {
            12.92 * x
        } else {
            1.055 * x.powf(1.0 / 2.4) - 0.055
        }
    }
    Vec3::new(encode(c.x), encode(c.y), encode(c.z)).clamp(Vec3::ZERO, Vec3::ONE)
}
