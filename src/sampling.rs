use glam::{Vec2, Vec3};
use rand::{distributions::Standard, Rng};
use rand_pcg::Pcg32;

/// Pseudo-random stream owned by a single in-flight pixel task.
///
/// Seeded deterministically from `(pixel, frame)`: the pixel picks the PCG
/// state and the frame the stream, which are uncorrelated across streams.
pub struct PixelSampler {
    rng: Pcg32,
}

impl PixelSampler {
    pub fn new(px: u32, py: u32, frame: u32) -> Self {
        let state = (u64::from(px) << 32) | u64::from(py);
        Self {
            rng: Pcg32::new(state, u64::from(frame)),
        }
    }

    /// Next uniform scalar in `[0, 1)`.
    pub fn next_1d(&mut self) -> f32 {
        self.rng.sample(Standard)
    }

    /// Next pair of independent uniform scalars in `[0, 1)`.
    pub fn next_2d(&mut self) -> Vec2 {
        Vec2::new(self.rng.sample(Standard), self.rng.sample(Standard))
    }
}

/// Area-preserving map from the unit square to triangle barycentrics.
pub fn uniform_triangle(u: Vec2) -> Vec3 {
    let uv = if u.x < u.y {
        Vec2::new(0.5 * u.x, -0.5 * u.x + u.y)
    } else {
        Vec2::new(-0.5 * u.y + u.x, 0.5 * u.y)
    };
    Vec3::new(uv.x, uv.y, 1.0 - uv.x - uv.y)
}

/// Uniform direction over the full sphere.
pub fn uniform_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * std::f32::consts::PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Cosine-weighted direction on the +z hemisphere.
pub fn cosine_hemisphere(u: Vec2) -> Vec3 {
    let r = u.x.sqrt();
    let phi = 2.0 * std::f32::consts::PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u.x).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn sampler_is_deterministic_per_pixel_and_frame() {
        let mut a = PixelSampler::new(12, 34, 7);
        let mut b = PixelSampler::new(12, 34, 7);
        for _ in 0..16 {
            assert_eq!(a.next_1d(), b.next_1d());
        }

        // A different frame yields a different stream
        let mut c = PixelSampler::new(12, 34, 8);
        let mut d = PixelSampler::new(12, 34, 7);
        let frame7: Vec<f32> = (0..16).map(|_| d.next_1d()).collect();
        assert!(frame7.iter().any(|&x| x != c.next_1d()));
    }

    #[test]
    fn scalars_stay_in_unit_interval() {
        let mut sampler = PixelSampler::new(3, 5, 11);
        for _ in 0..1000 {
            let x = sampler.next_1d();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn triangle_barycentrics_are_valid() {
        let mut sampler = PixelSampler::new(0, 0, 0);
        for _ in 0..1000 {
            let b = uniform_triangle(sampler.next_2d());
            assert!(b.x >= 0.0 && b.y >= 0.0 && b.z >= 0.0);
            assert_abs_diff_eq!(b.x + b.y + b.z, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn sphere_directions_are_unit_length() {
        let mut sampler = PixelSampler::new(1, 1, 1);
        let mut mean = Vec3::ZERO;
        let n = 4096;
        for _ in 0..n {
            let d = uniform_sphere(sampler.next_2d());
            assert_relative_eq!(d.length(), 1.0, epsilon = 1e-5);
            mean += d;
        }
        // Uniform over the sphere averages out near zero
        mean /= n as f32;
        assert!(mean.length() < 0.05, "mean direction {mean}");
    }

    #[test]
    fn cosine_hemisphere_stays_above_horizon() {
        let mut sampler = PixelSampler::new(2, 2, 2);
        for _ in 0..1000 {
            let d = cosine_hemisphere(sampler.next_2d());
            assert!(d.z >= 0.0);
            assert_relative_eq!(d.length(), 1.0, epsilon = 1e-5);
        }
    }
}
