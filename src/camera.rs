use glam::{UVec2, Vec2, Vec3};
use serde::Deserialize;

use crate::scene::{Ray, T_FAR};

/// User-facing camera pose. `fov` is vertical; values above pi are assumed
/// to be given in degrees and converted.
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct CameraParameters {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub fov: f32,
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: 60.0,
        }
    }
}

/// A simple pinhole camera
#[derive(Copy, Clone)]
pub struct Camera {
    position: Vec3,
    right: Vec3,
    up: Vec3,
    forward: Vec3,
    tan_half_fov: f32,
}

impl Camera {
    /// Creates a new `Camera`, orthonormalizing the basis from `params`.
    pub fn new(params: CameraParameters) -> Self {
        let fov = if params.fov > std::f32::consts::PI {
            params.fov.to_radians()
        } else {
            params.fov
        };
        let forward = params.direction.normalize();
        let right = forward.cross(params.up).normalize();
        let up = right.cross(forward).normalize();
        Self {
            position: params.position,
            right,
            up,
            forward,
            tan_half_fov: (0.5 * fov).tan(),
        }
    }

    /// Creates the [`Ray`] through the film coordinate `coord` (pixel corner
    /// plus sub-pixel jitter). The image plane spans `[-1, 1]` along the
    /// shorter film axis.
    pub fn ray(&self, coord: Vec2, res: UVec2) -> Ray {
        let frame_size = res.min_element() as f32;
        let pixel = (coord * 2.0 - Vec2::new(res.x as f32, res.y as f32)) / frame_size;
        let d = Vec3::new(
            pixel.x * self.tan_half_fov,
            -pixel.y * self.tan_half_fov,
            1.0,
        );
        let direction = (self.right * d.x + self.up * d.y + self.forward * d.z).normalize();
        Ray::new(self.position, direction, 0.0, T_FAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn center_ray_is_forward() {
        let camera = Camera::new(CameraParameters {
            position: Vec3::new(1.0, 2.0, 3.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: 90.0,
        });
        let ray = camera.ray(Vec2::new(32.0, 32.0), UVec2::new(64, 64));
        assert_eq!(ray.o, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(ray.d.dot(Vec3::new(0.0, 0.0, -1.0)), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn fov_above_pi_reads_as_degrees() {
        let params = CameraParameters {
            position: Vec3::ZERO,
            direction: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: 90.0,
        };
        let degrees = Camera::new(params);
        let radians = Camera::new(CameraParameters {
            fov: std::f32::consts::FRAC_PI_2,
            ..params
        });
        let res = UVec2::new(64, 64);
        // Corner rays must agree between the two spellings
        let a = degrees.ray(Vec2::new(0.0, 0.0), res);
        let b = radians.ray(Vec2::new(0.0, 0.0), res);
        assert_relative_eq!(a.d.x, b.d.x, epsilon = 1e-6);
        assert_relative_eq!(a.d.y, b.d.y, epsilon = 1e-6);
        assert_relative_eq!(a.d.z, b.d.z, epsilon = 1e-6);
    }

    #[test]
    fn image_y_grows_downward() {
        let camera = Camera::new(CameraParameters {
            position: Vec3::ZERO,
            direction: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: 90.0,
        });
        let res = UVec2::new(64, 64);
        let top = camera.ray(Vec2::new(32.0, 0.0), res);
        let bottom = camera.ray(Vec2::new(32.0, 64.0), res);
        assert!(top.d.y > 0.0);
        assert!(bottom.d.y < 0.0);
    }

    #[test]
    fn basis_is_orthonormalized() {
        // Up need not be perpendicular to the look direction
        let camera = Camera::new(CameraParameters {
            position: Vec3::ZERO,
            direction: Vec3::new(0.0, -1.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: 1.0,
        });
        let ray = camera.ray(Vec2::new(32.0, 32.0), UVec2::new(64, 64));
        assert_relative_eq!(ray.d.length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(
            ray.d.dot(Vec3::new(0.0, -1.0, -1.0).normalize()),
            1.0,
            epsilon = 1e-6
        );
    }
}
