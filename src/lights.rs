use glam::Vec3;

use crate::{
    sampling::{uniform_sphere, uniform_triangle, PixelSampler},
    scene::{Scene, T_FAR},
};

/// One next-event-estimation sample toward a light.
#[derive(Copy, Clone, Debug)]
pub struct LightSample {
    pub wi: Vec3,
    /// Distance to the sampled point, [`T_FAR`] for the environment
    pub dist: f32,
    pub pdf: f32,
    pub radiance: Vec3,
}

/// Pdf of [`sample_light`] having produced the point `p` on triangle
/// `(p0, p1, p2)` of emissive instance `inst`, as seen from `origin`.
/// Used for MIS when a BSDF-sampled ray lands on a light.
pub fn mesh_light_sampled_pdf(
    scene: &Scene,
    p: Vec3,
    origin: Vec3,
    inst: u32,
    p0: Vec3,
    p1: Vec3,
    p2: Vec3,
) -> f32 {
    let n = scene.lights.len() as f32;
    let n1 = scene.triangle_counts[inst as usize] as f32;
    let wi_light = (p - origin).normalize();
    let c = (p1 - p0).cross(p2 - p0);
    let light_normal = c.normalize();
    // Clamped so the pdf stays positive for back-facing emitters and MIS
    // weights remain well defined
    let cos_light = (-light_normal.dot(wi_light)).max(1e-4);
    let sqr_dist = (p - origin).length_squared();
    let area = c.length() / 2.0;
    (1.0 - scene.env_prob) * sqr_dist / (n * n1 * area * cos_light)
}

/// Pdf of [`sample_light`] having produced an environment direction.
/// Constant since environment directions are uniform over the sphere.
pub fn env_light_sampled_pdf(scene: &Scene, _wi: Vec3) -> f32 {
    scene.env_prob / (4.0 * std::f32::consts::PI)
}

/// Samples a direction toward the scene's lights from `origin`: the constant
/// environment with probability `env_prob`, otherwise a uniformly picked
/// emissive instance, a uniformly picked triangle within it and a uniform
/// point on that triangle's area.
pub fn sample_light(scene: &Scene, origin: Vec3, sampler: &mut PixelSampler) -> LightSample {
    let u = sampler.next_1d();
    if u < scene.env_prob || scene.lights.is_empty() {
        // The empty light set fallback can land here with env_prob at zero;
        // a zero pdf must never carry radiance
        let radiance = if scene.env_prob > 0.0 {
            scene.env_radiance
        } else {
            Vec3::ZERO
        };
        return LightSample {
            wi: uniform_sphere(sampler.next_2d()),
            dist: T_FAR,
            pdf: env_light_sampled_pdf(scene, Vec3::ZERO),
            radiance,
        };
    }

    let u_remapped = (u - scene.env_prob) / (1.0 - scene.env_prob);
    let n = scene.lights.len();
    let inst = scene.lights[((u_remapped * n as f32) as usize).min(n - 1)];
    let n1 = scene.triangle_counts[inst as usize];
    let prim = ((sampler.next_1d() * n1 as f32) as u32).min(n1 - 1);

    let [p0, p1, p2] = scene.triangle_positions(inst, prim);
    let abc = uniform_triangle(sampler.next_2d());
    let p = abc.x * p0 + abc.y * p1 + abc.z * p2;

    let wi_light = (p - origin).normalize();
    let c = (p1 - p0).cross(p2 - p0);
    let light_normal = c.normalize();
    let cos_light = -light_normal.dot(wi_light);
    // Back-facing emitters contribute nothing but keep their positive pdf
    let radiance = if cos_light > 1e-4 {
        scene.emission[inst as usize]
    } else {
        Vec3::ZERO
    };
    let sqr_dist = (p - origin).length_squared();
    let area = c.length() / 2.0;
    let pdf = (1.0 - scene.env_prob) * sqr_dist
        / (n as f32 * n1 as f32 * area * cos_light.max(1e-4));

    LightSample {
        wi: wi_light,
        dist: 0.9999 * sqr_dist.sqrt(),
        pdf,
        radiance,
    }
}
