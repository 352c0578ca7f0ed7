use glam::Vec3;
use serde::Deserialize;

use crate::sampling::{cosine_hemisphere, PixelSampler};

/// Physically based material parameters, consumed opaquely by the integrator
/// and interpreted by the BSDF functions below.
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Material {
    pub base_color: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub specular: f32,
    pub specular_tint: f32,
    pub sheen: f32,
    pub sheen_tint: f32,
    pub clearcoat: f32,
    pub clearcoat_gloss: f32,
    pub anisotropic: f32,
    pub specular_transmission: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Vec3::splat(0.8),
            metallic: 0.0,
            roughness: 0.5,
            specular: 0.5,
            specular_tint: 0.0,
            sheen: 0.0,
            sheen_tint: 0.0,
            clearcoat: 0.0,
            clearcoat_gloss: 0.0,
            anisotropic: 0.0,
            specular_transmission: 0.0,
        }
    }
}

/// BSDF importance sample: a scattered direction with its pdf and the BSDF
/// value for that direction.
#[derive(Copy, Clone, Debug)]
pub struct BsdfSample {
    pub wi: Vec3,
    pub pdf: f32,
    pub value: Vec3,
}

// The scattering model behind these three functions is pluggable; the
// integrator only relies on the signatures and on evaluate/pdf/sample being
// mutually consistent. The implementation here is Lambertian reflectance
// off the base color.

/// BSDF value for the direction pair `(wo, wi)` in the frame
/// `(tangent, binormal, normal)`.
pub fn bsdf_evaluate(
    material: &Material,
    normal: Vec3,
    wo: Vec3,
    wi: Vec3,
    _tangent: Vec3,
    _binormal: Vec3,
) -> Vec3 {
    if wo.dot(normal) > 0.0 && wi.dot(normal) > 0.0 {
        material.base_color * std::f32::consts::FRAC_1_PI
    } else {
        Vec3::ZERO
    }
}

/// Pdf of sampling `wi` from [`bsdf_sample`] for the same inputs.
pub fn bsdf_pdf(
    _material: &Material,
    normal: Vec3,
    wo: Vec3,
    wi: Vec3,
    _tangent: Vec3,
    _binormal: Vec3,
) -> f32 {
    if wo.dot(normal) > 0.0 && wi.dot(normal) > 0.0 {
        wi.dot(normal) * std::f32::consts::FRAC_1_PI
    } else {
        0.0
    }
}

/// Importance-samples a scattered direction for `wo`.
pub fn bsdf_sample(
    material: &Material,
    normal: Vec3,
    wo: Vec3,
    tangent: Vec3,
    binormal: Vec3,
    sampler: &mut PixelSampler,
) -> BsdfSample {
    if wo.dot(normal) <= 0.0 {
        // Below the hemisphere we can scatter into; the integrator treats a
        // collapsed pdf as path termination
        return BsdfSample {
            wi: normal,
            pdf: 0.0,
            value: Vec3::ZERO,
        };
    }
    let local = cosine_hemisphere(sampler.next_2d());
    let wi = local.x * tangent + local.y * binormal + local.z * normal;
    BsdfSample {
        wi,
        pdf: local.z * std::f32::consts::FRAC_1_PI,
        value: material.base_color * std::f32::consts::FRAC_1_PI,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Onb;
    use approx::assert_relative_eq;

    #[test]
    fn evaluate_is_zero_below_surface() {
        let material = Material::default();
        let n = Vec3::new(0.0, 1.0, 0.0);
        let onb = Onb::from_normal(n);
        let wo = Vec3::new(0.0, 1.0, 0.0);
        let wi = Vec3::new(0.0, -1.0, 0.0);
        assert_eq!(
            bsdf_evaluate(&material, n, wo, wi, onb.tangent, onb.binormal),
            Vec3::ZERO
        );
        assert_eq!(bsdf_pdf(&material, n, wo, wi, onb.tangent, onb.binormal), 0.0);
    }

    #[test]
    fn sample_matches_evaluate_and_pdf() {
        let material = Material::default();
        let n = Vec3::new(0.0, 1.0, 0.0);
        let onb = Onb::from_normal(n);
        let wo = Vec3::new(0.3, 0.8, 0.1).normalize();
        let mut sampler = PixelSampler::new(0, 0, 0);

        for _ in 0..100 {
            let sample = bsdf_sample(&material, n, wo, onb.tangent, onb.binormal, &mut sampler);
            assert!(sample.pdf >= 0.0);
            if sample.pdf == 0.0 {
                continue;
            }
            let f = bsdf_evaluate(&material, n, wo, sample.wi, onb.tangent, onb.binormal);
            assert_relative_eq!(f.x, sample.value.x, epsilon = 1e-6);
            let pdf = bsdf_pdf(&material, n, wo, sample.wi, onb.tangent, onb.binormal);
            assert_relative_eq!(pdf, sample.pdf, epsilon = 1e-4);
        }
    }

    #[test]
    fn sample_below_surface_collapses_pdf() {
        let material = Material::default();
        let n = Vec3::new(0.0, 1.0, 0.0);
        let onb = Onb::from_normal(n);
        let wo = Vec3::new(0.0, -1.0, 0.0);
        let mut sampler = PixelSampler::new(0, 0, 1);
        let sample = bsdf_sample(&material, n, wo, onb.tangent, onb.binormal, &mut sampler);
        assert_eq!(sample.pdf, 0.0);
    }
}
