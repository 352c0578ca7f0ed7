use glam::{Mat3, Vec3};
use serde::Deserialize;

use crate::{
    lights::{env_light_sampled_pdf, mesh_light_sampled_pdf, sample_light},
    materials::{bsdf_evaluate, bsdf_pdf, bsdf_sample},
    math::{balance_heuristic, luminance, Onb},
    sampling::PixelSampler,
    scene::{Ray, Scene, SHADOW_EPSILON, T_FAR},
};

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Params {
    pub max_depth: u32,
    /// First bounce at which Russian roulette may terminate the path
    pub rr_depth: u32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_depth: 6,
            rr_depth: 3,
        }
    }
}

/// Unidirectional path tracer with next-event estimation and MIS.
pub struct Path {
    max_depth: u32,
    rr_depth: u32,
}

impl Path {
    pub fn new(params: Params) -> Self {
        Self {
            max_depth: params.max_depth,
            rr_depth: params.rr_depth,
        }
    }

    /// Evaluates the incoming radiance along `ray`.
    pub fn li(&self, mut ray: Ray, scene: &Scene, sampler: &mut PixelSampler) -> Vec3 {
        let mut radiance = Vec3::ZERO;
        let mut beta = Vec3::ONE;
        // Pdf of the previous bounce's direction choice, for MIS against
        // light sampling. Starts effectively at a delta for the camera ray.
        let mut pdf_bsdf = 1e30f32;

        for depth in 0..self.max_depth {
            let hit = match scene.trace_closest(&ray) {
                Some(hit) => hit,
                None => {
                    // Directly visible environment gets full weight
                    if depth == 0 {
                        radiance += scene.env_radiance;
                    } else {
                        let pdf_env = env_light_sampled_pdf(scene, ray.d);
                        radiance += balance_heuristic(pdf_bsdf, pdf_env) * beta * scene.env_radiance;
                    }
                    break;
                }
            };

            // Reconstruct the surface point from the hit triangle
            let [i0, i1, i2] = scene.heap.triangle(hit.inst, hit.prim);
            let vertices = scene.heap.vertices(hit.inst);
            let (v0, v1, v2) = (
                vertices[i0 as usize],
                vertices[i1 as usize],
                vertices[i2 as usize],
            );
            let transform = scene.instance_transform(hit.inst);
            let p = hit.lerp(
                transform.transform_point3(v0.p),
                transform.transform_point3(v1.p),
                transform.transform_point3(v2.p),
            );
            let vn = hit.lerp(v0.n, v1.n, v2.n);
            let normal_to_world = Mat3::from(transform.matrix3).inverse().transpose();
            let mut n = (normal_to_world * vn).normalize();

            let wo = -ray.d;
            let material = scene.materials[hit.inst as usize];
            let emission = scene.emission[hit.inst as usize];
            // Transmissive materials see both sides un-flipped
            if material.specular_transmission == 0.0 && wo.dot(n) < 0.0 {
                n = -n;
            }
            let onb = Onb::from_normal(n);

            // Emissive surfaces terminate the path in this model
            if emission != Vec3::ZERO {
                if depth == 0 {
                    radiance += emission;
                } else {
                    let [p0, p1, p2] = scene.triangle_positions(hit.inst, hit.prim);
                    let pdf_light = mesh_light_sampled_pdf(scene, p, ray.o, hit.inst, p0, p1, p2);
                    radiance += balance_heuristic(pdf_bsdf, pdf_light) * beta * emission;
                }
                break;
            }

            // Next-event estimation
            let light = sample_light(scene, p, sampler);
            let shadow_ray = Ray::new(p, light.wi, SHADOW_EPSILON, light.dist);
            if !scene.trace_any(&shadow_ray) {
                let f = bsdf_evaluate(&material, n, wo, light.wi, onb.tangent, onb.binormal);
                let pdf = bsdf_pdf(&material, n, wo, light.wi, onb.tangent, onb.binormal);
                let weight = balance_heuristic(light.pdf, pdf);
                let cos_light = light.wi.dot(n).max(0.0);
                radiance +=
                    beta * f * cos_light * weight * light.radiance / light.pdf.max(1e-4);
            }

            // BSDF importance sample for the next bounce
            let sample = bsdf_sample(&material, n, wo, onb.tangent, onb.binormal, sampler);
            if sample.pdf < 1e-4 {
                break;
            }
            ray = Ray::new(p, sample.wi, SHADOW_EPSILON, T_FAR);
            pdf_bsdf = sample.pdf;
            beta *= sample.value * sample.wi.dot(n).abs() / sample.pdf;

            // Russian roulette
            let l = luminance(beta);
            if l == 0.0 {
                break;
            }
            if depth >= self.rr_depth && l < 1.0 {
                match russian_roulette(beta, sampler.next_1d()) {
                    Some(reweighted) => beta = reweighted,
                    None => break,
                }
            }
        }

        radiance
    }
}

/// Stochastic termination of a low-throughput path. Survivors are reweighted
/// so the estimator stays unbiased in expectation.
fn russian_roulette(beta: Vec3, u: f32) -> Option<Vec3> {
    let q = luminance(beta).max(0.05);
    if u >= q {
        None
    } else {
        Some(beta / q)
    }
}
