use glam::Vec2;
use glam::Vec3;
use rayon::prelude::*;

use crate::{
    camera::Camera, film::Film, integrator::Path, sampling::PixelSampler, scene::Scene,
};

/// Radiance added per pixel per frame is clamped to this per channel.
const RADIANCE_CLAMP: f32 = 30.0;

/// Recovers a corrupted sample locally before it reaches the shared
/// accumulator: NaNs become black, everything else is clamped into range.
fn sanitize(radiance: Vec3) -> Vec3 {
    if radiance.is_nan() {
        Vec3::ZERO
    } else {
        radiance.clamp(Vec3::ZERO, Vec3::splat(RADIANCE_CLAMP))
    }
}

/// Renders one frame: one independent task per pixel, each owning its
/// sampler and its accumulation cell. The scene is shared read-only.
pub fn render_frame(
    scene: &Scene,
    camera: &Camera,
    integrator: &Path,
    film: &mut Film,
    frame: u32,
) {
    let res = film.res();
    film.pixels_mut()
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, cell)| {
            let px = i as u32 % res.x;
            let py = i as u32 / res.x;
            let mut sampler = PixelSampler::new(px, py, frame);
            let jitter = sampler.next_2d();
            let ray = camera.ray(Vec2::new(px as f32, py as f32) + jitter, res);
            let radiance = integrator.li(ray, scene, &mut sampler);
            *cell += sanitize(radiance);
        });
}
