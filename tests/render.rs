use approx::assert_relative_eq;
use glam::{UVec2, Vec3};

use lumen::{
    camera::{Camera, CameraParameters},
    film::Film,
    integrator::{Params, Path},
    materials::Material,
    renderer::render_frame,
    scene::{quad, Scene},
};

fn floor(albedo: f32, emission: Vec3) -> lumen::scene::Model {
    let s = 1000.0;
    let mut model = quad(
        "floor",
        [
            Vec3::new(-s, 0.0, -s),
            Vec3::new(s, 0.0, -s),
            Vec3::new(s, 0.0, s),
            Vec3::new(-s, 0.0, s),
        ],
        Material {
            base_color: Vec3::splat(albedo),
            ..Material::default()
        },
        emission,
    );
    // Up-facing shading normal regardless of winding
    model.normals = vec![Vec3::new(0.0, 1.0, 0.0); 4];
    model
}

fn looking_down() -> CameraParameters {
    CameraParameters {
        position: Vec3::new(0.0, 1.0, 0.0),
        direction: Vec3::new(0.0, -1.0, 0.0),
        up: Vec3::new(0.0, 0.0, 1.0),
        // Radians; narrow so the center pixel stays near the origin
        fov: 0.2,
    }
}

/// Irradiance at a point centered under a rectangular diffuse emitter of
/// half extents `a` x `b` at height `h`, emitting radiance `l`.
fn rect_light_irradiance(l: f32, a: f32, b: f32, h: f32) -> f32 {
    let x = f64::from(a) / f64::from(h);
    let y = f64::from(b) / f64::from(h);
    let quadrant = 0.5
        * ((x / (1.0 + x * x).sqrt()) * (y / (1.0 + x * x).sqrt()).atan()
            + (y / (1.0 + y * y).sqrt()) * (x / (1.0 + y * y).sqrt()).atan());
    (4.0 * f64::from(l) * quadrant) as f32
}

// A diffuse floor lit by a square area light directly above it converges to
// the closed-form direct lighting solution.
#[test]
fn area_light_matches_closed_form() {
    let albedo = 0.5;
    let emitted = 5.0;
    let half_extent = 1.0;
    let height = 2.0;

    // Wound so the geometric normal faces the floor
    let light = quad(
        "light",
        [
            Vec3::new(-half_extent, height, -half_extent),
            Vec3::new(half_extent, height, -half_extent),
            Vec3::new(half_extent, height, half_extent),
            Vec3::new(-half_extent, height, half_extent),
        ],
        Material::default(),
        Vec3::splat(emitted),
    );
    let scene = Scene::new(vec![floor(albedo, Vec3::ZERO), light], Vec3::ZERO, 0.0).unwrap();

    let camera = Camera::new(looking_down());
    let integrator = Path::new(Params {
        max_depth: 3,
        rr_depth: 100,
    });
    let res = UVec2::new(3, 3);
    let mut film = Film::new(res);

    let frames = 10_000;
    for frame in 0..frames {
        render_frame(&scene, &camera, &integrator, &mut film, frame);
    }

    let measured = film.pixel(1, 1) / frames as f32;
    let expected = albedo * rect_light_irradiance(emitted, half_extent, half_extent, height)
        / std::f32::consts::PI;
    assert_relative_eq!(measured.x, expected, max_relative = 0.05);
    assert_relative_eq!(measured.y, expected, max_relative = 0.05);
    assert_relative_eq!(measured.z, expected, max_relative = 0.05);
}

// With no emitters and a constant environment, a diffuse floor under direct
// view converges to albedo * environment radiance.
#[test]
fn environment_furnace_converges_to_albedo() {
    let albedo = 0.5;
    let env = Vec3::ONE;
    let scene = Scene::new(vec![floor(albedo, Vec3::ZERO)], env, 0.3).unwrap();

    let camera = Camera::new(looking_down());
    let integrator = Path::new(Params {
        max_depth: 4,
        rr_depth: 100,
    });
    let res = UVec2::new(3, 3);
    let mut film = Film::new(res);

    let frames = 4_000;
    for frame in 0..frames {
        render_frame(&scene, &camera, &integrator, &mut film, frame);
    }

    let measured = film.pixel(1, 1) / frames as f32;
    assert_relative_eq!(measured.x, albedo, max_relative = 0.05);
    assert_relative_eq!(measured.y, albedo, max_relative = 0.05);
    assert_relative_eq!(measured.z, albedo, max_relative = 0.05);
}
