use glam::{Affine3A, Vec3};
use thiserror::Error;

use crate::{
    camera::CameraParameters,
    heap::{GeometryHeap, Vertex},
    materials::Material,
};

/// Parametric distance standing in for an unbounded ray.
pub const T_FAR: f32 = 1e30;
/// Offset applied to secondary ray origins to avoid self intersection.
pub const SHADOW_EPSILON: f32 = 1e-4;

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub o: Vec3,
    pub d: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    pub fn new(o: Vec3, d: Vec3, t_min: f32, t_max: f32) -> Self {
        Self { o, d, t_min, t_max }
    }
}

/// Closest-hit query result, enough to interpolate any per-vertex attribute.
#[derive(Copy, Clone, Debug)]
pub struct Hit {
    pub inst: u32,
    pub prim: u32,
    /// Barycentric weight of the triangle's second vertex
    pub u: f32,
    /// Barycentric weight of the triangle's third vertex
    pub v: f32,
    pub t: f32,
}

impl Hit {
    /// Interpolates a per-vertex attribute with this hit's barycentrics.
    pub fn lerp(&self, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
        (1.0 - self.u - self.v) * a + self.u * b + self.v * c
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read scene input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scene description: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse mesh: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("mesh '{name}' has {positions} positions but {normals} normals")]
    VertexNormalMismatch {
        name: String,
        positions: usize,
        normals: usize,
    },
    #[error("mesh '{name}' has no vertices")]
    EmptyMesh { name: String },
    #[error("mesh '{name}' is emissive but has no triangles")]
    EmptyEmitter { name: String },
    #[error("mesh '{name}' indexes vertex {index} but only has {count}")]
    IndexOutOfRange {
        name: String,
        index: u32,
        count: usize,
    },
}

/// Parsed mesh instance handed to [`Scene::new`] by a loader.
pub struct Model {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub material: Material,
    pub emission: Vec3,
    pub transform: Option<Affine3A>,
}

#[derive(Copy, Clone, Debug)]
struct Aabb {
    p_min: Vec3,
    p_max: Vec3,
}

impl Aabb {
    fn empty() -> Self {
        Self {
            p_min: Vec3::splat(f32::INFINITY),
            p_max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    fn grow(&mut self, p: Vec3) {
        self.p_min = self.p_min.min(p);
        self.p_max = self.p_max.max(p);
    }

    /// Slab test against `[ray.t_min, t_max)`.
    fn intersects(&self, ray: &Ray, t_max: f32) -> bool {
        let inv_d = ray.d.recip();
        let t0 = (self.p_min - ray.o) * inv_d;
        let t1 = (self.p_max - ray.o) * inv_d;
        let t_near = t0.min(t1).max_element().max(ray.t_min);
        let t_far = t0.max(t1).min_element().min(t_max);
        t_near <= t_far
    }
}

struct Instance {
    transform: Option<Affine3A>,
    // World space bounds for traversal early-out
    bounds: Aabb,
}

/// Immutable scene data shared read-only by all pixel tasks.
pub struct Scene {
    pub heap: GeometryHeap,
    instances: Vec<Instance>,
    pub materials: Vec<Material>,
    pub emission: Vec<Vec3>,
    pub triangle_counts: Vec<u32>,
    /// Instance ids with non-zero emission
    pub lights: Vec<u32>,
    pub env_radiance: Vec3,
    pub env_prob: f32,
}

impl Scene {
    /// Validates `models` and builds the heap, the light set and the
    /// per-instance lookup tables. Malformed input is fatal here, before any
    /// rendering begins.
    pub fn new(models: Vec<Model>, env_radiance: Vec3, env_prob: f32) -> Result<Self, LoadError> {
        let mut heap = GeometryHeap::new();
        let mut instances = Vec::with_capacity(models.len());
        let mut materials = Vec::with_capacity(models.len());
        let mut emission = Vec::with_capacity(models.len());
        let mut triangle_counts = Vec::with_capacity(models.len());
        let mut lights = Vec::new();

        for model in models {
            if model.positions.len() != model.normals.len() {
                return Err(LoadError::VertexNormalMismatch {
                    name: model.name,
                    positions: model.positions.len(),
                    normals: model.normals.len(),
                });
            }
            if model.positions.is_empty() {
                return Err(LoadError::EmptyMesh { name: model.name });
            }
            // The light sampler assumes every light set entry has triangles
            // to pick from
            if model.emission != Vec3::ZERO && model.triangles.is_empty() {
                return Err(LoadError::EmptyEmitter { name: model.name });
            }
            for tri in &model.triangles {
                for &i in tri {
                    if (i as usize) >= model.positions.len() {
                        return Err(LoadError::IndexOutOfRange {
                            name: model.name,
                            index: i,
                            count: model.positions.len(),
                        });
                    }
                }
            }

            let mut bounds = Aabb::empty();
            let vertices: Vec<Vertex> = model
                .positions
                .iter()
                .zip(model.normals.iter())
                .map(|(&p, &n)| {
                    let world_p = model
                        .transform
                        .map_or(p, |transform| transform.transform_point3(p));
                    bounds.grow(world_p);
                    Vertex { p, n }
                })
                .collect();
            let indices: Vec<u32> = model.triangles.iter().flatten().copied().collect();

            let id = heap.push_instance(indices, vertices);
            log::info!(
                "Scene: instance {} '{}' with {} triangles{}",
                id,
                model.name,
                model.triangles.len(),
                if model.emission != Vec3::ZERO {
                    " (light)"
                } else {
                    ""
                }
            );

            if model.emission != Vec3::ZERO {
                lights.push(id);
            }
            instances.push(Instance {
                transform: model.transform,
                bounds,
            });
            materials.push(model.material);
            emission.push(model.emission);
            triangle_counts.push(model.triangles.len() as u32);
        }

        Ok(Self {
            heap,
            instances,
            materials,
            emission,
            triangle_counts,
            lights,
            env_radiance,
            env_prob,
        })
    }

    /// World transform of `instance`, identity if unset. Applied lazily to
    /// object space attributes at each access instead of pre-baked.
    pub fn instance_transform(&self, instance: u32) -> Affine3A {
        self.instances[instance as usize]
            .transform
            .unwrap_or(Affine3A::IDENTITY)
    }

    /// World space positions of triangle `prim` of `instance`.
    pub fn triangle_positions(&self, instance: u32, prim: u32) -> [Vec3; 3] {
        let [i0, i1, i2] = self.heap.triangle(instance, prim);
        let vertices = self.heap.vertices(instance);
        let transform = self.instance_transform(instance);
        [
            transform.transform_point3(vertices[i0 as usize].p),
            transform.transform_point3(vertices[i1 as usize].p),
            transform.transform_point3(vertices[i2 as usize].p),
        ]
    }

    /// Nearest intersection within `[ray.t_min, ray.t_max)`, or `None`.
    pub fn trace_closest(&self, ray: &Ray) -> Option<Hit> {
        let mut closest = None;
        let mut t_max = ray.t_max;
        for inst in 0..self.instances.len() as u32 {
            if !self.instances[inst as usize].bounds.intersects(ray, t_max) {
                continue;
            }
            for prim in 0..self.triangle_counts[inst as usize] {
                let [p0, p1, p2] = self.triangle_positions(inst, prim);
                if let Some((t, u, v)) = intersect_triangle(ray, t_max, p0, p1, p2) {
                    t_max = t;
                    closest = Some(Hit {
                        inst,
                        prim,
                        u,
                        v,
                        t,
                    });
                }
            }
        }
        closest
    }

    /// Existence query for any intersection within `[ray.t_min, ray.t_max)`.
    /// Terminates on the first hit found, so the hit identity is unspecified;
    /// use for occlusion only.
    pub fn trace_any(&self, ray: &Ray) -> bool {
        for inst in 0..self.instances.len() as u32 {
            if !self.instances[inst as usize].bounds.intersects(ray, ray.t_max) {
                continue;
            }
            for prim in 0..self.triangle_counts[inst as usize] {
                let [p0, p1, p2] = self.triangle_positions(inst, prim);
                if intersect_triangle(ray, ray.t_max, p0, p1, p2).is_some() {
                    return true;
                }
            }
        }
        false
    }

    /// The classic Cornell box with an emissive ceiling quad.
    // Lifted from http://www.graphics.cornell.edu/online/box/data.html
    pub fn cornell() -> (Scene, CameraParameters) {
        let white = Material {
            base_color: Vec3::splat(180.0 / 255.0),
            ..Material::default()
        };
        let red = Material {
            base_color: Vec3::new(180.0, 0.0, 0.0) / 255.0,
            ..Material::default()
        };
        let green = Material {
            base_color: Vec3::new(0.0, 180.0, 0.0) / 255.0,
            ..Material::default()
        };

        let mut models = vec![
            // Floor
            quad(
                "floor",
                [
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(556.0, 0.0, 0.0),
                    Vec3::new(556.0, 0.0, -559.2),
                    Vec3::new(0.0, 0.0, -559.2),
                ],
                white,
                Vec3::ZERO,
            ),
            // Ceiling
            quad(
                "ceiling",
                [
                    Vec3::new(0.0, 548.8, 0.0),
                    Vec3::new(0.0, 548.8, -559.2),
                    Vec3::new(556.0, 548.8, -559.2),
                    Vec3::new(556.0, 548.8, 0.0),
                ],
                white,
                Vec3::ZERO,
            ),
            // Back wall
            quad(
                "back wall",
                [
                    Vec3::new(0.0, 0.0, -559.2),
                    Vec3::new(556.0, 0.0, -559.2),
                    Vec3::new(556.0, 548.8, -559.2),
                    Vec3::new(0.0, 548.8, -559.2),
                ],
                white,
                Vec3::ZERO,
            ),
            // Left wall
            quad(
                "left wall",
                [
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(0.0, 0.0, -559.2),
                    Vec3::new(0.0, 548.8, -559.2),
                    Vec3::new(0.0, 548.8, 0.0),
                ],
                red,
                Vec3::ZERO,
            ),
            // Right wall
            quad(
                "right wall",
                [
                    Vec3::new(556.0, 0.0, 0.0),
                    Vec3::new(556.0, 548.8, 0.0),
                    Vec3::new(556.0, 548.8, -559.2),
                    Vec3::new(556.0, 0.0, -559.2),
                ],
                green,
                Vec3::ZERO,
            ),
        ];

        // Tall box, top face and four sides
        {
            let top = [
                Vec3::new(423.0, 330.0, -247.0),
                Vec3::new(265.0, 330.0, -296.0),
                Vec3::new(314.0, 330.0, -456.0),
                Vec3::new(472.0, 330.0, -406.0),
            ];
            models.push(quad(
                "tall box top",
                [top[0], top[3], top[2], top[1]],
                white,
                Vec3::ZERO,
            ));
            for i in 0..4 {
                let a = top[i];
                let b = top[(i + 1) % 4];
                let a0 = Vec3::new(a.x, 0.0, a.z);
                let b0 = Vec3::new(b.x, 0.0, b.z);
                models.push(quad("tall box side", [a0, b0, b, a], white, Vec3::ZERO));
            }
        }

        // Ceiling light, radiance from total emitted power
        let radiance = {
            let area = 250.0 * 250.0;
            let power = 2_000_000.0;
            power / (area * std::f32::consts::PI)
        };
        models.push(quad(
            "light",
            [
                Vec3::new(163.0, 548.5, -154.0),
                Vec3::new(163.0, 548.5, -404.0),
                Vec3::new(413.0, 548.5, -404.0),
                Vec3::new(413.0, 548.5, -154.0),
            ],
            white,
            Vec3::splat(radiance),
        ));

        let scene =
            Scene::new(models, Vec3::ZERO, 0.0).expect("built-in scene data is valid");
        let camera = CameraParameters {
            position: Vec3::new(278.0, 273.0, 800.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: 40.0,
        };
        (scene, camera)
    }
}

/// Two-triangle quad with the geometric normal of its winding used as the
/// shading normal of all four vertices.
pub fn quad(name: &str, p: [Vec3; 4], material: Material, emission: Vec3) -> Model {
    let n = (p[1] - p[0]).cross(p[2] - p[0]).normalize();
    Model {
        name: name.into(),
        positions: p.to_vec(),
        normals: vec![n; 4],
        triangles: vec![[0, 1, 2], [0, 2, 3]],
        material,
        emission,
        transform: None,
    }
}

fn max_dimension(v: Vec3) -> usize {
    if v.x > v.y {
        if v.x > v.z {
            0
        } else {
            2
        }
    } else if v.y > v.z {
        1
    } else {
        2
    }
}

fn permute(v: Vec3, kx: usize, ky: usize, kz: usize) -> Vec3 {
    Vec3::new(v[kx], v[ky], v[kz])
}

/// pbrt's ray-triangle test, performed in a coordinate space where the ray
/// lies on the +z axis. This way we don't get incorrect misses e.g. on rays
/// that intersect directly on an edge.
///
/// Returns `(t, u, v)` with `u`, `v` the barycentric weights of `p1`, `p2`.
fn intersect_triangle(
    ray: &Ray,
    t_max: f32,
    p0: Vec3,
    p1: Vec3,
    p2: Vec3,
) -> Option<(f32, f32, f32)> {
    // Do things in relation to ray's origin
    let mut p0t = p0 - ray.o;
    let mut p1t = p1 - ray.o;
    let mut p2t = p2 - ray.o;

    // Permute direction so that Z is largest
    // This ensures there is a non-zero magnitude on Z
    let kz = max_dimension(ray.d.abs());
    let kx = if kz < 2 { kz + 1 } else { 0 };
    let ky = if kx < 2 { kx + 1 } else { 0 };
    p0t = permute(p0t, kx, ky, kz);
    p1t = permute(p1t, kx, ky, kz);
    p2t = permute(p2t, kx, ky, kz);
    let d = permute(ray.d, kx, ky, kz);

    // Shear to get +Z forward
    // Defer shearing Z since we won't need it if we don't intersect
    let sx = -d.x / d.z;
    let sy = -d.y / d.z;
    let sz = 1.0 / d.z;
    p0t.x += sx * p0t.z;
    p0t.y += sy * p0t.z;
    p1t.x += sx * p1t.z;
    p1t.y += sy * p1t.z;
    p2t.x += sx * p2t.z;
    p2t.y += sy * p2t.z;

    // Edge coefficients
    let (e0, e1, e2) = {
        // No need for Z since we know d is on +Z
        let e0 = p1t.x * p2t.y - p1t.y * p2t.x;
        let e1 = p2t.x * p0t.y - p2t.y * p0t.x;
        let e2 = p0t.x * p1t.y - p0t.y * p1t.x;

        // Fall back to f64 if we're exactly on any edge
        if (e0 == 0.0) || (e1 == 0.0) || (e2 == 0.0) {
            let e0 = f64::from(p1t.x) * f64::from(p2t.y) - f64::from(p1t.y) * f64::from(p2t.x);
            let e1 = f64::from(p2t.x) * f64::from(p0t.y) - f64::from(p2t.y) * f64::from(p0t.x);
            let e2 = f64::from(p0t.x) * f64::from(p1t.y) - f64::from(p0t.y) * f64::from(p1t.x);
            (e0 as f32, e1 as f32, e2 as f32)
        } else {
            (e0, e1, e2)
        }
    };

    // Edge test, i.e. if we miss the triangle
    if ((e0 < 0.0) || (e1 < 0.0) || (e2 < 0.0)) && ((e0 > 0.0) || (e1 > 0.0) || (e2 > 0.0)) {
        return None;
    }

    // Determinant test, i.e. if we hit the triangle edge-on
    let det = e0 + e1 + e2;
    if det == 0.0 {
        return None;
    }

    // Scaled hit distance
    let p0z = p0t.z * sz;
    let p1z = p1t.z * sz;
    let p2z = p2t.z * sz;
    let t_scaled = e0 * p0z + e1 * p1z + e2 * p2z;

    let inv_det = 1.0 / det;
    let t = t_scaled * inv_det;
    if t < ray.t_min || t >= t_max {
        return None;
    }

    Some((t, e1 * inv_det, e2 * inv_det))
}
