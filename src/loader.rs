use std::path::{Path, PathBuf};

use glam::{Affine3A, Mat4, UVec2, Vec3};
use serde::Deserialize;

use crate::{
    camera::CameraParameters,
    integrator,
    materials::Material,
    scene::{LoadError, Model, Scene},
};

/// One mesh instance entry in a scene description file.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelEntry {
    mesh: PathBuf,
    #[serde(default)]
    material: Material,
    #[serde(default)]
    emission: Option<Vec3>,
    /// Row-major 4x4 affine transform
    #[serde(default)]
    transform: Option<[[f32; 4]; 4]>,
}

/// On-disk scene description. Unknown fields are user errors and abort the
/// load before rendering starts.
#[derive(Deserialize)]
#[serde(deny_unknown_fields, default)]
struct SceneFile {
    resolution: [u32; 2],
    camera: CameraParameters,
    max_depth: u32,
    rr_depth: u32,
    frames: u32,
    snapshot_interval: u32,
    env_radiance: Vec3,
    env_prob: f32,
    models: Vec<ModelEntry>,
}

impl Default for SceneFile {
    fn default() -> Self {
        Self {
            resolution: [640, 480],
            camera: CameraParameters::default(),
            max_depth: 6,
            rr_depth: 3,
            frames: 1024,
            snapshot_interval: 64,
            env_radiance: Vec3::ZERO,
            env_prob: 0.3,
            models: Vec::new(),
        }
    }
}

/// Everything needed to start a render session.
pub struct LoadedScene {
    pub scene: Scene,
    pub camera: CameraParameters,
    pub resolution: UVec2,
    pub params: integrator::Params,
    pub frames: u32,
    pub snapshot_interval: u32,
}

/// Loads a YAML scene description and the OBJ meshes it references.
/// Mesh paths are resolved relative to the description file.
pub fn load(path: &Path) -> Result<LoadedScene, LoadError> {
    let file: SceneFile = serde_yaml::from_str(&std::fs::read_to_string(path)?)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut models = Vec::with_capacity(file.models.len());
    for entry in file.models {
        let mesh_path = base.join(&entry.mesh);
        let name = entry.mesh.display().to_string();
        log::info!("Loading {}", name);
        let (positions, normals, triangles) = parse_obj(&mesh_path)?;
        models.push(Model {
            name,
            positions,
            normals,
            triangles,
            material: entry.material,
            emission: entry.emission.unwrap_or(Vec3::ZERO),
            transform: entry
                .transform
                .map(|rows| Affine3A::from_mat4(Mat4::from_cols_array_2d(&rows).transpose())),
        });
    }

    let scene = Scene::new(models, file.env_radiance, file.env_prob)?;
    Ok(LoadedScene {
        scene,
        camera: file.camera,
        resolution: UVec2::new(file.resolution[0], file.resolution[1]),
        params: integrator::Params {
            max_depth: file.max_depth,
            rr_depth: file.rr_depth,
        },
        frames: file.frames,
        snapshot_interval: file.snapshot_interval,
    })
}

/// Parses an OBJ mesh into the load contract: positions and normals of equal
/// non-zero length plus triangle index triples.
fn parse_obj(path: &Path) -> Result<(Vec<Vec3>, Vec<Vec3>, Vec<[u32; 3]>), LoadError> {
    let (meshes, _) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )?;

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut triangles = Vec::new();
    for mesh in meshes {
        let offset = positions.len() as u32;
        positions.extend(
            mesh.mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        );
        normals.extend(
            mesh.mesh
                .normals
                .chunks_exact(3)
                .map(|n| Vec3::new(n[0], n[1], n[2])),
        );
        triangles.extend(
            mesh.mesh
                .indices
                .chunks_exact(3)
                .map(|t| [offset + t[0], offset + t[1], offset + t[2]]),
        );
    }
    Ok((positions, normals, triangles))
}
