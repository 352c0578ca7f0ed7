pub mod camera;
pub mod film;
pub mod heap;
pub mod integrator;
pub mod lights;
pub mod loader;
pub mod materials;
pub mod math;
pub mod renderer;
pub mod sampling;
pub mod scene;
