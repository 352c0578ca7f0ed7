use std::{path::Path, time::Instant};

use glam::UVec2;

use lumen::{
    camera::Camera,
    film::Film,
    integrator::{Params, Path as PathIntegrator},
    loader,
    renderer::render_frame,
    scene::Scene,
};

fn setup_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}:{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .chain(std::fs::File::create("lumen.log")?)
        .apply()?;
    Ok(())
}

fn write_snapshot(film: &Film, frame_count: u32, path: &str) {
    let res = film.res();
    let image = match image::RgbImage::from_raw(res.x, res.y, film.to_srgb(frame_count)) {
        Some(image) => image,
        None => panic!("Snapshot buffer does not match {}x{}", res.x, res.y),
    };
    if let Err(why) = image.save(path) {
        panic!("Snapshot write to {} failed: {}", path, why);
    }
}

fn main() {
    if let Err(why) = setup_logger() {
        panic!("{}", why);
    };

    let args: Vec<String> = std::env::args().collect();
    let (scene, camera_params, resolution, params, frames, snapshot_interval) =
        match args.get(1) {
            Some(path) => {
                let loaded = match loader::load(Path::new(path)) {
                    Ok(loaded) => loaded,
                    Err(why) => panic!("Scene loading failed: {}", why),
                };
                (
                    loaded.scene,
                    loaded.camera,
                    loaded.resolution,
                    loaded.params,
                    loaded.frames,
                    loaded.snapshot_interval,
                )
            }
            None => {
                log::info!("No scene file given, rendering the built-in Cornell box");
                let (scene, camera) = Scene::cornell();
                (
                    scene,
                    camera,
                    UVec2::new(512, 512),
                    Params::default(),
                    1024,
                    64,
                )
            }
        };

    let camera = Camera::new(camera_params);
    let integrator = PathIntegrator::new(params);
    let mut film = Film::new(resolution);

    log::info!(
        "Rendering {} frames at {}x{}",
        frames,
        resolution.x,
        resolution.y
    );
    let start = Instant::now();
    for frame in 0..frames {
        let frame_start = Instant::now();
        render_frame(&scene, &camera, &integrator, &mut film, frame);
        log::debug!(
            "Frame {} done in {:.2}ms",
            frame,
            frame_start.elapsed().as_secs_f32() * 1e3
        );

        let frame_count = frame + 1;
        if snapshot_interval > 0 && frame_count % snapshot_interval == 0 {
            write_snapshot(&film, frame_count, "lumen.png");
            log::info!(
                "{}/{} frames in {:.2}s",
                frame_count,
                frames,
                start.elapsed().as_secs_f32()
            );
        }
    }
    write_snapshot(&film, frames, "lumen.png");
    log::info!("Render finished in {:.2}s", start.elapsed().as_secs_f32());
}
