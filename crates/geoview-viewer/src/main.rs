//! Geoview: load terrain around a location, pick a tile, and tear it down.
//!
//! Drives a terrain session against the in-process synthetic engine and logs
//! each step. Rendering is left to the host application; redraw requests are
//! counted instead.
//!
//! Run with: `cargo run -p geoview-viewer -- --token <token> --title "Mt. Eiger"`

mod synthetic;

use std::cell::Cell;

use clap::Parser;
use geoview_config::{CliArgs, Config, default_config_dir};
use geoview_scene::{Camera, ReleaseLog, Scene};
use geoview_terrain::{GeoCoord, SessionError, TerrainProjection, TerrainRequest, TerrainSession};
use glam::{DVec2, Vec2, Vec3};
use tracing::{error, info, warn};

use crate::synthetic::SyntheticEngine;

type Session = TerrainSession<SyntheticEngine, ReleaseLog>;

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let loaded = Config::load_or_create(&config_dir);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    config.apply_cli_overrides(&args);

    geoview_log::init_logging(None, cfg!(debug_assertions), Some(&config));

    if let Err(err) = &loaded {
        warn!("Config at {} unusable, using defaults: {err}", config_dir.display());
    }
    info!("Geoview terrain viewer");

    if let Err(err) = run(&args, &config) {
        error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: &CliArgs, config: &Config) -> Result<(), SessionError> {
    let scene = Scene::shared();
    let camera = Camera::default()
        .look_at(Vec3::new(0.0, -0.8, 0.8), Vec3::ZERO)
        .shared();
    let mut session: Session = TerrainSession::new(scene, config, camera, ReleaseLog::new())?;

    let origin = GeoCoord::new(args.lat, args.lng);
    let request = TerrainRequest::new(origin, args.radius, args.zoom);
    let projection = session.projection(origin, args.radius);
    info!(
        "Area: {:.4},{:.4} to {:.4},{:.4} ({:.2e} units/m)",
        projection.bbox.south,
        projection.bbox.west,
        projection.bbox.north,
        projection.bbox.east,
        projection.units_per_meter,
    );

    let redraws = Cell::new(0u32);
    let redraw = || redraws.set(redraws.get() + 1);

    pollster::block_on(session.load_vector_terrain(request, redraw))?;
    let mut rgb = pollster::block_on(session.load_rgb_terrain(request, redraw))?;
    session.engine_mut().join_workers();
    session.pump_rgb_events(&mut rgb, redraw)?;
    info!(
        "Loaded {} DEM tiles, {} textured, {} redraws",
        rgb.dem_tiles().len(),
        rgb.textured_tiles().len(),
        redraws.get(),
    );

    pick_center(&session, &projection);

    session.camera().borrow_mut().position = Vec3::new(0.0, -0.4, 0.4);
    let updated = session.sync_camera_uniforms();
    info!("Camera moved; refreshed {updated} distance-shaded materials");

    teardown(&mut session);
    Ok(())
}

fn pick_center(session: &Session, projection: &TerrainProjection) {
    let Some(ray) = session.camera().borrow().ray_through(Vec2::ZERO) else {
        warn!("Camera produced no picking ray");
        return;
    };
    match session.pick(ray) {
        Some(hit) => {
            let scene = session.scene().borrow();
            let name = scene.get(hit.object).map_or("?", |object| object.name.as_str());
            let coord = projection.unproject(DVec2::new(
                f64::from(hit.point.x),
                f64::from(hit.point.y),
            ));
            info!(
                "Picked {name} at {:.3} units ({:.5}, {:.5})",
                hit.distance, coord.lat, coord.lng
            );
        }
        None => info!("Center ray hit no terrain tile"),
    }
}

fn teardown(session: &mut Session) {
    let disposed = session.clear_materials();
    session.clear_interactives();

    let ids = session.scene().borrow().ids().to_vec();
    for id in ids {
        let removed = session.scene().borrow_mut().remove(id);
        if let Some(object) = removed {
            session.dispose_object(&object);
        }
    }

    let released = session.disposer().backend();
    info!(
        "Disposed {disposed} plane materials; {} releases in total",
        released.events.len()
    );
}
