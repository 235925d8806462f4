//! In-process terrain engine that builds flat tiles on worker threads.
//!
//! Stands in for a real tile provider: it honors the request geometry and
//! the configured sources, but every tile is a flat slab and every satellite
//! texture is a blank image labelled with its source path.

use std::sync::Arc;
use std::thread::JoinHandle;

use geoview_materials::{MaterialFactory, Texture};
use geoview_scene::{Aabb, Geometry, ObjectId, SceneObject};
use geoview_terrain::{
    EngineError, EngineOptions, GeoCoord, RgbEventSender, RgbTerrainEvent, TerrainEngine,
    TerrainProjection, TerrainRequest, VectorReply, vector_reply_channel,
};
use glam::Vec3;
use tracing::{debug, warn};

/// Zoom levels above this are refused.
const MAX_ZOOM: u8 = 15;

/// Satellite texture size in pixels.
const SATELLITE_TEXTURE_SIZE: u32 = 256;

/// Slab thickness as a fraction of the tile side.
const RELIEF: f32 = 0.02;

pub struct SyntheticEngine {
    options: EngineOptions,
    vector_source: String,
    rgb_source: String,
    satellite_source: String,
    workers: Vec<JoinHandle<()>>,
}

impl SyntheticEngine {
    /// Wait for every worker spawned so far to finish sending.
    pub fn join_workers(&mut self) {
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("terrain worker panicked");
            }
        }
    }

    fn check(&self, request: &TerrainRequest) -> Result<(), EngineError> {
        if request.zoom > MAX_ZOOM {
            return Err(EngineError::Rejected(format!(
                "zoom {} exceeds {MAX_ZOOM}",
                request.zoom
            )));
        }
        if !request.radius_km.is_finite() || request.radius_km <= 0.0 {
            return Err(EngineError::Rejected(format!(
                "radius {} km is not positive",
                request.radius_km
            )));
        }
        Ok(())
    }

    fn spawn(&mut self, job: impl FnOnce() + Send + 'static) -> Result<(), EngineError> {
        let worker = std::thread::Builder::new()
            .name("terrain-worker".into())
            .spawn(job)
            .map_err(|err| EngineError::Rejected(format!("worker spawn failed: {err}")))?;
        self.workers.push(worker);
        Ok(())
    }
}

/// Tiles per side for a zoom level.
fn tiles_per_side(zoom: u8) -> u32 {
    1 << zoom.saturating_sub(11).min(3)
}

fn slab(label: &str, side: f32) -> Arc<Geometry> {
    let half = side * 0.5;
    Arc::new(Geometry::new(
        label,
        Aabb::new(Vec3::new(-half, -half, 0.0), Vec3::new(half, half, side * RELIEF)),
    ))
}

fn build_vector(units_side: f32, source: &str) -> SceneObject {
    SceneObject::new("terrain-vector").with_geometry(slab(source, units_side))
}

/// One row of DEM tiles, west to east.
fn build_row(zoom: u8, row: u32, per_side: u32, units_side: f32) -> Vec<SceneObject> {
    let side = units_side / per_side as f32;
    let origin = -units_side * 0.5 + side * 0.5;
    (0..per_side)
        .map(|col| {
            let name = format!("dem-rgb-{zoom}-{col}-{row}");
            let center = Vec3::new(origin + side * col as f32, origin + side * row as f32, 0.0);
            SceneObject::new(name.clone())
                .with_geometry(slab(&name, side))
                .with_position(center)
        })
        .collect()
}

fn stream_rgb(
    request: TerrainRequest,
    units_side: f32,
    satellite_source: String,
    events: RgbEventSender,
) {
    let per_side = tiles_per_side(request.zoom);
    let mut tiles: Vec<ObjectId> = Vec::new();
    for row in 0..per_side {
        let batch = build_row(request.zoom, row, per_side, units_side);
        tiles.extend(batch.iter().map(SceneObject::id));
        if events.send(RgbTerrainEvent::DemTiles(batch)).is_err() {
            return;
        }
    }

    let mut factory = MaterialFactory::new();
    for tile in tiles {
        let texture = Texture::new(
            format!("{satellite_source}#{tile}"),
            SATELLITE_TEXTURE_SIZE,
            SATELLITE_TEXTURE_SIZE,
        );
        let material = factory.textured(Arc::new(texture));
        if events
            .send(RgbTerrainEvent::SatelliteReady { tile, material })
            .is_err()
        {
            return;
        }
    }
    debug!(tiles = per_side * per_side, "rgb stream complete");
}

impl TerrainEngine for SyntheticEngine {
    fn connect(options: EngineOptions) -> Result<Self, EngineError> {
        if !options.units_side.is_finite() || options.units_side <= 0.0 {
            return Err(EngineError::Rejected(format!(
                "units_side {} is not positive",
                options.units_side
            )));
        }
        Ok(Self {
            options,
            vector_source: "synthetic://vector".to_string(),
            rgb_source: "synthetic://rgb".to_string(),
            satellite_source: "synthetic://satellite".to_string(),
            workers: Vec::new(),
        })
    }

    fn projection(&self, origin: GeoCoord, radius_km: f64) -> TerrainProjection {
        TerrainProjection::centered(origin, radius_km, self.options.units_side)
    }

    fn request_vector_terrain(
        &mut self,
        request: &TerrainRequest,
    ) -> Result<VectorReply, EngineError> {
        self.check(request)?;
        let (sender, reply) = vector_reply_channel();
        let units_side = self.options.units_side;
        let source = self.vector_source.clone();
        self.spawn(move || {
            let _ = sender.send(Ok(build_vector(units_side, &source)));
        })?;
        Ok(reply)
    }

    fn request_rgb_terrain(
        &mut self,
        request: &TerrainRequest,
        events: RgbEventSender,
    ) -> Result<(), EngineError> {
        self.check(request)?;
        debug!(source = %self.rgb_source, zoom = request.zoom, "synthesizing rgb terrain");
        let request = *request;
        let units_side = self.options.units_side;
        let satellite_source = self.satellite_source.clone();
        self.spawn(move || stream_rgb(request, units_side, satellite_source, events))
    }

    fn set_vector_source(&mut self, path: &str) {
        self.vector_source = path.to_string();
    }

    fn set_rgb_source(&mut self, path: &str) {
        self.rgb_source = path.to_string();
    }

    fn set_satellite_source(&mut self, path: &str) {
        self.satellite_source = path.to_string();
    }
}
