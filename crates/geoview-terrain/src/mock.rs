//! Scripted engine for session tests.
//!
//! Requests are recorded and their reply channels parked on the engine, so a
//! test decides when (and whether) each one resolves.

use std::sync::Arc;

use geoview_materials::{Material, MaterialFactory, Texture};
use geoview_scene::{Aabb, Geometry, SceneObject};
use glam::Vec3;

use crate::engine::{
    EngineError, EngineOptions, RgbEventSender, TerrainEngine, TerrainRequest, VectorReply,
    VectorReplySender, vector_reply_channel,
};
use crate::projection::{GeoCoord, TerrainProjection};

/// Token the mock refuses to connect with.
pub const REVOKED_TOKEN: &str = "pk.revoked";

#[derive(Debug)]
pub struct MockEngine {
    pub options: EngineOptions,
    pub requests: Vec<TerrainRequest>,
    /// Error returned by the next request, instead of accepting it.
    pub refuse_next: Option<EngineError>,
    /// Answer vector requests immediately with a flat tile.
    pub auto_vector: bool,
    pub vector_reply: Option<VectorReplySender>,
    pub rgb_events: Option<RgbEventSender>,
    pub vector_source: Option<String>,
    pub rgb_source: Option<String>,
    pub satellite_source: Option<String>,
}

impl TerrainEngine for MockEngine {
    fn connect(options: EngineOptions) -> Result<Self, EngineError> {
        if options.access_token == REVOKED_TOKEN {
            return Err(EngineError::Unauthorized);
        }
        Ok(Self {
            options,
            requests: Vec::new(),
            refuse_next: None,
            auto_vector: false,
            vector_reply: None,
            rgb_events: None,
            vector_source: None,
            rgb_source: None,
            satellite_source: None,
        })
    }

    fn projection(&self, origin: GeoCoord, radius_km: f64) -> TerrainProjection {
        TerrainProjection::centered(origin, radius_km, self.options.units_side)
    }

    fn request_vector_terrain(
        &mut self,
        request: &TerrainRequest,
    ) -> Result<VectorReply, EngineError> {
        if let Some(err) = self.refuse_next.take() {
            return Err(err);
        }
        self.requests.push(*request);
        let (sender, reply) = vector_reply_channel();
        if self.auto_vector {
            let _ = sender.send(Ok(tile("terrain-vector", 0.0)));
        } else {
            self.vector_reply = Some(sender);
        }
        Ok(reply)
    }

    fn request_rgb_terrain(
        &mut self,
        request: &TerrainRequest,
        events: RgbEventSender,
    ) -> Result<(), EngineError> {
        if let Some(err) = self.refuse_next.take() {
            return Err(err);
        }
        self.requests.push(*request);
        self.rgb_events = Some(events);
        Ok(())
    }

    fn set_vector_source(&mut self, path: &str) {
        self.vector_source = Some(path.to_string());
    }

    fn set_rgb_source(&mut self, path: &str) {
        self.rgb_source = Some(path.to_string());
    }

    fn set_satellite_source(&mut self, path: &str) {
        self.satellite_source = Some(path.to_string());
    }
}

/// Unit-sized tile centered at `(x, 0, 0)`.
pub fn tile(name: &str, x: f32) -> SceneObject {
    let bounds = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
    SceneObject::new(name)
        .with_geometry(Arc::new(Geometry::new(name, bounds)))
        .with_position(Vec3::new(x, 0.0, 0.0))
}

/// A satellite-textured material, as the engine would build one.
pub fn engine_material() -> Arc<Material> {
    MaterialFactory::new().textured(Arc::new(Texture::new("satellite", 256, 256)))
}
