//! Contract with the external terrain engine.
//!
//! The engine fetches tiles and builds meshes; the session only sees the
//! results. A vector request answers once through a oneshot channel. An RGB
//! request streams [`RgbTerrainEvent`]s: zero or more DEM batches, then one
//! satellite event per tile once its imagery is ready.

use std::sync::Arc;

use geoview_materials::Material;
use geoview_scene::{ObjectId, SceneObject};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::projection::{GeoCoord, TerrainProjection};

/// Failures reported by the terrain engine.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("terrain provider rejected the access token")]
    Unauthorized,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("tile fetch failed: {0}")]
    Fetch(String),
    #[error("engine dropped the request before completing it")]
    Disconnected,
}

/// Options handed to [`TerrainEngine::connect`].
#[derive(Clone, Debug, PartialEq)]
pub struct EngineOptions {
    pub access_token: String,
    /// Side length, in scene units, of the square covered by a request.
    pub units_side: f32,
}

/// A terrain area: a square of `2 * radius_km` around `origin`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainRequest {
    pub origin: GeoCoord,
    pub radius_km: f64,
    /// Map zoom level; higher means more, smaller tiles.
    pub zoom: u8,
}

impl TerrainRequest {
    pub fn new(origin: GeoCoord, radius_km: f64, zoom: u8) -> Self {
        Self {
            origin,
            radius_km,
            zoom,
        }
    }
}

/// Progress of an RGB terrain request.
#[derive(Debug)]
pub enum RgbTerrainEvent {
    /// A batch of freshly built DEM tile meshes.
    DemTiles(Vec<SceneObject>),
    /// Satellite imagery for a tile delivered earlier is ready, wrapped in
    /// an engine-built textured material.
    SatelliteReady {
        tile: ObjectId,
        material: Arc<Material>,
    },
    /// The request failed after it was accepted.
    Failed(EngineError),
}

pub type VectorReply = oneshot::Receiver<Result<SceneObject, EngineError>>;
pub type VectorReplySender = oneshot::Sender<Result<SceneObject, EngineError>>;
pub type RgbEventSender = mpsc::UnboundedSender<RgbTerrainEvent>;
pub type RgbEventReceiver = mpsc::UnboundedReceiver<RgbTerrainEvent>;

/// Channel pair for a vector request.
pub fn vector_reply_channel() -> (VectorReplySender, VectorReply) {
    oneshot::channel()
}

/// Channel pair for an RGB request.
pub fn rgb_event_channel() -> (RgbEventSender, RgbEventReceiver) {
    mpsc::unbounded_channel()
}

/// The terrain/geometry engine driven by a session.
///
/// Requests return as soon as the work is queued. An `Err` from a request
/// method means it was refused outright; failures after that arrive on the
/// reply channel.
pub trait TerrainEngine {
    fn connect(options: EngineOptions) -> Result<Self, EngineError>
    where
        Self: Sized;

    /// Mapping between geographic and scene coordinates for an area.
    fn projection(&self, origin: GeoCoord, radius_km: f64) -> TerrainProjection;

    fn request_vector_terrain(&mut self, request: &TerrainRequest)
    -> Result<VectorReply, EngineError>;

    fn request_rgb_terrain(
        &mut self,
        request: &TerrainRequest,
        events: RgbEventSender,
    ) -> Result<(), EngineError>;

    fn set_vector_source(&mut self, path: &str);
    fn set_rgb_source(&mut self, path: &str);
    fn set_satellite_source(&mut self, path: &str);
}
