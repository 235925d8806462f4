//! Terrain session: drives an external terrain engine and feeds the meshes it
//! builds into a shared scene, assigning materials and tracking the tiles
//! that take part in picking.

mod endpoints;
mod engine;
mod error;
mod projection;
mod session;

#[cfg(test)]
mod mock;

pub use endpoints::{DebugEndpoints, DebugLocation};
pub use engine::{
    EngineError, EngineOptions, RgbEventReceiver, RgbEventSender, RgbTerrainEvent, TerrainEngine,
    TerrainRequest, VectorReply, VectorReplySender, rgb_event_channel, vector_reply_channel,
};
pub use error::SessionError;
pub use projection::{GeoBounds, GeoCoord, TerrainProjection};
pub use session::{RgbLoad, TerrainSession, VectorLoad};
