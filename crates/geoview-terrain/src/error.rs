use geoview_config::ConfigError;
use geoview_materials::MaterialError;
use thiserror::Error;

use crate::engine::EngineError;

/// Errors from opening or driving a [`TerrainSession`](crate::TerrainSession).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid material settings: {0}")]
    Material(#[from] MaterialError),

    #[error("terrain engine refused to connect: {0}")]
    Connect(#[source] EngineError),

    /// The engine refused a request before any work started.
    #[error("terrain request refused: {0}")]
    Request(#[source] EngineError),

    /// An accepted request failed while loading.
    #[error("terrain load failed: {0}")]
    Fetch(#[source] EngineError),
}
