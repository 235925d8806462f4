//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Terrain engine settings.
    pub terrain: TerrainConfig,
    /// Distance shading applied to satellite planes.
    pub shading: ShadingConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Which material replaces the engine's satellite material on terrain planes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum SatelliteMaterial {
    /// Color by camera distance using [`ShadingConfig`].
    #[default]
    DistanceShaded,
    /// Flat color, full opacity.
    ConstantColor([f32; 3]),
    /// Keep the satellite-textured material the engine produced.
    EngineTexture,
}

/// Terrain engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Terrain-provider access token. Required to open a session.
    pub access_token: Option<String>,
    /// Scene units spanning one side of the requested terrain area.
    pub units_side: f32,
    /// Root directory of the local tile cache used by debug endpoints.
    pub cache_root: String,
    /// Material strategy for satellite planes.
    pub satellite_material: SatelliteMaterial,
}

/// Distance shading parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShadingConfig {
    /// Linear RGB at `min_depth`.
    pub near_color: [f32; 3],
    /// Linear RGB at `max_depth`.
    pub far_color: [f32; 3],
    /// Camera distance mapped to `near_color`.
    pub min_depth: f32,
    /// Camera distance mapped to `far_color`. Must exceed `min_depth`.
    pub max_depth: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// When set, terrain sources point at the local cache for this location title.
    pub debug_title: Option<String>,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            units_side: 1.0,
            cache_root: "../../cache".to_string(),
            satellite_material: SatelliteMaterial::default(),
        }
    }
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            near_color: [0.0, 0.0, 1.0],
            far_color: [1.0, 0.0, 0.0],
            min_depth: 0.0,
            max_depth: 1.9,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_title: None,
        }
    }
}

impl TerrainConfig {
    /// The configured access token.
    ///
    /// Empty or whitespace-only tokens are treated as missing.
    pub fn access_token(&self) -> Result<&str, ConfigError> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingAccessToken)
    }
}

/// Default per-user config directory (`<config dir>/geoview`).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geoview")
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    ///
    /// The access token is never written back; it is expected to come from the
    /// environment or the command line.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let mut persisted = self.clone();
        persisted.terrain.access_token = None;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(&persisted, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    ///
    /// The in-memory access token is carried over when the file has none.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let mut new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        if new_config.terrain.access_token.is_none() {
            new_config.terrain.access_token = self.terrain.access_token.clone();
        }

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
