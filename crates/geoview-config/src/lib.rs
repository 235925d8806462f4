//! Configuration for the Geoview terrain viewer.
//!
//! Settings persist to disk as RON, can be overridden from the command line via
//! clap, and carry the terrain-provider access token the session needs before
//! it will talk to a terrain engine.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, SatelliteMaterial, ShadingConfig, TerrainConfig, default_config_dir,
};
pub use error::ConfigError;
