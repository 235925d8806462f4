//! Command-line argument parsing for the viewer.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Geoview command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "geoview", about = "Interactive terrain viewer")]
pub struct CliArgs {
    /// Latitude of the terrain origin in degrees.
    #[arg(long, default_value_t = 46.5763, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the terrain origin in degrees.
    #[arg(long, default_value_t = 7.9904, allow_negative_numbers = true)]
    pub lng: f64,

    /// Radius of the terrain area in kilometers.
    #[arg(long, default_value_t = 5.0)]
    pub radius: f64,

    /// Tile zoom level.
    #[arg(long, default_value_t = 12)]
    pub zoom: u8,

    /// Terrain-provider access token.
    #[arg(long, env = "GEOVIEW_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Location title; points the terrain sources at the local debug cache.
    #[arg(long)]
    pub title: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref token) = args.token {
            self.terrain.access_token = Some(token.clone());
        }
        if let Some(ref title) = args.title {
            self.debug.debug_title = Some(title.clone());
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
