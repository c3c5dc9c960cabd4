use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::ResourceKind;

pub const DEFAULT_STACK_CAPACITY: u32 = 99;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tile size must be non-zero, got {width}x{height}")]
    InvalidTileSize { width: u32, height: u32 },
    #[error("sprite frame size must be non-zero, got {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },
    #[error("map dimensions must be positive, got {width}x{height}")]
    InvalidMapDimensions { width: i32, height: i32 },
    #[error("{field} must be finite and positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path} at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Terrain noise and smoothing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub height_octaves: u32,
    pub height_persistence: f64,
    pub moisture_octaves: u32,
    pub moisture_persistence: f64,
    pub lacunarity: f64,
    pub height_scale_factor: f64,
    pub moisture_scale_factor: f64,
    pub shore_falloff: f64,
    pub smoothing_passes: u32,
    pub water_level: f64,
    pub sand_level: f64,
    pub highland_level: f64,
    pub rock_level: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            height_octaves: 4,
            height_persistence: 0.5,
            moisture_octaves: 3,
            moisture_persistence: 0.6,
            lacunarity: 2.0,
            height_scale_factor: 0.6,
            moisture_scale_factor: 0.45,
            shore_falloff: 0.6,
            smoothing_passes: 2,
            water_level: 0.36,
            sand_level: 0.41,
            highland_level: 0.57,
            rock_level: 0.64,
        }
    }
}

/// Every tunable of the engine. Passed by reference; never global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tile_width_px: u32,
    pub tile_height_px: u32,
    pub sprite_frame_width_px: u32,
    pub sprite_frame_height_px: u32,
    pub map_width: i32,
    pub map_height: i32,
    pub seed: u64,
    pub terrain: TerrainConfig,
    pub player_speed: f32,
    pub companion_speed: f32,
    pub follow_radius: f32,
    pub interaction_range: f32,
    pub animation_frame_seconds: f32,
    pub hunger_per_second: f32,
    pub hunger_relief_per_feed: f32,
    pub player_hunger_per_second: f32,
    pub player_meal_relief: f32,
    pub inventory_capacities: BTreeMap<ResourceKind, u32>,
    pub default_capacity: Option<u32>,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta_ms: u64,
    pub max_ticks_per_frame: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_width_px: 64,
            tile_height_px: 32,
            sprite_frame_width_px: 64,
            sprite_frame_height_px: 64,
            map_width: 32,
            map_height: 32,
            seed: 42,
            terrain: TerrainConfig::default(),
            player_speed: 3.5,
            companion_speed: 3.0,
            follow_radius: 3.0,
            interaction_range: 1.5,
            animation_frame_seconds: 0.15,
            hunger_per_second: 0.01,
            hunger_relief_per_feed: 0.4,
            player_hunger_per_second: 0.0005,
            player_meal_relief: 0.3,
            inventory_capacities: BTreeMap::new(),
            default_capacity: Some(DEFAULT_STACK_CAPACITY),
            window_title: "Isoworld".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta_ms: 250,
            max_ticks_per_frame: 5,
        }
    }
}

impl EngineConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw).map_err(|(json_path, source)| ConfigError::Parse {
            path: path.to_path_buf(),
            json_path,
            source,
        })
    }

    fn from_json_str(raw: &str) -> Result<Self, (String, serde_json::Error)> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, EngineConfig>(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            (path, error.into_inner())
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_width_px == 0 || self.tile_height_px == 0 {
            return Err(ConfigError::InvalidTileSize {
                width: self.tile_width_px,
                height: self.tile_height_px,
            });
        }
        if self.sprite_frame_width_px == 0 || self.sprite_frame_height_px == 0 {
            return Err(ConfigError::InvalidFrameSize {
                width: self.sprite_frame_width_px,
                height: self.sprite_frame_height_px,
            });
        }
        if self.map_width <= 0 || self.map_height <= 0 {
            return Err(ConfigError::InvalidMapDimensions {
                width: self.map_width,
                height: self.map_height,
            });
        }
        for (field, value) in [
            ("player_speed", self.player_speed),
            ("companion_speed", self.companion_speed),
            ("follow_radius", self.follow_radius),
            ("interaction_range", self.interaction_range),
            ("animation_frame_seconds", self.animation_frame_seconds),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }

    pub fn sprite_frame_size(&self) -> (u32, u32) {
        (self.sprite_frame_width_px, self.sprite_frame_height_px)
    }

    pub fn fixed_dt(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_tps.max(1) as f64)
    }

    pub fn max_frame_delta(&self) -> Duration {
        if self.max_frame_delta_ms == 0 {
            Duration::from_millis(250)
        } else {
            Duration::from_millis(self.max_frame_delta_ms)
        }
    }
}
