//! Configuration system for the risk-zone map renderer
//!
//! This module provides a hierarchical configuration that can be built from
//! presets, tweaked in code, or loaded from a JSON file. Missing fields in a
//! file fall back to the defaults of their section.

use crate::core::constants::{
    DEFAULT_PREDICTION_BASE_URL, DEFAULT_RADIUS_METERS, DEFAULT_SURFACE_SIZE, DEFAULT_ZOOM,
    MAX_ZOOM, OSM_TILE_TEMPLATE, TILE_SIZE, USER_AGENT, ZIPPOPOTAM_BASE_URL,
};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RiskMapProfile {
    /// OpenStreetMap tiles, zoom 13, 5 km disc
    Standard,
    /// Nothing leaves the machine: tiles come from a local tile server
    Offline,
    /// Closer zoom, larger surface, more parallel tile fetches
    HighDetail,
    Custom(RiskMapConfig),
}

impl RiskMapProfile {
    pub fn resolve(&self) -> RiskMapConfig {
        match self {
            Self::Standard => RiskMapConfig::default(),
            Self::Offline => RiskMapConfig {
                tiles: TileLoadingConfig {
                    url_template: "http://localhost:8080/tile/{z}/{x}/{y}.png".to_string(),
                    max_concurrent: 4,
                    timeout_ms: 2_000,
                    ..TileLoadingConfig::default()
                },
                api: ApiConfig {
                    geocode_base_url: "http://localhost:8081".to_string(),
                    ..ApiConfig::default()
                },
                ..RiskMapConfig::default()
            },
            Self::HighDetail => RiskMapConfig {
                tiles: TileLoadingConfig {
                    max_concurrent: 16,
                    ..TileLoadingConfig::default()
                },
                map: MapDefaults {
                    zoom: 15,
                    radius_meters: 1_500.0,
                    width: 1280,
                    height: 960,
                    ..MapDefaults::default()
                },
                ..RiskMapConfig::default()
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for RiskMapProfile {
    fn default() -> Self {
        Self::Standard
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskMapConfig {
    pub tiles: TileLoadingConfig,
    pub map: MapDefaults,
    pub style: StyleConfig,
    pub api: ApiConfig,
}

/// Where tiles come from and how they are requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLoadingConfig {
    /// URL with `{z}`, `{x}`, `{y}` and optional `{s}` placeholders
    pub url_template: String,
    /// Rotated into `{s}` by tile position
    pub subdomains: Vec<String>,
    pub user_agent: String,
    /// Per-request timeout; a hung tile fails instead of stalling the render
    pub timeout_ms: u64,
    /// Maximum concurrent tile downloads
    pub max_concurrent: usize,
}

impl Default for TileLoadingConfig {
    fn default() -> Self {
        Self {
            url_template: OSM_TILE_TEMPLATE.to_string(),
            subdomains: Vec::new(),
            user_agent: USER_AGENT.to_string(),
            timeout_ms: 10_000,
            max_concurrent: 8,
        }
    }
}

impl TileLoadingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// View used when the caller does not specify one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapDefaults {
    pub zoom: u8,
    pub radius_meters: f64,
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
}

impl Default for MapDefaults {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            radius_meters: DEFAULT_RADIUS_METERS,
            width: DEFAULT_SURFACE_SIZE.0,
            height: DEFAULT_SURFACE_SIZE.1,
            tile_size: TILE_SIZE,
        }
    }
}

/// Colors are RGB triples; alpha only applies to the disc fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub background: [u8; 3],
    pub disc_fill: [u8; 3],
    pub disc_alpha: u8,
    pub outline: [u8; 3],
    pub outline_width: u32,
    pub marker_fill: [u8; 3],
    pub marker_outline: [u8; 3],
    pub marker_radius: u32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background: [229, 231, 235],
            disc_fill: [239, 68, 68],
            disc_alpha: 64,
            outline: [255, 255, 255],
            outline_width: 2,
            marker_fill: [220, 38, 38],
            marker_outline: [127, 29, 29],
            marker_radius: 6,
        }
    }
}

/// External HTTP services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub geocode_base_url: String,
    pub prediction_base_url: String,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            geocode_base_url: ZIPPOPOTAM_BASE_URL.to_string(),
            prediction_base_url: DEFAULT_PREDICTION_BASE_URL.to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RiskMapConfig {
    /// Reads a JSON config file; absent fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::debug!("loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the renderer cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(MapError::InvalidConfig(msg.to_string()));

        if self.map.width == 0 || self.map.height == 0 {
            return invalid("surface width and height must be non-zero");
        }
        if self.map.tile_size == 0 {
            return invalid("tile size must be non-zero");
        }
        if self.map.zoom > MAX_ZOOM {
            return Err(MapError::InvalidConfig(format!(
                "zoom {} exceeds maximum {}",
                self.map.zoom, MAX_ZOOM
            )));
        }
        if self.map.radius_meters.is_nan() || self.map.radius_meters <= 0.0 {
            return invalid("radius must be positive");
        }
        if self.tiles.max_concurrent == 0 {
            return invalid("max_concurrent must be at least 1");
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.tiles.url_template.contains(placeholder) {
                return Err(MapError::InvalidConfig(format!(
                    "tile url template is missing {}",
                    placeholder
                )));
            }
        }
        if self.tiles.url_template.contains("{s}") && self.tiles.subdomains.is_empty() {
            return invalid("tile url template uses {s} but no subdomains are configured");
        }
        Ok(())
    }
}
