// src/config/pipeline.rs
//! Pipeline tuning loaded from `config/pipeline.toml`.
//!
//! Every key is optional. A missing file yields the built-in defaults so the
//! service starts on a bare checkout.

use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::sentiment::{Lexicon, SentimentAnalyzer};
use crate::stores::{StoreFeatureBuilder, DEFAULT_DENSITY_RADIUS};
use crate::weather::{
    WeatherFeatureBuilder, WeatherMode, DEFAULT_COLD_THRESHOLD, DEFAULT_HOURLY_WINDOW,
};

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";
pub const DEFAULT_SNAPSHOT_DIR: &str = "data/snapshots";

pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const ENV_PIPELINE_SNAPSHOT_DIR: &str = "PIPELINE_SNAPSHOT_DIR";

fn default_density_radius() -> f64 {
    DEFAULT_DENSITY_RADIUS
}
fn default_cold_threshold() -> f64 {
    DEFAULT_COLD_THRESHOLD
}
fn default_hourly_window() -> usize {
    DEFAULT_HOURLY_WINDOW
}
fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_DIR)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default)]
    pub stores: StoreSettings,
    #[serde(default)]
    pub weather: WeatherSettings,
    #[serde(default)]
    pub sentiment: SentimentSettings,
    #[serde(default)]
    pub snapshots: SnapshotSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Coordinate degrees.
    #[serde(default = "default_density_radius")]
    pub density_radius: f64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            density_radius: default_density_radius(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSettings {
    #[serde(default)]
    pub mode: WeatherMode,
    /// Celsius.
    #[serde(default = "default_cold_threshold")]
    pub cold_threshold: f64,
    /// Hourly samples aggregated in hourly mode.
    #[serde(default = "default_hourly_window")]
    pub hourly_window: usize,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            mode: WeatherMode::default(),
            cold_threshold: default_cold_threshold(),
            hourly_window: default_hourly_window(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentSettings {
    /// JSON `word -> valence` file; the compiled-in lexicon when absent.
    #[serde(default)]
    pub lexicon_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_snapshot_dir")]
    pub dir: PathBuf,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_snapshot_dir(),
        }
    }
}

impl PipelineSettings {
    /// Load from `PIPELINE_CONFIG_PATH` or `config/pipeline.toml`, then apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var(ENV_PIPELINE_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            info!(path = %path.display(), "pipeline config not found; using defaults");
            Self::default()
        };

        if let Ok(dir) = env::var(ENV_PIPELINE_SNAPSHOT_DIR) {
            if !dir.trim().is_empty() {
                cfg.snapshots.enabled = true;
                cfg.snapshots.dir = PathBuf::from(dir);
            }
        }
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline config at {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid pipeline config at {}", path.display()))
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let mut cfg: PipelineSettings = toml::from_str(toml_str)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Out-of-range numbers fall back to defaults.
    fn sanitize(&mut self) {
        if !self.stores.density_radius.is_finite() || self.stores.density_radius < 0.0 {
            warn!(
                value = self.stores.density_radius,
                "invalid density_radius; using default"
            );
            self.stores.density_radius = default_density_radius();
        }
        if !self.weather.cold_threshold.is_finite() {
            self.weather.cold_threshold = default_cold_threshold();
        }
        if self.weather.hourly_window == 0 {
            self.weather.hourly_window = default_hourly_window();
        }
    }

    pub fn store_builder(&self) -> StoreFeatureBuilder {
        StoreFeatureBuilder::new().with_radius(self.stores.density_radius)
    }

    pub fn weather_builder(&self) -> WeatherFeatureBuilder {
        WeatherFeatureBuilder::new()
            .with_mode(self.weather.mode)
            .with_cold_threshold(self.weather.cold_threshold)
            .with_hourly_window(self.weather.hourly_window)
    }

    pub fn analyzer(&self) -> anyhow::Result<SentimentAnalyzer> {
        let lexicon = match &self.sentiment.lexicon_path {
            Some(p) => Lexicon::from_path(p)?,
            None => Lexicon::builtin()?,
        };
        info!(words = lexicon.len(), "sentiment lexicon loaded");
        Ok(SentimentAnalyzer::new(lexicon))
    }

    /// Snapshot directory when snapshots are on.
    pub fn snapshot_dir(&self) -> Option<&Path> {
        self.snapshots.enabled.then_some(self.snapshots.dir.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = PipelineSettings::from_toml_str("").unwrap();
        assert_eq!(cfg.stores.density_radius, DEFAULT_DENSITY_RADIUS);
        assert_eq!(cfg.weather.mode, WeatherMode::Auto);
        assert_eq!(cfg.weather.cold_threshold, DEFAULT_COLD_THRESHOLD);
        assert_eq!(cfg.weather.hourly_window, DEFAULT_HOURLY_WINDOW);
        assert!(cfg.sentiment.lexicon_path.is_none());
        assert!(cfg.snapshot_dir().is_none());
    }

    #[test]
    fn sections_parse() {
        let cfg = PipelineSettings::from_toml_str(
            r#"
            [stores]
            density_radius = 0.05

            [weather]
            mode = "hourly"
            cold_threshold = 5.0
            hourly_window = 12

            [snapshots]
            enabled = true
            dir = "/tmp/snaps"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.stores.density_radius, 0.05);
        assert_eq!(cfg.weather.mode, WeatherMode::Hourly);
        assert_eq!(cfg.weather.hourly_window, 12);
        assert_eq!(cfg.snapshot_dir(), Some(Path::new("/tmp/snaps")));
    }

    #[test]
    fn bad_numbers_are_sanitized() {
        let cfg = PipelineSettings::from_toml_str(
            "[stores]\ndensity_radius = -1.0\n[weather]\nhourly_window = 0\n",
        )
        .unwrap();
        assert_eq!(cfg.stores.density_radius, DEFAULT_DENSITY_RADIUS);
        assert_eq!(cfg.weather.hourly_window, DEFAULT_HOURLY_WINDOW);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(PipelineSettings::from_toml_str("[weather]\nmode = \"weekly\"\n").is_err());
    }

    #[test]
    fn shipped_config_cold_threshold_applies_to_current_temperature() {
        let cfg = PipelineSettings::load_from_file(DEFAULT_PIPELINE_CONFIG_PATH).unwrap();
        assert_eq!(cfg.weather.cold_threshold, 10.0);
        let raw: crate::weather::RawWeather = serde_json::from_str(
            r#"{"current": {"temperature_2m": 9.5},
                "daily": {"temperature_2m_max": [30.0], "temperature_2m_min": [20.0]}}"#,
        )
        .unwrap();
        let f = cfg.weather_builder().build(&raw).unwrap();
        // Mild forecast average, cold right now.
        assert_eq!(f.avg_temp, Some(30.0));
        assert_eq!(f.temp_flag, crate::weather::TempFlag::Cold);
    }

    #[test]
    fn missing_lexicon_file_fails() {
        let mut cfg = PipelineSettings::default();
        cfg.sentiment.lexicon_path = Some(PathBuf::from("does/not/exist.json"));
        assert!(cfg.analyzer().is_err());
    }
}
