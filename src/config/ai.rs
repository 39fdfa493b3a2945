// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";

fn default_provider() -> String {
    "openai".to_string()
}
fn default_initial_temperature() -> f32 {
    0.7
}
fn default_refine_temperature() -> f32 {
    0.8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "openai" | "gemini" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Provider default when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from OPENAI_API_KEY / GEMINI_API_KEY (by provider)
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f32,
    #[serde(default = "default_refine_temperature")]
    pub refine_temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: None,
            api_key: String::new(),
            initial_temperature: default_initial_temperature(),
            refine_temperature: default_refine_temperature(),
        }
    }
}

impl AiConfig {
    /// `AI_CONFIG_PATH` or `config/ai.json`; a missing file means generation is disabled.
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var(ENV_AI_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_AI_CONFIG_PATH));
        if !path.exists() {
            tracing::info!(path = %path.display(), "AI config not found; generation disabled");
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let mut cfg: AiConfig = serde_json::from_str(data)?;

        // Normalize provider
        cfg.provider = cfg.provider.trim().to_lowercase();

        // Resolve api key if "ENV"; only required when generation is on
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            let var = match cfg.provider.as_str() {
                "openai" => "OPENAI_API_KEY",
                "gemini" => "GEMINI_API_KEY",
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
            cfg.api_key = match env::var(var) {
                Ok(k) => k,
                Err(_) if !cfg.enabled => String::new(),
                Err(_) => anyhow::bail!("Missing {var} env var"),
            };
        }

        // Sanitize temperatures
        if !(0.0..=2.0).contains(&cfg.initial_temperature) {
            cfg.initial_temperature = default_initial_temperature();
        }
        if !(0.0..=2.0).contains(&cfg.refine_temperature) {
            cfg.refine_temperature = default_refine_temperature();
        }

        Ok(cfg)
    }
}
