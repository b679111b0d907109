use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use bevy::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use crate::levels::{LevelId, LevelSettings};
use crate::physics::{MovementConfig, WorldBounds};

const DEFAULT_CONFIG_PATH: &str = "onboarding.json";
const DEFAULT_NARRATION_URL: &str = "http://localhost:8000";
const DEFAULT_NARRATION_TIMEOUT_SECS: f64 = 10.0;
const DEFAULT_API_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_API_RATE_LIMIT_PER_SEC: u32 = 180;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Contents of `onboarding.json`. Every field is optional.
#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct StartupConfig {
    pub window_title: Option<String>,
    pub background_color: Option<[f32; 3]>,
    pub movement: Option<MovementConfig>,
    pub narration_url: Option<String>,
    pub narration_timeout_secs: Option<f64>,
    pub start_level: Option<String>,
    pub api_addr: Option<String>,
    pub api_token: Option<String>,
    pub api_rate_limit_per_sec: Option<u32>,
    pub disable_api: Option<bool>,
}

pub fn config_path() -> String {
    std::env::var("ONBOARD_GAME_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

pub fn read_startup_config(path: impl AsRef<Path>) -> Result<StartupConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Read the startup file, falling back to defaults. A missing file is not
/// worth mentioning; a broken one is.
pub fn load_startup_config() -> StartupConfig {
    let path = config_path();
    match read_startup_config(&path) {
        Ok(cfg) => {
            println!("[Onboard] Loaded startup config from {}", path);
            cfg
        }
        Err(ConfigError::Read { .. }) => StartupConfig::default(),
        Err(e) => {
            eprintln!("[Onboard] {}", e);
            StartupConfig::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NarrationSettings {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiSettings {
    pub enabled: bool,
    pub addr: SocketAddr,
    pub token: Option<String>,
    pub rate_limit_per_sec: u32,
}

/// Resolved configuration for the whole session.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub window_title: String,
    pub background_color: [f32; 3],
    pub movement: MovementConfig,
    pub bounds: WorldBounds,
    pub start_level: LevelId,
    pub narration: NarrationSettings,
    pub api: ApiSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_title: "ACME Onboarding".to_string(),
            background_color: [0.93, 0.95, 0.98],
            movement: MovementConfig::default(),
            bounds: WorldBounds::default(),
            start_level: LevelId::Welcome,
            narration: NarrationSettings {
                base_url: DEFAULT_NARRATION_URL.to_string(),
                timeout: Duration::from_secs_f64(DEFAULT_NARRATION_TIMEOUT_SECS),
            },
            api: ApiSettings {
                enabled: true,
                addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
                token: None,
                rate_limit_per_sec: DEFAULT_API_RATE_LIMIT_PER_SEC,
            },
        }
    }
}

impl GameConfig {
    /// Merge the startup file with `ONBOARD_*` variables from `env`. Env
    /// wins over the file. Invalid values keep the default and are returned
    /// as errors for the caller to report.
    pub fn resolve(
        startup: StartupConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> (Self, Vec<ConfigError>) {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = GameConfig::default();
        let mut errors = Vec::new();

        if let Some(title) = startup.window_title {
            config.window_title = title;
        }
        if let Some(color) = startup.background_color {
            config.background_color = color;
        }
        if let Some(movement) = startup.movement {
            config.movement = movement;
        }

        if let Some(url) = env("ONBOARD_NARRATION_URL").or(startup.narration_url) {
            config.narration.base_url = url.trim_end_matches('/').to_string();
        }

        let timeout = match env("ONBOARD_NARRATION_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<f64>() {
                Ok(secs) => Some(secs),
                Err(_) => {
                    errors.push(ConfigError::Invalid {
                        key: "ONBOARD_NARRATION_TIMEOUT_SECS",
                        value: raw,
                    });
                    None
                }
            },
            None => startup.narration_timeout_secs,
        };
        if let Some(secs) = timeout {
            match Duration::try_from_secs_f64(secs) {
                Ok(duration) if !duration.is_zero() => config.narration.timeout = duration,
                _ => errors.push(ConfigError::Invalid {
                    key: "narration_timeout_secs",
                    value: secs.to_string(),
                }),
            }
        }

        if let Some(level) = env("ONBOARD_START_LEVEL").or(startup.start_level) {
            match level.parse::<LevelId>() {
                Ok(id) => config.start_level = id,
                Err(_) => errors.push(ConfigError::Invalid {
                    key: "start_level",
                    value: level,
                }),
            }
        }

        let addr = env("ONBOARD_API_ADDR")
            .or(startup.api_addr)
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());
        match addr.parse::<SocketAddr>() {
            Ok(parsed) => config.api.addr = parsed,
            Err(_) => errors.push(ConfigError::Invalid {
                key: "api_addr",
                value: addr,
            }),
        }

        config.api.token = env("ONBOARD_API_TOKEN").or(startup
            .api_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()));

        let rate = match env("ONBOARD_API_RATE_LIMIT_PER_SEC") {
            Some(raw) => raw.parse::<u32>().map_err(|_| ConfigError::Invalid {
                key: "ONBOARD_API_RATE_LIMIT_PER_SEC",
                value: raw,
            }),
            None => Ok(startup
                .api_rate_limit_per_sec
                .unwrap_or(DEFAULT_API_RATE_LIMIT_PER_SEC)),
        };
        match rate {
            Ok(rate) => config.api.rate_limit_per_sec = rate.max(1),
            Err(e) => errors.push(e),
        }

        let disabled = env("ONBOARD_DISABLE_API")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .or(startup.disable_api)
            .unwrap_or(false);
        config.api.enabled = !disabled;

        (config, errors)
    }

    pub fn level_settings(&self) -> LevelSettings {
        LevelSettings {
            movement: self.movement,
            bounds: self.bounds,
        }
    }
}
