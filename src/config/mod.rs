//! Configuration module - environment variable parsing

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::game::RoundConfig;
use crate::util::time::{millis_to_ticks, SIMULATION_TPS};

/// Largest accepted world dimension
const MAX_WORLD_SIZE: f32 = 10_000.0;
const WIND_SPEED_LIMIT: f32 = 1_000.0;
const MAX_TPS: u32 = 1_000;
/// Ten minutes
const MAX_AI_DELAY_MS: u64 = 600_000;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Seed for terrain, wind and AI jitter; random when unset
    pub seed: u64,
    /// Frames per second of the session loop
    pub tps: u32,
    /// Sleep between frames; when false the session runs flat out
    pub realtime: bool,
    /// Hard stop for headless sessions
    pub max_ticks: u64,

    /// Save slot location
    pub save_path: PathBuf,
    /// Save after every turn change
    pub autosave: bool,

    /// Gameplay constants
    pub round: RoundConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tps: u32 = parse_or(&lookup, "SIMULATION_TPS", SIMULATION_TPS)?;
        if tps == 0 || tps > MAX_TPS {
            return Err(invalid("SIMULATION_TPS", tps));
        }

        let mut round = RoundConfig::default();
        round.terrain.world_width = parse_or(&lookup, "WORLD_WIDTH", round.terrain.world_width)?;
        round.terrain.world_height = parse_or(&lookup, "WORLD_HEIGHT", round.terrain.world_height)?;
        round.max_wind_speed = parse_or(&lookup, "MAX_WIND_SPEED", round.max_wind_speed)?;

        let ai_delay_ms: u64 = parse_or(&lookup, "AI_DELAY_MS", 1000)?;
        if ai_delay_ms > MAX_AI_DELAY_MS {
            return Err(invalid("AI_DELAY_MS", ai_delay_ms));
        }
        round.ai_delay_ticks = millis_to_ticks(ai_delay_ms, tps);

        let width = round.terrain.world_width;
        let min_width = 2.0 * round.tank_margin + 140.0;
        if !width.is_finite() || width <= min_width || width > MAX_WORLD_SIZE {
            return Err(invalid("WORLD_WIDTH", width));
        }
        let height = round.terrain.world_height;
        if !height.is_finite() || height <= round.terrain.max_height || height > MAX_WORLD_SIZE {
            return Err(invalid("WORLD_HEIGHT", height));
        }
        let wind = round.max_wind_speed;
        if !wind.is_finite() || wind < 0.0 || wind > WIND_SPEED_LIMIT {
            return Err(invalid("MAX_WIND_SPEED", wind));
        }

        let seed = match lookup("MATCH_SEED") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "MATCH_SEED",
                value,
            })?,
            None => rand::random(),
        };

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            seed,
            tps,
            realtime: parse_or(&lookup, "REALTIME", true)?,
            max_ticks: parse_or(&lookup, "MAX_TICKS", 20_000u64)?,
            save_path: lookup("SAVE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tank_duel_save.json")),
            autosave: parse_or(&lookup, "AUTOSAVE", true)?,
            round,
        })
    }
}

/// Read `name` and parse it, falling back to `default` when unset
fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn invalid(name: &'static str, value: impl Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
