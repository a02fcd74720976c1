//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;

use crate::game::{ArenaMap, MatchSettings};
use crate::util::time::{DEFAULT_SIMULATION_TPS, DEFAULT_SNAPSHOT_TPS};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Fixed simulation ticks per second
    pub simulation_tps: u32,
    /// Snapshots broadcast per second
    pub snapshot_tps: u32,

    pub arena_width: f32,
    pub arena_height: f32,
    pub ground_friction: f32,
    pub wall_strength: f32,
    /// Seed of the replicated random source; random when unset
    pub arena_seed: Option<u64>,

    pub max_players: usize,
    pub min_players: usize,
    /// Remove fighters once their health reaches zero
    pub reap_dead: bool,
    /// Ticks later than this many timesteps run in high-latency mode
    pub high_latency_factor: f32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());

        let config = Self {
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            simulation_tps: parse(&var, "SIMULATION_TPS", DEFAULT_SIMULATION_TPS)?,
            snapshot_tps: parse(&var, "SNAPSHOT_TPS", DEFAULT_SNAPSHOT_TPS)?,
            arena_width: parse(&var, "ARENA_WIDTH", 100.0)?,
            arena_height: parse(&var, "ARENA_HEIGHT", 100.0)?,
            ground_friction: parse(&var, "GROUND_FRICTION", 1.0)?,
            wall_strength: parse(&var, "WALL_STRENGTH", 20.0)?,
            arena_seed: var("ARENA_SEED")
                .map(|value| value.trim().parse().map_err(|_| ConfigError::Invalid("ARENA_SEED")))
                .transpose()?,
            max_players: parse(&var, "MAX_PLAYERS", 8)?,
            min_players: parse(&var, "MIN_PLAYERS", 2)?,
            reap_dead: parse(&var, "REAP_DEAD", true)?,
            high_latency_factor: parse(&var, "HIGH_LATENCY_FACTOR", 2.0)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation_tps == 0 {
            return Err(ConfigError::Invalid("SIMULATION_TPS"));
        }
        if self.snapshot_tps == 0 {
            return Err(ConfigError::Invalid("SNAPSHOT_TPS"));
        }
        if !(self.arena_width > 0.0) {
            return Err(ConfigError::Invalid("ARENA_WIDTH"));
        }
        if !(self.arena_height > 0.0) {
            return Err(ConfigError::Invalid("ARENA_HEIGHT"));
        }
        if self.max_players == 0 {
            return Err(ConfigError::Invalid("MAX_PLAYERS"));
        }
        if self.min_players > self.max_players {
            return Err(ConfigError::Invalid("MIN_PLAYERS"));
        }
        if !(self.high_latency_factor >= 1.0) {
            return Err(ConfigError::Invalid("HIGH_LATENCY_FACTOR"));
        }
        Ok(())
    }

    pub fn map(&self) -> ArenaMap {
        ArenaMap {
            width: self.arena_width,
            height: self.arena_height,
            friction: self.ground_friction,
            wall_strength: self.wall_strength,
        }
    }

    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            simulation_tps: self.simulation_tps,
            snapshot_tps: self.snapshot_tps,
            map: self.map(),
            seed: self.arena_seed.unwrap_or_else(rand::random),
            max_players: self.max_players,
            min_players: self.min_players,
            reap_dead: self.reap_dead,
            high_latency_factor: self.high_latency_factor,
        }
    }
}

fn parse<T: FromStr>(
    var: impl Fn(&'static str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.simulation_tps, 60);
        assert_eq!(config.snapshot_tps, 20);
        assert_eq!(config.map(), ArenaMap::default());
        assert_eq!(config.arena_seed, None);
        assert_eq!(config.max_players, 8);
        assert_eq!(config.min_players, 2);
        assert!(config.reap_dead);
        assert_eq!(config.high_latency_factor, 2.0);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("SIMULATION_TPS", "30"),
            ("ARENA_WIDTH", "250.5"),
            ("ARENA_SEED", "99"),
            ("REAP_DEAD", "false"),
            ("MIN_PLAYERS", " 1 "),
        ])
        .unwrap();
        assert_eq!(config.simulation_tps, 30);
        assert_eq!(config.arena_width, 250.5);
        assert!(!config.reap_dead);
        assert_eq!(config.min_players, 1);

        let settings = config.match_settings();
        assert_eq!(settings.seed, 99);
        assert_eq!(settings.snapshot_interval(), 1);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        assert_eq!(load(&[("SNAPSHOT_TPS", "fast")]).err(), Some(ConfigError::Invalid("SNAPSHOT_TPS")));
        assert_eq!(load(&[("SIMULATION_TPS", "0")]).err(), Some(ConfigError::Invalid("SIMULATION_TPS")));
        assert_eq!(load(&[("ARENA_HEIGHT", "-3")]).err(), Some(ConfigError::Invalid("ARENA_HEIGHT")));
        assert_eq!(load(&[("ARENA_SEED", "x")]).err(), Some(ConfigError::Invalid("ARENA_SEED")));
    }

    #[test]
    fn min_players_cannot_exceed_capacity() {
        assert_eq!(
            load(&[("MAX_PLAYERS", "4"), ("MIN_PLAYERS", "5")]).err(),
            Some(ConfigError::Invalid("MIN_PLAYERS"))
        );
        assert!(load(&[("MAX_PLAYERS", "4"), ("MIN_PLAYERS", "4")]).is_ok());
    }
}
