//! Process configuration read from the environment.
//!
//! Every setting has a default; a `.env` file in the working directory is
//! loaded first if present.
//!
//! | variable | default |
//! |---|---|
//! | `WORDFALL_ADDR` | `127.0.0.1:8080` |
//! | `WORDFALL_MAX_ROOMS` | 20 |
//! | `WORDFALL_MAX_PLAYERS` | 15 |
//! | `WORDFALL_TICK_RATE` | 60 |
//! | `WORDFALL_ARENA_WIDTH` / `WORDFALL_ARENA_HEIGHT` | 800 |
//! | `WORDFALL_IDLE_TIMEOUT_SECS` | 300 |
//! | `WORDFALL_SUPPLIER_TIMEOUT_MS` | 2000 |
//! | `WORDFALL_SUPPLIER_RETRIES` | 3 |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use wordfall_game::RetryPolicy;
use wordfall_room::RegistryConfig;
use wordfall_tick::TickConfig;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the binary needs to start a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub registry: RegistryConfig,
    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,
    /// Applied to the built-in word list by the binary.
    pub supplier: RetryPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            registry: RegistryConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            supplier: RetryPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("WORDFALL_ADDR") {
            config.bind_addr = addr;
        }

        let room = &mut config.registry.room;
        config.registry.max_rooms =
            parse_or(&lookup, "WORDFALL_MAX_ROOMS", config.registry.max_rooms)?;
        room.max_players = parse_or(&lookup, "WORDFALL_MAX_PLAYERS", room.max_players)?;
        room.tick_rate_hz = parse_or(&lookup, "WORDFALL_TICK_RATE", room.tick_rate_hz)?;
        room.arena_width = parse_or(&lookup, "WORDFALL_ARENA_WIDTH", room.arena_width)?;
        room.arena_height = parse_or(&lookup, "WORDFALL_ARENA_HEIGHT", room.arena_height)?;

        let idle = parse_or(
            &lookup,
            "WORDFALL_IDLE_TIMEOUT_SECS",
            config.idle_timeout.as_secs(),
        )?;
        config.idle_timeout = Duration::from_secs(idle);

        let attempt_ms = parse_or(
            &lookup,
            "WORDFALL_SUPPLIER_TIMEOUT_MS",
            config.supplier.attempt_timeout.as_millis() as u64,
        )?;
        config.supplier.attempt_timeout = Duration::from_millis(attempt_ms);
        config.supplier.max_retries =
            parse_or(&lookup, "WORDFALL_SUPPLIER_RETRIES", config.supplier.max_retries)?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would leave the server unable to run a game.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let room = &self.registry.room;
        ensure(self.registry.max_rooms > 0, "WORDFALL_MAX_ROOMS", self.registry.max_rooms, "must be at least 1")?;
        ensure(room.max_players > 0, "WORDFALL_MAX_PLAYERS", room.max_players, "must be at least 1")?;
        ensure(
            (1..=TickConfig::MAX_TICK_RATE_HZ).contains(&room.tick_rate_hz),
            "WORDFALL_TICK_RATE",
            room.tick_rate_hz,
            "must be between 1 and 128",
        )?;
        ensure(
            room.arena_width.is_finite() && room.arena_width > 0.0,
            "WORDFALL_ARENA_WIDTH",
            room.arena_width,
            "must be a positive number",
        )?;
        ensure(
            room.arena_height.is_finite() && room.arena_height > 0.0,
            "WORDFALL_ARENA_HEIGHT",
            room.arena_height,
            "must be a positive number",
        )?;
        ensure(
            !self.idle_timeout.is_zero(),
            "WORDFALL_IDLE_TIMEOUT_SECS",
            self.idle_timeout.as_secs(),
            "must be at least 1",
        )?;
        ensure(
            !self.supplier.attempt_timeout.is_zero(),
            "WORDFALL_SUPPLIER_TIMEOUT_MS",
            self.supplier.attempt_timeout.as_millis(),
            "must be at least 1",
        )
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn ensure(
    ok: bool,
    key: &'static str,
    value: impl ToString,
    reason: &str,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        })
    }
}
