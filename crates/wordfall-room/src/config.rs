//! Room and registry configuration.

use wordfall_game::{EngineConfig, SessionConfig};

/// Configuration for a room instance.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Maximum players allowed in the room.
    pub max_players: usize,

    /// Simulation rate while playing.
    pub tick_rate_hz: u32,

    /// Play-area width handed to every player's engine on `startGame`.
    pub arena_width: f64,

    /// Play-area height. Words at or below this are missed.
    pub arena_height: f64,

    /// Capacity of the room's command channel.
    pub channel_size: usize,

    pub engine: EngineConfig,
    pub session: SessionConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 15,
            tick_rate_hz: 60,
            arena_width: 800.0,
            arena_height: 800.0,
            channel_size: 64,
            engine: EngineConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Configuration for the process-wide [`RoomRegistry`](crate::RoomRegistry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub max_rooms: usize,
    /// Settings for every room the registry creates.
    pub room: RoomConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_rooms: 20,
            room: RoomConfig::default(),
        }
    }
}
