//! # Wordfall
//!
//! Server for a real-time multiplayer typing game: words fall down each
//! player's screen and have to be typed before they reach the bottom.
//!
//! The server is authoritative. Clients only send keystrokes and room
//! requests; every room runs its own fixed-tick simulation and broadcasts
//! a snapshot of all its players after each tick.
//!
//! ```text
//! wordfall-transport  WebSocket frames
//! wordfall-protocol   ClientMessage / ServerMessage, JSON
//! wordfall-room       RoomRegistry, one actor task per room
//! wordfall-game       PlayerSession, WordEngine, WordSupplier
//! wordfall-tick       fixed-rate scheduler driving each room
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wordfall::prelude::*;
//!
//! # async fn run() -> Result<(), WordfallError> {
//! let config = ServerConfig::from_env()?;
//! let supplier = RetryingSupplier::new(StaticWordSupplier::new(), config.supplier.clone());
//! let server = WordfallServerBuilder::from_config(&config)
//!     .build(supplier)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::WordfallError;
pub use server::{WordfallServer, WordfallServerBuilder};

pub mod prelude {
    pub use crate::{ConfigError, ServerConfig, WordfallError, WordfallServer, WordfallServerBuilder};
    pub use wordfall_game::{
        EngineConfig, GameError, RetryPolicy, RetryingSupplier, SessionConfig, StaticWordSupplier,
        SuppliedWord, WordSupplier,
    };
    pub use wordfall_protocol::{
        ClientMessage, PlayerId, PlayerState, RoomId, RoomSnapshot, RoomStatus, ServerMessage,
        Word, WordStatus,
    };
    pub use wordfall_room::{RegistryConfig, RoomConfig, RoomError};
}
