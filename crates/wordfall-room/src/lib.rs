//! Room lifecycle management for Wordfall.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! players' sessions and its own tick scheduler. Nothing outside the task
//! touches room state; everything goes through a [`RoomHandle`].
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates/destroys rooms, routes players, publishes
//!   the joinable-room list
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomInfo`]: room metadata (status, head count)
//! - [`RoomConfig`] / [`RegistryConfig`]: limits and tick rate

mod config;
mod error;
mod registry;
mod room;

pub use config::{RegistryConfig, RoomConfig};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{PlayerSender, RoomHandle, RoomInfo};
