//! `WordfallServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → registry → rooms.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use wordfall_game::WordSupplier;
use wordfall_protocol::{Codec, JsonCodec, RoomId};
use wordfall_room::{RegistryConfig, RoomRegistry};
use wordfall_transport::{Transport, WebSocketTransport};

use crate::config::{DEFAULT_ADDR, DEFAULT_IDLE_TIMEOUT};
use crate::handler::handle_connection;
use crate::{ServerConfig, WordfallError};

/// State shared by every connection task.
pub(crate) struct ServerState<S, C> {
    pub(crate) registry: Mutex<RoomRegistry<S>>,
    /// Cloned by each connection to follow the joinable-room list
    /// without taking the registry lock.
    pub(crate) available_rooms: watch::Receiver<Vec<RoomId>>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Configures and binds a [`WordfallServer`].
///
/// ```rust,no_run
/// use wordfall::prelude::*;
///
/// # async fn run() -> Result<(), WordfallError> {
/// let server = WordfallServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .max_rooms(10)
///     .build(StaticWordSupplier::new())
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct WordfallServerBuilder {
    bind_addr: String,
    registry: RegistryConfig,
    idle_timeout: Duration,
}

impl WordfallServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            registry: RegistryConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Takes the address, registry and idle settings from `config`.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            registry: config.registry.clone(),
            idle_timeout: config.idle_timeout,
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn max_rooms(mut self, max_rooms: usize) -> Self {
        self.registry.max_rooms = max_rooms;
        self
    }

    pub fn max_players(mut self, max_players: usize) -> Self {
        self.registry.room.max_players = max_players;
        self
    }

    pub fn tick_rate(mut self, tick_rate_hz: u32) -> Self {
        self.registry.room.tick_rate_hz = tick_rate_hz;
        self
    }

    pub fn arena(mut self, width: f64, height: f64) -> Self {
        self.registry.room.arena_width = width;
        self.registry.room.arena_height = height;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Replaces the whole registry configuration, engine tuning included.
    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry = config;
        self
    }

    /// Binds the listener. Rooms draw their words from `supplier`.
    pub async fn build<S: WordSupplier>(
        self,
        supplier: S,
    ) -> Result<WordfallServer<S, JsonCodec>, WordfallError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let registry = RoomRegistry::new(Arc::new(supplier), self.registry);
        let available_rooms = registry.subscribe();

        let state = Arc::new(ServerState {
            registry: Mutex::new(registry),
            available_rooms,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(WordfallServer { transport, state })
    }
}

impl Default for WordfallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound game server. Call [`run`](Self::run) to start accepting players.
pub struct WordfallServer<S, C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
}

impl<S, C> WordfallServer<S, C>
where
    S: WordSupplier,
    C: Codec,
{
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Accepts connections forever, one task per player.
    pub async fn run(mut self) -> Result<(), WordfallError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Wordfall server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
