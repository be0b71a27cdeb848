//! Room registry: creates, tracks, and routes players to rooms.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use wordfall_game::{Key, WordSupplier};
use wordfall_protocol::{PlayerId, RoomId, RoomSnapshot};

use crate::room::spawn_room;
use crate::{PlayerSender, RegistryConfig, RoomError, RoomHandle, RoomInfo};

/// Owns every room in the process and tracks which player is in which.
///
/// A player is in at most one room at a time. A room is keyed by its
/// host's id, so a host can only have one room.
///
/// The list of joinable rooms is published on a `watch` channel
/// ([`subscribe`](Self::subscribe)) whenever it changes. It is built from
/// the metadata each room publishes itself, so listing never waits on a
/// room that is busy loading words.
pub struct RoomRegistry<S> {
    config: RegistryConfig,
    supplier: Arc<S>,
    rooms: HashMap<RoomId, RoomHandle>,
    player_rooms: HashMap<PlayerId, RoomId>,
    available_tx: watch::Sender<Vec<RoomId>>,
}

impl<S: WordSupplier> RoomRegistry<S> {
    pub fn new(supplier: Arc<S>, config: RegistryConfig) -> Self {
        let (available_tx, _) = watch::channel(Vec::new());
        Self {
            config,
            supplier,
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            available_tx,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Receives the joinable-room list every time it changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<RoomId>> {
        self.available_tx.subscribe()
    }

    /// Creates a room hosted by `host_id` and joins the host to it.
    ///
    /// Nothing is created when the registry is full.
    pub async fn create_room(
        &mut self,
        host_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<RoomId, RoomError> {
        self.prune();

        if self.rooms.len() >= self.config.max_rooms {
            warn!(%host_id, rooms = self.rooms.len(), "registry full, refusing room");
            return Err(RoomError::RegistryFull {
                max_rooms: self.config.max_rooms,
            });
        }

        let room_id = RoomId::from(&host_id);
        if self.rooms.contains_key(&room_id) {
            return Err(RoomError::AlreadyExists(room_id));
        }
        if let Some(current) = self.player_rooms.get(&host_id) {
            return Err(RoomError::AlreadyInRoom(host_id, current.clone()));
        }

        let handle = spawn_room(room_id.clone(), self.config.room.clone(), self.supplier.clone());
        if let Err(e) = handle.join(host_id.clone(), name, sender).await {
            let _ = handle.shutdown().await;
            return Err(e);
        }

        self.rooms.insert(room_id.clone(), handle);
        self.player_rooms.insert(host_id, room_id.clone());
        info!(%room_id, rooms = self.rooms.len(), "room created");

        self.publish();
        Ok(room_id)
    }

    /// Adds a player to a room in the lobby.
    pub async fn join_room(
        &mut self,
        room_id: &RoomId,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        if let Some(current) = self.player_rooms.get(&player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, current.clone()));
        }

        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        // Refuse from the published metadata first; the actor re-checks.
        let info = handle.info();
        if !info.status.is_joinable() {
            return Err(RoomError::InvalidState(format!(
                "cannot join room in state {}",
                info.status
            )));
        }
        if info.is_full() {
            return Err(RoomError::RoomFull(room_id.clone()));
        }

        handle.join(player_id.clone(), name, sender).await?;
        self.player_rooms.insert(player_id, room_id.clone());

        self.publish();
        Ok(())
    }

    /// Removes a player from a room. A room left empty is destroyed.
    pub async fn leave_room(
        &mut self,
        room_id: &RoomId,
        player_id: &PlayerId,
    ) -> Result<(), RoomError> {
        if self.player_rooms.get(player_id) != Some(room_id) {
            return Err(RoomError::NotInRoom(player_id.clone(), room_id.clone()));
        }
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let remaining = match handle.leave(player_id.clone()).await {
            Ok(remaining) => remaining,
            // The actor is gone; nothing left to leave.
            Err(RoomError::Unavailable(_)) => 0,
            Err(e) => return Err(e),
        };
        self.player_rooms.remove(player_id);

        if remaining == 0 {
            self.destroy_room(room_id).await?;
        } else {
            self.publish();
        }
        Ok(())
    }

    /// Removes a player from whatever room they are in, if any.
    pub async fn leave_current(&mut self, player_id: &PlayerId) -> Result<(), RoomError> {
        match self.player_rooms.get(player_id).cloned() {
            Some(room_id) => self.leave_room(&room_id, player_id).await,
            None => Ok(()),
        }
    }

    /// Starts the game in `room_id` on behalf of `requester`.
    ///
    /// Word loading happens while the registry is borrowed; callers that
    /// share the registry behind a lock can use [`room_handle`](Self::room_handle)
    /// and [`RoomHandle::start`] instead.
    pub async fn start_game(
        &self,
        room_id: &RoomId,
        requester: PlayerId,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let (width, height) = self.arena();
        let result = handle.start(requester, width, height).await;
        self.publish();
        result
    }

    /// Parses a raw keystroke and finds the room it should go to.
    ///
    /// Delivery is left to the caller ([`RoomHandle::send_key`]) so a room
    /// with a full command queue never holds up whoever owns the registry.
    ///
    /// # Errors
    /// [`RoomError::Game`] with an invalid-key error if `key` isn't a key
    /// the game understands; [`RoomError::InvalidState`] if the player is
    /// not in a room.
    pub fn route_key(&self, player_id: &PlayerId, key: &str) -> Result<(RoomHandle, Key), RoomError> {
        let key: Key = key.parse()?;
        let room_id = self.player_rooms.get(player_id).ok_or_else(|| {
            RoomError::InvalidState(format!("player {player_id} is not in any room"))
        })?;
        Ok((self.room_handle(room_id)?, key))
    }

    /// Ids of rooms still in the lobby with a free slot, sorted.
    ///
    /// Stopped rooms are skipped.
    pub fn find_available_rooms(&self) -> Vec<RoomId> {
        let mut available: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, handle)| !handle.is_closed() && handle.info().is_available())
            .map(|(room_id, _)| room_id.clone())
            .collect();
        available.sort();
        available
    }

    /// Recomputes the joinable-room list and notifies subscribers if it
    /// changed.
    pub fn publish(&self) {
        let available = self.find_available_rooms();
        let changed = self.available_tx.send_if_modified(|current| {
            if *current == available {
                false
            } else {
                *current = available;
                true
            }
        });
        if changed {
            debug!(rooms = self.available_tx.borrow().len(), "available rooms published");
        }
    }

    /// Shuts a room down and removes all its players from the index.
    pub async fn destroy_room(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let _ = handle.shutdown().await;
        self.player_rooms.retain(|_, rid| rid != room_id);

        info!(%room_id, rooms = self.rooms.len(), "room destroyed");
        self.publish();
        Ok(())
    }

    /// Forgets rooms whose actor has already stopped.
    pub fn prune(&mut self) {
        let before = self.rooms.len();
        self.rooms.retain(|_, handle| !handle.is_closed());
        if self.rooms.len() != before {
            let rooms = &self.rooms;
            self.player_rooms.retain(|_, rid| rooms.contains_key(rid));
            debug!(pruned = before - self.rooms.len(), "pruned stopped rooms");
        }
    }

    pub async fn snapshot(&self, room_id: &RoomId) -> Result<RoomSnapshot, RoomError> {
        self.room_handle(room_id)?.snapshot().await
    }

    pub fn room_info(&self, room_id: &RoomId) -> Result<RoomInfo, RoomError> {
        Ok(self.room_handle(room_id)?.info())
    }

    /// A clone of the handle for `room_id`.
    pub fn room_handle(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// The play area every room is started with.
    pub fn arena(&self) -> (f64, f64) {
        (self.config.room.arena_width, self.config.room.arena_height)
    }

    /// The room a player is currently in, if any.
    pub fn player_room(&self, player_id: &PlayerId) -> Option<&RoomId> {
        self.player_rooms.get(player_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
