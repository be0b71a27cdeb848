//! Per-connection handler: identity, message routing, and room cleanup.
//!
//! Each accepted connection gets its own Tokio task. The flow is:
//!   1. Assign a player id, send `connected` and the joinable-room list
//!   2. Loop over client frames, messages from the player's room, and
//!      changes to the joinable-room list
//!   3. On exit, leave whatever room the player is still in

use std::sync::Arc;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, info};
use wordfall_game::WordSupplier;
use wordfall_protocol::{ClientMessage, Codec, PlayerId, ServerMessage};
use wordfall_room::{PlayerSender, RoomError};
use wordfall_transport::{Connection, WebSocketConnection};

use crate::WordfallError;
use crate::server::ServerState;

/// Takes the player out of their room when the handler exits, however
/// it exits. `Drop` is synchronous, so the async leave runs on its own task.
struct RoomGuard<S: WordSupplier, C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<S, C>>,
}

impl<S: WordSupplier, C: Codec> Drop for RoomGuard<S, C> {
    fn drop(&mut self) {
        let player_id = self.player_id.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut registry = state.registry.lock().await;
            if let Err(e) = registry.leave_current(&player_id).await {
                debug!(%player_id, error = %e, "leave on disconnect failed");
            }
        });
    }
}

/// A fresh id: 16 random bytes as 32 lowercase hex characters.
fn new_player_id() -> PlayerId {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    PlayerId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), WordfallError>
where
    S: WordSupplier,
    C: Codec,
{
    let conn_id = conn.id();
    let player_id = new_player_id();
    info!(%conn_id, %player_id, "player connected");

    let _guard = RoomGuard {
        player_id: player_id.clone(),
        state: Arc::clone(&state),
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let mut available_rooms = state.available_rooms.clone();

    let client = Client {
        conn: &conn,
        state: &state,
        player_id: player_id.clone(),
        outbound: outbound_tx,
    };

    client.send(&ServerMessage::Connected { player_id: player_id.clone() }).await?;
    let rooms = available_rooms.borrow_and_update().clone();
    client.send(&ServerMessage::ListAvailableRooms(rooms)).await?;

    let idle = time::sleep(state.idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        info!(%conn_id, %player_id, "connection closed");
                        break;
                    }
                    Err(e) => {
                        debug!(%conn_id, %player_id, error = %e, "recv error");
                        break;
                    }
                };
                idle.as_mut().reset(Instant::now() + state.idle_timeout);
                client.on_frame(&data).await?;
            }

            Some(msg) = outbound_rx.recv() => client.send(&msg).await?,

            Ok(()) = available_rooms.changed() => {
                let rooms = available_rooms.borrow_and_update().clone();
                client.send(&ServerMessage::ListAvailableRooms(rooms)).await?;
            }

            () = &mut idle => {
                info!(%conn_id, %player_id, "connection idle, closing");
                let _ = conn.close().await;
                break;
            }
        }
    }

    // _guard drops here and the player leaves their room.
    Ok(())
}

/// One connected player, as seen by the message router.
struct Client<'a, S, C> {
    conn: &'a WebSocketConnection,
    state: &'a ServerState<S, C>,
    player_id: PlayerId,
    /// Handed to rooms so they can reach this connection.
    outbound: PlayerSender,
}

impl<S: WordSupplier, C: Codec> Client<'_, S, C> {
    async fn send(&self, msg: &ServerMessage) -> Result<(), WordfallError> {
        let bytes = self.state.codec.encode(msg)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn send_error(&self, code: u16, message: &str) -> Result<(), WordfallError> {
        self.send(&ServerMessage::Error {
            code,
            message: message.to_string(),
        })
        .await
    }

    async fn send_room_error(&self, err: RoomError) -> Result<(), WordfallError> {
        debug!(player_id = %self.player_id, error = %err, "request refused");
        self.send_error(err.code(), &err.to_string()).await
    }

    /// Clients name themselves in most messages; they may only act as
    /// the id this connection was given.
    async fn reject_impersonation(&self, claimed: &PlayerId) -> Result<(), WordfallError> {
        debug!(player_id = %self.player_id, %claimed, "player id mismatch");
        self.send_error(403, &format!("player {claimed} does not belong to this connection"))
            .await
    }

    async fn on_frame(&self, data: &[u8]) -> Result<(), WordfallError> {
        match self.state.codec.decode::<ClientMessage>(data) {
            Ok(msg) => self.dispatch(msg).await,
            Err(e) => {
                debug!(player_id = %self.player_id, error = %e, "undecodable frame");
                self.send_error(400, &format!("invalid message: {e}")).await
            }
        }
    }

    async fn dispatch(&self, msg: ClientMessage) -> Result<(), WordfallError> {
        match msg {
            ClientMessage::CreateRoom { host_id } => {
                if host_id != self.player_id {
                    return self.reject_impersonation(&host_id).await;
                }
                let result = self
                    .state
                    .registry
                    .lock()
                    .await
                    .create_room(host_id, String::new(), self.outbound.clone())
                    .await;
                if let Err(e) = result {
                    debug!(player_id = %self.player_id, error = %e, "room creation refused");
                    self.send(&ServerMessage::RoomCreationFailed(e.to_string())).await?;
                }
            }

            ClientMessage::JoinRoom {
                room_id,
                player_id,
                name,
            } => {
                if player_id != self.player_id {
                    return self.reject_impersonation(&player_id).await;
                }
                let result = self
                    .state
                    .registry
                    .lock()
                    .await
                    .join_room(&room_id, player_id, name, self.outbound.clone())
                    .await;
                match result {
                    Ok(()) => {}
                    Err(
                        e @ (RoomError::RoomFull(_)
                        | RoomError::InvalidState(_)
                        | RoomError::AlreadyInRoom(..)),
                    ) => {
                        self.send(&ServerMessage::JoinRoomFailed(e.to_string())).await?;
                    }
                    Err(e) => self.send_room_error(e).await?,
                }
            }

            ClientMessage::LeaveRoom { room_id, player_id } => {
                if player_id != self.player_id {
                    return self.reject_impersonation(&player_id).await;
                }
                let result = self
                    .state
                    .registry
                    .lock()
                    .await
                    .leave_room(&room_id, &player_id)
                    .await;
                if let Err(e) = result {
                    self.send_room_error(e).await?;
                }
            }

            ClientMessage::StartGame { room_id } => {
                // Word loading can take a while; don't hold the registry
                // lock for it.
                let (handle, (width, height)) = {
                    let registry = self.state.registry.lock().await;
                    (registry.room_handle(&room_id), registry.arena())
                };
                let result = match handle {
                    Ok(handle) => handle.start(self.player_id.clone(), width, height).await,
                    Err(e) => Err(e),
                };
                self.state.registry.lock().await.publish();
                if let Err(e) = result {
                    self.send_room_error(e).await?;
                }
            }

            ClientMessage::Typed { player_id, key } => {
                if player_id != self.player_id {
                    return self.reject_impersonation(&player_id).await;
                }
                // Resolve under the lock, deliver outside it.
                let route = self.state.registry.lock().await.route_key(&player_id, &key);
                let result = match route {
                    Ok((handle, key)) => handle.send_key(player_id, key).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    self.send_room_error(e).await?;
                }
            }

            ClientMessage::ListRooms => {
                let rooms = self.state.registry.lock().await.find_available_rooms();
                self.send(&ServerMessage::ListAvailableRooms(rooms)).await?;
            }
        }
        Ok(())
    }
}
