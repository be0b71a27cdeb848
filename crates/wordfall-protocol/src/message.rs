//! Named events exchanged between clients and the server.
//!
//! Both directions use adjacently tagged JSON, one event name plus its
//! payload:
//!
//! ```text
//! { "type": "joinRoom", "payload": { "roomId": "abc", "playerId": "def", "name": "Ada" } }
//! { "type": "joinRoomFailed", "payload": "The room is full" }
//! ```

use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomId, RoomSnapshot};

/// Client → server events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Create a room hosted by `host_id`. The host joins it immediately.
    CreateRoom { host_id: PlayerId },

    JoinRoom {
        room_id: RoomId,
        player_id: PlayerId,
        #[serde(default)]
        name: String,
    },

    LeaveRoom { room_id: RoomId, player_id: PlayerId },

    /// Host-only: leave the lobby and start the simulation.
    StartGame { room_id: RoomId },

    /// A single keystroke: `Backspace`, `Enter`, `Space`, or one
    /// alphanumeric character.
    Typed { player_id: PlayerId, key: String },

    /// Ask for the current joinable-room list.
    ListRooms,
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// First message on every connection: the id this client plays as.
    Connected { player_id: PlayerId },

    /// A fresh snapshot of the room, broadcast once per tick while playing.
    GameInstanceUpdate(RoomSnapshot),

    /// Rooms that are still accepting players.
    ListAvailableRooms(Vec<RoomId>),

    /// Human-readable reason a `createRoom` was refused.
    RoomCreationFailed(String),

    /// Human-readable reason a `joinRoom` was refused.
    JoinRoomFailed(String),

    /// Anything else that went wrong. `code` follows HTTP conventions
    /// (400 bad request, 403 forbidden, 404 not found, 500 room terminated).
    Error { code: u16, message: String },
}
