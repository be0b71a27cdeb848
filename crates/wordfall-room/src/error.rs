//! Error types for the room layer.

use wordfall_game::GameError;
use wordfall_protocol::{PlayerId, RoomId};

/// Errors that can occur during room operations.
///
/// The `Display` text of the capacity errors is shown to players as-is.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// No more player slots.
    #[error("The room is full")]
    RoomFull(RoomId),

    /// The registry already holds its maximum number of rooms.
    #[error("There are {max_rooms} available rooms. You cannot create a new room at the moment.")]
    RegistryFull { max_rooms: usize },

    /// A room keyed by this host already exists.
    #[error("room {0} already exists")]
    AlreadyExists(RoomId),

    /// The player is already in a room (this one or another).
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The player is not in this room.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomId),

    /// Only the host may do this.
    #[error("player {0} is not the host of room {1}")]
    NotHost(PlayerId, RoomId),

    /// The room is in a state that doesn't allow this operation, for
    /// example joining a room that is already playing.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    #[error(transparent)]
    Game(#[from] GameError),
}

impl RoomError {
    /// HTTP-style status code for the `error` message sent to clients.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::NotInRoom(..) => 400,
            Self::NotHost(..) => 403,
            Self::RoomFull(_)
            | Self::AlreadyExists(_)
            | Self::AlreadyInRoom(..)
            | Self::InvalidState(_) => 409,
            Self::RegistryFull { .. } | Self::Unavailable(_) => 503,
            Self::Game(GameError::InvalidKey(_)) => 400,
            Self::Game(_) => 500,
        }
    }
}
