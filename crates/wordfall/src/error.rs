//! Unified error type for the Wordfall server.

use wordfall_game::GameError;
use wordfall_protocol::ProtocolError;
use wordfall_room::RoomError;
use wordfall_transport::TransportError;

use crate::ConfigError;

/// Wraps every crate's error so `?` works across layers.
#[derive(Debug, thiserror::Error)]
pub enum WordfallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use wordfall_protocol::RoomId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: WordfallError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, WordfallError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: WordfallError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, WordfallError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error_keeps_message() {
        let err: WordfallError = RoomError::RoomFull(RoomId::from("host")).into();
        assert!(matches!(err, WordfallError::Room(_)));
        assert_eq!(err.to_string(), "The room is full");
    }

    #[test]
    fn test_from_game_error() {
        let err: WordfallError = GameError::InvalidKey("F1".into()).into();
        assert!(matches!(err, WordfallError::Game(_)));
    }

    #[test]
    fn test_from_config_error() {
        let err: WordfallError = ConfigError::Invalid {
            key: "WORDFALL_TICK_RATE",
            value: "fast".into(),
            reason: "not a number".into(),
        }
        .into();
        assert!(matches!(err, WordfallError::Config(_)));
        assert!(err.to_string().contains("WORDFALL_TICK_RATE"));
    }
}
