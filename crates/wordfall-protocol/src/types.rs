//! The shared game data model.
//!
//! These are the values that leave the simulation: a [`RoomSnapshot`] is
//! assembled every tick and handed to the transport. Every type here owns
//! its data outright, so a snapshot that has been sent can never be
//! changed by later simulation steps.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Serialized as a plain string (`#[serde(transparent)]`). The server
/// assigns one to every connection, and clients echo it in their payloads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A unique identifier for a room.
///
/// A room is keyed by the player who created it, so a `RoomId` is always
/// the host's [`PlayerId`] underneath.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&PlayerId> for RoomId {
    fn from(host: &PlayerId) -> Self {
        Self(host.0.clone())
    }
}

impl RoomId {
    /// The player id of the room's host.
    pub fn host(&self) -> PlayerId {
        PlayerId(self.0.clone())
    }
}

/// A unique identifier for a falling word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(pub u64);

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Words
// ---------------------------------------------------------------------------

/// A position in a player's play area. `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// Sentinel position for a word that has not been placed yet.
    pub const ORIGIN: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Where a word is in its life, re-evaluated every tick.
///
/// ```text
/// Active ⇄ Typing ⇄ Error
///    │        │
///    │        └──(buffer == text + submit)──→ Completed ─┐
///    └──────────(fell past the bottom)──────→ Missed ────┴─→ removed next tick
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WordStatus {
    #[default]
    Active,
    Typing,
    Error,
    Completed,
    Missed,
}

impl WordStatus {
    /// `true` for the two terminal states. A word in one of these is
    /// removed from the live set on the following tick.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Missed)
    }
}

/// A falling word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: WordId,
    pub text: String,
    pub position: Vec2,
    /// The player's typed buffer as of the last tick.
    pub typed: String,
    /// 1–10.
    pub difficulty: u8,
    pub status: WordStatus,
}

impl Word {
    pub const MIN_DIFFICULTY: u8 = 1;
    pub const MAX_DIFFICULTY: u8 = 10;

    /// Creates an unplaced, `Active` word. `difficulty` is clamped to 1–10.
    pub fn new(id: WordId, text: impl Into<String>, difficulty: u8) -> Self {
        Self {
            id,
            text: text.into(),
            position: Vec2::ORIGIN,
            typed: String::new(),
            difficulty: difficulty.clamp(Self::MIN_DIFFICULTY, Self::MAX_DIFFICULTY),
            status: WordStatus::Active,
        }
    }

    /// `false` until the engine assigns the word a spawn point.
    pub fn is_placed(&self) -> bool {
        self.position != Vec2::ORIGIN
    }
}

// ---------------------------------------------------------------------------
// Chaos effects (reserved)
// ---------------------------------------------------------------------------

/// Kinds of chaos effect a player could send to opponents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosEffectKind {
    JumbledWords,
    SpeedUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectStatus {
    Resolved,
    Active,
}

/// A chaos effect entry. Carried in [`PlayerState`] so clients can render
/// it, but the simulation does not create any yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosEffect {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChaosEffectKind,
    /// Milliseconds since the room started.
    pub timestamp: u64,
    pub duration_ms: u64,
    pub status: EffectStatus,
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// A player's stats and visible words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,
    /// 0–100. The player is dead exactly when this reaches 0.
    pub health: u32,
    pub name: String,
    pub score: f64,
    pub combo: u32,
    /// 0–99, wraps.
    pub chaos_points: u32,
    pub chaos_effects: Vec<ChaosEffect>,
    pub effects_queue: Vec<ChaosEffect>,
    /// Set while `combo` is at or above the safe-guarding threshold.
    pub is_safe: bool,
    pub words: Vec<Word>,
    pub typed: String,
}

impl PlayerState {
    pub fn new(id: PlayerId, name: impl Into<String>, health: u32) -> Self {
        Self {
            id,
            health,
            name: name.into(),
            score: 0.0,
            combo: 0,
            chaos_points: 0,
            chaos_effects: Vec::new(),
            effects_queue: Vec::new(),
            is_safe: false,
            words: Vec::new(),
            typed: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// The lifecycle state of a room. Transitions only move forward:
///
/// ```text
/// Lobby → Playing → Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    Lobby,
    Playing,
    Finished,
}

impl RoomStatus {
    /// The only state reachable from `self`, or `None` at the end.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Lobby => Some(Self::Playing),
            Self::Playing => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Whether moving to `target` is a legal transition.
    ///
    /// `Lobby → Finished` is also allowed: a room can be torn down before
    /// a game ever starts.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target) || (self == Self::Lobby && target == Self::Finished)
    }

    /// Players may only join while the room is in the lobby.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Playing => write!(f, "Playing"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

/// A point-in-time copy of a whole room (the "game instance").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub status: RoomStatus,
    pub players: BTreeMap<PlayerId, PlayerState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_values() {
        assert_eq!(serde_json::to_string(&PlayerId::from("abc")).unwrap(), "\"abc\"");
        assert_eq!(serde_json::to_string(&RoomId::from("r")).unwrap(), "\"r\"");
        assert_eq!(serde_json::to_string(&WordId(7)).unwrap(), "7");
    }

    #[test]
    fn test_word_id_display() {
        assert_eq!(WordId(3).to_string(), "W-3");
    }

    #[test]
    fn test_room_id_from_host_round_trips() {
        let host = PlayerId::from("host-9");
        let room = RoomId::from(&host);
        assert_eq!(room.host(), host);
    }

    #[test]
    fn test_new_word_is_unplaced_and_active() {
        let word = Word::new(WordId(1), "cat", 3);
        assert!(!word.is_placed());
        assert_eq!(word.status, WordStatus::Active);
        assert!(word.typed.is_empty());
    }

    #[test]
    fn test_word_difficulty_is_clamped() {
        assert_eq!(Word::new(WordId(1), "a", 0).difficulty, 1);
        assert_eq!(Word::new(WordId(2), "b", 42).difficulty, 10);
    }

    #[test]
    fn test_word_json_uses_camel_case() {
        let json = serde_json::to_value(Word::new(WordId(5), "tree", 2)).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["text"], "tree");
        assert_eq!(json["position"]["x"], 0.0);
        assert_eq!(json["status"], "Active");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(WordStatus::Completed.is_terminal());
        assert!(WordStatus::Missed.is_terminal());
        assert!(!WordStatus::Typing.is_terminal());
        assert!(!WordStatus::Error.is_terminal());
        assert!(!WordStatus::Active.is_terminal());
    }

    #[test]
    fn test_player_state_json_shape() {
        let state = PlayerState::new(PlayerId::from("p1"), "Ada", 100);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["health"], 100);
        assert_eq!(json["chaosPoints"], 0);
        assert_eq!(json["isSafe"], false);
        assert!(json["chaosEffects"].as_array().unwrap().is_empty());
        assert!(json["effectsQueue"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_chaos_effect_kind_serializes_as_type() {
        let effect = ChaosEffect {
            id: "e1".into(),
            kind: ChaosEffectKind::SpeedUp,
            timestamp: 10,
            duration_ms: 500,
            status: EffectStatus::Active,
        };
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json["type"], "speed_up");
        assert_eq!(json["durationMs"], 500);
    }

    #[test]
    fn test_room_status_moves_forward_only() {
        assert_eq!(RoomStatus::Lobby.next(), Some(RoomStatus::Playing));
        assert_eq!(RoomStatus::Playing.next(), Some(RoomStatus::Finished));
        assert_eq!(RoomStatus::Finished.next(), None);

        assert!(RoomStatus::Lobby.can_transition_to(RoomStatus::Playing));
        assert!(RoomStatus::Lobby.can_transition_to(RoomStatus::Finished));
        assert!(!RoomStatus::Playing.can_transition_to(RoomStatus::Lobby));
        assert!(!RoomStatus::Finished.can_transition_to(RoomStatus::Playing));
    }

    #[test]
    fn test_only_lobby_is_joinable() {
        assert!(RoomStatus::Lobby.is_joinable());
        assert!(!RoomStatus::Playing.is_joinable());
        assert!(!RoomStatus::Finished.is_joinable());
    }

    #[test]
    fn test_snapshot_players_keyed_by_id() {
        let mut players = BTreeMap::new();
        players.insert(PlayerId::from("p1"), PlayerState::new(PlayerId::from("p1"), "", 100));
        let snapshot = RoomSnapshot {
            room_id: RoomId::from("p1"),
            status: RoomStatus::Playing,
            players,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["roomId"], "p1");
        assert_eq!(json["status"], "Playing");
        assert_eq!(json["players"]["p1"]["id"], "p1");
    }
}
