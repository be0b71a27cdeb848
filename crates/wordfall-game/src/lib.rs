//! Per-player game simulation for Wordfall.
//!
//! Everything in this crate is owned by a single player and driven by the
//! room's tick loop:
//!
//! - [`WordSupplier`]: where new words come from ([`StaticWordSupplier`],
//!   [`RetryingSupplier`]).
//! - [`WordEngine`]: spawns, moves, and classifies a player's falling words.
//! - [`select_candidate`]: binds the typed buffer to one on-screen word.
//! - [`PlayerSession`]: key input, health, score, and combo.
//!
//! ```text
//! keys → PlayerSession ─(InputSnapshot)→ WordEngine ─(words)→ PlayerSession stats
//! ```

mod engine;
mod error;
mod matching;
mod player;
mod supplier;

pub use engine::{EngineConfig, InputSnapshot, WordEngine};
pub use error::GameError;
pub use matching::{match_score, select_candidate};
pub use player::{Key, PlayerSession, SessionConfig, TickReport};
pub use supplier::{RetryPolicy, RetryingSupplier, StaticWordSupplier, SuppliedWord, WordSupplier};
