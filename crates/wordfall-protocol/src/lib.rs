//! Wire protocol and shared data model for Wordfall.
//!
//! This crate defines everything that crosses a room boundary:
//!
//! - **Types** ([`Word`], [`PlayerState`], [`RoomSnapshot`], ...): the
//!   point-in-time game data the simulation hands to the transport.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]): the named
//!   events clients and server exchange.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (messages) → Room (simulation)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{ClientMessage, ServerMessage};
pub use types::{
    ChaosEffect, ChaosEffectKind, EffectStatus, PlayerId, PlayerState, RoomId,
    RoomSnapshot, RoomStatus, Vec2, Word, WordId, WordStatus,
};
