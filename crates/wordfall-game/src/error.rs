//! Error types for the game simulation.

/// Errors raised while simulating a player's words.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The word supplier handed back fewer words than it was asked for.
    /// The room that owns the engine cannot continue.
    #[error("word supplier returned {returned} words, at least {requested} required")]
    SupplierContract { requested: usize, returned: usize },

    /// The supplier could not produce words at all (backend down, timed
    /// out, retries exhausted).
    #[error("word supplier unavailable: {0}")]
    SupplierUnavailable(String),

    /// A keystroke that is not `Backspace`, `Enter`, `Space`, or a single
    /// alphanumeric character.
    #[error("invalid key {0:?}")]
    InvalidKey(String),
}

impl GameError {
    /// Whether this error means the owning room must be terminated.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidKey(_))
    }
}
