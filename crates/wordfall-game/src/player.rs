//! A single player's session: key input, stats, and their word engine.

use std::str::FromStr;

use tracing::{debug, info};
use wordfall_protocol::{PlayerId, PlayerState, WordStatus};

use crate::{GameError, InputSnapshot, WordEngine, WordSupplier};

/// Stat rules for a [`PlayerSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub initial_health: u32,
    /// `is_safe` holds while `combo` is at or above this.
    pub safe_combo_threshold: u32,
    pub chaos_per_completion: u32,
    /// Chaos points wrap at this value.
    pub chaos_modulus: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_health: 100,
            safe_combo_threshold: 10,
            chaos_per_completion: 5,
            chaos_modulus: 100,
        }
    }
}

/// A decoded keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Backspace,
    /// `Enter` or `Space`.
    Submit,
    Char(char),
}

impl FromStr for Key {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Backspace" => Ok(Self::Backspace),
            "Enter" | "Space" => Ok(Self::Submit),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_alphanumeric() => Ok(Self::Char(c)),
                    _ => Err(GameError::InvalidKey(s.to_string())),
                }
            }
        }
    }
}

/// Keystrokes accumulated between ticks.
#[derive(Debug, Default)]
struct InputBuffer {
    typed: String,
    /// Set by a submit; the next character starts a fresh buffer.
    clear_on_next_char: bool,
    /// Set by a submit; consumed by the next tick.
    submit: bool,
}

/// What one tick did to a player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub completed: u32,
    pub missed: u32,
    pub errors: u32,
    /// Net score change before the per-tick floor at zero.
    pub score_delta: f64,
    pub health_lost: u32,
}

/// Owns a player's [`PlayerState`] and [`WordEngine`].
///
/// Input arrives at any time through [`on_key_input`](Self::on_key_input)
/// and is only read by the simulation in [`update`](Self::update).
pub struct PlayerSession<S> {
    state: PlayerState,
    input: InputBuffer,
    engine: WordEngine<S>,
    config: SessionConfig,
}

impl<S: WordSupplier> PlayerSession<S> {
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        engine: WordEngine<S>,
        config: SessionConfig,
    ) -> Self {
        Self {
            state: PlayerState::new(id, name, config.initial_health),
            input: InputBuffer::default(),
            engine,
            config,
        }
    }

    pub fn id(&self) -> &PlayerId {
        &self.state.id
    }

    /// The live state. Clone it before handing it outside the room.
    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// The player's current typed buffer.
    pub fn typed(&self) -> &str {
        &self.input.typed
    }

    /// Applies one keystroke to the input buffer.
    ///
    /// A submit is not acted on here: it is read by the next tick, and
    /// the buffer is cleared when the next character arrives.
    pub fn on_key_input(&mut self, key: Key) {
        match key {
            Key::Backspace => {
                self.input.typed.pop();
            }
            Key::Submit => {
                self.input.submit = true;
                self.input.clear_on_next_char = true;
            }
            Key::Char(c) => {
                if self.input.clear_on_next_char {
                    self.input.typed.clear();
                }
                self.input.typed.push(c);
                self.input.clear_on_next_char = false;
                self.input.submit = false;
            }
        }
    }

    /// Parses and applies a raw key name as sent by the client.
    ///
    /// # Errors
    /// [`GameError::InvalidKey`] for anything that isn't a known key; the
    /// buffer is left untouched.
    pub fn on_key(&mut self, key: &str) -> Result<(), GameError> {
        let key = key.parse()?;
        self.on_key_input(key);
        Ok(())
    }

    /// Fetches the first screen of words. Called once before the room
    /// starts playing.
    pub async fn initialize_words(&mut self) -> Result<(), GameError> {
        let words = self.engine.current_words().await?;
        self.state.words = words.to_vec();
        debug!(player_id = %self.state.id, words = self.state.words.len(), "words initialized");
        Ok(())
    }

    /// `true` once health has reached 0.
    pub fn is_dead(&self) -> bool {
        self.state.health == 0
    }

    /// Runs one simulation step and applies the resulting stat changes.
    pub async fn update(
        &mut self,
        width: f64,
        height: f64,
        dt: f64,
    ) -> Result<TickReport, GameError> {
        let input = InputSnapshot {
            typed: self.input.typed.clone(),
            submit: std::mem::take(&mut self.input.submit),
        };

        let words = self.engine.update(&input, width, height, dt).await?;

        let mut report = TickReport::default();
        let mut effective_combo = self.state.combo;

        for word in words {
            let difficulty = f64::from(word.difficulty);
            match word.status {
                WordStatus::Completed => {
                    report.score_delta += difficulty * (1.0 + f64::from(effective_combo) * 0.1);
                    effective_combo += 1;
                    report.completed += 1;
                    self.state.chaos_points = (self.state.chaos_points
                        + self.config.chaos_per_completion)
                        % self.config.chaos_modulus;
                }
                WordStatus::Missed => {
                    report.score_delta -= difficulty * (1.0 + f64::from(effective_combo) * 0.05);
                    let lost = u32::from(word.difficulty).min(self.state.health);
                    self.state.health -= lost;
                    report.health_lost += lost;
                    report.missed += 1;
                }
                WordStatus::Error => {
                    report.score_delta -= difficulty * 0.5;
                    report.errors += 1;
                }
                WordStatus::Active | WordStatus::Typing => {}
            }
        }

        self.state.words = words.to_vec();
        self.state.typed = input.typed;
        self.state.score += report.score_delta.max(0.0);
        self.state.combo = if report.missed > 0 {
            0
        } else {
            self.state.combo + report.completed
        };
        self.state.is_safe = self.state.combo >= self.config.safe_combo_threshold;

        if self.is_dead() && report.health_lost > 0 {
            info!(player_id = %self.state.id, score = self.state.score, "player died");
        }

        Ok(report)
    }
}
