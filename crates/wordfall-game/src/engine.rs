//! The falling-word engine, one per player.
//!
//! The engine keeps two lists: the live words on screen (at most
//! `max_words`) and a backing stack of words fetched in bulk from the
//! [`WordSupplier`]. Every tick it places new words, moves them down,
//! classifies them against the player's input, and refills the screen
//! from the stack.
//!
//! A word that ends a tick `Completed` or `Missed` stays in the live list
//! for exactly one more snapshot, then is dropped at the start of the
//! following tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error};
use wordfall_protocol::{Vec2, Word, WordId, WordStatus};

use crate::matching::select_candidate;
use crate::{GameError, WordSupplier};

/// Counter for process-wide unique word ids.
static NEXT_WORD_ID: AtomicU64 = AtomicU64::new(1);

fn next_word_id() -> WordId {
    WordId(NEXT_WORD_ID.fetch_add(1, Ordering::Relaxed))
}

/// Tunables for a [`WordEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Live words on screen at once.
    pub max_words: usize,
    /// A stack refill asks the supplier for `max_words * stack_multiplier` words.
    pub stack_multiplier: usize,
    /// Units per second.
    pub fall_speed: f64,
    /// Spawn `x` is drawn from `[0, width / spawn_width_divisor)`.
    pub spawn_width_divisor: f64,
    /// Spawn `y` is drawn from `(-spawn_height_jitter, 0]`.
    pub spawn_height_jitter: f64,
    pub min_spawn_dx: f64,
    pub min_spawn_dy: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_words: 15,
            stack_multiplier: 15,
            fall_speed: 30.0,
            spawn_width_divisor: 1.3,
            spawn_height_jitter: 150.0,
            min_spawn_dx: 150.0,
            min_spawn_dy: 80.0,
        }
    }
}

/// The player's input as of one tick, passed to the engine by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub typed: String,
    /// A submit key arrived since the previous tick.
    pub submit: bool,
}

impl InputSnapshot {
    pub fn new(typed: impl Into<String>, submit: bool) -> Self {
        Self {
            typed: typed.into(),
            submit,
        }
    }
}

/// Owns one player's falling words.
pub struct WordEngine<S> {
    supplier: Arc<S>,
    config: EngineConfig,
    active: Vec<Word>,
    stack: Vec<Word>,
    last_spawn: Option<Vec2>,
    rng: StdRng,
}

impl<S: WordSupplier> WordEngine<S> {
    pub fn new(supplier: Arc<S>, config: EngineConfig) -> Self {
        Self::with_rng(supplier, config, StdRng::from_os_rng())
    }

    /// An engine with deterministic spawn positions.
    pub fn with_seed(supplier: Arc<S>, config: EngineConfig, seed: u64) -> Self {
        Self::with_rng(supplier, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(supplier: Arc<S>, config: EngineConfig, rng: StdRng) -> Self {
        Self {
            supplier,
            config,
            active: Vec::new(),
            stack: Vec::new(),
            last_spawn: None,
            rng,
        }
    }

    /// Makes sure the backing stack is stocked, fills the screen up to
    /// `max_words`, and returns the live words.
    ///
    /// # Errors
    /// [`GameError::SupplierContract`] if the supplier returns fewer words
    /// than requested, or any error the supplier itself raised.
    pub async fn current_words(&mut self) -> Result<&[Word], GameError> {
        self.ensure_stack().await?;
        self.top_up();
        Ok(&self.active)
    }

    /// Advances the simulation by `dt` seconds for a `width` × `height`
    /// play area and returns the refreshed live words.
    pub async fn update(
        &mut self,
        input: &InputSnapshot,
        width: f64,
        height: f64,
        dt: f64,
    ) -> Result<&[Word], GameError> {
        let before = self.active.len();
        self.active.retain(|w| !w.status.is_terminal());
        let retired = before - self.active.len();

        let candidate = select_candidate(&self.active, &input.typed);

        let Self {
            active,
            config,
            last_spawn,
            rng,
            ..
        } = self;

        for (i, word) in active.iter_mut().enumerate() {
            if !word.is_placed() {
                let point = spawn_point(config, rng, *last_spawn, width);
                word.position = point;
                *last_spawn = Some(point);
            }

            word.position.y += config.fall_speed * dt;
            word.status = classify(word, input, candidate == Some(i), height);
            word.typed.clone_from(&input.typed);
        }

        if retired > 0 {
            debug!(retired, live = self.active.len(), "retired finished words");
        }

        self.ensure_stack().await?;
        self.top_up();
        Ok(&self.active)
    }

    /// The live words without touching the supplier.
    pub fn words(&self) -> &[Word] {
        &self.active
    }

    /// Words waiting in the backing stack.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn ensure_stack(&mut self) -> Result<(), GameError> {
        let max_words = self.config.max_words;
        if self.stack.len() >= max_words {
            return Ok(());
        }

        let requested = max_words * self.config.stack_multiplier;
        let avoid: Vec<String> = self
            .active
            .iter()
            .chain(&self.stack)
            .map(|w| w.text.clone())
            .collect();

        let supplied = self.supplier.supply(requested, &avoid).await?;
        if supplied.len() < requested {
            error!(requested, returned = supplied.len(), "word supplier broke its contract");
            return Err(GameError::SupplierContract {
                requested,
                returned: supplied.len(),
            });
        }

        self.stack.extend(
            supplied
                .into_iter()
                .filter(|w| !w.text.is_empty())
                .map(|w| Word::new(next_word_id(), w.text, w.difficulty)),
        );

        if self.stack.len() < max_words {
            error!(stack = self.stack.len(), max_words, "word stack still short after refill");
            return Err(GameError::SupplierContract {
                requested: max_words,
                returned: self.stack.len(),
            });
        }

        debug!(requested, stack = self.stack.len(), "word stack refilled");
        Ok(())
    }

    fn top_up(&mut self) {
        while self.active.len() < self.config.max_words {
            match self.stack.pop() {
                Some(word) => self.active.push(word),
                None => break,
            }
        }
    }
}

/// Picks a spawn point above the visible area, kept clear of the
/// previous spawn by `min_spawn_dx` horizontally or `min_spawn_dy`
/// vertically.
fn spawn_point(config: &EngineConfig, rng: &mut StdRng, last: Option<Vec2>, width: f64) -> Vec2 {
    let span = width / config.spawn_width_divisor;
    let mut x = if span > 0.0 { rng.random_range(0.0..span) } else { 0.0 };
    let mut y = if config.spawn_height_jitter > 0.0 {
        -rng.random_range(0.0..config.spawn_height_jitter)
    } else {
        0.0
    };

    if let Some(last) = last {
        let crowded =
            (x - last.x).abs() < config.min_spawn_dx && (y - last.y).abs() < config.min_spawn_dy;
        if crowded {
            if last.x + config.min_spawn_dx < span {
                x = last.x + config.min_spawn_dx;
            } else if last.x - config.min_spawn_dx >= 0.0 {
                x = last.x - config.min_spawn_dx;
            } else {
                y = last.y - config.min_spawn_dy;
            }
        }
    }

    let point = Vec2::new(x, y);
    // (0, 0) means "unplaced"; nudge off it.
    if point == Vec2::ORIGIN {
        Vec2::new(0.0, -1.0)
    } else {
        point
    }
}

fn classify(word: &Word, input: &InputSnapshot, is_candidate: bool, height: f64) -> WordStatus {
    if word.position.y >= height {
        return WordStatus::Missed;
    }
    if !is_candidate {
        return WordStatus::Active;
    }
    if input.submit && input.typed == word.text {
        WordStatus::Completed
    } else if word.text.starts_with(input.typed.as_str()) {
        WordStatus::Typing
    } else {
        WordStatus::Error
    }
}
