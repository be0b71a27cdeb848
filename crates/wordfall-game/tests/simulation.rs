//! Integration tests for the word engine and player session, driven by a
//! scripted word supplier.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wordfall_game::{
    EngineConfig, GameError, InputSnapshot, Key, PlayerSession, SessionConfig, SuppliedWord,
    WordEngine, WordSupplier,
};
use wordfall_protocol::{PlayerId, WordStatus};

// =========================================================================
// Scripted supplier
// =========================================================================

/// Hands out unique alphanumeric words (`b0w0`, `b0w1`, ...) with a fixed
/// difficulty, optionally coming up `short_by` words short.
struct Scripted {
    difficulty: u8,
    short_by: usize,
    calls: AtomicUsize,
    last_avoid: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(difficulty: u8) -> Arc<Self> {
        Arc::new(Self {
            difficulty,
            short_by: 0,
            calls: AtomicUsize::new(0),
            last_avoid: Mutex::new(Vec::new()),
        })
    }

    fn short(short_by: usize) -> Arc<Self> {
        Arc::new(Self {
            difficulty: 1,
            short_by,
            calls: AtomicUsize::new(0),
            last_avoid: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WordSupplier for Scripted {
    async fn supply(
        &self,
        count: usize,
        avoid: &[String],
    ) -> Result<Vec<SuppliedWord>, GameError> {
        let batch = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_avoid.lock().unwrap() = avoid.to_vec();
        Ok((0..count.saturating_sub(self.short_by))
            .map(|i| SuppliedWord::new(format!("b{batch}w{i}"), self.difficulty))
            .collect())
    }
}

// =========================================================================
// Helpers
// =========================================================================

const W: f64 = 800.0;
const H: f64 = 800.0;
/// One 60 Hz tick.
const DT: f64 = 1.0 / 60.0;
/// Long enough for every word to fall past the bottom.
const DT_ALL_FALL: f64 = 100.0;

fn engine(supplier: Arc<Scripted>) -> WordEngine<Scripted> {
    WordEngine::with_seed(supplier, EngineConfig::default(), 42)
}

fn session(supplier: Arc<Scripted>) -> PlayerSession<Scripted> {
    PlayerSession::new(
        PlayerId::from("p1"),
        "Ada",
        engine(supplier),
        SessionConfig::default(),
    )
}

fn type_word(session: &mut PlayerSession<Scripted>, text: &str) {
    for c in text.chars() {
        session.on_key_input(Key::Char(c));
    }
    session.on_key_input(Key::Submit);
}

/// Types the first on-screen word that isn't finished and submits it.
fn type_first_live_word(session: &mut PlayerSession<Scripted>) -> String {
    let text = session
        .state()
        .words
        .iter()
        .find(|w| w.is_placed() && !w.status.is_terminal())
        .map(|w| w.text.clone())
        .expect("a live placed word");
    type_word(session, &text);
    text
}

// =========================================================================
// WordEngine
// =========================================================================

#[tokio::test]
async fn test_current_words_fills_screen_and_stack() {
    let supplier = Scripted::new(1);
    let mut engine = engine(supplier.clone());

    let words = engine.current_words().await.unwrap();
    assert_eq!(words.len(), 15);
    assert!(words.iter().all(|w| !w.is_placed()));
    assert!(words.iter().all(|w| w.status == WordStatus::Active));
    assert_eq!(engine.stack_len(), 15 * 15 - 15);
    assert_eq!(supplier.calls(), 1);

    // A warm stack means no further supplier calls.
    engine.current_words().await.unwrap();
    assert_eq!(supplier.calls(), 1);
}

#[tokio::test]
async fn test_short_supplier_breaks_contract() {
    let mut engine = engine(Scripted::short(1));
    let err = engine.current_words().await.unwrap_err();
    assert!(matches!(
        err,
        GameError::SupplierContract {
            requested: 225,
            returned: 224
        }
    ));
    assert!(engine.words().is_empty());
}

#[tokio::test]
async fn test_first_update_places_every_word() {
    let mut engine = engine(Scripted::new(1));
    engine.current_words().await.unwrap();

    let words = engine.update(&InputSnapshot::default(), W, H, DT).await.unwrap();
    assert_eq!(words.len(), 15);
    for word in words {
        assert!(word.is_placed());
        assert!(word.position.x >= 0.0 && word.position.x < W / 1.3);
        assert!(word.position.y <= 30.0 * DT + 1e-9);
        assert_eq!(word.status, WordStatus::Active);
    }
}

#[tokio::test]
async fn test_words_fall_by_speed_times_dt() {
    let mut engine = engine(Scripted::new(1));
    engine.current_words().await.unwrap();
    let before: Vec<f64> = engine
        .update(&InputSnapshot::default(), W, H, DT)
        .await
        .unwrap()
        .iter()
        .map(|w| w.position.y)
        .collect();

    let after = engine.update(&InputSnapshot::default(), W, H, 0.5).await.unwrap();
    for (y0, word) in before.iter().zip(after) {
        assert!((word.position.y - (y0 + 15.0)).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_off_screen_words_are_missed_even_when_submitted() {
    let mut engine = engine(Scripted::new(1));
    engine.current_words().await.unwrap();
    engine.update(&InputSnapshot::default(), W, H, DT).await.unwrap();

    let text = engine.words()[0].text.clone();
    let input = InputSnapshot::new(text, true);
    let words = engine.update(&input, W, H, DT_ALL_FALL).await.unwrap();
    assert!(words.iter().all(|w| w.status == WordStatus::Missed));
}

#[tokio::test]
async fn test_finished_words_linger_for_one_tick() {
    let mut engine = engine(Scripted::new(1));
    engine.current_words().await.unwrap();
    engine.update(&InputSnapshot::default(), W, H, DT).await.unwrap();

    let target = engine.words()[3].clone();
    let words = engine
        .update(&InputSnapshot::new(target.text.clone(), true), W, H, DT)
        .await
        .unwrap();
    let done = words.iter().find(|w| w.id == target.id).unwrap();
    assert_eq!(done.status, WordStatus::Completed);
    assert_eq!(done.typed, target.text);

    let words = engine.update(&InputSnapshot::default(), W, H, DT).await.unwrap();
    assert!(words.iter().all(|w| w.id != target.id));
    assert_eq!(words.len(), 15, "screen is topped back up");
}

#[tokio::test]
async fn test_exact_buffer_without_submit_is_typing() {
    let mut engine = engine(Scripted::new(1));
    engine.current_words().await.unwrap();
    engine.update(&InputSnapshot::default(), W, H, DT).await.unwrap();

    let target = engine.words()[0].clone();
    let words = engine
        .update(&InputSnapshot::new(target.text.clone(), false), W, H, DT)
        .await
        .unwrap();
    let word = words.iter().find(|w| w.id == target.id).unwrap();
    assert_eq!(word.status, WordStatus::Typing);
    assert_eq!(
        words.iter().filter(|w| w.status != WordStatus::Active).count(),
        1,
        "only the candidate changes status"
    );
}

#[tokio::test]
async fn test_live_words_never_exceed_max_and_stack_refills() {
    let supplier = Scripted::new(1);
    let config = EngineConfig {
        max_words: 3,
        stack_multiplier: 2,
        ..EngineConfig::default()
    };
    let mut engine = WordEngine::with_seed(supplier.clone(), config, 7);
    engine.current_words().await.unwrap();
    assert_eq!(supplier.calls(), 1);

    for _ in 0..6 {
        let words = engine
            .update(&InputSnapshot::default(), W, H, DT_ALL_FALL)
            .await
            .unwrap()
            .to_vec();
        assert!(words.len() <= 3);
        assert!(engine.stack_len() + words.len() >= 3);
    }
    assert!(supplier.calls() > 1, "stack should have been refilled");

    // Refills avoid the words already in play.
    let avoid = supplier.last_avoid.lock().unwrap().clone();
    assert!(!avoid.is_empty());
}

// =========================================================================
// PlayerSession input
// =========================================================================

#[tokio::test]
async fn test_backspace_and_submit_buffer_semantics() {
    let mut s = session(Scripted::new(1));
    s.on_key("c").unwrap();
    s.on_key("a").unwrap();
    s.on_key("x").unwrap();
    s.on_key("Backspace").unwrap();
    assert_eq!(s.typed(), "ca");

    // Submit doesn't clear the buffer by itself...
    s.on_key("Enter").unwrap();
    assert_eq!(s.typed(), "ca");

    // ...the next character starts a fresh one.
    s.on_key("t").unwrap();
    assert_eq!(s.typed(), "t");
}

#[tokio::test]
async fn test_backspace_on_empty_buffer_is_harmless() {
    let mut s = session(Scripted::new(1));
    s.on_key_input(Key::Backspace);
    assert_eq!(s.typed(), "");
}

#[tokio::test]
async fn test_invalid_key_leaves_buffer_untouched() {
    let mut s = session(Scripted::new(1));
    s.on_key("a").unwrap();
    assert!(matches!(s.on_key("Shift"), Err(GameError::InvalidKey(_))));
    assert_eq!(s.typed(), "a");
}

// =========================================================================
// PlayerSession stats
// =========================================================================

#[tokio::test]
async fn test_initialize_words_populates_state() {
    let mut s = session(Scripted::new(1));
    s.initialize_words().await.unwrap();
    assert_eq!(s.state().words.len(), 15);
    assert_eq!(s.state().health, 100);
    assert!(!s.is_dead());
}

#[tokio::test]
async fn test_completion_scores_and_adds_chaos() {
    let mut s = session(Scripted::new(2));
    s.initialize_words().await.unwrap();
    s.update(W, H, DT).await.unwrap();

    let text = type_first_live_word(&mut s);
    let report = s.update(W, H, DT).await.unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(s.state().score, 2.0);
    assert_eq!(s.state().combo, 1);
    assert_eq!(s.state().chaos_points, 5);
    assert_eq!(s.state().typed, text);
    assert!(
        s.state()
            .words
            .iter()
            .any(|w| w.text == text && w.status == WordStatus::Completed)
    );
}

#[tokio::test]
async fn test_submit_is_consumed_by_one_tick() {
    let mut s = session(Scripted::new(2));
    s.initialize_words().await.unwrap();
    s.update(W, H, DT).await.unwrap();

    let text = s.state().words[0].text.clone();
    type_word(&mut s, &text);
    s.update(W, H, DT).await.unwrap();
    let report = s.update(W, H, DT).await.unwrap();
    assert_eq!(report.completed, 0);
}

#[tokio::test]
async fn test_combo_compounds_score_and_reaches_safety() {
    let mut s = session(Scripted::new(2));
    s.initialize_words().await.unwrap();
    s.update(W, H, DT).await.unwrap();

    let mut expected_score = 0.0;
    for n in 0..10u32 {
        assert!(!s.state().is_safe);
        type_first_live_word(&mut s);
        let report = s.update(W, H, DT).await.unwrap();
        assert_eq!(report.completed, 1);
        expected_score += 2.0 * (1.0 + f64::from(n) * 0.1);
        assert_eq!(s.state().combo, n + 1);
    }

    assert!(s.state().is_safe);
    assert!((s.state().score - expected_score).abs() < 1e-9);
    assert_eq!(s.state().chaos_points, 50);
}

#[tokio::test]
async fn test_miss_resets_combo_costs_health_but_not_score() {
    let mut s = session(Scripted::new(2));
    s.initialize_words().await.unwrap();
    s.update(W, H, DT).await.unwrap();

    type_first_live_word(&mut s);
    s.update(W, H, DT).await.unwrap();
    let score = s.state().score;
    assert_eq!(s.state().combo, 1);

    let report = s.update(W, H, DT_ALL_FALL).await.unwrap();
    assert_eq!(report.missed, 14, "the completed word is retired, not missed");
    assert!(report.score_delta < 0.0);
    assert_eq!(s.state().score, score, "negative ticks never lower the score");
    assert_eq!(s.state().combo, 0);
    assert!(!s.state().is_safe);
    assert_eq!(s.state().health, 100 - 14 * 2);
}

#[tokio::test]
async fn test_mistyped_buffer_marks_one_error_and_costs_half_difficulty() {
    let mut s = session(Scripted::new(4));
    s.initialize_words().await.unwrap();
    s.update(W, H, DT).await.unwrap();

    type_first_live_word(&mut s);
    s.update(W, H, DT).await.unwrap();
    assert_eq!(s.state().score, 4.0);
    assert_eq!(s.state().combo, 1);

    // No word starts with 'w', so the buffer binds to the closest word
    // and is not a prefix of it.
    for c in "wzzz".chars() {
        s.on_key_input(Key::Char(c));
    }
    let report = s.update(W, H, DT).await.unwrap();

    assert_eq!(report.errors, 1);
    assert_eq!(report.completed, 0);
    assert_eq!(report.missed, 0);
    assert_eq!(report.score_delta, -2.0);
    assert_eq!(
        s.state()
            .words
            .iter()
            .filter(|w| w.status == WordStatus::Error)
            .count(),
        1
    );
    assert_eq!(s.state().score, 4.0, "a negative tick never lowers the score");
    assert_eq!(s.state().combo, 1);
    assert_eq!(s.state().health, 100);
}

#[tokio::test]
async fn test_health_floors_at_zero() {
    let mut s = session(Scripted::new(10));
    s.initialize_words().await.unwrap();
    s.update(W, H, DT).await.unwrap();

    let report = s.update(W, H, DT_ALL_FALL).await.unwrap();
    assert_eq!(report.missed, 15);
    assert_eq!(report.health_lost, 100);
    assert_eq!(s.state().health, 0);
    assert!(s.is_dead());
}

#[tokio::test]
async fn test_clean_round_keeps_full_health() {
    let mut s = session(Scripted::new(3));
    s.initialize_words().await.unwrap();
    s.update(W, H, DT).await.unwrap();
    for _ in 0..20 {
        type_first_live_word(&mut s);
        s.update(W, H, DT).await.unwrap();
        assert_eq!(s.state().health, 100);
    }
}
