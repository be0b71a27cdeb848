//! Word supply: the source of every word a player will ever see.
//!
//! The engine asks for words in bulk and keeps them in a backing stack,
//! so a supplier is called rarely and may be slow. [`RetryingSupplier`]
//! wraps any supplier with a per-attempt timeout and backoff so a stalled
//! backend degrades into an error instead of a frozen room.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::time;
use tracing::{debug, warn};
use wordfall_protocol::Word;

use crate::GameError;

/// A word as produced by a supplier, before the engine gives it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppliedWord {
    pub text: String,
    /// 1–10. Out-of-range values are clamped when the engine builds the word.
    pub difficulty: u8,
}

impl SuppliedWord {
    pub fn new(text: impl Into<String>, difficulty: u8) -> Self {
        Self {
            text: text.into(),
            difficulty: difficulty.clamp(Word::MIN_DIFFICULTY, Word::MAX_DIFFICULTY),
        }
    }
}

/// An async source of words.
///
/// # Contract
///
/// `supply(count, avoid)` returns **at least** `count` words. Words in
/// `avoid` should be skipped where the supplier can manage it, but
/// repeats are allowed. The engine checks the length and treats a short
/// answer as fatal for the room.
///
/// `Send + Sync + 'static` because one supplier is shared by every
/// player's engine for the lifetime of the server.
///
/// # Example
///
/// ```rust
/// use wordfall_game::{GameError, SuppliedWord, WordSupplier};
///
/// /// Always hands out the same word.
/// struct Parrot;
///
/// impl WordSupplier for Parrot {
///     async fn supply(
///         &self,
///         count: usize,
///         _avoid: &[String],
///     ) -> Result<Vec<SuppliedWord>, GameError> {
///         Ok(vec![SuppliedWord::new("polly", 2); count])
///     }
/// }
/// ```
pub trait WordSupplier: Send + Sync + 'static {
    fn supply(
        &self,
        count: usize,
        avoid: &[String],
    ) -> impl Future<Output = Result<Vec<SuppliedWord>, GameError>> + Send;
}

// ---------------------------------------------------------------------------
// StaticWordSupplier
// ---------------------------------------------------------------------------

/// Built-in list of common English words with difficulty ratings.
const DEFAULT_WORDS: &[(&str, u8)] = &[
    ("tree", 1), ("walk", 1), ("blue", 2), ("food", 2), ("book", 2), ("dog", 1),
    ("run", 1), ("car", 1), ("bus", 1), ("sky", 1), ("sun", 1), ("star", 1),
    ("moon", 1), ("cat", 1), ("fish", 1), ("river", 1), ("lake", 1), ("bird", 1),
    ("rock", 1), ("sand", 1), ("grass", 1), ("leaf", 1), ("fruit", 1), ("apple", 1),
    ("banana", 2), ("chair", 1), ("table", 1), ("door", 1), ("wall", 1), ("floor", 1),
    ("bed", 1), ("lamp", 1), ("light", 1), ("dark", 1), ("happy", 2), ("sad", 1),
    ("cold", 1), ("hot", 1), ("wet", 1), ("dry", 1), ("fast", 1), ("slow", 1),
    ("big", 1), ("small", 1), ("long", 1), ("short", 1), ("high", 1), ("low", 1),
    ("new", 1), ("old", 1), ("young", 1), ("clean", 1), ("dirty", 1), ("bright", 2),
    ("quiet", 2), ("loud", 1), ("soft", 1), ("hard", 1), ("heavy", 1), ("sharp", 1),
    ("round", 1), ("flat", 1), ("deep", 1), ("shallow", 2), ("near", 1), ("far", 1),
    ("left", 1), ("right", 1), ("up", 1), ("down", 1), ("here", 1), ("there", 1),
    ("yes", 1), ("no", 1), ("good", 1), ("bad", 1), ("wrong", 1), ("easy", 1),
    ("fun", 1), ("boring", 2), ("interesting", 3), ("simple", 2), ("complex", 3), ("open", 1),
    ("close", 1), ("start", 1), ("stop", 1), ("begin", 1), ("end", 1), ("enter", 1),
    ("exit", 1), ("push", 1), ("pull", 1), ("lift", 1), ("drop", 1), ("catch", 1),
    ("throw", 1), ("hit", 1), ("miss", 1), ("win", 1), ("lose", 1), ("play", 1),
    ("work", 1), ("rest", 1), ("sleep", 1), ("wake", 1), ("eat", 1), ("drink", 1),
    ("cook", 1), ("bake", 1), ("roast", 2), ("boil", 1), ("fry", 1), ("grill", 1),
    ("wash", 1), ("brush", 1), ("comb", 1), ("cut", 1), ("shave", 1), ("paint", 1),
    ("draw", 1), ("write", 1), ("read", 1), ("listen", 1), ("speak", 1), ("sing", 1),
    ("dance", 1), ("stand", 1), ("sit", 1), ("lie", 1), ("jump", 1), ("hop", 1),
    ("skip", 1), ("crawl", 1), ("swim", 1), ("climb", 1), ("fall", 1), ("rise", 1),
    ("fly", 1), ("drive", 1), ("ride", 1), ("park", 1), ("turn", 1), ("go", 1),
    ("come", 1), ("leave", 1), ("arrive", 2), ("return", 2), ("stay", 1), ("wait", 1),
    ("meet", 1), ("part", 1), ("join", 1), ("build", 1), ("break", 1), ("fix", 1),
    ("make", 1), ("do", 1), ("create", 2), ("destroy", 2), ("repair", 2), ("change", 1),
    ("move", 1), ("carry", 1), ("transport", 3), ("send", 1), ("receive", 2), ("buy", 1),
    ("sell", 1), ("trade", 2), ("give", 1), ("take", 1), ("keep", 1), ("find", 1),
    ("seek", 1), ("choose", 1), ("pick", 1), ("sort", 1), ("arrange", 2), ("organize", 2),
    ("plan", 1), ("decide", 2), ("think", 1), ("feel", 1), ("know", 1), ("learn", 1),
    ("understand", 2), ("remember", 2), ("forget", 1), ("notice", 1), ("ignore", 2), ("care", 1),
    ("love", 1), ("hate", 1), ("like", 1), ("want", 1), ("need", 1), ("ask", 1),
    ("tell", 1), ("say", 1), ("call", 1), ("name", 1), ("shout", 1), ("whisper", 1),
    ("talk", 1), ("chat", 1),
];

/// Serves words from a fixed list.
///
/// Each call shuffles the list, puts words not in `avoid` first, and
/// cycles through the list again if `count` is larger than it.
#[derive(Debug, Clone)]
pub struct StaticWordSupplier {
    words: Vec<SuppliedWord>,
}

impl StaticWordSupplier {
    /// A supplier over the built-in word list.
    pub fn new() -> Self {
        Self::from_words(
            DEFAULT_WORDS
                .iter()
                .map(|(text, difficulty)| SuppliedWord::new(*text, *difficulty)),
        )
    }

    /// A supplier over a custom list. Empty texts are dropped.
    pub fn from_words(words: impl IntoIterator<Item = SuppliedWord>) -> Self {
        Self {
            words: words.into_iter().filter(|w| !w.text.is_empty()).collect(),
        }
    }

    /// Number of distinct words this supplier knows.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn pick(&self, count: usize, avoid: &[String]) -> Vec<SuppliedWord> {
        let avoid: HashSet<&str> = avoid.iter().map(String::as_str).collect();
        let (mut order, mut repeats): (Vec<&SuppliedWord>, Vec<&SuppliedWord>) = self
            .words
            .iter()
            .partition(|w| !avoid.contains(w.text.as_str()));

        let mut rng = rand::rng();
        order.shuffle(&mut rng);
        repeats.shuffle(&mut rng);
        order.extend(repeats);

        order.into_iter().cycle().take(count).cloned().collect()
    }
}

impl Default for StaticWordSupplier {
    fn default() -> Self {
        Self::new()
    }
}

impl WordSupplier for StaticWordSupplier {
    async fn supply(
        &self,
        count: usize,
        avoid: &[String],
    ) -> Result<Vec<SuppliedWord>, GameError> {
        if self.words.is_empty() && count > 0 {
            return Err(GameError::SupplierUnavailable("word list is empty".into()));
        }
        let words = self.pick(count, avoid);
        debug!(requested = count, avoided = avoid.len(), "supplied words from static list");
        Ok(words)
    }
}

// ---------------------------------------------------------------------------
// RetryingSupplier
// ---------------------------------------------------------------------------

/// Timeout and backoff settings for [`RetryingSupplier`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// How long a single `supply` call may take.
    pub attempt_timeout: Duration,
    /// Retries after the first attempt. 0 means try once.
    pub max_retries: u32,
    /// Wait before the first retry. Doubles on every retry.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(2),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Wraps a supplier with a per-attempt timeout and exponential backoff.
///
/// A short answer from the inner supplier is retried like any other
/// failure. When every attempt fails the caller gets
/// [`GameError::SupplierUnavailable`].
#[derive(Debug, Clone)]
pub struct RetryingSupplier<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: WordSupplier> RetryingSupplier<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: WordSupplier> WordSupplier for RetryingSupplier<S> {
    async fn supply(
        &self,
        count: usize,
        avoid: &[String],
    ) -> Result<Vec<SuppliedWord>, GameError> {
        let mut backoff = self.policy.initial_backoff;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let reason = match time::timeout(
                self.policy.attempt_timeout,
                self.inner.supply(count, avoid),
            )
            .await
            {
                Ok(Ok(words)) if words.len() >= count => return Ok(words),
                Ok(Ok(words)) => format!("short answer: {} of {count} words", words.len()),
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timed out after {:?}", self.policy.attempt_timeout),
            };

            if attempt > self.policy.max_retries {
                warn!(attempt, %reason, "word supply failed, giving up");
                return Err(GameError::SupplierUnavailable(format!(
                    "gave up after {attempt} attempts: {reason}"
                )));
            }

            warn!(
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                %reason,
                "word supply failed, retrying"
            );
            time::sleep(backoff).await;
            backoff = (backoff * 2).min(self.policy.max_backoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_static_supplier_meets_count_by_cycling() {
        let supplier = StaticWordSupplier::from_words([
            SuppliedWord::new("cat", 1),
            SuppliedWord::new("dog", 1),
        ]);
        let words = supplier.supply(5, &[]).await.unwrap();
        assert_eq!(words.len(), 5);
    }

    #[tokio::test]
    async fn test_static_supplier_prefers_unavoided_words() {
        let supplier = StaticWordSupplier::from_words([
            SuppliedWord::new("cat", 1),
            SuppliedWord::new("dog", 1),
            SuppliedWord::new("owl", 1),
        ]);
        let avoid = vec!["cat".to_string(), "dog".to_string()];
        let words = supplier.supply(1, &avoid).await.unwrap();
        assert_eq!(words, vec![SuppliedWord::new("owl", 1)]);
    }

    #[tokio::test]
    async fn test_static_supplier_empty_list_is_unavailable() {
        let supplier = StaticWordSupplier::from_words([SuppliedWord::new("", 1)]);
        assert!(supplier.is_empty());
        let result = supplier.supply(3, &[]).await;
        assert!(matches!(result, Err(GameError::SupplierUnavailable(_))));
    }

    #[test]
    fn test_default_list_has_no_duplicates() {
        let supplier = StaticWordSupplier::new();
        let unique: HashSet<&str> = supplier.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(unique.len(), supplier.len());
        assert!(supplier.len() >= 15);
    }

    #[test]
    fn test_supplied_word_difficulty_is_clamped() {
        assert_eq!(SuppliedWord::new("x", 0).difficulty, 1);
        assert_eq!(SuppliedWord::new("x", 99).difficulty, 10);
    }

    /// Fails a fixed number of times, then delegates.
    struct Flaky {
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    impl WordSupplier for Flaky {
        async fn supply(
            &self,
            count: usize,
            _avoid: &[String],
        ) -> Result<Vec<SuppliedWord>, GameError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(GameError::SupplierUnavailable("backend down".into()));
            }
            Ok(vec![SuppliedWord::new("ok", 1); count])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_supplier_recovers_after_failures() {
        let supplier = RetryingSupplier::new(
            Flaky {
                failures_left: AtomicU32::new(2),
                calls: AtomicU32::new(0),
            },
            RetryPolicy::default(),
        );
        let words = supplier.supply(4, &[]).await.unwrap();
        assert_eq!(words.len(), 4);
        assert_eq!(supplier.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_supplier_gives_up() {
        let supplier = RetryingSupplier::new(
            Flaky {
                failures_left: AtomicU32::new(100),
                calls: AtomicU32::new(0),
            },
            RetryPolicy {
                max_retries: 2,
                ..RetryPolicy::default()
            },
        );
        let result = supplier.supply(4, &[]).await;
        assert!(matches!(result, Err(GameError::SupplierUnavailable(_))));
        assert_eq!(supplier.inner().calls.load(Ordering::SeqCst), 3);
    }

    /// Never answers.
    struct Stalled {
        started: Mutex<u32>,
    }

    impl WordSupplier for Stalled {
        async fn supply(
            &self,
            _count: usize,
            _avoid: &[String],
        ) -> Result<Vec<SuppliedWord>, GameError> {
            if let Ok(mut started) = self.started.lock() {
                *started += 1;
            }
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_supplier_times_out_stalled_attempts() {
        let supplier = RetryingSupplier::new(
            Stalled { started: Mutex::new(0) },
            RetryPolicy {
                max_retries: 1,
                ..RetryPolicy::default()
            },
        );
        let result = supplier.supply(1, &[]).await;
        assert!(matches!(result, Err(GameError::SupplierUnavailable(_))));
        assert_eq!(*supplier.inner().started.lock().unwrap(), 2);
    }
}
