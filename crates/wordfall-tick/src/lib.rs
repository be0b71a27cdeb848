//! Fixed-rate tick scheduler for Wordfall rooms.
//!
//! A [`TickScheduler`] is a cancellable repeating timer. It is created
//! stopped, [`start`](TickScheduler::start)ed when a room begins playing,
//! and [`stop`](TickScheduler::stop)ped when the room finishes or is torn
//! down. While stopped, [`TickScheduler::wait_for_tick`] pends forever,
//! so the scheduler can sit in a room actor's `tokio::select!` loop for
//! the room's whole life:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         tick = scheduler.wait_for_tick() => {
//!             room.update(tick.dt_secs()).await;
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! # Delta time
//!
//! Ticks are scheduled on a fixed cadence, but [`TickInfo::dt`] is the
//! time actually elapsed since the previous tick (or since `start`),
//! measured against the clock. Simulation code advances by `dt`, so a
//! tick that fires late still moves the world the right distance.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Tick rate in Hz. 0 disables ticking entirely (`start` is a no-op).
    pub tick_rate_hz: u32,
    /// Budget warning threshold (0.0–1.0) as a fraction of the tick period.
    pub budget_warn_threshold: f64,
    /// Budget critical threshold (0.0–1.0).
    pub budget_critical_threshold: f64,
    /// Collect per-tick timing metrics.
    pub metrics_enabled: bool,
    /// Random jitter (0–max µs) added to the first tick after `start`,
    /// so rooms started in the same instant don't tick in lockstep.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            budget_warn_threshold: 0.80,
            budget_critical_threshold: 1.0,
            metrics_enabled: true,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    /// A config for a specific tick rate with default thresholds.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values. Called by [`TickScheduler::new`].
    ///
    /// - `tick_rate_hz` capped to [`Self::MAX_TICK_RATE_HZ`].
    /// - Thresholds clamped to `0.0..=1.0`, warn ≤ critical.
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self.budget_critical_threshold = self.budget_critical_threshold.clamp(0.0, 1.0);
        if self.budget_warn_threshold > self.budget_critical_threshold {
            self.budget_warn_threshold = self.budget_critical_threshold;
        }
        self
    }

    /// Period of a single tick, or `None` when ticking is disabled.
    pub fn tick_duration(&self) -> Option<Duration> {
        if self.tick_rate_hz == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64))
        }
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`] for every tick.
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Tick number since the scheduler was created (starts at 1).
    pub tick: u64,
    /// Time elapsed since the previous tick, or since `start` for the
    /// first tick after starting.
    pub dt: Duration,
    /// `true` if this tick woke up more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods that were skipped because of the overrun.
    pub ticks_skipped: u64,
}

impl TickInfo {
    /// `dt` in fractional seconds.
    pub fn dt_secs(&self) -> f64 {
        self.dt.as_secs_f64()
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics, updated by [`TickScheduler::record_tick_end`].
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Exponential moving average of tick execution time (α = 0.1).
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
    /// Last tick's execution time as a fraction of the period. >1.0 is an overrun.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Cancellable fixed-rate tick scheduler. One per room.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Option<Duration>,
    tick_count: u64,
    running: bool,
    /// When the next tick should fire.
    next_tick: Option<TokioInstant>,
    /// When the previous tick fired (or `start` was called). `dt` is
    /// measured from here.
    last_tick_at: Option<TokioInstant>,
    /// Wall-clock start of the current tick's work, consumed by
    /// `record_tick_end`.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Creates a stopped scheduler.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        debug!(
            rate_hz = config.tick_rate_hz,
            budget_ms = ?tick_duration.map(|d| d.as_secs_f64() * 1000.0),
            "tick scheduler created"
        );

        Self {
            config,
            tick_duration,
            tick_count: 0,
            running: false,
            next_tick: None,
            last_tick_at: None,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// A stopped scheduler for a specific tick rate.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Starts ticking. The first tick fires one period (plus jitter) from now.
    ///
    /// Calling `start` on a running scheduler does nothing.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        let Some(period) = self.tick_duration else {
            debug!("tick rate is 0, scheduler stays stopped");
            return;
        };

        let jitter = if self.config.initial_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..self.config.initial_jitter_us))
        } else {
            Duration::ZERO
        };

        let now = TokioInstant::now();
        self.running = true;
        self.last_tick_at = Some(now);
        self.next_tick = Some(now + period + jitter);
        debug!(tick = self.tick_count, "tick scheduler started");
    }

    /// Stops ticking. Any pending [`wait_for_tick`](Self::wait_for_tick)
    /// future that is polled again will pend forever.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.next_tick = None;
            self.tick_start = None;
            debug!(tick = self.tick_count, "tick scheduler stopped");
        }
    }

    /// Waits until the next tick is due.
    ///
    /// Pends forever while stopped. The next deadline keeps the fixed
    /// cadence when the tick is on time, and restarts from now after an
    /// overrun so a slow tick never triggers a burst of catch-up ticks.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, period) = match (self.running, self.next_tick, self.tick_duration) {
            (true, Some(next), Some(period)) => (next, period),
            _ => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        let dt = self
            .last_tick_at
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(period);
        self.last_tick_at = Some(now);
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0u64;

        self.next_tick = Some(if overrun {
            ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
            if ticks_skipped > 0 {
                warn!(
                    tick = self.tick_count,
                    skipped = ticks_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "tick overrun, skipping ahead"
                );
            }
            now + period
        } else {
            next + period
        });

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, dt_ms = dt.as_secs_f64() * 1000.0, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt,
            overrun,
            ticks_skipped,
        }
    }

    /// Records that the current tick's work has finished, for budget
    /// warnings and metrics. Does nothing if no tick is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();

        if let Some(budget) = self.tick_duration {
            let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
            self.metrics.budget_utilization = utilization;

            if utilization >= self.config.budget_critical_threshold {
                warn!(
                    tick = self.tick_count,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    budget_ms = budget.as_secs_f64() * 1000.0,
                    utilization_pct = format!("{:.1}", utilization * 100.0),
                    "CRITICAL: tick exceeded budget"
                );
            } else if utilization >= self.config.budget_warn_threshold {
                warn!(
                    tick = self.tick_count,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    budget_ms = budget.as_secs_f64() * 1000.0,
                    utilization_pct = format!("{:.1}", utilization * 100.0),
                    "tick approaching budget limit"
                );
            }
        }

        if self.config.metrics_enabled {
            if elapsed > self.metrics.max_tick_time {
                self.metrics.max_tick_time = elapsed;
            }
            let alpha = 0.1;
            let prev = self.metrics.avg_tick_time.as_secs_f64();
            let curr = elapsed.as_secs_f64();
            self.metrics.avg_tick_time =
                Duration::from_secs_f64(prev * (1.0 - alpha) + curr * alpha);
        }
    }

    /// Whether the scheduler is currently ticking.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// When the last tick fired (or when the scheduler was last started).
    pub fn last_tick_at(&self) -> Option<TokioInstant> {
        self.last_tick_at
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    /// The tick period, or `None` when ticking is disabled.
    pub fn tick_duration(&self) -> Option<Duration> {
        self.tick_duration
    }
}
