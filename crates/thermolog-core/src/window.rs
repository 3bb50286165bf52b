//! Windowed averaging for the hourly and daily logs.
//!
//! Each aggregation tier buffers every raw sample it is shown. When at least
//! one period has passed since the window opened, the buffered samples are
//! averaged, written to the tier's log, and the window restarts at `now`.
//! Windows are measured from the last elapsed check, not aligned to the clock
//! face, so they drift with process restarts.

use log::info;

use crate::entry::Entry;
use crate::error::Result;
use crate::store::{DAY_SECS, HOUR_SECS, LogStore, LogTier, PruneReport};

/// Tiers that average raw samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationTier {
    Hourly,
    Daily,
}

impl AggregationTier {
    pub const ALL: [AggregationTier; 2] = [AggregationTier::Hourly, AggregationTier::Daily];

    /// Window length in seconds.
    pub const fn period_secs(self) -> i64 {
        match self {
            Self::Hourly => HOUR_SECS,
            Self::Daily => DAY_SECS,
        }
    }

    /// Log that receives this tier's means.
    pub const fn log(self) -> LogTier {
        match self {
            Self::Hourly => LogTier::Hourly,
            Self::Daily => LogTier::Daily,
        }
    }
}

/// What a call to [`WindowAggregator::maybe_flush`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlushOutcome {
    /// The window is still open.
    Pending,
    /// The window elapsed with nothing buffered; it restarted without writing.
    Idle,
    /// The window elapsed and its mean was written. `pruned` is the report
    /// from the retention pass that followed the append.
    Flushed {
        entry: Entry,
        pruned: Option<PruneReport>,
    },
}

/// Sample buffer for one aggregation window.
#[derive(Debug, Clone)]
pub struct WindowAccumulator {
    samples: Vec<f64>,
    window_start: i64,
}

impl WindowAccumulator {
    pub fn new(window_start: i64) -> Self {
        Self {
            samples: Vec::new(),
            window_start,
        }
    }

    pub fn observe(&mut self, value: f64) {
        self.samples.push(value);
    }

    /// Start time of the current window.
    pub fn window_start(&self) -> i64 {
        self.window_start
    }

    /// Number of samples buffered in the current window.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Arithmetic mean of the buffered samples, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().sum();
        Some(sum / self.samples.len() as f64)
    }

    /// True once `period` seconds have passed since the window opened.
    pub fn elapsed(&self, now: i64, period: i64) -> bool {
        now.saturating_sub(self.window_start) >= period
    }

    /// Close the window at `now`: return the mean (if any) and start afresh.
    fn roll(&mut self, now: i64) -> Option<f64> {
        let mean = self.mean();
        self.samples.clear();
        self.window_start = now;
        mean
    }
}

/// Hourly and daily accumulators, owned by the ingest loop.
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    hourly: WindowAccumulator,
    daily: WindowAccumulator,
}

impl WindowAggregator {
    /// Open both windows at `start` (normally process start).
    pub fn new(start: i64) -> Self {
        Self {
            hourly: WindowAccumulator::new(start),
            daily: WindowAccumulator::new(start),
        }
    }

    pub fn accumulator(&self, tier: AggregationTier) -> &WindowAccumulator {
        match tier {
            AggregationTier::Hourly => &self.hourly,
            AggregationTier::Daily => &self.daily,
        }
    }

    fn accumulator_mut(&mut self, tier: AggregationTier) -> &mut WindowAccumulator {
        match tier {
            AggregationTier::Hourly => &mut self.hourly,
            AggregationTier::Daily => &mut self.daily,
        }
    }

    /// Buffer one raw sample for `tier`.
    pub fn observe(&mut self, tier: AggregationTier, value: f64) {
        self.accumulator_mut(tier).observe(value);
    }

    /// Flush `tier` if its window has elapsed.
    ///
    /// The window restarts at `now` whenever the period has passed, even if
    /// nothing was buffered. A non-empty window is averaged, appended to the
    /// tier's log, and the log is pruned. The window is reset before any I/O,
    /// so a storage error loses that window's mean but nothing else.
    pub fn maybe_flush(
        &mut self,
        tier: AggregationTier,
        now: i64,
        store: &LogStore,
    ) -> Result<FlushOutcome> {
        let acc = self.accumulator_mut(tier);
        if !acc.elapsed(now, tier.period_secs()) {
            return Ok(FlushOutcome::Pending);
        }
        let count = acc.len();
        let Some(mean) = acc.roll(now) else {
            return Ok(FlushOutcome::Idle);
        };

        let entry = Entry::new(now, mean);
        store.append(tier.log(), entry)?;
        let pruned = store.prune(tier.log(), now)?;
        info!("{} mean {:.2} over {count} samples", tier.log(), mean);
        Ok(FlushOutcome::Flushed { entry, pruned })
    }
}
