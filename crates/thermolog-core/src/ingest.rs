//! The polling loop that ties source, store and aggregator together.
//!
//! Each iteration:
//! 1. asks the source for one line (none is fine),
//! 2. parses a non-empty line as a number, discarding it on failure,
//! 3. appends it to the raw log, prunes the raw log, feeds both aggregation
//!    windows and lets hourly then daily flush,
//! 4. sleeps the poll interval.
//!
//! No per-sample or per-I/O failure escapes the loop; failures are logged,
//! counted in [`IngestStats`], and the next iteration proceeds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{error, warn};
use serde::Serialize;

use crate::clock::Clock;
use crate::config::IngestConfig;
use crate::entry::{Entry, parse_sample_checked};
use crate::error::Result;
use crate::source::SampleSource;
use crate::store::{LogStore, LogTier, PruneReport};
use crate::window::{AggregationTier, FlushOutcome, WindowAggregator};

/// What one call to [`IngestLoop::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The source had nothing this poll.
    Idle,
    /// A line arrived but was blank or not a number.
    Discarded,
    /// A sample was accepted and written to the raw log (or an attempt was made).
    Recorded(f64),
}

/// Running counters for one ingest session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub samples_recorded: u64,
    pub lines_discarded: u64,
    pub source_errors: u64,
    pub storage_errors: u64,
    pub corrupt_lines_dropped: u64,
    pub hourly_flushes: u64,
    pub daily_flushes: u64,
}

/// Single-threaded ingest loop.
///
/// Owns the source, the aggregation state, and the clock. Nothing is shared.
pub struct IngestLoop<S, C> {
    source: S,
    store: LogStore,
    clock: C,
    aggregator: WindowAggregator,
    poll_interval: Duration,
    stats: IngestStats,
}

impl<S: SampleSource, C: Clock> IngestLoop<S, C> {
    /// Build a loop whose aggregation windows open at `clock.now()`.
    pub fn new(source: S, store: LogStore, clock: C, config: &IngestConfig) -> Self {
        let aggregator = WindowAggregator::new(clock.now());
        Self {
            source,
            store,
            clock,
            aggregator,
            poll_interval: config.poll_interval,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn aggregator(&self) -> &WindowAggregator {
        &self.aggregator
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Poll the source once and dispatch whatever it produced.
    pub fn step(&mut self) -> StepOutcome {
        let line = match self.source.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => return StepOutcome::Idle,
            Err(e) => {
                warn!("sample source read failed: {e}");
                self.stats.source_errors += 1;
                return StepOutcome::Idle;
            }
        };

        if line.trim().is_empty() {
            self.stats.lines_discarded += 1;
            return StepOutcome::Discarded;
        }

        let value = match parse_sample_checked(&line) {
            Ok(value) => value,
            Err(e) => {
                warn!("{e}");
                self.stats.lines_discarded += 1;
                return StepOutcome::Discarded;
            }
        };

        self.record(value);
        StepOutcome::Recorded(value)
    }

    /// Write one accepted sample through every tier.
    fn record(&mut self, value: f64) {
        let now = self.clock.now();
        self.stats.samples_recorded += 1;

        let raw = self
            .store
            .append(LogTier::Raw, Entry::new(now, value))
            .and_then(|()| self.store.prune(LogTier::Raw, now));
        self.note_prune(raw);

        for tier in AggregationTier::ALL {
            self.aggregator.observe(tier, value);
        }
        for tier in AggregationTier::ALL {
            match self.aggregator.maybe_flush(tier, now, &self.store) {
                Ok(FlushOutcome::Flushed { pruned, .. }) => {
                    match tier {
                        AggregationTier::Hourly => self.stats.hourly_flushes += 1,
                        AggregationTier::Daily => self.stats.daily_flushes += 1,
                    }
                    self.note_prune(Ok(pruned));
                }
                Ok(FlushOutcome::Pending | FlushOutcome::Idle) => {}
                Err(e) => {
                    error!("{e}");
                    self.stats.storage_errors += 1;
                }
            }
        }
    }

    fn note_prune(&mut self, result: Result<Option<PruneReport>>) {
        match result {
            Ok(Some(report)) => self.stats.corrupt_lines_dropped += report.corrupt as u64,
            Ok(None) => {}
            Err(e) => {
                error!("{e}");
                self.stats.storage_errors += 1;
            }
        }
    }

    /// Loop until `running` is cleared, calling `on_sample` with each
    /// recorded value. The flag is checked once per iteration.
    pub fn run<F: FnMut(f64)>(&mut self, running: &AtomicBool, mut on_sample: F) -> IngestStats {
        while running.load(Ordering::SeqCst) {
            if let StepOutcome::Recorded(value) = self.step() {
                on_sample(value);
            }
            self.clock.sleep(self.poll_interval);
        }
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{DAY_SECS, HOUR_SECS};

    /// Source that replays a fixed script, one entry per poll.
    struct Scripted(VecDeque<io::Result<Option<String>>>);

    impl Scripted {
        fn lines(lines: &[&str]) -> Self {
            Self(lines.iter().map(|l| Ok(Some(l.to_string()))).collect())
        }
    }

    impl SampleSource for Scripted {
        fn read_line(&mut self) -> io::Result<Option<String>> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    fn make_loop(
        source: Scripted,
        clock: &ManualClock,
    ) -> (tempfile::TempDir, IngestLoop<Scripted, &ManualClock>) {
        let tmp = tempfile::tempdir().unwrap();
        let store = LogStore::new(tmp.path());
        let ingest = IngestLoop::new(source, store, clock, &IngestConfig::default());
        (tmp, ingest)
    }

    #[test]
    fn test_mixed_lines_record_only_numbers() {
        let clock = ManualClock::starting_at(1_000);
        let (_tmp, mut ingest) = make_loop(Scripted::lines(&["23.4", "", "abc", "19.9"]), &clock);

        let outcomes: Vec<_> = (0..4).map(|_| ingest.step()).collect();
        assert_eq!(
            outcomes,
            vec![
                StepOutcome::Recorded(23.4),
                StepOutcome::Discarded,
                StepOutcome::Discarded,
                StepOutcome::Recorded(19.9),
            ]
        );

        let raw = ingest.store().read(LogTier::Raw).unwrap();
        assert_eq!(raw, vec![Entry::new(1_000, 23.4), Entry::new(1_000, 19.9)]);
        assert_eq!(ingest.stats().samples_recorded, 2);
        assert_eq!(ingest.stats().lines_discarded, 2);
    }

    #[test]
    fn test_malformed_line_touches_no_log() {
        let clock = ManualClock::starting_at(0);
        let (_tmp, mut ingest) = make_loop(Scripted::lines(&["not-a-number"]), &clock);

        assert_eq!(ingest.step(), StepOutcome::Discarded);
        for tier in LogTier::ALL {
            assert!(!ingest.store().path(tier).exists());
        }
        assert!(ingest.aggregator().accumulator(AggregationTier::Hourly).is_empty());
    }

    #[test]
    fn test_no_line_is_idle() {
        let clock = ManualClock::starting_at(0);
        let (_tmp, mut ingest) = make_loop(Scripted::lines(&[]), &clock);
        assert_eq!(ingest.step(), StepOutcome::Idle);
        assert_eq!(*ingest.stats(), IngestStats::default());
    }

    #[test]
    fn test_source_error_is_counted_not_fatal() {
        let clock = ManualClock::starting_at(0);
        let mut script = Scripted::lines(&[]);
        script.0.push_back(Err(io::Error::other("glitch")));
        script.0.push_back(Ok(Some("20.0".to_string())));
        let (_tmp, mut ingest) = make_loop(script, &clock);

        assert_eq!(ingest.step(), StepOutcome::Idle);
        assert_eq!(ingest.step(), StepOutcome::Recorded(20.0));
        assert_eq!(ingest.stats().source_errors, 1);
    }

    #[test]
    fn test_hourly_flush_after_an_hour_of_samples() {
        let clock = ManualClock::starting_at(0);
        let (_tmp, mut ingest) = make_loop(Scripted::lines(&["20.0", "21.0", "22.5"]), &clock);

        ingest.step();
        clock.set(1800);
        ingest.step();
        clock.set(HOUR_SECS);
        ingest.step();

        let hourly = ingest.store().read(LogTier::Hourly).unwrap();
        assert_eq!(hourly.len(), 1);
        assert_eq!(hourly[0].timestamp, HOUR_SECS);
        assert_eq!(
            std::fs::read_to_string(ingest.store().path(LogTier::Hourly)).unwrap(),
            "3600 21.17\n"
        );
        assert!(!ingest.store().path(LogTier::Daily).exists());
        assert_eq!(ingest.stats().hourly_flushes, 1);
        assert_eq!(ingest.stats().daily_flushes, 0);
    }

    #[test]
    fn test_daily_flush_averages_whole_day() {
        let clock = ManualClock::starting_at(0);
        let (_tmp, mut ingest) = make_loop(Scripted::lines(&["10.0", "20.0", "30.0"]), &clock);

        ingest.step();
        clock.set(DAY_SECS / 2);
        ingest.step();
        clock.set(DAY_SECS);
        ingest.step();

        assert_eq!(
            ingest.store().read(LogTier::Daily).unwrap(),
            vec![Entry::new(DAY_SECS, 20.0)]
        );
        // Hourly flushed at t=12h (10, 20) and again at t=24h (30).
        assert_eq!(
            ingest.store().read(LogTier::Hourly).unwrap(),
            vec![Entry::new(DAY_SECS / 2, 15.0), Entry::new(DAY_SECS, 30.0)]
        );
    }

    #[test]
    fn test_raw_log_is_pruned_on_every_sample() {
        let clock = ManualClock::starting_at(0);
        let (_tmp, mut ingest) = make_loop(Scripted::lines(&["1.0", "2.0"]), &clock);

        ingest.step();
        clock.set(DAY_SECS + 1);
        ingest.step();

        assert_eq!(
            ingest.store().read(LogTier::Raw).unwrap(),
            vec![Entry::new(DAY_SECS + 1, 2.0)]
        );
    }

    #[test]
    fn test_storage_failure_does_not_stop_ingest() {
        let tmp = tempfile::tempdir().unwrap();
        let not_a_dir = tmp.path().join("file");
        std::fs::write(&not_a_dir, "x").unwrap();

        let clock = ManualClock::starting_at(0);
        let mut ingest = IngestLoop::new(
            Scripted::lines(&["1.0", "2.0"]),
            LogStore::new(&not_a_dir),
            &clock,
            &IngestConfig::default(),
        );

        assert_eq!(ingest.step(), StepOutcome::Recorded(1.0));
        assert_eq!(ingest.step(), StepOutcome::Recorded(2.0));
        assert_eq!(ingest.stats().storage_errors, 2);
        assert_eq!(ingest.aggregator().accumulator(AggregationTier::Daily).len(), 2);
    }

    #[test]
    fn test_corrupt_raw_lines_are_counted() {
        let clock = ManualClock::starting_at(100);
        let (_tmp, mut ingest) = make_loop(Scripted::lines(&["5.0"]), &clock);
        std::fs::write(ingest.store().path(LogTier::Raw), "junk\n90 1.00\n").unwrap();

        ingest.step();
        assert_eq!(ingest.stats().corrupt_lines_dropped, 1);
        assert_eq!(ingest.store().read(LogTier::Raw).unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_hourly_lines_are_counted_on_flush() {
        let clock = ManualClock::starting_at(0);
        let (_tmp, mut ingest) = make_loop(Scripted::lines(&["5.0"]), &clock);
        std::fs::write(ingest.store().path(LogTier::Hourly), "junk\nmore junk\n").unwrap();

        clock.set(HOUR_SECS);
        assert_eq!(ingest.step(), StepOutcome::Recorded(5.0));

        assert_eq!(
            std::fs::read_to_string(ingest.store().path(LogTier::Hourly)).unwrap(),
            "3600 5.00\n"
        );
        assert_eq!(ingest.stats().hourly_flushes, 1);
        assert_eq!(ingest.stats().corrupt_lines_dropped, 2);
    }

    #[test]
    fn test_run_returns_when_flag_cleared() {
        let clock = ManualClock::starting_at(0);
        let (_tmp, mut ingest) = make_loop(Scripted::lines(&["1.0"]), &clock);

        let running = AtomicBool::new(false);
        let stats = ingest.run(&running, |_| panic!("loop body should not run"));
        assert_eq!(stats, IngestStats::default());
        assert_eq!(clock.sleeps(), 0);
    }
}
