//! # thermolog-core
//!
//! Samples a scalar measurement (device temperature) and keeps three
//! disk-resident logs with independent retention:
//!
//! | log          | contents              | retention |
//! |--------------|-----------------------|-----------|
//! | `raw.log`    | every accepted sample | 24 hours  |
//! | `hourly.log` | hourly means          | 30 days   |
//! | `daily.log`  | daily means           | 365 days  |
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use thermolog_core::{IngestConfig, IngestLoop, LogStore, SystemClock, open_device};
//!
//! let config = IngestConfig::default();
//! let source = open_device(&config.port).expect("device");
//! let store = LogStore::open(&config.log_dir).expect("log dir");
//!
//! let running = AtomicBool::new(true);
//! let mut ingest = IngestLoop::new(source, store, SystemClock, &config);
//! ingest.run(&running, |temp| println!("Read temp: {temp}"));
//! ```
//!
//! ## Architecture
//!
//! Sample source → Ingest loop → { Log store (raw), Window aggregator → Log store (hourly/daily) }
//!
//! The ingest loop owns all state. The clock is injected so tests can
//! simulate days of samples without waiting.

pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod ingest;
pub mod source;
pub mod store;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_POLL_INTERVAL, DEFAULT_PORT, IngestConfig};
pub use entry::{Entry, parse_sample, parse_sample_checked};
pub use error::{Result, ThermologError};
pub use ingest::{IngestLoop, IngestStats, StepOutcome};
pub use source::{LineReader, MAX_LINE_BYTES, SampleSource, open_device};
pub use store::{DAY_SECS, HOUR_SECS, LogStore, LogSummary, LogTier, PruneReport, retain_fresh};
pub use window::{AggregationTier, FlushOutcome, WindowAccumulator, WindowAggregator};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
