//! Retention-bounded, append-only text logs.
//!
//! Each [`LogTier`] maps to one file inside the store directory. Appends open
//! the file, write a single line, and close it again. Pruning reads the whole
//! file, drops expired and corrupt lines, and rewrites it from scratch. Kept
//! lines are written back as they were read, minus surrounding whitespace.
//!
//! The rewrite is not crash-atomic: a crash mid-rewrite can leave a truncated
//! file. Only one writer per log is supported.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::entry::Entry;
use crate::error::{Result, ThermologError};

/// Seconds in one hour.
pub const HOUR_SECS: i64 = 3600;
/// Seconds in one day.
pub const DAY_SECS: i64 = 24 * HOUR_SECS;

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// The three logs the store maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTier {
    /// Every accepted sample, kept for 24 hours.
    Raw,
    /// Hourly means, kept for 30 days.
    Hourly,
    /// Daily means, kept for 365 days.
    Daily,
}

impl LogTier {
    /// All tiers, in ascending cadence.
    pub const ALL: [LogTier; 3] = [LogTier::Raw, LogTier::Hourly, LogTier::Daily];

    /// Short name used in messages and JSON.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }

    /// File name of this tier's log inside the store directory.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Raw => "raw.log",
            Self::Hourly => "hourly.log",
            Self::Daily => "daily.log",
        }
    }

    /// Maximum age in seconds an entry may reach before the next prune drops it.
    pub const fn horizon_secs(self) -> i64 {
        match self {
            Self::Raw => DAY_SECS,
            Self::Hourly => 30 * DAY_SECS,
            Self::Daily => 365 * DAY_SECS,
        }
    }
}

impl fmt::Display for LogTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

/// Keep only entries no older than `horizon` seconds at `now`.
///
/// Relative order is preserved. Entries stamped in the future are kept.
pub fn retain_fresh(entries: Vec<Entry>, now: i64, horizon: i64) -> Vec<Entry> {
    entries
        .into_iter()
        .filter(|e| is_fresh(e, now, horizon))
        .collect()
}

fn is_fresh(entry: &Entry, now: i64, horizon: i64) -> bool {
    entry.age(now) <= horizon
}

/// Outcome of pruning one log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Entries written back.
    pub kept: usize,
    /// Well-formed entries dropped for being older than the horizon.
    pub expired: usize,
    /// Non-blank lines dropped because they did not parse.
    pub corrupt: usize,
}

/// Per-tier overview used by inspection tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    pub tier: LogTier,
    pub path: PathBuf,
    pub exists: bool,
    pub entries: usize,
    pub oldest: Option<i64>,
    pub newest: Option<i64>,
    pub latest: Option<Entry>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Directory-backed store holding one file per [`LogTier`].
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    /// Bind a store to `dir` without touching the filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Bind a store to `dir`, creating the directory if it is missing.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir)?;
        Ok(store)
    }

    /// Directory holding the log files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for `tier`.
    pub fn path(&self, tier: LogTier) -> PathBuf {
        self.dir.join(tier.file_name())
    }

    /// Append one entry to `tier`'s log, creating the file if needed.
    pub fn append(&self, tier: LogTier, entry: Entry) -> Result<()> {
        let path = self.path(tier);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ThermologError::storage(tier, e))?;
        writeln!(file, "{entry}").map_err(|e| ThermologError::storage(tier, e))
    }

    /// Prune `tier`'s log with its own retention horizon.
    pub fn prune(&self, tier: LogTier, now: i64) -> Result<Option<PruneReport>> {
        self.prune_with_horizon(tier, tier.horizon_secs(), now)
    }

    /// Drop entries older than `horizon` seconds and any corrupt lines, then
    /// rewrite the file with what is left.
    ///
    /// Returns `Ok(None)` without creating anything when the file does not
    /// exist.
    pub fn prune_with_horizon(
        &self,
        tier: LogTier,
        horizon: i64,
        now: i64,
    ) -> Result<Option<PruneReport>> {
        let path = self.path(tier);
        let Some(contents) = read_if_exists(&path).map_err(|e| ThermologError::storage(tier, e))?
        else {
            return Ok(None);
        };

        let (lines, corrupt) = parse_log(&contents);
        let total = lines.len();
        let kept: Vec<&str> = lines
            .iter()
            .filter(|line| is_fresh(&line.entry, now, horizon))
            .map(|line| line.text)
            .collect();

        write_lines(&path, &kept).map_err(|e| ThermologError::storage(tier, e))?;

        let report = PruneReport {
            kept: kept.len(),
            expired: total - kept.len(),
            corrupt,
        };
        debug!(
            "pruned {tier} log: kept={} expired={} corrupt={}",
            report.kept, report.expired, report.corrupt
        );
        Ok(Some(report))
    }

    /// Apply retention to every tier. Stops at the first failure.
    pub fn prune_all(&self, now: i64) -> Result<Vec<(LogTier, Option<PruneReport>)>> {
        LogTier::ALL
            .iter()
            .map(|&tier| self.prune(tier, now).map(|r| (tier, r)))
            .collect()
    }

    /// Read every well-formed entry of `tier`, skipping corrupt lines.
    ///
    /// A missing file reads as empty.
    pub fn read(&self, tier: LogTier) -> Result<Vec<Entry>> {
        let contents =
            read_if_exists(&self.path(tier)).map_err(|e| ThermologError::storage(tier, e))?;
        Ok(contents
            .map(|c| parse_log(&c).0.into_iter().map(|line| line.entry).collect())
            .unwrap_or_default())
    }

    /// Summarize `tier`'s log.
    pub fn summarize(&self, tier: LogTier) -> Result<LogSummary> {
        let path = self.path(tier);
        let exists = path.exists();
        let entries = self.read(tier)?;
        Ok(LogSummary {
            tier,
            exists,
            entries: entries.len(),
            oldest: entries.iter().map(|e| e.timestamp).min(),
            newest: entries.iter().map(|e| e.timestamp).max(),
            latest: entries.last().copied(),
            path,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read a log file as text, replacing invalid UTF-8 so that bad bytes only
/// spoil their own line. `None` if the file does not exist.
fn read_if_exists(path: &Path) -> io::Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// A well-formed stored line and its trimmed text.
struct LogLine<'a> {
    entry: Entry,
    text: &'a str,
}

/// Split file contents into well-formed lines and a count of corrupt lines.
/// Blank lines are skipped without being counted.
fn parse_log(contents: &str) -> (Vec<LogLine<'_>>, usize) {
    let mut lines = Vec::new();
    let mut corrupt = 0;
    for line in contents.lines() {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        match Entry::parse_line(text) {
            Some(entry) => lines.push(LogLine { entry, text }),
            None => corrupt += 1,
        }
    }
    (lines, corrupt)
}

/// Truncate `path` and write `lines`, one per line.
fn write_lines(path: &Path, lines: &[&str]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
