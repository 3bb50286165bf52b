//! Runtime configuration for an ingest session.

use std::path::PathBuf;
use std::time::Duration;

/// Default pause between polls of the sample source.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Serial port used when none is given on the command line.
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM3";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Configuration for one ingest session.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Serial device or simulation file to read samples from.
    pub port: String,
    /// Directory holding `raw.log`, `hourly.log` and `daily.log`.
    pub log_dir: PathBuf,
    /// Pause after every poll, whether or not a sample arrived.
    pub poll_interval: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            log_dir: PathBuf::from("."),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.log_dir, PathBuf::from("."));
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
