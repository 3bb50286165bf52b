//! `thermolog run` — sample a device into the raw/hourly/daily logs.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use thermolog_core::{IngestConfig, IngestLoop, SystemClock, open_device};

use super::{open_store, parse_duration};

/// Run the ingest loop until Ctrl+C.
pub fn run(port: &str, dir: &str, poll: &str, quiet: bool) {
    let Some(poll_interval) = parse_duration(poll) else {
        eprintln!("Invalid poll interval: {poll}");
        std::process::exit(1);
    };

    let config = IngestConfig {
        port: port.to_string(),
        log_dir: PathBuf::from(dir),
        poll_interval,
    };

    let source = match open_device(&config.port) {
        Ok(source) => source,
        Err(e) => {
            warn!("{e}");
            eprintln!(
                "Could not open {}. Check if device is connected or simulation file exists.",
                config.port
            );
            std::process::exit(1);
        }
    };
    let store = open_store(dir);

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Ctrl+C handler unavailable ({e}); stop with SIGKILL");
    }

    if !quiet {
        println!("Sampling {}", config.port);
        println!("  Logs:      {}", store.dir().display());
        println!("  Poll:      {}ms", config.poll_interval.as_millis());
        println!("  Stop:      Ctrl+C");
        println!();
    }

    let mut ingest = IngestLoop::new(source, store, SystemClock, &config);
    let stats = ingest.run(&running, |temp| {
        if !quiet {
            println!("Read temp: {temp}");
        }
    });

    if !quiet {
        println!();
        println!(
            "Stopped. {} samples recorded, {} lines discarded, {} hourly / {} daily means written.",
            stats.samples_recorded,
            stats.lines_discarded,
            stats.hourly_flushes,
            stats.daily_flushes
        );
        if stats.storage_errors > 0 || stats.source_errors > 0 {
            println!(
                "  {} storage errors, {} source read errors (see log output).",
                stats.storage_errors, stats.source_errors
            );
        }
    }
    info!(
        "session stats: {}",
        serde_json::to_string(&stats).unwrap_or_default()
    );
}
