//! `thermolog logs` — summarize the raw/hourly/daily logs.

use thermolog_core::{LogStore, LogSummary, LogTier};

use super::format_timestamp;

/// Run the logs command.
pub fn run(dir: &str, json: bool) {
    let store = LogStore::new(dir);
    let summaries = match collect(&store) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading logs in {dir}: {e}");
            std::process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&summaries) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Error encoding summary: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    print_table(&summaries);
}

fn collect(store: &LogStore) -> thermolog_core::Result<Vec<LogSummary>> {
    LogTier::ALL.iter().map(|&tier| store.summarize(tier)).collect()
}

fn print_table(summaries: &[LogSummary]) {
    println!(
        "{:<8} {:>8} {:>10} {:<21} {:<21} {:>8}",
        "Log", "Entries", "Retention", "Oldest (UTC)", "Newest (UTC)", "Latest"
    );
    println!("{}", "-".repeat(81));

    for s in summaries {
        if !s.exists {
            println!(
                "{:<8} {:>8} {:>10} {:<21} {:<21} {:>8}",
                s.tier.name(),
                "-",
                format_retention(s.tier),
                "(no file)",
                "",
                ""
            );
            continue;
        }
        println!(
            "{:<8} {:>8} {:>10} {:<21} {:<21} {:>8}",
            s.tier.name(),
            s.entries,
            format_retention(s.tier),
            s.oldest.map(format_timestamp).unwrap_or_default(),
            s.newest.map(format_timestamp).unwrap_or_default(),
            s.latest
                .map(|e| format!("{:.2}", e.value))
                .unwrap_or_default(),
        );
    }
}

fn format_retention(tier: LogTier) -> String {
    let secs = tier.horizon_secs();
    if secs % 86_400 == 0 && secs >= 2 * 86_400 {
        format!("{}d", secs / 86_400)
    } else {
        format!("{}h", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermolog_core::Entry;

    #[test]
    fn test_format_retention() {
        assert_eq!(format_retention(LogTier::Raw), "24h");
        assert_eq!(format_retention(LogTier::Hourly), "30d");
        assert_eq!(format_retention(LogTier::Daily), "365d");
    }

    #[test]
    fn test_collect_covers_all_tiers() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LogStore::new(tmp.path());
        store.append(LogTier::Raw, Entry::new(1, 20.0)).unwrap();

        let summaries = collect(&store).unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].entries, 1);
        assert!(!summaries[1].exists);
        assert!(!summaries[2].exists);
    }
}
