//! `thermolog prune` — one retention pass over every log.

use thermolog_core::{Clock, LogStore, PruneReport, SystemClock};

/// Run the prune command.
pub fn run(dir: &str) {
    let store = LogStore::new(dir);
    let now = SystemClock.now();
    println!("Pruning logs in {dir}");

    match store.prune_all(now) {
        Ok(reports) => {
            for (tier, report) in reports {
                println!("  {:<8} {}", tier.name(), describe(report));
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn describe(report: Option<PruneReport>) -> String {
    match report {
        None => "no file".to_string(),
        Some(r) => {
            let mut s = format!("kept {}, expired {}", r.kept, r.expired);
            if r.corrupt > 0 {
                s.push_str(&format!(", dropped {} corrupt", r.corrupt));
            }
            s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(describe(None), "no file");
        assert_eq!(
            describe(Some(PruneReport {
                kept: 3,
                expired: 1,
                corrupt: 0
            })),
            "kept 3, expired 1"
        );
        assert_eq!(
            describe(Some(PruneReport {
                kept: 0,
                expired: 0,
                corrupt: 2
            })),
            "kept 0, expired 0, dropped 2 corrupt"
        );
    }
}
