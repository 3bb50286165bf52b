//! CLI for thermolog — sample a temperature sensor into rolling logs.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "thermolog")]
#[command(about = "thermolog — raw, hourly and daily temperature logs with rolling retention")]
#[command(version = thermolog_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read samples from a serial device (or simulation file) until Ctrl+C
    Run {
        /// Serial port or simulation file path
        #[arg(default_value = thermolog_core::DEFAULT_PORT)]
        port: String,

        /// Directory holding raw.log, hourly.log and daily.log
        #[arg(long, default_value = ".")]
        dir: String,

        /// Pause between polls (e.g. "100ms", "1s")
        #[arg(long, default_value = "100ms")]
        poll: String,

        /// Do not print each sample as it is read
        #[arg(long)]
        quiet: bool,
    },

    /// Show what each log currently holds
    Logs {
        /// Directory holding the log files
        #[arg(long, default_value = ".")]
        dir: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply retention to every log now, without sampling
    Prune {
        /// Directory holding the log files
        #[arg(long, default_value = ".")]
        dir: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            port,
            dir,
            poll,
            quiet,
        } => commands::run::run(&port, &dir, &poll, quiet),
        Commands::Logs { dir, json } => commands::logs::run(&dir, json),
        Commands::Prune { dir } => commands::prune::run(&dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["thermolog", "run"]);
        match cli.command {
            Commands::Run {
                port,
                dir,
                poll,
                quiet,
            } => {
                assert_eq!(port, thermolog_core::DEFAULT_PORT);
                assert_eq!(dir, ".");
                assert_eq!(poll, "100ms");
                assert!(!quiet);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_with_port_and_dir() {
        let cli = Cli::parse_from(["thermolog", "run", "sim.txt", "--dir", "logs", "--quiet"]);
        match cli.command {
            Commands::Run {
                port, dir, quiet, ..
            } => {
                assert_eq!(port, "sim.txt");
                assert_eq!(dir, "logs");
                assert!(quiet);
            }
            _ => panic!("expected run"),
        }
    }
}
