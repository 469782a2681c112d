//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// N-queens coordination service
#[derive(Debug, Parser)]
#[command(name = "qd", version, about = "Message-driven N-queens coordination service")]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon and gateway listener in the foreground
    Serve,

    /// Submit a solve request (to a running daemon, or in-process without one)
    Solve {
        /// Board size
        #[arg(short, long)]
        n: Option<u8>,

        /// Worker count
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Show daemon status and the current run state
    Status,

    /// Check the daemon is alive
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_solve_with_flags() {
        let cli = Cli::parse_from(["qd", "solve", "-n", "8", "--workers", "4"]);
        match cli.command {
            Command::Solve { n, workers } => {
                assert_eq!(n, Some(8));
                assert_eq!(workers, Some(4));
            }
            other => panic!("expected solve command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_solve_defaults_to_none() {
        let cli = Cli::parse_from(["qd", "solve"]);
        assert!(matches!(
            cli.command,
            Command::Solve {
                n: None,
                workers: None
            }
        ));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["qd", "--log-level", "DEBUG", "serve"]);
        assert_eq!(cli.log_level.as_deref(), Some("DEBUG"));
        assert!(matches!(cli.command, Command::Serve));
    }
}
