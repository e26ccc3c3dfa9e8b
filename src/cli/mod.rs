//! CLI command handling.
//!
//! Provides subcommands for:
//! - Running one simulated pairing attempt (`simulate`)
//! - Replaying the scripted admission sequence (`scenario`)
//! - Showing supported version tags (`versions`)
//! - Minting a fresh connection token (`mint`)
//! - Shell completion generation (`completion`)

mod completion;
mod scenario;
mod simulate;
mod versions;

pub use completion::generate_completions;
pub use scenario::{ScenarioStep, StepResult, run_scenario, run_scenario_command, scripted_steps};
pub use simulate::{SimulateArgs, run_simulate_command};
pub use versions::{run_mint_command, run_versions_command};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pairctl")]
#[command(about = "Local device pairing session controller")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging for pairctl
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON (overrides PAIRCTL_LOG_FORMAT)
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one pairing attempt against the simulated transport
    Simulate(SimulateArgs),

    /// Replay the scripted start/stop admission sequence
    Scenario,

    /// Show the latest version tags
    Versions {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mint a new connection token at the latest versions
    Mint {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::FailurePoint;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_simulate_with_failure() {
        let cli = Cli::try_parse_from([
            "pairctl",
            "simulate",
            "--token",
            "abc",
            "--fail-at",
            "decrypt",
            "--phase-delay-ms",
            "0",
        ])
        .unwrap();

        match cli.command {
            Command::Simulate(args) => {
                assert_eq!(args.token.as_deref(), Some("abc"));
                assert_eq!(args.fail_at, Some(FailurePoint::Decrypt));
                assert_eq!(args.phase_delay_ms, 0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["pairctl", "versions", "--json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Versions { json: true }));
    }

    #[test]
    fn test_unknown_failure_point_rejected() {
        let result = Cli::try_parse_from(["pairctl", "simulate", "--fail-at", "nowhere"]);
        assert!(result.is_err());
    }
}
