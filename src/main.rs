use clap::Parser;

use pairctl::cli::{
    Cli, Command, generate_completions, run_mint_command, run_scenario_command,
    run_simulate_command, run_versions_command,
};
use pairctl::config::{LogFormat, PairingConfig};
use pairctl::pairing::AttemptReport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = PairingConfig::from_env()?;
    if cli.verbose {
        config.logging.filter = "pairctl=debug".to_string();
    }
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
    pairctl::logging::init(&config.logging);

    match &cli.command {
        Command::Simulate(args) => {
            let report = run_simulate_command(args, &config).await?;
            if !matches!(report, AttemptReport::Paired) {
                std::process::exit(1);
            }
        }
        Command::Scenario => run_scenario_command()?,
        Command::Versions { json } => run_versions_command(*json)?,
        Command::Mint { json } => run_mint_command(*json)?,
        Command::Completion { shell } => generate_completions(*shell),
    }

    Ok(())
}
