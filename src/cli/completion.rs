//! Shell completion generation.

use clap::CommandFactory;

/// Write completions for `shell` to stdout.
pub fn generate_completions(shell: clap_complete::Shell) {
    let mut cmd = crate::cli::Cli::command();
    let bin_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
}
