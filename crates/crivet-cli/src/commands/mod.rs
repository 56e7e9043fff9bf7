//! CLI command definitions and dispatch.

pub mod decode;
pub mod run;

use clap::{Parser, Subcommand};

/// crivet — end-to-end checks for container runtimes.
#[derive(Parser, Debug)]
#[command(name = "crivet", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the standard lifecycle and log cases.
    Run(run::RunArgs),
    /// Decode a JSON-line container log file.
    Decode(decode::DecodeArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args),
        Command::Decode(args) => decode::execute(args),
    }
}
