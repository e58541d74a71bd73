pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "chowbot",
    about = "Chowbot operator CLI",
    long_about = "Check Chowbot startup readiness, inspect effective configuration, and verify Slack credentials.",
    after_help = "Examples:\n  chowbot doctor --json\n  chowbot config\n  chowbot start"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, token readiness, and Slack authentication")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(long, help = "Skip checks that call the Slack API")]
        offline: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json, offline } => commands::doctor::run(json, offline),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
