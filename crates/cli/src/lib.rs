pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "cotiza",
    about = "Cotiza operator CLI",
    long_about = "Operate the guided quotation intake: interactive interviews, config inspection, and smoke validation.",
    after_help = "Examples:\n  cotiza chat\n  cotiza config show\n  cotiza config validate\n  cotiza smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run a guided quotation interview on stdin/stdout")]
    Chat,
    #[command(about = "Run end-to-end readiness checks with per-check timing details")]
    Smoke,
    #[command(subcommand, about = "Inspect or validate the effective configuration")]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Show,
    #[command(about = "Validate the effective configuration and report the first violation")]
    Validate,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat => commands::chat::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Config(ConfigCommand::Show) => {
            commands::CommandResult { exit_code: 0, output: commands::config::show() }
        }
        Command::Config(ConfigCommand::Validate) => commands::config::validate(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
