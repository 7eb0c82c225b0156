pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "twin",
    about = "Career twin operator CLI",
    long_about = "Inspect configuration, check knowledge and mail readiness, and run a chat turn from the terminal.",
    after_help = "Examples:\n  twin doctor --json\n  twin config\n  twin ask \"What are your technical skills?\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, knowledge documents, and mail credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Ask the twin one question and stream the answer")]
    Ask {
        #[arg(required = true, num_args = 1.., help = "Question to send as the new user message")]
        message: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Ask { message } => commands::ask::run(&message.join(" ")),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
