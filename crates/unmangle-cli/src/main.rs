#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "unmangle")]
#[command(author, version, about = "Rename obfuscated JavaScript identifiers using LLM suggestions", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted logs (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Rename identifiers in a JavaScript file
    Rename(commands::rename::RenameArgs),

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    if let Some(cwd) = &cli.cwd {
        std::env::set_current_dir(cwd).into_diagnostic()?;
    }

    match cli.command {
        Commands::Rename(args) => commands::rename::run(args).await,
        Commands::Version => {
            println!("{}", unmangle_core::version::version_string());
            Ok(())
        }
    }
}
