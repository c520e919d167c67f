//! outpostctl - run a dispatch pass over a saved AI response

use anyhow::Result;
use clap::{Parser, Subcommand};
use outpostctl::commands::{self, RunOptions};
use outpostctl::errors::exit_code_for;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Filter directives for stderr logging
const LOG_ENV: &str = "OUTPOST_LOG";

#[derive(Parser)]
#[command(name = "outpostctl")]
#[command(about = "Dispatch declared outputs from an AI response", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display, write and execute outputs found in a response
    Run {
        /// Response file (JSON envelope or plain text)
        #[arg(long)]
        response: PathBuf,

        /// Output definitions (YAML)
        #[arg(long)]
        outputs: PathBuf,

        /// Directory for written files
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Config file (defaults to ./outpost.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Show commands instead of running them
        #[arg(long)]
        no_exec: bool,
    },

    /// Print the content found for each output as JSON
    Extract {
        #[arg(long)]
        response: PathBuf,

        #[arg(long)]
        outputs: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            response,
            outputs,
            output_dir,
            config,
            no_exec,
        } => commands::run(&RunOptions {
            response,
            outputs,
            output_dir,
            config,
            no_exec,
        }),
        Commands::Extract {
            response,
            outputs,
            config,
        } => {
            let (code, found) = commands::extract(&response, &outputs, config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&found)?);
            Ok(code)
        }
    }
}
