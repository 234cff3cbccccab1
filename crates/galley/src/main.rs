//! Galley command line
//!
//! ```text
//! galley process <file.xls> --mode commandes --category salon
//! galley config [--json]
//! galley init [--force]
//! ```

use clap::{Parser, Subcommand};
use galley_logging::LogConfig;
use galley_worker::config::{default_config_path, default_logs_dir};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "galley", about = "Turn flight spreadsheets into catering rows")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.galley/config.toml)
    #[arg(long, global = true, env = "GALLEY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the worker on a spreadsheet and print the flight rows
    Process(cli::process::ProcessArgs),

    /// Show resolved configuration
    Config(cli::config::ConfigArgs),

    /// Write a default config file
    Init(cli::config::InitArgs),
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Process(args) => args.json,
        Commands::Config(args) => args.json,
        Commands::Init(_) => false,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_guard = galley_logging::init_logging(LogConfig {
        app_name: "galley",
        verbose: cli.verbose,
        log_dir: Some(default_logs_dir()),
    })
    .or_else(|err| {
        eprintln!("Warning: file logging disabled: {:#}", err);
        galley_logging::init_logging(LogConfig {
            app_name: "galley",
            verbose: cli.verbose,
            log_dir: None,
        })
    });
    let _log_guard = log_guard.ok();

    let json_mode = command_wants_json(&cli.command);
    let config_path = cli.config.unwrap_or_else(default_config_path);

    let result = match cli.command {
        Commands::Process(args) => cli::process::run(args, &config_path),
        Commands::Config(args) => cli::config::run(args, &config_path),
        Commands::Init(args) => cli::config::run_init(args, &config_path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}
