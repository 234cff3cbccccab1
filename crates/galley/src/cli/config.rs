//! `galley config` and `galley init`
//!
//! All paths are under ~/.galley/ unless GALLEY_HOME says otherwise.

use galley_worker::config::{default_logs_dir, galley_home};
use galley_worker::GalleyConfig;
use std::path::Path;

use crate::cli::error::HelpfulError;
use crate::cli::output::format_size;
use crate::cli::process::load_config;

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Show resolved configuration in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the init command
#[derive(Debug, clap::Args)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

fn exists_label(path: &Path) -> &'static str {
    if path.exists() {
        "exists"
    } else {
        "not found"
    }
}

/// Show the configuration the `process` command would run with
pub fn run(args: ConfigArgs, config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let home = galley_home();
    let logs = default_logs_dir();

    if args.json {
        let output = serde_json::json!({
            "home": home.to_string_lossy(),
            "config_file": {
                "path": config_path.to_string_lossy(),
                "exists": config_path.exists(),
            },
            "logs": {
                "path": logs.to_string_lossy(),
                "exists": logs.exists(),
            },
            "worker": config.worker,
            "staging": config.staging,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let worker = &config.worker;
    let staging = &config.staging;

    println!("GALLEY CONFIGURATION");
    println!("====================");
    println!();
    println!("Home:     {}", home.display());
    println!("Config:   {} ({})", config_path.display(), exists_label(config_path));
    println!("Logs:     {} ({})", logs.display(), exists_label(&logs));
    println!();
    println!("Worker");
    println!("  Command:     {} {}", worker.interpreter.display(), worker.script.display());
    if let Some(dir) = &worker.working_dir {
        println!("  Working dir: {}", dir.display());
    }
    println!("  Timeout:     {}ms", worker.timeout_ms);
    println!("  Stream cap:  {}", format_size(worker.max_stream_bytes as u64));
    println!(
        "  Stderr in errors: {}",
        if worker.include_stderr_in_errors { "yes" } else { "no" }
    );
    println!(
        "  Modes:       {}",
        worker.allowed_modes.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
    );
    println!(
        "  Categories:  {}",
        worker.allowed_categories.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
    );
    println!();
    println!("Staging");
    println!("  Dir:         {} ({})", staging.dir.display(), exists_label(&staging.dir));
    println!("  Max upload:  {}", format_size(staging.max_upload_bytes));
    println!("  Extensions:  .{}", staging.allowed_extensions.join(", ."));
    println!(
        "  Keep artifacts: {}",
        if staging.keep_artifacts { "yes" } else { "no" }
    );

    Ok(())
}

/// Write the default configuration to `config_path`
pub fn run_init(args: InitArgs, config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() && !args.force {
        return Err(HelpfulError::new(format!(
            "Config already exists: {}",
            config_path.display()
        ))
        .with_suggestions([
            "TRY: galley config   # Show the current configuration",
            "TRY: galley init --force   # Overwrite it with defaults",
        ])
        .into());
    }

    GalleyConfig::default().save(config_path)?;
    println!("Wrote default config to {}", config_path.display());
    Ok(())
}
