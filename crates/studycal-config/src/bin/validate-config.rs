//! Config validation CLI tool
//!
//! Validates a studycal configuration file and reports any errors.

use studycal_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a studycal configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match studycal_config::load_config(&config_path) {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", studycal_config::CURRENT_CONFIG_VERSION);
            println!("  Data directory: {}", settings.data_dir.display());
            println!("  Max backups: {}", settings.max_backups);
            println!("  Undo window: {}", format_duration(settings.undo_window));
            println!("  No-plan policy: {:?}", settings.rate_policy);
            println!("  Band table: {:?}", settings.band_table);
            println!("  Theme: {}", settings.theme);
            ExitCode::SUCCESS
        }
        Err(studycal_config::ConfigError::ValidationFailed { errors }) => {
            eprintln!("✗ Configuration has {} error(s):", errors.len());
            for error in &errors {
                eprintln!("  - {}", error);
            }
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {}", e);
            ExitCode::from(1)
        }
    }
}
