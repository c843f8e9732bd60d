// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AutoBoy - marketplace backend.
//!
//! Binary entry point: runs the messaging hub and the price-alert engine.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use autoboy_config::{AutoboyConfig, ConfigError};
use clap::{Parser, Subcommand};

/// AutoBoy - real-time messaging hub and price alerts.
#[derive(Parser, Debug)]
#[command(name = "autoboy", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the hub and the alert engine (default).
    Serve,
    /// Validate configuration and exit.
    CheckConfig,
    /// Print a fresh random secret suitable for `auth.jwt_secret`.
    GenSecret,
}

fn load(path: Option<&PathBuf>) -> Result<AutoboyConfig, Vec<ConfigError>> {
    match path {
        Some(path) => autoboy_config::load_and_validate_path(path),
        None => autoboy_config::load_and_validate(),
    }
}

fn load_or_exit(path: Option<&PathBuf>) -> AutoboyConfig {
    match load(path) {
        Ok(config) => config,
        Err(errors) => {
            autoboy_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = load_or_exit(cli.config.as_ref());
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => {
            let config = load_or_exit(cli.config.as_ref());
            println!(
                "autoboy: config ok (listen={}:{}, storage={:?}, alerts={})",
                config.server.host,
                config.server.port,
                config.storage.backend,
                if config.alerts.enabled { "on" } else { "off" },
            );
        }
        Commands::GenSecret => println!("{}", autoboy_core::ids::new_token()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoboy.toml");
        std::fs::write(&path, "[server]\nport = 9123\n\n[alerts]\nenabled = false\n").unwrap();

        let config = load(Some(&path)).expect("config file should be valid");
        assert_eq!(config.server.port, 9123);
        assert!(!config.alerts.enabled);
        assert_eq!(config.hub.outbox_capacity, 256);
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::parse_from(["autoboy"]);
        assert!(cli.command.is_none());
        let cli = Cli::parse_from(["autoboy", "check-config", "--config", "a.toml"]);
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
    }

    #[test]
    fn gen_secret_skips_config() {
        let cli = Cli::parse_from(["autoboy", "gen-secret"]);
        assert!(matches!(cli.command, Some(Commands::GenSecret)));

        let secret = autoboy_core::ids::new_token();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
