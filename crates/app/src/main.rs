//! Ticketbook - work ticket administration
//!
//! Command line front end over the ticketbook core: opens the configured
//! store, seeds the admin account and runs one subcommand.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ticketbook_core::{config, Backend, Config, Error, Result};

mod cli;
mod commands;
mod state;

/// Each invocation is its own process, so sessions and records only
/// carry over between commands on a persistent backend
fn check_backend(config: &Config) -> Result<()> {
    match config.storage.backend {
        Backend::Sqlite => Ok(()),
        Backend::Memory => Err(Error::Config(
            "storage.backend = \"memory\" keeps nothing between commands; use \"sqlite\""
                .into(),
        )),
    }
}

fn run(cli: cli::Cli) -> Result<String> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let config = Config::load(&config_path)?;
    check_backend(&config)?;

    let app_state = state::AppState::new(config)?;
    commands::run(&app_state, cli.command)
}

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = cli::Cli::parse();

    match run(cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_refused() {
        let config = Config::from_toml("[storage]\nbackend = \"memory\"").unwrap();
        assert!(matches!(check_backend(&config), Err(Error::Config(_))));
        assert!(check_backend(&Config::default()).is_ok());
    }
}
