//! Configuration file schema and loader
//!
//! Read from `ticketbook.toml`; every section and key is optional.
//!
//! ```toml
//! [storage]
//! backend = "sqlite"          # or "memory" (process-local, tests only)
//! path = "/var/lib/ticketbook/ticketbook.db"
//!
//! [auth]
//! session_hours = 168
//! reset_token_minutes = 60
//! reset_link_base = "http://localhost/reset"
//!
//! [auth.argon2]
//! memory_kib = 19456
//! iterations = 2
//! parallelism = 1
//!
//! [seed]
//! admin_username = "admin"
//! admin_password = "change-me"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::auth::DEFAULT_SESSION_HOURS;
use crate::error::{Error, Result};
use crate::password::Argon2Settings;
use crate::services::DEFAULT_RESET_TOKEN_TTL_MINUTES;

pub const CONFIG_FILE_NAME: &str = "ticketbook.toml";
pub const DB_FILE_NAME: &str = "ticketbook.db";

/// Upper bound on `auth.session_hours` (ten years)
pub const MAX_SESSION_HOURS: i64 = 24 * 365 * 10;

/// Upper bound on `auth.reset_token_minutes` (thirty days)
pub const MAX_RESET_TOKEN_MINUTES: i64 = 60 * 24 * 30;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "onyx", "ticketbook").ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine data directory",
        ))
    })
}

/// Default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    /// Process-local; for tests and embedding, refused by the binary
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    /// Database file; defaults to the platform data directory
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DB_FILE_NAME)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_hours: i64,
    pub reset_token_minutes: i64,
    pub reset_link_base: String,
    pub argon2: Argon2Settings,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_hours: DEFAULT_SESSION_HOURS,
            reset_token_minutes: DEFAULT_RESET_TOKEN_TTL_MINUTES,
            reset_link_base: "http://localhost/reset".to_string(),
            argon2: Argon2Settings::default(),
        }
    }
}

/// Optional admin account created on first start
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub seed: SeedConfig,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SESSION_HOURS).contains(&self.auth.session_hours) {
            return Err(Error::Config(format!(
                "auth.session_hours must be between 1 and {}",
                MAX_SESSION_HOURS
            )));
        }
        if !(1..=MAX_RESET_TOKEN_MINUTES).contains(&self.auth.reset_token_minutes) {
            return Err(Error::Config(format!(
                "auth.reset_token_minutes must be between 1 and {}",
                MAX_RESET_TOKEN_MINUTES
            )));
        }
        if self.auth.reset_link_base.trim().is_empty() {
            return Err(Error::Config("auth.reset_link_base must not be empty".into()));
        }

        match (&self.seed.admin_username, &self.seed.admin_password) {
            (None, None) => {}
            (Some(u), Some(p)) if !u.trim().is_empty() && !p.is_empty() => {}
            _ => {
                return Err(Error::Config(
                    "seed.admin_username and seed.admin_password must both be set and non-empty"
                        .into(),
                ))
            }
        }

        Ok(())
    }

    /// The seed admin credentials, when configured
    pub fn seed_admin(&self) -> Option<(&str, &str)> {
        Some((
            self.seed.admin_username.as_deref()?,
            self.seed.admin_password.as_deref()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage.backend, Backend::Sqlite);
        assert_eq!(config.auth.session_hours, 168);
        assert_eq!(config.auth.reset_token_minutes, 60);
        assert!(config.seed_admin().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
            [storage]
            backend = "memory"
            path = "/tmp/tickets.db"

            [auth]
            session_hours = 8
            reset_token_minutes = 15
            reset_link_base = "https://tickets.example/reset"

            [auth.argon2]
            memory_kib = 8
            iterations = 1
            parallelism = 1

            [seed]
            admin_username = "admin"
            admin_password = "change-me"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, Backend::Memory);
        assert_eq!(
            config.storage.resolve_db_path().unwrap(),
            PathBuf::from("/tmp/tickets.db")
        );
        assert_eq!(config.auth.session_hours, 8);
        assert_eq!(config.auth.argon2.memory_kib, 8);
        assert_eq!(config.seed_admin(), Some(("admin", "change-me")));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for bad in [
            "[auth]\nsession_hours = 0",
            "[auth]\nreset_token_minutes = -5",
            "[auth]\nsession_hours = 9223372036854775807",
            "[auth]\nsession_hours = 87601",
            "[auth]\nreset_token_minutes = 1000000000000",
            "[auth]\nreset_token_minutes = 43201",
            "[auth]\nreset_link_base = \"  \"",
            "[seed]\nadmin_username = \"admin\"",
            "[seed]\nadmin_username = \"\"\nadmin_password = \"pw\"",
        ] {
            assert!(
                matches!(Config::from_toml(bad), Err(Error::Config(_))),
                "accepted: {}",
                bad
            );
        }
    }

    #[test]
    fn test_upper_bounds_accepted() {
        let config = Config::from_toml(&format!(
            "[auth]\nsession_hours = {}\nreset_token_minutes = {}",
            MAX_SESSION_HOURS, MAX_RESET_TOKEN_MINUTES
        ))
        .unwrap();
        assert_eq!(config.auth.session_hours, MAX_SESSION_HOURS);
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_toml("[storage]\nbackend = \"postgres\""),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        assert_eq!(Config::load(&path).unwrap(), Config::default());

        fs::write(&path, "[auth]\nsession_hours = 2\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().auth.session_hours, 2);
    }
}
