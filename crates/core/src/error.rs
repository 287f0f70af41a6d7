//! Error types for ticketbook core
//!
//! Only infrastructure failures live here. Expected business outcomes
//! (unknown user, duplicate username, bad reset token) are plain
//! `bool`/`Option` values returned inside `Ok`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Store lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::de::Error),
}

impl From<argon2::password_hash::Error> for Error {
    fn from(e: argon2::password_hash::Error) -> Self {
        Error::PasswordHash(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
