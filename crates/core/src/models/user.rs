//! User, role and session models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Maximum stored username length (characters)
pub const USERNAME_MAX_LEN: usize = 100;

/// Maximum stored password hash length (characters)
pub const PASSWORD_HASH_MAX_LEN: usize = 500;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Lower-case a username the way the stores key it
pub fn normalize_username(username: &str) -> String {
    username.to_lowercase()
}

/// A stored user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Assigned by the store on insert; 0 until then
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str, password_hash: String, role: Role) -> Self {
        Self {
            id: 0,
            username: normalize_username(username),
            password_hash,
            role,
            reset_token: None,
            reset_token_expires: None,
            created_at: Utc::now(),
        }
    }

    /// True while a reset token is outstanding and not yet expired
    pub fn has_live_reset_token(&self, now: DateTime<Utc>) -> bool {
        match (&self.reset_token, self.reset_token_expires) {
            (Some(_), Some(expires)) => now < expires,
            _ => false,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Username and role, as shown in user listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub role: Role,
}

/// Authenticated identity plus role claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub identity: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Signed-in session carrying the principal it was issued for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Open a session lasting `duration_hours`; a lifetime chrono can't
    /// represent is a configuration error
    pub fn new(user: &User, duration_hours: i64) -> Result<Self> {
        let now = Utc::now();
        let expires_at = TimeDelta::try_hours(duration_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                Error::Config(format!(
                    "session lifetime of {} hours is out of range",
                    duration_hours
                ))
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            created_at: now,
            expires_at,
        })
    }

    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }

    pub fn principal(&self) -> Principal {
        Principal {
            identity: self.username.clone(),
            role: self.role,
        }
    }
}
