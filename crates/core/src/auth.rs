//! Session-backed authentication
//!
//! Turns validated credentials into a stored session and answers
//! "who is signed in" for a session id. The role is captured when the
//! session is issued, like a signed cookie claim; a role change takes
//! effect on the next sign-in.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Principal, Role, Session};
use crate::services::CredentialService;
use crate::storage::Storage;

/// Default session lifetime: one week
pub const DEFAULT_SESSION_HOURS: i64 = 24 * 7;

/// Authentication state for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(Principal),
}

impl AuthState {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated(p) => Some(p),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// Result of a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub session_id: Uuid,
    pub principal: Principal,
    pub expires_at: DateTime<Utc>,
}

pub struct Authenticator<S: Storage + ?Sized> {
    store: Arc<S>,
    credentials: Arc<CredentialService<S>>,
    session_hours: i64,
}

impl<S: Storage + ?Sized> Authenticator<S> {
    pub fn new(store: Arc<S>, credentials: Arc<CredentialService<S>>) -> Self {
        Self {
            store,
            credentials,
            session_hours: DEFAULT_SESSION_HOURS,
        }
    }

    pub fn with_session_hours(mut self, hours: i64) -> Self {
        self.session_hours = hours;
        self
    }

    /// Validate credentials and open a session
    #[instrument(skip(self, password))]
    pub fn sign_in(&self, username: &str, password: &str) -> Result<Option<SignedIn>> {
        let Some(user) = self.credentials.authenticate(username, password)? else {
            return Ok(None);
        };

        let session = Session::new(&user, self.session_hours)?;
        self.store.create_session(&session)?;

        info!(username = %user.username, session_id = %session.id, "Signed in");
        Ok(Some(SignedIn {
            session_id: session.id,
            principal: session.principal(),
            expires_at: session.expires_at,
        }))
    }

    /// Resolve a session id; missing, unknown and expired all read as
    /// anonymous
    pub fn current_user(&self, session_id: Option<Uuid>) -> Result<AuthState> {
        let Some(id) = session_id else {
            return Ok(AuthState::Anonymous);
        };

        match self.store.find_valid_session(id)? {
            Some(session) => Ok(AuthState::Authenticated(session.principal())),
            None => {
                debug!(session_id = %id, "No live session");
                Ok(AuthState::Anonymous)
            }
        }
    }

    /// Close a session; returns whether it existed
    #[instrument(skip(self))]
    pub fn sign_out(&self, session_id: Uuid) -> Result<bool> {
        let removed = self.store.delete_session(session_id)?;
        if removed {
            info!("Signed out");
        }
        Ok(removed)
    }

    /// Resolve a session and insist that someone is signed in
    pub fn require_authenticated(&self, session_id: Option<Uuid>) -> Result<Principal> {
        match self.current_user(session_id)? {
            AuthState::Authenticated(p) => Ok(p),
            AuthState::Anonymous => Err(Error::PermissionDenied("not signed in".to_string())),
        }
    }

    /// Resolve a session and insist on a role
    pub fn require_role(&self, session_id: Option<Uuid>, role: Role) -> Result<Principal> {
        match self.current_user(session_id)? {
            AuthState::Authenticated(p) if p.has_role(role) => Ok(p),
            AuthState::Authenticated(p) => Err(Error::PermissionDenied(format!(
                "{} requires the {} role",
                p.identity, role
            ))),
            AuthState::Anonymous => Err(Error::PermissionDenied("not signed in".to_string())),
        }
    }

    /// Drop expired sessions; returns how many were removed
    pub fn purge_expired_sessions(&self) -> Result<u64> {
        let removed = self.store.cleanup_expired_sessions()?;
        if removed > 0 {
            info!(removed, "Purged expired sessions");
        }
        Ok(removed)
    }
}
