//! In-memory storage backend
//!
//! Everything lives behind one `RwLock`, so insert-if-absent and
//! read-modify-write sequences are atomic. Field limits match the
//! SQLite schema so both backends fail the same way.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::traits::{SessionRepository, TicketRepository, UserRepository};
use crate::error::{Error, Result};
use crate::models::{Session, User, WorkTicket, PASSWORD_HASH_MAX_LEN, USERNAME_MAX_LEN};

#[derive(Debug, Default)]
struct MemoryState {
    /// Keyed by id, so iteration is storage order
    users: BTreeMap<i64, User>,
    user_ids: HashMap<String, i64>,
    tickets: BTreeMap<i64, WorkTicket>,
    sessions: HashMap<Uuid, Session>,
    last_user_id: i64,
    last_ticket_id: i64,
}

/// In-memory store implementing every repository trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

fn check_user_lengths(user: &User) -> Result<()> {
    if user.username.chars().count() > USERNAME_MAX_LEN {
        return Err(Error::Constraint(format!(
            "username exceeds {} characters",
            USERNAME_MAX_LEN
        )));
    }
    if user.password_hash.chars().count() > PASSWORD_HASH_MAX_LEN {
        return Err(Error::Constraint(format!(
            "password_hash exceeds {} characters",
            PASSWORD_HASH_MAX_LEN
        )));
    }
    Ok(())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| Error::LockPoisoned("memory store"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| Error::LockPoisoned("memory store"))
    }
}

impl UserRepository for MemoryStore {
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.read()?;
        Ok(state
            .user_ids
            .get(username)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    fn insert_user_if_absent(&self, user: &User) -> Result<bool> {
        check_user_lengths(user)?;
        let mut state = self.write()?;
        if state.user_ids.contains_key(&user.username) {
            return Ok(false);
        }

        state.last_user_id += 1;
        let id = state.last_user_id;
        let mut stored = user.clone();
        stored.id = id;
        state.user_ids.insert(stored.username.clone(), id);
        state.users.insert(id, stored);
        Ok(true)
    }

    fn update_user(&self, user: &User) -> Result<bool> {
        check_user_lengths(user)?;
        let mut state = self.write()?;
        let Some(id) = state.user_ids.get(&user.username).copied() else {
            return Ok(false);
        };

        match state.users.get_mut(&id) {
            Some(stored) => {
                stored.password_hash = user.password_hash.clone();
                stored.role = user.role;
                stored.reset_token = user.reset_token.clone();
                stored.reset_token_expires = user.reset_token_expires;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[instrument(skip(self))]
    fn delete_user(&self, username: &str) -> Result<bool> {
        let mut state = self.write()?;
        let Some(id) = state.user_ids.remove(username) else {
            return Ok(false);
        };

        state.users.remove(&id);
        state.sessions.retain(|_, s| s.user_id != id);
        Ok(true)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.read()?.users.values().cloned().collect())
    }
}

impl TicketRepository for MemoryStore {
    fn get_ticket(&self, id: i64) -> Result<Option<WorkTicket>> {
        Ok(self.read()?.tickets.get(&id).cloned())
    }

    #[instrument(skip(self, ticket), fields(ticket_number = ?ticket.ticket_number))]
    fn insert_ticket(&self, ticket: &WorkTicket) -> Result<i64> {
        ticket.check_field_lengths()?;
        let mut state = self.write()?;
        state.last_ticket_id += 1;
        let id = state.last_ticket_id;
        let mut stored = ticket.clone();
        stored.id = id;
        state.tickets.insert(id, stored);
        Ok(id)
    }

    fn update_ticket(&self, ticket: &WorkTicket) -> Result<bool> {
        ticket.check_field_lengths()?;
        let mut state = self.write()?;
        match state.tickets.get_mut(&ticket.id) {
            Some(stored) => {
                stored.overwrite_from(ticket);
                stored.updated_at = ticket.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_ticket(&self, id: i64) -> Result<bool> {
        Ok(self.write()?.tickets.remove(&id).is_some())
    }

    fn list_tickets(&self) -> Result<Vec<WorkTicket>> {
        Ok(self.read()?.tickets.values().cloned().collect())
    }
}

impl SessionRepository for MemoryStore {
    fn create_session(&self, session: &Session) -> Result<()> {
        let mut state = self.write()?;
        if !state.users.contains_key(&session.user_id) {
            return Err(Error::Constraint(format!(
                "session references unknown user {}",
                session.user_id
            )));
        }
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        Ok(self
            .read()?
            .sessions
            .get(&session_id)
            .filter(|s| s.is_valid())
            .cloned())
    }

    fn delete_session(&self, session_id: Uuid) -> Result<bool> {
        Ok(self.write()?.sessions.remove(&session_id).is_some())
    }

    fn delete_user_sessions(&self, user_id: i64) -> Result<()> {
        self.write()?.sessions.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    fn cleanup_expired_sessions(&self) -> Result<u64> {
        let now = Utc::now();
        let mut state = self.write()?;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}
