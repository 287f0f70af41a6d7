//! Storage repository traits
//!
//! These traits define the storage interface the services depend on,
//! with two interchangeable implementations: SQLite (`Database`) and the
//! in-memory `MemoryStore`.

use uuid::Uuid;

use crate::error::Result;
use crate::models::{Session, User, WorkTicket};

/// User repository operations
///
/// Usernames passed in are expected to be normalized already.
pub trait UserRepository {
    /// Find user by username
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Insert the user unless the username is taken; returns whether it
    /// was inserted. Must be atomic per username.
    fn insert_user_if_absent(&self, user: &User) -> Result<bool>;

    /// Overwrite role, password hash and reset token fields of the user
    /// with the same username; returns whether a row matched
    fn update_user(&self, user: &User) -> Result<bool>;

    /// Delete a user by username; returns whether one existed
    fn delete_user(&self, username: &str) -> Result<bool>;

    /// All users in storage order
    fn list_users(&self) -> Result<Vec<User>>;
}

/// Work ticket repository operations
pub trait TicketRepository {
    /// Find ticket by ID
    fn get_ticket(&self, id: i64) -> Result<Option<WorkTicket>>;

    /// Insert a ticket, returning its newly assigned ID
    fn insert_ticket(&self, ticket: &WorkTicket) -> Result<i64>;

    /// Overwrite the stored ticket with the same ID; returns whether one
    /// existed
    fn update_ticket(&self, ticket: &WorkTicket) -> Result<bool>;

    /// Delete a ticket; returns whether one existed
    fn delete_ticket(&self, id: i64) -> Result<bool>;

    /// All tickets in storage order
    fn list_tickets(&self) -> Result<Vec<WorkTicket>>;
}

/// Session repository operations
pub trait SessionRepository {
    /// Create a session
    fn create_session(&self, session: &Session) -> Result<()>;

    /// Find a valid (non-expired) session
    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>>;

    /// Delete a session; returns whether one existed
    fn delete_session(&self, session_id: Uuid) -> Result<bool>;

    /// Delete all sessions for a user
    fn delete_user_sessions(&self, user_id: i64) -> Result<()>;

    /// Clean up expired sessions
    fn cleanup_expired_sessions(&self) -> Result<u64>;
}

/// Combined storage interface
///
/// Provides access to all repository operations and can be shared
/// across threads.
pub trait Storage: UserRepository + TicketRepository + SessionRepository + Send + Sync {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where
    T: UserRepository + TicketRepository + SessionRepository + Send + Sync
{
}
