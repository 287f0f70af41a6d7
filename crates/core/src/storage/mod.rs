//! Storage layer for ticketbook
//!
//! `Database` is the SQLite backend, `MemoryStore` the in-memory one.
//! Both implement the repository traits in [`traits`].

mod memory;
mod migrations;
mod parse;
mod tickets;
mod traits;
mod users;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, ErrorCode};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Session, User, WorkTicket};

pub use memory::MemoryStore;
pub use tickets::TicketStore;
pub use traits::{SessionRepository, Storage, TicketRepository, UserRepository};
pub use users::UserStore;

/// Map SQLite constraint failures to `Error::Constraint`
pub(crate) fn constraint_error(e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(err, msg) if err.code == ErrorCode::ConstraintViolation => {
            Error::Constraint(msg.unwrap_or_else(|| err.to_string()))
        }
        other => Error::Database(other),
    }
}

/// Main database handle
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Initialize database schema via migrations
    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with exclusive access to the connection
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::LockPoisoned("database connection"))?;
        f(&conn)
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<u32> {
        self.with_conn(migrations::get_current_version)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl UserRepository for Database {
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| UserStore::new(conn).find_by_username(username))
    }

    fn insert_user_if_absent(&self, user: &User) -> Result<bool> {
        self.with_conn(|conn| UserStore::new(conn).create_if_absent(user))
    }

    fn update_user(&self, user: &User) -> Result<bool> {
        self.with_conn(|conn| UserStore::new(conn).update(user))
    }

    fn delete_user(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| UserStore::new(conn).delete(username))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| UserStore::new(conn).list())
    }
}

impl TicketRepository for Database {
    fn get_ticket(&self, id: i64) -> Result<Option<WorkTicket>> {
        self.with_conn(|conn| TicketStore::new(conn).find_by_id(id))
    }

    fn insert_ticket(&self, ticket: &WorkTicket) -> Result<i64> {
        self.with_conn(|conn| TicketStore::new(conn).create(ticket))
    }

    fn update_ticket(&self, ticket: &WorkTicket) -> Result<bool> {
        self.with_conn(|conn| TicketStore::new(conn).update(ticket))
    }

    fn delete_ticket(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| TicketStore::new(conn).delete(id))
    }

    fn list_tickets(&self) -> Result<Vec<WorkTicket>> {
        self.with_conn(|conn| TicketStore::new(conn).list())
    }
}

impl SessionRepository for Database {
    fn create_session(&self, session: &Session) -> Result<()> {
        self.with_conn(|conn| UserStore::new(conn).create_session(session))
    }

    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        self.with_conn(|conn| UserStore::new(conn).find_valid_session(session_id))
    }

    fn delete_session(&self, session_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| UserStore::new(conn).delete_session(session_id))
    }

    fn delete_user_sessions(&self, user_id: i64) -> Result<()> {
        self.with_conn(|conn| UserStore::new(conn).delete_user_sessions(user_id))
    }

    fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.with_conn(|conn| UserStore::new(conn).cleanup_expired_sessions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.db");

        {
            let db = Database::open(&path).unwrap();
            db.insert_user_if_absent(&User::new("alice", "hash".into(), Role::User))
                .unwrap();
            db.insert_ticket(&WorkTicket::default()).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.find_user_by_username("alice").unwrap().is_some());
        assert_eq!(db.list_tickets().unwrap().len(), 1);
        assert_eq!(db.schema_version().unwrap(), 3);
    }

    #[test]
    fn test_database_is_storage() {
        fn assert_storage<S: Storage>() {}
        assert_storage::<Database>();
        assert_storage::<MemoryStore>();
    }
}
