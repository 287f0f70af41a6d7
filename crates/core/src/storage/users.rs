//! User and session storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::constraint_error;
use super::parse::{
    format_datetime, parse_datetime, parse_datetime_opt, parse_uuid, role_from_str, OptionalExt,
};
use crate::error::Result;
use crate::models::{Session, User};

const USER_COLUMNS: &str =
    "id, username, password_hash, role, reset_token, reset_token_expires, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: role_from_str(&row.get::<_, String>(3)?),
        reset_token: row.get(4)?,
        reset_token_expires: parse_datetime_opt(row.get::<_, Option<String>>(5)?)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
    })
}

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a user unless the username already exists
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub fn create_if_absent(&self, user: &User) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO users
                     (username, password_hash, role, reset_token, reset_token_expires, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(username) DO NOTHING",
                params![
                    user.username,
                    user.password_hash,
                    user.role.as_str(),
                    user.reset_token,
                    user.reset_token_expires.as_ref().map(format_datetime),
                    format_datetime(&user.created_at),
                ],
            )
            .map_err(constraint_error)?;
        Ok(inserted == 1)
    }

    /// Find user by username
    #[instrument(skip(self))]
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM users WHERE username = ?1",
            USER_COLUMNS
        ))?;

        let user = stmt
            .query_row(params![username], user_from_row)
            .optional()?;

        Ok(user)
    }

    /// Overwrite the mutable columns of a user
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub fn update(&self, user: &User) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE users SET password_hash = ?1, role = ?2, reset_token = ?3,
                     reset_token_expires = ?4
                 WHERE username = ?5",
                params![
                    user.password_hash,
                    user.role.as_str(),
                    user.reset_token,
                    user.reset_token_expires.as_ref().map(format_datetime),
                    user.username,
                ],
            )
            .map_err(constraint_error)?;
        Ok(changed > 0)
    }

    /// Delete user by username; sessions go with it
    #[instrument(skip(self))]
    pub fn delete(&self, username: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE username = ?1", params![username])?;
        Ok(changed > 0)
    }

    /// List all users in insertion order
    pub fn list(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;

        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Create a session
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, username, role, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id.to_string(),
                session.user_id,
                session.username,
                session.role.as_str(),
                format_datetime(&session.created_at),
                format_datetime(&session.expires_at),
            ],
        )
        .map_err(constraint_error)?;
        Ok(())
    }

    /// Find valid session
    #[instrument(skip(self))]
    pub fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, username, role, created_at, expires_at
             FROM sessions WHERE id = ?1 AND expires_at > ?2",
        )?;

        let now = format_datetime(&Utc::now());
        let session = stmt
            .query_row(params![session_id.to_string(), now], |row| {
                Ok(Session {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    user_id: row.get(1)?,
                    username: row.get(2)?,
                    role: role_from_str(&row.get::<_, String>(3)?),
                    created_at: parse_datetime(&row.get::<_, String>(4)?)?,
                    expires_at: parse_datetime(&row.get::<_, String>(5)?)?,
                })
            })
            .optional()?;

        Ok(session)
    }

    /// Delete session
    pub fn delete_session(&self, session_id: Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1",
            params![session_id.to_string()],
        )?;
        Ok(changed > 0)
    }

    /// Delete all sessions for user
    pub fn delete_user_sessions(&self, user_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
        Ok(())
    }

    /// Clean up expired sessions
    pub fn cleanup_expired_sessions(&self) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![format_datetime(&Utc::now())],
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::Role;
    use crate::storage::Database;

    #[test]
    fn test_create_if_absent_and_find() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = UserStore::new(conn);
            let user = User::new("alice", "hash".into(), Role::Admin);
            assert!(store.create_if_absent(&user)?);
            assert!(!store.create_if_absent(&user)?);

            let found = store.find_by_username("alice")?.unwrap();
            assert!(found.id > 0);
            assert_eq!(found.role, Role::Admin);
            assert_eq!(found.created_at, user.created_at);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_and_delete() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = UserStore::new(conn);
            store.create_if_absent(&User::new("bob", "hash".into(), Role::User))?;

            let mut user = store.find_by_username("bob")?.unwrap();
            user.role = Role::Admin;
            user.reset_token = Some("token".into());
            user.reset_token_expires = Some(Utc::now());
            assert!(store.update(&user)?);

            let reloaded = store.find_by_username("bob")?.unwrap();
            assert_eq!(reloaded, user);

            assert!(store.delete("bob")?);
            assert!(!store.delete("bob")?);
            assert!(store.find_by_username("bob")?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_username_length_is_constrained() {
        let db = Database::open_in_memory().unwrap();
        let long = User::new(&"x".repeat(101), "hash".into(), Role::User);
        let result = db.with_conn(|conn| UserStore::new(conn).create_if_absent(&long));
        assert!(matches!(result, Err(Error::Constraint(_))));
    }

    #[test]
    fn test_deleting_user_cascades_sessions() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = UserStore::new(conn);
            store.create_if_absent(&User::new("carol", "hash".into(), Role::User))?;
            let user = store.find_by_username("carol")?.unwrap();

            let session = Session::new(&user, 1).unwrap();
            store.create_session(&session)?;
            assert!(store.find_valid_session(session.id)?.is_some());

            store.delete("carol")?;
            assert!(store.find_valid_session(session.id)?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_expired_sessions_cleanup() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let store = UserStore::new(conn);
            store.create_if_absent(&User::new("dave", "hash".into(), Role::User))?;
            let user = store.find_by_username("dave")?.unwrap();

            let live = Session::new(&user, 1).unwrap();
            let mut stale = Session::new(&user, 1).unwrap();
            stale.expires_at = Utc::now() - chrono::Duration::minutes(1);
            store.create_session(&live)?;
            store.create_session(&stale)?;

            assert!(store.find_valid_session(stale.id)?.is_none());
            assert_eq!(store.cleanup_expired_sessions()?, 1);
            assert!(store.find_valid_session(live.id)?.is_some());
            Ok(())
        })
        .unwrap();
    }
}
