//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use super::parse::OptionalExt;
use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Users table
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE CHECK (length(username) <= 100),
                password_hash TEXT NOT NULL CHECK (length(password_hash) <= 500),
                role TEXT NOT NULL DEFAULT 'User',
                created_at TEXT NOT NULL
            );

            -- Work tickets table
            CREATE TABLE IF NOT EXISTS work_tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticket_number TEXT CHECK (length(ticket_number) <= 50),
                cost_centre TEXT CHECK (length(cost_centre) <= 100),
                activity TEXT CHECK (length(activity) <= 200),
                operator_name TEXT CHECK (length(operator_name) <= 100),
                num_operators INTEGER NOT NULL DEFAULT 0,
                start_date_time TEXT NOT NULL,
                start_counter INTEGER NOT NULL DEFAULT 0,
                end_date_time TEXT NOT NULL,
                end_counter INTEGER NOT NULL DEFAULT 0,
                quantity_in INTEGER NOT NULL DEFAULT 0,
                quantity_out INTEGER NOT NULL DEFAULT 0,
                material_used TEXT CHECK (length(material_used) <= 500),
                created_at TEXT NOT NULL,
                updated_at TEXT,
                created_by TEXT CHECK (length(created_by) <= 100)
            );

            -- Sessions table
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                username TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for query performance",
        sql: r#"
            -- Session indexes
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);

            -- Ticket indexes
            CREATE INDEX IF NOT EXISTS idx_work_tickets_created ON work_tickets(created_at);
            CREATE INDEX IF NOT EXISTS idx_work_tickets_start ON work_tickets(start_date_time);
        "#,
    },
    Migration {
        version: 3,
        description: "Add password reset token columns",
        sql: r#"
            -- Both set while a reset is outstanding, both NULL otherwise
            ALTER TABLE users ADD COLUMN reset_token TEXT;
            ALTER TABLE users ADD COLUMN reset_token_expires TEXT;
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
pub(crate) fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get::<_, Option<u32>>(0)
        })
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;

            info!(version = migration.version, "Migration complete");
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Get the latest migration version (test helper)
    fn latest_version() -> u32 {
        MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
    }

    #[test]
    fn test_migrations_run() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_version_query_failure_propagates() {
        // No schema_migrations table: the query itself fails
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(get_current_version(&conn), Err(Error::Database(_))));
    }

    #[test]
    fn test_empty_migrations_table_is_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        init_migrations_table(&conn).unwrap();
        assert_eq!(get_current_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(
                migration.version as usize,
                i + 1,
                "Migration {} should have version {}",
                migration.description,
                i + 1
            );
        }
    }

    #[test]
    fn test_reset_columns_present() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let mut stmt = conn.prepare("PRAGMA table_info(users)").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        assert!(columns.iter().any(|c| c == "reset_token"));
        assert!(columns.iter().any(|c| c == "reset_token_expires"));
    }
}
