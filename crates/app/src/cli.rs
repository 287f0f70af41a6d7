//! Command line definitions

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use ticketbook_core::Role;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "ticketbook")]
#[command(about = "Work ticket administration", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to ticketbook.toml (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or migrate the store and seed the admin account
    Init,

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Sign in and print a session id
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },

    /// Show who a session belongs to
    Whoami {
        #[arg(long)]
        session: Option<Uuid>,
    },

    /// End a session
    Logout {
        #[arg(long)]
        session: Uuid,
    },

    /// Manage work tickets
    Ticket {
        #[command(subcommand)]
        command: TicketCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a new account
    Register {
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "User", value_parser = parse_role)]
        role: Role,
    },

    /// List accounts (admin only)
    List {
        #[arg(long)]
        session: Uuid,
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        json: bool,
    },

    /// Delete an account (admin only)
    Delete {
        username: String,
        #[arg(long)]
        session: Uuid,
    },

    /// Change an account's role (admin only)
    SetRole {
        username: String,
        #[arg(value_parser = parse_role)]
        role: Role,
        #[arg(long)]
        session: Uuid,
    },

    /// Issue a reset token and send the reset link
    RequestReset { username: String },

    /// Set a new password using a reset token
    ResetPassword {
        username: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TicketCommand {
    /// Record a new ticket
    Create {
        #[arg(long)]
        session: Uuid,
        #[command(flatten)]
        fields: TicketFields,
    },

    /// Show one ticket
    Show {
        id: i64,
        #[arg(long)]
        session: Uuid,
        #[arg(long)]
        json: bool,
    },

    /// List tickets
    List {
        #[arg(long)]
        session: Uuid,
        #[command(flatten)]
        page: PageArgs,
        /// Only tickets starting at or after this time
        #[arg(long, value_parser = parse_timestamp)]
        from: Option<DateTime<Utc>>,
        /// Only tickets starting on or before this day
        #[arg(long, value_parser = parse_timestamp)]
        to: Option<DateTime<Utc>>,
        /// Only tickets updated at or after this time
        #[arg(long, value_parser = parse_timestamp)]
        updated_from: Option<DateTime<Utc>>,
        /// Only tickets updated on or before this day
        #[arg(long, value_parser = parse_timestamp)]
        updated_to: Option<DateTime<Utc>>,
        #[arg(long)]
        json: bool,
    },

    /// Change fields of an existing ticket
    Update {
        id: i64,
        #[arg(long)]
        session: Uuid,
        #[command(flatten)]
        fields: TicketFields,
    },

    /// Delete a ticket
    Delete {
        id: i64,
        #[arg(long)]
        session: Uuid,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 10)]
    pub page_size: u32,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub sort: Option<String>,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
}

/// Ticket fields; on update only the given ones change, on create a
/// missing --start/--end defaults to the current time
#[derive(Args, Debug, Clone, Default)]
pub struct TicketFields {
    #[arg(long)]
    pub number: Option<String>,
    #[arg(long)]
    pub cost_centre: Option<String>,
    #[arg(long)]
    pub activity: Option<String>,
    #[arg(long)]
    pub operator: Option<String>,
    #[arg(long)]
    pub operators: Option<i32>,
    #[arg(long, value_parser = parse_timestamp)]
    pub start: Option<DateTime<Utc>>,
    #[arg(long, value_parser = parse_timestamp)]
    pub end: Option<DateTime<Utc>>,
    #[arg(long)]
    pub start_counter: Option<i32>,
    #[arg(long)]
    pub end_counter: Option<i32>,
    #[arg(long)]
    pub quantity_in: Option<i32>,
    #[arg(long)]
    pub quantity_out: Option<i32>,
    #[arg(long)]
    pub material: Option<String>,
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse()
}

/// Accept RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC)
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid timestamp '{}': expected RFC 3339 or YYYY-MM-DD", s))
}
