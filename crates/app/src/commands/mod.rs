//! Subcommand handlers
//!
//! Each handler runs against [`AppState`] and returns the text to print.

mod session;
mod tickets;
mod users;

use serde::Serialize;
use ticketbook_core::{PageRequest, Result, UserRepository};

use crate::cli::{Command, PageArgs};
use crate::state::AppState;

pub fn run(state: &AppState, command: Command) -> Result<String> {
    match command {
        Command::Init => init(state),
        Command::User { command } => users::run(state, command),
        Command::Login { username, password } => session::login(state, &username, &password),
        Command::Whoami { session } => session::whoami(state, session),
        Command::Logout { session } => session::logout(state, session),
        Command::Ticket { command } => tickets::run(state, command),
    }
}

fn init(state: &AppState) -> Result<String> {
    let purged = state.auth.purge_expired_sessions()?;
    let users = state.store.list_users()?.len();
    Ok(format!(
        "Store ready ({:?} backend, {} users, {} expired sessions purged)",
        state.config.storage.backend, users, purged
    ))
}

impl From<PageArgs> for PageRequest {
    fn from(args: PageArgs) -> Self {
        PageRequest {
            page: args.page,
            page_size: args.page_size,
            search_term: args.search,
            sort_by: args.sort,
            sort_ascending: !args.desc,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| std::io::Error::from(e).into())
}

fn page_footer(page: u32, page_size: u32, shown: usize, total: usize) -> String {
    format!(
        "page {} ({} shown, {} total, page size {})",
        page.max(1),
        shown,
        total,
        page_size
    )
}
