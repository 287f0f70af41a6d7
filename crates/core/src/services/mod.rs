//! Application services over the storage traits

mod credentials;
mod tickets;

pub use credentials::{CredentialService, ALL_USERS_LIMIT, DEFAULT_RESET_TOKEN_TTL_MINUTES};
pub use tickets::TicketService;
