//! Ticketbook Core Library
//!
//! Models, storage, credential and ticket services, and session
//! authentication for the Ticketbook work-ticket system.

pub mod auth;
pub mod config;
pub mod error;
pub mod invariants;
pub mod models;
pub mod notify;
pub mod password;
pub mod query;
pub mod services;
pub mod storage;

pub use auth::{AuthState, Authenticator, SignedIn};
pub use config::{Backend, Config};
pub use error::{Error, Result};
pub use models::*;
pub use notify::{LogNotifier, ResetNotifier};
pub use password::{Argon2Hasher, Argon2Settings, CredentialHasher};
pub use query::{PageRequest, PagedResult, TicketQuery};
pub use services::{CredentialService, TicketService};
pub use storage::{
    Database, MemoryStore, SessionRepository, Storage, TicketRepository, UserRepository,
};
