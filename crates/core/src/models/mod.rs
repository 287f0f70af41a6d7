//! Data models for ticketbook

mod ticket;
mod user;

pub use ticket::*;
pub use user::*;
