//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::models::{User, WorkTicket};
use crate::query::PagedResult;

/// Reset token and its expiry are issued and cleared together
pub fn assert_reset_token_invariants(user: &User) {
    debug_assert!(
        user.reset_token.is_some() == user.reset_token_expires.is_some(),
        "User {} has reset_token {} but reset_token_expires {}",
        user.username,
        if user.reset_token.is_some() { "set" } else { "unset" },
        if user.reset_token_expires.is_some() { "set" } else { "unset" },
    );

    debug_assert!(
        user.username == user.username.to_lowercase(),
        "User {} is stored with a non-normalized username",
        user.username
    );
}

/// A stored ticket never claims an update before its creation
pub fn assert_ticket_invariants(ticket: &WorkTicket) {
    if let Some(updated) = ticket.updated_at {
        debug_assert!(
            updated >= ticket.created_at,
            "Ticket {} updated_at {} precedes created_at {}",
            ticket.id,
            updated,
            ticket.created_at
        );
    }
}

/// A page window fits inside both the page size and the total count
pub fn assert_page_invariants<T>(result: &PagedResult<T>, page_size: u32) {
    debug_assert!(
        result.items.len() <= page_size as usize,
        "Page holds {} items but page size is {}",
        result.items.len(),
        page_size
    );

    debug_assert!(
        result.items.len() <= result.total_count,
        "Page holds {} items but total count is {}",
        result.items.len(),
        result.total_count
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;

    #[test]
    fn test_valid_user() {
        let user = User::new("alice", "hash".into(), Role::User);
        assert_reset_token_invariants(&user);
    }

    #[test]
    #[should_panic(expected = "reset_token_expires")]
    fn test_half_issued_token() {
        let mut user = User::new("alice", "hash".into(), Role::User);
        user.reset_token = Some("token".into());
        assert_reset_token_invariants(&user);
    }

    #[test]
    fn test_valid_ticket() {
        let now = Utc::now();
        let ticket = WorkTicket {
            created_at: now,
            updated_at: Some(now),
            ..Default::default()
        };
        assert_ticket_invariants(&ticket);
    }

    #[test]
    #[should_panic(expected = "page size")]
    fn test_oversized_page() {
        let result = PagedResult {
            items: vec![1, 2, 3],
            total_count: 3,
        };
        assert_page_invariants(&result, 2);
    }
}
