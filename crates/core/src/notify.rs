//! Password reset notification
//!
//! There is no mail transport. `LogNotifier` writes the reset link to the
//! log where an operator can pick it up.

#[cfg(test)]
use std::sync::Mutex;

use tracing::info;

/// Delivers a password reset link to a user
pub trait ResetNotifier: Send + Sync {
    fn send_password_reset(&self, username: &str, reset_link: &str);
}

/// Build `<base>?user=<username>&token=<token>`
pub fn reset_link(base: &str, username: &str, token: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!(
        "{}{}user={}&token={}",
        base,
        separator,
        urlencoding::encode(username),
        urlencoding::encode(token)
    )
}

/// Logs reset links at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ResetNotifier for LogNotifier {
    fn send_password_reset(&self, username: &str, reset_link: &str) {
        info!(username, reset_link, "Password reset requested");
    }
}

/// Keeps every link it is handed; lets tests inspect what was sent
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// (username, link) pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl ResetNotifier for RecordingNotifier {
    fn send_password_reset(&self, username: &str, reset_link: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((username.to_string(), reset_link.to_string()));
        }
    }
}
