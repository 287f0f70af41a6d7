//! Credential service
//!
//! Registration, credential validation, user administration and the
//! password reset token lifecycle. Not-found, duplicate and bad-token
//! outcomes are `false`/`None`; only store and hashing failures are
//! errors.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use constant_time_eq::constant_time_eq;
use rand::Rng;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::invariants::{assert_page_invariants, assert_reset_token_invariants};
use crate::models::{normalize_username, Principal, Role, User, UserSummary};
use crate::notify::{reset_link, LogNotifier, ResetNotifier};
use crate::password::CredentialHasher;
use crate::query::{paginate, stable_sort_by, PageRequest, PagedResult, UserSortKey};
use crate::storage::UserRepository;

/// Default lifetime of a password reset token
pub const DEFAULT_RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Cap applied by [`CredentialService::all_users`]
pub const ALL_USERS_LIMIT: u32 = 1000;

const RESET_TOKEN_BYTES: usize = 32;

/// Password used to build the hash compared against when a username is
/// unknown, so both failure paths cost one verification
const DUMMY_PASSWORD: &str = "ticketbook-timing-equalizer";

fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub struct CredentialService<R: UserRepository + ?Sized> {
    repo: Arc<R>,
    hasher: Arc<dyn CredentialHasher>,
    notifier: Arc<dyn ResetNotifier>,
    reset_token_ttl: Duration,
    reset_link_base: String,
    dummy_hash: String,
}

impl<R: UserRepository + ?Sized> CredentialService<R> {
    pub fn new(repo: Arc<R>, hasher: Arc<dyn CredentialHasher>) -> Result<Self> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            repo,
            hasher,
            notifier: Arc::new(LogNotifier),
            reset_token_ttl: Duration::minutes(DEFAULT_RESET_TOKEN_TTL_MINUTES),
            reset_link_base: "http://localhost/reset".to_string(),
            dummy_hash,
        })
    }

    pub fn with_reset_token_ttl(mut self, ttl: Duration) -> Self {
        self.reset_token_ttl = ttl;
        self
    }

    pub fn with_reset_link_base(mut self, base: impl Into<String>) -> Self {
        self.reset_link_base = base.into();
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ResetNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Register a new account; `false` if the username is taken
    #[instrument(skip(self, password))]
    pub fn register(&self, username: &str, password: &str, role: Role) -> Result<bool> {
        let username = normalize_username(username);

        // Cheap pre-check so a duplicate doesn't pay for a hash; the
        // insert below is still the authoritative race-free check
        if self.repo.find_user_by_username(&username)?.is_some() {
            debug!(%username, "Registration rejected: username exists");
            return Ok(false);
        }

        let hash = self.hasher.hash(password)?;
        let user = User::new(&username, hash, role);
        let inserted = self.repo.insert_user_if_absent(&user)?;

        if inserted {
            info!(%username, role = %role, "User registered");
        } else {
            debug!(%username, "Registration lost race for username");
        }
        Ok(inserted)
    }

    /// Look up and verify a user, returning the stored record on success
    #[instrument(skip(self, password))]
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let username = normalize_username(username);

        match self.repo.find_user_by_username(&username)? {
            Some(user) if self.hasher.verify(password, &user.password_hash) => Ok(Some(user)),
            Some(_) => {
                debug!(%username, "Credential check failed");
                Ok(None)
            }
            None => {
                // Burn a verification so unknown users aren't faster
                let _ = self.hasher.verify(password, &self.dummy_hash);
                debug!(%username, "Credential check failed");
                Ok(None)
            }
        }
    }

    /// Validate credentials and produce a principal for the session layer
    pub fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Principal>> {
        Ok(self.authenticate(username, password)?.map(|user| Principal {
            identity: user.username,
            role: user.role,
        }))
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserSummary>> {
        Ok(self
            .repo
            .find_user_by_username(&normalize_username(username))?
            .map(|u| u.summary()))
    }

    /// Paged user listing: search on username, sort on username or role
    #[instrument(skip(self))]
    pub fn list_users(&self, request: &PageRequest) -> Result<PagedResult<UserSummary>> {
        let mut users = self.repo.list_users()?;

        if let Some(needle) = request.search_needle() {
            users.retain(|u| u.username.to_lowercase().contains(&needle));
        }

        match UserSortKey::parse(request.sort_by.as_deref()) {
            Some(key) => {
                stable_sort_by(&mut users, request.sort_ascending, |a, b| key.compare(a, b))
            }
            None => stable_sort_by(&mut users, true, |a, b| UserSortKey::Username.compare(a, b)),
        }

        let result = paginate(users, request.page, request.page_size).map(|u| u.summary());
        assert_page_invariants(&result, request.page_size);
        Ok(result)
    }

    /// The first [`ALL_USERS_LIMIT`] users of the filtered, sorted list
    pub fn all_users(
        &self,
        search_term: Option<&str>,
        sort_by: Option<&str>,
        sort_ascending: bool,
    ) -> Result<Vec<UserSummary>> {
        let request = PageRequest {
            page: 1,
            page_size: ALL_USERS_LIMIT,
            search_term: search_term.map(str::to_string),
            sort_by: sort_by.map(str::to_string),
            sort_ascending,
        };
        Ok(self.list_users(&request)?.items)
    }

    #[instrument(skip(self))]
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let deleted = self.repo.delete_user(&normalize_username(username))?;
        if deleted {
            info!(username, "User deleted");
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    pub fn update_role(&self, username: &str, role: Role) -> Result<bool> {
        let Some(mut user) = self.repo.find_user_by_username(&normalize_username(username))? else {
            return Ok(false);
        };

        user.role = role;
        let updated = self.repo.update_user(&user)?;
        if updated {
            info!(username = %user.username, role = %role, "User role updated");
        }
        Ok(updated)
    }

    /// Issue a fresh reset token, replacing any outstanding one
    #[instrument(skip(self))]
    pub fn generate_password_reset_token(&self, username: &str) -> Result<Option<String>> {
        let Some(mut user) = self.repo.find_user_by_username(&normalize_username(username))? else {
            return Ok(None);
        };

        let expires = Utc::now()
            .checked_add_signed(self.reset_token_ttl)
            .ok_or_else(|| Error::Config("reset token lifetime is out of range".to_string()))?;

        let token = generate_reset_token();
        user.reset_token = Some(token.clone());
        user.reset_token_expires = Some(expires);
        assert_reset_token_invariants(&user);

        if !self.repo.update_user(&user)? {
            // Deleted between the read and the write
            return Ok(None);
        }

        info!(username = %user.username, "Password reset token issued");
        Ok(Some(token))
    }

    /// Consume a reset token and set a new password
    ///
    /// Fails without mutation when the user is unknown, the token does
    /// not match, or the token has expired.
    #[instrument(skip(self, token, new_password))]
    pub fn reset_password(&self, username: &str, token: &str, new_password: &str) -> Result<bool> {
        let Some(mut user) = self.repo.find_user_by_username(&normalize_username(username))? else {
            return Ok(false);
        };

        let token_matches = user
            .reset_token
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), token.as_bytes()));

        if !token_matches || !user.has_live_reset_token(Utc::now()) {
            debug!(username = %user.username, "Password reset rejected");
            return Ok(false);
        }

        user.password_hash = self.hasher.hash(new_password)?;
        user.reset_token = None;
        user.reset_token_expires = None;
        assert_reset_token_invariants(&user);

        let updated = self.repo.update_user(&user)?;
        if updated {
            info!(username = %user.username, "Password reset completed");
        }
        Ok(updated)
    }

    /// Issue a token and hand the reset link to the notifier
    ///
    /// Returns whether the user existed.
    pub fn request_password_reset(&self, username: &str) -> Result<bool> {
        let username = normalize_username(username);
        match self.generate_password_reset_token(&username)? {
            Some(token) => {
                let link = reset_link(&self.reset_link_base, &username, &token);
                self.notifier.send_password_reset(&username, &link);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
