//! Application state: the configured store and the services over it

use std::sync::Arc;

use chrono::TimeDelta;
use ticketbook_core::{
    Argon2Hasher, Authenticator, Backend, Config, CredentialService, Database, Error,
    MemoryStore, Result, Role, Storage, TicketService,
};

/// Main application state
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Storage>,
    pub credentials: Arc<CredentialService<dyn Storage>>,
    pub tickets: TicketService<dyn Storage>,
    pub auth: Authenticator<dyn Storage>,
}

impl AppState {
    /// Open the configured backend and wire the services
    pub fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn Storage> = match config.storage.backend {
            Backend::Sqlite => {
                let db_path = config.storage.resolve_db_path()?;

                // Ensure parent directory exists
                if let Some(parent) = db_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                tracing::info!(path = %db_path.display(), "Opening SQLite store");
                Arc::new(Database::open(&db_path)?)
            }
            Backend::Memory => {
                tracing::info!("Using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn Storage>) -> Result<Self> {
        let hasher = Arc::new(Argon2Hasher::new(config.auth.argon2)?);
        let reset_ttl = TimeDelta::try_minutes(config.auth.reset_token_minutes)
            .ok_or_else(|| Error::Config("auth.reset_token_minutes is out of range".into()))?;

        let credentials = Arc::new(
            CredentialService::new(store.clone(), hasher)?
                .with_reset_token_ttl(reset_ttl)
                .with_reset_link_base(config.auth.reset_link_base.clone()),
        );
        let tickets = TicketService::new(store.clone());
        let auth = Authenticator::new(store.clone(), credentials.clone())
            .with_session_hours(config.auth.session_hours);

        let state = Self {
            config,
            store,
            credentials,
            tickets,
            auth,
        };
        state.seed_admin()?;
        Ok(state)
    }

    /// Register the configured admin account if it doesn't exist yet
    ///
    /// Returns whether an account was created.
    pub fn seed_admin(&self) -> Result<bool> {
        let Some((username, password)) = self.config.seed_admin() else {
            return Ok(false);
        };

        let created = self.credentials.register(username, password, Role::Admin)?;
        if created {
            tracing::info!(username, "Seeded admin account");
        }
        Ok(created)
    }
}
