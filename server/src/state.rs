use axum::extract::FromRef;
use std::sync::Arc;

use crate::auth::{CredentialVerifier, TokenService};
use crate::config::Config;
use crate::services::{AccountService, EventService};
use crate::store::{EventRepository, MemoryStore, UserRepository};

/// Shared handles for request handlers. Cloning is cheap; all mutable
/// state lives in the store.
#[derive(Clone)]
pub struct AppState {
    pub events: EventService,
    pub accounts: AccountService,
    pub verifier: CredentialVerifier,
}

impl AppState {
    pub fn new(
        events: Arc<dyn EventRepository>,
        users: Arc<dyn UserRepository>,
        config: &Config,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(&config.jwt_secret, config.token_lifetime));

        Self {
            events: EventService::new(events),
            accounts: AccountService::new(users.clone(), tokens.clone()),
            verifier: CredentialVerifier::new(tokens, users),
        }
    }

    pub fn in_memory(config: &Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, config)
    }
}

impl FromRef<AppState> for CredentialVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
