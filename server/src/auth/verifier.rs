use axum::http::{header, HeaderMap};
use std::sync::Arc;

use super::{Identity, TokenService};
use crate::store::UserRepository;
use crate::utils::AppError;

/// Turns a bearer token into an [`Identity`].
#[derive(Clone)]
pub struct CredentialVerifier {
    tokens: Arc<TokenService>,
    users: Arc<dyn UserRepository>,
}

enum Outcome {
    Missing,
    Rejected(&'static str),
    Verified(Identity),
}

impl CredentialVerifier {
    pub fn new(tokens: Arc<TokenService>, users: Arc<dyn UserRepository>) -> Self {
        Self { tokens, users }
    }

    /// Any missing, invalid or orphaned token fails with `Unauthenticated`.
    pub async fn require(&self, token: Option<&str>) -> Result<Identity, AppError> {
        match self.resolve(token).await? {
            Outcome::Verified(identity) => Ok(identity),
            Outcome::Missing => Err(AppError::Unauthenticated(
                "Not authorized to access this route".to_string(),
            )),
            Outcome::Rejected(reason) => Err(AppError::Unauthenticated(reason.to_string())),
        }
    }

    /// Anonymous (`None`) unless a valid token names an existing user.
    /// Store failures still propagate.
    pub async fn optional(&self, token: Option<&str>) -> Result<Option<Identity>, AppError> {
        match self.resolve(token).await? {
            Outcome::Verified(identity) => Ok(Some(identity)),
            Outcome::Rejected(reason) => {
                tracing::debug!(reason, "Ignoring unusable token on public route");
                Ok(None)
            }
            Outcome::Missing => Ok(None),
        }
    }

    async fn resolve(&self, token: Option<&str>) -> Result<Outcome, AppError> {
        let Some(token) = token else {
            return Ok(Outcome::Missing);
        };

        let user_id = match self.tokens.verify(token) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::debug!("Token verification failed: {}", e);
                return Ok(Outcome::Rejected("Not authorized to access this route"));
            }
        };

        match self.users.find_user(user_id).await? {
            Some(user) => Ok(Outcome::Verified(Identity::from(&user))),
            None => Ok(Outcome::Rejected("User not found")),
        }
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Role};
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;
    use std::time::Duration;
    use uuid::Uuid;

    async fn setup() -> (CredentialVerifier, Arc<TokenService>, Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let tokens = Arc::new(TokenService::new("verifier-secret", Duration::from_secs(600)));
        let user = store
            .insert_user(NewUser {
                name: "Grace".to_string(),
                email: "grace@campus.edu".to_string(),
                password_hash: "unused".to_string(),
                role: Role::Organizer,
                organization: None,
            })
            .await
            .unwrap();

        let verifier = CredentialVerifier::new(tokens.clone(), store.clone());
        (verifier, tokens, store, user.id)
    }

    #[tokio::test]
    async fn test_required_mode() {
        let (verifier, tokens, _, user_id) = setup().await;
        let token = tokens.issue(user_id).unwrap();

        let identity = verifier.require(Some(&token)).await.unwrap();
        assert_eq!(identity.id, user_id);
        assert_eq!(identity.role, Role::Organizer);

        assert!(matches!(
            verifier.require(None).await,
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            verifier.require(Some("garbage")).await,
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_optional_mode_degrades_to_anonymous() {
        let (verifier, tokens, _, user_id) = setup().await;

        assert_eq!(verifier.optional(None).await.unwrap(), None);
        assert_eq!(verifier.optional(Some("garbage")).await.unwrap(), None);

        let token = tokens.issue(user_id).unwrap();
        let identity = verifier.optional(Some(&token)).await.unwrap();
        assert_eq!(identity.map(|i| i.id), Some(user_id));
    }

    #[tokio::test]
    async fn test_deleted_user_is_unauthenticated() {
        let (verifier, tokens, store, user_id) = setup().await;
        let token = tokens.issue(user_id).unwrap();
        store.delete_user(user_id).await.unwrap();

        assert!(matches!(
            verifier.require(Some(&token)).await,
            Err(AppError::Unauthenticated(_))
        ));
        assert_eq!(verifier.optional(Some(&token)).await.unwrap(), None);
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(bearer_token(&headers), None);
    }
}
