// Bearer tokens are HS256 JWTs signed with the shared JWT_SECRET.
// Only the subject is trusted from the token; the role is always re-read
// from the user store.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("invalid or expired token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("token subject is not a user id")]
    MalformedSubject,

    #[error("token lifetime is out of range")]
    LifetimeOutOfRange,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: std::time::Duration,
}

impl TokenService {
    pub fn new(secret: &str, lifetime: std::time::Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires_at = Duration::from_std(self.lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(TokenError::LifetimeOutOfRange)?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(TokenError::Signing)
    }

    /// Checks signature and expiry and returns the subject user id.
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(TokenError::Invalid)?;

        Uuid::parse_str(&data.claims.sub).map_err(|_| TokenError::MalformedSubject)
    }
}
