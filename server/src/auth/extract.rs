// Axum extractors wiring the credential verifier into handlers.
// `CurrentUser` is the required mode, `MaybeUser` the optional one.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use super::verifier::bearer_token;
use super::{CredentialVerifier, Identity};
use crate::utils::AppError;

#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    CredentialVerifier: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = CredentialVerifier::from_ref(state);
        verifier
            .require(bearer_token(&parts.headers))
            .await
            .map(CurrentUser)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    CredentialVerifier: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = CredentialVerifier::from_ref(state);
        verifier
            .optional(bearer_token(&parts.headers))
            .await
            .map(MaybeUser)
    }
}
