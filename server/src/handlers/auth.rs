use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::models::{LoginRequest, RegisterRequest};
use crate::services::AuthSession;
use crate::state::AppState;
use crate::utils::response::success;
use crate::utils::AppError;

/// `{ success, token, user }`, the shape the web client stores.
#[derive(Serialize)]
struct SessionResponse {
    success: bool,
    #[serde(flatten)]
    session: AuthSession,
}

fn session_response(status: StatusCode, session: AuthSession) -> Response {
    (
        status,
        Json(SessionResponse {
            success: true,
            session,
        }),
    )
        .into_response()
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let session = state.accounts.register(request).await?;
    Ok(session_response(StatusCode::CREATED, session))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let session = state.accounts.login(request).await?;
    Ok(session_response(StatusCode::OK, session))
}

pub async fn me(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Response, AppError> {
    let profile = state.accounts.profile(&identity).await?;
    Ok(success(profile))
}
