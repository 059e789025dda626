use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::{CurrentUser, MaybeUser};
use crate::domain::{EventQuery, Pagination};
use crate::models::{CreateEventRequest, Event, UpdateEventRequest, UpdateStatusRequest};
use crate::state::AppState;
use crate::utils::response::{created, empty_success, success};
use crate::utils::AppError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    success: bool,
    data: Vec<Event>,
    today_events: Vec<Event>,
    pagination: Pagination,
}

pub async fn list_events(
    State(state): State<AppState>,
    MaybeUser(identity): MaybeUser,
    query: Result<Query<EventQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|e| AppError::invalid("query", e.body_text()))?;
    let listing = state.events.list(identity.as_ref(), &query).await?;

    Ok(Json(EventListResponse {
        success: true,
        data: listing.events,
        today_events: listing.today,
        pagination: listing.pagination,
    })
    .into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let event = state.events.get(&id).await?;
    Ok(success(event))
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    state.events.ensure_can_create(&identity)?;
    let Json(request) = payload?;
    let event = state.events.create(&identity, request).await?;
    Ok(created(event))
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let event = state.events.update(&identity, &id, request).await?;
    Ok(success(event))
}

pub async fn update_event_status(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    state.events.ensure_can_moderate(&identity)?;
    let Json(request) = payload?;
    let event = state.events.update_status(&identity, &id, request).await?;
    Ok(success(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    state.events.delete(&identity, &id).await?;
    Ok(empty_success("Event deleted"))
}
