// Turns untrusted listing parameters into a repository filter.
// Unknown categories and statuses are ignored rather than rejected.
// Malformed dates and organizer ids are reported as validation errors.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::parse_date;
use crate::auth::{can_perform, Action, Identity};
use crate::models::{EventCategory, EventStatus};
use crate::store::EventFilter;
use crate::utils::{AppError, FieldViolation};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 12;
pub const MAX_LIMIT: i64 = 100;

/// Raw query string of `GET /api/events`. Kept as strings so that bad
/// values can be ignored or reported individually.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub featured: Option<String>,
    pub organizer: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingPlan {
    pub filter: EventFilter,
    pub page: i64,
    pub limit: i64,
}

impl ListingPlan {
    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

fn positive(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(default)
}

/// Visibility rule: only admins see anything but approved events. An admin
/// without a (recognized) status sees every status.
fn visible_status(identity: Option<&Identity>, requested: Option<&str>) -> Option<EventStatus> {
    if can_perform(identity, Action::ViewAllStatuses).is_allowed() {
        requested.and_then(|s| s.trim().parse().ok())
    } else {
        Some(EventStatus::Approved)
    }
}

pub fn plan_listing(identity: Option<&Identity>, query: &EventQuery) -> Result<ListingPlan, AppError> {
    let mut violations = Vec::new();

    let mut date_param = |field: &str, raw: Option<&str>| {
        let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
        let parsed = parse_date(raw);
        if parsed.is_none() {
            violations.push(FieldViolation::new(field, "Must be a date (YYYY-MM-DD)"));
        }
        parsed
    };
    let start_date = date_param("startDate", query.start_date.as_deref());
    let end_date = date_param("endDate", query.end_date.as_deref());

    let organizer = match query.organizer.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                violations.push(FieldViolation::new("organizer", "Must be a user id"));
                None
            }
        },
        None => None,
    };

    if !violations.is_empty() {
        return Err(AppError::ValidationFailed(violations));
    }

    let filter = EventFilter {
        status: visible_status(identity, query.status.as_deref()),
        // "all" and anything unrecognized mean no category filter
        category: query
            .category
            .as_deref()
            .and_then(|c| c.trim().parse::<EventCategory>().ok()),
        search: query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        start_date,
        end_date,
        featured: query
            .featured
            .as_deref()
            .filter(|f| f.trim() == "true")
            .map(|_| true),
        organizer,
    };

    Ok(ListingPlan {
        filter,
        page: positive(query.page.as_deref(), DEFAULT_PAGE),
        limit: positive(query.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT),
    })
}
