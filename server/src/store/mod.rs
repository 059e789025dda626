// Persistence for events and users.
// Handlers and services only see the `EventRepository` and
// `UserRepository` traits. Two backends implement them: Postgres for
// deployments and an in-memory map for development and tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, EventCategory, EventChanges, EventStatus, NewEvent, NewUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Structured, already-trusted filter. Every field is ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub category: Option<EventCategory>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    /// Inclusive lower bound.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound.
    pub end_date: Option<NaiveDate>,
    pub featured: Option<bool>,
    pub organizer: Option<Uuid>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if self.status.is_some_and(|status| event.status != status) {
            return false;
        }
        if self.category.is_some_and(|category| event.category != category) {
            return false;
        }
        if self.start_date.is_some_and(|start| event.date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| event.date > end) {
            return false;
        }
        if self.featured.is_some_and(|featured| event.featured != featured) {
            return false;
        }
        if self.organizer.is_some_and(|organizer| event.organizer.id != organizer) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            return event.title.to_lowercase().contains(&term)
                || event.description.to_lowercase().contains(&term);
        }
        true
    }
}

/// One page of a filtered listing plus the size of the whole result set.
#[derive(Debug, Clone)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub total: i64,
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Events matching `filter`, ordered by date ascending (then time, then
    /// creation order). `total` ignores `skip` and `limit`.
    async fn find(&self, filter: &EventFilter, skip: i64, limit: i64)
        -> Result<EventPage, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn insert(&self, event: NewEvent) -> Result<Event, StoreError>;

    /// Applies `changes` and refreshes `updated_at`. `None` when absent.
    async fn update_by_id(&self, id: Uuid, changes: EventChanges)
        -> Result<Option<Event>, StoreError>;

    /// `false` when there was nothing to delete.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Approved events taking place on `day`.
    async fn find_approved_on(&self, day: NaiveDate) -> Result<Vec<Event>, StoreError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Lookup by normalized (trimmed, lowercase) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;
}
