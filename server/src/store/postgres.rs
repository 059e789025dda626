use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{EventFilter, EventPage, EventRepository, StoreError, UserRepository};
use crate::models::{
    Event, EventCategory, EventChanges, EventStatus, NewEvent, NewUser, OrganizerSummary, User,
};

// Selected over `events e LEFT JOIN users u`; the organizer summary columns
// are NULL once the owning account is deleted.
const EVENT_COLUMNS: &str = "e.id, e.title, e.description, e.category, e.date, e.time, \
     e.end_time, e.location, e.organizer, e.organizer_name, e.contact_email, e.contact_phone, \
     e.status, e.featured, e.max_attendees, e.registration_link, e.image_url, e.created_at, \
     e.updated_at, u.name AS organizer_user_name, u.email AS organizer_email, \
     u.organization AS organizer_organization";

const ORGANIZER_JOIN: &str = " e LEFT JOIN users u ON u.id = e.organizer";

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, organization, created_at, updated_at";

const LISTING_ORDER: &str = " ORDER BY e.date ASC, e.time ASC, e.created_at ASC, e.id ASC";

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: String,
    category: EventCategory,
    date: NaiveDate,
    time: String,
    end_time: Option<String>,
    location: String,
    organizer: Uuid,
    organizer_name: String,
    contact_email: String,
    contact_phone: Option<String>,
    status: EventStatus,
    featured: bool,
    max_attendees: Option<i32>,
    registration_link: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    organizer_user_name: Option<String>,
    organizer_email: Option<String>,
    organizer_organization: Option<String>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            date: row.date,
            time: row.time,
            end_time: row.end_time,
            location: row.location,
            organizer: OrganizerSummary {
                id: row.organizer,
                name: row.organizer_user_name,
                email: row.organizer_email,
                organization: row.organizer_organization,
            },
            organizer_name: row.organizer_name,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            status: row.status,
            featured: row.featured,
            max_attendees: row.max_attendees,
            registration_link: row.registration_link,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!("Successfully connected to database");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!().run(&self.pool).await?;
        tracing::info!("Migrations run successfully");
        Ok(())
    }
}

/// Escapes LIKE wildcards so the search term matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter) {
    builder.push(" WHERE TRUE");

    if let Some(status) = filter.status {
        builder.push(" AND e.status = ").push_bind(status);
    }
    if let Some(category) = filter.category {
        builder.push(" AND e.category = ").push_bind(category);
    }
    if let Some(start) = filter.start_date {
        builder.push(" AND e.date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        builder.push(" AND e.date <= ").push_bind(end);
    }
    if let Some(featured) = filter.featured {
        builder.push(" AND e.featured = ").push_bind(featured);
    }
    if let Some(organizer) = filter.organizer {
        builder.push(" AND e.organizer = ").push_bind(organizer);
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        builder
            .push(" AND (e.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl EventRepository for PgStore {
    async fn find(
        &self,
        filter: &EventFilter,
        skip: i64,
        limit: i64,
    ) -> Result<EventPage, StoreError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM events e");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events{ORGANIZER_JOIN}"));
        push_filter(&mut query, filter);
        query
            .push(LISTING_ORDER)
            .push(" OFFSET ")
            .push_bind(skip.max(0))
            .push(" LIMIT ")
            .push_bind(limit.max(0));
        let rows = query.build_query_as::<EventRow>().fetch_all(&self.pool).await?;

        Ok(EventPage {
            events: rows.into_iter().map(Event::from).collect(),
            total,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events{ORGANIZER_JOIN} WHERE e.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Event::from))
    }

    async fn insert(&self, event: NewEvent) -> Result<Event, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "WITH saved AS (INSERT INTO events (id, title, description, category, date, time, end_time, \
             location, organizer, organizer_name, contact_email, contact_phone, status, \
             featured, max_attendees, registration_link, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING *) \
             SELECT {EVENT_COLUMNS} FROM saved{ORGANIZER_JOIN}"
        ))
        .bind(Uuid::new_v4())
        .bind(event.title)
        .bind(event.description)
        .bind(event.category)
        .bind(event.date)
        .bind(event.time)
        .bind(event.end_time)
        .bind(event.location)
        .bind(event.organizer)
        .bind(event.organizer_name)
        .bind(event.contact_email)
        .bind(event.contact_phone)
        .bind(event.status)
        .bind(event.featured)
        .bind(event.max_attendees)
        .bind(event.registration_link)
        .bind(event.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        changes: EventChanges,
    ) -> Result<Option<Event>, StoreError> {
        // Single statement, so the row is read and written atomically.
        let mut query = QueryBuilder::<Postgres>::new(
            "WITH saved AS (UPDATE events SET updated_at = GREATEST(NOW(), created_at)",
        );

        if let Some(title) = changes.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = changes.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(category) = changes.category {
            query.push(", category = ").push_bind(category);
        }
        if let Some(date) = changes.date {
            query.push(", date = ").push_bind(date);
        }
        if let Some(time) = changes.time {
            query.push(", time = ").push_bind(time);
        }
        if let Some(end_time) = changes.end_time {
            query.push(", end_time = ").push_bind(end_time);
        }
        if let Some(location) = changes.location {
            query.push(", location = ").push_bind(location);
        }
        if let Some(contact_email) = changes.contact_email {
            query.push(", contact_email = ").push_bind(contact_email);
        }
        if let Some(contact_phone) = changes.contact_phone {
            query.push(", contact_phone = ").push_bind(contact_phone);
        }
        if let Some(status) = changes.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(featured) = changes.featured {
            query.push(", featured = ").push_bind(featured);
        }
        if let Some(max_attendees) = changes.max_attendees {
            query.push(", max_attendees = ").push_bind(max_attendees);
        }
        if let Some(registration_link) = changes.registration_link {
            query.push(", registration_link = ").push_bind(registration_link);
        }
        if let Some(image_url) = changes.image_url {
            query.push(", image_url = ").push_bind(image_url);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(
                " RETURNING *) SELECT {EVENT_COLUMNS} FROM saved{ORGANIZER_JOIN}"
            ));

        let row = query
            .build_query_as::<EventRow>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Event::from))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_approved_on(&self, day: NaiveDate) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events{ORGANIZER_JOIN} \
             WHERE e.status = $1 AND e.date = $2{LISTING_ORDER}"
        ))
        .bind(EventStatus::Approved)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password_hash, role, organization) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.role)
        .bind(user.organization)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
