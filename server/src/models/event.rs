use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "event_category", rename_all = "lowercase")]
pub enum EventCategory {
    Academic,
    Cultural,
    Sports,
    Workshop,
    Seminar,
    Club,
    Social,
    #[default]
    Other,
}

impl EventCategory {
    pub const ALL: [EventCategory; 8] = [
        EventCategory::Academic,
        EventCategory::Cultural,
        EventCategory::Sports,
        EventCategory::Workshop,
        EventCategory::Seminar,
        EventCategory::Club,
        EventCategory::Social,
        EventCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Academic => "academic",
            EventCategory::Cultural => "cultural",
            EventCategory::Sports => "sports",
            EventCategory::Workshop => "workshop",
            EventCategory::Seminar => "seminar",
            EventCategory::Club => "club",
            EventCategory::Social => "social",
            EventCategory::Other => "other",
        }
    }
}

impl FromStr for EventCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval state of an event. Admins may set any of these at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl EventStatus {
    pub const ALL: [EventStatus; 4] = [
        EventStatus::Pending,
        EventStatus::Approved,
        EventStatus::Rejected,
        EventStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for EventStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of an event as shown in responses. Contact details are read from
/// the user record and stay empty once that account is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizerSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
}

impl OrganizerSummary {
    pub fn unresolved(id: Uuid) -> Self {
        Self {
            id,
            name: None,
            email: None,
            organization: None,
        }
    }

    /// Summary for organizer `id`, filled in from `user` when it exists.
    pub fn resolve(id: Uuid, user: Option<&User>) -> Self {
        match user {
            Some(user) => Self {
                id,
                name: Some(user.name.clone()),
                email: Some(user.email.clone()),
                organization: user.organization.clone(),
            },
            None => Self::unresolved(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub date: NaiveDate,
    pub time: String,
    pub end_time: Option<String>,
    pub location: String,
    pub organizer: OrganizerSummary,
    pub organizer_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub status: EventStatus,
    pub featured: bool,
    pub max_attendees: Option<i32>,
    pub registration_link: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated event ready to be inserted. Ownership and status are
/// decided by the workflow before this reaches the store.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub date: NaiveDate,
    pub time: String,
    pub end_time: Option<String>,
    pub location: String,
    pub organizer: Uuid,
    pub organizer_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub status: EventStatus,
    pub featured: bool,
    pub max_attendees: Option<i32>,
    pub registration_link: Option<String>,
    pub image_url: Option<String>,
}

impl NewEvent {
    pub fn into_event(self, id: Uuid, now: DateTime<Utc>) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            date: self.date,
            time: self.time,
            end_time: self.end_time,
            location: self.location,
            organizer: OrganizerSummary::unresolved(self.organizer),
            organizer_name: self.organizer_name,
            contact_email: self.contact_email,
            contact_phone: self.contact_phone,
            status: self.status,
            featured: self.featured,
            max_attendees: self.max_attendees,
            registration_link: self.registration_link,
            image_url: self.image_url,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update applied by the store. `None` leaves a field untouched;
/// for nullable columns `Some(None)` clears it.
/// `organizer`, `organizer_name` and `created_at` have no counterpart here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<EventCategory>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub end_time: Option<Option<String>>,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<Option<String>>,
    pub status: Option<EventStatus>,
    pub featured: Option<bool>,
    pub max_attendees: Option<Option<i32>>,
    pub registration_link: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
}

impl EventChanges {
    pub fn status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply_to(self, event: &mut Event) {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(category) = self.category {
            event.category = category;
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(time) = self.time {
            event.time = time;
        }
        if let Some(end_time) = self.end_time {
            event.end_time = end_time;
        }
        if let Some(location) = self.location {
            event.location = location;
        }
        if let Some(contact_email) = self.contact_email {
            event.contact_email = contact_email;
        }
        if let Some(contact_phone) = self.contact_phone {
            event.contact_phone = contact_phone;
        }
        if let Some(status) = self.status {
            event.status = status;
        }
        if let Some(featured) = self.featured {
            event.featured = featured;
        }
        if let Some(max_attendees) = self.max_attendees {
            event.max_attendees = max_attendees;
        }
        if let Some(registration_link) = self.registration_link {
            event.registration_link = registration_link;
        }
        if let Some(image_url) = self.image_url {
            event.image_url = image_url;
        }
    }
}

/// Body of `POST /api/events`. Everything is optional at this level so that
/// missing fields surface as field violations instead of a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub featured: Option<bool>,
    pub max_attendees: Option<i64>,
    pub registration_link: Option<String>,
    pub image_url: Option<String>,
}

/// Body of `PUT /api/events/{id}`. Unknown keys (including `organizer` and
/// `organizerName`) are dropped during decoding.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_time: Option<Option<String>>,
    pub location: Option<String>,
    pub contact_email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_phone: Option<Option<String>>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub max_attendees: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub registration_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
