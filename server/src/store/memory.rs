// In-memory backend used when no DATABASE_URL is configured, and by tests.
// Each operation takes the map lock once, so single-event writes are atomic
// and concurrent writers settle last-write-wins.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventFilter, EventPage, EventRepository, StoreError, UserRepository};
use crate::models::{
    Event, EventChanges, EventStatus, NewEvent, NewUser, OrganizerSummary, User,
};

#[derive(Default)]
pub struct MemoryStore {
    events: RwLock<HashMap<Uuid, Event>>,
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Fills in the organizer summary the way the Postgres join does.
fn with_organizer(users: &HashMap<Uuid, User>, mut event: Event) -> Event {
    let id = event.organizer.id;
    event.organizer = OrganizerSummary::resolve(id, users.get(&id));
    event
}

fn listing_order(a: &Event, b: &Event) -> std::cmp::Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| a.time.cmp(&b.time))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn find(
        &self,
        filter: &EventFilter,
        skip: i64,
        limit: i64,
    ) -> Result<EventPage, StoreError> {
        let events = self.events.read().await;
        let mut matching: Vec<&Event> = events.values().filter(|e| filter.matches(e)).collect();
        matching.sort_by(|a, b| listing_order(a, b));

        let total = matching.len() as i64;
        let users = self.users.read().await;
        let events = matching
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|event| with_organizer(&users, event.clone()))
            .collect();

        Ok(EventPage { events, total })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let events = self.events.read().await;
        let users = self.users.read().await;
        Ok(events.get(&id).map(|event| with_organizer(&users, event.clone())))
    }

    async fn insert(&self, event: NewEvent) -> Result<Event, StoreError> {
        let event = event.into_event(Uuid::new_v4(), Utc::now());
        self.events.write().await.insert(event.id, event.clone());
        Ok(with_organizer(&*self.users.read().await, event))
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        changes: EventChanges,
    ) -> Result<Option<Event>, StoreError> {
        let mut events = self.events.write().await;
        let Some(event) = events.get_mut(&id) else {
            return Ok(None);
        };

        changes.apply_to(event);
        event.updated_at = Utc::now().max(event.created_at);
        let event = event.clone();
        Ok(Some(with_organizer(&*self.users.read().await, event)))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.events.write().await.remove(&id).is_some())
    }

    async fn find_approved_on(&self, day: NaiveDate) -> Result<Vec<Event>, StoreError> {
        let events = self.events.read().await;
        let users = self.users.read().await;
        let mut today: Vec<Event> = events
            .values()
            .filter(|e| e.status == EventStatus::Approved && e.date == day)
            .map(|event| with_organizer(&users, event.clone()))
            .collect();
        today.sort_by(listing_order);
        Ok(today)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email '{}' already registered",
                user.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            organization: user.organization,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::fixtures;
    use crate::models::Role;
    use chrono::Days;
    use std::sync::Arc;

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = MemoryStore::new();
        let organizer = Uuid::new_v4();

        let event = store
            .insert(fixtures::event(organizer, EventStatus::Pending, today()))
            .await
            .unwrap();

        assert_eq!(event.organizer.id, organizer);
        assert_eq!(event.created_at, event.updated_at);
        let found = store.find_by_id(event.id).await.unwrap();
        assert_eq!(found, Some(event));
    }

    #[tokio::test]
    async fn test_find_sorts_by_date_and_paginates() {
        let store = MemoryStore::new();
        let organizer = Uuid::new_v4();
        for offset in (0..5u64).rev() {
            let date = today().checked_add_days(Days::new(offset)).unwrap();
            store
                .insert(fixtures::event(organizer, EventStatus::Approved, date))
                .await
                .unwrap();
        }

        let page = store.find(&EventFilter::default(), 2, 2).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.events.len(), 2);
        assert_eq!(page.events[0].date, today().checked_add_days(Days::new(2)).unwrap());
        assert_eq!(page.events[1].date, today().checked_add_days(Days::new(3)).unwrap());
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at_and_reports_missing() {
        let store = MemoryStore::new();
        let event = store
            .insert(fixtures::event(Uuid::new_v4(), EventStatus::Pending, today()))
            .await
            .unwrap();

        let updated = store
            .update_by_id(event.id, EventChanges::status(EventStatus::Approved))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, EventStatus::Approved);
        assert!(updated.updated_at >= updated.created_at);
        assert_eq!(updated.created_at, event.created_at);

        let missing = store
            .update_by_id(Uuid::new_v4(), EventChanges::status(EventStatus::Approved))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_whether_anything_was_removed() {
        let store = MemoryStore::new();
        let event = store
            .insert(fixtures::event(Uuid::new_v4(), EventStatus::Pending, today()))
            .await
            .unwrap();

        assert!(store.delete_by_id(event.id).await.unwrap());
        assert!(!store.delete_by_id(event.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_approved_on_ignores_other_days_and_statuses() {
        let store = MemoryStore::new();
        let organizer = Uuid::new_v4();
        let tomorrow = today().succ_opt().unwrap();

        let todays = store
            .insert(fixtures::event(organizer, EventStatus::Approved, today()))
            .await
            .unwrap();
        store
            .insert(fixtures::event(organizer, EventStatus::Pending, today()))
            .await
            .unwrap();
        store
            .insert(fixtures::event(organizer, EventStatus::Approved, tomorrow))
            .await
            .unwrap();

        let found = store.find_approved_on(today()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, todays.id);
    }

    #[tokio::test]
    async fn test_concurrent_updates_to_disjoint_fields_both_persist() {
        let store = Arc::new(MemoryStore::new());
        let event = store
            .insert(fixtures::event(Uuid::new_v4(), EventStatus::Pending, today()))
            .await
            .unwrap();

        let retitle = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_by_id(
                        event.id,
                        EventChanges {
                            title: Some("Robotics Open House".to_string()),
                            ..EventChanges::default()
                        },
                    )
                    .await
            })
        };
        let relocate = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_by_id(
                        event.id,
                        EventChanges {
                            location: Some("Student Union".to_string()),
                            ..EventChanges::default()
                        },
                    )
                    .await
            })
        };
        retitle.await.unwrap().unwrap();
        relocate.await.unwrap().unwrap();

        let stored = store
            .find_by_id(event.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "Robotics Open House");
        assert_eq!(stored.location, "Student Union");
    }

    #[tokio::test]
    async fn test_concurrent_updates_to_same_field_settle_on_last_write() {
        let store = Arc::new(MemoryStore::new());
        let event = store
            .insert(fixtures::event(Uuid::new_v4(), EventStatus::Pending, today()))
            .await
            .unwrap();

        let writes: Vec<_> = ["Draft A", "Draft B"]
            .into_iter()
            .map(|title| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .update_by_id(
                            event.id,
                            EventChanges {
                                title: Some(title.to_string()),
                                ..EventChanges::default()
                            },
                        )
                        .await
                })
            })
            .collect();

        let mut last_written = None;
        for write in writes {
            let updated = write.await.unwrap().unwrap().unwrap();
            if last_written
                .as_ref()
                .map_or(true, |prev: &Event| updated.updated_at >= prev.updated_at)
            {
                last_written = Some(updated);
            }
        }

        let stored = store
            .find_by_id(event.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.title == "Draft A" || stored.title == "Draft B");
        assert_eq!(Some(stored.updated_at), last_written.map(|e| e.updated_at));
    }

    #[tokio::test]
    async fn test_events_carry_organizer_contact_details() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(NewUser {
                name: "Chess Club".to_string(),
                email: "chess@campus.edu".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Organizer,
                organization: Some("Student Union".to_string()),
            })
            .await
            .unwrap();

        let event = store
            .insert(fixtures::event(user.id, EventStatus::Approved, today()))
            .await
            .unwrap();
        assert_eq!(event.organizer.email.as_deref(), Some("chess@campus.edu"));
        assert_eq!(event.organizer.organization.as_deref(), Some("Student Union"));

        let listed = store.find(&EventFilter::default(), 0, 10).await.unwrap();
        assert_eq!(listed.events[0].organizer.name.as_deref(), Some("Chess Club"));

        store.delete_user(user.id).await.unwrap();
        let orphaned = store.find_by_id(event.id).await.unwrap().unwrap();
        assert_eq!(orphaned.organizer, OrganizerSummary::unresolved(user.id));
        assert_eq!(orphaned.organizer_name, "Robotics Club");
    }

    #[tokio::test]
    async fn test_user_email_is_unique() {
        let store = MemoryStore::new();
        let new_user = NewUser {
            name: "Ada".to_string(),
            email: "ada@campus.edu".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Organizer,
            organization: None,
        };

        store.insert_user(new_user.clone()).await.unwrap();
        let err = store.insert_user(new_user).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
