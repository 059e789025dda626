use chrono::{Local, NaiveDate};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{can_perform, Action, Identity};
use crate::domain::{plan_listing, validate_changes, validate_new_event, workflow, EventQuery, Pagination};
use crate::models::{CreateEventRequest, Event, EventStatus, UpdateEventRequest, UpdateStatusRequest};
use crate::store::EventRepository;
use crate::utils::AppError;

#[derive(Debug, Clone)]
pub struct EventListing {
    pub events: Vec<Event>,
    pub today: Vec<Event>,
    pub pagination: Pagination,
}

/// Event operations. Every call receives the caller's identity explicitly;
/// authorization and validation run before any write.
#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventRepository>,
}

/// Malformed ids cannot name an event, so they are reported as not found.
fn parse_event_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::event_not_found())
}

impl EventService {
    pub fn new(events: Arc<dyn EventRepository>) -> Self {
        Self { events }
    }

    pub async fn list(
        &self,
        identity: Option<&Identity>,
        query: &EventQuery,
    ) -> Result<EventListing, AppError> {
        self.list_as_of(identity, query, Local::now().date_naive()).await
    }

    /// Listing with an explicit "today" for the today's-events section.
    pub async fn list_as_of(
        &self,
        identity: Option<&Identity>,
        query: &EventQuery,
        today: NaiveDate,
    ) -> Result<EventListing, AppError> {
        let plan = plan_listing(identity, query)?;

        let page = self.events.find(&plan.filter, plan.skip(), plan.limit).await?;
        let today = self.events.find_approved_on(today).await?;

        Ok(EventListing {
            events: page.events,
            today,
            pagination: Pagination::new(plan.page, plan.limit, page.total),
        })
    }

    pub async fn get(&self, id: &str) -> Result<Event, AppError> {
        let id = parse_event_id(id)?;
        self.events
            .find_by_id(id)
            .await?
            .ok_or_else(AppError::event_not_found)
    }

    /// Role check for submissions, usable before the request body is decoded.
    pub fn ensure_can_create(&self, identity: &Identity) -> Result<(), AppError> {
        if can_perform(Some(identity), Action::Create).is_allowed() {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role '{}' is not authorized to create events",
                identity.role
            )))
        }
    }

    /// Role check for status changes, usable before the request body is decoded.
    pub fn ensure_can_moderate(&self, identity: &Identity) -> Result<(), AppError> {
        if can_perform(Some(identity), Action::UpdateStatus).is_allowed() {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role '{}' is not authorized to change event status",
                identity.role
            )))
        }
    }

    pub async fn create(
        &self,
        identity: &Identity,
        request: CreateEventRequest,
    ) -> Result<Event, AppError> {
        self.ensure_can_create(identity)?;

        let fields = validate_new_event(&request).map_err(AppError::ValidationFailed)?;
        let event = self
            .events
            .insert(workflow::new_event(identity, fields))
            .await?;

        tracing::info!(
            event_id = %event.id,
            organizer = %identity.id,
            status = %event.status,
            "Event created"
        );
        Ok(event)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: &str,
        request: UpdateEventRequest,
    ) -> Result<Event, AppError> {
        let existing = self.get(id).await?;
        if !can_perform(Some(identity), Action::Update(&existing)).is_allowed() {
            return Err(AppError::Forbidden(
                "Not authorized to update this event".to_string(),
            ));
        }

        let changes = validate_changes(&request).map_err(AppError::ValidationFailed)?;
        let changes = workflow::restrict_edit(changes);

        let event = self
            .events
            .update_by_id(existing.id, changes)
            .await?
            .ok_or_else(AppError::event_not_found)?;

        tracing::info!(event_id = %event.id, editor = %identity.id, "Event updated");
        Ok(event)
    }

    pub async fn update_status(
        &self,
        identity: &Identity,
        id: &str,
        request: UpdateStatusRequest,
    ) -> Result<Event, AppError> {
        self.ensure_can_moderate(identity)?;

        let status = request
            .status
            .as_deref()
            .and_then(|s| s.trim().parse::<EventStatus>().ok())
            .ok_or_else(|| {
                AppError::invalid(
                    "status",
                    "Status must be one of: pending, approved, rejected, cancelled",
                )
            })?;

        let id = parse_event_id(id)?;
        let event = self
            .events
            .update_by_id(id, workflow::status_change(status))
            .await?
            .ok_or_else(AppError::event_not_found)?;

        tracing::info!(event_id = %event.id, admin = %identity.id, status = %status, "Event status changed");
        Ok(event)
    }

    pub async fn delete(&self, identity: &Identity, id: &str) -> Result<(), AppError> {
        let existing = self.get(id).await?;
        if !can_perform(Some(identity), Action::Delete(&existing)).is_allowed() {
            return Err(AppError::Forbidden(
                "Not authorized to delete this event".to_string(),
            ));
        }

        if !self.events.delete_by_id(existing.id).await? {
            return Err(AppError::event_not_found());
        }

        tracing::info!(event_id = %existing.id, actor = %identity.id, "Event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::MemoryStore;
    use chrono::Days;

    fn service() -> EventService {
        EventService::new(Arc::new(MemoryStore::new()))
    }

    fn identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            name: format!("Campus {role}"),
            role,
        }
    }

    fn request_on(date: NaiveDate) -> CreateEventRequest {
        CreateEventRequest {
            title: Some("Intro to Rock Climbing".to_string()),
            description: Some("Beginner session at the campus wall".to_string()),
            category: Some("sports".to_string()),
            date: Some(date.format("%Y-%m-%d").to_string()),
            time: Some("16:00".to_string()),
            location: Some("Rec Center".to_string()),
            contact_email: Some("outdoors@campus.edu".to_string()),
            ..CreateEventRequest::default()
        }
    }

    fn request() -> CreateEventRequest {
        request_on(NaiveDate::from_ymd_opt(2026, 11, 20).unwrap())
    }

    fn query(status: Option<&str>, page: Option<&str>) -> EventQuery {
        EventQuery {
            status: status.map(str::to_string),
            page: page.map(str::to_string),
            ..EventQuery::default()
        }
    }

    #[tokio::test]
    async fn test_student_cannot_create() {
        let err = service()
            .create(&identity(Role::Student), request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_initial_status_by_role() {
        let service = service();
        let organizer = identity(Role::Organizer);

        let pending = service.create(&organizer, request()).await.unwrap();
        assert_eq!(pending.status, EventStatus::Pending);
        assert_eq!(pending.organizer.id, organizer.id);
        assert_eq!(pending.organizer_name, organizer.name);

        let approved = service.create(&identity(Role::Admin), request()).await.unwrap();
        assert_eq!(approved.status, EventStatus::Approved);
    }

    #[tokio::test]
    async fn test_invalid_payload_writes_nothing() {
        let service = service();
        let admin = identity(Role::Admin);
        let bad = CreateEventRequest {
            contact_email: Some("nope".to_string()),
            ..request()
        };

        assert!(matches!(
            service.create(&admin, bad).await,
            Err(AppError::ValidationFailed(_))
        ));
        let listing = service.list(Some(&admin), &EventQuery::default()).await.unwrap();
        assert_eq!(listing.pagination.total, 0);
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update_or_delete() {
        let service = service();
        let owner = identity(Role::Organizer);
        let event = service.create(&owner, request()).await.unwrap();
        let id = event.id.to_string();

        for intruder in [identity(Role::Organizer), identity(Role::Student)] {
            let update = service
                .update(&intruder, &id, UpdateEventRequest::default())
                .await;
            assert!(matches!(update, Err(AppError::Forbidden(_))));

            let delete = service.delete(&intruder, &id).await;
            assert!(matches!(delete, Err(AppError::Forbidden(_))));
        }

        assert_eq!(service.get(&id).await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_update_never_changes_ownership_or_status() {
        let service = service();
        let owner = identity(Role::Organizer);
        let event = service.create(&owner, request()).await.unwrap();
        let id = event.id.to_string();

        for editor in [owner.clone(), identity(Role::Admin)] {
            let request: UpdateEventRequest = serde_json::from_value(serde_json::json!({
                "title": "Advanced Rock Climbing",
                "organizer": Uuid::new_v4(),
                "organizerName": "Someone Else",
                "status": "approved",
            }))
            .unwrap();

            let updated = service.update(&editor, &id, request).await.unwrap();
            assert_eq!(updated.title, "Advanced Rock Climbing");
            assert_eq!(updated.organizer.id, owner.id);
            assert_eq!(updated.organizer_name, owner.name);
            assert_eq!(updated.status, EventStatus::Pending);
            assert_eq!(updated.created_at, event.created_at);
            assert!(updated.updated_at >= updated.created_at);
        }
    }

    #[tokio::test]
    async fn test_owner_edit_keeps_rejected_status() {
        let service = service();
        let owner = identity(Role::Organizer);
        let admin = identity(Role::Admin);
        let event = service.create(&owner, request()).await.unwrap();
        let id = event.id.to_string();

        service
            .update_status(&admin, &id, UpdateStatusRequest { status: Some("rejected".into()) })
            .await
            .unwrap();

        let request: UpdateEventRequest =
            serde_json::from_str(r#"{"description": "Now with free gear rental"}"#).unwrap();
        let edited = service.update(&owner, &id, request).await.unwrap();
        assert_eq!(edited.status, EventStatus::Rejected);
    }

    #[tokio::test]
    async fn test_status_update_is_admin_only_and_idempotent() {
        let service = service();
        let owner = identity(Role::Organizer);
        let admin = identity(Role::Admin);
        let event = service.create(&owner, request()).await.unwrap();
        let id = event.id.to_string();
        let approve = || UpdateStatusRequest {
            status: Some("approved".to_string()),
        };

        assert!(matches!(
            service.update_status(&owner, &id, approve()).await,
            Err(AppError::Forbidden(_))
        ));

        let first = service.update_status(&admin, &id, approve()).await.unwrap();
        let second = service.update_status(&admin, &id, approve()).await.unwrap();
        assert_eq!(first.status, EventStatus::Approved);
        assert_eq!(second.status, EventStatus::Approved);
        assert_eq!(first.title, second.title);
    }

    #[tokio::test]
    async fn test_cancelled_event_can_be_reapproved() {
        let service = service();
        let admin = identity(Role::Admin);
        let event = service.create(&admin, request()).await.unwrap();
        let id = event.id.to_string();

        for status in ["cancelled", "approved"] {
            let updated = service
                .update_status(&admin, &id, UpdateStatusRequest { status: Some(status.into()) })
                .await
                .unwrap();
            assert_eq!(updated.status.as_str(), status);
        }
    }

    #[tokio::test]
    async fn test_status_update_validates_value_and_id() {
        let service = service();
        let admin = identity(Role::Admin);

        let bad_status = service
            .update_status(&admin, &Uuid::new_v4().to_string(), UpdateStatusRequest { status: Some("archived".into()) })
            .await;
        assert!(matches!(bad_status, Err(AppError::ValidationFailed(_))));

        let missing = service
            .update_status(&admin, &Uuid::new_v4().to_string(), UpdateStatusRequest { status: Some("approved".into()) })
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids_are_not_found() {
        let service = service();
        let admin = identity(Role::Admin);

        assert!(matches!(
            service.delete(&admin, &Uuid::new_v4().to_string()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get("507f1f77bcf86cd799439011").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_owner_and_admin_can_delete() {
        let service = service();
        let owner = identity(Role::Organizer);
        let admin = identity(Role::Admin);

        let mine = service.create(&owner, request()).await.unwrap();
        service.delete(&owner, &mine.id.to_string()).await.unwrap();

        let theirs = service.create(&owner, request()).await.unwrap();
        service.delete(&admin, &theirs.id.to_string()).await.unwrap();

        assert!(matches!(
            service.get(&theirs.id.to_string()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_pagination_over_25_events() {
        let service = service();
        let admin = identity(Role::Admin);
        for _ in 0..25 {
            service.create(&admin, request()).await.unwrap();
        }

        let first = service.list(None, &query(None, Some("1"))).await.unwrap();
        assert_eq!(first.events.len(), 12);
        assert_eq!(first.pagination.total, 25);
        assert_eq!(first.pagination.pages, 3);

        let third = service.list(None, &query(None, Some("3"))).await.unwrap();
        assert_eq!(third.events.len(), 1);
        assert_eq!(third.pagination.page, 3);
    }

    #[tokio::test]
    async fn test_public_listing_only_shows_approved() {
        let service = service();
        let organizer = identity(Role::Organizer);
        let admin = identity(Role::Admin);
        let student = identity(Role::Student);

        let pending = service.create(&organizer, request()).await.unwrap();
        service.create(&admin, request()).await.unwrap();

        for caller in [None, Some(&student), Some(&organizer)] {
            let listing = service.list(caller, &query(Some("pending"), None)).await.unwrap();
            assert_eq!(listing.pagination.total, 1);
            assert!(listing.events.iter().all(|e| e.status == EventStatus::Approved));
        }

        let admin_view = service
            .list(Some(&admin), &query(Some("pending"), None))
            .await
            .unwrap();
        assert_eq!(admin_view.events.len(), 1);
        assert_eq!(admin_view.events[0].id, pending.id);

        let everything = service.list(Some(&admin), &EventQuery::default()).await.unwrap();
        assert_eq!(everything.pagination.total, 2);
    }

    #[tokio::test]
    async fn test_todays_events() {
        let service = service();
        let admin = identity(Role::Admin);
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap();

        let todays = service.create(&admin, request_on(today)).await.unwrap();
        service.create(&admin, request_on(tomorrow)).await.unwrap();

        let listing = service
            .list_as_of(None, &EventQuery::default(), today)
            .await
            .unwrap();
        assert_eq!(listing.today.len(), 1);
        assert_eq!(listing.today[0].id, todays.id);
        assert_eq!(listing.events.len(), 2);
    }

    #[tokio::test]
    async fn test_moderation_scenario() {
        let service = service();
        let organizer = identity(Role::Organizer);
        let admin = identity(Role::Admin);
        let student = identity(Role::Student);

        let event = service.create(&organizer, request()).await.unwrap();
        assert_eq!(event.status, EventStatus::Pending);

        service
            .update_status(&admin, &event.id.to_string(), UpdateStatusRequest { status: Some("approved".into()) })
            .await
            .unwrap();

        let listing = service
            .list(Some(&student), &query(Some("pending"), None))
            .await
            .unwrap();
        assert!(listing.events.iter().all(|e| e.status == EventStatus::Approved));
        assert!(listing.events.iter().any(|e| e.id == event.id));
        assert!(listing.events.iter().all(|e| e.status != EventStatus::Pending));
    }

    #[tokio::test]
    async fn test_organizer_can_feature_own_event() {
        let service = service();
        let owner = identity(Role::Organizer);

        let featured = CreateEventRequest {
            featured: Some(true),
            ..request()
        };
        let event = service.create(&owner, featured).await.unwrap();
        assert!(event.featured);

        let request: UpdateEventRequest = serde_json::from_str(r#"{"featured": false}"#).unwrap();
        let edited = service
            .update(&owner, &event.id.to_string(), request)
            .await
            .unwrap();
        assert!(!edited.featured);
    }

    #[tokio::test]
    async fn test_same_day_events_sort_by_clock_time() {
        let service = service();
        let admin = identity(Role::Admin);

        for time in ["10:00", "9:00"] {
            let request = CreateEventRequest {
                time: Some(time.to_string()),
                ..request()
            };
            service.create(&admin, request).await.unwrap();
        }

        let listing = service.list(None, &EventQuery::default()).await.unwrap();
        let times: Vec<&str> = listing.events.iter().map(|e| e.time.as_str()).collect();
        assert_eq!(times, vec!["09:00", "10:00"]);
    }

    #[tokio::test]
    async fn test_role_checks_run_without_a_payload() {
        let service = service();
        let student = identity(Role::Student);
        let organizer = identity(Role::Organizer);

        assert!(matches!(service.ensure_can_create(&student), Err(AppError::Forbidden(_))));
        assert!(service.ensure_can_create(&organizer).is_ok());
        assert!(matches!(
            service.ensure_can_moderate(&organizer),
            Err(AppError::Forbidden(_))
        ));
        assert!(service.ensure_can_moderate(&identity(Role::Admin)).is_ok());
    }
}
