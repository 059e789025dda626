// Role and ownership rules for event operations.
// Pure decisions only: callers turn a `Decision::Deny` into the
// appropriate error.

use crate::auth::Identity;
use crate::models::{Event, Role};

#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    Create,
    Update(&'a Event),
    UpdateStatus,
    Delete(&'a Event),
    /// List events in any status, not just approved ones.
    ViewAllStatuses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// `identity` is `None` for anonymous callers.
pub fn can_perform(identity: Option<&Identity>, action: Action<'_>) -> Decision {
    let Some(identity) = identity else {
        return Decision::Deny;
    };

    let allowed = match action {
        Action::Create => matches!(identity.role, Role::Organizer | Role::Admin),
        Action::Update(event) | Action::Delete(event) => {
            identity.is_admin() || identity.id == event.organizer.id
        }
        Action::UpdateStatus | Action::ViewAllStatuses => identity.is_admin(),
    };

    Decision::from_bool(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::fixtures;
    use crate::models::EventStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn identity(role: Role) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            name: format!("{role} user"),
            role,
        }
    }

    fn owned_by(owner: &Identity) -> Event {
        let now = Utc::now();
        fixtures::event(owner.id, EventStatus::Pending, now.date_naive())
            .into_event(Uuid::new_v4(), now)
    }

    #[test]
    fn test_create_requires_organizer_or_admin() {
        assert_eq!(can_perform(None, Action::Create), Decision::Deny);
        assert_eq!(
            can_perform(Some(&identity(Role::Student)), Action::Create),
            Decision::Deny
        );
        assert!(can_perform(Some(&identity(Role::Organizer)), Action::Create).is_allowed());
        assert!(can_perform(Some(&identity(Role::Admin)), Action::Create).is_allowed());
    }

    #[test]
    fn test_update_and_delete_require_owner_or_admin() {
        let owner = identity(Role::Organizer);
        let other_organizer = identity(Role::Organizer);
        let admin = identity(Role::Admin);
        let event = owned_by(&owner);

        for action in [Action::Update(&event), Action::Delete(&event)] {
            assert!(can_perform(Some(&owner), action).is_allowed());
            assert!(can_perform(Some(&admin), action).is_allowed());
            assert_eq!(can_perform(Some(&other_organizer), action), Decision::Deny);
            assert_eq!(can_perform(None, action), Decision::Deny);
        }
    }

    #[test]
    fn test_student_owner_keeps_ownership_rights() {
        // An account demoted to student still owns what it created.
        let owner = identity(Role::Student);
        let event = owned_by(&owner);
        assert!(can_perform(Some(&owner), Action::Update(&event)).is_allowed());
    }

    #[test]
    fn test_status_changes_and_full_listing_are_admin_only() {
        let owner = identity(Role::Organizer);
        for action in [Action::UpdateStatus, Action::ViewAllStatuses] {
            assert!(can_perform(Some(&identity(Role::Admin)), action).is_allowed());
            assert_eq!(can_perform(Some(&owner), action), Decision::Deny);
            assert_eq!(can_perform(Some(&identity(Role::Student)), action), Decision::Deny);
            assert_eq!(can_perform(None, action), Decision::Deny);
        }
    }
}
