// Event status lifecycle and mutation rules.
// Status moves between pending, approved, rejected and cancelled only
// through an admin's explicit status change, and any of the four may be
// set from any other. Ordinary edits never touch status, including edits
// by a non-admin to an approved or rejected event.

use super::validation::EventFields;
use crate::auth::Identity;
use crate::models::{EventChanges, EventStatus, NewEvent};

/// Admin submissions publish immediately; everything else awaits review.
pub fn initial_status(creator: &Identity) -> EventStatus {
    if creator.is_admin() {
        EventStatus::Approved
    } else {
        EventStatus::Pending
    }
}

/// Binds validated fields to their owner. The organizer snapshot is taken
/// from the creator here and can never change afterwards.
pub fn new_event(creator: &Identity, fields: EventFields) -> NewEvent {
    NewEvent {
        title: fields.title,
        description: fields.description,
        category: fields.category,
        date: fields.date,
        time: fields.time,
        end_time: fields.end_time,
        location: fields.location,
        organizer: creator.id,
        organizer_name: creator.name.clone(),
        contact_email: fields.contact_email,
        contact_phone: fields.contact_phone,
        status: initial_status(creator),
        featured: fields.featured.unwrap_or(false),
        max_attendees: fields.max_attendees,
        registration_link: fields.registration_link,
        image_url: fields.image_url,
    }
}

/// Status is never part of an edit, whoever the editor is.
pub fn restrict_edit(mut changes: EventChanges) -> EventChanges {
    changes.status = None;
    changes
}

/// Status change requested by an admin. Accepted unconditionally,
/// including no-op and "backwards" moves such as cancelled to approved.
pub fn status_change(status: EventStatus) -> EventChanges {
    EventChanges::status(status)
}
