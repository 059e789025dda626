pub mod event;
pub mod user;

pub use event::{
    CreateEventRequest, Event, EventCategory, EventChanges, EventStatus, NewEvent,
    OrganizerSummary, UpdateEventRequest, UpdateStatusRequest,
};
pub use user::{LoginRequest, NewUser, RegisterRequest, Role, User, UserProfile};
