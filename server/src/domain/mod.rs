pub mod query;
pub mod validation;
pub mod workflow;

pub use query::{plan_listing, EventQuery, ListingPlan, Pagination};
pub use validation::{validate_changes, validate_new_event, EventFields};
