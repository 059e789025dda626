pub mod accounts;
pub mod events;

pub use accounts::{AccountService, AuthSession};
pub use events::{EventListing, EventService};
