// Field-level validation for event payloads.
// Every check runs before anything is written and all violations are
// collected, so a caller sees every problem with its payload at once.

use chrono::{DateTime, NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;
use validator::{ValidateLength, ValidateUrl};

use crate::models::{CreateEventRequest, EventCategory, EventChanges, UpdateEventRequest};
use crate::utils::FieldViolation;

pub const TITLE_MAX_CHARS: u64 = 200;
pub const DESCRIPTION_MAX_CHARS: u64 = 2000;

/// Descriptive fields of a new event, checked and normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFields {
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub date: NaiveDate,
    pub time: String,
    pub end_time: Option<String>,
    pub location: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub featured: Option<bool>,
    pub max_attendees: Option<i32>,
    pub registration_link: Option<String>,
    pub image_url: Option<String>,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"))
}

pub fn is_email(value: &str) -> bool {
    email_regex().is_match(value)
}

/// A parseable absolute URL with an http or https scheme.
pub fn is_web_url(value: &str) -> bool {
    value.validate_url() && (value.starts_with("http://") || value.starts_with("https://"))
}

/// `H:MM` and `HH:MM` are stored zero-padded so times order correctly as
/// text. Anything else (e.g. "7 PM") is kept verbatim.
pub fn normalize_time(value: &str) -> String {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(|time| time.format("%H:%M").to_string())
        .unwrap_or_else(|_| value.to_string())
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its calendar date is used).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

#[derive(Default)]
struct Checker {
    violations: Vec<FieldViolation>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.violations.push(FieldViolation::new(field, message));
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<FieldViolation>> {
        if self.violations.is_empty() {
            Ok(value)
        } else {
            Err(self.violations)
        }
    }

    /// Trimmed, non-empty, optionally length-capped text.
    fn text(
        &mut self,
        field: &str,
        label: &str,
        value: &str,
        max_chars: Option<u64>,
    ) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.fail(field, format!("{label} is required"));
            return None;
        }
        if let Some(max) = max_chars {
            if !trimmed.validate_length(None, Some(max), None) {
                self.fail(field, format!("{label} must be at most {max} characters"));
                return None;
            }
        }
        Some(trimmed.to_string())
    }

    fn required_text(
        &mut self,
        field: &str,
        label: &str,
        value: Option<&str>,
        max_chars: Option<u64>,
    ) -> Option<String> {
        match value {
            Some(value) => self.text(field, label, value, max_chars),
            None => {
                self.fail(field, format!("{label} is required"));
                None
            }
        }
    }

    fn category(&mut self, value: &str) -> Option<EventCategory> {
        let parsed = value.trim().parse::<EventCategory>().ok();
        if parsed.is_none() {
            let allowed: Vec<&str> = EventCategory::ALL.iter().map(|c| c.as_str()).collect();
            self.fail("category", format!("Category must be one of: {}", allowed.join(", ")));
        }
        parsed
    }

    fn date(&mut self, value: &str) -> Option<NaiveDate> {
        let parsed = parse_date(value);
        if parsed.is_none() {
            self.fail("date", "Valid date is required");
        }
        parsed
    }

    fn email(&mut self, value: &str) -> Option<String> {
        let value = value.trim();
        if is_email(value) {
            Some(value.to_string())
        } else {
            self.fail("contactEmail", "Valid contact email is required");
            None
        }
    }

    fn max_attendees(&mut self, value: i64) -> Option<i32> {
        match i32::try_from(value) {
            Ok(n) if n >= 1 => Some(n),
            _ => {
                self.fail("maxAttendees", "Max attendees must be a positive integer");
                None
            }
        }
    }

    fn url(&mut self, field: &str, value: &str) -> Option<String> {
        let value = value.trim();
        if is_web_url(value) {
            Some(value.to_string())
        } else {
            self.fail(field, "Must be an http(s) URL");
            None
        }
    }
}

/// Blank optional text is treated as absent.
fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn validate_new_event(request: &CreateEventRequest) -> Result<EventFields, Vec<FieldViolation>> {
    let mut check = Checker::default();

    let title = check.required_text("title", "Title", request.title.as_deref(), Some(TITLE_MAX_CHARS));
    let description = check.required_text(
        "description",
        "Description",
        request.description.as_deref(),
        Some(DESCRIPTION_MAX_CHARS),
    );
    let category = match request.category.as_deref() {
        Some(value) => check.category(value),
        None => Some(EventCategory::default()),
    };
    let date = match request.date.as_deref() {
        Some(value) => check.date(value),
        None => {
            check.fail("date", "Valid date is required");
            None
        }
    };
    let time = check
        .required_text("time", "Time", request.time.as_deref(), None)
        .map(|time| normalize_time(&time));
    let location = check.required_text("location", "Location", request.location.as_deref(), None);
    let contact_email = match request.contact_email.as_deref() {
        Some(value) => check.email(value),
        None => {
            check.fail("contactEmail", "Valid contact email is required");
            None
        }
    };
    let max_attendees = request.max_attendees.and_then(|n| check.max_attendees(n));
    let registration_link = optional_text(request.registration_link.as_deref())
        .and_then(|link| check.url("registrationLink", &link));
    let image_url =
        optional_text(request.image_url.as_deref()).and_then(|url| check.url("imageUrl", &url));

    // Every required field is Some once no violation was recorded.
    match (title, description, category, date, time, location, contact_email) {
        (
            Some(title),
            Some(description),
            Some(category),
            Some(date),
            Some(time),
            Some(location),
            Some(contact_email),
        ) => check.finish(EventFields {
            title,
            description,
            category,
            date,
            time,
            end_time: optional_text(request.end_time.as_deref()).map(|t| normalize_time(&t)),
            location,
            contact_email,
            contact_phone: optional_text(request.contact_phone.as_deref()),
            featured: request.featured,
            max_attendees,
            registration_link,
            image_url,
        }),
        _ => Err(check.violations),
    }
}

/// Validates the fields present in an update. Absent fields stay untouched;
/// `null` (or blank text) clears an optional field. `status` is not
/// carried over: status only moves through the status operation.
pub fn validate_changes(request: &UpdateEventRequest) -> Result<EventChanges, Vec<FieldViolation>> {
    let mut check = Checker::default();

    let changes = EventChanges {
        title: request
            .title
            .as_deref()
            .and_then(|v| check.text("title", "Title", v, Some(TITLE_MAX_CHARS))),
        description: request.description.as_deref().and_then(|v| {
            check.text("description", "Description", v, Some(DESCRIPTION_MAX_CHARS))
        }),
        category: request.category.as_deref().and_then(|v| check.category(v)),
        date: request.date.as_deref().and_then(|v| check.date(v)),
        time: request
            .time
            .as_deref()
            .and_then(|v| check.text("time", "Time", v, None))
            .map(|time| normalize_time(&time)),
        end_time: request
            .end_time
            .as_ref()
            .map(|v| optional_text(v.as_deref()).map(|t| normalize_time(&t))),
        location: request
            .location
            .as_deref()
            .and_then(|v| check.text("location", "Location", v, None)),
        contact_email: request.contact_email.as_deref().and_then(|v| check.email(v)),
        contact_phone: request
            .contact_phone
            .as_ref()
            .map(|v| optional_text(v.as_deref())),
        status: None,
        featured: request.featured,
        max_attendees: request.max_attendees.map(|v| match v {
            Some(n) => check.max_attendees(n),
            None => None,
        }),
        registration_link: request.registration_link.as_ref().map(|v| {
            optional_text(v.as_deref()).and_then(|link| check.url("registrationLink", &link))
        }),
        image_url: request
            .image_url
            .as_ref()
            .map(|v| optional_text(v.as_deref()).and_then(|url| check.url("imageUrl", &url))),
    };

    check.finish(changes)
}
