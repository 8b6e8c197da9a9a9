//! Pure conversions from user-entered strings to persisted values.
//!
//! Every function here is deterministic and side-effect free. The wizard runs
//! them once, at submission; the API route runs the subset that applies to its
//! body shape.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Date format accepted for the event date (`yyyy-mm-dd`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Hour used when an event date is given without a start time.
const DEFAULT_EVENT_HOUR: u32 = 12;

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Convert a free-form dollar amount (`"$1,250.50"`) into integer cents.
///
/// Everything except digits and `.` is stripped before parsing. Empty or
/// unparsable input (e.g. `"1.2.3"`) yields `None`; the result is rounded to
/// the nearest cent and never negative.
pub fn offer_cents_from_dollars(input: &str) -> Option<i64> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let dollars: f64 = cleaned.parse().ok()?;
    clamp_cents((dollars * 100.0).round())
}

/// An `offer_cents` value as it may arrive in an API body: a JSON number or a
/// numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CentsInput {
    Number(f64),
    Text(String),
}

/// Normalize an API-supplied cents value.
///
/// Finite values are floored and clamped at zero. Blank strings, unparsable
/// strings and non-finite numbers yield `None`.
pub fn offer_cents_from_api(input: &CentsInput) -> Option<i64> {
    let value = match input {
        CentsInput::Number(n) => *n,
        CentsInput::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
    };
    clamp_cents(value.floor())
}

fn clamp_cents(value: f64) -> Option<i64> {
    if !value.is_finite() || value >= i64::MAX as f64 {
        return None;
    }
    Some(value.max(0.0) as i64)
}

// ---------------------------------------------------------------------------
// Guest count
// ---------------------------------------------------------------------------

/// Extract the guest count from input such as `"120 guests"`.
///
/// Non-digits are stripped; empty input, a negative count (leading `-`) or a
/// count that does not fit an `i32` yields `None`.
pub fn guest_count(input: &str) -> Option<i32> {
    if input.trim_start().starts_with('-') {
        return None;
    }
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

// ---------------------------------------------------------------------------
// Date / time
// ---------------------------------------------------------------------------

/// The two persisted forms of the event date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventSchedule {
    /// The bare date, always retained when a date was entered.
    pub service_date: Option<NaiveDate>,
    /// Date combined with the start time (noon when no time was entered).
    pub event_at: Option<NaiveDateTime>,
}

/// Combine an event date (`yyyy-mm-dd`) and optional start time (`hh:mm`).
///
/// An empty date produces an empty schedule regardless of the time. A
/// malformed date or time is a validation error.
pub fn event_schedule(date: &str, time: &str) -> Result<EventSchedule, CoreError> {
    let date = date.trim();
    if date.is_empty() {
        return Ok(EventSchedule::default());
    }

    let service_date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| {
        CoreError::Validation(format!("'{date}' is not a valid date (expected yyyy-mm-dd)"))
    })?;

    let time = time.trim();
    let start = if time.is_empty() {
        NaiveTime::from_hms_opt(DEFAULT_EVENT_HOUR, 0, 0).unwrap_or_default()
    } else {
        parse_start_time(time)?
    };

    Ok(EventSchedule {
        service_date: Some(service_date),
        event_at: Some(service_date.and_time(start)),
    })
}

fn parse_start_time(time: &str) -> Result<NaiveTime, CoreError> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .map_err(|_| CoreError::Validation(format!("'{time}' is not a valid time (expected hh:mm)")))
}

// ---------------------------------------------------------------------------
// Text and images
// ---------------------------------------------------------------------------

/// Trim optional free text; blank input becomes `None`.
pub fn optional_text(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Put a freshly uploaded image URL at the front of the list.
pub fn prepend_image(images: &mut Vec<String>, url: String) {
    images.insert(0, url);
}

/// The persisted form of the image list: omitted entirely when empty.
pub fn images_for_payload(images: &[String]) -> Option<Vec<String>> {
    (!images.is_empty()).then(|| images.to_vec())
}
