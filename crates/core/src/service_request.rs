//! Request schema for `POST /api/requests`.
//!
//! Parsing happens in three passes, collecting every problem instead of
//! stopping at the first one:
//!
//! 1. a JSON shape pass (is each known key of the right JSON type?),
//! 2. `serde` deserialization into [`ServiceRequestBody`],
//! 3. `validator` rules on the trimmed body.
//!
//! Failures are reported as [`SchemaErrors`], keyed by field name.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::catalog::{is_known_category, is_known_city};
use crate::error::CoreError;
use crate::normalize::{
    event_schedule, images_for_payload, offer_cents_from_api, optional_text, CentsInput,
    DATE_FORMAT,
};
use crate::offer::NormalizedOffer;
use crate::types::EntityId;

/// Accepted `event_at` layouts (local wall clock, no offset).
const EVENT_AT_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Per-field schema failures, serialized as `{formErrors, fieldErrors}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaErrors {
    /// Problems not attributable to one field.
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl SchemaErrors {
    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    pub fn field(&mut self, name: &str, message: impl Into<String>) {
        self.field_errors
            .entry(name.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn form(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
    }

    fn merge_validation(&mut self, errors: &ValidationErrors) {
        for (field, list) in errors.field_errors() {
            for error in list.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {field}"));
                self.field(&field, message);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// JSON shape pass
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Shape {
    Text,
    Bool,
    Integer,
    TextOrNumber,
    TextList,
}

/// `(key, shape, required)` for every key the body understands.
const FIELDS: &[(&str, Shape, bool)] = &[
    ("title", Shape::Text, true),
    ("category", Shape::Text, true),
    ("location", Shape::Text, true),
    ("offer_cents", Shape::TextOrNumber, false),
    ("description", Shape::Text, false),
    ("details", Shape::Text, false),
    ("accepted_terms", Shape::Bool, false),
    ("inspiration_images", Shape::TextList, false),
    ("inspiration_link", Shape::Text, false),
    ("service_date", Shape::Text, false),
    ("event_at", Shape::Text, false),
    ("guest_count", Shape::Integer, false),
    ("request_id", Shape::Text, false),
];

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn shape_error(shape: Shape, value: &Value) -> Option<String> {
    let ok = match shape {
        Shape::Text => value.is_string(),
        Shape::Bool => value.is_boolean(),
        Shape::Integer => value.is_i64() || value.is_u64(),
        Shape::TextOrNumber => value.is_string() || value.is_number(),
        Shape::TextList => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
    };
    if ok {
        return None;
    }
    let expected = match shape {
        Shape::Text => "string",
        Shape::Bool => "boolean",
        Shape::Integer => "integer",
        Shape::TextOrNumber => "string or number",
        Shape::TextList => "array of strings",
    };
    Some(format!("Expected {expected}, received {}", json_kind(value)))
}

fn check_shape(body: &Value) -> SchemaErrors {
    let mut errors = SchemaErrors::default();
    let Some(object) = body.as_object() else {
        errors.form(format!("Expected object, received {}", json_kind(body)));
        return errors;
    };
    for &(key, shape, required) in FIELDS {
        match object.get(key) {
            None | Some(Value::Null) if required => errors.field(key, "Required"),
            None | Some(Value::Null) => {}
            Some(value) => {
                if let Some(message) = shape_error(shape, value) {
                    errors.field(key, message);
                }
            }
        }
    }
    errors
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// A well-typed `POST /api/requests` body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct ServiceRequestBody {
    #[validate(length(min = 1, message = "Title required"))]
    pub title: String,

    #[validate(
        length(min = 1, message = "Category required"),
        custom(function = "validate_category")
    )]
    pub category: String,

    #[validate(
        length(min = 1, message = "City is required"),
        custom(function = "validate_city")
    )]
    pub location: String,

    #[serde(default)]
    pub offer_cents: Option<CentsInput>,

    #[serde(default)]
    pub description: Option<String>,

    /// Accepted as an alternative to `description`.
    #[serde(default)]
    pub details: Option<String>,

    #[serde(default)]
    pub accepted_terms: Option<bool>,

    #[serde(default)]
    #[validate(custom(function = "validate_images"))]
    pub inspiration_images: Option<Vec<String>>,

    #[serde(default)]
    #[validate(url(message = "Invalid url"))]
    pub inspiration_link: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_service_date"))]
    pub service_date: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_event_at"))]
    pub event_at: Option<String>,

    #[serde(default)]
    #[validate(range(min = 1, message = "Guest count must be greater than 0"))]
    pub guest_count: Option<i64>,

    /// Client-generated idempotency key.
    #[serde(default)]
    #[validate(custom(function = "validate_request_id"))]
    pub request_id: Option<String>,
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn validate_category(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || is_known_category(value) {
        Ok(())
    } else {
        Err(invalid("catalog", "Unknown category"))
    }
}

fn validate_city(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || is_known_city(value) {
        Ok(())
    } else {
        Err(invalid("catalog", "Unknown city"))
    }
}

fn validate_images(images: &[String]) -> Result<(), ValidationError> {
    if images.iter().all(|img| url::Url::parse(img).is_ok()) {
        Ok(())
    } else {
        Err(invalid("url", "Every inspiration image must be a URL"))
    }
}

fn validate_service_date(value: &str) -> Result<(), ValidationError> {
    parse_service_date(value)
        .map(|_| ())
        .ok_or_else(|| invalid("date", "Invalid date (expected yyyy-mm-dd)"))
}

fn validate_event_at(value: &str) -> Result<(), ValidationError> {
    parse_event_at(value)
        .map(|_| ())
        .ok_or_else(|| invalid("datetime", "Invalid date-time (expected yyyy-mm-ddThh:mm)"))
}

fn validate_request_id(value: &str) -> Result<(), ValidationError> {
    EntityId::parse_str(value)
        .map(|_| ())
        .map_err(|_| invalid("uuid", "Invalid uuid"))
}

fn parse_service_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn parse_event_at(value: &str) -> Option<NaiveDateTime> {
    EVENT_AT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn trim_option(value: &mut Option<String>) {
    if let Some(inner) = value.take() {
        *value = optional_text(&inner);
    }
}

impl ServiceRequestBody {
    /// Trim every text field; blank optional text becomes `None`.
    pub fn trimmed(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.category = self.category.trim().to_string();
        self.location = self.location.trim().to_string();
        for field in [
            &mut self.description,
            &mut self.details,
            &mut self.inspiration_link,
            &mut self.service_date,
            &mut self.event_at,
            &mut self.request_id,
        ] {
            trim_option(field);
        }
        self
    }

    /// Convert a validated body into the persisted offer shape.
    ///
    /// A bare `service_date` is scheduled at noon; a bare `event_at` supplies
    /// its own date.
    pub fn into_offer(self) -> Result<NormalizedOffer, CoreError> {
        let event_at = match self.event_at.as_deref() {
            Some(raw) => Some(parse_event_at(raw).ok_or_else(|| {
                CoreError::Validation(format!("'{raw}' is not a valid date-time"))
            })?),
            None => None,
        };
        let schedule = event_schedule(self.service_date.as_deref().unwrap_or_default(), "")?;
        let service_date = schedule
            .service_date
            .or_else(|| event_at.map(|at| at.date()));
        let event_at = event_at.or(schedule.event_at);

        let client_request_id = match self.request_id.as_deref() {
            Some(raw) => Some(
                EntityId::parse_str(raw)
                    .map_err(|e| CoreError::Validation(format!("Invalid request_id: {e}")))?,
            ),
            None => None,
        };

        Ok(NormalizedOffer {
            title: self.title,
            category: self.category,
            location: self.location,
            service_date,
            event_at,
            guest_count: self.guest_count.and_then(|n| i32::try_from(n).ok()),
            details: self.description.or(self.details),
            inspiration_link: self.inspiration_link,
            inspiration_images: self
                .inspiration_images
                .as_deref()
                .and_then(images_for_payload),
            offer_cents: self.offer_cents.as_ref().and_then(offer_cents_from_api),
            accepted_terms: self.accepted_terms.unwrap_or(false),
            client_request_id,
        })
    }
}

/// Parse and validate a raw JSON body.
pub fn parse_service_request(body: Value) -> Result<ServiceRequestBody, SchemaErrors> {
    let mut errors = check_shape(&body);
    if !errors.is_empty() {
        return Err(errors);
    }

    let parsed: ServiceRequestBody = match serde_json::from_value(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            errors.form(e.to_string());
            return Err(errors);
        }
    };

    let parsed = parsed.trimmed();
    if let Err(validation) = parsed.validate() {
        errors.merge_validation(&validation);
        return Err(errors);
    }
    Ok(parsed)
}
