//! Shared response envelope for API handlers.
//!
//! Every success body is a flat JSON object with `"ok": true` alongside the
//! payload fields. Use [`OkResponse`] instead of ad-hoc
//! `serde_json::json!({ "ok": true, ... })`.

use serde::Serialize;

/// Standard `{ "ok": true, ...T }` response envelope.
///
/// `T` must serialize to a JSON object; its fields are flattened next to
/// `ok`.
///
/// # Example
///
/// ```ignore
/// Ok(Json(OkResponse::new(CreatedOffer { id })))
/// ```
#[derive(Debug, Serialize)]
pub struct OkResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> OkResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

/// Payload for responses that carry nothing but `"ok": true`.
#[derive(Debug, Serialize)]
pub struct Empty {}

impl OkResponse<Empty> {
    pub fn empty() -> Self {
        Self::new(Empty {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Created {
        id: &'static str,
    }

    #[test]
    fn payload_fields_sit_next_to_ok() {
        let json = serde_json::to_value(OkResponse::new(Created { id: "abc" })).unwrap();
        assert_eq!(json, serde_json::json!({ "ok": true, "id": "abc" }));
    }

    #[test]
    fn empty_is_just_ok() {
        let json = serde_json::to_value(OkResponse::empty()).unwrap();
        assert_eq!(json, serde_json::json!({ "ok": true }));
    }
}
