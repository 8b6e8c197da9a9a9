use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use wedflex_core::error::CoreError;
use wedflex_core::service_request::SchemaErrors;

use crate::services::identity::IdentityError;
use crate::services::object_storage::StorageError;
use crate::services::offer_store::StoreError;

/// Message on every schema failure from `POST /api/requests`.
pub const VALIDATION_FAILED: &str = "Validation failed";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent
/// `{ "ok": false, "error": ..., "code": ... }` responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `wedflex_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Per-field request schema failures.
    #[error("Validation failed")]
    Schema(SchemaErrors),

    /// The action needs a session; the client should go to `redirect_to`.
    #[error("Sign-in required: {message}")]
    SignInRequired { message: String, redirect_to: String },

    /// A collaborator refused or failed; its message is shown as-is.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(msg) => AppError::Core(CoreError::Unauthorized(msg)),
            IdentityError::Upstream(msg) => AppError::Upstream(msg),
            IdentityError::Database(e) => AppError::Database(e),
            IdentityError::Mail(e) => {
                tracing::error!(error = %e, "Sign-in email delivery failed");
                AppError::Upstream("Could not send the sign-in email. Please try again.".into())
            }
            IdentityError::Internal(msg) => AppError::InternalError(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(sqlx::Error::RowNotFound) => {
                AppError::Database(sqlx::Error::RowNotFound)
            }
            // Offer store failures reach the couple as the database reports them.
            StoreError::Database(e) => AppError::Upstream(match e.as_database_error() {
                Some(db_err) => db_err.message().to_string(),
                None => e.to_string(),
            }),
            StoreError::Remote(msg) => AppError::Upstream(msg),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::NotAnImage(_) => AppError::BadRequest(message),
            StorageError::TooLarge { .. } => AppError::PayloadTooLarge(message),
            StorageError::Remote(msg) => AppError::Upstream(msg),
            StorageError::Io(e) => AppError::InternalError(format!("Failed to store upload: {e}")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut extra: Option<(&'static str, Value)> = None;

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::Schema(errors) => {
                extra = Some((
                    "details",
                    serde_json::to_value(errors).unwrap_or(Value::Null),
                ));
                (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    VALIDATION_FAILED.to_string(),
                )
            }
            AppError::SignInRequired {
                message,
                redirect_to,
            } => {
                extra = Some(("redirect_to", Value::String(redirect_to.clone())));
                (StatusCode::UNAUTHORIZED, "SIGN_IN_REQUIRED", message.clone())
            }
            AppError::Upstream(msg) => {
                tracing::warn!(error = %msg, "Collaborator call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_ERROR",
                    msg.clone(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut body = json!({
            "ok": false,
            "error": message,
            "code": code,
        });
        if let (Some((key, value)), Some(obj)) = (extra, body.as_object_mut()) {
            obj.insert(key.to_string(), value);
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn schema_errors_carry_field_details() {
        let mut errors = SchemaErrors::default();
        errors.field("title", "Required");
        let (status, body) = render(AppError::Schema(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], VALIDATION_FAILED);
        assert_eq!(body["details"]["fieldErrors"]["title"][0], "Required");
        assert!(body["details"]["formErrors"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upstream_message_is_verbatim() {
        let (status, body) =
            render(AppError::Upstream("new row violates row-level security".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "new row violates row-level security");
    }

    #[tokio::test]
    async fn offer_store_database_failures_are_shown_as_reported() {
        let err = StoreError::Database(sqlx::Error::PoolTimedOut);
        let expected = sqlx::Error::PoolTimedOut.to_string();

        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "UPSTREAM_ERROR");
        assert_eq!(body["error"], expected);

        let (_, body) = render(StoreError::Database(sqlx::Error::Protocol("connection lost".into())).into())
            .await;
        assert!(body["error"].as_str().unwrap().contains("connection lost"));
    }

    #[tokio::test]
    async fn identity_database_failures_stay_sanitized() {
        let err = IdentityError::Database(sqlx::Error::PoolTimedOut);
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn sign_in_required_includes_redirect() {
        let (status, body) = render(AppError::SignInRequired {
            message: "not authenticated".into(),
            redirect_to: "/auth/signin?role=couple&next=%2Fpost-offer".into(),
        })
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "SIGN_IN_REQUIRED");
        assert_eq!(
            body["redirect_to"],
            "/auth/signin?role=couple&next=%2Fpost-offer"
        );
    }

    #[tokio::test]
    async fn internal_errors_are_sanitized() {
        let (status, body) = render(AppError::InternalError("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }
}
