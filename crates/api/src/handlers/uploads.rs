//! Inspiration image uploads.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{CurrentIdentity, MaybeIdentity};
use crate::response::OkResponse;
use crate::services::object_storage::UploadObject;
use crate::state::AppState;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub url: String,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Pull the `file` field out of a multipart body and check it is an image
/// within the configured size limit.
pub(crate) async fn read_image(
    state: &AppState,
    caller: Option<&CurrentIdentity>,
    mut multipart: Multipart,
) -> AppResult<UploadObject> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(UploadObject::inspiration(
            caller.map(|c| c.identity.id),
            file_name.as_deref(),
            &content_type,
            bytes.to_vec(),
            state.config.upload_max_bytes,
        )?);
    }
    Err(AppError::BadRequest(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

/// POST /api/uploads/inspiration
///
/// Store one image in the inspiration bucket and return its public URL.
pub async fn upload_inspiration(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    multipart: Multipart,
) -> AppResult<Json<OkResponse<UploadedImage>>> {
    let object = read_image(&state, caller.as_ref(), multipart).await?;
    let bytes = object.bytes.len();
    let url = state.storage.upload(caller.as_ref(), object).await?;

    tracing::info!(
        couple_id = ?caller.as_ref().map(|c| c.identity.id),
        bytes,
        "Inspiration image uploaded",
    );

    Ok(Json(OkResponse::new(UploadedImage { url })))
}
