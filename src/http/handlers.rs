use axum::extract::{Multipart, Path, State};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;

use crate::app::crawler::RequesterClass;
use crate::app::images::{ImageService, UploadError};
use crate::app::preview;
use crate::domain::image::ImageRecord;
use crate::http::AppError;
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.store.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse { status })
}

fn image_service(state: &AppState) -> ImageService {
    ImageService::new(
        state.store.clone(),
        state.storage.clone(),
        state.base_url.clone(),
        state.upload_max_bytes,
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub short_id: String,
    pub short_url: String,
    pub image_url: String,
    pub file_name: String,
    pub file_size: usize,
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(String, String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("malformed multipart body"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("failed to read file"))?;
        file = Some((file_name, content_type, data));
    }

    let Some((file_name, content_type, data)) = file else {
        return Err(AppError::bad_request("No file provided"));
    };

    tracing::info!(
        file_name = %file_name,
        content_type = %content_type,
        size = data.len(),
        "upload received"
    );

    let receipt = image_service(&state)
        .upload(file_name, content_type, data)
        .await
        .map_err(|err| match err {
            UploadError::Validation(message) => AppError::bad_request(message),
            UploadError::ShortIdCollision => {
                tracing::error!("short id collision on insert");
                AppError::internal_with_detail(
                    "Upload failed",
                    "short id collision, retry the upload",
                )
            }
            UploadError::Storage(err) => {
                tracing::error!(error = ?err, "storage backend write failed");
                AppError::internal_with_detail("Upload failed", err.to_string())
            }
            UploadError::Store(err) => {
                tracing::error!(error = ?err, "record insert failed");
                AppError::internal_with_detail("Upload failed", err.to_string())
            }
        })?;

    Ok(Json(UploadResponse {
        success: true,
        short_id: receipt.short_id,
        short_url: receipt.short_url,
        image_url: receipt.image_url,
        file_name: receipt.file_name,
        file_size: receipt.file_size,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListEntry {
    #[serde(flatten)]
    record: ImageRecord,
    /// Recomputed from the configured base URL, never persisted.
    short_url: String,
}

pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageListEntry>>, AppError> {
    let service = image_service(&state);
    let records = service.list().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list images");
        AppError::internal_with_detail("Failed to list images", err.to_string())
    })?;

    let entries = records
        .into_iter()
        .map(|record| ImageListEntry {
            short_url: record.short_url(service.base_url()),
            record,
        })
        .collect();

    Ok(Json(entries))
}

/// Short-link redirect API: 302 to the image, 404 when absent, 500 on a
/// store fault.
pub async fn redirect_short(
    State(state): State<AppState>,
    Path(short_id): Path<String>,
) -> Result<Redirect, AppError> {
    let record = image_service(&state)
        .resolve(&short_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, short_id = %short_id, "record store fault during resolve");
            AppError::internal("Internal server error")
        })?
        .ok_or_else(|| AppError::not_found("Image not found"))?;

    Ok(Redirect::temporary(&record.image_url))
}

/// Viewer page: crawlers get the metadata-bearing HTML shell, humans get a
/// protocol-level redirect straight to the image. Unknown ids render a
/// not-found page with HTTP 200; the absence is in the content, not the
/// status. A store fault renders the same page but is logged as an
/// infrastructure failure, not as a miss.
pub async fn view_page(
    State(state): State<AppState>,
    Path(short_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let record = match image_service(&state).resolve(&short_id).await {
        Ok(record) => record,
        Err(err) => {
            tracing::error!(error = ?err, short_id = %short_id, "record store fault while rendering viewer page");
            None
        }
    };

    match record {
        Some(record) => match state.crawlers.classify(user_agent) {
            RequesterClass::Human => Redirect::temporary(&record.image_url).into_response(),
            RequesterClass::Crawler => {
                let meta = preview::for_record(&record, &state.base_url, state.storage.as_ref());
                Html(preview::render_page(&meta, Some(&record))).into_response()
            }
        },
        None => {
            let meta = preview::not_found(&short_id, &state.base_url);
            Html(preview::render_page(&meta, None)).into_response()
        }
    }
}
