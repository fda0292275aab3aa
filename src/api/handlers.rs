use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    engine::{self, AugmentMode, Upload, MAX_RANDOM_AUGMENTATIONS},
    error::ErrorType,
    storage::MediaName,
};

use super::AppState;

pub const UPLOAD_FIELD: &str = "image";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub augmented: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub random: Option<String>,
}

impl UploadQuery {
    fn mode(&self) -> Result<AugmentMode, ErrorType> {
        let Some(raw) = &self.random else {
            return Ok(AugmentMode::Full);
        };

        match raw.parse::<usize>() {
            Ok(n) if (1..=MAX_RANDOM_AUGMENTATIONS).contains(&n) => Ok(AugmentMode::Random(n)),
            _ => Err(ErrorType::InvalidRequest(format!(
                "random must be between 1 and {}, got {:?}",
                MAX_RANDOM_AUGMENTATIONS, raw
            ))),
        }
    }
}

pub async fn hello() -> Json<serde_json::Value> {
    Json(json!({ "message": "Hello from imgaugment!" }))
}

/// Pulls the `image` field out of the form. Other fields are skipped.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ErrorType> {
    fn multipart_error(e: axum::extract::multipart::MultipartError) -> ErrorType {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ErrorType::TooLarge
        } else {
            ErrorType::InvalidRequest(e.body_text())
        }
    }

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("image").to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        if bytes.is_empty() {
            return Err(ErrorType::MissingImage);
        }

        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(ErrorType::MissingImage)
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ErrorType> {
    let mode = query.mode()?;
    let multipart = multipart.map_err(|_| ErrorType::MissingImage)?;
    let upload = read_upload(multipart).await?;

    info!(
        "Received upload {:?} ({} bytes, {:?})",
        upload.filename,
        upload.bytes.len(),
        mode
    );

    let outcome = engine::run_blocking(
        state.store.clone(),
        state.params.clone(),
        upload,
        mode,
        state.rngs.next_rng(),
    )
    .await?;

    Ok(Json(UploadResponse {
        message: "Image uploaded and augmented successfully!".into(),
        augmented: outcome
            .derived_names()
            .map(|name| state.store.url(name))
            .collect(),
    }))
}

fn content_type(name: &MediaName) -> &'static str {
    image::ImageFormat::from_path(name.as_str())
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Serves a stored file as an attachment.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ErrorType> {
    let name = MediaName::parse(&filename)?;
    let bytes = state.store.read(&name).await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type(&name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Serves a stored file inline, for the urls returned by `upload`.
pub async fn media(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ErrorType> {
    let name = MediaName::parse(&filename)?;
    let bytes = state.store.read(&name).await?;

    Ok(([(header::CONTENT_TYPE, content_type(&name))], bytes).into_response())
}
