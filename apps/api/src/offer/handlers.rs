//! Axum route handlers for the offer letter form and downloads.

use std::collections::BTreeMap;
use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::errors::AppError;
use crate::models::submission::Submission;
use crate::offer::form::render_form;
use crate::offer::generator::generate_offer_letter;
use crate::state::AppState;

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// GET /
pub async fn handle_form() -> Html<String> {
    Html(render_form())
}

/// POST /
///
/// Generates the offer letter and redirects (302) to its download URL.
pub async fn handle_submit(
    State(state): State<AppState>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Result<Response, AppError> {
    let offer = generate_offer_letter(&state, Submission::new(fields)).await?;
    info!(
        "Offer letter ready at {} ({:?}, record {})",
        offer.path.display(),
        offer.template,
        offer.record.unique_id
    );

    let location = HeaderValue::from_str(&download_path(&offer.file_name))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid redirect location: {e}")))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// GET /download/:file_name
///
/// Streams a generated document from the output directory as an attachment.
pub async fn handle_download(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    if !is_plain_file_name(&file_name) {
        return Err(AppError::Validation("Invalid file name.".to_string()));
    }

    let path = state.config.output_dir.join(&file_name);
    let not_found = || AppError::NotFound("File not found".to_string());
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(AppError::Internal(e.into())),
    };
    let meta = file
        .metadata()
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    if !meta.is_file() {
        return Err(not_found());
    }

    let disposition = HeaderValue::from_str(&content_disposition(&file_name))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid content disposition: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(DOCX_MIME)),
            (header::CONTENT_LENGTH, HeaderValue::from(meta.len())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

pub fn download_path(file_name: &str) -> String {
    format!("/download/{}", percent_encode(file_name))
}

/// A single, non-hidden path component.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && std::path::Path::new(name).components().count() == 1
}

fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        percent_encode(file_name)
    )
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
