//! `GET /` and `POST /`: the upload form and issuance.

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use burnlink_core::{CodecError, IssueError, UploadError};

use super::{pages, AppState};

/// Multipart field carrying the image.
const FILE_FIELD: &str = "qrfile";

/// Render the empty upload form.
pub async fn form_handler() -> Html<String> {
    Html(pages::index(None))
}

/// Accept an uploaded QR image and mint a one-time link for its content.
///
/// User mistakes re-render the form with a 4xx status; only infrastructure
/// failures produce 5xx.
pub async fn upload_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(FILE_FIELD) => {
                let filename = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned);
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, bytes)),
                    Err(e) => return form_error(e.status(), &e.body_text()),
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => return form_error(e.status(), &e.body_text()),
        }
    }

    let Some((filename, bytes)) = upload else {
        return form_error(StatusCode::BAD_REQUEST, "No file selected.");
    };

    if let Err(e) = app_state.validator().validate(filename.as_deref(), &bytes) {
        let status = match e {
            UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Empty | UploadError::UnsupportedType { .. } => StatusCode::BAD_REQUEST,
        };
        let message = match e {
            UploadError::Empty => "No file selected.".to_string(),
            UploadError::UnsupportedType { .. } => {
                "Unsupported file type (PNG or JPG only).".to_string()
            }
            other => format!("{other}."),
        };
        return form_error(status, &message);
    }

    let base_url = app_state.base_url(&headers);
    match app_state.engine().issue(bytes.to_vec(), &base_url).await {
        Ok(issued) => Html(pages::issued(&issued)).into_response(),
        Err(IssueError::NoPayloadFound) => form_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "No valid QR code found in the image. Make sure the image is clear.",
        ),
        Err(IssueError::Codec(CodecError::Timeout { .. })) => form_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "The image took too long to read. Try a smaller or sharper image.",
        ),
        Err(IssueError::Store(e)) if e.is_unavailable() => {
            tracing::error!("Issuance failed: {e}");
            form_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "The service is temporarily unavailable. Please try again shortly.",
            )
        }
        Err(e) => {
            tracing::error!("Issuance failed: {e}");
            form_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong creating your link. Please try again.",
            )
        }
    }
}

fn form_error(status: StatusCode, message: &str) -> Response {
    (status, Html(pages::index(Some(message)))).into_response()
}
