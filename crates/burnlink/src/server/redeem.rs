//! `GET /qr/{token}`: the one-time redemption endpoint.

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use burnlink_core::{RedeemResult, TokenId};

use super::{pages, AppState};

/// Redemption handler.
///
/// # Response
///
/// - 302 Found to the payload when it is an HTTP(S) URL
/// - 200 OK page showing the payload otherwise
/// - 404 Not Found for malformed or unknown tokens
/// - 410 Gone for tokens already redeemed
/// - 503 Service Unavailable when the store cannot be reached
///
/// Every response is marked `no-store` so no cache can replay a redemption.
pub async fn redeem_handler(
    State(app_state): State<AppState>,
    Path(raw): Path<String>,
) -> Response {
    let mut response = redeem(&app_state, &raw).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

async fn redeem(app_state: &AppState, raw: &str) -> Response {
    let Ok(token) = raw.parse::<TokenId>() else {
        tracing::debug!("Malformed token in path");
        return not_found();
    };

    match app_state.engine().redeem(&token).await {
        Ok(RedeemResult::Redirect(url)) => match HeaderValue::from_str(&url) {
            Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Err(_) => {
                // Already consumed, so show it rather than lose it
                tracing::warn!(
                    token = %token.fingerprint(),
                    "Payload URL is not a valid Location header"
                );
                Html(pages::revealed(&url)).into_response()
            }
        },
        Ok(RedeemResult::Reveal(text)) => Html(pages::revealed(&text)).into_response(),
        Ok(RedeemResult::Invalid) => not_found(),
        Ok(RedeemResult::Expired) => (
            StatusCode::GONE,
            Html(pages::message(
                "This code has already been used and is no longer valid.",
            )),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(token = %token.fingerprint(), "Redemption failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Html(pages::message(
                    "The service is temporarily unavailable. Please try again shortly.",
                )),
            )
                .into_response()
        }
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(pages::message("This link does not exist.")),
    )
        .into_response()
}
