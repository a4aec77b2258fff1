//! HTTP transport for burnlink.
//!
//! Renders the redemption engine's outcomes as HTML. The engine (and the
//! store handle inside it) is created once at startup and shared by every
//! request through [`AppState`].
//!
//! # Endpoints
//!
//! - `GET /` - Upload form
//! - `POST /` - Multipart upload (`qrfile`), returns the one-time link page
//! - `GET /qr/{token}` - Redeem a token (redirect, reveal, 404 or 410)
//! - `GET /health` - Returns 200 if server is running

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderMap};
use burnlink_core::{RedemptionEngine, UploadValidator};
use std::sync::Arc;

pub mod health;
pub mod pages;
pub mod redeem;
pub mod upload;

pub use health::health_handler;
pub use redeem::redeem_handler;
pub use upload::{form_handler, upload_handler};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    engine: RedemptionEngine,
    validator: UploadValidator,

    /// Fixed base for redemption links. When `None`, built from the request.
    public_base_url: Option<String>,
}

impl AppState {
    /// Creates a new `AppState`.
    pub fn new(
        engine: RedemptionEngine,
        validator: UploadValidator,
        public_base_url: Option<String>,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                engine,
                validator,
                public_base_url,
            }),
        }
    }

    /// Returns the redemption engine.
    pub fn engine(&self) -> &RedemptionEngine {
        &self.inner.engine
    }

    /// Returns the upload validator.
    pub fn validator(&self) -> &UploadValidator {
        &self.inner.validator
    }

    /// Base URL for links minted during this request.
    ///
    /// Uses the configured public URL when set, otherwise the request's
    /// `Host` (and `X-Forwarded-Proto`, behind a proxy).
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.inner.public_base_url {
            return base.clone();
        }
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .filter(|v| matches!(*v, "http" | "https"))
            .unwrap_or("http");
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        format!("{scheme}://{host}")
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    let body_limit =
        (app_state.validator().max_bytes() as usize).saturating_add(MULTIPART_OVERHEAD);

    axum::Router::new()
        .route("/", get(form_handler).post(upload_handler))
        .route("/qr/{token}", get(redeem_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use burnlink_core::config::{LimitsConfig, UploadConfig};
    use burnlink_core::{
        ConsumeResult, MemoryTokenStore, PayloadCodec, QrCodec, StoreError, StoreResult,
        StoreStats, TokenId, TokenRecord, TokenStore,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "burnlink-test-boundary";

    /// Store whose medium is down.
    struct OfflineStore;

    #[async_trait]
    impl TokenStore for OfflineStore {
        async fn create(&self, _payload: &str) -> StoreResult<TokenId> {
            Err(offline())
        }
        async fn consume_if_unused(&self, _id: &TokenId) -> StoreResult<ConsumeResult> {
            Err(offline())
        }
        async fn lookup(&self, _id: &TokenId) -> StoreResult<Option<TokenRecord>> {
            Err(offline())
        }
        async fn stats(&self) -> StoreResult<StoreStats> {
            Err(offline())
        }
    }

    fn offline() -> StoreError {
        StoreError::Unavailable {
            operation: "test",
            message: "disk unplugged".to_string(),
        }
    }

    fn app_with_store(store: Arc<dyn TokenStore>) -> axum::Router {
        let limits = LimitsConfig::default();
        let engine =
            RedemptionEngine::new(store, Arc::new(QrCodec::new(&limits)), limits.clone());
        let validator = UploadValidator::new(&limits, &UploadConfig::default());
        build_router(AppState::new(engine, validator, None))
    }

    fn qr_png(payload: &str) -> Vec<u8> {
        QrCodec::new(&LimitsConfig::default()).encode(payload).unwrap()
    }

    fn blank_png() -> Vec<u8> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        image::DynamicImage::new_luma8(120, 120)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"qrfile\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/")
            .header("host", "qr.test")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Pull the token out of the issued page's redemption link.
    fn token_from_page(page: &str) -> String {
        let start = page.find("http://qr.test/qr/").unwrap() + "http://qr.test/qr/".len();
        page[start..start + 32].to_string()
    }

    #[tokio::test]
    async fn health_returns_200() {
        let app = app_with_store(Arc::new(MemoryTokenStore::new()));
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn index_renders_upload_form() {
        let app = app_with_store(Arc::new(MemoryTokenStore::new()));
        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("name=\"qrfile\""));
    }

    #[tokio::test]
    async fn upload_then_reveal_once() {
        let app = app_with_store(Arc::new(MemoryTokenStore::new()));

        let response = app
            .clone()
            .oneshot(upload_request("code.png", &qr_png("hello <world>")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("hello &lt;world&gt;"));
        assert!(page.contains("data:image/png;base64,"));
        let token = token_from_page(&page);

        let response = app
            .clone()
            .oneshot(get(&format!("/qr/{token}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        assert!(body_text(response).await.contains("hello &lt;world&gt;"));

        let response = app.oneshot(get(&format!("/qr/{token}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
        assert!(body_text(response).await.contains("already been used"));
    }

    #[tokio::test]
    async fn upload_then_redirect_once() {
        let app = app_with_store(Arc::new(MemoryTokenStore::new()));

        let response = app
            .clone()
            .oneshot(upload_request("code.png", &qr_png("https://example.com/x")))
            .await
            .unwrap();
        let token = token_from_page(&body_text(response).await);

        let response = app
            .clone()
            .oneshot(get(&format!("/qr/{token}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://example.com/x"
        );

        let response = app.oneshot(get(&format!("/qr/{token}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn unknown_and_malformed_tokens_are_404() {
        let app = app_with_store(Arc::new(MemoryTokenStore::new()));

        let response = app
            .clone()
            .oneshot(get("/qr/0123456789abcdef0123456789abcdef"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("does not exist"));

        let response = app.oneshot(get("/qr/not-a-token")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreadable_image_creates_no_token() {
        let store = Arc::new(MemoryTokenStore::new());
        let app = app_with_store(store.clone());

        let response = app
            .oneshot(upload_request("blank.png", &blank_png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("No valid QR code"));
        assert_eq!(store.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn wrong_file_type_is_rejected_before_decode() {
        let store = Arc::new(MemoryTokenStore::new());
        let app = app_with_store(store.clone());

        let response = app
            .clone()
            .oneshot(upload_request("notes.txt", b"just some text"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Unsupported file type"));

        let response = app.oneshot(upload_request("", b"")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("No file selected"));

        assert_eq!(store.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn store_outage_is_503_not_used() {
        let app = app_with_store(Arc::new(OfflineStore));

        let response = app
            .clone()
            .oneshot(get("/qr/0123456789abcdef0123456789abcdef"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body_text(response).await.contains("already been used"));

        let response = app
            .oneshot(upload_request("code.png", &qr_png("hello")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
