//! Typed client for the marketplace backend.
//!
//! Every call is JSON over HTTP with an optional bearer token. Reads retry
//! on 429/5xx and transport errors with exponential backoff; writes are
//! sent once.

use rand::{thread_rng, Rng};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::filter::FilterSelection;
use crate::models::ReviewSummary;
use crate::types::{
    AuthTokens, LoginRequest, Page, PageEnvelope, RawBrand, RawProduct, RawUser, RegisterRequest,
    UploadResponse,
};

pub const FALLBACK_ERROR_MESSAGE: &str = "Došlo je do greške. Pokušajte ponovo.";
pub const NETWORK_ERROR_MESSAGE: &str = "Server nije dostupan. Proverite internet konekciju.";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("not found")]
    NotFound,
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message safe to show the shopper. Backend-provided text is used for
    /// client errors (it is already localized); everything else gets the
    /// generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            ApiError::Status { status, message } if (400..500).contains(status) && !message.is_empty() => {
                message.clone()
            }
            ApiError::NotFound => "Traženi sadržaj ne postoji.".to_string(),
            _ => FALLBACK_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401, .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Listing query sent to `/products`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub seller_id: Option<String>,
    pub filters: FilterSelection,
}

impl ProductQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(p) = self.page {
            pairs.push(("page", p.to_string()));
        }
        if let Some(s) = self.page_size {
            pairs.push(("pageSize", s.to_string()));
        }
        if let Some(q) = self.search.as_deref().filter(|q| !q.trim().is_empty()) {
            pairs.push(("search", q.trim().to_string()));
        }
        if let Some(c) = self.category.as_deref().filter(|c| !c.is_empty()) {
            pairs.push(("category", c.to_string()));
        }
        if let Some(id) = &self.seller_id {
            pairs.push(("sellerId", id.clone()));
        }
        pairs.extend(self.filters.to_pairs());
        pairs
    }

    /// Stable key for caching this query's result
    pub fn cache_key(&self) -> String {
        self.to_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
    retries: u8,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_ms: u64, retries: u8) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()?;
        Ok(ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            timeout: Duration::from_millis(timeout_ms),
            retries,
            token: None,
        })
    }

    /// Same connection pool, different bearer token
    pub fn with_token(&self, token: Option<String>) -> ApiClient {
        ApiClient {
            token: token.filter(|t| !t.is_empty()),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let mut rb = self
            .http
            .request(method, self.url(path))
            .timeout(self.timeout);
        if let Some(token) = &self.token {
            rb = rb.bearer_auth(token);
        }
        rb
    }

    async fn send(&self, rb: RequestBuilder, label: &str, retry: bool) -> ApiResult<Response> {
        let retries = if retry { self.retries } else { 0 };
        let res = send_with_backoff(rb, label, retries).await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        let body = res.text().await.unwrap_or_default();
        let message = error_message(&body);
        log::warn!("[api] {label} failed ({status}): {message}");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(res: Response, label: &str) -> ApiResult<T> {
        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            log::warn!("[api] {label}: undecodable response: {e}");
            ApiError::Decode(e.to_string())
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        log::debug!("[api] GET {path}");
        let rb = self.request(reqwest::Method::GET, path).query(query);
        let res = self.send(rb, path, true).await?;
        Self::decode(res, path).await
    }

    /// GET where 404 means "no such entity" rather than failure
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Option<T>> {
        match self.get_json(path, &[]).await {
            Ok(v) => Ok(Some(v)),
            Err(ApiError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        log::debug!("[api] POST {path}");
        let rb = self.request(reqwest::Method::POST, path).json(body);
        let res = self.send(rb, path, false).await?;
        Self::decode(res, path).await
    }

    // ----- catalogue -----

    pub async fn list_products(&self, query: &ProductQuery) -> ApiResult<Page<RawProduct>> {
        let env: PageEnvelope<RawProduct> = self.get_json("products", &query.to_pairs()).await?;
        Ok(env.into())
    }

    pub async fn get_product(&self, id: &str) -> ApiResult<Option<RawProduct>> {
        self.get_optional(&format!("products/{}", urlencoding::encode(id)))
            .await
    }

    pub async fn list_brands(&self) -> ApiResult<Vec<RawBrand>> {
        let env: PageEnvelope<RawBrand> = self.get_json("brands", &[]).await?;
        Ok(Page::from(env).items)
    }

    pub async fn get_user(&self, id: &str) -> ApiResult<Option<RawUser>> {
        self.get_optional(&format!("users/{}", urlencoding::encode(id)))
            .await
    }

    pub async fn get_user_products(&self, id: &str) -> ApiResult<Page<RawProduct>> {
        let path = format!("users/{}/products", urlencoding::encode(id));
        let env: PageEnvelope<RawProduct> = self.get_json(&path, &[]).await?;
        Ok(env.into())
    }

    pub async fn get_review_summary(&self, user_id: &str) -> ApiResult<Option<ReviewSummary>> {
        self.get_optional(&format!(
            "users/{}/reviews/summary",
            urlencoding::encode(user_id)
        ))
        .await
    }

    // ----- auth -----

    pub async fn login(&self, req: &LoginRequest) -> ApiResult<AuthTokens> {
        self.post_json("auth/login", req).await
    }

    pub async fn register(&self, req: &RegisterRequest) -> ApiResult<AuthTokens> {
        self.post_json("auth/register", req).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<AuthTokens> {
        self.post_json("auth/refresh", &json!({ "refreshToken": refresh_token }))
            .await
    }

    /// Current identity for the client's bearer token
    pub async fn me(&self) -> ApiResult<RawUser> {
        self.get_json("auth/me", &[]).await
    }

    pub async fn logout(&self) -> ApiResult<()> {
        let rb = self.request(reqwest::Method::POST, "auth/logout");
        self.send(rb, "auth/logout", false).await?;
        Ok(())
    }

    // ----- uploads -----

    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime: &str,
    ) -> ApiResult<String> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let rb = self
            .request(reqwest::Method::POST, "upload/image")
            .multipart(form);
        let res = self.send(rb, "upload/image", false).await?;
        let up: UploadResponse = Self::decode(res, "upload/image").await?;
        log::info!("[api] uploaded {file_name}");
        Ok(up.url)
    }
}

/// Pull a readable message out of an error body: `{"message": ...}`,
/// `{"message": [..]}` or `{"error": ...}`; raw text otherwise.
fn error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        match v.get("message").or_else(|| v.get("error")) {
            Some(Value::String(s)) => return s.clone(),
            Some(Value::Array(items)) => {
                return items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            }
            _ => {}
        }
    }
    body.trim().chars().take(200).collect()
}

fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// Send, retrying transient failures. Requests whose body can't be cloned
/// (multipart streams) are sent exactly once.
pub async fn send_with_backoff(
    rb: RequestBuilder,
    label: &str,
    max_retries: u8,
) -> Result<Response, reqwest::Error> {
    let mut attempt = 0u8;
    loop {
        let Some(current) = rb.try_clone() else {
            return rb.send().await;
        };
        match current.send().await {
            Ok(r) if is_transient(r.status()) && attempt < max_retries => {
                attempt += 1;
                let back_ms = backoff_delay_ms(attempt);
                log::warn!(
                    "[api] {} {} retry={} backoff={}ms",
                    r.status().as_u16(),
                    label,
                    attempt,
                    back_ms
                );
                tokio::time::sleep(Duration::from_millis(back_ms)).await;
            }
            Ok(r) => return Ok(r),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                let back_ms = backoff_delay_ms(attempt);
                log::warn!("[api] err {label} retry={attempt} backoff={back_ms}ms : {e}");
                tokio::time::sleep(Duration::from_millis(back_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn backoff_delay_ms(attempt: u8) -> u64 {
    let base = 100u64.saturating_mul(1u64 << (attempt.clamp(1, 6) - 1)); // 100,200,400,800,1600,3200
    let jitter: u64 = thread_rng().gen_range(0..=50);
    base + jitter
}
