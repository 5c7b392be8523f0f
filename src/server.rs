//! HTTP server rendering page view models as JSON
//!
//! ## Endpoints
//! - GET /health - Health check
//! - GET / - Home listing (`?sizes=&brands=&minPrice=&maxPrice=&q=&category=&page=&view=&columns=`)
//! - GET /product/:id - Product detail
//! - POST /product/:id/message - Start a conversation with the seller (login required)
//! - GET /user/:id - Seller profile with listings and review summary
//! - GET /brands/search?q= - Brand picker options
//! - GET /session - Current user
//! - POST /auth/login, /auth/register, /auth/logout, /auth/refresh - Session cookies
//! - GET /login, /register - Auth pages
//! - POST /sell/draft - Check a listing draft before upload (login required)
//! - GET /sell, /profile, /messages, /favorites, /settings - Account pages (guarded)
//!
//! Every GET passes the route guard first.

use anyhow::Context;
use axum::{
    extract::{Path, Query, RawQuery, Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, Method, StatusCode, Uri,
    },
    middleware::{self, Next},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::api::{ApiClient, ApiError, ProductQuery};
use crate::auth::{
    clear_session_cookies, cookie_value, has_auth_cookie, needs_refresh, session_cookies,
    user_from_tokens, AuthMode, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::avatar::{display_name, get_user_avatar_data, AvatarData, AvatarInput};
use crate::combobox::{self, ComboOption};
use crate::config::Config;
use crate::filter::FilterSelection;
use crate::listing::{HomeAction, HomeContent, ListingView, ProductCard, ViewMode};
use crate::models::{Brand, Product, User};
use crate::normalize;
use crate::query::{not_found_or, QueryCache};
use crate::reviews::{count_label, ReviewSummaryView, Stars};
use crate::router::{login_redirect, query_param, redirect_from_query, GuardDecision, PageRoute, RouteGuard};
use crate::types::{AuthTokens, LoginRequest, Page, RawProduct, RegisterRequest};
use crate::util_text::{format_date, format_decimal_1, format_membership_duration, format_price, format_relative_time};
use crate::validation::{
    validate_listing, validate_login, validate_register, ListingDraft, ValidationErrors,
};

const BRANDS_KEY: &str = "brands";
/// Access tokens this close to expiry are renewed before use
const REFRESH_LEEWAY_SECS: i64 = 30;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    api: ApiClient,
    guard: RouteGuard,
    listings: Arc<QueryCache<Page<RawProduct>>>,
    products: Arc<QueryCache<Option<RawProduct>>>,
    brands: Arc<QueryCache<Vec<Brand>>>,
}

fn cache<T: Clone + Send + Sync + 'static>(config: &Config) -> QueryCache<T> {
    QueryCache::with_limits(config.query_stale_ms, config.query_capacity, config.query_ttl_ms)
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let api = ApiClient::new(&config.api_url, config.api_timeout_ms, config.api_retries)?;
        Ok(AppState {
            guard: RouteGuard::new(config.protected_routes.clone()),
            listings: Arc::new(cache(&config)),
            products: Arc::new(cache(&config)),
            brands: Arc::new(cache(&config)),
            config: Arc::new(config),
            api,
        })
    }

    async fn brand_list(&self) -> Vec<Brand> {
        let result = self
            .brands
            .fetch(BRANDS_KEY, || async {
                let raw = self.api.list_brands().await?;
                Ok::<_, ApiError>(raw.iter().filter_map(normalize::brand).collect())
            })
            .await;
        result.unwrap_or_else(|e| {
            log::warn!("[server] brand list unavailable: {e}");
            Vec::new()
        })
    }

    /// Everything refetches on the next page after login or logout
    async fn invalidate_caches(&self) {
        futures::join!(
            self.listings.invalidate_all(),
            self.products.invalidate_all(),
            self.brands.invalidate_all(),
        );
    }

    /// Identity behind the request's cookies. An access token that is
    /// missing, expired or rejected is renewed with the refresh token; the
    /// rotated cookies travel back on the response.
    async fn session(&self, headers: &HeaderMap) -> Session {
        let cookies = cookie_header(headers);
        let access = cookie_value(&cookies, ACCESS_TOKEN_COOKIE)
            .filter(|t| !needs_refresh(t, Utc::now(), Duration::seconds(REFRESH_LEEWAY_SECS)));
        if let Some(token) = access {
            match self.api.with_token(Some(token)).me().await {
                Ok(raw) => return Session::of(normalize::user(&raw)),
                Err(e) if e.is_unauthorized() => {
                    log::debug!("[server] access token rejected, trying refresh")
                }
                Err(e) => {
                    log::debug!("[server] session lookup failed: {e}");
                    return Session::default();
                }
            }
        }

        let Some(refresh) = cookie_value(&cookies, REFRESH_TOKEN_COOKIE) else {
            return Session::default();
        };
        let secure = self.config.production;
        match self.api.refresh(&refresh).await {
            Ok(tokens) => match user_from_tokens(&self.api, &tokens).await {
                Ok(user) => {
                    log::info!("[server] session renewed for {}", user.id);
                    Session {
                        user: Some(user),
                        set_cookies: session_cookies(&tokens, secure),
                    }
                }
                Err(e) => {
                    log::debug!("[server] renewed token has no user: {e}");
                    Session::default()
                }
            },
            Err(e) if e.is_unauthorized() => {
                log::debug!("[server] refresh token rejected: {e}");
                Session {
                    user: None,
                    set_cookies: clear_session_cookies(secure),
                }
            }
            Err(e) => {
                log::warn!("[server] session refresh failed: {e}");
                Session::default()
            }
        }
    }
}

/// Request identity plus cookies renewing it
#[derive(Debug, Default)]
struct Session {
    user: Option<User>,
    set_cookies: Vec<String>,
}

impl Session {
    fn of(user: User) -> Self {
        Session {
            user: Some(user),
            set_cookies: Vec::new(),
        }
    }

    fn headers(&self) -> AppResult<HeaderMap> {
        with_cookies(self.set_cookies.clone())
    }

    fn view(&self) -> SessionView {
        SessionView::of(self.user.as_ref())
    }
}

// --- Errors -----------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("not found")]
    NotFound,
    #[error("login required")]
    AuthRequired { redirect: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound | AppError::Api(ApiError::NotFound) => {
                (StatusCode::NOT_FOUND, Json(NotFoundView::new())).into_response()
            }
            AppError::Api(e) => {
                // Client errors from the backend (bad credentials, conflicts) pass through
                let status = match &e {
                    ApiError::Status { status, .. } if (400..500).contains(status) => {
                        StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                    }
                    _ => StatusCode::BAD_GATEWAY,
                };
                log::warn!("[server] backend error ({status}): {e}");
                (status, Json(json!({ "error": e.user_message() }))).into_response()
            }
            AppError::Validation(errs) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "Proverite označena polja.", "fields": errs.fields })),
            )
                .into_response(),
            AppError::AuthRequired { redirect } => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Morate biti prijavljeni.", "redirect": redirect })),
            )
                .into_response(),
            AppError::Internal(msg) => {
                log::error!("[server] {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": crate::api::FALLBACK_ERROR_MESSAGE })),
                )
                    .into_response()
            }
        }
    }
}

type AppResult<T> = Result<T, AppError>;

// --- View models ------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub avatar: AvatarData,
}

impl From<&User> for SessionUser {
    fn from(u: &User) -> Self {
        SessionUser {
            id: u.id.clone(),
            email: u.email.clone(),
            display_name: display_name(u),
            avatar: get_user_avatar_data(&AvatarInput::from(u)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: Option<SessionUser>,
}

impl SessionView {
    fn of(user: Option<&User>) -> Self {
        SessionView {
            user: user.map(SessionUser::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub session: SessionView,
    pub listing: ListingView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerCard {
    pub id: String,
    pub href: String,
    pub name: String,
    pub avatar: AvatarData,
    pub rating: Option<String>,
    pub stars: Option<Stars>,
    pub reviews: String,
    pub items_sold: u32,
    pub response_time: Option<String>,
    pub member_for: Option<String>,
}

impl SellerCard {
    fn new(u: &User, now: chrono::DateTime<Utc>) -> Self {
        SellerCard {
            id: u.id.clone(),
            href: format!("/user/{}", urlencoding::encode(&u.id)),
            name: display_name(u),
            avatar: get_user_avatar_data(&AvatarInput::from(u)),
            rating: u.rating.map(|r| format_decimal_1(f64::from(r))),
            stars: u.rating.map(Stars::from_rating),
            reviews: count_label(u.review_count),
            items_sold: u.items_sold,
            response_time: u.response_time.clone(),
            member_for: u.member_since.map(|since| format_membership_duration(since, now)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price_label: String,
    pub images: Vec<String>,
    pub condition: &'static str,
    pub size: &'static str,
    pub brand: Option<String>,
    pub category: String,
    pub location: String,
    pub posted: String,
    pub posted_on: String,
    pub badge: Option<&'static str>,
}

impl ProductDetail {
    fn new(p: &Product, now: chrono::DateTime<Utc>) -> Self {
        ProductDetail {
            id: p.id.clone(),
            title: p.title.clone(),
            description: p.description.clone(),
            price_label: format_price(p.price),
            images: p.images.clone(),
            condition: p.condition.label(),
            size: p.size.label(),
            brand: p.brand.as_ref().map(|b| b.name.clone()),
            category: p.category.clone(),
            location: p.location.clone(),
            posted: format_relative_time(p.created_at, now),
            posted_on: format_date(p.created_at),
            badge: p.availability.badge(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub session: SessionView,
    pub product: ProductDetail,
    pub seller: SellerCard,
    pub is_own: bool,
    /// Anonymous visitors see the button too; pressing it asks them to log in
    pub can_message: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub session: SessionView,
    pub seller: SellerCard,
    pub listings: Vec<ProductCard>,
    pub reviews: Option<ReviewSummaryView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundView {
    pub not_found: bool,
    pub title: &'static str,
    pub message: &'static str,
}

impl NotFoundView {
    fn new() -> Self {
        NotFoundView {
            not_found: true,
            title: "Stranica nije pronađena",
            message: "Stranica koju tražite ne postoji ili je uklonjena.",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountPage {
    pub page: &'static str,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct AuthPage {
    pub mode: AuthMode,
    pub redirect: String,
}

#[derive(Debug, Serialize)]
pub struct RedirectView {
    pub redirect: String,
}

/// Accepted listing draft, echoed with its display price
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftCheck {
    pub ok: bool,
    pub price_label: String,
}

// --- Router -----------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(home_handler))
        .route("/product/:id", get(product_handler))
        .route("/product/:id/message", post(message_handler))
        .route("/user/:id", get(user_handler))
        .route("/brands/search", get(brand_search_handler))
        .route("/session", get(session_handler))
        .route("/login", get(auth_page_handler))
        .route("/register", get(auth_page_handler))
        .route("/sell", get(account_page_handler))
        .route("/sell/draft", post(sell_draft_handler))
        .route("/profile", get(account_page_handler))
        .route("/messages", get(account_page_handler))
        .route("/favorites", get(account_page_handler))
        .route("/settings", get(account_page_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/refresh", post(refresh_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), guard_pages))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        // Cookies need an exact origin
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods(methods)
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
    }
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let app = router(AppState::new(config)?);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log::info!("🚀 Server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("[server] failed to listen for shutdown signal: {e}");
        return;
    }
    log::info!("[server] shutting down");
}

fn cookie_header(headers: &HeaderMap) -> String {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ")
}

fn with_cookies(cookies: Vec<String>) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for c in cookies {
        let value = HeaderValue::from_str(&c).map_err(|e| AppError::Internal(format!("bad cookie: {e}")))?;
        headers.append(SET_COOKIE, value);
    }
    Ok(headers)
}

/// Route guard for page requests
async fn guard_pages(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }
    let has_auth = has_auth_cookie(&cookie_header(req.headers()));
    match state.guard.check(req.uri().path(), req.uri().query(), has_auth) {
        GuardDecision::Continue => next.run(req).await,
        GuardDecision::Redirect(to) => {
            log::debug!("[server] guard: {} -> {to}", req.uri());
            Redirect::to(&to).into_response()
        }
    }
}

// --- Handlers ---------------------------------------------------------------

async fn health_handler() -> &'static str {
    "OK"
}

async fn not_found_handler() -> AppError {
    AppError::NotFound
}

async fn home_handler(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
) -> AppResult<(HeaderMap, Json<HomePage>)> {
    let q = raw.as_deref();
    let mut home = HomeContent::new(FilterSelection::from_query(q.unwrap_or("")));
    match query_param(q, "view").as_deref() {
        Some("list") => {
            home.dispatch(HomeAction::SetView(ViewMode::List));
        }
        _ => {
            if let Some(columns) = query_param(q, "columns").and_then(|c| c.parse().ok()) {
                home.dispatch(HomeAction::SetView(ViewMode::grid(columns)));
            }
        }
    }

    let base = ProductQuery {
        page: query_param(q, "page").and_then(|p| p.parse().ok()),
        page_size: Some(state.config.page_size),
        search: query_param(q, "q"),
        category: query_param(q, "category"),
        ..ProductQuery::default()
    };
    let query = home.query(&base);
    let key = query.cache_key();

    let ticket = home.begin_fetch();
    let (page, brands, session) = futures::join!(
        state.listings.fetch(&key, || state.api.list_products(&query)),
        state.brand_list(),
        state.session(&headers),
    );
    home.set_brands(&brands);

    match page {
        Ok(page) => {
            home.apply_page(ticket, page);
        }
        // Last good page, if any, is shown next to the error
        Err(e) => match state.listings.state(&key).await.data {
            Some(stale) => {
                home.apply_page(ticket, stale);
                home.apply_error(ticket, &e);
            }
            None => return Err(e.into()),
        },
    }

    Ok((
        session.headers()?,
        Json(HomePage {
            session: session.view(),
            listing: home.compose(Utc::now()),
        }),
    ))
}

async fn product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<(HeaderMap, Json<ProductPage>)> {
    let (raw, session) = futures::join!(
        state.products.fetch(&id, || state.api.get_product(&id)),
        state.session(&headers),
    );
    let product = normalize::product(&not_found_or(raw)?);
    let now = Utc::now();

    let is_own = session.user.as_ref().is_some_and(|u| u.id == product.seller.id);
    Ok((
        session.headers()?,
        Json(ProductPage {
            session: session.view(),
            seller: SellerCard::new(&product.seller, now),
            can_message: !is_own && product.is_available(),
            is_own,
            product: ProductDetail::new(&product, now),
        }),
    ))
}

/// Starting a conversation is the guarded action on the product page
async fn message_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<(HeaderMap, Json<RedirectView>)> {
    let session = state.session(&headers).await;
    let Some(user) = &session.user else {
        return Err(AppError::AuthRequired {
            redirect: login_redirect(&format!("/product/{id}")),
        });
    };

    let raw = state.products.fetch(&id, || state.api.get_product(&id)).await;
    let product = normalize::product(&not_found_or(raw)?);

    let refusal = if product.seller.id == user.id {
        Some("Ne možete poslati poruku sami sebi.")
    } else if !product.is_available() {
        Some("Ovaj oglas više nije dostupan.")
    } else {
        None
    };
    if let Some(msg) = refusal {
        return Err(ValidationErrors {
            fields: BTreeMap::from([("product", msg.to_string())]),
        }
        .into());
    }

    log::info!("[server] {} opens a thread on product {}", user.id, product.id);
    Ok((
        session.headers()?,
        Json(RedirectView {
            redirect: format!(
                "/messages?product={}&seller={}",
                urlencoding::encode(&product.id),
                urlencoding::encode(&product.seller.id)
            ),
        }),
    ))
}

async fn user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<(HeaderMap, Json<ProfilePage>)> {
    let (user, listings, summary, session) = futures::join!(
        state.api.get_user(&id),
        state.api.get_user_products(&id),
        state.api.get_review_summary(&id),
        state.session(&headers),
    );
    let seller = normalize::user(&not_found_or(user)?);
    let now = Utc::now();

    let listings = match listings {
        Ok(page) => page
            .items
            .iter()
            .map(normalize::product)
            .filter(Product::is_available)
            .map(|p| ProductCard::from_product(&p, now))
            .collect(),
        Err(e) => {
            log::warn!("[server] listings for {id} unavailable: {e}");
            Vec::new()
        }
    };
    let reviews = match summary {
        Ok(s) => s.as_ref().map(ReviewSummaryView::from),
        Err(e) => {
            log::warn!("[server] review summary for {id} unavailable: {e}");
            None
        }
    };

    Ok((
        session.headers()?,
        Json(ProfilePage {
            session: session.view(),
            seller: SellerCard::new(&seller, now),
            listings,
            reviews,
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn brand_search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Json<Vec<ComboOption>> {
    let options: Vec<ComboOption> = state
        .brand_list()
        .await
        .into_iter()
        .map(|b| ComboOption::new(b.id, b.name))
        .collect();
    let hits = combobox::search(&options, &params.q, state.config.search_result_cap);
    Json(hits.into_iter().cloned().collect())
}

async fn session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(HeaderMap, Json<SessionView>)> {
    let session = state.session(&headers).await;
    Ok((session.headers()?, Json(session.view())))
}

async fn auth_page_handler(uri: Uri) -> Json<AuthPage> {
    let mode = match PageRoute::parse(uri.path()) {
        PageRoute::Register => AuthMode::Register,
        _ => AuthMode::Login,
    };
    Json(AuthPage {
        mode,
        redirect: redirect_from_query(uri.query()),
    })
}

async fn account_page_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> AppResult<(HeaderMap, Json<AccountPage>)> {
    let page = match PageRoute::parse(uri.path()) {
        PageRoute::Sell => "sell",
        PageRoute::Profile => "profile",
        PageRoute::Messages => "messages",
        PageRoute::Favorites => "favorites",
        _ => "settings",
    };
    let session = state.session(&headers).await;
    Ok((
        session.headers()?,
        Json(AccountPage {
            page,
            session: session.view(),
        }),
    ))
}

async fn sell_draft_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut draft): Json<ListingDraft>,
) -> AppResult<(HeaderMap, Json<DraftCheck>)> {
    let session = state.session(&headers).await;
    if session.user.is_none() {
        return Err(AppError::AuthRequired {
            redirect: login_redirect("/sell"),
        });
    }
    draft.title = draft.title.trim().to_string();
    validate_listing(&draft)?;
    Ok((
        session.headers()?,
        Json(DraftCheck {
            ok: true,
            price_label: format_price(draft.price.unwrap_or_default()),
        }),
    ))
}

async fn start_session(state: &AppState, tokens: AuthTokens) -> AppResult<(HeaderMap, Json<SessionView>)> {
    let user = user_from_tokens(&state.api, &tokens).await?;
    log::info!("[server] session started for {}", user.id);
    let headers = with_cookies(session_cookies(&tokens, state.config.production))?;
    Ok((headers, Json(SessionView::of(Some(&user)))))
}

async fn login_handler(
    State(state): State<AppState>,
    Json(mut req): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<SessionView>)> {
    req.email = req.email.trim().to_string();
    validate_login(&req)?;
    let tokens = state.api.login(&req).await?;
    state.invalidate_caches().await;
    start_session(&state, tokens).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterForm {
    email: String,
    password: String,
    #[serde(default)]
    confirm_password: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

async fn register_handler(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> AppResult<(HeaderMap, Json<SessionView>)> {
    let blank_to_none = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let req = RegisterRequest {
        email: form.email.trim().to_string(),
        password: form.password,
        first_name: blank_to_none(form.first_name),
        last_name: blank_to_none(form.last_name),
    };
    validate_register(&req, &form.confirm_password)?;
    let tokens = state.api.register(&req).await?;
    state.invalidate_caches().await;
    start_session(&state, tokens).await
}

async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(HeaderMap, Json<RedirectView>)> {
    if let Some(token) = cookie_value(&cookie_header(&headers), ACCESS_TOKEN_COOKIE) {
        if let Err(e) = state.api.with_token(Some(token)).logout().await {
            log::warn!("[server] backend logout failed, clearing cookies anyway: {e}");
        }
    }
    state.invalidate_caches().await;
    let headers = with_cookies(clear_session_cookies(state.config.production))?;
    Ok((
        headers,
        Json(RedirectView {
            redirect: "/".to_string(),
        }),
    ))
}

async fn refresh_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let secure = state.config.production;
    let Some(refresh) = cookie_value(&cookie_header(&headers), REFRESH_TOKEN_COOKIE) else {
        return unauthenticated(secure);
    };
    let result = match state.api.refresh(&refresh).await {
        Ok(tokens) => start_session(&state, tokens).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(ok) => ok.into_response(),
        Err(AppError::Api(e)) if e.is_unauthorized() => unauthenticated(secure),
        Err(e) => e.into_response(),
    }
}

/// 401 that also drops whatever session cookies the browser still holds
fn unauthenticated(secure: bool) -> Response {
    let body = Json(SessionView { user: None });
    match with_cookies(clear_session_cookies(secure)) {
        Ok(headers) => (StatusCode::UNAUTHORIZED, headers, body).into_response(),
        Err(e) => e.into_response(),
    }
}
