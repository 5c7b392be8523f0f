//! Auth session: who is logged in, and the login/register modal.
//! - Identity is seeded from the server snapshot at page load; the first
//!   client-side login/logout/refresh supersedes it for the rest of the session
//! - `require_auth` is the only access gate here and it is advisory; the
//!   backend enforces real authorization
//! - Tokens travel as `accessToken` / `idToken` / `refreshToken` cookies
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::models::User;
use crate::normalize;
use crate::types::{AuthTokens, LoginRequest};
use crate::validation::{validate_login, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct AuthModal {
    pub open: bool,
    pub mode: AuthMode,
    /// Where to go after a successful login
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    LoginSucceeded(User),
    RefreshStarted,
    RefreshFinished(Option<User>),
    LoggedOut,
    ShowModal {
        mode: AuthMode,
        redirect: Option<String>,
    },
    CloseModal,
    SwitchMode,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthState {
    initial: Option<User>,
    /// `Some(_)` once any client-side mutation happened
    client: Option<Option<User>>,
    pub loading: bool,
    pub modal: AuthModal,
}

impl AuthState {
    pub fn from_server(initial: Option<User>) -> Self {
        AuthState {
            initial,
            ..AuthState::default()
        }
    }

    pub fn user(&self) -> Option<&User> {
        match &self.client {
            Some(client) => client.as_ref(),
            None => self.initial.as_ref(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn reduce(mut self, action: AuthAction) -> AuthState {
        match action {
            AuthAction::LoginSucceeded(user) => {
                self.client = Some(Some(user));
                self.loading = false;
                self.modal.open = false;
            }
            AuthAction::RefreshStarted => self.loading = true,
            AuthAction::RefreshFinished(user) => {
                self.client = Some(user);
                self.loading = false;
            }
            AuthAction::LoggedOut => {
                self.client = Some(None);
                self.loading = false;
                self.modal = AuthModal::default();
            }
            AuthAction::ShowModal { mode, redirect } => {
                self.modal = AuthModal {
                    open: true,
                    mode,
                    redirect,
                };
            }
            AuthAction::CloseModal => self.modal = AuthModal::default(),
            AuthAction::SwitchMode => {
                self.modal.mode = match self.modal.mode {
                    AuthMode::Login => AuthMode::Register,
                    AuthMode::Register => AuthMode::Login,
                };
            }
        }
        self
    }

    fn dispatch(&mut self, action: AuthAction) {
        *self = std::mem::take(self).reduce(action);
    }
}

/// Session calls the container needs from the backend
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `Ok(None)` when the session is not (or no longer) valid
    async fn current_user(&self) -> Result<Option<User>, ApiError>;
    async fn login(&self, req: &LoginRequest) -> Result<User, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
}

/// Page navigation side effects
pub trait Navigator: Send + Sync {
    fn push(&self, path: &str);
    /// Re-run every data fetch on the current page
    fn refresh(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error("{0}")]
    Failed(String),
}

pub struct AuthSession {
    state: AuthState,
    backend: Arc<dyn AuthBackend>,
    nav: Arc<dyn Navigator>,
}

impl AuthSession {
    pub fn new(initial: Option<User>, backend: Arc<dyn AuthBackend>, nav: Arc<dyn Navigator>) -> Self {
        AuthSession {
            state: AuthState::from_server(initial),
            backend,
            nav,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user()
    }

    /// Re-fetch the current identity. Failure means "logged out", never an
    /// error for the caller.
    pub async fn refresh_user(&mut self) {
        self.state.dispatch(AuthAction::RefreshStarted);
        let user = match self.backend.current_user().await {
            Ok(user) => user,
            Err(e) => {
                log::warn!("[auth] refresh failed, treating as logged out: {e}");
                None
            }
        };
        self.state.dispatch(AuthAction::RefreshFinished(user));
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), LoginError> {
        let req = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        validate_login(&req)?;

        self.state.loading = true;
        match self.backend.login(&req).await {
            Ok(user) => {
                log::info!("[auth] logged in as {}", user.id);
                let redirect = self.state.modal.redirect.clone();
                self.state.dispatch(AuthAction::LoginSucceeded(user));
                if let Some(path) = redirect {
                    self.nav.push(&path);
                }
                self.nav.refresh();
                Ok(())
            }
            Err(e) => {
                self.state.loading = false;
                log::warn!("[auth] login failed: {e}");
                Err(LoginError::Failed(e.user_message()))
            }
        }
    }

    pub async fn logout(&mut self) {
        if let Err(e) = self.backend.logout().await {
            log::warn!("[auth] backend logout failed, clearing locally anyway: {e}");
        }
        self.state.dispatch(AuthAction::LoggedOut);
        self.nav.push("/");
        self.nav.refresh();
    }

    pub fn show_auth_modal(&mut self, mode: AuthMode, redirect: Option<String>) {
        self.state.dispatch(AuthAction::ShowModal { mode, redirect });
    }

    pub fn close_auth_modal(&mut self) {
        self.state.dispatch(AuthAction::CloseModal);
    }

    pub fn switch_auth_mode(&mut self) {
        self.state.dispatch(AuthAction::SwitchMode);
    }

    /// Run `action` if someone is logged in. Otherwise open the login modal
    /// remembering `redirect`, skip the action and return `None`.
    pub fn require_auth<R>(
        &mut self,
        redirect: Option<&str>,
        action: impl FnOnce(&User) -> R,
    ) -> Option<R> {
        if let Some(user) = self.state.user() {
            return Some(action(user));
        }
        self.show_auth_modal(AuthMode::Login, redirect.map(str::to_string));
        None
    }
}

/// [`AuthBackend`] over the HTTP client
pub struct ApiAuthBackend {
    client: ApiClient,
}

impl ApiAuthBackend {
    pub fn new(client: ApiClient) -> Self {
        ApiAuthBackend { client }
    }
}

#[async_trait]
impl AuthBackend for ApiAuthBackend {
    async fn current_user(&self) -> Result<Option<User>, ApiError> {
        match self.client.me().await {
            Ok(raw) => Ok(Some(normalize::user(&raw))),
            Err(e) if e.is_unauthorized() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn login(&self, req: &LoginRequest) -> Result<User, ApiError> {
        let tokens = self.client.login(req).await?;
        user_from_tokens(&self.client, &tokens).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.client.logout().await
    }
}

/// Identity for a fresh token set: embedded in the response, or asked for
pub async fn user_from_tokens(client: &ApiClient, tokens: &AuthTokens) -> Result<User, ApiError> {
    if let Some(raw) = &tokens.user {
        return Ok(normalize::user(raw));
    }
    let raw = client
        .with_token(Some(tokens.access_token.clone()))
        .me()
        .await?;
    Ok(normalize::user(&raw))
}

// --- Cookies ----------------------------------------------------------------

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const ID_TOKEN_COOKIE: &str = "idToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

pub const ACCESS_TOKEN_MAX_AGE_SECS: i64 = 15 * 60;
pub const REFRESH_TOKEN_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// `Cookie:` header -> name/value map (later duplicates win)
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|kv| {
            let mut it = kv.splitn(2, '=');
            let k = it.next()?.trim();
            let v = it.next()?.trim().trim_matches('"');
            if k.is_empty() {
                return None;
            }
            let v = urlencoding::decode(v)
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| v.to_string());
            Some((k.to_string(), v))
        })
        .collect()
}

pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    parse_cookie_header(header)
        .remove(name)
        .filter(|v| !v.is_empty())
}

/// Either token is enough for the route guard; an expired access token is
/// refreshed on the next request.
pub fn has_auth_cookie(header: &str) -> bool {
    let cookies = parse_cookie_header(header);
    [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
        .iter()
        .any(|name| cookies.get(*name).is_some_and(|v| !v.is_empty()))
}

pub fn set_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut c = format!(
        "{name}={}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax",
        urlencoding::encode(value)
    );
    if secure {
        c.push_str("; Secure");
    }
    c
}

pub fn clear_cookie(name: &str, secure: bool) -> String {
    set_cookie(name, "", 0, secure)
}

pub fn session_cookies(tokens: &AuthTokens, secure: bool) -> Vec<String> {
    let mut out = vec![set_cookie(
        ACCESS_TOKEN_COOKIE,
        &tokens.access_token,
        ACCESS_TOKEN_MAX_AGE_SECS,
        secure,
    )];
    if let Some(id) = &tokens.id_token {
        out.push(set_cookie(ID_TOKEN_COOKIE, id, ACCESS_TOKEN_MAX_AGE_SECS, secure));
    }
    if let Some(refresh) = &tokens.refresh_token {
        out.push(set_cookie(
            REFRESH_TOKEN_COOKIE,
            refresh,
            REFRESH_TOKEN_MAX_AGE_SECS,
            secure,
        ));
    }
    out
}

pub fn clear_session_cookies(secure: bool) -> Vec<String> {
    [ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
        .iter()
        .map(|name| clear_cookie(name, secure))
        .collect()
}

/// `exp` claim of a JWT. The signature is not checked; this only decides
/// whether a refresh is worth attempting.
pub fn token_expiry(jwt: &str) -> Option<DateTime<Utc>> {
    let payload = jwt.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

/// True when the token carries an `exp` within `leeway` of `now`. Opaque
/// tokens are left for the backend to judge.
pub fn needs_refresh(jwt: &str, now: DateTime<Utc>, leeway: Duration) -> bool {
    token_expiry(jwt).is_some_and(|exp| exp - leeway <= now)
}
