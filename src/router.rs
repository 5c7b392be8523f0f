//! Page routes and the access guard in front of them
//!
//! ## Pages
//!
//! - `/` - home listing
//! - `/product/<id>` - product detail
//! - `/user/<id>` - seller profile
//! - `/login`, `/register` - auth pages (bounced to `/` when logged in)
//! - `/sell`, `/profile`, `/messages`, `/favorites`, `/settings` - protected
//!
//! ## Guard
//!
//! A protected page without an auth cookie redirects to
//! `/login?redirect=<original path and query>`. Only presence of a cookie is
//! checked here; token validity is the backend's call.

/// Default prefixes that require a session
pub const PROTECTED_PREFIXES: &[&str] = &["/sell", "/profile", "/messages", "/favorites", "/settings"];

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";

/// Strip query and fragment from URL path
#[inline]
fn strip_query_frag(s: &str) -> &str {
    match s.find(['?', '#']) {
        Some(i) => &s[..i],
        None => s,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageRoute {
    Home,
    Product { id: String },
    User { id: String },
    Login,
    Register,
    Sell,
    Profile,
    Messages,
    Favorites,
    Settings,
    NotFound,
}

impl PageRoute {
    /// Parse a request path. Trailing slashes and query strings are ignored;
    /// ids are percent-decoded.
    pub fn parse(raw: &str) -> PageRoute {
        let path = strip_query_frag(raw.trim());
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let decode = |s: &str| {
            urlencoding::decode(s)
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| s.to_string())
        };

        match segments.as_slice() {
            [] => PageRoute::Home,
            ["product", id] => PageRoute::Product { id: decode(id) },
            ["user", id] => PageRoute::User { id: decode(id) },
            ["login"] => PageRoute::Login,
            ["register"] => PageRoute::Register,
            ["sell"] => PageRoute::Sell,
            ["profile"] => PageRoute::Profile,
            ["messages"] => PageRoute::Messages,
            ["favorites"] => PageRoute::Favorites,
            ["settings"] => PageRoute::Settings,
            _ => PageRoute::NotFound,
        }
    }

    pub fn is_auth_page(&self) -> bool {
        matches!(self, PageRoute::Login | PageRoute::Register)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Continue,
    Redirect(String),
}

/// Route guard configured with the protected prefixes
#[derive(Clone, Debug)]
pub struct RouteGuard {
    protected: Vec<String>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        RouteGuard::new(PROTECTED_PREFIXES.iter().map(|s| s.to_string()).collect())
    }
}

impl RouteGuard {
    pub fn new(protected: Vec<String>) -> Self {
        let protected = protected
            .into_iter()
            .map(|p| format!("/{}", p.trim().trim_matches('/')))
            .filter(|p| p != "/")
            .collect();
        RouteGuard { protected }
    }

    pub fn protected(&self) -> &[String] {
        &self.protected
    }

    /// `/sell` and `/sell/new` are covered by `/sell`; `/seller` is not
    pub fn is_protected(&self, path: &str) -> bool {
        let path = strip_query_frag(path);
        self.protected.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// `query` is the raw query string without the leading `?`
    pub fn check(&self, path: &str, query: Option<&str>, has_auth: bool) -> GuardDecision {
        if !has_auth && self.is_protected(path) {
            let target = match query.filter(|q| !q.is_empty()) {
                Some(q) => format!("{path}?{q}"),
                None => path.to_string(),
            };
            log::debug!("[router] {path} requires a session");
            return GuardDecision::Redirect(login_redirect(&target));
        }
        if has_auth && PageRoute::parse(path).is_auth_page() {
            return GuardDecision::Redirect("/".to_string());
        }
        GuardDecision::Continue
    }
}

/// Guard decision with the default protected prefixes
pub fn guard(path: &str, query: Option<&str>, has_auth: bool) -> GuardDecision {
    RouteGuard::default().check(path, query, has_auth)
}

pub fn login_redirect(target: &str) -> String {
    format!("{LOGIN_PATH}?redirect={}", urlencoding::encode(target))
}

/// Only same-site absolute paths survive; everything else goes home.
pub fn sanitize_redirect(target: Option<&str>) -> String {
    let Some(t) = target.map(str::trim) else {
        return "/".to_string();
    };
    let local = t.starts_with('/')
        && !t.starts_with("//")
        && !t.starts_with("/\\")
        && !t.contains("://")
        && !t.chars().any(char::is_control);
    if local {
        t.to_string()
    } else {
        "/".to_string()
    }
}

/// First value of `name` in a raw query string, percent-decoded
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?.split('&').find_map(|kv| {
        let (k, v) = kv.split_once('=').unwrap_or((kv, ""));
        if k != name {
            return None;
        }
        urlencoding::decode(&v.replace('+', " "))
            .map(|c| c.into_owned())
            .ok()
    })
}

/// `redirect` parameter of a query string, decoded and sanitized
pub fn redirect_from_query(query: Option<&str>) -> String {
    sanitize_redirect(query_param(query, "redirect").as_deref())
}
