use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::router::PROTECTED_PREFIXES;

/// Vitrina - marketplace frontend server
///
/// Serves page view models for the marketplace on top of the backend API.
/// Configuration priority: CLI args > Environment variables > Config file > Defaults
#[derive(Parser, Debug, Default)]
#[command(name = "vitrina-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Marketplace frontend server", long_about = None)]
pub struct CliArgs {
    /// Backend API base URL
    #[arg(long, env = "API_URL")]
    pub api_url: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Production mode (Secure cookies)
    #[arg(long, env = "PRODUCTION")]
    pub production: Option<bool>,

    /// Backend request timeout in milliseconds (1000-60000)
    #[arg(long, env = "API_TIMEOUT_MS")]
    pub api_timeout_ms: Option<u64>,

    /// Retry attempts for failed GET requests (0-10)
    #[arg(long, env = "API_RETRIES")]
    pub api_retries: Option<u8>,

    /// How long fetched data counts as fresh, in milliseconds (0-3600000)
    #[arg(long, env = "QUERY_STALE_MS")]
    pub query_stale_ms: Option<u64>,

    /// Entries kept per read-model cache before eviction (1-100000)
    #[arg(long, env = "QUERY_CAPACITY")]
    pub query_capacity: Option<u64>,

    /// Cached entries are dropped this long after being written, in milliseconds (1000-86400000)
    #[arg(long, env = "QUERY_TTL_MS")]
    pub query_ttl_ms: Option<u64>,

    /// Products per listing page (1-100)
    #[arg(long, env = "PAGE_SIZE")]
    pub page_size: Option<u32>,

    /// Maximum results from brand/location search (1-50)
    #[arg(long, env = "SEARCH_RESULT_CAP")]
    pub search_result_cap: Option<usize>,

    /// Comma-separated path prefixes that require a session (e.g., "/sell,/profile")
    #[arg(long, env = "PROTECTED_ROUTES")]
    pub protected_routes: Option<String>,

    /// Allowed CORS origin (any origin when unset)
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Optional config file path (TOML format)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

/// Configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub listing: ListingSection,
    #[serde(default)]
    pub routes: RoutesSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub production: Option<bool>,
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApiSection {
    pub url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retries: Option<u8>,
    pub stale_ms: Option<u64>,
    pub cache_capacity: Option<u64>,
    pub cache_ttl_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListingSection {
    pub page_size: Option<u32>,
    pub search_result_cap: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RoutesSection {
    pub protected: Option<Vec<String>>,
}

impl ConfigFile {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub host: String,
    pub port: u16,
    pub production: bool,
    pub api_timeout_ms: u64,
    pub api_retries: u8,
    pub query_stale_ms: u64,
    pub query_capacity: u64,
    pub query_ttl_ms: u64,
    pub page_size: u32,
    pub search_result_cap: usize,
    pub protected_routes: Vec<String>,
    pub cors_origin: Option<String>,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

fn parse_route_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load configuration from CLI args, environment variables and the optional
/// config file
pub fn load() -> Result<Config> {
    Config::from_args(CliArgs::parse())
}

impl Config {
    pub fn from_args(args: CliArgs) -> Result<Config> {
        let file = match &args.config_file {
            Some(path) => ConfigFile::load_from_file(path)?,
            None => ConfigFile::default(),
        };
        Self::merge(args, file)
    }

    /// CLI/env values win over file values; defaults fill the rest
    pub fn merge(args: CliArgs, file: ConfigFile) -> Result<Config> {
        let api_url = args
            .api_url
            .or(file.api.url)
            .unwrap_or_else(|| "http://localhost:4000/api".to_string());
        validate_url(&api_url, "API_URL")?;

        let api_timeout_ms = args.api_timeout_ms.or(file.api.timeout_ms).unwrap_or(10_000);
        let api_timeout_ms = validate_in_range(api_timeout_ms, 1000, 60_000, "API_TIMEOUT_MS")?;

        let api_retries = args.api_retries.or(file.api.retries).unwrap_or(2);
        let api_retries = validate_in_range(api_retries, 0, 10, "API_RETRIES")?;

        let query_stale_ms = args.query_stale_ms.or(file.api.stale_ms).unwrap_or(30_000);
        let query_stale_ms = validate_in_range(query_stale_ms, 0, 3_600_000, "QUERY_STALE_MS")?;

        let query_capacity = args.query_capacity.or(file.api.cache_capacity).unwrap_or(1_000);
        let query_capacity = validate_in_range(query_capacity, 1, 100_000, "QUERY_CAPACITY")?;

        let query_ttl_ms = args.query_ttl_ms.or(file.api.cache_ttl_ms).unwrap_or(600_000);
        let query_ttl_ms = validate_in_range(query_ttl_ms, 1000, 86_400_000, "QUERY_TTL_MS")?;

        let page_size = args.page_size.or(file.listing.page_size).unwrap_or(24);
        let page_size = validate_in_range(page_size, 1, 100, "PAGE_SIZE")?;

        let search_result_cap = args
            .search_result_cap
            .or(file.listing.search_result_cap)
            .unwrap_or(crate::combobox::DEFAULT_RESULT_CAP);
        let search_result_cap = validate_in_range(search_result_cap, 1, 50, "SEARCH_RESULT_CAP")?;

        let protected_routes = args
            .protected_routes
            .map(|s| parse_route_list(&s))
            .or(file.routes.protected)
            .unwrap_or_else(|| PROTECTED_PREFIXES.iter().map(|s| s.to_string()).collect());
        if let Some(bad) = protected_routes.iter().find(|r| !r.trim().starts_with('/')) {
            return Err(anyhow!("PROTECTED_ROUTES entries must start with '/', got {bad}"));
        }

        Ok(Config {
            api_url,
            host: args
                .host
                .or(file.server.host)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: args.port.or(file.server.port).unwrap_or(3000),
            production: args.production.or(file.server.production).unwrap_or(false),
            api_timeout_ms,
            api_retries,
            query_stale_ms,
            query_capacity,
            query_ttl_ms,
            page_size,
            search_result_cap,
            protected_routes,
            cors_origin: args.cors_origin.or(file.server.cors_origin),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Log current configuration
    pub fn print_summary(&self) {
        log::info!("[config] Vitrina configuration:");
        log::info!("[config]   API URL: {}", self.api_url);
        log::info!("[config]   Listen: {}", self.bind_addr());
        log::info!("[config]   Production: {}", self.production);
        log::info!(
            "[config]   API timeout: {}ms, retries: {}",
            self.api_timeout_ms,
            self.api_retries
        );
        log::info!(
            "[config]   Query stale after: {}ms, cache: {} entries, ttl {}ms",
            self.query_stale_ms,
            self.query_capacity,
            self.query_ttl_ms
        );
        log::info!("[config]   Page size: {}", self.page_size);
        log::info!("[config]   Protected: {}", self.protected_routes.join(", "));
        if let Some(origin) = &self.cors_origin {
            log::info!("[config]   CORS origin: {origin}");
        }
    }
}
