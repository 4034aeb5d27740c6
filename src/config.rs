/*
 * Responsibility
 * - Read settings from the environment (identity provider, session cookies, route policy)
 * - Validate them once at startup (a missing value fails the boot)
 */
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_IDENTITY_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_REFRESH_COOKIE_MAX_AGE_SECONDS: i64 = 60 * 60 * 24 * 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.unwrap_or("development").to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub identity_provider_url: Url,
    pub identity_provider_api_key: String,
    pub identity_timeout: Duration,

    pub access_cookie_name: String,
    pub refresh_cookie_name: String,
    pub refresh_cookie_max_age_seconds: i64,
    pub session_cookie_secure: bool,

    // `None` keeps the compiled-in list.
    pub public_paths: Option<Vec<String>>,
    pub public_prefixes: Option<Vec<String>>,
    pub protected_prefixes: Option<Vec<String>>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the api key
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("identity_provider_url", &self.identity_provider_url.as_str())
            .field("identity_timeout", &self.identity_timeout)
            .field("access_cookie_name", &self.access_cookie_name)
            .field("refresh_cookie_name", &self.refresh_cookie_name)
            .field("session_cookie_secure", &self.session_cookie_secure)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => DEFAULT_PORT,
        };
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let identity_provider_url = lookup("IDENTITY_PROVIDER_URL")
            .ok_or(ConfigError::Missing("IDENTITY_PROVIDER_URL"))
            .and_then(|raw| {
                parse_base_url(&raw).ok_or(ConfigError::Invalid("IDENTITY_PROVIDER_URL"))
            })?;

        let identity_provider_api_key = lookup("IDENTITY_PROVIDER_API_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("IDENTITY_PROVIDER_API_KEY"))?;

        let identity_timeout = Duration::from_secs(parse_or(
            &lookup,
            "IDENTITY_TIMEOUT_SECONDS",
            DEFAULT_IDENTITY_TIMEOUT_SECONDS,
        )?);

        let access_cookie_name =
            lookup("ACCESS_COOKIE_NAME").unwrap_or_else(|| "sb-access-token".to_string());
        let refresh_cookie_name =
            lookup("REFRESH_COOKIE_NAME").unwrap_or_else(|| "sb-refresh-token".to_string());
        if access_cookie_name == refresh_cookie_name {
            return Err(ConfigError::Invalid("REFRESH_COOKIE_NAME"));
        }

        let refresh_cookie_max_age_seconds = parse_or(
            &lookup,
            "REFRESH_COOKIE_MAX_AGE_SECONDS",
            DEFAULT_REFRESH_COOKIE_MAX_AGE_SECONDS,
        )?;

        let session_cookie_secure =
            parse_or(&lookup, "SESSION_COOKIE_SECURE", app_env.is_production())?;

        Ok(Self {
            addr,
            app_env,
            identity_provider_url,
            identity_provider_api_key,
            identity_timeout,
            access_cookie_name,
            refresh_cookie_name,
            refresh_cookie_max_age_seconds,
            session_cookie_secure,
            public_paths: list(&lookup, "PUBLIC_PATHS"),
            public_prefixes: list(&lookup, "PUBLIC_PREFIXES"),
            protected_prefixes: list(&lookup, "PROTECTED_PREFIXES"),
        })
    }
}

// Endpoints are joined below the base, so it needs a trailing slash.
fn parse_base_url(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Some(url)
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn list<F>(lookup: &F, key: &str) -> Option<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
