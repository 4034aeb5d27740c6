//! Route policy: which paths anyone may visit and which need a session.
//!
//! The policy is built once at startup and shared read-only by every request.
//! Prefix entries match whole path segments only, so `/basvurular` covers
//! `/basvurular/42` but not `/basvurular-arsiv`.

use thiserror::Error;

/// Redirect target for anonymous callers. Always public.
pub const SITE_ROOT: &str = "/";

const DEFAULT_PUBLIC_PATHS: &[&str] = &[SITE_ROOT];

const DEFAULT_PUBLIC_PREFIXES: &[&str] = &[
    "/giris",
    "/kayit",
    "/auth",
    "/ilan",
    "/ilanlar",
    "/profil",
    "/sifremi-unuttum",
];

const DEFAULT_PROTECTED_PREFIXES: &[&str] = &["/basvurular", "/yeni-ilan", "/hesabim", "/ilanlarim"];

// Static assets never reach the gateway logic.
const ASSET_PREFIXES: &[&str] = &["/_next/static", "/_next/image", "/static"];
const ASSET_PATHS: &[&str] = &["/favicon.ico"];
const ASSET_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "webp", "ico"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Public,
    Protected,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("route entry must start with '/': {0:?}")]
    NotAbsolute(String),
    #[error("{set} may not contain the site root as a prefix")]
    RootPrefix { set: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    public_paths: Vec<String>,
    public_prefixes: Vec<String>,
    protected_prefixes: Vec<String>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        let owned = |entries: &[&str]| entries.iter().map(|s| s.to_string()).collect();

        Self {
            public_paths: owned(DEFAULT_PUBLIC_PATHS),
            public_prefixes: owned(DEFAULT_PUBLIC_PREFIXES),
            protected_prefixes: owned(DEFAULT_PROTECTED_PREFIXES),
        }
    }
}

impl RoutePolicy {
    /// Build a policy from raw entries, normalizing trailing separators.
    pub fn new<P, Q, R>(
        public_paths: P,
        public_prefixes: Q,
        protected_prefixes: R,
    ) -> Result<Self, PolicyError>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        Q: IntoIterator,
        Q::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let public_paths = public_paths
            .into_iter()
            .map(|p| normalize_path(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            public_paths,
            public_prefixes: normalize_prefixes(public_prefixes, "public prefixes")?,
            protected_prefixes: normalize_prefixes(protected_prefixes, "protected prefixes")?,
        })
    }

    /// Classify a request path. First match wins:
    /// site root, public paths/prefixes, protected prefixes, then public by default.
    pub fn classify(&self, path: &str) -> Classification {
        if path.is_empty() || path == SITE_ROOT {
            return Classification::Public;
        }

        if self.public_paths.iter().any(|p| p == path)
            || self.public_prefixes.iter().any(|p| segment_match(path, p))
        {
            return Classification::Public;
        }

        if self
            .protected_prefixes
            .iter()
            .any(|p| segment_match(path, p))
        {
            return Classification::Protected;
        }

        Classification::Public
    }

    /// Whether the path is a static asset that skips the gateway entirely.
    /// Paths under a protected prefix never qualify, whatever their extension.
    pub fn is_asset(&self, path: &str) -> bool {
        if self.classify(path) == Classification::Protected {
            return false;
        }

        if ASSET_PATHS.contains(&path) || ASSET_PREFIXES.iter().any(|p| segment_match(path, p)) {
            return true;
        }

        let last_segment = path.rsplit('/').next().unwrap_or_default();
        match last_segment.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ASSET_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }

    pub fn public_paths(&self) -> &[String] {
        &self.public_paths
    }

    pub fn public_prefixes(&self) -> &[String] {
        &self.public_prefixes
    }

    pub fn protected_prefixes(&self) -> &[String] {
        &self.protected_prefixes
    }
}

/// `path` equals `prefix`, or continues it with a path separator.
pub fn segment_match(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn normalize_path(raw: &str) -> Result<String, PolicyError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') {
        return Err(PolicyError::NotAbsolute(raw.to_string()));
    }

    let without_slash = trimmed.trim_end_matches('/');
    if without_slash.is_empty() {
        Ok(SITE_ROOT.to_string())
    } else {
        Ok(without_slash.to_string())
    }
}

fn normalize_prefixes<I>(entries: I, set: &'static str) -> Result<Vec<String>, PolicyError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    entries
        .into_iter()
        .map(|raw| {
            let path = normalize_path(raw.as_ref())?;
            if path == SITE_ROOT {
                return Err(PolicyError::RootPrefix { set });
            }
            Ok(path)
        })
        .collect()
}
