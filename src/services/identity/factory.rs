/// Factory: build the identity checker from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::services::identity::{HttpIdentityProvider, IdentityChecker, SessionCookieSettings};

pub fn session_cookie_settings(config: &Config) -> SessionCookieSettings {
    SessionCookieSettings {
        access_name: config.access_cookie_name.clone(),
        refresh_name: config.refresh_cookie_name.clone(),
        refresh_max_age_seconds: config.refresh_cookie_max_age_seconds,
        secure: config.session_cookie_secure,
    }
}

pub fn build_identity_checker(config: &Config) -> Result<Arc<dyn IdentityChecker>, AppError> {
    let provider = HttpIdentityProvider::new(
        config.identity_provider_url.clone(),
        config.identity_provider_api_key.clone(),
        config.identity_timeout,
        session_cookie_settings(config),
    )?;

    tracing::info!(
        backend = provider.backend_name(),
        base_url = %config.identity_provider_url,
        "identity provider configured"
    );

    Ok(Arc::new(provider))
}
