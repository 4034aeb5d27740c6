/// Factory: build the route policy and the gateway from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::services::gateway::{Gateway, PolicyError, RoutePolicy};
use crate::services::identity::IdentityChecker;

/// Compiled-in defaults, with any list given in `Config` replacing its default.
pub fn build_route_policy(config: &Config) -> Result<RoutePolicy, PolicyError> {
    let defaults = RoutePolicy::default();

    RoutePolicy::new(
        config
            .public_paths
            .as_deref()
            .unwrap_or(defaults.public_paths()),
        config
            .public_prefixes
            .as_deref()
            .unwrap_or(defaults.public_prefixes()),
        config
            .protected_prefixes
            .as_deref()
            .unwrap_or(defaults.protected_prefixes()),
    )
}

pub fn build_gateway(
    config: &Config,
    identity: Arc<dyn IdentityChecker>,
) -> Result<Arc<Gateway>, AppError> {
    let policy = build_route_policy(config)?;

    tracing::info!(
        public_paths = ?policy.public_paths(),
        public_prefixes = ?policy.public_prefixes(),
        protected_prefixes = ?policy.protected_prefixes(),
        "route policy loaded"
    );

    Ok(Arc::new(Gateway::new(Arc::new(policy), identity)))
}
