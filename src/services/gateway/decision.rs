//! Identity query + route classification → exactly one `GatewayDecision`.

use std::sync::Arc;

use cookie::Cookie;

use crate::services::gateway::cookies::SessionCookies;
use crate::services::gateway::policy::{Classification, RoutePolicy, SITE_ROOT};
use crate::services::identity::{AuthenticatedUser, IdentityChecker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Redirect,
}

/// Result of one evaluation. Both variants carry every cookie the identity
/// provider wrote, so a refreshed session survives a redirect too.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayDecision {
    Continue {
        user: Option<AuthenticatedUser>,
        cookies: Vec<Cookie<'static>>,
    },
    Redirect {
        location: &'static str,
        cookies: Vec<Cookie<'static>>,
    },
}

impl GatewayDecision {
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Continue { .. } => Outcome::Continue,
            Self::Redirect { .. } => Outcome::Redirect,
        }
    }

    pub fn cookies(&self) -> &[Cookie<'static>] {
        match self {
            Self::Continue { cookies, .. } | Self::Redirect { cookies, .. } => cookies,
        }
    }
}

/// Anonymous callers are turned away from protected routes; everything else continues.
pub fn decide(classification: Classification, authenticated: bool) -> Outcome {
    match (classification, authenticated) {
        (Classification::Protected, false) => Outcome::Redirect,
        _ => Outcome::Continue,
    }
}

#[derive(Clone)]
pub struct Gateway {
    policy: Arc<RoutePolicy>,
    identity: Arc<dyn IdentityChecker>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("policy", &self.policy)
            .field("identity", &self.identity.backend_name())
            .finish()
    }
}

impl Gateway {
    pub fn new(policy: Arc<RoutePolicy>, identity: Arc<dyn IdentityChecker>) -> Self {
        Self { policy, identity }
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Single pass: identity query, classification, decision, then drain the cookie writes.
    ///
    /// Identity-provider failures never surface: the caller is treated as anonymous and
    /// the request goes through normal classification.
    pub async fn evaluate(&self, path: &str, cookies: &mut SessionCookies) -> GatewayDecision {
        let user = match self.identity.current_user(cookies).await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    backend = self.identity.backend_name(),
                    path,
                    "identity check failed, treating caller as anonymous"
                );
                None
            }
        };

        let classification = self.policy.classify(path);
        let outcome = decide(classification, user.is_some());
        let written = cookies.take_response_cookies();

        tracing::debug!(
            path,
            ?classification,
            authenticated = user.is_some(),
            cookies_written = written.len(),
            "gateway decision"
        );

        match outcome {
            Outcome::Continue => GatewayDecision::Continue {
                user,
                cookies: written,
            },
            Outcome::Redirect => {
                tracing::info!(path, "anonymous request to protected route, redirecting");
                GatewayDecision::Redirect {
                    location: SITE_ROOT,
                    cookies: written,
                }
            }
        }
    }
}
