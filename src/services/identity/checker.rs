use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::services::gateway::cookies::SessionCookies;

/// The user a session belongs to.
///
/// The gateway only cares whether one is present; handlers downstream get the
/// whole value through request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: Uuid) -> Self {
        Self { id, email: None }
    }
}

/// Identity-provider failures.
///
/// Kept apart from `AppError`: the gateway recovers from every variant by treating the
/// caller as anonymous.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("identity provider returned {status}")]
    Status { status: StatusCode },
    #[error("identity provider response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("identity provider endpoint is invalid: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("identity provider client could not be built: {0}")]
    Client(#[source] reqwest::Error),
}

/// "Who, if anyone, does this cookie set authenticate?"
///
/// `cookies` is both the reader and the writer: an implementation may rotate
/// credentials by calling `SessionCookies::set_all`, and the gateway echoes those writes
/// into the response whatever the decision turns out to be.
#[async_trait]
pub trait IdentityChecker: Send + Sync {
    // Backend name for logs.
    fn backend_name(&self) -> &'static str;

    async fn current_user(
        &self,
        cookies: &mut SessionCookies,
    ) -> Result<Option<AuthenticatedUser>, IdentityError>;
}
