//! In-memory identity provider for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cookie::Cookie;
use reqwest::StatusCode;

use crate::services::gateway::cookies::SessionCookies;
use crate::services::identity::{AuthenticatedUser, IdentityChecker, IdentityError};

pub const ACCESS_COOKIE: &str = "sb-access-token";
pub const REFRESH_COOKIE: &str = "sb-refresh-token";

#[derive(Debug, Default)]
pub struct FakeIdentity {
    sessions: HashMap<String, AuthenticatedUser>,
    // refresh token -> (rotated access token, user)
    refreshes: HashMap<String, (String, AuthenticatedUser)>,
    extra_writes: Vec<Cookie<'static>>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, access_token: &str, user: AuthenticatedUser) -> Self {
        self.sessions.insert(access_token.to_string(), user);
        self
    }

    pub fn with_refresh(
        mut self,
        refresh_token: &str,
        new_access_token: &str,
        user: AuthenticatedUser,
    ) -> Self {
        self.refreshes.insert(
            refresh_token.to_string(),
            (new_access_token.to_string(), user),
        );
        self
    }

    /// Cookies written on every call, before the session lookup.
    pub fn with_writes<I>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = Cookie<'static>>,
    {
        self.extra_writes.extend(cookies);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityChecker for FakeIdentity {
    fn backend_name(&self) -> &'static str {
        "fake"
    }

    async fn current_user(
        &self,
        cookies: &mut SessionCookies,
    ) -> Result<Option<AuthenticatedUser>, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        cookies.set_all(self.extra_writes.iter().cloned());

        if self.unavailable {
            return Err(IdentityError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
            });
        }

        if let Some(user) = cookies
            .get(ACCESS_COOKIE)
            .and_then(|token| self.sessions.get(token))
        {
            return Ok(Some(user.clone()));
        }

        let refreshed = cookies
            .get(REFRESH_COOKIE)
            .and_then(|token| self.refreshes.get(token))
            .cloned();

        match refreshed {
            Some((access_token, user)) => {
                cookies.set(Cookie::new(ACCESS_COOKIE, access_token));
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}
