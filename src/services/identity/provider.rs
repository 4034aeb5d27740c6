//! HTTP client for the managed auth backend (GoTrue-style REST API).
//!
//! - `GET  auth/v1/user` resolves an access token to its user.
//! - `POST auth/v1/token?grant_type=refresh_token` rotates an expired session.
//!
//! Tokens are opaque here: validation, signing and expiry policy all live in the backend.

use std::time::Duration;

use async_trait::async_trait;
use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, SameSite};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::services::gateway::cookies::SessionCookies;
use crate::services::identity::checker::{AuthenticatedUser, IdentityChecker, IdentityError};

const USER_ENDPOINT: &str = "auth/v1/user";
const TOKEN_ENDPOINT: &str = "auth/v1/token";

/// Names and attributes of the two session cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookieSettings {
    pub access_name: String,
    pub refresh_name: String,
    pub refresh_max_age_seconds: i64,
    pub secure: bool,
}

impl SessionCookieSettings {
    fn cookie(&self, name: &str, value: String, max_age_seconds: i64) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(CookieDuration::seconds(max_age_seconds))
            .build()
    }

    fn removal(&self, name: &str) -> Cookie<'static> {
        let mut cookie = self.cookie(name, String::new(), 0);
        cookie.make_removal();
        cookie
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshedSession {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: AuthenticatedUser,
}

#[derive(Clone)]
pub struct HttpIdentityProvider {
    http: Client,
    base_url: Url,
    api_key: String,
    cookies: SessionCookieSettings,
}

impl std::fmt::Debug for HttpIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the api key
        f.debug_struct("HttpIdentityProvider")
            .field("base_url", &self.base_url.as_str())
            .field("cookies", &self.cookies)
            .finish()
    }
}

impl HttpIdentityProvider {
    /// `base_url` must end with `/` so endpoints join below it.
    pub fn new(
        base_url: Url,
        api_key: impl Into<String>,
        timeout: Duration,
        cookies: SessionCookieSettings,
    ) -> Result<Self, IdentityError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(IdentityError::Client)?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            cookies,
        })
    }

    async fn fetch_user(
        &self,
        access_token: &str,
    ) -> Result<Option<AuthenticatedUser>, IdentityError> {
        let response = self
            .http
            .get(self.base_url.join(USER_ENDPOINT)?)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(IdentityError::Transport)?;

        match response.status() {
            status if status.is_success() => response
                .json::<AuthenticatedUser>()
                .await
                .map(Some)
                .map_err(IdentityError::Decode),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(IdentityError::Status { status }),
        }
    }

    // Ok(None) when the backend rejects the refresh token itself.
    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> Result<Option<RefreshedSession>, IdentityError> {
        let mut url = self.base_url.join(TOKEN_ENDPOINT)?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(IdentityError::Transport)?;

        match response.status() {
            status if status.is_success() => response
                .json::<RefreshedSession>()
                .await
                .map(Some)
                .map_err(IdentityError::Decode),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Ok(None),
            status => Err(IdentityError::Status { status }),
        }
    }
}

#[async_trait]
impl IdentityChecker for HttpIdentityProvider {
    fn backend_name(&self) -> &'static str {
        "http"
    }

    async fn current_user(
        &self,
        cookies: &mut SessionCookies,
    ) -> Result<Option<AuthenticatedUser>, IdentityError> {
        let access_token = cookies.get(&self.cookies.access_name).map(str::to_string);
        let refresh_token = cookies.get(&self.cookies.refresh_name).map(str::to_string);

        if let Some(access_token) = access_token {
            if let Some(user) = self.fetch_user(&access_token).await? {
                return Ok(Some(user));
            }
            tracing::debug!("access token rejected by identity provider");
        }

        let Some(refresh_token) = refresh_token else {
            return Ok(None);
        };

        match self.refresh_session(&refresh_token).await? {
            Some(session) => {
                tracing::debug!(user_id = %session.user.id, "session refreshed");
                cookies.set_all([
                    self.cookies.cookie(
                        &self.cookies.access_name,
                        session.access_token,
                        // Max-Age <= 0 would read as a removal
                        session.expires_in.max(1),
                    ),
                    self.cookies.cookie(
                        &self.cookies.refresh_name,
                        session.refresh_token,
                        self.cookies.refresh_max_age_seconds,
                    ),
                ]);
                Ok(Some(session.user))
            }
            None => {
                tracing::debug!("refresh token rejected, clearing session cookies");
                cookies.set_all([
                    self.cookies.removal(&self.cookies.access_name),
                    self.cookies.removal(&self.cookies.refresh_name),
                ]);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        Json, Router,
        extract::Query,
        http::{HeaderMap, HeaderValue, header},
        response::{IntoResponse, Response},
        routing::{get, post},
    };
    use serde_json::json;

    use super::*;

    const API_KEY: &str = "test-key";
    const USER_ID: &str = "6f1c1c32-5a59-4f38-9c41-2f6c1f0a9e11";

    fn settings() -> SessionCookieSettings {
        SessionCookieSettings {
            access_name: "sb-access-token".to_string(),
            refresh_name: "sb-refresh-token".to_string(),
            refresh_max_age_seconds: 86_400,
            secure: false,
        }
    }

    async fn user(headers: HeaderMap) -> Response {
        if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
            return StatusCode::BAD_REQUEST.into_response();
        }

        match headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        {
            Some("Bearer good-access") | Some("Bearer new-access") => {
                Json(json!({ "id": USER_ID, "email": "ayse@example.com" })).into_response()
            }
            Some("Bearer broken") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    async fn token(
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<serde_json::Value>,
    ) -> Response {
        if query.get("grant_type").map(String::as_str) != Some("refresh_token") {
            return StatusCode::BAD_REQUEST.into_response();
        }

        match body["refresh_token"].as_str() {
            Some("good-refresh") => Json(json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_in": 3600,
                "user": { "id": USER_ID }
            }))
            .into_response(),
            Some("instant-expiry") => Json(json!({
                "access_token": "new-access",
                "refresh_token": "next-refresh",
                "expires_in": 0,
                "user": { "id": USER_ID }
            }))
            .into_response(),
            Some("backend-down") => StatusCode::BAD_GATEWAY.into_response(),
            _ => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_grant" })),
            )
                .into_response(),
        }
    }

    async fn spawn_backend() -> Url {
        let app = Router::new()
            .route("/auth/v1/user", get(user))
            .route("/auth/v1/token", post(token));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn provider(base_url: Url) -> HttpIdentityProvider {
        HttpIdentityProvider::new(base_url, API_KEY, Duration::from_secs(5), settings()).unwrap()
    }

    fn cookies(header_value: &str) -> SessionCookies {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(header_value).unwrap());
        SessionCookies::from_headers(&headers)
    }

    #[tokio::test]
    async fn valid_access_token_resolves_user_without_writes() {
        let provider = provider(spawn_backend().await);
        let mut cookies = cookies("sb-access-token=good-access; sb-refresh-token=good-refresh");

        let user = provider.current_user(&mut cookies).await.unwrap().unwrap();

        assert_eq!(user.id.to_string(), USER_ID);
        assert_eq!(user.email.as_deref(), Some("ayse@example.com"));
        assert!(!cookies.is_dirty());
    }

    #[tokio::test]
    async fn expired_access_token_is_refreshed_and_written_back() {
        let provider = provider(spawn_backend().await);
        let mut cookies = cookies("sb-access-token=stale; sb-refresh-token=good-refresh");

        let user = provider.current_user(&mut cookies).await.unwrap();

        assert!(user.is_some());
        assert_eq!(cookies.get("sb-access-token"), Some("new-access"));
        assert_eq!(cookies.get("sb-refresh-token"), Some("new-refresh"));

        let written = cookies.take_response_cookies();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].name(), "sb-access-token");
        assert_eq!(written[0].max_age(), Some(CookieDuration::seconds(3600)));
        assert_eq!(written[0].http_only(), Some(true));
        assert_eq!(written[1].value(), "new-refresh");
        assert_eq!(written[1].max_age(), Some(CookieDuration::seconds(86_400)));
    }

    #[tokio::test]
    async fn rejected_refresh_token_clears_the_session() {
        let provider = provider(spawn_backend().await);
        let mut cookies = cookies("sb-refresh-token=revoked; theme=dark");

        let user = provider.current_user(&mut cookies).await.unwrap();

        assert!(user.is_none());
        assert_eq!(cookies.get("sb-refresh-token"), None);
        assert_eq!(cookies.get("theme"), Some("dark"));

        let written = cookies.take_response_cookies();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|c| c.value().is_empty()));
    }

    #[tokio::test]
    async fn no_session_cookies_means_no_backend_call() {
        // Nothing listens on the discard port; a request would fail.
        let provider = provider(Url::parse("http://127.0.0.1:9/").unwrap());
        let mut cookies = cookies("theme=dark");

        let user = provider.current_user(&mut cookies).await.unwrap();

        assert!(user.is_none());
        assert!(!cookies.is_dirty());
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let provider = provider(Url::parse("http://127.0.0.1:9/").unwrap());
        let mut cookies = cookies("sb-access-token=good-access");

        let err = provider.current_user(&mut cookies).await.unwrap_err();

        assert!(matches!(err, IdentityError::Transport(_)));
    }

    #[tokio::test]
    async fn unexpected_status_is_reported() {
        let provider = provider(spawn_backend().await);
        let mut cookies = cookies("sb-access-token=broken");

        let err = provider.current_user(&mut cookies).await.unwrap_err();

        assert!(matches!(
            err,
            IdentityError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR
            }
        ));
    }

    #[tokio::test]
    async fn refresh_endpoint_failure_is_reported_without_writes() {
        let provider = provider(spawn_backend().await);
        let mut cookies = cookies("sb-refresh-token=backend-down");

        let err = provider.current_user(&mut cookies).await.unwrap_err();

        assert!(matches!(
            err,
            IdentityError::Status {
                status: StatusCode::BAD_GATEWAY
            }
        ));
        assert!(!cookies.is_dirty());
        assert_eq!(cookies.get("sb-refresh-token"), Some("backend-down"));
    }

    #[tokio::test]
    async fn non_positive_lifetime_keeps_the_refreshed_access_cookie() {
        let provider = provider(spawn_backend().await);
        let mut cookies = cookies("sb-refresh-token=instant-expiry");

        let user = provider.current_user(&mut cookies).await.unwrap();

        assert!(user.is_some());
        assert_eq!(cookies.get("sb-access-token"), Some("new-access"));
        let written = cookies.take_response_cookies();
        assert_eq!(written[0].max_age(), Some(CookieDuration::seconds(1)));
    }

    #[tokio::test]
    async fn refreshed_session_reaches_the_client_through_the_router() {
        use std::sync::Arc;

        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        use crate::app::build_router;
        use crate::services::gateway::{Gateway, RoutePolicy};
        use crate::state::AppState;

        let identity = Arc::new(provider(spawn_backend().await));
        let gateway = Gateway::new(Arc::new(RoutePolicy::default()), identity);
        let app = build_router(AppState::new(Arc::new(gateway)));

        let res = app
            .oneshot(
                Request::get("/basvurular/9")
                    .header(
                        header::COOKIE,
                        "sb-access-token=stale; sb-refresh-token=good-refresh",
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);

        let written = res
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| Cookie::parse(v.to_str().unwrap().to_string()).unwrap())
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect::<Vec<_>>();
        assert_eq!(
            written,
            [
                ("sb-access-token".to_string(), "new-access".to_string()),
                ("sb-refresh-token".to_string(), "new-refresh".to_string()),
            ]
        );

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let page: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(page["signed_in"], true);
    }

    #[test]
    fn debug_output_hides_api_key() {
        let provider = provider(Url::parse("http://127.0.0.1:9/").unwrap());
        assert!(!format!("{provider:?}").contains(API_KEY));
    }
}
