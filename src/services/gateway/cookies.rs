//! Cookie synchronization for a single gateway evaluation.
//!
//! `SessionCookies` keeps the request-side cookie view and the response-side writes
//! together. A write issued by the identity provider (a rotated token, say) is visible
//! to later reads in the same evaluation, to the downstream handlers through the
//! rewritten `Cookie` header, and to the client through `Set-Cookie`.
//!
//! The response writes are drained exactly once, when the decision is finalized.

use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderMap, HeaderValue, header};
use cookie::Cookie;
use cookie::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct SessionCookies {
    // Ordered as received; names are unique.
    request: Vec<(String, String)>,
    // Pending `Set-Cookie` writes, one per name, last write wins.
    response: Vec<Cookie<'static>>,
}

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every `Cookie` header. Malformed pairs are skipped; for a repeated name the
    /// first occurrence is kept, as user agents send the most specific cookie first.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Self::new();

        for value in headers.get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };

            for parsed in Cookie::split_parse(raw).flatten() {
                if cookies.get(parsed.name()).is_none() {
                    cookies
                        .request
                        .push((parsed.name().to_string(), parsed.value().to_string()));
                }
            }
        }

        cookies
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.request
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Current request-side view, including any writes made so far.
    pub fn all(&self) -> impl Iterator<Item = (&str, &str)> {
        self.request.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_empty()
    }

    /// Apply a batch of writes in order.
    pub fn set_all<I>(&mut self, cookies: I)
    where
        I: IntoIterator<Item = Cookie<'static>>,
    {
        for cookie in cookies {
            self.set(cookie);
        }
    }

    /// Overwrite the request-side entry and record the cookie for the response.
    pub fn set(&mut self, cookie: Cookie<'static>) {
        let name = cookie.name();

        if is_removal(&cookie) {
            self.request.retain(|(n, _)| n != name);
        } else if let Some(entry) = self.request.iter_mut().find(|(n, _)| n == name) {
            entry.1 = cookie.value().to_string();
        } else {
            self.request
                .push((name.to_string(), cookie.value().to_string()));
        }

        self.response.retain(|c| c.name() != name);
        self.response.push(cookie);
    }

    /// Whether any write is pending for the response.
    pub fn is_dirty(&self) -> bool {
        !self.response.is_empty()
    }

    /// The request-side view rendered as a single `Cookie` header value.
    /// `Ok(None)` for an empty view; `Err` when a value is not valid in a header.
    pub fn request_header(&self) -> Result<Option<HeaderValue>, InvalidHeaderValue> {
        if self.request.is_empty() {
            return Ok(None);
        }

        let joined = self
            .request
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join("; ");

        HeaderValue::from_str(&joined).map(Some)
    }

    /// Replace the `Cookie` headers of an outgoing request with the synchronized view.
    /// If the view cannot be rendered, the inbound headers are left as they were.
    pub fn apply_to_request(&self, headers: &mut HeaderMap) {
        match self.request_header() {
            Ok(value) => {
                headers.remove(header::COOKIE);
                if let Some(value) = value {
                    headers.insert(header::COOKIE, value);
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "synchronized cookies are not a valid header value, keeping inbound cookies"
                );
            }
        }
    }

    /// Drain the pending writes. Called once, when the decision is built.
    pub fn take_response_cookies(&mut self) -> Vec<Cookie<'static>> {
        std::mem::take(&mut self.response)
    }
}

/// Append one `Set-Cookie` header per cookie.
pub fn append_set_cookie_headers(headers: &mut HeaderMap, cookies: &[Cookie<'static>]) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(err) => {
                tracing::warn!(
                    cookie = cookie.name(),
                    error = %err,
                    "dropping cookie that is not a valid header value"
                );
            }
        }
    }
}

fn is_removal(cookie: &Cookie<'_>) -> bool {
    cookie.value().is_empty() || cookie.max_age().is_some_and(|age| age <= Duration::ZERO)
}
