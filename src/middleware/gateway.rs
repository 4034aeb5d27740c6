//! Access-control gateway middleware.
//!
//! Runs ahead of every route handler:
//! 1. read the inbound cookies into a `SessionCookies` view
//! 2. let the `Gateway` query the identity provider and classify the path
//! 3. finalize the decision into a concrete response
//!    - Continue: rewrite the request `Cookie` header if the provider wrote anything,
//!      hand the `AuthenticatedUser` to handlers via extensions, run the handler
//!    - Redirect: 307 to the site root
//!
//! In both cases every cookie write becomes a `Set-Cookie` on the final response.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};

use crate::services::gateway::GatewayDecision;
use crate::services::gateway::cookies::{SessionCookies, append_set_cookie_headers};
use crate::state::AppState;

/// Put the gateway in front of every route (and the fallback) of `router`.
///
/// Apply after the routes are registered:
/// ```ignore
/// let router = api::routes();
/// let router = middleware::gateway::apply(router, state.clone());
/// let app = router.with_state(state);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, gateway_middleware))
}

async fn gateway_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    if state.gateway.policy().is_asset(&path) {
        return next.run(req).await;
    }

    let mut cookies = SessionCookies::from_headers(req.headers());

    let decision = state.gateway.evaluate(&path, &mut cookies).await;

    match decision {
        GatewayDecision::Continue {
            user,
            cookies: written,
        } => {
            if !written.is_empty() {
                cookies.apply_to_request(req.headers_mut());
            }
            if let Some(user) = user {
                req.extensions_mut().insert(user);
            }

            let mut res = next.run(req).await;
            append_set_cookie_headers(res.headers_mut(), &written);
            res
        }
        GatewayDecision::Redirect {
            location,
            cookies: written,
        } => {
            let mut res = Redirect::temporary(location).into_response();
            append_set_cookie_headers(res.headers_mut(), &written);
            res
        }
    }
}
