//! Request-time access-control gateway for the job-listing site.
//!
//! Every request passes the gateway before any handler: the session cookies are
//! checked against the identity provider, the path is classified against the route
//! policy, and the request either continues (with refreshed cookies, if any) or is
//! redirected to the site root.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
