pub mod checker;
pub mod factory;
pub mod provider;

#[cfg(test)]
pub mod fake;

pub use checker::{AuthenticatedUser, IdentityChecker, IdentityError};
pub use factory::build_identity_checker;
pub use provider::{HttpIdentityProvider, SessionCookieSettings};
