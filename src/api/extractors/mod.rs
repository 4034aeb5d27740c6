/*!
 * Request extractors
 *
 * Responsibility:
 * - Hand the user resolved by the gateway middleware to handlers
 */
mod current_user;

pub use current_user::{CurrentUser, MaybeUser};
