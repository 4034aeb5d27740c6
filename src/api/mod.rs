/*
 * Responsibility
 * - Host routes behind the gateway (routes() re-export)
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;
