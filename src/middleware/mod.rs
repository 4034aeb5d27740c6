/*
 * Responsibility
 * - middleware entry points, each exposing `apply(router, ...)`
 */
pub mod gateway;
pub mod http;
