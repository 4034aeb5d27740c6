/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 *   - gateway: route policy + identity checker, both read-only after startup
 * - Cheap to Clone (Arc inside)
 */
use std::sync::Arc;

use crate::services::gateway::Gateway;

#[derive(Clone, Debug)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}
