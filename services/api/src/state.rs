//! Application state shared across handlers

use common::cache::RedisPool;

use crate::{auth::JwtService, service::StashService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: StashService,
    pub jwt_service: JwtService,
    /// Refresh-token revocation store; revocation is skipped without it
    pub redis_pool: Option<RedisPool>,
}
