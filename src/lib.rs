use std::sync::Arc;

use sqlx::PgPool;

use cache::ContentCache;
use config::Config;

pub mod admission;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub cache: Arc<ContentCache>,
}
