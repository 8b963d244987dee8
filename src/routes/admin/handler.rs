use axum::{Json, extract::State};
use serde::Serialize;

use crate::{
    AppState,
    cache::CacheStats,
    utils::{ApiResponse, success_to_api_response},
};

#[derive(Debug, Serialize)]
pub struct ClearResult {
    pub cleared_entries: usize,
}

// 查看进程内缓存概况
pub async fn cache_stats(State(state): State<AppState>) -> Json<ApiResponse<CacheStats>> {
    success_to_api_response(state.cache.stats())
}

// 清空进程内缓存，只影响当前温实例
pub async fn cache_clear(State(state): State<AppState>) -> Json<ApiResponse<ClearResult>> {
    let cleared_entries = state.cache.stats().entry_count;
    state.cache.clear();
    tracing::info!("手动清空内容缓存: {}条", cleared_entries);
    success_to_api_response(ClearResult { cleared_entries })
}
