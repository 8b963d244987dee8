use axum::{
    extract::{Query, State},
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, error::AppError, routes::documents::model::DocumentSummary, routes::serve_cached,
};

// 文档清单查询参数
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
}

// 机读文档清单API
pub async fn machine_listing(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Response {
    let cache_key = format!(
        "documents:listing:{}",
        query.category.as_deref().unwrap_or("all")
    );

    serve_cached(&state.cache, &cache_key, || async {
        match DocumentSummary::list_published(&state.pool, query.category.as_deref()).await {
            Ok(documents) => Ok(json!({
                "generated_at": Utc::now(),
                "total": documents.len(),
                "documents": documents,
            })),
            Err(err) => {
                tracing::error!("生成文档清单失败: {:?}", err);
                Err(AppError::GeneratorFailed)
            }
        }
    })
    .await
}
