use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    error::AppError,
    routes::reports::model::{GroupBy, UsageBucket, UsageSummary},
    routes::serve_cached,
    utils::{error_codes, error_to_api_response},
};

const DEFAULT_REPORT_DAYS: i64 = 7;
const MAX_REPORT_DAYS: i64 = 90;

// 用量报表请求参数
#[derive(Debug, Deserialize)]
pub struct UsageReportRequest {
    pub days: Option<i64>,
    pub group_by: Option<String>,
}

// 用量汇总查询参数
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<i64>,
}

// 用量报表API，按端点/日期/客户端聚合
pub async fn usage_report(
    State(state): State<AppState>,
    Json(request): Json<UsageReportRequest>,
) -> Response {
    let days = request.days.unwrap_or(DEFAULT_REPORT_DAYS);
    if !(1..=MAX_REPORT_DAYS).contains(&days) {
        return error_to_api_response::<()>(
            error_codes::VALIDATION_ERROR,
            format!("days参数须在1到{}之间", MAX_REPORT_DAYS),
        )
        .into_response();
    }

    let group_by = match GroupBy::parse(request.group_by.as_deref().unwrap_or("endpoint")) {
        Some(group_by) => group_by,
        None => {
            return error_to_api_response::<()>(
                error_codes::VALIDATION_ERROR,
                "不支持的group_by维度，可选: endpoint/day/client".into(),
            )
            .into_response();
        }
    };

    let cache_key = format!("reports:usage:{}:{}", days, group_by.as_str());

    serve_cached(&state.cache, &cache_key, || async {
        match UsageBucket::aggregate(&state.pool, days, group_by).await {
            Ok(buckets) => Ok(json!({
                "generated_at": Utc::now(),
                "days": days,
                "group_by": group_by.as_str(),
                "buckets": buckets,
            })),
            Err(err) => {
                tracing::error!("生成用量报表失败: {:?}", err);
                Err(AppError::GeneratorFailed)
            }
        }
    })
    .await
}

// 用量汇总API
pub async fn usage_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Response {
    let days = query.days.unwrap_or(DEFAULT_REPORT_DAYS);
    if !(1..=MAX_REPORT_DAYS).contains(&days) {
        return error_to_api_response::<()>(
            error_codes::VALIDATION_ERROR,
            format!("days参数须在1到{}之间", MAX_REPORT_DAYS),
        )
        .into_response();
    }

    let cache_key = format!("reports:summary:{}", days);

    serve_cached(&state.cache, &cache_key, || async {
        match UsageSummary::over_days(&state.pool, days).await {
            Ok(summary) => Ok(json!({
                "generated_at": Utc::now(),
                "days": days,
                "summary": summary,
            })),
            Err(err) => {
                tracing::error!("生成用量汇总失败: {:?}", err);
                Err(AppError::GeneratorFailed)
            }
        }
    })
    .await
}
