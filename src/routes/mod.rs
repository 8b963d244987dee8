// 路由模块
// 每个受保护端点跑在同一个处理壳里：查缓存 → 调生成器 → 写缓存 → 打标返回
// 准入检查由路由层挂载的throttle中间件完成

pub mod admin;
pub mod documents;
pub mod reports;

use std::future::Future;

use axum::{
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::{cache::ContentCache, error::AppError, utils::success_to_api_response};

/// 内容端点的处理壳
///
/// 命中缓存直接返回并打上 X-Cache: HIT；未命中才调用生成器，
/// 成功的结果写入缓存并打 MISS，失败的结果不缓存、原样返回500。
pub(crate) async fn serve_cached<F, Fut>(
    cache: &ContentCache,
    cache_key: &str,
    generate: F,
) -> Response
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, AppError>>,
{
    if let Some(value) = cache.get(cache_key) {
        tracing::debug!("缓存命中: {}", cache_key);
        return tagged(success_to_api_response(value).into_response(), "HIT");
    }

    match generate().await {
        Ok(value) => {
            cache.set(cache_key, value.clone());
            tagged(success_to_api_response(value).into_response(), "MISS")
        }
        Err(err) => err.into_response(),
    }
}

fn tagged(mut response: Response, state: &'static str) -> Response {
    response.headers_mut().insert(
        HeaderName::from_static("x-cache"),
        HeaderValue::from_static(state),
    );
    response
}
