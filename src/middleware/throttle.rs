use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    admission::{AdmissionController, Decision, PgCounterStore, ThrottlePolicy, TrustedClients},
    utils::{error_codes, error_to_api_response},
};

/// 单个受保护端点的准入入口
///
/// 每个端点组装一个gate：端点名 + 策略 + 控制器，以中间件状态注入，
/// 替代在各处复制粘贴限流逻辑和阈值字面量。
pub struct EndpointGate {
    endpoint: &'static str,
    policy: ThrottlePolicy,
    controller: AdmissionController<PgCounterStore>,
}

impl EndpointGate {
    pub fn new(
        endpoint: &'static str,
        policy: ThrottlePolicy,
        store: PgCounterStore,
        trusted: TrustedClients,
    ) -> Arc<Self> {
        Arc::new(Self {
            endpoint,
            policy,
            controller: AdmissionController::new(store, trusted),
        })
    }
}

pub async fn throttle(
    State(gate): State<Arc<EndpointGate>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client_key = resolve_client_key(&req);
    let declared_identity = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();

    let decision = gate
        .controller
        .check(&client_key, &declared_identity, gate.endpoint, &gate.policy)
        .await;

    match decision {
        Decision::Allowed => next.run(req).await,
        Decision::Denied { retry_after_secs } => {
            tracing::info!(
                "请求被限流: {} {} retry_after={}s",
                client_key,
                gate.endpoint,
                retry_after_secs
            );
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                error_to_api_response::<()>(
                    error_codes::RATE_LIMIT,
                    format!("请求过于频繁，请在{}秒后重试", retry_after_secs),
                ),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}

/// 解析客户端标识：优先转发头，退回连接对端IP，最后兜底"unknown"
fn resolve_client_key(req: &Request<Body>) -> String {
    let peer_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    req.headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(peer_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[test]
    fn prefers_x_real_ip() {
        let mut req = request();
        req.headers_mut()
            .insert("x-real-ip", HeaderValue::from_static("203.0.113.9"));
        req.headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(resolve_client_key(&req), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_first_forwarded_entry() {
        let mut req = request();
        req.headers_mut().insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 198.51.100.1, 10.0.0.1"),
        );
        assert_eq!(resolve_client_key(&req), "198.51.100.1");
    }

    #[test]
    fn falls_back_to_peer_address() {
        let mut req = request();
        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.7:4242".parse::<SocketAddr>().unwrap()));
        assert_eq!(resolve_client_key(&req), "192.0.2.7");
    }

    #[test]
    fn defaults_to_unknown() {
        assert_eq!(resolve_client_key(&request()), "unknown");
    }
}
