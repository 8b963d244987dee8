use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use content_backend::{
    AppState,
    admission::{PgCounterStore, TrustedClients},
    cache::ContentCache,
    config::{Config, policies},
    middleware::{EndpointGate, log_errors, throttle},
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'content_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // 进程内内容缓存：显式构造、注入，冷启动即空
    let cache = Arc::new(ContentCache::new(Duration::from_secs(
        policies::CONTENT_CACHE_TTL_SECS,
    )));

    // 每个端点组一个准入gate，共享同一张计数表
    let trusted = TrustedClients::new();
    let store = PgCounterStore::new(pool.clone());
    let listing_gate = EndpointGate::new(
        "documents_listing",
        policies::DOCUMENT_LISTING,
        store.clone(),
        trusted.clone(),
    );
    let report_gate = EndpointGate::new(
        "usage_report",
        policies::USAGE_REPORT,
        store.clone(),
        trusted.clone(),
    );

    // 设置应用状态
    let state = AppState {
        pool,
        config: config.clone(),
        cache,
    };

    // 文档清单路由：生成较轻，限流宽松
    let document_routes = Router::new()
        .route("/documents/listing", get(routes::documents::machine_listing))
        .layer(axum::middleware::from_fn_with_state(listing_gate, throttle));

    // 报表路由：聚合查询昂贵，限流收紧
    let report_routes = Router::new()
        .route("/reports/usage", post(routes::reports::usage_report))
        .route("/reports/summary", get(routes::reports::usage_summary))
        .layer(axum::middleware::from_fn_with_state(report_gate, throttle));

    // 运维路由：不限流、不缓存
    let admin_routes = Router::new()
        .route("/admin/cache/stats", get(routes::admin::cache_stats))
        .route("/admin/cache/clear", post(routes::admin::cache_clear));

    let router = Router::new()
        .nest(
            &config.api_base_uri,
            Router::new()
                .merge(document_routes)
                .merge(report_routes)
                .merge(admin_routes),
        )
        .layer(axum::middleware::from_fn(log_errors));

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
