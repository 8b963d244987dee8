use std::env;

use crate::admission::ThrottlePolicy;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
}

impl Config {
    /// 仅从环境读取存储凭据和监听地址，限流阈值见 [`policies`]
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            server_host: env::var("SERVER_HOST")?,
            server_port: env::var("SERVER_PORT")?.parse().unwrap_or(3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".into()),
        })
    }
}

/// 各端点的准入策略与缓存TTL，按生成成本分级
/// 集中在这里作为唯一的调参来源
pub mod policies {
    use super::ThrottlePolicy;

    /// 文档清单类端点：生成较轻，限流宽松
    pub const DOCUMENT_LISTING: ThrottlePolicy = ThrottlePolicy {
        limit: 120,
        window_secs: 60,
        ban_secs: 60,
    };

    /// 用量报表类端点：聚合查询昂贵，限流收紧
    pub const USAGE_REPORT: ThrottlePolicy = ThrottlePolicy {
        limit: 30,
        window_secs: 60,
        ban_secs: 120,
    };

    /// 内容缓存TTL，单位秒
    pub const CONTENT_CACHE_TTL_SECS: u64 = 3600;
}
