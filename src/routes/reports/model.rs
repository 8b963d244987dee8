use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

/// 用量报表的聚合维度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Endpoint,
    Day,
    Client,
}

impl GroupBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "endpoint" => Some(GroupBy::Endpoint),
            "day" => Some(GroupBy::Day),
            "client" => Some(GroupBy::Client),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::Endpoint => "endpoint",
            GroupBy::Day => "day",
            GroupBy::Client => "client",
        }
    }
}

/// 用量报表的一个聚合桶
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UsageBucket {
    pub bucket: String,
    pub request_count: i64,
}

impl UsageBucket {
    /// 按维度聚合最近若干天的访问量
    pub async fn aggregate(
        pool: &PgPool,
        days: i64,
        group_by: GroupBy,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let since = Utc::now() - Duration::days(days);
        let sql = match group_by {
            GroupBy::Endpoint => {
                r#"
                SELECT endpoint AS bucket, COUNT(*) AS request_count
                FROM access_log
                WHERE requested_at >= $1
                GROUP BY endpoint
                ORDER BY request_count DESC
                "#
            }
            GroupBy::Day => {
                r#"
                SELECT to_char(date_trunc('day', requested_at), 'YYYY-MM-DD') AS bucket,
                       COUNT(*) AS request_count
                FROM access_log
                WHERE requested_at >= $1
                GROUP BY bucket
                ORDER BY bucket
                "#
            }
            GroupBy::Client => {
                r#"
                SELECT client_key AS bucket, COUNT(*) AS request_count
                FROM access_log
                WHERE requested_at >= $1
                GROUP BY client_key
                ORDER BY request_count DESC
                "#
            }
        };

        sqlx::query_as::<_, UsageBucket>(sql)
            .bind(since)
            .fetch_all(pool)
            .await
    }
}

/// 一段时间内的用量汇总
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UsageSummary {
    pub total_requests: i64,
    pub distinct_clients: i64,
    pub throttled_requests: i64,
}

impl UsageSummary {
    pub async fn over_days(pool: &PgPool, days: i64) -> Result<Self, sqlx::Error> {
        let since = Utc::now() - Duration::days(days);
        sqlx::query_as::<_, UsageSummary>(
            r#"
            SELECT COUNT(*) AS total_requests,
                   COUNT(DISTINCT client_key) AS distinct_clients,
                   COUNT(*) FILTER (WHERE status_code = 429) AS throttled_requests
            FROM access_log
            WHERE requested_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_parses_known_dimensions() {
        assert_eq!(GroupBy::parse("endpoint"), Some(GroupBy::Endpoint));
        assert_eq!(GroupBy::parse("day"), Some(GroupBy::Day));
        assert_eq!(GroupBy::parse("client"), Some(GroupBy::Client));
        assert_eq!(GroupBy::parse("hour"), None);
        assert_eq!(GroupBy::parse(""), None);
    }
}
