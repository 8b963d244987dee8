use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

/// 计数行的持久化接口
///
/// 生产环境由Postgres实现；测试用内存实现跑完整的窗口/封禁场景。
/// 所有操作都是针对 (client_key, endpoint) 的点查或upsert，不关联域表。
pub trait CounterStore: Send + Sync {
    /// 查询未过期的封禁，返回封禁截止时间
    fn active_ban(
        &self,
        client_key: &str,
        endpoint: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>, sqlx::Error>> + Send;

    /// 原子自增并返回本窗口内的计数
    ///
    /// 单条语句完成三种情形：首次请求插入计数1、窗口过期原地轮换回计数1、
    /// 窗口内自增。这样并发请求不会出现读-改-写丢失更新。
    fn bump(
        &self,
        client_key: &str,
        endpoint: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;

    /// 在现有计数行上记录封禁截止时间
    fn ban(
        &self,
        client_key: &str,
        endpoint: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CounterStore for PgCounterStore {
    fn active_ban(
        &self,
        client_key: &str,
        endpoint: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>, sqlx::Error>> + Send {
        async move {
            let banned_until: Option<DateTime<Utc>> = sqlx::query_scalar(
                r#"
                SELECT banned_until
                FROM client_window_counters
                WHERE client_key = $1 AND endpoint = $2 AND banned_until >= $3
                "#,
            )
            .bind(client_key)
            .bind(endpoint)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

            Ok(banned_until)
        }
    }

    fn bump(
        &self,
        client_key: &str,
        endpoint: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send {
        async move {
            let cutoff = now - window;
            let count: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO client_window_counters
                    (client_key, endpoint, window_start, request_count, banned_until, updated_at)
                VALUES ($1, $2, $3, 1, NULL, $3)
                ON CONFLICT (client_key, endpoint) DO UPDATE SET
                    request_count = CASE
                        WHEN client_window_counters.window_start < $4 THEN 1
                        ELSE client_window_counters.request_count + 1
                    END,
                    window_start = CASE
                        WHEN client_window_counters.window_start < $4 THEN $3
                        ELSE client_window_counters.window_start
                    END,
                    banned_until = CASE
                        WHEN client_window_counters.window_start < $4 THEN NULL
                        ELSE client_window_counters.banned_until
                    END,
                    updated_at = $3
                RETURNING request_count
                "#,
            )
            .bind(client_key)
            .bind(endpoint)
            .bind(now)
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;

            Ok(count)
        }
    }

    fn ban(
        &self,
        client_key: &str,
        endpoint: &str,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send {
        async move {
            sqlx::query(
                r#"
                UPDATE client_window_counters
                SET banned_until = $3, updated_at = $4
                WHERE client_key = $1 AND endpoint = $2
                "#,
            )
            .bind(client_key)
            .bind(endpoint)
            .bind(until)
            .bind(now)
            .execute(&self.pool)
            .await?;

            Ok(())
        }
    }
}

/// 测试用内存计数存储，语义与Postgres实现一致
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    struct CounterRow {
        window_start: DateTime<Utc>,
        request_count: i64,
        banned_until: Option<DateTime<Utc>>,
    }

    #[derive(Default)]
    pub struct MemoryCounterStore {
        rows: Mutex<HashMap<(String, String), CounterRow>>,
    }

    impl CounterStore for MemoryCounterStore {
        async fn active_ban(
            &self,
            client_key: &str,
            endpoint: &str,
            now: DateTime<Utc>,
        ) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
            let rows = self.rows.lock().unwrap();
            let key = (client_key.to_string(), endpoint.to_string());
            Ok(rows
                .get(&key)
                .and_then(|row| row.banned_until)
                .filter(|until| *until >= now))
        }

        async fn bump(
            &self,
            client_key: &str,
            endpoint: &str,
            now: DateTime<Utc>,
            window: Duration,
        ) -> Result<i64, sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            let key = (client_key.to_string(), endpoint.to_string());
            let cutoff = now - window;

            let row = rows.entry(key).or_insert(CounterRow {
                window_start: now,
                request_count: 0,
                banned_until: None,
            });
            if row.window_start < cutoff {
                row.window_start = now;
                row.request_count = 0;
                row.banned_until = None;
            }
            row.request_count += 1;
            Ok(row.request_count)
        }

        async fn ban(
            &self,
            client_key: &str,
            endpoint: &str,
            until: DateTime<Utc>,
            _now: DateTime<Utc>,
        ) -> Result<(), sqlx::Error> {
            let mut rows = self.rows.lock().unwrap();
            let key = (client_key.to_string(), endpoint.to_string());
            if let Some(row) = rows.get_mut(&key) {
                row.banned_until = Some(until);
            }
            Ok(())
        }
    }

    /// 模拟计数表不可达的存储
    pub struct UnreachableStore;

    impl CounterStore for UnreachableStore {
        async fn active_ban(
            &self,
            _client_key: &str,
            _endpoint: &str,
            _now: DateTime<Utc>,
        ) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
            Err(sqlx::Error::PoolClosed)
        }

        async fn bump(
            &self,
            _client_key: &str,
            _endpoint: &str,
            _now: DateTime<Utc>,
            _window: Duration,
        ) -> Result<i64, sqlx::Error> {
            Err(sqlx::Error::PoolClosed)
        }

        async fn ban(
            &self,
            _client_key: &str,
            _endpoint: &str,
            _until: DateTime<Utc>,
            _now: DateTime<Utc>,
        ) -> Result<(), sqlx::Error> {
            Err(sqlx::Error::PoolClosed)
        }
    }
}
