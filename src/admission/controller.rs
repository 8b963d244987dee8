use chrono::{DateTime, Duration, Utc};

use crate::admission::allowlist::TrustedClients;
use crate::admission::store::CounterStore;

/// 单个端点的准入策略
#[derive(Debug, Clone, Copy)]
pub struct ThrottlePolicy {
    /// 一个窗口内允许的请求数
    pub limit: i64,
    pub window_secs: i64,
    pub ban_secs: i64,
}

impl ThrottlePolicy {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs)
    }

    pub fn ban(&self) -> Duration {
        Duration::seconds(self.ban_secs)
    }
}

/// 准入判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied { retry_after_secs: i64 },
}

/// 准入控制器
///
/// 固定窗口：以窗口内首个请求的时间为窗口起点，只存一行计数，
/// 用O(1)存储换取近似公平。计数的自增是单条原子upsert，
/// 不再用读-改-写（并发下会丢更新）。
pub struct AdmissionController<S: CounterStore> {
    store: S,
    trusted: TrustedClients,
}

impl<S: CounterStore> AdmissionController<S> {
    pub fn new(store: S, trusted: TrustedClients) -> Self {
        Self { store, trusted }
    }

    pub async fn check(
        &self,
        client_key: &str,
        declared_identity: &str,
        endpoint: &str,
        policy: &ThrottlePolicy,
    ) -> Decision {
        self.check_at(client_key, declared_identity, endpoint, policy, Utc::now())
            .await
    }

    pub(crate) async fn check_at(
        &self,
        client_key: &str,
        declared_identity: &str,
        endpoint: &str,
        policy: &ThrottlePolicy,
        now: DateTime<Utc>,
    ) -> Decision {
        // 白名单客户端无条件放行
        if self.trusted.is_trusted(declared_identity) {
            tracing::debug!("白名单客户端放行: {} {}", client_key, endpoint);
            return Decision::Allowed;
        }

        // 封禁期内直接拒绝，不再触碰窗口计数
        match self.store.active_ban(client_key, endpoint, now).await {
            Ok(Some(until)) => {
                return Decision::Denied {
                    retry_after_secs: secs_until(now, until),
                };
            }
            Ok(None) => {}
            Err(err) => {
                // 计数表不可达时放行：误放行比公开内容整体不可用便宜
                tracing::warn!("准入计数表不可达，降级放行: {:?}", err);
                return Decision::Allowed;
            }
        }

        let count = match self
            .store
            .bump(client_key, endpoint, now, policy.window())
            .await
        {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!("准入计数表不可达，降级放行: {:?}", err);
                return Decision::Allowed;
            }
        };

        if count > policy.limit {
            let until = now + policy.ban();
            if let Err(err) = self.store.ban(client_key, endpoint, until, now).await {
                // 封禁没写进去也维持本次拒绝，下个请求重新计数
                tracing::warn!("写入封禁失败: {:?}", err);
            }
            tracing::info!(
                "超出限额封禁: {} {} count={} ban={}s",
                client_key,
                endpoint,
                count,
                policy.ban_secs
            );
            return Decision::Denied {
                retry_after_secs: policy.ban_secs,
            };
        }

        Decision::Allowed
    }
}

/// 距离截止时间还剩的秒数，向上取整，不为负
fn secs_until(now: DateTime<Utc>, until: DateTime<Utc>) -> i64 {
    let millis = (until - now).num_milliseconds();
    if millis <= 0 { 0 } else { (millis + 999) / 1000 }
}
