// 进程内容缓存模块
// 只服务于当前温实例，实例回收即清空；不是正确性依赖，只是加速器

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

struct CacheEntry {
    value: Value,
    created_at: Instant,
}

/// 进程内TTL内容缓存
///
/// 读取时惰性判定过期，过期条目在命中检查的那次访问里删除，没有后台清扫。
/// 不做容量上限：键空间由固定的清单/报表集合限定，进程寿命又限定了缓存寿命。
/// 多个工作线程会并发读写同一实例，所以用并发map承载。
pub struct ContentCache {
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
}

/// 缓存概况，供运维端点查看
#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub keys: Vec<String>,
}

impl ContentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Instant::now())
    }

    pub fn set(&self, key: &str, value: Value) {
        self.set_at(key, value, Instant::now());
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        CacheStats {
            entry_count: keys.len(),
            keys,
        }
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Value> {
        // 先释放读引用再删除，避免在持有分片锁时写同一分片
        match self.entries.get(key) {
            Some(entry) => {
                if now.duration_since(entry.created_at) < self.ttl {
                    return Some(entry.value.clone());
                }
            }
            None => return None,
        }
        self.entries.remove(key);
        None
    }

    fn set_at(&self, key: &str, value: Value, now: Instant) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: now,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(3600);

    #[test]
    fn set_then_get_within_ttl() {
        let cache = ContentCache::new(TTL);
        let base = Instant::now();
        cache.set_at("doc:listing", json!({"documents": []}), base);

        let hit = cache.get_at("doc:listing", base + Duration::from_secs(3599));
        assert_eq!(hit, Some(json!({"documents": []})));
    }

    #[test]
    fn expired_entry_reads_as_miss_and_is_dropped() {
        let cache = ContentCache::new(TTL);
        let base = Instant::now();
        cache.set_at("doc:listing", json!("blob"), base);

        assert_eq!(cache.get_at("doc:listing", base + Duration::from_secs(3601)), None);
        // 过期条目在那次访问里被删掉
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[test]
    fn overwrite_replaces_the_value() {
        let cache = ContentCache::new(TTL);
        let base = Instant::now();
        cache.set_at("report", json!(1), base);
        cache.set_at("report", json!(2), base + Duration::from_secs(10));

        assert_eq!(cache.get_at("report", base + Duration::from_secs(20)), Some(json!(2)));
    }

    #[test]
    fn reads_do_not_refresh_entry_age() {
        let cache = ContentCache::new(TTL);
        let base = Instant::now();
        cache.set_at("k", json!("v"), base);

        // 反复读取不重置年龄
        for offset in [100u64, 1000, 3599] {
            assert!(cache.get_at("k", base + Duration::from_secs(offset)).is_some());
        }
        assert_eq!(cache.get_at("k", base + Duration::from_secs(3601)), None);
    }

    #[test]
    fn clear_and_stats() {
        let cache = ContentCache::new(TTL);
        cache.set("a", json!(1));
        cache.set("b", json!(2));

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.keys, vec!["a".to_string(), "b".to_string()]);

        cache.clear();
        assert_eq!(cache.stats().entry_count, 0);
        assert_eq!(cache.get("a"), None);
    }
}
