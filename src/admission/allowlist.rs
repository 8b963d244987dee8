/// 已知善意高流量客户端的UA签名（搜索引擎爬虫、拨测服务）
const TRUSTED_SIGNATURES: &[&str] = &[
    "googlebot",
    "bingbot",
    "duckduckbot",
    "yandexbot",
    "baiduspider",
    "uptimerobot",
    "archive.org_bot",
];

/// 可信客户端白名单
///
/// 子串匹配，刻意宽松：保护的是公开内容，白名单只负责放行善意流量，
/// 不承担身份认证，伪造UA绕过属于可接受的风险。
#[derive(Debug, Clone)]
pub struct TrustedClients {
    signatures: &'static [&'static str],
}

impl TrustedClients {
    pub fn new() -> Self {
        Self {
            signatures: TRUSTED_SIGNATURES,
        }
    }

    pub fn is_trusted(&self, declared_identity: &str) -> bool {
        let identity = declared_identity.to_ascii_lowercase();
        self.signatures.iter().any(|sig| identity.contains(sig))
    }
}

impl Default for TrustedClients {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_crawler_signature_case_insensitive() {
        let trusted = TrustedClients::new();
        assert!(trusted.is_trusted(
            "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"
        ));
        assert!(trusted.is_trusted("mozilla/5.0 (compatible; BINGBOT/2.0)"));
    }

    #[test]
    fn rejects_ordinary_clients() {
        let trusted = TrustedClients::new();
        assert!(!trusted.is_trusted("curl/8.5.0"));
        assert!(!trusted.is_trusted("Mozilla/5.0 (X11; Linux x86_64) Firefox/124.0"));
        assert!(!trusted.is_trusted(""));
    }
}
