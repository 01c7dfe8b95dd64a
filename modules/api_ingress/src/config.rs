use serde::{Deserialize, Serialize};

/// `api_ingress` section of the server config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    /// `host:port`; when absent the server's `host`/`port` are used.
    #[serde(default)]
    pub bind_addr: Option<String>,
    #[serde(default)]
    pub cors_enabled: bool,
    /// Per-request deadline. A request past it gets 408 and its handler is dropped.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_body_limit_bytes() -> usize {
    1024 * 1024
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: None,
            cors_enabled: false,
            request_timeout_secs: default_request_timeout_secs(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_uses_defaults() {
        let cfg: ApiIngressConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg.bind_addr, None);
        assert_eq!(cfg.request_timeout_secs, 10);
        assert_eq!(cfg.body_limit_bytes, 1024 * 1024);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = serde_json::from_value::<ApiIngressConfig>(serde_json::json!({ "enable_docs": true }))
            .unwrap_err();
        assert!(err.to_string().contains("enable_docs"));
    }
}
