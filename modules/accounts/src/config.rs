use serde::Deserialize;

/// Configuration for the accounts module.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountsConfig {
    /// HS256 signing secret. Empty means an ephemeral per-process secret.
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl_secs(),
            bootstrap_admin: None,
        }
    }
}

fn default_token_ttl_secs() -> u64 {
    86_400
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let cfg: AccountsConfig = serde_json::from_value(serde_json::json!({
            "jwt_secret": "s3cret"
        }))
        .unwrap();
        assert_eq!(cfg.token_ttl_secs, 86_400);
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res = serde_json::from_value::<AccountsConfig>(serde_json::json!({ "secret": "x" }));
        assert!(res.is_err());
    }
}
