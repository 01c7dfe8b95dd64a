//! Process-level plumbing shared by the server binary: layered configuration,
//! logging bootstrap and home directory resolution.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, CliArgs, DatabaseConfig, LoggingConfig, Section,
    ServerConfig,
};

/// Read-only access to raw per-module configuration sections.
pub trait ConfigProvider: Send + Sync {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

/// `ConfigProvider` backed by a loaded [`AppConfig`].
#[derive(Debug, Clone)]
pub struct AppConfigProvider {
    config: AppConfig,
}

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl ConfigProvider for AppConfigProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.config.modules.get(module_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_returns_module_sections() {
        let mut config = AppConfig::default();
        config.modules.insert(
            "meetings".to_string(),
            serde_json::json!({ "timezone": "Europe/Berlin" }),
        );
        let provider = AppConfigProvider::new(config);

        let section = provider.get_module_config("meetings").unwrap();
        assert_eq!(section["timezone"], "Europe/Berlin");
        assert!(provider.get_module_config("accounts").is_none());
    }
}
