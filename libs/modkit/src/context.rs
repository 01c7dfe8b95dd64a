use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client_hub::ClientHub;

/// Source of raw per-module configuration sections.
pub trait ConfigProvider: Send + Sync {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

/// Everything a module may touch while it is being wired.
///
/// One base context is built by the runner and cloned per module; the clone is
/// scoped to the module name so [`ModuleCtx::module_config`] reads the right section.
#[derive(Clone)]
pub struct ModuleCtx {
    db: Option<Arc<modkit_db::DbHandle>>,
    config_provider: Option<Arc<dyn ConfigProvider>>,
    client_hub: Arc<ClientHub>,
    cancellation_token: CancellationToken,
    module_name: Option<Arc<str>>,
}

pub struct ModuleCtxBuilder {
    inner: ModuleCtx,
}

impl ModuleCtxBuilder {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            inner: ModuleCtx {
                db: None,
                config_provider: None,
                client_hub: Arc::new(ClientHub::default()),
                cancellation_token: token,
                module_name: None,
            },
        }
    }

    pub fn with_db(mut self, db: Arc<modkit_db::DbHandle>) -> Self {
        self.inner.db = Some(db);
        self
    }

    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.inner.config_provider = Some(p);
        self
    }

    pub fn with_client_hub(mut self, hub: Arc<ClientHub>) -> Self {
        self.inner.client_hub = hub;
        self
    }

    /// Pre-scope the context; used by tests that call a module's `init` directly.
    pub fn for_module(mut self, name: &str) -> Self {
        self.inner.module_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn build(self) -> ModuleCtx {
        self.inner
    }
}

impl ModuleCtx {
    pub(crate) fn scoped(&self, name: &str) -> Self {
        let mut ctx = self.clone();
        ctx.module_name = Some(Arc::<str>::from(name));
        ctx
    }

    pub fn db(&self) -> Option<Arc<modkit_db::DbHandle>> {
        self.db.clone()
    }

    pub fn db_required(&self) -> anyhow::Result<Arc<modkit_db::DbHandle>> {
        self.db.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "module '{}' requires a database, but none was configured",
                self.current_module().unwrap_or("<unscoped>")
            )
        })
    }

    pub fn client_hub(&self) -> Arc<ClientHub> {
        self.client_hub.clone()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn current_module(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Best-effort: a missing section yields `T::default()`.
    ///
    /// A present but malformed section is an error.
    pub fn module_config<T: DeserializeOwned + Default>(&self) -> anyhow::Result<T> {
        match self.raw_section() {
            Some((name, v)) => serde_json::from_value::<T>(v.clone())
                .map_err(|e| anyhow::anyhow!("invalid {name} config: {e}")),
            None => Ok(T::default()),
        }
    }

    /// Strict: the section must exist and deserialize.
    pub fn module_config_required<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let name = self
            .current_module()
            .ok_or_else(|| anyhow::anyhow!("context is not scoped to a module"))?;
        let (_, val) = self
            .raw_section()
            .ok_or_else(|| anyhow::anyhow!("missing module config: {name}"))?;
        serde_json::from_value(val.clone()).map_err(|e| anyhow::anyhow!("invalid {name} config: {e}"))
    }

    fn raw_section(&self) -> Option<(&str, &serde_json::Value)> {
        let name = self.module_name.as_deref()?;
        let provider = self.config_provider.as_ref()?;
        provider.get_module_config(name).map(|v| (name, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    struct MapProvider(HashMap<String, serde_json::Value>);

    impl ConfigProvider for MapProvider {
        fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
            self.0.get(module_name)
        }
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Cfg {
        #[serde(default)]
        timezone: Option<String>,
    }

    fn ctx_with(section: serde_json::Value) -> ModuleCtx {
        let mut map = HashMap::new();
        map.insert("meetings".to_string(), section);
        ModuleCtxBuilder::new(CancellationToken::new())
            .with_config_provider(Arc::new(MapProvider(map)))
            .build()
    }

    #[test]
    fn scoped_context_reads_its_own_section() {
        let base = ctx_with(serde_json::json!({ "timezone": "Europe/Lisbon" }));

        let cfg: Cfg = base.scoped("meetings").module_config().unwrap();
        assert_eq!(cfg.timezone.as_deref(), Some("Europe/Lisbon"));

        let other: Cfg = base.scoped("accounts").module_config().unwrap();
        assert_eq!(other, Cfg::default());
        assert!(base.scoped("accounts").module_config_required::<Cfg>().is_err());
    }

    #[test]
    fn malformed_section_is_reported() {
        let ctx = ctx_with(serde_json::json!({ "tz": "UTC" })).scoped("meetings");
        let err = ctx.module_config::<Cfg>().unwrap_err();
        assert!(err.to_string().contains("invalid meetings config"));
    }

    #[test]
    fn db_required_fails_without_handle() {
        let ctx = ModuleCtxBuilder::new(CancellationToken::new())
            .for_module("meetings")
            .build();
        let err = ctx.db_required().unwrap_err();
        assert!(err.to_string().contains("meetings"));
    }
}
