use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::context::ModuleCtx;
use crate::contracts::{DbModule, Module, RestHostModule, RestfulModule, StatefulModule};

/// One module as registered by the binary: its name, what it depends on and
/// which capabilities it implements.
pub struct ModuleSpec {
    name: &'static str,
    deps: Vec<&'static str>,
    core: Arc<dyn Module>,
    rest: Option<Arc<dyn RestfulModule>>,
    rest_host: Option<Arc<dyn RestHostModule>>,
    db: Option<Arc<dyn DbModule>>,
    stateful: Option<Arc<dyn StatefulModule>>,
}

impl ModuleSpec {
    pub fn new(name: &'static str, core: Arc<dyn Module>) -> Self {
        Self {
            name,
            deps: Vec::new(),
            core,
            rest: None,
            rest_host: None,
            db: None,
            stateful: None,
        }
    }

    pub fn depends_on(mut self, deps: &[&'static str]) -> Self {
        self.deps.extend_from_slice(deps);
        self
    }

    pub fn with_rest(mut self, m: Arc<dyn RestfulModule>) -> Self {
        self.rest = Some(m);
        self
    }

    pub fn with_rest_host(mut self, m: Arc<dyn RestHostModule>) -> Self {
        self.rest_host = Some(m);
        self
    }

    pub fn with_db(mut self, m: Arc<dyn DbModule>) -> Self {
        self.db = Some(m);
        self
    }

    pub fn with_stateful(mut self, m: Arc<dyn StatefulModule>) -> Self {
        self.stateful = Some(m);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn deps(&self) -> &[&'static str] {
        &self.deps
    }
}

impl std::fmt::Debug for ModuleSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleSpec")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("has_rest", &self.rest.is_some())
            .field("is_rest_host", &self.rest_host.is_some())
            .field("has_db", &self.db.is_some())
            .field("has_stateful", &self.stateful.is_some())
            .finish()
    }
}

/// Collects [`ModuleSpec`]s in registration order.
#[derive(Default)]
pub struct RegistryBuilder {
    specs: Vec<ModuleSpec>,
}

impl RegistryBuilder {
    pub fn add(&mut self, spec: ModuleSpec) -> &mut Self {
        self.specs.push(spec);
        self
    }

    /// Validate and order modules so every dependency comes first.
    ///
    /// Ties keep registration order, which makes the phase order reproducible.
    pub fn build(self) -> Result<ModuleRegistry, RegistryError> {
        let mut errors = Vec::new();
        let mut index: HashMap<&'static str, usize> = HashMap::new();
        for (i, spec) in self.specs.iter().enumerate() {
            if index.insert(spec.name, i).is_some() {
                errors.push(format!("Module '{}' is already registered", spec.name));
            }
        }
        let hosts: Vec<&'static str> = self
            .specs
            .iter()
            .filter(|s| s.rest_host.is_some())
            .map(|s| s.name)
            .collect();
        if hosts.len() > 1 {
            errors.push(format!(
                "Multiple REST host modules detected: {}. Only one REST host is allowed.",
                hosts.join(", ")
            ));
        }
        if !errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration { errors });
        }

        let mut adj = vec![Vec::<usize>::new(); self.specs.len()];
        for (i, spec) in self.specs.iter().enumerate() {
            for dep in &spec.deps {
                let d = *index.get(dep).ok_or_else(|| RegistryError::UnknownDependency {
                    module: spec.name.to_string(),
                    depends_on: dep.to_string(),
                })?;
                adj[i].push(d);
            }
        }

        let order = topo_order(&self.specs, &adj)?;

        let mut slots: Vec<Option<ModuleSpec>> = self.specs.into_iter().map(Some).collect();
        let modules: Vec<ModuleSpec> = order.into_iter().filter_map(|i| slots[i].take()).collect();

        tracing::info!(
            modules = ?modules.iter().map(|m| m.name).collect::<Vec<_>>(),
            "Module dependency order resolved"
        );
        Ok(ModuleRegistry { modules })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Post-order DFS over "depends on" edges; a back edge is reported as the
/// cycle it closes.
fn topo_order(specs: &[ModuleSpec], adj: &[Vec<usize>]) -> Result<Vec<usize>, RegistryError> {
    fn visit(
        node: usize,
        specs: &[ModuleSpec],
        adj: &[Vec<usize>],
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), RegistryError> {
        marks[node] = Mark::OnPath;
        path.push(node);
        for &dep in &adj[node] {
            match marks[dep] {
                Mark::OnPath => {
                    let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                    let mut cycle: Vec<&'static str> =
                        path[start..].iter().map(|&i| specs[i].name).collect();
                    cycle.push(specs[dep].name);
                    return Err(RegistryError::CycleDetected { path: cycle });
                }
                Mark::Unvisited => visit(dep, specs, adj, marks, path, order)?,
                Mark::Done => {}
            }
        }
        path.pop();
        marks[node] = Mark::Done;
        order.push(node);
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; specs.len()];
    let mut path = Vec::new();
    let mut order = Vec::with_capacity(specs.len());
    for i in 0..specs.len() {
        if marks[i] == Mark::Unvisited {
            visit(i, specs, adj, &mut marks, &mut path, &mut order)?;
        }
    }
    Ok(order)
}

/// Modules in dependency order, ready to be driven through the phases.
pub struct ModuleRegistry {
    modules: Vec<ModuleSpec>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.modules.iter().map(|m| m.name).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}

impl ModuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn modules(&self) -> &[ModuleSpec] {
        &self.modules
    }

    pub fn get_module(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.core.clone())
    }

    // ---- Ordered phases: init → DB → REST (sync) → start → stop ----

    pub async fn run_init_phase(&self, base_ctx: &ModuleCtx) -> Result<(), RegistryError> {
        for m in &self.modules {
            tracing::debug!(module = m.name, "init");
            m.core
                .init(&base_ctx.scoped(m.name))
                .await
                .map_err(|source| RegistryError::Init {
                    module: m.name,
                    source,
                })?;
        }
        Ok(())
    }

    pub async fn run_db_phase(&self, db: &modkit_db::DbHandle) -> Result<(), RegistryError> {
        for m in &self.modules {
            if let Some(dbm) = &m.db {
                tracing::debug!(module = m.name, "migrate");
                dbm.migrate(db)
                    .await
                    .map_err(|source| RegistryError::DbMigrate {
                        module: m.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Host prepare → every REST module in order → host finalize.
    pub fn run_rest_phase(
        &self,
        base_ctx: &ModuleCtx,
        mut router: Router,
    ) -> Result<Router, RegistryError> {
        let host = self
            .modules
            .iter()
            .find_map(|m| m.rest_host.as_ref().map(|h| (m, h)));
        let Some((host_entry, host)) = host else {
            return if self.modules.iter().any(|m| m.rest.is_some()) {
                Err(RegistryError::RestRequiresHost)
            } else {
                Ok(router)
            };
        };
        let host_ctx = base_ctx.scoped(host_entry.name);

        router = host
            .rest_prepare(&host_ctx, router)
            .map_err(|source| RegistryError::RestPrepare {
                module: host_entry.name,
                source,
            })?;

        for m in &self.modules {
            if let Some(rest) = &m.rest {
                router = rest
                    .register_rest(&base_ctx.scoped(m.name), router)
                    .map_err(|source| RegistryError::RestRegister {
                        module: m.name,
                        source,
                    })?;
            }
        }

        host.rest_finalize(&host_ctx, router)
            .map_err(|source| RegistryError::RestFinalize {
                module: host_entry.name,
                source,
            })
    }

    pub async fn run_start_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for m in &self.modules {
            if let Some(s) = &m.stateful {
                s.start(cancel.clone())
                    .await
                    .map_err(|source| RegistryError::Start {
                        module: m.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Reverse order; failures are logged and do not stop the remaining modules.
    pub async fn run_stop_phase(&self, cancel: CancellationToken) {
        for m in self.modules.iter().rev() {
            if let Some(s) = &m.stateful {
                if let Err(err) = s.stop(cancel.clone()).await {
                    tracing::warn!(module = m.name, error = %err, "Failed to stop module");
                }
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("initialization failed for module '{module}'")]
    Init {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("start failed for '{module}'")]
    Start {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("DB migration failed for module '{module}'")]
    DbMigrate {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST prepare failed for host module '{module}'")]
    RestPrepare {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST registration failed for module '{module}'")]
    RestRegister {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST finalize failed for host module '{module}'")]
    RestFinalize {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("modules with REST routes are registered, but no module hosts the REST ingress")]
    RestRequiresHost,
    #[error("module '{module}' depends on unknown '{depends_on}'")]
    UnknownDependency { module: String, depends_on: String },
    #[error("cyclic dependency detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<&'static str> },
    #[error("invalid registry configuration:\n{errors:#?}")]
    InvalidRegistryConfiguration { errors: Vec<String> },
}
