//! # ModKit
//!
//! Small module system for the rollcall server.
//!
//! Modules are plain structs implementing [`Module`] plus any of the optional
//! capabilities ([`DbModule`], [`RestfulModule`], [`RestHostModule`],
//! [`StatefulModule`]). The binary registers them explicitly with a
//! [`RegistryBuilder`]; the runner then drives the phases in dependency order:
//! init → DB → REST → start → stop.
//!
//! ```rust,ignore
//! let mut registry = ModuleRegistry::builder();
//! registry.add(ModuleSpec::new("accounts", accounts.clone()).with_db(accounts.clone()));
//! registry.add(ModuleSpec::new("meetings", meetings.clone()).depends_on(&["accounts"]));
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod contracts;
pub use contracts::*;

pub mod context;
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};

pub mod client_hub;
pub mod registry;

pub use client_hub::{ClientHub, ClientHubError};
pub use registry::{ModuleRegistry, ModuleSpec, RegistryBuilder, RegistryError};

pub mod api;
pub use api::problem::{
    forbidden, internal_error, service_unavailable, unauthorized, Problem, ProblemResponse,
};

pub mod auth;
pub use auth::{AdminOnly, AuthError, AuthGate, Authenticated, Caller, ADMIN_ROLE};

pub mod runtime;
pub use runtime::{run, DbOptions, RunOptions, ShutdownOptions};
