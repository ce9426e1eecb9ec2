//! Resolution pipeline: an ordered list of stages over one mutable context.
//!
//! Entities are all built before relations are resolved, so references between
//! entities may point forwards or backwards in declaration order.

pub mod auth;
pub mod entities;
pub mod http;
pub mod migrations;
pub mod relations;

use crate::case::{class_basename, to_studly_case};
use crate::config::{validate, ResolvedAuth, ResolvedDatabase, ResolvedHttp, Scaffold, ScaffoldDocument};
use crate::error::ScaffoldError;
use crate::ir::{Controller, Entity, Form, Gate, Middleware, Migration, Policy};
use indexmap::IndexMap;

pub const DEFAULT_DATABASE_NAMESPACE: &str = "App";
pub const DEFAULT_HTTP_NAMESPACE: &str = "App\\Http\\Controllers";

/// State shared by the stages of one run. Every table is keyed and kept in declaration order.
pub struct ResolutionContext<'a> {
    pub document: &'a ScaffoldDocument,
    pub database_namespace: String,
    pub http_namespace: String,
    pub entities: IndexMap<String, Entity>,
    pub migrations: IndexMap<String, Migration>,
    pub middleware: IndexMap<String, Middleware>,
    pub controllers: IndexMap<String, Controller>,
    pub gates: IndexMap<String, Gate>,
    pub policies: IndexMap<String, Policy>,
    pub forms: IndexMap<String, Form>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(document: &'a ScaffoldDocument) -> Self {
        ResolutionContext {
            document,
            database_namespace: document
                .database
                .namespace
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE_NAMESPACE.to_string()),
            http_namespace: document
                .http
                .namespace
                .clone()
                .unwrap_or_else(|| DEFAULT_HTTP_NAMESPACE.to_string()),
            entities: IndexMap::new(),
            migrations: IndexMap::new(),
            middleware: IndexMap::new(),
            controllers: IndexMap::new(),
            gates: IndexMap::new(),
            policies: IndexMap::new(),
            forms: IndexMap::new(),
        }
    }

    /// Key of the entity `name` refers to: an exact key, else a unique studly class name.
    pub fn entity_key(&self, name: &str, owner: &str) -> Result<String, ScaffoldError> {
        if self.entities.contains_key(name) {
            return Ok(name.to_string());
        }
        let class = to_studly_case(class_basename(name));
        let mut matches = self.entities.values().filter(|e| e.class == class);
        match (matches.next(), matches.next()) {
            (Some(e), None) => Ok(e.key.clone()),
            (Some(a), Some(b)) => Err(ScaffoldError::structural(
                owner,
                format!("'{}' is ambiguous between entities '{}' and '{}'", name, a.key, b.key),
            )),
            (None, _) => Err(ScaffoldError::missing("entity", name, owner)),
        }
    }

    /// Resolved entity for `name`, see [`ResolutionContext::entity_key`].
    pub fn entity(&self, name: &str, owner: &str) -> Result<&Entity, ScaffoldError> {
        let key = self.entity_key(name, owner)?;
        self.entities
            .get(&key)
            .ok_or_else(|| ScaffoldError::missing("entity", key, owner))
    }

    fn into_scaffold(self) -> Scaffold {
        Scaffold {
            database: ResolvedDatabase {
                namespace: self.database_namespace,
                entities: self.entities,
                migrations: self.migrations,
            },
            http: ResolvedHttp {
                namespace: self.http_namespace,
                middleware: self.middleware,
                controllers: self.controllers,
            },
            auth: ResolvedAuth {
                gates: self.gates,
                policies: self.policies,
                forms: self.forms,
            },
        }
    }
}

pub type StageFn = fn(&mut ResolutionContext<'_>) -> Result<(), ScaffoldError>;

pub struct Stage {
    pub name: &'static str,
    pub run: StageFn,
}

/// Stages in execution order. Later stages read what earlier ones built.
pub const STAGES: &[Stage] = &[
    Stage {
        name: "entities",
        run: entities::resolve_entities,
    },
    Stage {
        name: "relations",
        run: relations::resolve_relations,
    },
    Stage {
        name: "migrations",
        run: migrations::resolve_migrations,
    },
    Stage {
        name: "http",
        run: http::resolve_http,
    },
    Stage {
        name: "auth",
        run: auth::resolve_auth,
    },
];

/// Build the resolved scaffold from a document. The first failing stage aborts the run.
pub fn resolve(document: &ScaffoldDocument) -> Result<Scaffold, ScaffoldError> {
    validate(document)?;
    let mut ctx = ResolutionContext::new(document);
    for stage in STAGES {
        tracing::debug!(stage = stage.name, "resolve stage");
        (stage.run)(&mut ctx)?;
    }
    tracing::info!(
        entities = ctx.entities.len(),
        migrations = ctx.migrations.len(),
        controllers = ctx.controllers.len(),
        policies = ctx.policies.len(),
        "scaffold resolved"
    );
    Ok(ctx.into_scaffold())
}
