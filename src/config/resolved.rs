//! Resolved scaffold: the validated, read-only IR handed to emitters.

use crate::ir::{Controller, Entity, Form, Gate, Middleware, Migration, Policy};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedDatabase {
    pub namespace: String,
    pub entities: IndexMap<String, Entity>,
    /// Keyed by table name: entity-derived, then explicit, then synthesized pivots.
    pub migrations: IndexMap<String, Migration>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedHttp {
    pub namespace: String,
    pub middleware: IndexMap<String, Middleware>,
    pub controllers: IndexMap<String, Controller>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResolvedAuth {
    pub gates: IndexMap<String, Gate>,
    /// Keyed by entity key.
    pub policies: IndexMap<String, Policy>,
    pub forms: IndexMap<String, Form>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Scaffold {
    pub database: ResolvedDatabase,
    pub http: ResolvedHttp,
    pub auth: ResolvedAuth,
}

impl Scaffold {
    pub fn entity(&self, key: &str) -> Option<&Entity> {
        self.database.entities.get(key)
    }

    pub fn migration(&self, table: &str) -> Option<&Migration> {
        self.database.migrations.get(table)
    }

    pub fn controller(&self, key: &str) -> Option<&Controller> {
        self.http.controllers.get(key)
    }

    pub fn policy(&self, entity: &str) -> Option<&Policy> {
        self.auth.policies.get(entity)
    }

    /// Pretty JSON snapshot of the whole IR, in declaration order.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
