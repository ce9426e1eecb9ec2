//! Authorization IR: gates, policies and form requests.

use crate::ir::code::Method;
use indexmap::IndexMap;
use serde::Serialize;

/// Abilities a policy may grant.
pub const POLICY_ACTIONS: &[&str] = &["index", "show", "create", "update", "delete"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Gate {
    pub ability: String,
    /// Handler class, from `Class@method`.
    pub handler: Option<String>,
    pub method: Option<String>,
}

impl Gate {
    pub fn new(ability: &str, handler: Option<&str>) -> Self {
        let (handler, method) = match handler.map(str::trim).filter(|h| !h.is_empty()) {
            Some(h) => match h.split_once('@') {
                Some((class, method)) => (Some(class.to_string()), Some(method.to_string())),
                None => (Some(h.to_string()), None),
            },
            None => (None, None),
        };
        Gate {
            ability: ability.to_string(),
            handler,
            method,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Policy {
    /// Key of the entity the policy guards.
    pub entity: String,
    pub class: String,
    /// Granted abilities, always in vocabulary order.
    pub actions: Vec<String>,
}

impl Policy {
    pub fn allows(&self, ability: &str) -> bool {
        self.actions.iter().any(|a| a == ability)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FormAuthorization {
    Allow,
    Deny,
    Ability { ability: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Form {
    pub name: String,
    pub class: String,
    pub authorize: FormAuthorization,
    pub rules: IndexMap<String, Vec<Method>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_handler_split() {
        let g = Gate::new("view-dashboard", Some("DashboardGate@view"));
        assert_eq!(g.handler.as_deref(), Some("DashboardGate"));
        assert_eq!(g.method.as_deref(), Some("view"));
        let bare = Gate::new("admin", None);
        assert!(bare.handler.is_none() && bare.method.is_none());
    }
}
