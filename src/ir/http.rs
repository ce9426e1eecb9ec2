//! HTTP-surface IR: middleware, controllers, actions and their directives.

use crate::case::{class_basename, to_camel_case};
use crate::ir::code::{Argument, Call, Method};
use indexmap::IndexMap;
use serde::Serialize;

/// Actions a resource controller expands to, in order.
pub const RESOURCE_ACTIONS: &[&str] = &["index", "create", "show", "update", "delete"];

/// Resource actions that bind the first resource model.
pub const RESOURCE_MODEL_ACTIONS: &[&str] = &["show", "update", "delete"];

/// Actions whose path is the bare controller segment (plus bound models).
const BASE_PATH_ACTIONS: &[&str] = &["index", "store", "show", "update", "destroy", "delete"];

pub const INVOKE_ACTION: &str = "invoke";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Options,
    Head,
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_lowercase().as_str() {
            "options" => Verb::Options,
            "head" => Verb::Head,
            "get" => Verb::Get,
            "post" => Verb::Post,
            "put" => Verb::Put,
            "patch" => Verb::Patch,
            "delete" => Verb::Delete,
            _ => return None,
        })
    }

    /// Verbs guessed from a conventional action name; unknown names are GET.
    pub fn for_action(action: &str) -> Vec<Verb> {
        match action {
            "index" | "create" | "show" | "edit" => vec![Verb::Get],
            "store" => vec![Verb::Post],
            "update" => vec![Verb::Put, Verb::Patch],
            "destroy" | "delete" => vec![Verb::Delete],
            _ => vec![Verb::Get],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Route {
    pub verbs: Vec<Verb>,
    pub path: String,
    pub name: String,
    /// True when verbs, path and name were inferred rather than declared.
    pub guessed: bool,
}

impl Route {
    /// Path segment for an action: `""` for invoke and base-path actions, otherwise the action name.
    pub fn action_segment(action: &str) -> &str {
        if action == INVOKE_ACTION || BASE_PATH_ACTIONS.contains(&action) {
            ""
        } else {
            action
        }
    }
}

/// A model bound as a route parameter of an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModelParameter {
    /// Key of the bound entity.
    pub entity: String,
    pub variable: String,
    pub bind_column: Option<String>,
}

impl ModelParameter {
    /// e.g. `{post}` or `{post:slug}`
    pub fn qualified_path(&self) -> String {
        match &self.bind_column {
            Some(col) => format!("{{{}:{}}}", self.variable, col),
            None => format!("{{{}}}", self.variable),
        }
    }

    /// e.g. `comment/{comment}`
    pub fn directory_qualified_path(&self) -> String {
        format!(
            "{}/{}",
            to_camel_case(class_basename(&self.entity)),
            self.qualified_path()
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Authorize {
    Disabled,
    Ability {
        ability: String,
        /// Entity key passed as the class argument, when authorizing against a class.
        entity: Option<String>,
        parameters: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Validation {
    /// Validation delegated to an external validator class.
    Delegated { class: String },
    /// Per-field rules, each rule a call such as `max:255`.
    Inline { fields: IndexMap<String, Vec<Method>> },
}

impl Validation {
    pub fn is_delegated(&self) -> bool {
        matches!(self, Validation::Delegated { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    Entity(String),
    Variable(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Query {
    pub variable: String,
    pub source: QuerySource,
    pub methods: Vec<Method>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Save {
    pub variable: String,
    /// Entity key to create when the target names a model.
    pub entity: Option<String>,
    pub merge: IndexMap<String, serde_json::Value>,
    pub from_form_request: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "to", rename_all = "snake_case")]
pub enum Redirect {
    Back,
    Url { path: String },
    Route { name: String, arguments: Vec<Argument> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct View {
    pub name: String,
    pub variables: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Action {
    pub name: String,
    pub route: Route,
    pub models: Vec<ModelParameter>,
    pub authorize: Authorize,
    pub validate: Option<Validation>,
    pub queries: Vec<Query>,
    pub save: Option<Save>,
    pub delete: Option<String>,
    pub fire: Vec<Call>,
    pub notify: Vec<Call>,
    pub flash: Vec<Call>,
    pub redirect: Option<Redirect>,
    pub view: Option<View>,
    /// Action produced by resource expansion rather than declared.
    pub from_resource: bool,
}

impl Action {
    pub fn method_name(&self) -> &str {
        if self.name == INVOKE_ACTION {
            "__invoke"
        } else {
            &self.name
        }
    }

    /// Variables in scope for directives: bound models, then queries.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.models
            .iter()
            .map(|m| m.variable.as_str())
            .chain(self.queries.iter().map(|q| q.variable.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceController {
    /// Entity keys the resource is built around.
    pub entities: Vec<String>,
    pub json: bool,
    pub api: bool,
    pub only: Vec<String>,
    pub except: Vec<String>,
    /// Resource actions left after `only` / `except` filtering.
    pub actions: Vec<String>,
}

impl ResourceController {
    pub fn uses_all_actions(&self) -> bool {
        self.only.is_empty() && self.except.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Middleware {
    pub alias: String,
    pub class: String,
    pub terminable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Controller {
    pub key: String,
    pub class: String,
    pub namespace: String,
    pub invokable: bool,
    pub resource: Option<ResourceController>,
    pub middleware: Vec<Method>,
    pub actions: Vec<Action>,
}

impl Controller {
    pub fn full_class(&self) -> String {
        format!("{}\\{}", self.namespace.trim_matches('\\'), self.class)
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_from_action_names() {
        assert_eq!(Verb::for_action("store"), vec![Verb::Post]);
        assert_eq!(Verb::for_action("update"), vec![Verb::Put, Verb::Patch]);
        assert_eq!(Verb::for_action("destroy"), vec![Verb::Delete]);
        assert_eq!(Verb::for_action("publish"), vec![Verb::Get]);
        assert_eq!(Verb::parse("PATCH"), Some(Verb::Patch));
        assert_eq!(Verb::parse("fetch"), None);
    }

    #[test]
    fn model_parameter_paths() {
        let p = ModelParameter {
            entity: "BlogPost".into(),
            variable: "post".into(),
            bind_column: Some("slug".into()),
        };
        assert_eq!(p.qualified_path(), "{post:slug}");
        assert_eq!(p.directory_qualified_path(), "blogPost/{post:slug}");
    }

    #[test]
    fn action_segments() {
        assert_eq!(Route::action_segment("index"), "");
        assert_eq!(Route::action_segment("invoke"), "");
        assert_eq!(Route::action_segment("create"), "create");
    }
}
