//! Raw document types: the declarative scaffold as written, before resolution.
//! Values whose shape varies (string or map, bool or block) are decided here, once, as tagged variants.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` the same as an absent key.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A column entry: a builder line, or a nested map marking a relation placeholder.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Scalar(String),
    Relation(RelationSpec),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationSpec {
    /// Relation line, e.g. `belongsTo:User column:author_id withDefault`.
    #[serde(default)]
    pub relation: Option<String>,
}

impl<'de> Deserialize<'de> for ColumnSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        match v {
            serde_json::Value::String(s) => Ok(ColumnSpec::Scalar(s)),
            serde_json::Value::Object(mut obj) => match obj.remove("relation") {
                Some(serde_json::Value::String(s)) => Ok(ColumnSpec::Relation(RelationSpec {
                    relation: Some(s),
                })),
                None | Some(serde_json::Value::Null) => Ok(ColumnSpec::Relation(RelationSpec::default())),
                Some(other) => Err(serde::de::Error::custom(format!(
                    "relation must be a string line; got {}",
                    type_name_of_json(&other)
                ))),
            },
            other => Err(serde::de::Error::custom(format!(
                "column must be a string line or {{ \"relation\": \"...\" }}; got {}",
                type_name_of_json(&other)
            ))),
        }
    }
}

fn type_name_of_json(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Space-separated words or a list of words.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Words {
    Line(String),
    List(Vec<String>),
}

impl Words {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Words::Line(s) => s.split_whitespace().map(str::to_string).collect(),
            Words::List(v) => v.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
        }
    }
}

/// One directive line or a list of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lines {
    One(String),
    Many(Vec<String>),
}

impl Lines {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Lines::One(s) => vec![s.clone()],
            Lines::Many(v) => v.clone(),
        }
    }
}

/// Validation rules: `required|max:255` or a list of rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RulesConfig {
    Line(String),
    List(Vec<String>),
}

impl RulesConfig {
    pub fn to_vec(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            RulesConfig::Line(s) => s.split('|').collect(),
            RulesConfig::List(v) => v.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryBlock {
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default, rename = "type")]
    pub key_type: Option<String>,
    #[serde(default)]
    pub incrementing: Option<bool>,
}

/// `primary: false` disables the key; a block declares it explicitly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryConfig {
    Toggle(bool),
    Declared(PrimaryBlock),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventsConfig {
    /// Event names; handlers are named `<Class><Event>`.
    List(Vec<String>),
    /// Event name -> handler class.
    Map(IndexMap<String, String>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampsConfig {
    Toggle(bool),
    Columns {
        #[serde(default)]
        created_at: Option<String>,
        #[serde(default)]
        updated_at: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoftDeletesConfig {
    Toggle(bool),
    Column(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default)]
    pub columns: Option<IndexMap<String, ColumnSpec>>,
    #[serde(default)]
    pub primary: Option<PrimaryConfig>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default, rename = "type")]
    pub model_type: Option<String>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default, deserialize_with = "nullable")]
    pub fillable: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub events: Option<EventsConfig>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub json: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub repository: bool,
    #[serde(default)]
    pub factory: Option<bool>,
    #[serde(default)]
    pub timestamps: Option<TimestampsConfig>,
    #[serde(default)]
    pub soft_deletes: Option<SoftDeletesConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub models: IndexMap<String, ModelConfig>,
    /// Explicit table schemas: table -> column -> line.
    #[serde(default, deserialize_with = "nullable")]
    pub migrations: IndexMap<String, IndexMap<String, ColumnSpec>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub terminable: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceOptions {
    #[serde(default)]
    pub models: Option<Words>,
    #[serde(default, deserialize_with = "nullable")]
    pub json: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub api: bool,
    #[serde(default)]
    pub only: Option<Words>,
    #[serde(default)]
    pub except: Option<Words>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceConfig {
    Toggle(bool),
    Declared(ResourceOptions),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorizeConfig {
    Toggle(bool),
    Line(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidateConfig {
    /// External validator class.
    Delegated(String),
    Fields(IndexMap<String, RulesConfig>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelsConfig {
    Line(String),
    List(Vec<String>),
    /// variable -> `Model[:column]`
    Named(IndexMap<String, String>),
}

impl ModelsConfig {
    /// (explicit variable, `Model[:column]`) pairs in declaration order.
    pub fn entries(&self) -> Vec<(Option<String>, String)> {
        match self {
            ModelsConfig::Line(s) => s.split_whitespace().map(|t| (None, t.to_string())).collect(),
            ModelsConfig::List(v) => v.iter().map(|t| (None, t.trim().to_string())).collect(),
            ModelsConfig::Named(m) => m.iter().map(|(k, v)| (Some(k.clone()), v.trim().to_string())).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SaveConfig {
    /// `Model` to create, or a variable to save.
    Target(String),
    /// variable -> attributes merged before saving.
    Merge(IndexMap<String, IndexMap<String, serde_json::Value>>),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub authorize: Option<AuthorizeConfig>,
    #[serde(default)]
    pub validate: Option<ValidateConfig>,
    #[serde(default)]
    pub models: Option<ModelsConfig>,
    #[serde(default, deserialize_with = "nullable")]
    pub queries: IndexMap<String, String>,
    #[serde(default)]
    pub save: Option<SaveConfig>,
    #[serde(default)]
    pub delete: Option<String>,
    #[serde(default)]
    pub fire: Option<Lines>,
    #[serde(default)]
    pub notify: Option<Lines>,
    #[serde(default)]
    pub flash: Option<Lines>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub view: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default, deserialize_with = "nullable")]
    pub invoke: bool,
    #[serde(default)]
    pub resource: Option<ResourceConfig>,
    #[serde(default, deserialize_with = "nullable")]
    pub middleware: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub actions: IndexMap<String, Option<ActionConfig>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpSection {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub middleware: IndexMap<String, Option<MiddlewareConfig>>,
    #[serde(default, deserialize_with = "nullable")]
    pub controllers: IndexMap<String, ControllerConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyConfig {
    Toggle(bool),
    Actions(Words),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormConfig {
    #[serde(default)]
    pub authorize: Option<AuthorizeConfig>,
    #[serde(default, deserialize_with = "nullable")]
    pub rules: IndexMap<String, RulesConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthSection {
    /// ability -> optional `Handler@method`
    #[serde(default, deserialize_with = "nullable")]
    pub gates: IndexMap<String, Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub policies: IndexMap<String, Option<PolicyConfig>>,
    #[serde(default, deserialize_with = "nullable")]
    pub forms: IndexMap<String, Option<FormConfig>>,
}

/// The whole declarative description, one section per concern. Every section is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaffoldDocument {
    #[serde(default, deserialize_with = "nullable")]
    pub database: DatabaseSection,
    #[serde(default, deserialize_with = "nullable")]
    pub http: HttpSection,
    #[serde(default, deserialize_with = "nullable")]
    pub auth: AuthSection,
}
