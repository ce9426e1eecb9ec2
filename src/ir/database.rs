//! Data-layer IR: entities, columns, relations and migrations.

use crate::case::{to_snake_case, to_studly_case};
use crate::ir::code::{Argument, Method};
use indexmap::IndexMap;
use serde::Serialize;

/// Column type tokens that make a column the primary key when found first.
pub const IDENTITY_TOKENS: &[&str] = &[
    "id",
    "increments",
    "integerIncrements",
    "tinyIncrements",
    "smallIncrements",
    "mediumIncrements",
    "bigIncrements",
];

/// Incrementing token -> the plain integer type a referencing column must use.
const INCREMENTING_TO_STORAGE: &[(&str, &str)] = &[
    ("id", "unsignedBigInteger"),
    ("increments", "unsignedInteger"),
    ("integerIncrements", "unsignedInteger"),
    ("tinyIncrements", "unsignedTinyInteger"),
    ("smallIncrements", "unsignedSmallInteger"),
    ("mediumIncrements", "unsignedMediumInteger"),
    ("bigIncrements", "unsignedBigInteger"),
];

const INTEGER_TOKENS: &[&str] = &[
    "integer",
    "tinyInteger",
    "smallInteger",
    "mediumInteger",
    "bigInteger",
    "unsignedInteger",
    "unsignedTinyInteger",
    "unsignedSmallInteger",
    "unsignedMediumInteger",
    "unsignedBigInteger",
];
const FLOAT_TOKENS: &[&str] = &["decimal", "double", "float", "point", "unsignedDecimal"];
const BOOL_TOKENS: &[&str] = &["bool", "boolean"];
const ARRAY_TOKENS: &[&str] = &["json", "jsonb"];
const DATE_TOKENS: &[&str] = &[
    "date",
    "dateTime",
    "dateTimeTz",
    "time",
    "timeTz",
    "timestamp",
    "timestampTz",
    "year",
];

/// Model event names a lifecycle binding may use.
pub const OBSERVABLE_EVENTS: &[&str] = &[
    "retrieved",
    "creating",
    "created",
    "updating",
    "updated",
    "saving",
    "saved",
    "restoring",
    "restored",
    "replicating",
    "deleting",
    "deleted",
    "forceDeleted",
];

pub const DEFAULT_PER_PAGE: u32 = 15;
pub const DEFAULT_SOFT_DELETE_COLUMN: &str = "deleted_at";

pub fn is_identity_token(token: &str) -> bool {
    IDENTITY_TOKENS.contains(&token)
}

/// Storage type for a column that references a key of type `token`.
pub fn storage_type(token: &str) -> &str {
    INCREMENTING_TO_STORAGE
        .iter()
        .find(|(t, _)| *t == token)
        .map(|(_, s)| *s)
        .unwrap_or(token)
}

/// Language-level value type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Int,
    Float,
    Bool,
    Array,
    DateTime,
    String,
}

impl ValueType {
    pub fn of(token: &str) -> Self {
        if is_identity_token(token) || INTEGER_TOKENS.contains(&token) {
            ValueType::Int
        } else if FLOAT_TOKENS.contains(&token) {
            ValueType::Float
        } else if BOOL_TOKENS.contains(&token) {
            ValueType::Bool
        } else if ARRAY_TOKENS.contains(&token) {
            ValueType::Array
        } else if DATE_TOKENS.contains(&token) {
            ValueType::DateTime
        } else {
            ValueType::String
        }
    }
}

/// Attribute cast applied when reading a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CastType {
    Integer,
    Float,
    Bool,
    Array,
}

impl CastType {
    pub fn of(token: &str) -> Option<Self> {
        match ValueType::of(token) {
            ValueType::Int => Some(CastType::Integer),
            ValueType::Float => Some(CastType::Float),
            ValueType::Bool => Some(CastType::Bool),
            ValueType::Array => Some(CastType::Array),
            ValueType::DateTime | ValueType::String => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    /// Arguments of the type call itself, e.g. `100` in `string:100`.
    pub type_arguments: Vec<Argument>,
    pub methods: Vec<Method>,
    /// Name of the relation (on the owning entity) this column was synthesized for.
    pub relation: Option<String>,
}

impl Column {
    /// Build a column from its parsed line; the first call is the type. None for an empty line.
    pub fn from_methods(name: &str, mut methods: Vec<Method>) -> Option<Self> {
        if methods.is_empty() {
            return None;
        }
        let type_call = methods.remove(0);
        Some(Column {
            name: name.to_string(),
            column_type: type_call.name,
            type_arguments: type_call.arguments,
            methods,
            relation: None,
        })
    }

    pub fn for_relation(name: &str, column_type: &str, relation: &str) -> Self {
        Column {
            name: name.to_string(),
            column_type: column_type.to_string(),
            type_arguments: Vec::new(),
            methods: Vec::new(),
            relation: Some(relation.to_string()),
        }
    }

    pub fn is_identity(&self) -> bool {
        is_identity_token(&self.column_type)
    }

    pub fn value_type(&self) -> ValueType {
        ValueType::of(&self.column_type)
    }

    pub fn cast_type(&self) -> Option<CastType> {
        CastType::of(&self.column_type)
    }

    pub fn is_date(&self) -> bool {
        DATE_TOKENS.contains(&self.column_type.as_str())
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PrimaryKey {
    pub column: String,
    /// Plain storage type, after mapping incrementing tokens (e.g. `increments` -> `unsignedInteger`).
    pub storage_type: String,
    pub incrementing: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Timestamps {
    pub using: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Default for Timestamps {
    fn default() -> Self {
        Timestamps {
            using: true,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SoftDelete {
    pub using: bool,
    pub column: String,
}

impl Default for SoftDelete {
    fn default() -> Self {
        SoftDelete {
            using: false,
            column: DEFAULT_SOFT_DELETE_COLUMN.to_string(),
        }
    }
}

impl SoftDelete {
    pub fn uses_non_default_column(&self) -> bool {
        self.column != DEFAULT_SOFT_DELETE_COLUMN
    }
}

/// Parent type of the generated record class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelType {
    #[default]
    Model,
    Pivot,
    MorphPivot,
}

impl ModelType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "model" => Some(ModelType::Model),
            "pivot" => Some(ModelType::Pivot),
            "morphpivot" | "morph_pivot" => Some(ModelType::MorphPivot),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    HasOne,
    HasOneThrough,
    HasMany,
    HasManyThrough,
    BelongsTo,
    BelongsToMany,
    MorphOne,
    MorphMany,
    MorphTo,
    MorphToMany,
    MorphedByMany,
}

impl RelationKind {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "hasOne" => RelationKind::HasOne,
            "hasOneThrough" => RelationKind::HasOneThrough,
            "hasMany" => RelationKind::HasMany,
            "hasManyThrough" => RelationKind::HasManyThrough,
            "belongsTo" => RelationKind::BelongsTo,
            "belongsToMany" => RelationKind::BelongsToMany,
            "morphOne" => RelationKind::MorphOne,
            "morphMany" => RelationKind::MorphMany,
            "morphTo" => RelationKind::MorphTo,
            "morphToMany" => RelationKind::MorphToMany,
            "morphedByMany" => RelationKind::MorphedByMany,
            _ => return None,
        })
    }

    /// Kinds that keep a foreign key on the declaring entity.
    pub fn needs_column(self) -> bool {
        matches!(self, RelationKind::BelongsTo | RelationKind::MorphTo)
    }

    pub fn uses_pivot(self) -> bool {
        matches!(
            self,
            RelationKind::BelongsToMany | RelationKind::MorphToMany | RelationKind::MorphedByMany
        )
    }

    pub fn is_polymorphic_pivot(self) -> bool {
        matches!(self, RelationKind::MorphToMany | RelationKind::MorphedByMany)
    }

    pub fn is_through(self) -> bool {
        matches!(self, RelationKind::HasOneThrough | RelationKind::HasManyThrough)
    }

    /// Model type an explicit pivot entity must have for this kind.
    pub fn pivot_type(self) -> ModelType {
        if self.is_polymorphic_pivot() {
            ModelType::MorphPivot
        } else {
            ModelType::Pivot
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    /// Key of the related entity; only `morphTo` may leave it unset.
    pub target: Option<String>,
    pub through: Option<String>,
    /// Key of the explicit pivot entity given with `using`.
    pub using_pivot: Option<String>,
    pub methods: Vec<Method>,
    pub belonging_column: Option<String>,
    pub with_default: bool,
    pub with_pivot: Vec<String>,
}

impl Relation {
    /// Pivot-requiring relation whose join table has to be synthesized.
    pub fn needs_guessed_pivot(&self) -> bool {
        self.kind.uses_pivot() && self.using_pivot.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub key: String,
    pub class: String,
    pub namespace: String,
    pub model_type: ModelType,
    pub table: String,
    pub table_declared: bool,
    pub columns: IndexMap<String, Column>,
    pub relations: IndexMap<String, Relation>,
    pub primary: Option<PrimaryKey>,
    pub timestamps: Timestamps,
    pub soft_delete: SoftDelete,
    pub fillable: Vec<String>,
    pub per_page: u32,
    pub route_binding: Option<String>,
    pub uses_json_resource: bool,
    pub uses_repository: bool,
    pub uses_factory: bool,
    pub global_scopes: Vec<String>,
    /// Event name -> handler class, in declaration order.
    pub events: IndexMap<String, String>,
}

impl Entity {
    pub fn full_class(&self) -> String {
        format!("{}\\{}", self.namespace.trim_matches('\\'), self.class)
    }

    /// Snake-case class name used for foreign keys and join tables. e.g. "BlogPost" -> "blog_post"
    pub fn singular(&self) -> String {
        to_snake_case(&self.class)
    }

    pub fn uses_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn uses_non_default_per_page(&self) -> bool {
        self.per_page != DEFAULT_PER_PAGE
    }

    pub fn uses_non_default_table(&self) -> bool {
        self.table_declared
    }

    pub fn is_pivot(&self) -> bool {
        matches!(self.model_type, ModelType::Pivot | ModelType::MorphPivot)
    }

    pub fn casts(&self) -> IndexMap<String, CastType> {
        self.columns
            .values()
            .filter_map(|c| c.cast_type().map(|t| (c.name.clone(), t)))
            .collect()
    }

    pub fn dates(&self) -> Vec<String> {
        self.columns
            .values()
            .filter(|c| c.is_date())
            .map(|c| c.name.clone())
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
    Fulltext,
    SpatialIndex,
}

impl IndexKind {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "primary" => IndexKind::Primary,
            "unique" => IndexKind::Unique,
            "index" => IndexKind::Index,
            "fulltext" => IndexKind::Fulltext,
            "spatialIndex" => IndexKind::SpatialIndex,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Index {
    pub kind: IndexKind,
    pub columns: Vec<String>,
    /// Explicit index name; unnamed indexes are identified by position.
    pub name: Option<String>,
}

impl Index {
    /// Indexes declared through column modifiers such as `unique` or `index:posts_slug_index`.
    pub fn from_columns<'a>(columns: impl IntoIterator<Item = &'a Column>) -> Vec<Index> {
        columns
            .into_iter()
            .flat_map(|c| {
                c.methods.iter().filter_map(move |m| {
                    IndexKind::parse(&m.name).map(|kind| Index {
                        kind,
                        columns: vec![c.name.clone()],
                        name: m.first_literal().map(str::to_string),
                    })
                })
            })
            .collect()
    }
}

/// Where a migration came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MigrationSource {
    Entity { entity: String },
    Explicit,
    Pivot { entity: String, relation: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Migration {
    pub table: String,
    pub columns: Vec<Column>,
    pub primary: Option<String>,
    pub indexes: Vec<Index>,
    pub source: MigrationSource,
    pub timestamps: bool,
    pub soft_delete: Option<String>,
}

impl Migration {
    pub fn class_name(&self) -> String {
        format!("Create{}Table", to_studly_case(&self.table))
    }

    pub fn from_guessed_pivot(&self) -> bool {
        matches!(self.source, MigrationSource::Pivot { .. })
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}
