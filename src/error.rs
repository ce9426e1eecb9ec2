//! Typed errors and their taxonomy.

use thiserror::Error;

/// Failures while turning raw text or files into a [`crate::config::ScaffoldDocument`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config load: {0}")]
    Load(String),
}

/// Coarse classification of a [`ScaffoldError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Reference,
    Structural,
    Collision,
    Precondition,
    Config,
}

#[derive(Error, Debug)]
pub enum ScaffoldError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("missing reference: {kind} '{id}' used by '{owner}' does not exist")]
    MissingReference {
        kind: &'static str,
        id: String,
        owner: String,
    },
    #[error("invalid declaration for '{owner}': {detail}")]
    Structural { owner: String, detail: String },
    #[error("invalid primary key: entity '{entity}' column '{column}' is not in the list of columns")]
    InvalidPrimaryKey { entity: String, column: String },
    #[error("table collision: table '{table}' of '{first}' is already declared by '{second}'")]
    TableCollision {
        table: String,
        first: String,
        second: String,
    },
    #[error("column collision: column '{column}' of relation '{relation}' is already declared on entity '{entity}'")]
    ColumnCollision {
        entity: String,
        relation: String,
        column: String,
    },
    #[error("relation '{relation}' needs a join table: create a primary key for [{entity}] or declare a pivot entity with 'using'")]
    MissingPrimaryKey { entity: String, relation: String },
    #[error("relation '{relation}' of [{entity}] references itself: declare a pivot entity with 'using'")]
    SelfReferencingPivot { entity: String, relation: String },
}

impl ScaffoldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScaffoldError::Config(_) => ErrorKind::Config,
            ScaffoldError::MissingReference { .. } => ErrorKind::Reference,
            ScaffoldError::Structural { .. } | ScaffoldError::InvalidPrimaryKey { .. } => {
                ErrorKind::Structural
            }
            ScaffoldError::TableCollision { .. } | ScaffoldError::ColumnCollision { .. } => {
                ErrorKind::Collision
            }
            ScaffoldError::MissingPrimaryKey { .. } | ScaffoldError::SelfReferencingPivot { .. } => {
                ErrorKind::Precondition
            }
        }
    }

    pub(crate) fn structural(owner: impl Into<String>, detail: impl Into<String>) -> Self {
        ScaffoldError::Structural {
            owner: owner.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn missing(kind: &'static str, id: impl Into<String>, owner: impl Into<String>) -> Self {
        ScaffoldError::MissingReference {
            kind,
            id: id.into(),
            owner: owner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_reference_names_the_key() {
        let err = ScaffoldError::missing("entity", "Author", "Post.author");
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(err.to_string().contains("'Author'"));
        assert!(err.to_string().contains("Post.author"));
    }

    #[test]
    fn table_collision_names_both_sides() {
        let err = ScaffoldError::TableCollision {
            table: "posts".into(),
            first: "Post".into(),
            second: "migrations.posts".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Collision);
        let msg = err.to_string();
        assert!(msg.contains("posts") && msg.contains("Post") && msg.contains("migrations.posts"));
    }

    #[test]
    fn config_errors_are_wrapped() {
        let yaml = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
        let err: ScaffoldError = ConfigError::from(yaml).into();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
