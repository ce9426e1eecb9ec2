//! Document validation: shape checks that need no cross-references, run before any stage.

use crate::config::types::{
    ColumnSpec, ControllerConfig, ModelConfig, PrimaryBlock, PrimaryConfig, ResourceConfig, ScaffoldDocument,
};
use crate::error::ScaffoldError;
use crate::ir::ModelType;
use indexmap::IndexMap;

fn validate_columns(owner: &str, columns: &IndexMap<String, ColumnSpec>, allow_relations: bool) -> Result<(), ScaffoldError> {
    for (name, spec) in columns {
        let column_owner = format!("{}.{}", owner, name);
        match spec {
            ColumnSpec::Scalar(line) if line.trim().is_empty() => {
                return Err(ScaffoldError::structural(column_owner, "empty column line"));
            }
            ColumnSpec::Scalar(_) => {}
            ColumnSpec::Relation(_) if !allow_relations => {
                return Err(ScaffoldError::structural(column_owner, "explicit migrations take column lines only"));
            }
            ColumnSpec::Relation(rel) => {
                if rel.relation.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    return Err(ScaffoldError::structural(
                        column_owner,
                        "nested column requires a 'relation' line",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// The entity's column block, which must be present and declare at least one column.
pub(crate) fn model_columns<'a>(key: &str, model: &'a ModelConfig) -> Result<&'a IndexMap<String, ColumnSpec>, ScaffoldError> {
    match &model.columns {
        None => Err(ScaffoldError::structural(key, "missing 'columns' block")),
        Some(columns) if columns.is_empty() => Err(ScaffoldError::structural(key, "'columns' block declares no columns")),
        Some(columns) => Ok(columns),
    }
}

pub(crate) fn model_type(key: &str, model: &ModelConfig) -> Result<ModelType, ScaffoldError> {
    match &model.model_type {
        Some(t) => ModelType::parse(t).ok_or_else(|| {
            ScaffoldError::structural(key, format!("unknown type '{}' (expected model, pivot or morphPivot)", t))
        }),
        None => Ok(ModelType::Model),
    }
}

/// Column, type and incrementing flag of a declared primary block.
pub(crate) fn primary_block<'a>(key: &str, block: &'a PrimaryBlock) -> Result<(&'a str, &'a str, bool), ScaffoldError> {
    match (&block.column, &block.key_type, block.incrementing) {
        (Some(column), Some(key_type), Some(incrementing)) => Ok((column.as_str(), key_type.as_str(), incrementing)),
        _ => Err(ScaffoldError::structural(
            key,
            "primary block requires 'column', 'type' and 'incrementing'",
        )),
    }
}

pub(crate) fn invokable_shape(key: &str, controller: &ControllerConfig) -> Result<(), ScaffoldError> {
    if controller.actions.len() > 1 {
        return Err(ScaffoldError::structural(
            key,
            format!("invokable controller declares {} actions, expected at most one", controller.actions.len()),
        ));
    }
    if matches!(controller.resource, Some(ResourceConfig::Declared(_)) | Some(ResourceConfig::Toggle(true))) {
        return Err(ScaffoldError::structural(key, "invokable controller cannot be a resource"));
    }
    Ok(())
}

pub fn validate(doc: &ScaffoldDocument) -> Result<(), ScaffoldError> {
    for (key, model) in &doc.database.models {
        validate_columns(key, model_columns(key, model)?, true)?;
        model_type(key, model)?;
        if let Some(PrimaryConfig::Declared(block)) = &model.primary {
            primary_block(key, block)?;
        }
    }

    for (table, columns) in &doc.database.migrations {
        validate_columns(&format!("migrations.{}", table), columns, false)?;
    }

    for (key, controller) in &doc.http.controllers {
        if controller.invoke {
            invokable_shape(key, controller)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn doc(yaml: &str) -> ScaffoldDocument {
        ScaffoldDocument::from_yaml(yaml).unwrap()
    }

    #[test]
    fn missing_columns_block_names_the_entity() {
        let err = validate(&doc("database:\n  models:\n    Post: {table: posts}\n")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("Post"));
    }

    #[test]
    fn empty_columns_block_is_rejected() {
        let err = validate(&doc("database:\n  models:\n    Post:\n      columns: {}\n")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("Post"));
        assert!(err.to_string().contains("no columns"));
    }

    #[test]
    fn relation_placeholder_needs_a_line() {
        let err = validate(&doc("database:\n  models:\n    Post:\n      columns:\n        author: {}\n")).unwrap_err();
        assert!(err.to_string().contains("Post.author"));
    }

    #[test]
    fn incomplete_primary_block() {
        let err = validate(&doc(
            "database:\n  models:\n    Post:\n      columns: {uuid: uuid}\n      primary: {column: uuid}\n",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("incrementing"));
    }

    #[test]
    fn unknown_model_type() {
        let err = validate(&doc("database:\n  models:\n    Post:\n      columns: {id: id}\n      type: view\n")).unwrap_err();
        assert!(err.to_string().contains("view"));
    }

    #[test]
    fn invokable_controller_has_one_action() {
        let err = validate(&doc(
            "http:\n  controllers:\n    ReportController:\n      invoke: true\n      actions: {a: ~, b: ~}\n",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("ReportController"));
        assert!(validate(&doc("http:\n  controllers:\n    ReportController: {invoke: true}\n")).is_ok());
    }

    #[test]
    fn explicit_migration_rejects_relations() {
        let err = validate(&doc(
            "database:\n  migrations:\n    jobs:\n      owner: {relation: belongsTo:User}\n",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("migrations.jobs.owner"));
    }
}
