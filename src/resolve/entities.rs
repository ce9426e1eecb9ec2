//! Entity & column resolution: one entity per declared model, with columns, primary key and model options.

use crate::case::{class_basename, namespace_prefix, plural_studly, to_snake_case, to_studly_case, upper_first};
use crate::config::validator::{self, model_columns, primary_block};
use crate::config::{ColumnSpec, EventsConfig, ModelConfig, PrimaryConfig, SoftDeletesConfig, TimestampsConfig};
use crate::error::ScaffoldError;
use crate::ir::{
    parse_line, storage_type, Column, Entity, PrimaryKey, SoftDelete, Timestamps, DEFAULT_PER_PAGE,
    OBSERVABLE_EVENTS,
};
use crate::resolve::ResolutionContext;
use indexmap::IndexMap;

pub fn resolve_entities(ctx: &mut ResolutionContext<'_>) -> Result<(), ScaffoldError> {
    let doc = ctx.document;
    for (key, model) in &doc.database.models {
        let entity = build_entity(key, model, &ctx.database_namespace)?;
        tracing::debug!(entity = %key, table = %entity.table, columns = entity.columns.len(), "entity");
        ctx.entities.insert(key.clone(), entity);
    }
    Ok(())
}

fn build_entity(key: &str, model: &ModelConfig, base_namespace: &str) -> Result<Entity, ScaffoldError> {
    let class = to_studly_case(class_basename(key));
    let namespace = match namespace_prefix(key) {
        Some(prefix) => format!("{}\\{}", base_namespace.trim_end_matches('\\'), prefix),
        None => base_namespace.to_string(),
    };

    let columns = build_columns(key, model_columns(key, model)?)?;
    let model_type = validator::model_type(key, model)?;

    let primary = resolve_primary(key, model.primary.as_ref(), &columns)?;

    let (table, table_declared) = match &model.table {
        Some(t) => (t.clone(), true),
        None => (to_snake_case(&plural_studly(&class)), false),
    };

    let route_binding = match &model.route {
        Some(col) if !columns.contains_key(col) => {
            return Err(ScaffoldError::missing("column", col.clone(), format!("{}.route", key)));
        }
        other => other.clone(),
    };

    let events = resolve_events(key, &class, model.events.as_ref())?;

    Ok(Entity {
        key: key.to_string(),
        class,
        namespace,
        model_type,
        table,
        table_declared,
        columns,
        relations: IndexMap::new(),
        primary,
        timestamps: resolve_timestamps(model.timestamps.as_ref()),
        soft_delete: resolve_soft_delete(model.soft_deletes.as_ref()),
        fillable: model.fillable.clone(),
        per_page: model.per_page.unwrap_or(DEFAULT_PER_PAGE),
        route_binding,
        uses_json_resource: model.json,
        uses_repository: model.repository,
        uses_factory: model.factory.unwrap_or(true),
        global_scopes: model.scopes.clone(),
        events,
    })
}

/// Scalar columns in declaration order. Relation placeholders are left to the relation stage.
pub(crate) fn build_columns(
    owner: &str,
    specs: &IndexMap<String, ColumnSpec>,
) -> Result<IndexMap<String, Column>, ScaffoldError> {
    let mut columns = IndexMap::new();
    for (name, spec) in specs {
        let ColumnSpec::Scalar(line) = spec else {
            continue;
        };
        let column = Column::from_methods(name, parse_line(line))
            .ok_or_else(|| ScaffoldError::structural(format!("{}.{}", owner, name), "empty column line"))?;
        columns.insert(name.clone(), column);
    }
    Ok(columns)
}

/// Explicit block first, then the first identity-typed column.
fn resolve_primary(
    key: &str,
    config: Option<&PrimaryConfig>,
    columns: &IndexMap<String, Column>,
) -> Result<Option<PrimaryKey>, ScaffoldError> {
    match config {
        Some(PrimaryConfig::Toggle(false)) => Ok(None),
        Some(PrimaryConfig::Declared(block)) => {
            let (column, key_type, incrementing) = primary_block(key, block)?;
            if !columns.contains_key(column) {
                return Err(ScaffoldError::InvalidPrimaryKey {
                    entity: key.to_string(),
                    column: column.to_string(),
                });
            }
            Ok(Some(PrimaryKey {
                column: column.to_string(),
                storage_type: storage_type(key_type).to_string(),
                incrementing,
            }))
        }
        Some(PrimaryConfig::Toggle(true)) | None => {
            let inferred = columns.values().find(|c| c.is_identity()).map(|c| PrimaryKey {
                column: c.name.clone(),
                storage_type: storage_type(&c.column_type).to_string(),
                incrementing: true,
            });
            if inferred.is_none() {
                tracing::debug!(entity = %key, "no identity column and no primary block; entity has no primary key");
            }
            Ok(inferred)
        }
    }
}

fn resolve_events(
    key: &str,
    class: &str,
    config: Option<&EventsConfig>,
) -> Result<IndexMap<String, String>, ScaffoldError> {
    let pairs: Vec<(String, String)> = match config {
        None => Vec::new(),
        Some(EventsConfig::List(events)) => events
            .iter()
            .map(|e| (e.clone(), format!("{}{}", class, upper_first(e))))
            .collect(),
        Some(EventsConfig::Map(map)) => map.iter().map(|(e, c)| (e.clone(), c.clone())).collect(),
    };
    let mut events = IndexMap::new();
    for (event, handler) in pairs {
        if !OBSERVABLE_EVENTS.contains(&event.as_str()) {
            return Err(ScaffoldError::missing("event", event, format!("{}.events", key)));
        }
        events.insert(event, handler);
    }
    Ok(events)
}

fn resolve_timestamps(config: Option<&TimestampsConfig>) -> Timestamps {
    match config {
        None | Some(TimestampsConfig::Toggle(true)) => Timestamps::default(),
        Some(TimestampsConfig::Toggle(false)) => Timestamps {
            using: false,
            created_at: None,
            updated_at: None,
        },
        Some(TimestampsConfig::Columns { created_at, updated_at }) => Timestamps {
            using: true,
            created_at: created_at.clone(),
            updated_at: updated_at.clone(),
        },
    }
}

fn resolve_soft_delete(config: Option<&SoftDeletesConfig>) -> SoftDelete {
    match config {
        None | Some(SoftDeletesConfig::Toggle(false)) => SoftDelete::default(),
        Some(SoftDeletesConfig::Toggle(true)) => SoftDelete {
            using: true,
            ..SoftDelete::default()
        },
        Some(SoftDeletesConfig::Column(column)) => SoftDelete {
            using: true,
            column: column.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScaffoldDocument;
    use crate::error::ErrorKind;
    use crate::ir::{CastType, ModelType};

    fn entities(yaml: &str) -> Result<IndexMap<String, Entity>, ScaffoldError> {
        let doc = ScaffoldDocument::from_yaml(yaml).unwrap();
        let mut ctx = ResolutionContext::new(&doc);
        resolve_entities(&mut ctx)?;
        Ok(ctx.entities)
    }

    #[test]
    fn first_identity_column_is_the_primary_key() {
        let e = entities(
            "database:\n  models:\n    Post:\n      columns:\n        title: string\n        id: increments\n        legacy_id: bigIncrements\n",
        )
        .unwrap();
        let pk = e["Post"].primary.as_ref().unwrap();
        assert_eq!(pk.column, "id");
        assert_eq!(pk.storage_type, "unsignedInteger");
        assert!(pk.incrementing);
    }

    #[test]
    fn entity_without_columns_is_structural() {
        let err = entities("database:\n  models:\n    Post:\n      columns: {}\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("Post"));
    }

    #[test]
    fn explicit_primary_block_overrides_inference() {
        let e = entities(
            "database:\n  models:\n    Token:\n      columns: {id: id, code: string}\n      primary: {column: code, type: string, incrementing: false}\n",
        )
        .unwrap();
        let pk = e["Token"].primary.as_ref().unwrap();
        assert_eq!(pk.column, "code");
        assert_eq!(pk.storage_type, "string");
        assert!(!pk.incrementing);
    }

    #[test]
    fn primary_block_column_must_exist() {
        let err = entities(
            "database:\n  models:\n    Token:\n      columns: {code: string}\n      primary: {column: uuid, type: uuid, incrementing: false}\n",
        )
        .unwrap_err();
        assert!(matches!(err, ScaffoldError::InvalidPrimaryKey { ref column, .. } if column == "uuid"));
    }

    #[test]
    fn primary_false_disables_the_key() {
        let e = entities("database:\n  models:\n    Log:\n      columns: {id: id}\n      primary: false\n").unwrap();
        assert!(e["Log"].primary.is_none());
        let bare = entities("database:\n  models:\n    Log:\n      columns: {line: text}\n").unwrap();
        assert!(!bare["Log"].uses_primary());
    }

    #[test]
    fn names_tables_and_namespaces() {
        let e = entities(
            "database:\n  namespace: App\\Models\n  models:\n    Admin\\BlogPost:\n      columns: {id: id}\n    Category:\n      columns: {id: id}\n      table: cats\n",
        )
        .unwrap();
        let post = &e["Admin\\BlogPost"];
        assert_eq!(post.class, "BlogPost");
        assert_eq!(post.namespace, "App\\Models\\Admin");
        assert_eq!(post.full_class(), "App\\Models\\Admin\\BlogPost");
        assert_eq!(post.table, "blog_posts");
        assert!(!post.uses_non_default_table());
        assert_eq!(e["Category"].table, "cats");
        assert!(e["Category"].uses_non_default_table());
    }

    #[test]
    fn model_options() {
        let e = entities(
            "database:\n  models:\n    Post:\n      columns: {id: id, slug: string, published_at: timestamp, meta: json}\n      type: Pivot\n      perPage: 30\n      fillable: [slug]\n      scopes: [Published]\n      route: slug\n      json: true\n      factory: false\n      timestamps: {created_at: made_at}\n      softDeletes: removed_at\n",
        )
        .unwrap();
        let post = &e["Post"];
        assert_eq!(post.model_type, ModelType::Pivot);
        assert!(post.uses_non_default_per_page());
        assert_eq!(post.fillable, vec!["slug"]);
        assert_eq!(post.global_scopes, vec!["Published"]);
        assert_eq!(post.route_binding.as_deref(), Some("slug"));
        assert!(post.uses_json_resource && !post.uses_factory && !post.uses_repository);
        assert_eq!(post.timestamps.created_at.as_deref(), Some("made_at"));
        assert!(post.soft_delete.using && post.soft_delete.uses_non_default_column());
        assert_eq!(post.dates(), vec!["published_at"]);
        assert_eq!(post.casts().get("meta"), Some(&CastType::Array));
        assert_eq!(post.casts().get("id"), Some(&CastType::Integer));
    }

    #[test]
    fn route_binding_must_be_a_column() {
        let err = entities("database:\n  models:\n    Post:\n      columns: {id: id}\n      route: slug\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(err.to_string().contains("slug"));
    }

    #[test]
    fn events_bind_handlers() {
        let e = entities(
            "database:\n  models:\n    Post:\n      columns: {id: id}\n      events: [created, deleted]\n    Tag:\n      columns: {id: id}\n      events: {saved: TagSaved}\n",
        )
        .unwrap();
        assert_eq!(e["Post"].events["created"], "PostCreated");
        assert_eq!(e["Post"].events["deleted"], "PostDeleted");
        assert_eq!(e["Tag"].events["saved"], "TagSaved");

        let err = entities("database:\n  models:\n    Post:\n      columns: {id: id}\n      events: [exploded]\n").unwrap_err();
        assert!(err.to_string().contains("exploded"));
    }

    #[test]
    fn relation_placeholders_are_not_columns_yet() {
        let e = entities(
            "database:\n  models:\n    Comment:\n      columns:\n        id: id\n        post: {relation: belongsTo:Post}\n",
        )
        .unwrap();
        assert_eq!(e["Comment"].columns.len(), 1);
    }
}
