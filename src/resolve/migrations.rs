//! Migration synthesis: entity tables, explicit tables and guessed join tables, checked for collisions.

use crate::case::to_snake_case;
use crate::error::ScaffoldError;
use crate::ir::{Column, Entity, Index, Migration, MigrationSource, Relation};
use crate::resolve::entities::build_columns;
use crate::resolve::ResolutionContext;
use indexmap::IndexMap;

/// Join table name for two entity classes; the same for either argument order.
pub fn pivot_table_name(first_class: &str, second_class: &str) -> String {
    let mut segments = [to_snake_case(first_class), to_snake_case(second_class)];
    segments.sort();
    segments.join("_")
}

/// Who declared a table, for collision messages.
fn owner_of(migration: &Migration) -> String {
    match &migration.source {
        MigrationSource::Entity { entity } => entity.clone(),
        MigrationSource::Explicit => format!("migrations.{}", migration.table),
        MigrationSource::Pivot { entity, relation } => format!("{}.{}", entity, relation),
    }
}

fn entity_migration(entity: &Entity) -> Migration {
    Migration {
        table: entity.table.clone(),
        columns: entity.columns.values().cloned().collect(),
        primary: entity.primary.as_ref().map(|pk| pk.column.clone()),
        indexes: Index::from_columns(entity.columns.values()),
        source: MigrationSource::Entity {
            entity: entity.key.clone(),
        },
        timestamps: entity.timestamps.using,
        soft_delete: entity
            .soft_delete
            .using
            .then(|| entity.soft_delete.column.clone()),
    }
}

fn pivot_migration(ctx: &ResolutionContext<'_>, entity: &Entity, relation: &Relation) -> Result<Migration, ScaffoldError> {
    let owner = format!("{}.{}", entity.key, relation.name);
    let target_key = relation
        .target
        .as_deref()
        .ok_or_else(|| ScaffoldError::structural(&owner, "many-to-many relation requires a target entity"))?;
    if target_key == entity.key {
        return Err(ScaffoldError::SelfReferencingPivot {
            entity: entity.key.clone(),
            relation: relation.name.clone(),
        });
    }
    let target = ctx.entity(target_key, &owner)?;

    let mut columns = Vec::with_capacity(2);
    for side in [entity, target] {
        let pk = side.primary.as_ref().ok_or_else(|| ScaffoldError::MissingPrimaryKey {
            entity: side.key.clone(),
            relation: owner.clone(),
        })?;
        let name = format!("{}_{}", side.singular(), to_snake_case(&pk.column));
        columns.push(Column::for_relation(&name, &pk.storage_type, &relation.name));
    }
    columns.sort_by(|a, b| a.name.cmp(&b.name));
    if columns[0].name == columns[1].name {
        return Err(ScaffoldError::SelfReferencingPivot {
            entity: entity.key.clone(),
            relation: relation.name.clone(),
        });
    }

    Ok(Migration {
        table: pivot_table_name(&entity.class, &target.class),
        columns,
        primary: None,
        indexes: Vec::new(),
        source: MigrationSource::Pivot {
            entity: entity.key.clone(),
            relation: relation.name.clone(),
        },
        timestamps: false,
        soft_delete: None,
    })
}

pub fn resolve_migrations(ctx: &mut ResolutionContext<'_>) -> Result<(), ScaffoldError> {
    let doc = ctx.document;

    // Entity-derived and explicit tables are collected and checked before any is recorded.
    let mut declared: IndexMap<String, Migration> = IndexMap::new();
    for entity in ctx.entities.values() {
        let migration = entity_migration(entity);
        if let Some(existing) = declared.get(&migration.table) {
            return Err(ScaffoldError::TableCollision {
                table: migration.table.clone(),
                first: entity.key.clone(),
                second: owner_of(existing),
            });
        }
        declared.insert(migration.table.clone(), migration);
    }
    for (table, specs) in &doc.database.migrations {
        let owner = format!("migrations.{}", table);
        let columns = build_columns(&owner, specs)?;
        if let Some(existing) = declared.get(table) {
            return Err(ScaffoldError::TableCollision {
                table: table.clone(),
                first: owner_of(existing),
                second: owner,
            });
        }
        let migration = Migration {
            table: table.clone(),
            primary: columns.values().find(|c| c.is_identity()).map(|c| c.name.clone()),
            indexes: Index::from_columns(columns.values()),
            columns: columns.into_values().collect(),
            source: MigrationSource::Explicit,
            timestamps: false,
            soft_delete: None,
        };
        declared.insert(table.clone(), migration);
    }

    let mut pivots = Vec::new();
    for entity in ctx.entities.values() {
        for relation in entity.relations.values().filter(|r| r.needs_guessed_pivot()) {
            pivots.push(pivot_migration(ctx, entity, relation)?);
        }
    }

    for pivot in pivots {
        if let Some(existing) = declared.get(&pivot.table) {
            if existing.from_guessed_pivot() {
                tracing::debug!(table = %pivot.table, by = %owner_of(&pivot), "join table already synthesized");
                continue;
            }
            return Err(ScaffoldError::TableCollision {
                table: pivot.table.clone(),
                first: owner_of(&pivot),
                second: owner_of(existing),
            });
        }
        tracing::debug!(table = %pivot.table, by = %owner_of(&pivot), "synthesized join table");
        declared.insert(pivot.table.clone(), pivot);
    }

    ctx.migrations = declared;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScaffoldDocument;
    use crate::error::ErrorKind;
    use crate::resolve::{entities::resolve_entities, relations::resolve_relations};

    fn run(yaml: &str) -> Result<IndexMap<String, Migration>, ScaffoldError> {
        let doc = ScaffoldDocument::from_yaml(yaml).unwrap();
        let mut ctx = ResolutionContext::new(&doc);
        resolve_entities(&mut ctx)?;
        resolve_relations(&mut ctx)?;
        resolve_migrations(&mut ctx)?;
        Ok(ctx.migrations)
    }

    const USERS_AND_ROLES: &str = "database:\n  models:\n    User:\n      columns:\n        id: increments\n        roles: {relation: belongsToMany:Role}\n    Role:\n      columns:\n        id: increments\n        users: {relation: belongsToMany:User}\n";

    #[test]
    fn pivot_name_ignores_order() {
        assert_eq!(pivot_table_name("User", "Role"), "role_user");
        assert_eq!(pivot_table_name("Role", "User"), "role_user");
        assert_eq!(pivot_table_name("BlogPost", "Tag"), "blog_post_tag");
    }

    #[test]
    fn both_sides_of_a_many_to_many_emit_one_join_table() {
        let m = run(USERS_AND_ROLES).unwrap();
        let tables: Vec<_> = m.keys().cloned().collect();
        assert_eq!(tables, vec!["users", "roles", "role_user"]);
        let pivot = &m["role_user"];
        let names: Vec<_> = pivot.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["role_id", "user_id"]);
        assert!(pivot.columns.iter().all(|c| c.column_type == "unsignedInteger"));
        assert!(pivot.from_guessed_pivot());
    }

    #[test]
    fn entity_migration_carries_keys_indexes_and_flags() {
        let m = run(
            "database:\n  models:\n    Post:\n      columns: {id: id, slug: string unique}\n      timestamps: false\n      softDeletes: true\n",
        )
        .unwrap();
        let posts = &m["posts"];
        assert_eq!(posts.primary.as_deref(), Some("id"));
        assert_eq!(posts.indexes.len(), 1);
        assert!(!posts.timestamps);
        assert_eq!(posts.soft_delete.as_deref(), Some("deleted_at"));
        assert_eq!(posts.class_name(), "CreatePostsTable");
    }

    #[test]
    fn explicit_tables_follow_entity_tables() {
        let m = run(
            "database:\n  models:\n    Post:\n      columns: {id: id}\n  migrations:\n    failed_jobs: {id: bigIncrements, payload: longText}\n",
        )
        .unwrap();
        let jobs = &m["failed_jobs"];
        assert_eq!(jobs.source, MigrationSource::Explicit);
        assert_eq!(jobs.primary.as_deref(), Some("id"));
        assert_eq!(m.get_index(1).map(|(k, _)| k.as_str()), Some("failed_jobs"));
    }

    #[test]
    fn explicit_table_colliding_with_entity_fails() {
        let err = run(
            "database:\n  models:\n    Post:\n      columns: {id: id}\n  migrations:\n    posts: {id: id}\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Collision);
        let msg = err.to_string();
        assert!(msg.contains("posts") && msg.contains("Post"));
    }

    #[test]
    fn two_entities_on_one_table_collide() {
        let err = run(
            "database:\n  models:\n    Post:\n      columns: {id: id}\n    Article:\n      columns: {id: id}\n      table: posts\n",
        )
        .unwrap_err();
        assert!(matches!(err, ScaffoldError::TableCollision { ref first, .. } if first == "Article"));
    }

    #[test]
    fn guessed_pivot_colliding_with_explicit_table_fails() {
        let yaml = format!("{}  migrations:\n    role_user: {{role_id: integer}}\n", USERS_AND_ROLES);
        let err = run(&yaml).unwrap_err();
        assert!(matches!(err, ScaffoldError::TableCollision { ref table, .. } if table == "role_user"));
    }

    #[test]
    fn pivot_requires_primary_keys() {
        let err = run(
            "database:\n  models:\n    User:\n      columns:\n        id: id\n        tags: {relation: belongsToMany:Tag}\n    Tag:\n      columns: {name: string}\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(matches!(err, ScaffoldError::MissingPrimaryKey { ref entity, .. } if entity == "Tag"));
    }

    #[test]
    fn self_referencing_pivot_needs_a_join_entity() {
        let err = run(
            "database:\n  models:\n    User:\n      columns:\n        id: id\n        friends: {relation: belongsToMany:User}\n",
        )
        .unwrap_err();
        assert!(matches!(err, ScaffoldError::SelfReferencingPivot { .. }));
    }

    #[test]
    fn same_class_in_two_namespaces_cannot_share_a_guessed_pivot() {
        let err = run(
            "database:\n  models:\n    Admin\\User:\n      table: admins\n      columns:\n        id: id\n        customers: {relation: belongsToMany:Shop\\User}\n    Shop\\User:\n      table: customers\n      columns: {id: id}\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(matches!(err, ScaffoldError::SelfReferencingPivot { ref relation, .. } if relation == "customers"));
    }

    #[test]
    fn polymorphic_pivots_are_synthesized_once() {
        let m = run(
            "database:\n  models:\n    Post:\n      columns:\n        id: increments\n        tags: {relation: morphToMany:Tag}\n    Tag:\n      columns:\n        id: id\n        posts: {relation: morphedByMany:Post}\n",
        )
        .unwrap();
        let tables: Vec<_> = m.keys().map(String::as_str).collect();
        assert_eq!(tables, vec!["posts", "tags", "post_tag"]);
        let pivot = &m["post_tag"];
        let columns: Vec<_> = pivot.columns.iter().map(|c| (c.name.as_str(), c.column_type.as_str())).collect();
        assert_eq!(columns, vec![("post_id", "unsignedInteger"), ("tag_id", "unsignedBigInteger")]);
        assert_eq!(
            pivot.source,
            MigrationSource::Pivot {
                entity: "Post".into(),
                relation: "tags".into()
            }
        );
    }

    #[test]
    fn explicit_pivot_entity_skips_synthesis() {
        let m = run(
            "database:\n  models:\n    User:\n      columns:\n        id: id\n        roles: {relation: belongsToMany:Role using:Membership}\n    Role:\n      columns: {id: id}\n    Membership:\n      columns: {id: id}\n      type: pivot\n",
        )
        .unwrap();
        assert!(!m.contains_key("role_user"));
        assert!(m.contains_key("memberships"));
    }
}
