//! Relation resolution: cross-link entities and add the foreign-key columns local relations need.

use crate::case::to_snake_case;
use crate::config::ColumnSpec;
use crate::error::ScaffoldError;
use crate::ir::{parse_line, Column, Relation, RelationKind};
use crate::resolve::ResolutionContext;

/// Storage type used for a `belongsTo` column when the target has no primary key.
const FALLBACK_FOREIGN_KEY_TYPE: &str = "unsignedBigInteger";
const MORPH_COLUMN_TYPE: &str = "morphs";

pub fn resolve_relations(ctx: &mut ResolutionContext<'_>) -> Result<(), ScaffoldError> {
    let doc = ctx.document;
    for (key, model) in &doc.database.models {
        let Some(specs) = &model.columns else {
            continue;
        };
        for (name, spec) in specs {
            let ColumnSpec::Relation(rel) = spec else {
                continue;
            };
            let owner = format!("{}.{}", key, name);
            let line = rel
                .relation
                .as_deref()
                .ok_or_else(|| ScaffoldError::structural(&owner, "nested column requires a 'relation' line"))?;
            let mut relation = build_relation(ctx, name, line, &owner)?;
            let column = belonging_column(ctx, name, &relation, &owner)?;

            let entity = ctx
                .entities
                .get_mut(key)
                .ok_or_else(|| ScaffoldError::missing("entity", key.clone(), &owner))?;
            if let Some(column) = column {
                if entity.columns.contains_key(&column.name) {
                    return Err(ScaffoldError::ColumnCollision {
                        entity: key.clone(),
                        relation: name.clone(),
                        column: column.name,
                    });
                }
                relation.belonging_column = Some(column.name.clone());
                entity.columns.insert(column.name.clone(), column);
            }
            tracing::debug!(
                entity = %key,
                relation = %name,
                kind = ?relation.kind,
                target = ?relation.target,
                "relation"
            );
            entity.relations.insert(name.clone(), relation);
        }
    }
    Ok(())
}

/// Parse `kind:Target[,Through] modifier...` and resolve every entity it names.
fn build_relation(
    ctx: &ResolutionContext<'_>,
    name: &str,
    line: &str,
    owner: &str,
) -> Result<Relation, ScaffoldError> {
    let mut methods = parse_line(line);
    if methods.is_empty() {
        return Err(ScaffoldError::structural(owner, "empty relation line"));
    }
    let head = methods.remove(0);
    let kind = RelationKind::parse(&head.name)
        .ok_or_else(|| ScaffoldError::missing("relation kind", head.name.clone(), owner))?;

    let target = match head.arguments.first() {
        Some(arg) => Some(ctx.entity_key(&arg.text(), owner)?),
        None if kind == RelationKind::MorphTo => None,
        None => {
            return Err(ScaffoldError::structural(
                owner,
                format!("{} relation requires a target entity", head.name),
            ))
        }
    };

    let through = if kind.is_through() {
        let arg = head.arguments.get(1).ok_or_else(|| {
            ScaffoldError::structural(owner, format!("{} relation requires a 'through' entity", head.name))
        })?;
        Some(ctx.entity_key(&arg.text(), owner)?)
    } else {
        None
    };

    let mut relation = Relation {
        name: name.to_string(),
        kind,
        target,
        through,
        using_pivot: None,
        methods: Vec::new(),
        belonging_column: None,
        with_default: false,
        with_pivot: Vec::new(),
    };

    for method in methods {
        match method.name.as_str() {
            "withDefault" => relation.with_default = true,
            "withPivot" => relation.with_pivot.extend(method.literals()),
            "using" if kind.uses_pivot() => {
                let pivot = method
                    .first_literal()
                    .ok_or_else(|| ScaffoldError::structural(owner, "'using' requires a pivot entity"))?;
                let pivot_entity = ctx.entity(pivot, owner)?;
                if pivot_entity.model_type != kind.pivot_type() {
                    return Err(ScaffoldError::structural(
                        owner,
                        format!(
                            "pivot entity '{}' must be of type {:?} for {}",
                            pivot_entity.key,
                            kind.pivot_type(),
                            head.name
                        ),
                    ));
                }
                relation.using_pivot = Some(pivot_entity.key.clone());
            }
            _ => relation.methods.push(method),
        }
    }
    Ok(relation)
}

/// The local column a `belongsTo` / `morphTo` relation keeps on its entity.
fn belonging_column(
    ctx: &ResolutionContext<'_>,
    name: &str,
    relation: &Relation,
    owner: &str,
) -> Result<Option<Column>, ScaffoldError> {
    let declared = relation
        .methods
        .iter()
        .find(|m| m.name == "column")
        .and_then(|m| m.first_literal())
        .map(str::to_string);

    match relation.kind {
        RelationKind::MorphTo => {
            let column = declared.unwrap_or_else(|| to_snake_case(name));
            Ok(Some(Column::for_relation(&column, MORPH_COLUMN_TYPE, name)))
        }
        RelationKind::BelongsTo => {
            let target_key = relation
                .target
                .as_deref()
                .ok_or_else(|| ScaffoldError::structural(owner, "belongsTo relation requires a target entity"))?;
            let target = ctx.entity(target_key, owner)?;
            let (default_name, column_type) = match &target.primary {
                Some(pk) => (
                    format!("{}_{}", target.singular(), to_snake_case(&pk.column)),
                    pk.storage_type.clone(),
                ),
                None => {
                    tracing::debug!(
                        relation = %owner,
                        target = %target.key,
                        "target has no primary key; foreign key falls back to {}",
                        FALLBACK_FOREIGN_KEY_TYPE
                    );
                    (format!("{}_id", to_snake_case(name)), FALLBACK_FOREIGN_KEY_TYPE.to_string())
                }
            };
            let column = declared.unwrap_or(default_name);
            Ok(Some(Column::for_relation(&column, &column_type, name)))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScaffoldDocument;
    use crate::error::ErrorKind;
    use crate::ir::Entity;
    use crate::resolve::entities::resolve_entities;
    use indexmap::IndexMap;

    fn run(yaml: &str) -> Result<IndexMap<String, Entity>, ScaffoldError> {
        let doc = ScaffoldDocument::from_yaml(yaml).unwrap();
        let mut ctx = ResolutionContext::new(&doc);
        resolve_entities(&mut ctx)?;
        resolve_relations(&mut ctx)?;
        Ok(ctx.entities)
    }

    #[test]
    fn belongs_to_adds_a_typed_foreign_key() {
        let e = run(
            "database:\n  models:\n    Comment:\n      columns:\n        id: id\n        post: {relation: belongsTo:Post}\n    Post:\n      columns: {id: increments, title: string}\n",
        )
        .unwrap();
        let comment = &e["Comment"];
        let col = &comment.columns["post_id"];
        assert_eq!(col.column_type, "unsignedInteger");
        assert_eq!(col.relation.as_deref(), Some("post"));
        let rel = &comment.relations["post"];
        assert_eq!(rel.kind, RelationKind::BelongsTo);
        assert_eq!(rel.target.as_deref(), Some("Post"));
        assert_eq!(rel.belonging_column.as_deref(), Some("post_id"));
    }

    #[test]
    fn belongs_to_column_name_precedence() {
        let e = run(
            "database:\n  models:\n    Post:\n      columns:\n        id: id\n        writer: {relation: belongsTo:User column:author_id withDefault}\n        editor: {relation: belongsTo:Account}\n    User:\n      columns: {id: id}\n    Account:\n      columns: {name: string}\n",
        )
        .unwrap();
        let post = &e["Post"];
        assert!(post.columns.contains_key("author_id"));
        assert!(post.relations["writer"].with_default);
        let editor = &post.columns["editor_id"];
        assert_eq!(editor.column_type, "unsignedBigInteger");
    }

    #[test]
    fn morph_to_needs_no_target() {
        let e = run(
            "database:\n  models:\n    Image:\n      columns:\n        id: id\n        imageable: {relation: morphTo}\n",
        )
        .unwrap();
        let col = &e["Image"].columns["imageable"];
        assert_eq!(col.column_type, "morphs");
        assert!(e["Image"].relations["imageable"].target.is_none());
    }

    #[test]
    fn missing_target_names_the_key() {
        let err = run(
            "database:\n  models:\n    Post:\n      columns:\n        id: id\n        author: {relation: belongsTo:Writer}\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(err.to_string().contains("Writer"));
    }

    #[test]
    fn unknown_kind_is_a_reference_error() {
        let err = run(
            "database:\n  models:\n    Post:\n      columns:\n        id: id\n        author: {relation: ownedBy:Post}\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("ownedBy"));
    }

    #[test]
    fn through_relations_need_the_through_entity() {
        let err = run(
            "database:\n  models:\n    Country:\n      columns:\n        id: id\n        posts: {relation: hasManyThrough:Post}\n    Post:\n      columns: {id: id}\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);

        let e = run(
            "database:\n  models:\n    Country:\n      columns:\n        id: id\n        posts: {relation: \"hasManyThrough:Post,User\"}\n    Post:\n      columns: {id: id}\n    User:\n      columns: {id: id}\n",
        )
        .unwrap();
        assert_eq!(e["Country"].relations["posts"].through.as_deref(), Some("User"));
    }

    #[test]
    fn explicit_pivot_type_must_match() {
        let yaml = |pivot_type: &str| {
            format!(
                "database:\n  models:\n    User:\n      columns:\n        id: id\n        roles: {{relation: belongsToMany:Role using:RoleUser withPivot:expires_at}}\n    Role:\n      columns: {{id: id}}\n    RoleUser:\n      columns: {{id: id}}\n      type: {}\n",
                pivot_type
            )
        };
        let e = run(&yaml("pivot")).unwrap();
        let rel = &e["User"].relations["roles"];
        assert_eq!(rel.using_pivot.as_deref(), Some("RoleUser"));
        assert_eq!(rel.with_pivot, vec!["expires_at"]);
        assert!(!rel.needs_guessed_pivot());

        let err = run(&yaml("morphPivot")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("RoleUser"));
    }

    #[test]
    fn polymorphic_pivot_entity_needs_morph_pivot_type() {
        let yaml = |pivot_type: &str| {
            format!(
                "database:\n  models:\n    Post:\n      columns:\n        id: id\n        tags: {{relation: morphToMany:Tag using:Taggable}}\n    Tag:\n      columns:\n        id: id\n        posts: {{relation: morphedByMany:Post using:Taggable}}\n    Taggable:\n      columns: {{id: id}}\n      type: {}\n",
                pivot_type
            )
        };
        let e = run(&yaml("morphPivot")).unwrap();
        let tags = &e["Post"].relations["tags"];
        assert_eq!(tags.kind, RelationKind::MorphToMany);
        assert_eq!(tags.using_pivot.as_deref(), Some("Taggable"));
        assert!(!tags.needs_guessed_pivot());
        assert_eq!(e["Tag"].relations["posts"].using_pivot.as_deref(), Some("Taggable"));

        let err = run(&yaml("pivot")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("Taggable"));
    }

    #[test]
    fn declared_belonging_column_collides() {
        let err = run(
            "database:\n  models:\n    Comment:\n      columns:\n        id: id\n        post_id: integer\n        post: {relation: belongsTo:Post}\n    Post:\n      columns: {id: id}\n",
        )
        .unwrap_err();
        assert!(matches!(err, ScaffoldError::ColumnCollision { ref column, .. } if column == "post_id"));
    }
}
