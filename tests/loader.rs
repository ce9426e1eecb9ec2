use scaffold_sdk::{load, load_from_dir, resolve, ConfigError, ErrorKind, ScaffoldError};
use std::fs;

#[test]
fn directory_sections_resolve() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("db.yaml"),
        "models:\n  Post:\n    columns: {id: id, title: string}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("controllers.yml"),
        "controllers:\n  PostController:\n    resource: true\n",
    )
    .unwrap();
    fs::write(dir.path().join("authorization.yml"), "policies:\n  Post: ~\n").unwrap();

    let document = load_from_dir(dir.path()).unwrap();
    let scaffold = resolve(&document).unwrap();
    assert!(scaffold.entity("Post").is_some());
    assert_eq!(scaffold.controller("PostController").unwrap().actions.len(), 5);
    assert!(scaffold.policy("Post").is_some());
}

#[test]
fn first_matching_section_file_wins() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("database.yml"), "models:\n  Post:\n    columns: {id: id}\n").unwrap();
    fs::write(dir.path().join("models.yml"), "models:\n  Tag:\n    columns: {id: id}\n").unwrap();
    fs::write(dir.path().join("http.yaml"), "").unwrap();

    let document = load_from_dir(dir.path()).unwrap();
    assert!(document.database.models.contains_key("Post"));
    assert!(!document.database.models.contains_key("Tag"));
    assert!(document.http.controllers.is_empty());
    assert!(document.auth.policies.is_empty());
}

#[test]
fn single_file_documents() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("scaffold.json");
    fs::write(&json, r#"{"database": {"models": {"Post": {"columns": {"id": "id"}}}}}"#).unwrap();
    assert!(load(&json).unwrap().database.models.contains_key("Post"));

    let yaml = dir.path().join("scaffold.yml");
    fs::write(&yaml, "auth:\n  gates: {admin: ~}\n").unwrap();
    assert!(load(&yaml).unwrap().auth.gates.contains_key("admin"));
}

#[test]
fn loading_failures_are_config_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_from_dir(dir.path().join("missing")),
        Err(ConfigError::Load(_))
    ));

    fs::write(dir.path().join("database.yml"), "models: [").unwrap();
    let err: ScaffoldError = load_from_dir(dir.path()).unwrap_err().into();
    assert_eq!(err.kind(), ErrorKind::Config);

    let unknown = dir.path().join("scaffold.toml");
    fs::write(&unknown, "").unwrap();
    assert!(matches!(load(&unknown), Err(ConfigError::Load(_))));
}
