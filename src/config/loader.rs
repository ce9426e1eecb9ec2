//! Load a scaffold document from YAML/JSON text, a single file, or a directory of section files.

use crate::config::types::{AuthSection, DatabaseSection, HttpSection, ScaffoldDocument};
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// File stems tried, in order, for each section of a directory layout.
pub const DATABASE_FILES: &[&str] = &["database", "db", "models"];
pub const HTTP_FILES: &[&str] = &["http", "controllers"];
pub const AUTH_FILES: &[&str] = &["auth", "authentication", "authorization"];
pub const SECTION_EXTENSIONS: &[&str] = &["yml", "yaml"];

impl ScaffoldDocument {
    /// Whole document with `database`, `http` and `auth` as top-level keys.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(ScaffoldDocument::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// First existing `<stem>.<ext>` in `dir`, stems tried before extensions.
fn find_section_file(dir: &Path, stems: &[&str]) -> Option<PathBuf> {
    stems
        .iter()
        .flat_map(|stem| SECTION_EXTENSIONS.iter().map(move |ext| dir.join(format!("{}.{}", stem, ext))))
        .find(|p| p.is_file())
}

fn load_section<T>(dir: &Path, stems: &[&str]) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = find_section_file(dir, stems) else {
        tracing::debug!(dir = %dir.display(), section = stems[0], "section file not found, using empty section");
        return Ok(T::default());
    };
    let text = read(&path)?;
    tracing::debug!(path = %path.display(), section = stems[0], "load section");
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_str(&text)?)
}

/// Read one file per section from `dir`; each file holds the section body (no top-level section key).
pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<ScaffoldDocument, ConfigError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ConfigError::Load(format!("{} is not a directory", dir.display())));
    }
    Ok(ScaffoldDocument {
        database: load_section::<DatabaseSection>(dir, DATABASE_FILES)?,
        http: load_section::<HttpSection>(dir, HTTP_FILES)?,
        auth: load_section::<AuthSection>(dir, AUTH_FILES)?,
    })
}

/// Load from a directory of section files, or from a single `.json` / `.yml` / `.yaml` document.
pub fn load(path: impl AsRef<Path>) -> Result<ScaffoldDocument, ConfigError> {
    let path = path.as_ref();
    if path.is_dir() {
        return load_from_dir(path);
    }
    let text = read(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => ScaffoldDocument::from_json(&text),
        Some("yml") | Some("yaml") => ScaffoldDocument::from_yaml(&text),
        _ => Err(ConfigError::Load(format!(
            "{}: expected a directory or a .json, .yml or .yaml file",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_document_from_yaml_and_json() {
        let yaml = ScaffoldDocument::from_yaml("database:\n  models:\n    Post:\n      columns: {id: id}\n").unwrap();
        assert!(yaml.database.models.contains_key("Post"));
        let json = ScaffoldDocument::from_json(r#"{"http": {"controllers": {"PostController": {}}}}"#).unwrap();
        assert!(json.http.controllers.contains_key("PostController"));
        assert_eq!(ScaffoldDocument::from_yaml("").unwrap(), ScaffoldDocument::default());
    }

    #[test]
    fn malformed_text_is_a_config_error() {
        assert!(matches!(
            ScaffoldDocument::from_yaml("database: ["),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(ScaffoldDocument::from_json("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn model_declaration_order_is_kept() {
        let doc = ScaffoldDocument::from_yaml(
            "database:\n  models:\n    Zebra: {columns: {id: id}}\n    Apple: {columns: {id: id}}\n",
        )
        .unwrap();
        let keys: Vec<_> = doc.database.models.keys().cloned().collect();
        assert_eq!(keys, vec!["Zebra", "Apple"]);
    }
}
