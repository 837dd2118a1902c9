use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Metadata, MetadataReader, ReflectionError};

/// Metadata declared by one controller class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Fully qualified parent class, searched for methods this class does not declare
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Class-level metadata objects, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<Metadata>,
    /// Every declared method with its metadata objects
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub methods: IndexMap<String, Vec<Metadata>>,
}

/// Typed table of class and method metadata.
///
/// Lookups are exact first and fall back to an ASCII case-insensitive match,
/// since PHP class and method names are case-insensitive. A method missing
/// from a class is looked up along its `extends` chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataTable {
    classes: IndexMap<String, ClassMetadata>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from a YAML (`.yaml`/`.yml`) or JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read metadata table {}", path.display()))?;
        let table = if path
            .extension()
            .map(|s| s == "yaml" || s == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        };
        Ok(table)
    }

    /// Render the table as YAML in the format [`MetadataTable::load`] reads.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Get or create the entry for a class.
    pub fn class_entry(&mut self, class: impl Into<String>) -> &mut ClassMetadata {
        self.classes.entry(class.into()).or_default()
    }

    /// Declare a method on a class (creating both if needed) and return its metadata list.
    pub fn method_entry(
        &mut self,
        class: impl Into<String>,
        method: impl Into<String>,
    ) -> &mut Vec<Metadata> {
        self.class_entry(class)
            .methods
            .entry(method.into())
            .or_default()
    }

    pub fn get(&self, class: &str) -> Option<&ClassMetadata> {
        find_ignore_case(&self.classes, class).map(|(_, entry)| entry)
    }

    pub fn classes(&self) -> impl Iterator<Item = (&String, &ClassMetadata)> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn find_ignore_case<'a, V>(
    map: &'a IndexMap<String, V>,
    key: &str,
) -> Option<(&'a String, &'a V)> {
    map.get_key_value(key).or_else(|| {
        map.iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
    })
}

impl MetadataReader for MetadataTable {
    fn class_metadata(&self, class: &str) -> Result<Vec<Metadata>, ReflectionError> {
        self.get(class)
            .map(|entry| entry.metadata.clone())
            .ok_or_else(|| ReflectionError::ClassNotFound {
                class: class.to_string(),
            })
    }

    fn method_metadata(
        &self,
        class: &str,
        method: &str,
    ) -> Result<Vec<Metadata>, ReflectionError> {
        let mut entry = self.get(class).ok_or_else(|| ReflectionError::ClassNotFound {
            class: class.to_string(),
        })?;

        // Bounded by the table size so an `extends` cycle cannot loop forever
        for _ in 0..=self.classes.len() {
            if let Some((_, metadata)) = find_ignore_case(&entry.methods, method) {
                return Ok(metadata.clone());
            }
            match entry.extends.as_deref().and_then(|parent| self.get(parent)) {
                Some(parent) => entry = parent,
                None => break,
            }
        }

        Err(ReflectionError::MethodNotFound {
            class: class.to_string(),
            method: method.to_string(),
        })
    }

    fn resolve_class(&self, class: &str) -> Result<String, ReflectionError> {
        find_ignore_case(&self.classes, class)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| ReflectionError::ClassNotFound {
                class: class.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TABLE_YAML: &str = r#"
App\Controller\PostController:
  metadata:
    - kind: is_granted
      attribute: ROLE_USER
  methods:
    index: []
    edit:
      - kind: other
        name: Route
      - kind: security
        expression: "is_granted('EDIT', post)"
App\Controller\HomeController:
  methods:
    home: []
"#;

    fn load_yaml(content: &str) -> MetadataTable {
        let mut temp = NamedTempFile::with_suffix(".yaml").expect("create temp file");
        temp.write_all(content.as_bytes()).expect("write table");
        temp.flush().expect("flush");
        MetadataTable::load(temp.path()).expect("load table")
    }

    #[test]
    fn test_load_yaml_preserves_order() {
        let table = load_yaml(TABLE_YAML);
        let names: Vec<_> = table.classes().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "App\\Controller\\PostController",
                "App\\Controller\\HomeController"
            ]
        );

        let post = table.get("App\\Controller\\PostController").unwrap();
        let methods: Vec<_> = post.methods.keys().map(String::as_str).collect();
        assert_eq!(methods, vec!["index", "edit"]);
        assert_eq!(
            post.methods["edit"][1],
            Metadata::Security {
                expression: "is_granted('EDIT', post)".to_string()
            }
        );
    }

    #[test]
    fn test_load_json() {
        let mut temp = NamedTempFile::with_suffix(".json").unwrap();
        temp.write_all(
            br#"{"App\\C": {"metadata": [{"kind": "is_granted", "attribute": "VIEW", "subject": "post"}]}}"#,
        )
        .unwrap();
        temp.flush().unwrap();

        let table = MetadataTable::load(temp.path()).unwrap();
        assert_eq!(
            table.class_metadata("App\\C").unwrap(),
            vec![Metadata::IsGranted {
                attribute: "VIEW".to_string(),
                subject: Some("post".to_string()),
            }]
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let mut temp = NamedTempFile::with_suffix(".yaml").unwrap();
        temp.write_all(b"App\\C:\n  metadata:\n    - kind: firewall\n").unwrap();
        temp.flush().unwrap();
        assert!(MetadataTable::load(temp.path()).is_err());
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = MetadataTable::load(Path::new("/nonexistent/metadata.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/metadata.yaml"));
    }

    #[test]
    fn test_reader_errors() {
        let table = load_yaml(TABLE_YAML);

        let err = table.class_metadata("App\\Missing").unwrap_err();
        assert_eq!(err.to_string(), "Class \"App\\Missing\" does not exist");

        let err = table
            .method_metadata("App\\Controller\\HomeController", "missing")
            .unwrap_err();
        assert_eq!(
            err,
            ReflectionError::MethodNotFound {
                class: "App\\Controller\\HomeController".to_string(),
                method: "missing".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "Method App\\Controller\\HomeController::missing() does not exist"
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = load_yaml(TABLE_YAML);
        assert_eq!(
            table
                .method_metadata("app\\controller\\postcontroller", "EDIT")
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_parse_error_names_path() {
        let mut temp = NamedTempFile::with_suffix(".yaml").unwrap();
        temp.write_all(b"App\\C: [unclosed\n").unwrap();
        temp.flush().unwrap();

        let err = MetadataTable::load(temp.path()).unwrap_err();
        assert!(err
            .to_string()
            .contains(&temp.path().display().to_string()));
    }

    #[test]
    fn test_inherited_method_found_on_parent() {
        let mut table = MetadataTable::new();
        table
            .method_entry("App\\BaseCrudController", "list")
            .push(Metadata::IsGranted {
                attribute: "ROLE_ADMIN".to_string(),
                subject: None,
            });
        table.class_entry("App\\UserController").extends =
            Some("App\\BaseCrudController".to_string());
        table.method_entry("App\\UserController", "show");

        assert_eq!(
            table.method_metadata("App\\UserController", "list").unwrap(),
            vec![Metadata::IsGranted {
                attribute: "ROLE_ADMIN".to_string(),
                subject: None,
            }]
        );
        // Class-level metadata is not inherited
        assert!(table.class_metadata("App\\UserController").unwrap().is_empty());
        assert_eq!(
            table.method_metadata("App\\UserController", "missing").unwrap_err(),
            ReflectionError::MethodNotFound {
                class: "App\\UserController".to_string(),
                method: "missing".to_string(),
            }
        );
    }

    #[test]
    fn test_extends_cycle_terminates() {
        let mut table = MetadataTable::new();
        table.class_entry("App\\A").extends = Some("App\\B".to_string());
        table.class_entry("App\\B").extends = Some("App\\A".to_string());

        assert!(matches!(
            table.method_metadata("App\\A", "run"),
            Err(ReflectionError::MethodNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_class_returns_declared_name() {
        let table = load_yaml(TABLE_YAML);
        assert_eq!(
            table
                .resolve_class("app\\controller\\POSTCONTROLLER")
                .unwrap(),
            "App\\Controller\\PostController"
        );
        assert!(table.resolve_class("App\\Missing").is_err());
    }

    #[test]
    fn test_yaml_round_trip_through_file() {
        let mut table = MetadataTable::new();
        table.class_entry("App\\C").metadata.push(Metadata::IsGranted {
            attribute: "ROLE_USER".to_string(),
            subject: None,
        });
        table.class_entry("App\\C").extends = Some("App\\Base".to_string());
        table.method_entry("App\\C", "index");
        table.method_entry("App\\C", "edit").push(Metadata::Security {
            expression: "is_granted('EDIT', post)".to_string(),
        });

        let yaml = table.to_yaml().unwrap();
        assert_eq!(load_yaml(&yaml), table);
    }
}
