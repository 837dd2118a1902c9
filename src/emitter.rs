//! # YAML Emitter Module
//!
//! Renders reports as YAML with a fixed inline depth: the outer `inline`
//! levels are written in block style, anything deeper in flow style.
//!
//! With the defaults (inline 4, indent 2) a report renders as:
//!
//! ```yaml
//! App\C:
//!   class_security:
//!     -
//!       attribute: ROLE_USER
//!       subject: null
//!   methods:
//!     edit:
//!       - { route: edit, method_security: { attribute: EDIT, subject: post } }
//! ```
//!
//! Scalars are formatted by `serde_yaml`, with extra quoting for characters
//! that are only special inside flow collections.

use anyhow::Context;
use serde::Serialize;
use serde_yaml::Value;
use std::path::Path;
use tracing::info;

/// Default number of block-style levels.
pub const DEFAULT_INLINE: usize = 4;
/// Default indentation width in spaces.
pub const DEFAULT_INDENT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YamlEmitter {
    inline: usize,
    indent: usize,
}

impl Default for YamlEmitter {
    fn default() -> Self {
        YamlEmitter::new(DEFAULT_INLINE, DEFAULT_INDENT)
    }
}

impl YamlEmitter {
    /// Indentation below 1 is raised to 1.
    pub fn new(inline: usize, indent: usize) -> Self {
        YamlEmitter {
            inline,
            indent: indent.max(1),
        }
    }

    /// Serialize `value` and render it.
    pub fn dump<T: Serialize>(&self, value: &T) -> anyhow::Result<String> {
        let value = serde_yaml::to_value(value).context("Failed to convert report to YAML")?;
        Ok(self.render(&value))
    }

    /// Serialize `value` and write it to `path`, replacing any existing file.
    pub fn write<T: Serialize>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        let document = self.dump(value)?;
        std::fs::write(path, document)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "report written");
        Ok(())
    }

    pub fn render(&self, value: &Value) -> String {
        let mut out = String::new();
        if self.inline == 0 || !is_nonempty_collection(value) {
            out.push_str(&flow(value));
            out.push('\n');
        } else {
            self.write_block(&mut out, value, self.inline, 0);
        }
        out
    }

    fn write_block(&self, out: &mut String, value: &Value, inline: usize, indent: usize) {
        match value {
            Value::Mapping(map) => {
                for (key, child) in map {
                    out.push_str(&" ".repeat(indent));
                    out.push_str(&scalar(key, false));
                    out.push(':');
                    self.write_child(out, child, inline, indent);
                }
            }
            Value::Sequence(items) => {
                for child in items {
                    out.push_str(&" ".repeat(indent));
                    out.push('-');
                    self.write_child(out, child, inline, indent);
                }
            }
            Value::Tagged(tagged) => self.write_block(out, &tagged.value, inline, indent),
            other => {
                out.push_str(&" ".repeat(indent));
                out.push_str(&flow(other));
                out.push('\n');
            }
        }
    }

    fn write_child(&self, out: &mut String, child: &Value, inline: usize, indent: usize) {
        if inline <= 1 || !is_nonempty_collection(child) {
            out.push(' ');
            out.push_str(&flow(child));
            out.push('\n');
        } else {
            out.push('\n');
            self.write_block(out, child, inline - 1, indent + self.indent);
        }
    }
}

fn is_nonempty_collection(value: &Value) -> bool {
    match value {
        Value::Mapping(map) => !map.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        Value::Tagged(tagged) => is_nonempty_collection(&tagged.value),
        _ => false,
    }
}

fn flow(value: &Value) -> String {
    match value {
        Value::Mapping(map) if map.is_empty() => "{}".to_string(),
        Value::Mapping(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", scalar(k, true), flow(v)))
                .collect();
            format!("{{ {} }}", entries.join(", "))
        }
        Value::Sequence(items) => {
            let entries: Vec<String> = items.iter().map(flow).collect();
            format!("[{}]", entries.join(", "))
        }
        Value::Tagged(tagged) => format!("{} {}", tagged.tag, flow(&tagged.value)),
        other => scalar(other, true),
    }
}

/// Format a scalar; `in_flow` adds quoting for `,[]{}`.
fn scalar(value: &Value, in_flow: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => string_scalar(s, in_flow),
        other => flow(other),
    }
}

fn string_scalar(s: &str, in_flow: bool) -> String {
    if s.contains('\n') {
        return double_quoted(s);
    }

    let rendered = match serde_yaml::to_string(s) {
        Ok(rendered) => rendered.trim_end_matches('\n').to_string(),
        Err(_) => return double_quoted(s),
    };

    let plain = !rendered.starts_with('\'') && !rendered.starts_with('"');
    if in_flow && plain && s.contains([',', '[', ']', '{', '}']) {
        format!("'{}'", s.replace('\'', "''"))
    } else {
        rendered
    }
}

fn double_quoted(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("'{}'", s.replace('\'', "''")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_report_shape_with_defaults() {
        let value = yaml(
            r#"
App\C:
  class_security:
    - attribute: ROLE_USER
      subject: null
  methods:
    edit:
      - route: edit
        method_security:
          attribute: EDIT
          subject: post
"#,
        );

        let expected = "\
App\\C:
  class_security:
    -
      attribute: ROLE_USER
      subject: null
  methods:
    edit:
      - { route: edit, method_security: { attribute: EDIT, subject: post } }
";
        assert_eq!(YamlEmitter::default().render(&value), expected);
    }

    #[test]
    fn test_output_parses_back_to_same_value() {
        let value = yaml(
            r#"
App\Controller\PostController:
  methods:
    edit:
      - route: post_edit
        method_security:
          attribute: EDIT
          subject: "subject.getPost()"
      - route: "post, edit"
        method_security:
          attribute: "ROLE_{ADMIN}"
          subject: "true"
"#,
        );

        for emitter in [
            YamlEmitter::default(),
            YamlEmitter::new(1, 4),
            YamlEmitter::new(10, 2),
        ] {
            let rendered = emitter.render(&value);
            assert_eq!(yaml(&rendered), value, "round trip failed for:\n{rendered}");
        }
    }

    #[test]
    fn test_indent_width() {
        let value = yaml("a:\n  b:\n    c: d\n");
        assert_eq!(YamlEmitter::new(4, 4).render(&value), "a:\n    b:\n        c: d\n");
    }

    #[test]
    fn test_inline_zero_renders_flow() {
        let value = yaml("a:\n  b: [1, 2]\n");
        assert_eq!(YamlEmitter::new(0, 2).render(&value), "{ a: { b: [1, 2] } }\n");
    }

    #[test]
    fn test_empty_document() {
        let value = Value::Mapping(serde_yaml::Mapping::new());
        assert_eq!(YamlEmitter::default().render(&value), "{}\n");
    }

    #[test]
    fn test_empty_collections_stay_inline() {
        let value = yaml("a: []\nb: {}\n");
        assert_eq!(YamlEmitter::default().render(&value), "a: []\nb: {}\n");
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("security_annotations.yml");
        std::fs::write(&path, "stale: true\n").unwrap();

        YamlEmitter::default()
            .write(&path, &yaml("fresh: true\n"))
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh: true\n");
    }
}
