//! Static scan of PHP controller sources into a [`MetadataTable`].
//!
//! The scanner reads `namespace`, `use`, `class` and `function` declarations
//! line by line and attaches the attributes (`#[IsGranted(...)]`,
//! `#[Security(...)]`) and docblock annotations (`@IsGranted(...)`,
//! `@Security(...)`) written directly above each declaration. Other attributes
//! and annotations are kept as [`Metadata::Other`].
//!
//! Attribute groups may span several lines and may share a line with the
//! declaration they belong to (`#[IsGranted('ROLE_USER')] class C`). A parent
//! named by `extends` is resolved against the namespace and `use` imports so
//! inherited methods can be found.

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{Metadata, MetadataTable};

static NAMESPACE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^namespace\s+([A-Za-z_][A-Za-z0-9_\\]*)\s*[;{]")
        .expect("namespace regex should be valid")
});

static USE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^use\s+\\?([A-Za-z_][A-Za-z0-9_\\]*)(?:\s+as\s+([A-Za-z_][A-Za-z0-9_]*))?\s*;")
        .expect("use regex should be valid")
});

static CLASS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:final|abstract|readonly)\s+)*class\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s+extends\s+(\\?[A-Za-z_][A-Za-z0-9_\\]*))?",
    )
    .expect("class regex should be valid")
});

static FUNCTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:public|protected|private|static|final|abstract)\s+)*function\s+&?\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(",
    )
    .expect("function regex should be valid")
});

/// `@Name` or `@Name(args)` inside a docblock; lowercase tags (`@param`) are skipped.
static ANNOTATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@([A-Z][A-Za-z0-9_\\]*)(\((.*)\))?").expect("annotation regex should be valid")
});

static NAMED_ARGUMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*(:|=)\s*(.*)$")
        .expect("named argument regex should be valid")
});

/// Scan every `*.php` file below `root` (in file-name order) into one table.
pub fn scan_directory(root: &Path) -> anyhow::Result<MetadataTable> {
    let mut table = MetadataTable::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map(|e| e != "php").unwrap_or(true) {
            continue;
        }

        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        debug!(file = %path.display(), "scanning PHP source");
        scan(&source, Some(path), &mut table);
    }

    Ok(table)
}

/// Scan one PHP source file into `table`.
pub fn scan_source(source: &str, table: &mut MetadataTable) {
    scan(source, None, table);
}

fn scan(source: &str, file: Option<&Path>, table: &mut MetadataTable) {
    let mut scanner = SourceScanner::new(file, table);
    for (index, raw) in source.lines().enumerate() {
        scanner.line(index + 1, raw.trim());
    }
    scanner.finish();
}

/// Line-by-line state of one source file.
struct SourceScanner<'a> {
    file: Option<&'a Path>,
    table: &'a mut MetadataTable,
    namespace: Option<String>,
    /// Lowercased alias → fully qualified name
    imports: HashMap<String, String>,
    current_class: Option<String>,
    /// Metadata waiting for the next declaration
    pending: Vec<Metadata>,
    in_docblock: bool,
    line_number: usize,
    /// Attribute text whose `]` has not been seen yet, with its first line
    open_attribute: Option<(usize, String)>,
}

impl<'a> SourceScanner<'a> {
    fn new(file: Option<&'a Path>, table: &'a mut MetadataTable) -> Self {
        SourceScanner {
            file,
            table,
            namespace: None,
            imports: HashMap::new(),
            current_class: None,
            pending: Vec::new(),
            in_docblock: false,
            line_number: 0,
            open_attribute: None,
        }
    }

    fn line(&mut self, number: usize, line: &str) {
        self.line_number = number;

        if let Some((start, mut buffer)) = self.open_attribute.take() {
            buffer.push(' ');
            buffer.push_str(line);
            self.attributes(start, buffer);
            return;
        }

        if self.in_docblock || line.starts_with("/**") {
            let (content, closes) = match line.find("*/") {
                Some(end) => (&line[..end], true),
                None => (line, false),
            };
            let body = content.trim_start_matches("/**").trim_start_matches('*');
            self.pending.extend(parse_docblock_line(body));
            self.in_docblock = !closes;
            return;
        }

        self.segment(line);
    }

    /// Handle the text of a line that is not part of a docblock.
    fn segment(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() || text.starts_with("//") || text.starts_with("/*") {
            return;
        }
        if text.starts_with("#[") {
            self.attributes(self.line_number, text.to_string());
            return;
        }
        if text.starts_with('#') {
            return;
        }
        self.declaration(text);
    }

    fn attributes(&mut self, start: usize, buffer: String) {
        match parse_attributes(&buffer) {
            Some((metadata, rest)) => {
                self.pending.extend(metadata);
                self.segment(&buffer[rest..]);
            }
            None => self.open_attribute = Some((start, buffer)),
        }
    }

    fn declaration(&mut self, line: &str) {
        if let Some(caps) = NAMESPACE_REGEX.captures(line) {
            self.namespace = Some(caps[1].to_string());
            self.imports.clear();
            self.pending.clear();
            return;
        }

        // Inside a class body `use` imports a trait, not a name
        if self.current_class.is_none() {
            if let Some(caps) = USE_REGEX.captures(line) {
                let alias = match caps.get(2) {
                    Some(alias) => alias.as_str(),
                    None => caps[1].rsplit('\\').next().unwrap_or(&caps[1]),
                };
                self.imports
                    .insert(alias.to_ascii_lowercase(), caps[1].to_string());
                self.pending.clear();
                return;
            }
        }

        if let Some(caps) = CLASS_REGEX.captures(line) {
            let class = self.qualify(&caps[1]);
            let extends = caps.get(2).map(|parent| self.resolve(parent.as_str()));
            let entry = self.table.class_entry(class.as_str());
            entry.metadata.extend(self.pending.drain(..));
            if extends.is_some() {
                entry.extends = extends;
            }
            self.current_class = Some(class);

            let header_end = caps.get(0).map_or(line.len(), |m| m.end());
            if let Some(open) = line[header_end..].find('{') {
                self.segment(&line[header_end + open + 1..]);
            }
            return;
        }

        if let Some(caps) = FUNCTION_REGEX.captures(line) {
            if let Some(class) = &self.current_class {
                self.table
                    .method_entry(class.as_str(), &caps[1])
                    .extend(self.pending.drain(..));
            }
            self.pending.clear();
            return;
        }

        // Metadata belongs to the declaration directly below it only.
        self.pending.clear();
    }

    /// Prefix a declared name with the current namespace.
    fn qualify(&self, name: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}\\{}", ns, name),
            None => name.to_string(),
        }
    }

    /// Resolve a referenced class name through `use` imports and the namespace.
    fn resolve(&self, name: &str) -> String {
        if let Some(qualified) = name.strip_prefix('\\') {
            return qualified.to_string();
        }
        let (first, rest) = match name.split_once('\\') {
            Some((first, rest)) => (first, Some(rest)),
            None => (name, None),
        };
        match (self.imports.get(&first.to_ascii_lowercase()), rest) {
            (Some(import), Some(rest)) => format!("{}\\{}", import, rest),
            (Some(import), None) => import.clone(),
            (None, _) => self.qualify(name),
        }
    }

    fn finish(self) {
        if let Some((start, text)) = self.open_attribute {
            let attribute: String = text.chars().take(80).collect();
            warn!(
                file = %self.file.map(|f| f.display().to_string()).unwrap_or_default(),
                line = start,
                attribute = %attribute,
                "attribute is never closed; declarations below it were not scanned"
            );
        }
    }
}

fn parse_docblock_line(body: &str) -> Vec<Metadata> {
    ANNOTATION_REGEX
        .captures_iter(body)
        .map(|caps| {
            let arguments = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            build_metadata(&caps[1], arguments)
        })
        .collect()
}

/// Parse the `#[...]` groups at the start of `text`.
///
/// Returns the metadata and the offset of the text after the last group, or
/// `None` while a group is still open.
fn parse_attributes(text: &str) -> Option<(Vec<Metadata>, usize)> {
    let mut found = Vec::new();
    let mut rest = text.trim_start();

    while let Some(group) = rest.strip_prefix("#[") {
        let end = find_closing(group, ']')?;
        for attribute in split_top_level(&group[..end]) {
            let attribute = attribute.trim();
            if attribute.is_empty() {
                continue;
            }
            let (name, arguments) = match attribute.find('(') {
                Some(open) if attribute.ends_with(')') => (
                    attribute[..open].trim(),
                    &attribute[open + 1..attribute.len() - 1],
                ),
                _ => (attribute, ""),
            };
            found.push(build_metadata(name, arguments));
        }
        rest = group[end + 1..].trim_start();
    }

    Some((found, text.len() - rest.len()))
}

fn build_metadata(name: &str, arguments: &str) -> Metadata {
    let short_name = name.rsplit('\\').next().unwrap_or(name);
    let arguments = parse_arguments(arguments);

    match short_name {
        "IsGranted" => match argument(&arguments, 0, &["attribute", "value"]) {
            Some(attribute) => Metadata::IsGranted {
                attribute,
                subject: argument(&arguments, 1, &["subject"]),
            },
            None => Metadata::Other {
                name: name.to_string(),
            },
        },
        "Security" => match argument(&arguments, 0, &["expression", "value"]) {
            Some(expression) => Metadata::Security { expression },
            None => Metadata::Other {
                name: name.to_string(),
            },
        },
        _ => Metadata::Other {
            name: name.to_string(),
        },
    }
}

/// Positional or named arguments of an attribute call.
fn parse_arguments(arguments: &str) -> Vec<(Option<String>, String)> {
    split_top_level(arguments)
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match NAMED_ARGUMENT_REGEX.captures(part) {
            // `self::ROLE` is a class constant, not a named argument
            Some(caps) if !(&caps[2] == ":" && caps[3].starts_with(':')) => {
                (Some(caps[1].to_string()), unquote(caps[3].trim()))
            }
            _ => (None, unquote(part)),
        })
        .collect()
}

fn argument(
    arguments: &[(Option<String>, String)],
    position: usize,
    names: &[&str],
) -> Option<String> {
    arguments
        .iter()
        .find(|(name, _)| name.as_deref().is_some_and(|n| names.contains(&n)))
        .or_else(|| {
            arguments
                .iter()
                .filter(|(name, _)| name.is_none())
                .nth(position)
        })
        .map(|(_, value)| value.clone())
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && bytes[0] == bytes[bytes.len() - 1] {
        let inner = &value[1..value.len() - 1];
        match bytes[0] {
            b'\'' => return inner.replace("\\'", "'").replace("\\\\", "\\"),
            b'"' => return inner.replace("\"\"", "\"").replace("\\\"", "\""),
            _ => {}
        }
    }
    value.to_string()
}

/// Split on commas that are outside quotes and brackets.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Index of the `close` bracket ending the group that starts at `input[0]`.
fn find_closing(input: &str, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            c if c == close && depth == 0 => return Some(i),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}
