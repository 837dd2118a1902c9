//! # Annotation Collector Module
//!
//! Walks a route table, looks up the security metadata of every handler and
//! aggregates it per controller class.
//!
//! ## Processing
//!
//! Routes are visited in registry order:
//!
//! 1. Routes without a handler, or with a handler that is not `Class::method`,
//!    are skipped silently.
//! 2. The class name is resolved to the spelling the reader declares. The
//!    first time a class is seen its class-level metadata is read (once per
//!    run) and, when it yields expressions, stored as `class_security`.
//! 3. The method's metadata is read and every expression becomes a
//!    [`MethodSecurityRecord`] under `methods.<method>`.
//! 4. A missing class or method produces a [`Diagnostic`] and processing moves
//!    on to the next route.
//!
//! ## Usage
//!
//! ```rust
//! use annotation_audit::collector::AnnotationCollector;
//! use annotation_audit::metadata::{Metadata, MetadataTable};
//! use annotation_audit::routes::Route;
//!
//! let mut table = MetadataTable::new();
//! table.method_entry("App\\C", "edit").push(Metadata::Security {
//!     expression: "is_granted('EDIT', post)".to_string(),
//! });
//!
//! let routes = vec![Route::new("edit", Some("App\\C::edit"))];
//! let collection = AnnotationCollector::new(&table).collect(&routes);
//!
//! assert_eq!(collection.report["App\\C"].methods["edit"][0].route, "edit");
//! assert!(collection.diagnostics.is_empty());
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

use crate::expression::{extract_security_expressions, SecurityExpression};
use crate::metadata::{MetadataReader, ReflectionError};
use crate::routes::{Route, RouteEntry};


/// One expression guarding a method, tagged with the route that reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSecurityRecord {
    pub route: String,
    pub method_security: SecurityExpression,
}

/// Security data gathered for one controller class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSecurityInfo {
    /// Expressions declared on the class itself
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class_security: Vec<SecurityExpression>,
    /// Method name → records, in first-seen order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub methods: IndexMap<String, Vec<MethodSecurityRecord>>,
}

/// Controller class → security data, in first-seen order.
pub type SecurityReport = IndexMap<String, ControllerSecurityInfo>;

/// A route skipped because its handler could not be inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub route: String,
    pub reason: String,
}

impl Diagnostic {
    pub fn new(route: impl Into<String>, reason: impl Into<String>) -> Self {
        Diagnostic {
            route: route.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Skipping route {}: {}", self.route, self.reason)
    }
}

/// Outcome of one collector run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    pub report: SecurityReport,
    pub diagnostics: Vec<Diagnostic>,
}

/// Collects security expressions for the handlers of a route table.
///
/// The collector holds no state between runs: every call to
/// [`AnnotationCollector::collect`] starts from an empty report.
pub struct AnnotationCollector<'a> {
    reader: &'a dyn MetadataReader,
}

impl<'a> AnnotationCollector<'a> {
    pub fn new(reader: &'a dyn MetadataReader) -> Self {
        AnnotationCollector { reader }
    }

    pub fn collect(&self, routes: &[Route]) -> Collection {
        let mut report = SecurityReport::new();
        let mut seen_classes: HashSet<String> = HashSet::new();
        let mut diagnostics = Vec::new();

        for route in routes {
            let Some(entry) = RouteEntry::from_route(route) else {
                debug!(route = %route.name, controller = ?route.controller, "no inspectable handler");
                continue;
            };

            if let Err(err) = self.collect_route(&entry, &mut report, &mut seen_classes) {
                warn!(route = %entry.route_name, error = %err, "skipping route");
                diagnostics.push(Diagnostic::new(entry.route_name, err.to_string()));
            }
        }

        debug!(
            classes = report.len(),
            skipped = diagnostics.len(),
            "collection finished"
        );
        Collection {
            report,
            diagnostics,
        }
    }

    fn collect_route(
        &self,
        entry: &RouteEntry,
        report: &mut SecurityReport,
        seen_classes: &mut HashSet<String>,
    ) -> Result<(), ReflectionError> {
        // Key on the declared spelling so differently cased routes share one entry
        let class = &self.reader.resolve_class(&entry.controller_class)?;

        if seen_classes.insert(class.clone()) {
            let class_security =
                extract_security_expressions(&self.reader.class_metadata(class)?);
            if !class_security.is_empty() {
                report.entry(class.clone()).or_default().class_security = class_security;
            }
        }

        let method_security = extract_security_expressions(
            &self
                .reader
                .method_metadata(class, &entry.controller_method)?,
        );
        if method_security.is_empty() {
            return Ok(());
        }

        debug!(
            route = %entry.route_name,
            class = %class,
            method = %entry.controller_method,
            expressions = method_security.len(),
            "method security"
        );
        report
            .entry(class.clone())
            .or_default()
            .methods
            .entry(entry.controller_method.clone())
            .or_default()
            .extend(
                method_security
                    .into_iter()
                    .map(|expression| MethodSecurityRecord {
                        route: entry.route_name.clone(),
                        method_security: expression,
                    }),
            );

        Ok(())
    }
}
