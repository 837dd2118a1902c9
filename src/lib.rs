//! # annotation-audit
//!
//! **annotation-audit** walks a web application's route table, reads the
//! access-control metadata attached to each route's handler (role and
//! permission checks declared on the controller class or method) and writes
//! the aggregated findings to a YAML report for review.
//!
//! It is an auditing tool run at build or ops time; it enforces nothing.
//!
//! ## Architecture
//!
//! - **[`routes`]** - route table loading (route files and OpenAPI documents)
//! - **[`metadata`]** - metadata model, [`metadata::MetadataReader`] trait,
//!   metadata tables and the PHP source scanner
//! - **[`expression`]** - normalization of `Security` / `IsGranted` metadata into
//!   [`expression::SecurityExpression`] records
//! - **[`collector`]** - the per-route walk producing the report
//! - **[`emitter`]** - YAML rendering with a fixed inline depth
//! - **[`cli`]** - the `annotation-audit` command line
//! - **[`config`]** / **[`logging`]** - environment configuration and tracing setup
//!
//! ### Scan Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant User
//!     participant CLI as CLI<br/>(annotation-audit scan)
//!     participant Routes as routes::load_routes
//!     participant Meta as MetadataTable / php::scan_directory
//!     participant Collector as AnnotationCollector
//!     participant Emitter as YamlEmitter
//!     participant FS as File System
//!
//!     User->>CLI: scan --routes routes.yaml --source src/
//!     CLI->>Routes: load_routes("routes.yaml")
//!     Routes-->>CLI: Vec<Route>
//!     CLI->>Meta: scan_directory("src/")
//!     Meta-->>CLI: MetadataTable
//!     CLI->>Collector: collect(&routes)
//!     loop every route
//!         Collector->>Meta: class_metadata(class) (first time only)
//!         Collector->>Meta: method_metadata(class, method)
//!         alt class or method missing
//!             Collector->>Collector: Diagnostic
//!         end
//!     end
//!     Collector-->>CLI: Collection { report, diagnostics }
//!     CLI->>User: Skipping route ... (per diagnostic)
//!     CLI->>Emitter: write("security_annotations.yml", &report)
//!     Emitter->>FS: overwrite report
//!     CLI->>User: Security annotations have been saved to ...
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use annotation_audit::collector::AnnotationCollector;
//! use annotation_audit::emitter::YamlEmitter;
//! use annotation_audit::metadata::php;
//! use annotation_audit::routes::load_routes;
//! use std::path::Path;
//!
//! let routes = load_routes(Path::new("config/routes.yaml"))?;
//! let table = php::scan_directory(Path::new("src/Controller"))?;
//!
//! let collection = AnnotationCollector::new(&table).collect(&routes);
//! for diagnostic in &collection.diagnostics {
//!     println!("{diagnostic}");
//! }
//! YamlEmitter::default().write(Path::new("security_annotations.yml"), &collection.report)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Report Format
//!
//! ```yaml
//! App\Controller\PostController:
//!   class_security:
//!     -
//!       attribute: ROLE_USER
//!       subject: null
//!   methods:
//!     edit:
//!       - { route: post_edit, method_security: { attribute: EDIT, subject: post } }
//! ```

pub mod cli;
pub mod collector;
pub mod config;
pub mod emitter;
pub mod expression;
pub mod logging;
pub mod metadata;
pub mod routes;

pub use collector::{
    AnnotationCollector, Collection, ControllerSecurityInfo, Diagnostic, MethodSecurityRecord,
    SecurityReport,
};
pub use expression::SecurityExpression;
pub use metadata::{Metadata, MetadataReader, MetadataTable, ReflectionError};
pub use routes::{load_routes, Route, RouteEntry};
