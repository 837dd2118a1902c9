//! # CLI Module
//!
//! Command-line interface of the `annotation-audit` binary.
//!
//! ## Commands
//!
//! ### `scan`
//!
//! Walk the route table, collect the security expressions of every handler and
//! write the report:
//!
//! ```bash
//! annotation-audit scan --routes config/routes.yaml --metadata security_metadata.yaml
//! annotation-audit scan --routes config/routes.yaml --source src/Controller
//! ```
//!
//! Options:
//! - `--routes <FILE>` - route file or OpenAPI document (required)
//! - `--metadata <FILE>` - metadata table, or
//! - `--source <DIR>` - PHP controller sources to scan
//! - `--output <FILE>` - report path (default: `./security_annotations.yml`)
//! - `--inline <N>` / `--indent <N>` - YAML layout (default: 4 / 2)
//!
//! Each route whose controller class or method cannot be found is reported as
//! `Skipping route <name>: <reason>`; the run still succeeds.
//!
//! ### `extract-metadata`
//!
//! Scan PHP controller sources and print the metadata table, e.g. to review it
//! or commit it alongside the routes:
//!
//! ```bash
//! annotation-audit extract-metadata --source src/Controller --output security_metadata.yaml
//! ```

mod commands;


pub use commands::{run, run_cli, Cli, Commands};
