//! # Configuration Module
//!
//! Environment-driven defaults for the `scan` command. Command-line flags take
//! precedence over these values.
//!
//! ## Environment Variables
//!
//! ### `ANNOTATION_AUDIT_OUTPUT`
//!
//! Path of the report file. Default: `./security_annotations.yml`
//!
//! ### `ANNOTATION_AUDIT_INLINE`
//!
//! Number of YAML levels rendered in block style before switching to inline
//! (flow) style. Default: `4`
//!
//! ### `ANNOTATION_AUDIT_INDENT`
//!
//! Spaces per indentation level. Default: `2`
//!
//! ## Usage
//!
//! ```rust
//! use annotation_audit::config::AuditConfig;
//!
//! let config = AuditConfig::from_env();
//! println!("Report goes to {}", config.output.display());
//! ```

use std::env;
use std::path::PathBuf;

use crate::emitter::{DEFAULT_INDENT, DEFAULT_INLINE};

/// Default location of the generated report.
pub const DEFAULT_OUTPUT: &str = "./security_annotations.yml";

/// Report settings loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    /// Report file path (default: `./security_annotations.yml`)
    pub output: PathBuf,
    /// Block-style depth of the YAML report (default: 4)
    pub inline: usize,
    /// Indentation width of the YAML report (default: 2)
    pub indent: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            output: PathBuf::from(DEFAULT_OUTPUT),
            inline: DEFAULT_INLINE,
            indent: DEFAULT_INDENT,
        }
    }
}

impl AuditConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = AuditConfig::default();
        AuditConfig {
            output: lookup("ANNOTATION_AUDIT_OUTPUT")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.output),
            inline: lookup("ANNOTATION_AUDIT_INLINE")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(defaults.inline),
            indent: lookup("ANNOTATION_AUDIT_INDENT")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.indent),
        }
    }
}
