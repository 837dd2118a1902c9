//! # Metadata Module
//!
//! Handler metadata: the access-control annotations and attributes attached to
//! controller classes and methods.
//!
//! Metadata is read through the [`MetadataReader`] trait. The crate ships one
//! implementation, [`MetadataTable`], which is either loaded from a YAML/JSON
//! file or built by scanning PHP controller sources with [`php::scan_directory`].
//!
//! ## Metadata table format
//!
//! ```yaml
//! App\Controller\PostController:
//!   metadata:
//!     - kind: is_granted
//!       attribute: ROLE_USER
//!   methods:
//!     index: []
//!     edit:
//!       - kind: security
//!         expression: "is_granted('EDIT', post)"
//!       - kind: other
//!         name: Route
//! App\Controller\UserController:
//!   extends: App\Controller\BaseCrudController
//!   methods:
//!     show: []
//! ```
//!
//! A method looked up on a class that does not declare it is searched for
//! along the `extends` chain.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod php;
mod table;

pub use table::{ClassMetadata, MetadataTable};

/// A metadata object attached to a class or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Metadata {
    /// Legacy `Security` annotation holding a free-form expression
    Security {
        /// Expression text, e.g. `is_granted('ROLE_ADMIN') or user.isOwner()`
        expression: String,
    },
    /// Structured `IsGranted` attribute
    IsGranted {
        /// Role or permission name
        attribute: String,
        /// Subject expression, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
    },
    /// Any other annotation or attribute (routes, caching, ...)
    Other {
        /// Annotation name as written in the source
        name: String,
    },
}

/// Lookup failure for a class or method that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectionError {
    /// The class is unknown
    ClassNotFound {
        /// Requested class name
        class: String,
    },
    /// The class exists but does not declare the method
    MethodNotFound {
        /// Requested class name
        class: String,
        /// Requested method name
        method: String,
    },
}

impl fmt::Display for ReflectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReflectionError::ClassNotFound { class } => {
                write!(f, "Class \"{}\" does not exist", class)
            }
            ReflectionError::MethodNotFound { class, method } => {
                write!(f, "Method {}::{}() does not exist", class, method)
            }
        }
    }
}

impl std::error::Error for ReflectionError {}

/// Source of handler metadata, keyed by class and by (class, method).
pub trait MetadataReader {
    /// Metadata attached to the class itself.
    fn class_metadata(&self, class: &str) -> Result<Vec<Metadata>, ReflectionError>;

    /// Metadata attached to one method of the class, including a method the
    /// class inherits.
    fn method_metadata(&self, class: &str, method: &str)
        -> Result<Vec<Metadata>, ReflectionError>;

    /// The class name as the reader declares it.
    ///
    /// Readers that match names loosely return the declared spelling so that
    /// `App\C` and `app\c` are reported as one class.
    fn resolve_class(&self, class: &str) -> Result<String, ReflectionError> {
        Ok(class.to_string())
    }
}
