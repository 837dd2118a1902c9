//! # Routes Module
//!
//! Loads the application's route table and resolves each route's handler
//! identifier (`Class::method`).
//!
//! Two file shapes are accepted by [`load_routes`]:
//!
//! - **Route files** - a mapping of route name to `{ path, controller }` (or
//!   `defaults: { _controller }`), as exported from a Symfony application.
//! - **OpenAPI documents** - any document with a top-level `openapi` key; each
//!   operation becomes a route named by its `operationId`, with the handler
//!   taken from the `x-controller` extension.
//!
//! YAML is chosen for `.yaml`/`.yml` files, JSON otherwise. File order is kept.

use anyhow::Context;
use serde_yaml::Value;
use std::path::Path;

mod file;
mod openapi;

pub use file::routes_from_mapping;
pub use openapi::routes_from_openapi;

/// Separator between controller class and method in a handler identifier.
pub const HANDLER_SEPARATOR: &str = "::";

/// A route as found in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Route name (e.g. `post_edit`)
    pub name: String,
    /// URL pattern, when known
    pub path: Option<String>,
    /// Handler identifier (`Class::method`), if the route has one
    pub controller: Option<String>,
}

impl Route {
    pub fn new(name: impl Into<String>, controller: Option<&str>) -> Self {
        Route {
            name: name.into(),
            path: None,
            controller: controller.map(str::to_string),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// A route whose handler identifier was split into class and method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub route_name: String,
    pub controller_class: String,
    pub controller_method: String,
}

impl RouteEntry {
    /// Split the route's handler on the first `::`.
    ///
    /// Returns `None` for routes without a handler and for identifiers that
    /// lack the separator or have an empty class or method part.
    pub fn from_route(route: &Route) -> Option<Self> {
        let controller = route.controller.as_deref()?;
        let (class, method) = controller.split_once(HANDLER_SEPARATOR)?;
        let (class, method) = (class.trim(), method.trim());
        if class.is_empty() || method.is_empty() {
            return None;
        }
        Some(RouteEntry {
            route_name: route.name.clone(),
            controller_class: class.to_string(),
            controller_method: method.to_string(),
        })
    }
}

/// Load a route table from a route file or OpenAPI document.
pub fn load_routes(path: &Path) -> anyhow::Result<Vec<Route>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read route file {}", path.display()))?;
    let value: Value = if path
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

    routes_from_value(&value).with_context(|| format!("Invalid route file {}", path.display()))
}

/// Build routes from an already parsed document.
pub fn routes_from_value(value: &Value) -> anyhow::Result<Vec<Route>> {
    if value.get("openapi").is_some() {
        routes_from_openapi(value)
    } else {
        routes_from_mapping(value)
    }
}
