use serde_yaml::Value;
use tracing::debug;

use super::{Route, HANDLER_SEPARATOR};

/// Read a route-name → definition mapping.
///
/// `controller` takes precedence over `defaults._controller`; a two-element
/// `[Class, method]` list is joined into `Class::method`. Entries that are not
/// mappings become routes without a handler.
pub fn routes_from_mapping(value: &Value) -> anyhow::Result<Vec<Route>> {
    let Value::Mapping(map) = value else {
        anyhow::bail!("expected a mapping of route names to route definitions");
    };

    let mut routes = Vec::with_capacity(map.len());
    for (key, definition) in map {
        let Some(name) = key.as_str() else {
            debug!(?key, "ignoring route with non-string name");
            continue;
        };

        let controller = definition
            .get("controller")
            .or_else(|| definition.get("defaults").and_then(|d| d.get("_controller")))
            .and_then(controller_identifier);

        routes.push(Route {
            name: name.to_string(),
            path: definition
                .get("path")
                .and_then(Value::as_str)
                .map(str::to_string),
            controller,
        });
    }

    Ok(routes)
}

fn controller_identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Sequence(parts) => match parts.as_slice() {
            [class, method] => Some(format!(
                "{}{}{}",
                class.as_str()?,
                HANDLER_SEPARATOR,
                method.as_str()?
            )),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn parse(yaml: &str) -> Vec<Route> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        routes_from_mapping(&value).unwrap()
    }

    #[test]
    fn test_route_definitions() {
        let routes = parse(
            r#"
post_index:
  path: /posts
  controller: App\Controller\PostController::index
post_edit:
  path: /posts/{id}/edit
  defaults:
    _controller: App\Controller\PostController::edit
post_show:
  path: /posts/{id}
  controller: [App\Controller\PostController, show]
_profiler:
  path: /_profiler
redirect: ~
"#,
        );

        assert_eq!(
            routes,
            vec![
                Route::new("post_index", Some("App\\Controller\\PostController::index"))
                    .with_path("/posts"),
                Route::new("post_edit", Some("App\\Controller\\PostController::edit"))
                    .with_path("/posts/{id}/edit"),
                Route::new("post_show", Some("App\\Controller\\PostController::show"))
                    .with_path("/posts/{id}"),
                Route::new("_profiler", None).with_path("/_profiler"),
                Route::new("redirect", None),
            ]
        );
    }

    #[test]
    fn test_controller_wins_over_defaults() {
        let routes = parse(
            r#"
home:
  controller: App\A::one
  defaults:
    _controller: App\B::two
"#,
        );
        assert_eq!(routes[0].controller.as_deref(), Some("App\\A::one"));
    }

    #[test]
    fn test_rejects_non_mapping_document() {
        let value: Value = serde_yaml::from_str("- home\n- edit\n").unwrap();
        assert!(routes_from_mapping(&value).is_err());
    }
}
