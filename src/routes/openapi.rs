use serde_yaml::Value;
use tracing::debug;

use super::Route;

const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

/// Extension key naming the `Class::method` handler of an operation.
pub const CONTROLLER_EXTENSION: &str = "x-controller";

/// Build routes from the operations of an OpenAPI document.
///
/// Paths are visited in document order and verbs in the fixed
/// get/post/put/delete/patch/options/head/trace order. Operations without
/// `operationId` are named `<verb>_<path slug>`.
pub fn routes_from_openapi(spec: &Value) -> anyhow::Result<Vec<Route>> {
    let Some(paths) = spec.get("paths") else {
        return Ok(Vec::new());
    };
    let Value::Mapping(paths) = paths else {
        anyhow::bail!("`paths` must be a mapping");
    };

    let mut routes = Vec::new();
    for (path, item) in paths {
        let Some(path) = path.as_str() else {
            continue;
        };

        for verb in METHODS {
            let Some(operation) = item.get(verb) else {
                continue;
            };
            let name = operation
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}_{}", verb, slug(path)));
            let controller = operation
                .get(CONTROLLER_EXTENSION)
                .and_then(Value::as_str)
                .map(str::to_string);

            debug!(route = %name, path, verb, has_controller = controller.is_some(), "openapi operation");
            routes.push(Route {
                name,
                path: Some(path.to_string()),
                controller,
            });
        }
    }

    Ok(routes)
}

fn slug(path: &str) -> String {
    path.to_lowercase()
        .replace(|c: char| !c.is_ascii_alphanumeric(), "_")
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_operations_become_routes() {
        let spec: Value = serde_yaml::from_str(
            r#"
openapi: 3.1.0
info:
  title: Blog
  version: 1.0.0
paths:
  /posts/{id}:
    summary: A post
    put:
      operationId: post_update
      x-controller: App\Controller\PostController::update
    get:
      operationId: post_show
      x-controller: App\Controller\PostController::show
  /health:
    get:
      responses:
        '200':
          description: OK
"#,
        )
        .unwrap();

        let routes = routes_from_openapi(&spec).unwrap();
        assert_eq!(
            routes,
            vec![
                Route::new("post_show", Some("App\\Controller\\PostController::show"))
                    .with_path("/posts/{id}"),
                Route::new("post_update", Some("App\\Controller\\PostController::update"))
                    .with_path("/posts/{id}"),
                Route::new("get_health", None).with_path("/health"),
            ]
        );
    }

    #[test]
    fn test_document_without_paths() {
        let spec: Value = serde_yaml::from_str("openapi: 3.1.0\n").unwrap();
        assert!(routes_from_openapi(&spec).unwrap().is_empty());
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("/users/{user_id}/posts"), "users__user_id__posts");
    }
}
