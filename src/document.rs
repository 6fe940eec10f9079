use std::collections::BTreeMap;

use crate::container::{slice_to_dot_path, Container, MergePolicy};
use crate::error::Error;
use crate::route;
use crate::spec::{OpenAPI, Operation};

/// The final document: the container that is serialized, plus the typed
/// root it deserializes into, which is what enforces overall shape.
#[derive(Clone, Debug)]
pub struct Document {
    spec: OpenAPI,
    container: Container,
}

impl Document {
    pub fn new(container: Container) -> Result<Document, Error> {
        let spec = serde_json::from_value(container.value().clone())
            .map_err(Error::InvalidDocument)?;
        Ok(Document { spec, container })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn spec(&self) -> &OpenAPI {
        &self.spec
    }
}

/// One path operation flattened out of the `paths` object.
#[derive(Clone, Debug)]
pub struct FlatPath {
    pub method: String,
    pub path: String,
    /// Dot path of the operation inside the document.
    pub key: String,
    pub operation: Container,
}

/// Flattens the `paths` object into `(method, path, operation)` entries.
pub fn paths(cnt: &Container) -> Result<Vec<FlatPath>, Error> {
    let paths = match cnt.path("paths") {
        Some(v) => Container::from_value(v.clone()),
        None => return Ok(vec![]),
    };

    let mut ff = vec![];
    for (path, methods) in paths.children_map()? {
        for (method, operation) in methods.children_map()? {
            ff.push(FlatPath {
                key: slice_to_dot_path(["paths", path.as_str(), method.as_str()]),
                method,
                path: path.clone(),
                operation,
            });
        }
    }
    Ok(ff)
}

/// Applies per-pattern operation defaults: every operation matching a
/// pattern is merged over the default, with the operation's own fields
/// winning.
pub fn set_paths_defaults(
    cnt: &mut Container,
    defops: &BTreeMap<String, Operation>,
) -> Result<(), Error> {
    for (pattern, default) in defops {
        let ov = Container::make(default)?;

        for f in paths(cnt)? {
            if !route::matches(pattern, &f.method, &f.path)? {
                continue;
            }

            log::debug!("{}: applying operation defaults of {pattern}", f.key);

            let mut nc = f.operation;
            nc.merge(&ov, MergePolicy::Default)?;
            cnt.set_p(&f.key, nc.into_value())?;
        }
    }

    Ok(())
}

const ROOT_MERGE: &[(&str, MergePolicy)] = &[
    ("info", MergePolicy::Override),
    ("components", MergePolicy::Strict),
    ("paths", MergePolicy::Default),
    ("externalDocs", MergePolicy::Default),
    ("security", MergePolicy::Default),
    ("servers", MergePolicy::Default),
    ("tags", MergePolicy::Default),
];

/// Merges the configured root document into the fragment container, one
/// top-level key at a time with a per-key policy. For `info` the root wins;
/// `components` must not collide at all; for everything else fragments win
/// and the root only fills in what is missing.
pub fn merge_with_root(root: &OpenAPI, c: &mut Container) -> Result<(), Error> {
    let r = Container::make(root)?;

    for (key, policy) in ROOT_MERGE {
        let z = c.path(key).cloned();
        let y = r.path(key).cloned();
        if z.is_none() && y.is_none() {
            continue;
        }

        let mut s = Container::new();
        for side in [z, y].into_iter().flatten() {
            let mut wrapped = Container::new();
            wrapped.set_p(key, side)?;
            s.merge(&wrapped, *policy)?;
        }

        c.merge(&s, MergePolicy::Override)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Info;
    use serde_json::json;

    fn demo() -> Container {
        Container::from_value(json!({
            "paths": {
                "/v1/demo": {
                    "get": {
                        "description": "Description",
                        "summary": "Summary",
                    },
                },
            },
        }))
    }

    #[test]
    fn test_paths() {
        let ff = paths(&demo()).unwrap();

        assert_eq!(ff.len(), 1);
        assert_eq!(ff[0].method, "get");
        assert_eq!(ff[0].path, "/v1/demo");
        assert_eq!(ff[0].key, "paths./v1/demo.get");
    }

    #[test]
    fn test_defaults() {
        let mut cnt = demo();

        let mut defops = BTreeMap::new();
        defops.insert(
            "/v1/demo".to_string(),
            Operation {
                summary: Some("override1".to_string()),
                operation_id: Some("override2".to_string()),
                ..Operation::default()
            },
        );

        set_paths_defaults(&mut cnt, &defops).unwrap();

        assert_eq!(
            cnt.value(),
            &json!({
                "paths": {
                    "/v1/demo": {
                        "get": {
                            "description": "Description",
                            "summary": "Summary",
                            "operationId": "override2",
                        },
                    },
                },
            })
        );
    }

    #[test]
    fn test_defaults_respect_method_pattern() {
        let mut cnt = demo();

        let mut defops = BTreeMap::new();
        defops.insert(
            "POST:/v1/demo".to_string(),
            Operation {
                operation_id: Some("nope".to_string()),
                ..Operation::default()
            },
        );

        set_paths_defaults(&mut cnt, &defops).unwrap();

        assert_eq!(cnt.path("paths./v1/demo.get.operationId"), None);
    }

    #[test]
    fn test_merge_with_root_info_overrides() {
        let mut c = Container::from_value(json!({
            "info": {"title": "fragments", "version": "0.1.0"},
            "paths": {"/a": {"get": {"summary": "from fragment"}}},
        }));

        let root = OpenAPI {
            info: Some(Info {
                title: "configured".to_string(),
                version: "1.0.0".to_string(),
                ..Info::default()
            }),
            ..OpenAPI::default()
        };

        merge_with_root(&root, &mut c).unwrap();

        assert_eq!(c.path("info.title"), Some(&json!("configured")));
        assert_eq!(c.path("info.version"), Some(&json!("1.0.0")));
        assert_eq!(
            c.path("paths./a.get.summary"),
            Some(&json!("from fragment"))
        );
    }

    #[test]
    fn test_merge_with_root_paths_fragments_win() {
        let mut c = Container::from_value(json!({
            "paths": {"/a": {"get": {"summary": "fragment"}}},
        }));

        let mut paths_map = serde_json::Map::new();
        paths_map.insert(
            "/a".to_string(),
            json!({"get": {"summary": "root", "operationId": "rootOnly"}}),
        );
        paths_map.insert("/b".to_string(), json!({"get": {"summary": "added"}}));

        let root = OpenAPI {
            paths: Some(paths_map),
            ..OpenAPI::default()
        };

        merge_with_root(&root, &mut c).unwrap();

        assert_eq!(c.path("paths./a.get.summary"), Some(&json!("fragment")));
        assert_eq!(
            c.path("paths./a.get.operationId"),
            Some(&json!("rootOnly"))
        );
        assert_eq!(c.path("paths./b.get.summary"), Some(&json!("added")));
    }

    #[test]
    fn test_merge_with_root_components_collide() {
        let mut c = Container::from_value(json!({
            "components": {"schemas": {"A": {"type": "string"}}},
        }));

        let root: OpenAPI = serde_json::from_value(json!({
            "components": {"schemas": {"A": {"type": "integer"}}},
        }))
        .unwrap();

        assert!(merge_with_root(&root, &mut c).is_err());
    }

    #[test]
    fn test_merge_with_root_keeps_fragment_arrays() {
        let mut c = Container::from_value(json!({
            "tags": [{"name": "one"}],
            "servers": [{"url": "https://fragment.example"}],
        }));

        let root: OpenAPI = serde_json::from_value(json!({
            "tags": [{"name": "ignored"}],
        }))
        .unwrap();

        merge_with_root(&root, &mut c).unwrap();

        assert_eq!(c.path("tags"), Some(&json!([{"name": "one"}])));
        assert_eq!(
            c.path("servers"),
            Some(&json!([{"url": "https://fragment.example"}]))
        );
    }

    #[test]
    fn test_merge_with_root_fills_missing_arrays() {
        let mut c = Container::from_value(json!({"paths": {}}));

        let root: OpenAPI = serde_json::from_value(json!({
            "servers": [{"url": "https://configured.example"}],
        }))
        .unwrap();

        merge_with_root(&root, &mut c).unwrap();

        assert_eq!(
            c.path("servers"),
            Some(&json!([{"url": "https://configured.example"}]))
        );
    }

    #[test]
    fn test_document_validates_shape() {
        let ok = Container::from_value(json!({"openapi": "3.0.0", "paths": {}}));
        assert!(Document::new(ok).is_ok());

        let bad = Container::from_value(json!({"info": "not an object"}));
        assert!(Document::new(bad).is_err());
    }
}
