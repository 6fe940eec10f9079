mod utils;

pub use utils::{Export, Exports};

use crate::container::Container;
use crate::error::Error;
use crate::pointer::Pointer;

use utils::{replace_ptr, replace_ptr_with_empty_object, update_ptr_to_local};

/// Resolves every external `$ref` in the container.
///
/// References to exported pointers are rewritten to local document fragments
/// and their resolved values installed under `components`; everything else
/// is inlined in place. Cycles terminate the descent: an exported schema on
/// the stack becomes a local reference, anything else an empty object.
///
/// `resolve` maps an external pointer to the entity value behind it.
pub fn resolve<F>(c: &Container, exports: &Exports, resolve: F) -> Result<Container, Error>
where
    F: Fn(&Pointer) -> Result<Container, Error>,
{
    let r = Resolver {
        exports,
        resolve,
    };

    let mut root = c.clone();
    let mut installs = vec![];
    r.iterate(&mut root, &mut vec![], &mut installs)?;

    for (path, value) in installs {
        root.set_p(&path, value.into_value())?;
    }

    Ok(root)
}

struct Resolver<'a, F> {
    exports: &'a Exports,
    resolve: F,
}

impl<F> Resolver<'_, F>
where
    F: Fn(&Pointer) -> Result<Container, Error>,
{
    fn iterate(
        &self,
        cx: &mut Container,
        stack: &mut Vec<String>,
        installs: &mut Vec<(String, Container)>,
    ) -> Result<(), Error> {
        for (key, val) in cx.extract_key("$ref") {
            let Some(s) = val.as_str() else {
                continue;
            };
            let p = Pointer::parse(s)?;
            if !p.is_external() {
                continue;
            }

            if stack.contains(&p.to_string()) {
                match self.exports.get(&p) {
                    Some(e) if e.is_schema() => {
                        log::debug!("{p}: cycle, rewriting to local reference");
                        update_ptr_to_local(cx, &key, e.fragment())?;
                    }
                    _ => {
                        log::debug!("{p}: cycle, cutting with empty object");
                        replace_ptr_with_empty_object(cx, &key)?;
                    }
                }
                continue;
            }

            let mut nc = (self.resolve)(&p)?;

            stack.push(p.to_string());
            self.iterate(&mut nc, stack, installs)?;
            stack.pop();

            match self.exports.get(&p) {
                Some(e) => {
                    log::debug!("{p}: exporting as {}", e.path());
                    installs.push((e.path(), nc));
                    update_ptr_to_local(cx, &key, e.fragment())?;
                }
                None => {
                    log::debug!("{p}: inlining");
                    replace_ptr(cx, &key, nc.into_value())?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Entity;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn export(ptr: &str, name: &str) -> Export {
        Export {
            pointer: Pointer::must_parse(ptr),
            entity: Entity::Schema,
            name: name.to_string(),
        }
    }

    fn table(entries: &[(&str, Value)]) -> impl Fn(&Pointer) -> Result<Container, Error> {
        let m: HashMap<String, Value> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |p: &Pointer| {
            m.get(&p.to_string())
                .map(|v| Container::from_value(v.clone()))
                .ok_or_else(|| Error::NotFound(p.to_string()))
        }
    }

    #[test]
    fn test_resolve_exported_schema() {
        let c = Container::from_value(json!({
            "paths": {"/items": {"get": {"responses": {"200": {"content": {
                "application/json": {"schema": {"$ref": "go://test#/Item"}}
            }}}}}},
        }));

        let mut exports = Exports::new();
        exports.push(export("go://test#/Item", "Item"));

        let resolved = resolve(
            &c,
            &exports,
            table(&[(
                "go://test#/Item",
                json!({"type": "object", "properties": {"A": {"type": "string"}}}),
            )]),
        )
        .unwrap();

        assert_eq!(
            resolved.path("components.schemas.Item"),
            Some(&json!({"type": "object", "properties": {"A": {"type": "string"}}}))
        );
        assert_eq!(
            resolved
                .path("paths./items.get.responses.200.content.application/json.schema.$ref"),
            Some(&json!("#/components/schemas/Item"))
        );
    }

    #[test]
    fn test_resolve_inlines_non_exported() {
        let c = Container::from_value(json!({
            "a": {"schema": {"$ref": "go://test#/Hidden"}},
        }));

        let resolved = resolve(
            &c,
            &Exports::new(),
            table(&[("go://test#/Hidden", json!({"type": "string"}))]),
        )
        .unwrap();

        assert_eq!(
            resolved.value(),
            &json!({"a": {"schema": {"type": "string"}}})
        );
    }

    #[test]
    fn test_resolve_recursive_exported() {
        // Item refers to itself through its resolved value
        let c = Container::from_value(json!({
            "a": {"$ref": "go://test#/Item"},
        }));

        let mut exports = Exports::new();
        exports.push(export("go://test#/Item", "Item"));

        let resolved = resolve(
            &c,
            &exports,
            table(&[(
                "go://test#/Item",
                json!({
                    "type": "object",
                    "properties": {"Items": {
                        "type": "array",
                        "nullable": true,
                        "items": {"$ref": "go://test#/Item"},
                    }},
                }),
            )]),
        )
        .unwrap();

        assert_eq!(
            resolved.path("components.schemas.Item"),
            Some(&json!({
                "type": "object",
                "properties": {"Items": {
                    "type": "array",
                    "nullable": true,
                    "items": {"$ref": "#/components/schemas/Item"},
                }},
            }))
        );
        assert_eq!(resolved.path("a.$ref"), Some(&json!("#/components/schemas/Item")));
    }

    #[test]
    fn test_resolve_recursive_non_exported_becomes_empty_object() {
        let c = Container::from_value(json!({
            "a": {"$ref": "go://test#/Loop"},
        }));

        let resolved = resolve(
            &c,
            &Exports::new(),
            table(&[(
                "go://test#/Loop",
                json!({"items": {"$ref": "go://test#/Loop"}}),
            )]),
        )
        .unwrap();

        assert_eq!(resolved.value(), &json!({"a": {"items": {}}}));
    }

    #[test]
    fn test_resolve_leaves_local_refs_alone() {
        let c = Container::from_value(json!({
            "a": {"$ref": "#/components/schemas/Local"},
        }));

        let resolved = resolve(&c, &Exports::new(), table(&[])).unwrap();

        assert_eq!(resolved.value(), c.value());
    }

    #[test]
    fn test_resolve_propagates_resolver_errors() {
        let c = Container::from_value(json!({
            "a": {"$ref": "wat://x#/Y"},
        }));

        let err = resolve(&c, &Exports::new(), |p: &Pointer| {
            Err(Error::UnknownScheme(p.scheme().to_string()))
        })
        .unwrap_err();

        assert!(matches!(err, Error::UnknownScheme(_)));
    }

    #[test]
    fn test_resolve_no_external_refs_left() {
        let c = Container::from_value(json!({
            "x": {"$ref": "go://test#/A"},
            "y": {"$ref": "go://test#/B"},
        }));

        let mut exports = Exports::new();
        exports.push(export("go://test#/A", "A"));

        let resolved = resolve(
            &c,
            &exports,
            table(&[
                ("go://test#/A", json!({"type": "string"})),
                ("go://test#/B", json!({"type": "integer"})),
            ]),
        )
        .unwrap();

        for (_, v) in resolved.extract_key("$ref") {
            let p = Pointer::parse(v.as_str().unwrap()).unwrap();
            assert!(!p.is_external(), "external ref left behind: {p}");
        }
    }
}
