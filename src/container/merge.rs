use serde_json::{Map, Value};

use crate::container::Container;
use crate::error::Error;

/// Collision policy applied when a merge finds a value on both sides that
/// cannot be merged structurally (anything but object/object).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergePolicy {
    /// Any collision is an error, even between equal values.
    Strict,
    /// The destination value is kept.
    Default,
    /// The source value wins.
    Override,
}

impl MergePolicy {
    fn resolve(&self, dest: &Value, source: &Value, at: &str) -> Result<Value, Error> {
        match self {
            MergePolicy::Strict => Err(Error::MergeCollision {
                destination: dest.to_string(),
                conflicting: source.to_string(),
                at: at.to_string(),
            }),
            MergePolicy::Default => Ok(dest.clone()),
            MergePolicy::Override => Ok(source.clone()),
        }
    }
}

impl Container {
    /// Recursively merges `source` into this container.
    ///
    /// Keys missing on this side are copied from the source, object/object
    /// positions recurse, and any other overlap is resolved by the policy.
    /// The source is never aliased: values are cloned on the way in.
    pub fn merge(&mut self, source: &Container, policy: MergePolicy) -> Result<(), Error> {
        let at = source
            .file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let Value::Object(src) = source.value() else {
            return Ok(());
        };
        let src = src.clone();

        let mut body = std::mem::take(self.value_mut());
        if body.is_null() {
            body = Value::Object(Map::new());
        }
        let result = match body {
            Value::Object(ref mut dest) => merge_map(dest, src, policy, &at),
            _ => Ok(()),
        };
        *self.value_mut() = body;
        result
    }
}

fn merge_map(
    dest: &mut Map<String, Value>,
    src: Map<String, Value>,
    policy: MergePolicy,
    at: &str,
) -> Result<(), Error> {
    for (key, value) in src {
        match dest.get_mut(&key) {
            None => {
                dest.insert(key, value);
            }
            Some(existing) => match (existing, value) {
                (Value::Object(dm), Value::Object(sm)) => merge_map(dm, sm, policy, at)?,
                (existing, value) => {
                    *existing = policy.resolve(existing, &value, at)?;
                }
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge() {
        let mut c1 = Container::from_value(json!({"a": 1}));
        let c2 = Container::from_value(json!({"b": 1, "c": {"d": 1}}));

        c1.merge(&c2, MergePolicy::Strict).unwrap();

        assert_eq!(c1.path("a"), Some(&json!(1)));
        assert_eq!(c1.path("b"), Some(&json!(1)));
        assert_eq!(c1.path("c.d"), Some(&json!(1)));
    }

    #[test]
    fn test_merge_does_not_alias_source() {
        let mut c1 = Container::from_value(json!({"a": 1}));
        let mut c2 = Container::from_value(json!({"b": 1, "c": {"d": 1}}));

        c1.merge(&c2, MergePolicy::Strict).unwrap();

        c2.set_p("b", json!(2)).unwrap();
        c2.set_p("c.d", json!(2)).unwrap();

        assert_eq!(c1.path("b"), Some(&json!(1)));
        assert_eq!(c1.path("c.d"), Some(&json!(1)));
    }

    #[test]
    fn test_merge_strict() {
        let mut c1 = Container::from_value(json!({"a": 1}));
        let c2 = Container::from_value(json!({"a": 1}));

        assert!(c1.merge(&c2, MergePolicy::Strict).is_err());
    }

    #[test]
    fn test_merge_default() {
        let mut c1 = Container::from_value(json!({"a": 1}));
        let c2 = Container::from_value(json!({"a": 2}));

        c1.merge(&c2, MergePolicy::Default).unwrap();

        assert_eq!(c1.path("a"), Some(&json!(1)));
        assert_eq!(c2.path("a"), Some(&json!(2)));
    }

    #[test]
    fn test_merge_override() {
        let mut c1 = Container::from_value(json!({"a": 1}));
        let c2 = Container::from_value(json!({"a": 2}));

        c1.merge(&c2, MergePolicy::Override).unwrap();

        assert_eq!(c1.path("a"), Some(&json!(2)));
        assert_eq!(c2.path("a"), Some(&json!(2)));
    }

    #[test]
    fn test_merge_override_keeps_all_keys() {
        let mut c1 = Container::from_value(json!({"a": 1, "shared": 1}));
        let c2 = Container::from_value(json!({"b": 2, "shared": 2}));

        c1.merge(&c2, MergePolicy::Override).unwrap();

        assert_eq!(
            c1.value(),
            &json!({"a": 1, "shared": 2, "b": 2})
        );
    }

    #[test]
    fn test_merge_scalar_object_collision() {
        let mut c1 = Container::from_value(json!({"a": 1}));
        let c2 = Container::from_value(json!({"a": {"b": 2}}));

        assert!(c1.merge(&c2, MergePolicy::Strict).is_err());

        let mut c3 = Container::from_value(json!({"a": 1}));
        c3.merge(&c2, MergePolicy::Override).unwrap();
        assert_eq!(c3.path("a.b"), Some(&json!(2)));
    }
}
