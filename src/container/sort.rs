use serde_json::{Map, Value};

use crate::container::Container;
use crate::error::Error;

/// Marshals a container with a fixed order for the top-level keys.
///
/// Keys present in the order list are emitted first, in list order; the rest
/// follow in the order they already have in the document. Nested objects are
/// left untouched.
pub struct Sorter {
    order: Vec<String>,
}

impl Sorter {
    pub fn new<I, S>(order: I) -> Sorter
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Sorter {
            order: order.into_iter().map(Into::into).collect(),
        }
    }

    pub fn marshal_json(&self, c: &Container) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(&self.reorder(c.value())).map_err(Error::SerdeJsonError)
    }

    pub fn marshal_json_pretty(&self, c: &Container) -> Result<Vec<u8>, Error> {
        serde_json::to_vec_pretty(&self.reorder(c.value())).map_err(Error::SerdeJsonError)
    }

    pub fn marshal_yaml(&self, c: &Container) -> Result<Vec<u8>, Error> {
        let s = serde_yaml::to_string(&self.reorder(c.value())).map_err(Error::SerializeYamlError)?;
        Ok(s.into_bytes())
    }

    fn reorder(&self, data: &Value) -> Value {
        let Value::Object(map) = data else {
            return data.clone();
        };

        let mut items: Vec<(usize, &String, &Value)> = map
            .iter()
            .map(|(k, v)| (self.index_of(k), k, v))
            .collect();
        items.sort_by_key(|(rank, _, _)| *rank);

        let mut sorted = Map::new();
        for (_, k, v) in items {
            sorted.insert(k.clone(), v.clone());
        }
        Value::Object(sorted)
    }

    fn index_of(&self, key: &str) -> usize {
        self.order
            .iter()
            .position(|k| k == key)
            .unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort() {
        let c = Container::from_value(json!({"a": 1, "b": 1}));

        let sorter = Sorter::new(["a", "b"]);
        assert_eq!(sorter.marshal_json(&c).unwrap(), br#"{"a":1,"b":1}"#);
        assert_eq!(sorter.marshal_yaml(&c).unwrap(), b"a: 1\nb: 1\n");

        let sorter = Sorter::new(["b", "a"]);
        assert_eq!(sorter.marshal_json(&c).unwrap(), br#"{"b":1,"a":1}"#);
        assert_eq!(sorter.marshal_yaml(&c).unwrap(), b"b: 1\na: 1\n");
    }

    #[test]
    fn test_sort_unlisted_keys_keep_document_order() {
        let c = Container::from_value(json!({"z": 1, "paths": {}, "openapi": "3.0.0", "x": 2}));

        let sorter = Sorter::new(["openapi", "paths"]);
        assert_eq!(
            sorter.marshal_json(&c).unwrap(),
            br#"{"openapi":"3.0.0","paths":{},"z":1,"x":2}"#
        );
    }

    #[test]
    fn test_sort_is_stable_across_runs() {
        let c = Container::from_value(json!({"b": 1, "a": 2, "c": 3}));
        let sorter = Sorter::new(["c"]);

        let first = sorter.marshal_json(&c).unwrap();
        for _ in 0..10 {
            assert_eq!(sorter.marshal_json(&c).unwrap(), first);
        }
        assert_eq!(first, br#"{"c":3,"b":1,"a":2}"#.to_vec());
    }
}
