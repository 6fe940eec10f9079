use serde_json::{Map, Value};

use crate::container::{slice_to_dot_path, Container};
use crate::error::Error;
use crate::pointer::{Fragment, Pointer};
use crate::spec::Entity;

/// A named export target: the entity kind decides the components section,
/// the name the key inside it.
#[derive(Clone, Debug, PartialEq)]
pub struct Export {
    pub pointer: Pointer,
    pub entity: Entity,
    pub name: String,
}

impl Export {
    /// Dot path of the export inside the document.
    pub fn path(&self) -> String {
        slice_to_dot_path(["components", self.entity.key(), self.name.as_str()])
    }

    /// Local fragment of the export.
    pub fn fragment(&self) -> Fragment {
        self.entity.fragment().raw_descendant([self.name.as_str()])
    }

    pub fn is_schema(&self) -> bool {
        self.entity == Entity::Schema
    }
}

/// The set of exports harvested from source directives.
#[derive(Clone, Debug, Default)]
pub struct Exports(Vec<Export>);

impl Exports {
    pub fn new() -> Exports {
        Exports::default()
    }

    pub fn push(&mut self, e: Export) {
        self.0.push(e);
    }

    pub fn get(&self, p: &Pointer) -> Option<&Export> {
        self.0.iter().find(|e| e.pointer == *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Export> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Strips a trailing `$ref` segment from a dot path, returning the path of
/// the object wrapping the reference.
pub(crate) fn ref_parent(key: &str) -> Option<String> {
    let (parent, last) = match key.rsplit_once('.') {
        Some((parent, last)) => (parent, last),
        None => ("", key),
    };
    (last == "$ref").then(|| parent.to_string())
}

/// Replaces the whole `{.., $ref: ..}` object with the given value.
pub(crate) fn replace_ptr<T: serde::Serialize>(
    cx: &mut Container,
    key: &str,
    value: T,
) -> Result<(), Error> {
    let path = ref_parent(key).ok_or_else(|| Error::TypeMismatch {
        path: key.to_string(),
        expected: "$ref".to_string(),
    })?;
    cx.set_p(&path, value)
}

/// Replaces the reference object with an empty object; used to cut
/// unresolvable cycles.
pub(crate) fn replace_ptr_with_empty_object(cx: &mut Container, key: &str) -> Result<(), Error> {
    replace_ptr(cx, key, Value::Object(Map::new()))
}

/// Writes a new pointer string into an existing `$ref` location.
pub(crate) fn update_ptr(cx: &mut Container, key: &str, pp: &Pointer) -> Result<(), Error> {
    ref_parent(key).ok_or_else(|| Error::TypeMismatch {
        path: key.to_string(),
        expected: "$ref".to_string(),
    })?;
    cx.set_p(key, pp.to_string())
}

/// Rewrites a `$ref` to a fragment of the local document.
pub(crate) fn update_ptr_to_local(
    cx: &mut Container,
    key: &str,
    fragment: Fragment,
) -> Result<(), Error> {
    update_ptr(cx, key, &Pointer::local(fragment))
}
