pub mod merge;
pub mod sort;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;

pub use merge::MergePolicy;
pub use sort::Sorter;

/// A JSON-like document tree addressable by dot paths.
///
/// Leaves are scalars, interior nodes are ordered-key objects or sequences
/// (key order is preserved by `serde_json`'s `preserve_order` feature). A `.`
/// inside a key is encoded as `~1` and `~` as `~0` when the key appears in a
/// dot path.
#[derive(Clone, Debug, Default)]
pub struct Container {
    body: Value,
    file: Option<PathBuf>,
}

impl Container {
    /// An empty container holding no value at all.
    pub fn zero() -> Container {
        Container::default()
    }

    /// A container holding an empty object.
    pub fn new() -> Container {
        Container {
            body: Value::Object(Map::new()),
            file: None,
        }
    }

    pub fn from_value(body: Value) -> Container {
        Container { body, file: None }
    }

    /// Builds a container from any serializable value. The value is encoded
    /// into a fresh tree, so the result shares no data with the input.
    pub fn make<T: Serialize>(v: &T) -> Result<Container, Error> {
        let body = serde_json::to_value(v).map_err(Error::SerdeJsonError)?;
        Ok(Container { body, file: None })
    }

    pub fn read_json(data: &[u8]) -> Result<Container, Error> {
        let body: Value = serde_json::from_slice(data).map_err(Error::DeserializeJsonError)?;
        if !body.is_object() {
            return Err(Error::DocumentNotObject(abbrev(&body)));
        }
        Ok(Container { body, file: None })
    }

    pub fn read_yaml(data: &[u8]) -> Result<Container, Error> {
        let raw: serde_yaml::Value =
            serde_yaml::from_slice(data).map_err(Error::DeserializeYamlError)?;
        let body = yaml_to_json(raw);
        if !body.is_object() {
            return Err(Error::DocumentNotObject(abbrev(&body)));
        }
        Ok(Container { body, file: None })
    }

    /// Reads a container from a YAML or JSON file, remembering the
    /// originating path. The path is what makes merge ordering of many
    /// containers reproducible.
    pub fn read_file(file: &Path) -> Result<Container, Error> {
        let data = fs::read(file).map_err(|source| Error::ReadFile {
            path: file.display().to_string(),
            source,
        })?;
        let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
        let mut c = match ext {
            "yaml" | "yml" => Container::read_yaml(&data),
            "json" => Container::read_json(&data),
            _ => Err(Error::UnknownExtension(ext.to_string())),
        }?;
        c.file = Some(file.to_path_buf());
        Ok(c)
    }

    pub fn value(&self) -> &Value {
        &self.body
    }

    pub(crate) fn value_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    pub fn into_value(self) -> Value {
        self.body
    }

    pub fn is_nil(&self) -> bool {
        self.body.is_null()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn exists_p(&self, path: &str) -> bool {
        self.path(path).is_some()
    }

    /// Returns the value at the given dot path, `None` when any component of
    /// the path is missing.
    pub fn path(&self, path: &str) -> Option<&Value> {
        let mut node = &self.body;
        for tok in split_dot_path(path) {
            node = match node {
                Value::Object(map) => map.get(&tok)?,
                Value::Array(arr) => arr.get(tok.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Children of an object node as `(key, container)` pairs in key order.
    /// Empty for a nil container, an error for any other node kind.
    pub fn children_map(&self) -> Result<Vec<(String, Container)>, Error> {
        match &self.body {
            Value::Object(map) => Ok(map
                .iter()
                .map(|(k, v)| {
                    (
                        k.clone(),
                        Container {
                            body: v.clone(),
                            file: self.file.clone(),
                        },
                    )
                })
                .collect()),
            Value::Null => Ok(vec![]),
            _ => Err(Error::TypeMismatch {
                path: String::new(),
                expected: "object".to_string(),
            }),
        }
    }

    /// Sets a value at the given dot path, creating intermediate objects on
    /// demand. Existing arrays are indexed by numeric tokens; addressing
    /// through a scalar is an error.
    pub fn set_p<T: Serialize>(&mut self, path: &str, value: T) -> Result<(), Error> {
        let val = serde_json::to_value(value).map_err(Error::SerdeJsonError)?;
        let tokens = split_dot_path(path);
        if tokens.is_empty() {
            self.body = val;
            return Ok(());
        }
        if self.body.is_null() {
            self.body = Value::Object(Map::new());
        }
        set_value(&mut self.body, &tokens, val, path)
    }

    /// Dot path to scalar value for every scalar leaf, in traversal order.
    pub fn flatten(&self) -> Vec<(String, Value)> {
        let mut out = vec![];
        flatten_value(&self.body, String::new(), &mut out);
        out
    }

    /// Scalar leaves whose last path segment equals `key`.
    pub fn extract_key(&self, key: &str) -> Vec<(String, Value)> {
        let escaped = escape_key(key);
        self.flatten()
            .into_iter()
            .filter(|(path, _)| path.rsplit('.').next() == Some(escaped.as_str()))
            .collect()
    }

    pub fn marshal_json(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(&self.body).map_err(Error::SerdeJsonError)
    }

    pub fn marshal_json_pretty(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec_pretty(&self.body).map_err(Error::SerdeJsonError)
    }

    pub fn marshal_yaml(&self) -> Result<Vec<u8>, Error> {
        let s = serde_yaml::to_string(&self.body).map_err(Error::SerializeYamlError)?;
        Ok(s.into_bytes())
    }
}

fn set_value(node: &mut Value, tokens: &[String], val: Value, full: &str) -> Result<(), Error> {
    let (tok, rest) = tokens.split_first().expect("tokens never empty here");
    match node {
        Value::Object(map) => {
            if rest.is_empty() {
                map.insert(tok.clone(), val);
                return Ok(());
            }
            let child = map
                .entry(tok.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if child.is_null() {
                *child = Value::Object(Map::new());
            }
            set_value(child, rest, val, full)
        }
        Value::Array(arr) => {
            let idx = tok.parse::<usize>().map_err(|_| Error::TypeMismatch {
                path: full.to_string(),
                expected: "array index".to_string(),
            })?;
            let child = arr.get_mut(idx).ok_or_else(|| Error::TypeMismatch {
                path: full.to_string(),
                expected: format!("array of at least {} elements", idx + 1),
            })?;
            if rest.is_empty() {
                *child = val;
                return Ok(());
            }
            if child.is_null() {
                *child = Value::Object(Map::new());
            }
            set_value(child, rest, val, full)
        }
        _ => Err(Error::TypeMismatch {
            path: full.to_string(),
            expected: "object or array".to_string(),
        }),
    }
}

fn flatten_value(v: &Value, prefix: String, out: &mut Vec<(String, Value)>) {
    match v {
        Value::Object(map) => {
            for (k, child) in map {
                flatten_value(child, join_dot_path(&prefix, &escape_key(k)), out);
            }
        }
        Value::Array(arr) => {
            for (i, child) in arr.iter().enumerate() {
                flatten_value(child, join_dot_path(&prefix, &i.to_string()), out);
            }
        }
        _ => out.push((prefix, v.clone())),
    }
}

/// Splits a dot path into unescaped key tokens.
pub fn split_dot_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return vec![];
    }
    path.split('.').map(unescape_key).collect()
}

/// Joins raw keys into a dot path, escaping each of them.
pub fn slice_to_dot_path<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|p| escape_key(p.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}

fn join_dot_path(prefix: &str, token: &str) -> String {
    if prefix.is_empty() {
        token.to_string()
    } else {
        format!("{prefix}.{token}")
    }
}

fn escape_key(key: &str) -> String {
    key.replace('~', "~0").replace('.', "~1")
}

fn unescape_key(key: &str) -> String {
    key.replace("~1", ".").replace("~0", "~")
}

/// Converts a YAML tree into a JSON tree, stringifying non-string map keys
/// using their display form.
fn yaml_to_json(v: serde_yaml::Value) -> Value {
    match v {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().and_then(serde_json::Number::from_f64).map_or(Value::Null, Value::Number)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (k, v) in mapping {
                map.insert(yaml_key_to_string(k), yaml_to_json(v));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key_to_string(k: serde_yaml::Value) -> String {
    match k {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}

fn abbrev(v: &Value) -> String {
    let mut s = v.to_string();
    if s.len() > 64 {
        s.truncate(64);
        s.push_str("...");
    }
    s
}

/// An ordered collection of containers waiting to be merged into one.
#[derive(Clone, Debug, Default)]
pub struct Containers(Vec<Container>);

impl Containers {
    pub fn new() -> Containers {
        Containers::default()
    }

    pub fn push(&mut self, c: Container) {
        self.0.push(c);
    }

    pub fn append(&mut self, other: Containers) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Container> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads every file in `dir` whose name equals one of `patterns`,
    /// in pattern order. A missing directory yields no containers.
    pub fn read_dir(dir: &Path, patterns: &[&str]) -> Result<Containers, Error> {
        let mut cc = Containers::new();
        if !dir.is_dir() {
            return Ok(cc);
        }

        let mut files = vec![];
        for entry in walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| Error::ReadDir {
                path: dir.display().to_string(),
                source: err.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, "walkdir error")
                }),
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        for pattern in patterns {
            for file in files
                .iter()
                .filter(|f| f.file_name().and_then(|n| n.to_str()) == Some(*pattern))
            {
                cc.push(Container::read_file(file)?);
            }
        }

        Ok(cc)
    }

    /// Returns the containers sorted by originating file path, files without
    /// a path first. This is what keeps the merged output reproducible.
    pub fn sorted(&self) -> Containers {
        let mut a = self.0.clone();
        a.sort_by(|x, y| x.file.cmp(&y.file));
        Containers(a)
    }

    /// Merges all containers into a single one using the given policy.
    pub fn merge(&self, policy: MergePolicy) -> Result<Container, Error> {
        let mut c = Container::new();
        for x in &self.0 {
            c.merge(x, policy)?;
        }
        Ok(c)
    }
}
