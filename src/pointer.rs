use std::collections::BTreeMap;
use std::fmt;

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::error::Error;

const SEPARATOR: &str = "/";
const ESCAPED_SEPARATOR: &str = "~1";
const TILDE: &str = "~";
const ESCAPED_TILDE: &str = "~0";

/// Ordered sequence of reference tokens, the part of a pointer after `#`.
///
/// Tokens are kept unescaped; escaping (`~` -> `~0`, `/` -> `~1`) is applied
/// when formatting and removed when parsing, following rfc6901.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Fragment(Vec<String>);

impl Fragment {
    pub fn parse(str: &str) -> Result<Fragment, Error> {
        if str.is_empty() {
            return Ok(Fragment(vec![]));
        }

        let rest = str.strip_prefix(SEPARATOR).ok_or(Error::InvalidFragment)?;

        Ok(Fragment(
            rest.split(SEPARATOR).map(unescape_token).collect(),
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the root token of the fragment.
    pub fn head(&self) -> Option<&str> {
        self.0.first().map(|s| s.as_str())
    }

    /// Returns everything after the fragment head.
    pub fn tail(&self) -> Fragment {
        Fragment(self.0.get(1..).unwrap_or(&[]).to_vec())
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(|s| s.as_str())
    }

    /// Replaces the token at the given position.
    pub fn replace(&self, n: usize, token: &str) -> Result<Fragment, Error> {
        if n >= self.0.len() {
            return Err(Error::FragmentIndex(n));
        }
        let mut x = self.clone();
        x.0[n] = token.to_string();
        Ok(x)
    }

    /// Returns a new fragment addressing a descendant of the current one,
    /// parsing the input path into components.
    pub fn descendant(&self, path: &str) -> Result<Fragment, Error> {
        let path = if path.starts_with(SEPARATOR) {
            path.to_string()
        } else {
            format!("{SEPARATOR}{path}")
        };
        let dpath = Fragment::parse(&path)?;

        if self.to_string() == SEPARATOR {
            return Ok(dpath);
        }

        let mut x = self.clone();
        x.0.extend(dpath.0);
        Ok(x)
    }

    /// Extends the fragment with already-parsed tokens. Unlike
    /// [`Fragment::descendant`] the tokens are taken verbatim, which makes
    /// this suitable for tight loops where the caller controls the input.
    pub fn raw_descendant<I, S>(&self, tokens: I) -> Fragment
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut x = self.clone();
        x.0.extend(tokens.into_iter().map(Into::into));
        x
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tok in &self.0 {
            write!(f, "{}{}", SEPARATOR, escape_token(tok))?;
        }
        Ok(())
    }
}

fn unescape_token(tok: &str) -> String {
    tok.replace(ESCAPED_SEPARATOR, SEPARATOR)
        .replace(ESCAPED_TILDE, TILDE)
}

fn escape_token(tok: &str) -> String {
    tok.replace(TILDE, ESCAPED_TILDE)
        .replace(SEPARATOR, ESCAPED_SEPARATOR)
}

/// A parsed pointer: an optional URI part addressing a package or file, plus
/// a [`Fragment`] addressing into it.
///
/// `go://github.com/acme/api#/Order/Items` addresses the `Items` field of the
/// `Order` type in package `github.com/acme/api`. A pointer without a scheme
/// is local to the document it appears in.
#[derive(Clone, Debug, Default)]
pub struct Pointer {
    scheme: String,
    host: String,
    path: String,
    pub fragment: Fragment,
}

impl Pointer {
    /// Parses `str` into a pointer. `str` may be a full URI, a bare fragment
    /// beginning with `#`, or empty. Empty input and `"#"` both produce the
    /// zero pointer.
    pub fn parse(str: &str) -> Result<Pointer, Error> {
        if str.is_empty() || str == "#" {
            return Ok(Pointer::default());
        }

        let (head, frag) = match str.split_once('#') {
            Some((h, f)) => (h, f),
            None => (str, ""),
        };

        let mut p = Pointer {
            fragment: Fragment::parse(frag)?,
            ..Pointer::default()
        };

        if head.is_empty() {
            return Ok(p);
        }

        if let Some(scheme) = head.strip_suffix("://") {
            // bare authority, e.g. `go://#/Ident` addressing the current package
            if scheme.is_empty() {
                return Err(Error::PointerParse(
                    str.to_string(),
                    url::ParseError::RelativeUrlWithoutBase,
                ));
            }
            p.scheme = scheme.to_string();
        } else if head.contains("://") {
            let u = Url::parse(head).map_err(|err| Error::PointerParse(str.to_string(), err))?;
            p.scheme = u.scheme().to_string();
            p.host = u.host_str().unwrap_or_default().to_string();
            p.path = u.path().to_string();
        } else {
            p.path = head.to_string();
        }

        Ok(p)
    }

    /// Panicking variant of [`Pointer::parse`], for statically known input.
    pub fn must_parse(str: &str) -> Pointer {
        Pointer::parse(str).unwrap()
    }

    /// Builds a go-scheme pointer addressing `path` inside package `pkg`.
    pub fn new_go(pkg: &str, path: &str) -> Result<Pointer, Error> {
        Pointer::parse(&format!("go://{pkg}#/{path}"))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Package path addressed by the URI part, host and path joined.
    pub fn pkg_path(&self) -> String {
        format!("{}{}", self.host, self.path)
    }

    /// A pointer is external when it carries a scheme and therefore requires
    /// resolution before it can appear in the output document.
    pub fn is_external(&self) -> bool {
        !self.scheme.is_empty()
    }

    pub fn with_fragment(mut self, fragment: Fragment) -> Pointer {
        self.fragment = fragment;
        self
    }

    /// Pointer made of a fragment only, addressing into the local document.
    pub fn local(fragment: Fragment) -> Pointer {
        Pointer {
            fragment,
            ..Pointer::default()
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scheme.is_empty() {
            write!(f, "{}#{}", self.path, self.fragment)
        } else {
            write!(
                f,
                "{}://{}{}#{}",
                self.scheme, self.host, self.path, self.fragment
            )
        }
    }
}

impl PartialEq for Pointer {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Pointer {}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pointer::parse(&s).map_err(de::Error::custom)
    }
}

/// Set of pointers keyed by their canonical string form. The key order is
/// stable which keeps every scan pass over the set deterministic.
#[derive(Clone, Debug, Default)]
pub struct Pointers(BTreeMap<String, Pointer>);

impl Pointers {
    pub fn new() -> Pointers {
        Pointers::default()
    }

    pub fn insert(&mut self, p: Pointer) {
        self.0.insert(p.to_string(), p);
    }

    pub fn contains(&self, p: &Pointer) -> bool {
        self.0.contains_key(&p.to_string())
    }

    pub fn merge(&self, other: &Pointers) -> Pointers {
        let mut x = self.clone();
        for (k, v) in &other.0 {
            x.0.insert(k.clone(), v.clone());
        }
        x
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pointer> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Pointer> for Pointers {
    fn from_iter<T: IntoIterator<Item = Pointer>>(iter: T) -> Self {
        let mut x = Pointers::new();
        for p in iter {
            x.insert(p);
        }
        x
    }
}
