use std::fmt;

use crate::pointer::Fragment;

/// Kind of an OpenAPI component. Every kind knows the components section it
/// lives in and the default path to that section.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    Reference,
    Schema,
    Response,
    Parameter,
    Example,
    RequestBody,
    Header,
    SecurityScheme,
    Link,
    Callback,
    PathItem,
}

impl Entity {
    /// Top-level key of the components section for this kind.
    pub fn key(&self) -> &'static str {
        match self {
            Entity::Schema => "schemas",
            Entity::Response => "responses",
            Entity::Parameter => "parameters",
            Entity::Example => "examples",
            Entity::RequestBody => "requestBodies",
            Entity::Header => "headers",
            Entity::SecurityScheme => "securitySchemes",
            Entity::Link => "links",
            Entity::Callback => "callbacks",
            Entity::PathItem => "paths",
            Entity::Reference => "*",
        }
    }

    /// Dot path of the components section.
    pub fn path(&self) -> String {
        format!("components.{}", self.key())
    }

    /// Fragment of the components section.
    pub fn fragment(&self) -> Fragment {
        Fragment::parse(&format!("/components/{}", self.key())).unwrap()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
