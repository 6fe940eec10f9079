use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::container::{Container, MergePolicy};
use crate::error::Error;
use crate::spec::{
    Components, ExternalDocumentation, Info, OpenAPI, Operation, Schema, SecurityRequirement,
    Server, Tag,
};

/// Generator configuration, read from a YAML or JSON file.
///
/// A config may name a parent file via `extends`; the parent is resolved
/// relative to the child and fills in whatever the child leaves unset.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path this config was read from.
    #[serde(skip)]
    pub file_path: Option<PathBuf>,

    /// Parent config file to extend.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub extends: String,

    /// Config format version.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// OpenAPI version the produced document claims.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub openapi: String,

    /// Output format, one of `json`, `yaml`, `yml`, `json:pretty`, `go`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,

    /// Directory to scan from.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dir: String,

    /// Where to write the result: `stdout`, `stderr` or a file path.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,

    /// Package paths excluded from the scan, matched exactly or as a path
    /// prefix.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Server>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<BTreeMap<String, SecurityRequirement>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,

    #[serde(rename = "externalDocs", skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocumentation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,

    /// Schema overrides keyed by pointer.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, Schema>,

    /// Operation defaults keyed by route pattern.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub operations: BTreeMap<String, Operation>,
}

impl Config {
    pub fn read_yaml(data: &[u8]) -> Result<Config, Error> {
        let cx = Container::read_yaml(data)?;
        Config::from_container(extends(cx, Path::new(""))?)
    }

    pub fn read_json(data: &[u8]) -> Result<Config, Error> {
        let cx = Container::read_json(data)?;
        Config::from_container(extends(cx, Path::new(""))?)
    }

    pub fn read_file(file: &Path) -> Result<Config, Error> {
        let cx = Container::read_file(file)?;
        let dir = file.parent().unwrap_or_else(|| Path::new(""));
        let mut c = Config::from_container(extends(cx, dir)?)?;
        c.file_path = Some(file.to_path_buf());
        Ok(c)
    }

    fn from_container(cx: Container) -> Result<Config, Error> {
        serde_json::from_value(cx.into_value()).map_err(Error::DeserializeJsonError)
    }

    /// The root document built from the configured sections.
    pub fn root(&self) -> OpenAPI {
        OpenAPI {
            openapi: self.openapi.clone(),
            info: self.info.clone(),
            servers: self.servers.clone(),
            paths: None,
            components: self.components.clone(),
            security: self.security.clone(),
            tags: self.tags.clone(),
            external_docs: self.external_docs.clone(),
        }
    }
}

fn extends(mut c: Container, dir: &Path) -> Result<Container, Error> {
    let Some(parent) = c.path("extends").and_then(|v| v.as_str()).map(String::from) else {
        return Ok(c);
    };

    let mut path = PathBuf::from(&parent);
    if path.is_relative() {
        path = dir.join(path);
    }

    let base = Container::read_file(&path)?;
    c.merge(&base, MergePolicy::Default)?;
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("resources/test/config")
            .join(name)
    }

    #[test]
    fn test_read_yaml() {
        let cfg = Config::read_yaml(
            br#"
format: json
dir: ./demo
info:
  title: Demo
  version: "1.0.0"
operations:
  "GET:/v1/*":
    summary: default summary
overrides:
  "go://time#/Time":
    type: string
    format: date-time
"#,
        )
        .unwrap();

        assert_eq!(cfg.format, "json");
        assert_eq!(cfg.dir, "./demo");
        assert_eq!(cfg.info.as_ref().unwrap().title, "Demo");
        assert_eq!(
            cfg.operations["GET:/v1/*"].summary.as_deref(),
            Some("default summary")
        );
        assert_eq!(cfg.overrides["go://time#/Time"].format, "date-time");
    }

    #[test]
    fn test_read_json() {
        let cfg = Config::read_json(br#"{"format": "yaml", "exclude": ["github.com/acme/internal"]}"#)
            .unwrap();

        assert_eq!(cfg.format, "yaml");
        assert_eq!(cfg.exclude, vec!["github.com/acme/internal"]);
    }

    #[test]
    fn test_read_file_with_extends() {
        let cfg = Config::read_file(&fixture("child.yaml")).unwrap();

        // child keeps its own format, inherits title from the parent
        assert_eq!(cfg.format, "json:pretty");
        assert_eq!(cfg.info.as_ref().unwrap().title, "Base API");
        assert_eq!(cfg.output, "stdout");
    }

    #[test]
    fn test_root_carries_configured_sections() {
        let cfg = Config::read_yaml(
            br#"
openapi: "3.0.3"
info:
  title: Demo
servers:
  - url: https://api.example.com
"#,
        )
        .unwrap();

        let root = cfg.root();
        assert_eq!(root.openapi, "3.0.3");
        assert_eq!(root.servers.as_ref().unwrap()[0].url, "https://api.example.com");
        assert!(root.paths.is_none());
    }
}
