use crate::container::{Container, Containers, MergePolicy};
use crate::error::Error;
use crate::lang::{Package, Scanner, TypeArena};
use crate::pointer::{Pointer, Pointers};

const PATTERNS: &[&str] = &["oapi.yaml", "oapi.yml", "oapi.json"];

/// Collects per-package specification fragments.
///
/// Every `oapi.{yaml,yml,json}` file next to package sources is read into a
/// container, provided it carries a top-level `openapi` key. All `$ref`
/// values are normalized: a `go` pointer without a package path is rebound
/// to the package the file lives in, and the canonical pointer string is
/// written back in place.
#[derive(Debug)]
pub struct SpecScanner {
    pub containers: Containers,
    pub pointers: Pointers,
    patterns: Vec<&'static str>,
}

impl SpecScanner {
    pub fn new() -> SpecScanner {
        SpecScanner {
            containers: Containers::new(),
            pointers: Pointers::new(),
            patterns: PATTERNS.to_vec(),
        }
    }

    /// The merged fragment document. Containers are merged in file path
    /// order so the result is reproducible across runs; any collision
    /// between fragments is an error.
    pub fn merge(&self) -> Result<Container, Error> {
        self.containers.sorted().merge(MergePolicy::Strict)
    }
}

impl Default for SpecScanner {
    fn default() -> Self {
        SpecScanner::new()
    }
}

impl Scanner for SpecScanner {
    fn scan(&mut self, pkg: &Package, _arena: &TypeArena) -> Result<(), Error> {
        let ff = Containers::read_dir(&pkg.dir, &self.patterns)?;

        for mut c in ff.iter().cloned() {
            if !c.exists_p("openapi") {
                continue;
            }

            for (key, val) in c.extract_key("$ref") {
                let Some(s) = val.as_str() else {
                    return Err(Error::RefNotString {
                        at: format!(
                            "{}:{}",
                            c.file_path().map(|p| p.display().to_string()).unwrap_or_default(),
                            key
                        ),
                    });
                };

                let mut p = Pointer::parse(s)?;

                // go://#/Ident is shorthand for the package at hand
                if p.scheme() == "go" && p.pkg_path().is_empty() {
                    let fragment = p.fragment.clone();
                    p = Pointer::new_go(&pkg.pkg_path, "")?.with_fragment(fragment);
                }

                self.pointers.insert(p.clone());
                c.set_p(&key, p.to_string())?;
            }

            log::debug!(
                "{}: collected spec fragment {:?}",
                pkg.pkg_path,
                c.file_path()
            );
            self.containers.push(c);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn fixture_pkg(sub: &str) -> Package {
        Package {
            pkg_path: "github.com/acme/api".to_string(),
            dir: PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("resources/test/specs")
                .join(sub),
            ..Package::default()
        }
    }

    fn scan(sub: &str) -> Result<SpecScanner, Error> {
        let arena = TypeArena::new();
        let mut scanner = SpecScanner::new();
        scanner.scan(&fixture_pkg(sub), &arena)?;
        Ok(scanner)
    }

    #[test]
    fn test_scan_normalizes_refs() {
        let scanner = scan("items").unwrap();

        assert_eq!(scanner.containers.len(), 1);
        assert!(scanner
            .pointers
            .contains(&Pointer::must_parse("go://github.com/acme/api#/Item")));

        let c = scanner.merge().unwrap();
        assert_eq!(
            c.path("paths./items.get.responses.200.content.application/json.schema.$ref"),
            Some(&json!("go://github.com/acme/api#/Item"))
        );
    }

    #[test]
    fn test_scan_skips_files_without_openapi_key() {
        let scanner = scan("no-openapi-key").unwrap();

        assert!(scanner.containers.is_empty());
        assert!(scanner.pointers.is_empty());
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let scanner = scan("does-not-exist").unwrap();

        assert!(scanner.containers.is_empty());
    }

    #[test]
    fn test_scan_rejects_non_string_ref() {
        assert!(matches!(
            scan("bad-ref"),
            Err(Error::RefNotString { .. })
        ));
    }

    #[test]
    fn test_scan_keeps_absolute_refs() {
        let scanner = scan("absolute").unwrap();

        assert!(scanner
            .pointers
            .contains(&Pointer::must_parse("go://github.com/acme/model#/Order")));
    }
}
