use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Error;
use crate::lang::{TypeArena, TypeId};

/// One package of the scanned program, as handed over by the front end.
#[derive(Clone, Debug, Default)]
pub struct Package {
    /// Import path, e.g. `github.com/acme/api`.
    pub pkg_path: String,
    /// Directory holding the package sources; per-package fragment files are
    /// looked up here.
    pub dir: PathBuf,
    /// Standard library packages are not scanned.
    pub std: bool,
    /// Import paths of direct dependencies.
    pub imports: Vec<String>,
    /// Raw comment lines of the package, comment markers included.
    pub comments: Vec<String>,
    /// Top-level identifiers and their named types.
    pub scope: BTreeMap<String, TypeId>,
}

/// Everything the front end produces for one load: the interned type arena
/// and the package graph.
#[derive(Debug, Default)]
pub struct Loaded {
    pub arena: TypeArena,
    pub packages: Vec<Package>,
}

/// Cancellation flag threaded through the entry point. Only the loader is
/// expected to poll it; a cancelled load surfaces as [`Error::Cancelled`] and
/// unwinds naturally.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The language front end. Loading, parsing and type-checking packages is
/// its business; the scan only consumes the result.
pub trait Loader {
    fn load(&self, dir: &Path, cancel: &CancelToken) -> Result<Loaded, Error>;
}

/// A scanner visits packages and populates its own index.
pub trait Scanner {
    fn scan(&mut self, pkg: &Package, arena: &TypeArena) -> Result<(), Error>;
}

/// Visits all packages in the import graph, dependencies first, with imports
/// in sorted order so the visit is stable across runs. Standard library
/// packages are skipped. Per-package failures are collected and reported as
/// one aggregate error.
pub fn visit(loaded: &Loaded, scanner: &mut dyn Scanner) -> Result<(), Error> {
    let by_path: HashMap<&str, &Package> = loaded
        .packages
        .iter()
        .map(|p| (p.pkg_path.as_str(), p))
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut errs: Vec<String> = vec![];

    fn walk<'a>(
        pkg: &'a Package,
        by_path: &HashMap<&str, &'a Package>,
        seen: &mut HashSet<&'a str>,
        errs: &mut Vec<String>,
        arena: &TypeArena,
        scanner: &mut dyn Scanner,
    ) {
        if pkg.std || !seen.insert(pkg.pkg_path.as_str()) {
            return;
        }

        let mut imports = pkg.imports.clone();
        imports.sort();
        for path in &imports {
            if let Some(dep) = by_path.get(path.as_str()) {
                walk(dep, by_path, seen, errs, arena, scanner);
            }
        }

        if let Err(err) = scanner.scan(pkg, arena) {
            errs.push(format!("\t- {err}"));
        }
    }

    for pkg in &loaded.packages {
        walk(pkg, &by_path, &mut seen, &mut errs, &loaded.arena, scanner);
    }

    if !errs.is_empty() {
        return Err(Error::ScanFailed(errs.join("\n")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        order: Vec<String>,
        fail_on: Option<String>,
    }

    impl Scanner for Recorder {
        fn scan(&mut self, pkg: &Package, _arena: &TypeArena) -> Result<(), Error> {
            if self.fail_on.as_deref() == Some(pkg.pkg_path.as_str()) {
                return Err(Error::NotFound(pkg.pkg_path.clone()));
            }
            self.order.push(pkg.pkg_path.clone());
            Ok(())
        }
    }

    fn pkg(path: &str, imports: &[&str]) -> Package {
        Package {
            pkg_path: path.to_string(),
            imports: imports.iter().map(|s| s.to_string()).collect(),
            ..Package::default()
        }
    }

    #[test]
    fn test_visit_dependencies_first() {
        let loaded = Loaded {
            arena: TypeArena::new(),
            packages: vec![
                pkg("root", &["z/dep", "a/dep"]),
                pkg("z/dep", &[]),
                pkg("a/dep", &[]),
            ],
        };

        let mut rec = Recorder {
            order: vec![],
            fail_on: None,
        };
        visit(&loaded, &mut rec).unwrap();

        assert_eq!(rec.order, vec!["a/dep", "z/dep", "root"]);
    }

    #[test]
    fn test_visit_skips_std_and_unknown_imports() {
        let mut std_pkg = pkg("fmt", &[]);
        std_pkg.std = true;

        let loaded = Loaded {
            arena: TypeArena::new(),
            packages: vec![pkg("root", &["fmt", "not/loaded"]), std_pkg],
        };

        let mut rec = Recorder {
            order: vec![],
            fail_on: None,
        };
        visit(&loaded, &mut rec).unwrap();

        assert_eq!(rec.order, vec!["root"]);
    }

    #[test]
    fn test_visit_aggregates_errors() {
        let loaded = Loaded {
            arena: TypeArena::new(),
            packages: vec![pkg("a", &[]), pkg("b", &[])],
        };

        let mut rec = Recorder {
            order: vec![],
            fail_on: Some("a".to_string()),
        };
        let err = visit(&loaded, &mut rec).unwrap_err();

        assert!(err.to_string().contains("Failed to resolve a"));
        assert_eq!(rec.order, vec!["b"]);
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
