pub mod cmds;
pub mod specs;
pub mod types;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::Config;
use crate::container::Container;
use crate::document::{self, Document};
use crate::error::Error;
use crate::lang::{self, CancelToken, Loader};
use crate::pointer::Pointer;
use crate::resolver;
use crate::spec::{OpenAPI, Operation, Schema};

/// Options of a scan.
#[derive(Debug, Default)]
pub struct ScanOptions {
    /// Directory handed to the loader; the working directory when unset.
    pub dir: Option<PathBuf>,
    /// Root document merged over the collected fragments.
    pub root: OpenAPI,
    /// Schema overrides keyed by canonical pointer string, consulted before
    /// any type resolution.
    pub overrides: BTreeMap<String, Schema>,
    /// Operation defaults keyed by route pattern.
    pub operations: BTreeMap<String, Operation>,
    /// Package paths excluded from the scan.
    pub exclude: Vec<String>,
    pub cancel: CancelToken,
}

impl ScanOptions {
    pub fn new() -> ScanOptions {
        ScanOptions::default()
    }

    pub fn with_dir(&mut self, dir: PathBuf) -> &mut Self {
        self.dir = Some(dir);
        self
    }

    pub fn with_root(&mut self, root: OpenAPI) -> &mut Self {
        self.root = root;
        self
    }

    pub fn with_override(&mut self, ptr: Pointer, schema: Schema) -> &mut Self {
        self.overrides.insert(ptr.to_string(), schema);
        self
    }

    pub fn with_operations(&mut self, operations: BTreeMap<String, Operation>) -> &mut Self {
        self.operations = operations;
        self
    }

    pub fn with_exclude(&mut self, exclude: Vec<String>) -> &mut Self {
        self.exclude = exclude;
        self
    }

    pub fn with_cancel(&mut self, cancel: CancelToken) -> &mut Self {
        self.cancel = cancel;
        self
    }

    /// Options derived from a configuration object. Override pointers are
    /// parsed so lookups later use their canonical string form.
    pub fn from_config(cfg: &Config) -> Result<ScanOptions, Error> {
        let mut opts = ScanOptions::new();
        if !cfg.dir.is_empty() {
            opts.dir = Some(PathBuf::from(&cfg.dir));
        }
        opts.root = cfg.root();
        opts.exclude = cfg.exclude.clone();
        opts.operations = cfg.operations.clone();
        for (ptr, schema) in &cfg.overrides {
            opts.overrides
                .insert(Pointer::parse(ptr)?.to_string(), schema.clone());
        }
        Ok(opts)
    }
}

/// Runs the whole pipeline: loads packages, harvests directives, fragments
/// and types, merges the root, resolves every external reference and layers
/// operation defaults. The result is ready for [`crate::format::format`].
pub fn scan(loader: &dyn Loader, opts: &ScanOptions) -> Result<Document, Error> {
    let dir = match &opts.dir {
        Some(d) => d.clone(),
        None => std::env::current_dir().map_err(Error::WorkingDir)?,
    };

    let mut loaded = loader.load(&dir, &opts.cancel)?;
    if !opts.exclude.is_empty() {
        loaded
            .packages
            .retain(|p| !excluded(&opts.exclude, &p.pkg_path));
    }

    // directives first, they carry the exports
    let mut cmd_scanner = cmds::CmdScanner::new();
    lang::visit(&loaded, &mut cmd_scanner)?;
    let exports = cmd_scanner.exported_components()?;

    // per-package spec fragments
    let mut spec_scanner = specs::SpecScanner::new();
    lang::visit(&loaded, &mut spec_scanner)?;
    let mut c = spec_scanner.merge()?;

    // the pointer union of both feeds the type walk
    let pointers = cmd_scanner.pointers().merge(&spec_scanner.pointers);
    let mut type_scanner = types::TypeScanner::new(pointers);
    lang::visit(&loaded, &mut type_scanner)?;
    type_scanner.log_points(&loaded.arena);

    document::merge_with_root(&opts.root, &mut c)?;

    let mut resolved = resolver::resolve(&c, &exports, |ptr| {
        if let Some(schema) = opts.overrides.get(&ptr.to_string()) {
            return Container::make(schema);
        }
        match ptr.scheme() {
            "go" => Container::make(&type_scanner.resolve(&loaded.arena, ptr)?),
            scheme => Err(Error::UnknownScheme(scheme.to_string())),
        }
    })?;

    document::set_paths_defaults(&mut resolved, &opts.operations)?;

    Document::new(resolved)
}

fn excluded(patterns: &[String], pkg_path: &str) -> bool {
    patterns
        .iter()
        .any(|p| pkg_path == p || pkg_path.starts_with(&format!("{p}/")))
}
