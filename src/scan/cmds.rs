use std::collections::BTreeMap;

use crate::error::Error;
use crate::lang::{Package, Scanner, TypeArena};
use crate::pointer::{Pointer, Pointers};
use crate::resolver::{Export, Exports};
use crate::spec::Entity;

const PREFIX: &str = "openapi";

/// A parsed source directive.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `//openapi` on its own, a marker only.
    Root,
    /// `//openapi:schema <name> [<source>]`, exporting a schema.
    Schema { name: String, pointer: Pointer },
}

/// Harvests `openapi` directives from package comments into a per-package
/// command list.
#[derive(Debug, Default)]
pub struct CmdScanner {
    pub commands: BTreeMap<String, Vec<Command>>,
}

impl CmdScanner {
    pub fn new() -> CmdScanner {
        CmdScanner::default()
    }

    /// Pointers of every schema export found so far.
    pub fn pointers(&self) -> Pointers {
        self.commands
            .values()
            .flatten()
            .filter_map(|c| match c {
                Command::Schema { pointer, .. } => Some(pointer.clone()),
                Command::Root => None,
            })
            .collect()
    }

    /// Exported components, with export uniqueness enforced: neither a
    /// pointer nor an exported name may appear twice.
    pub fn exported_components(&self) -> Result<Exports, Error> {
        let mut exports = Exports::new();
        for cmd in self.commands.values().flatten() {
            if let Command::Schema { name, pointer } = cmd {
                if exports.get(pointer).is_some() {
                    return Err(Error::DuplicateExport(pointer.to_string()));
                }
                if exports.iter().any(|e| e.name == *name) {
                    return Err(Error::DuplicateExport(name.clone()));
                }
                exports.push(Export {
                    pointer: pointer.clone(),
                    entity: Entity::Schema,
                    name: name.clone(),
                });
            }
        }
        Ok(exports)
    }
}

impl Scanner for CmdScanner {
    fn scan(&mut self, pkg: &Package, _arena: &TypeArena) -> Result<(), Error> {
        let mut list = vec![];
        for line in &pkg.comments {
            let Some(text) = line.strip_prefix("//") else {
                continue;
            };
            let Some(rest) = text.strip_prefix(PREFIX) else {
                continue;
            };
            list.push(parse(pkg, rest.trim_end_matches(&[' ', '\n'][..]))?);
        }
        self.commands.insert(pkg.pkg_path.clone(), list);
        Ok(())
    }
}

/// Parses a single directive body, everything after the `openapi` prefix.
fn parse(pkg: &Package, comment: &str) -> Result<Command, Error> {
    let mut parts = comment.split(' ');
    let head = parts.next().unwrap_or_default().trim();
    let args: Vec<String> = parts.map(|s| s.trim().to_string()).collect();

    match head {
        "" => Ok(Command::Root),
        ":schema" => parse_schema(pkg, comment, &args),
        _ => Err(Error::InvalidCommand(comment.to_string())),
    }
}

fn parse_schema(pkg: &Package, origin: &str, args: &[String]) -> Result<Command, Error> {
    let make_ptr = |source: &str| -> Result<Pointer, Error> {
        if source.contains("://") || source.contains('#') {
            Pointer::parse(source)
        } else {
            Pointer::new_go(&pkg.pkg_path, source)
        }
    };

    match args {
        [name] if !name.is_empty() => Ok(Command::Schema {
            name: name.clone(),
            pointer: make_ptr(name)?,
        }),
        [name, source] if !name.is_empty() && !source.is_empty() => Ok(Command::Schema {
            name: name.clone(),
            pointer: make_ptr(source)?,
        }),
        _ => Err(Error::InvalidCommand(origin.to_string())),
    }
}
