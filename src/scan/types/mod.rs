pub mod convert;
pub mod points;

pub use convert::add_ref_override;
pub use points::{Point, PointMap};

use crate::error::Error;
use crate::lang::{Package, Scanner, Type, TypeArena, TypeId};
use crate::pointer::{Pointer, Pointers};
use crate::spec::Schema;
use crate::tag::Tag;

/// Walks types reachable from the collected pointers and records, for every
/// reachable type, each point address it can be found at.
#[derive(Debug)]
pub struct TypeScanner {
    pointers: Pointers,
    pub points: PointMap,
}

impl TypeScanner {
    pub fn new(pointers: Pointers) -> TypeScanner {
        TypeScanner {
            pointers,
            points: PointMap::default(),
        }
    }

    /// Schema for the type behind a go pointer.
    pub fn resolve(&self, arena: &TypeArena, ptr: &Pointer) -> Result<Schema, Error> {
        let t = self
            .points
            .find_type(ptr)
            .ok_or_else(|| Error::NotFound(ptr.to_string()))?;
        convert::type_to_schema(arena, t, &self.points, vec![], &Tag::default())
    }

    pub fn log_points(&self, arena: &TypeArena) {
        self.points.log_dump(arena);
    }
}

impl Scanner for TypeScanner {
    fn scan(&mut self, pkg: &Package, arena: &TypeArena) -> Result<(), Error> {
        let TypeScanner { pointers, points } = self;

        for ptr in pointers.iter() {
            if ptr.scheme() != "go" {
                continue;
            }
            if pkg.pkg_path != ptr.pkg_path() {
                continue;
            }
            let Some(head) = ptr.fragment.head() else {
                continue;
            };
            let Some(obj) = pkg.scope.get(head) else {
                continue;
            };
            collect_types(arena, *obj, points)?;
        }

        Ok(())
    }
}

/// Seeds the walk for one top-level named type.
pub fn collect_types(arena: &TypeArena, obj: TypeId, m: &mut PointMap) -> Result<(), Error> {
    let Some(root) = named_point(arena, obj) else {
        return Ok(());
    };
    walk(arena, root, obj, &mut vec![], m)
}

fn named_point(arena: &TypeArena, t: TypeId) -> Option<Point> {
    match arena.get(t) {
        Type::Named { pkg, name, .. } => Some(Point::new(pkg, name)),
        _ => None,
    }
}

/// Records the point for the type's underlying form, then descends into
/// fields, dereferences and collection elements. Whenever a descendant is a
/// named type it is walked a second time under its own canonical name, so
/// the type stays reachable both through the field path and the name.
fn walk(
    arena: &TypeArena,
    r: Point,
    t: TypeId,
    path: &mut Vec<TypeId>,
    m: &mut PointMap,
) -> Result<(), Error> {
    let tu = arena.underlying(t);
    m.append(tu, r.clone());

    if path.contains(&tu) {
        return Ok(());
    }
    path.push(tu);

    let next: Vec<(Point, TypeId)> = match arena.get(tu) {
        Type::Struct(fields) => fields
            .iter()
            .filter(|f| f.exported())
            .map(|f| (r.descendant(&f.name), f.ty))
            .collect(),
        Type::Ptr(elem) => vec![(r.deref(), *elem)],
        Type::Slice(elem) | Type::Array(elem, _) | Type::Map(elem) | Type::Chan(elem) => {
            vec![(r.array(), *elem)]
        }
        _ => vec![],
    };

    for (np, nt) in next {
        walk(arena, np, nt, path, m)?;
        if let Some(root) = named_point(arena, nt) {
            walk(arena, root, nt, path, m)?;
        }
    }

    path.pop();
    Ok(())
}
