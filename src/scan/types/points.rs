use std::collections::HashMap;

use crate::lang::{TypeArena, TypeId};
use crate::pointer::Pointer;

/// A pointer pinned to a concrete location inside a named type.
///
/// Descendants use the field name for struct fields, `*` for a dereference
/// and `[]` for the element of any collection.
#[derive(Clone, Debug)]
pub struct Point(pub Pointer);

impl Point {
    pub fn new(pkg: &str, name: &str) -> Point {
        Point(Pointer::new_go(pkg, name).unwrap_or_default())
    }

    pub fn descendant(&self, name: &str) -> Point {
        let mut p = self.0.clone();
        p.fragment = p.fragment.raw_descendant([name]);
        Point(p)
    }

    pub fn array(&self) -> Point {
        self.descendant("[]")
    }

    pub fn deref(&self) -> Point {
        self.descendant("*")
    }

    pub fn len(&self) -> usize {
        self.0.fragment.len()
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Point {}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bidirectional index between reachable types and the point addresses that
/// reach them. Built once during type scanning, read-only afterwards.
#[derive(Debug, Default)]
pub struct PointMap {
    m: HashMap<TypeId, Vec<Point>>,
}

impl PointMap {
    pub fn append(&mut self, t: TypeId, p: Point) {
        let pp = self.m.entry(t).or_default();
        if !pp.contains(&p) {
            pp.push(p);
        }
    }

    pub fn at(&self, t: TypeId) -> &[Point] {
        self.m.get(&t).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The canonical point for a type: the one with the shortest fragment,
    /// ties broken by string order. Canonical names win over field paths.
    pub fn pick(&self, t: TypeId) -> Option<Point> {
        self.at(t)
            .iter()
            .min_by_key(|p| (p.len(), p.to_string()))
            .cloned()
    }

    /// The type behind a pointer, searched across all recorded points.
    pub fn find_type(&self, ptr: &Pointer) -> Option<TypeId> {
        let want = ptr.to_string();
        self.m.iter().find_map(|(t, pp)| {
            pp.iter().any(|p| p.0.to_string() == want).then_some(*t)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &[Point])> {
        self.m.iter().map(|(t, pp)| (*t, pp.as_slice()))
    }

    /// Dumps `pointer => type` lines at debug level, sorted by pointer.
    pub fn log_dump(&self, arena: &TypeArena) {
        let mut lines: Vec<String> = self
            .iter()
            .flat_map(|(t, pp)| {
                pp.iter()
                    .map(move |p| format!("{} => {}", p, arena.type_string(t)))
            })
            .collect();
        lines.sort();
        for line in lines {
            log::debug!("{line}");
        }
    }
}
