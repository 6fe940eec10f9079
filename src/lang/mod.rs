pub mod pkgs;

pub use pkgs::{visit, CancelToken, Loader, Loaded, Package, Scanner};

use std::collections::HashMap;
use std::fmt;

/// Identity of an interned type. Structurally identical types always share
/// one id, so comparing ids is the same as comparing types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

/// Basic kinds of the scanned language.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Basic {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
}

impl fmt::Display for Basic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Basic::Bool => "bool",
            Basic::String => "string",
            Basic::Int => "int",
            Basic::Int8 => "int8",
            Basic::Int16 => "int16",
            Basic::Int32 => "int32",
            Basic::Int64 => "int64",
            Basic::Uint => "uint",
            Basic::Uint8 => "uint8",
            Basic::Uint16 => "uint16",
            Basic::Uint32 => "uint32",
            Basic::Uint64 => "uint64",
            Basic::Float32 => "float32",
            Basic::Float64 => "float64",
        };
        write!(f, "{name}")
    }
}

/// A struct field. Exportedness follows the language rule: the name starts
/// with an uppercase letter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub tag: String,
    pub ty: TypeId,
    pub embedded: bool,
}

impl Field {
    pub fn new(name: &str, ty: TypeId) -> Field {
        Field {
            name: name.to_string(),
            tag: String::new(),
            ty,
            embedded: false,
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Field {
        self.tag = tag.to_string();
        self
    }

    pub fn embedded(mut self) -> Field {
        self.embedded = true;
        self
    }

    pub fn exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }
}

/// One node of the type graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(Basic),
    /// A declared type; `underlying` is `None` between declaration and
    /// definition, which is what lets cyclic types be built.
    Named {
        pkg: String,
        name: String,
        underlying: Option<TypeId>,
    },
    Struct(Vec<Field>),
    Ptr(TypeId),
    Slice(TypeId),
    Array(TypeId, u64),
    Map(TypeId),
    Chan(TypeId),
}

/// Interning arena for types, produced by the language front end.
///
/// Structural types are deduplicated by shape; named types by their
/// `(package, name)` pair. The arena is built once per scan and read-only
/// afterwards.
#[derive(Debug, Default)]
pub struct TypeArena {
    types: Vec<Type>,
    structural: HashMap<Type, TypeId>,
    named: HashMap<(String, String), TypeId>,
}

impl TypeArena {
    pub fn new() -> TypeArena {
        TypeArena::default()
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn basic(&mut self, b: Basic) -> TypeId {
        self.intern(Type::Basic(b))
    }

    pub fn ptr(&mut self, elem: TypeId) -> TypeId {
        self.intern(Type::Ptr(elem))
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.intern(Type::Slice(elem))
    }

    pub fn array(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.intern(Type::Array(elem, len))
    }

    pub fn map(&mut self, value: TypeId) -> TypeId {
        self.intern(Type::Map(value))
    }

    pub fn chan(&mut self, elem: TypeId) -> TypeId {
        self.intern(Type::Chan(elem))
    }

    pub fn strukt(&mut self, fields: Vec<Field>) -> TypeId {
        self.intern(Type::Struct(fields))
    }

    /// Declares a named type without an underlying yet. Returns the existing
    /// id if the name was declared before.
    pub fn declare_named(&mut self, pkg: &str, name: &str) -> TypeId {
        if let Some(id) = self.named.get(&(pkg.to_string(), name.to_string())) {
            return *id;
        }
        let id = self.push(Type::Named {
            pkg: pkg.to_string(),
            name: name.to_string(),
            underlying: None,
        });
        self.named.insert((pkg.to_string(), name.to_string()), id);
        id
    }

    /// Completes a named type declared earlier.
    pub fn define_named(&mut self, id: TypeId, underlying_ty: TypeId) {
        match &mut self.types[id.0 as usize] {
            Type::Named { underlying, .. } => *underlying = Some(underlying_ty),
            other => panic!("define_named on non-named type {other:?}"),
        }
    }

    /// Declares and defines a named type in one step.
    pub fn named(&mut self, pkg: &str, name: &str, underlying: TypeId) -> TypeId {
        let id = self.declare_named(pkg, name);
        self.define_named(id, underlying);
        id
    }

    /// Reduces a type to its underlying structural form, unwrapping named
    /// types. An undefined named type reduces to itself.
    pub fn underlying(&self, mut id: TypeId) -> TypeId {
        loop {
            match self.get(id) {
                Type::Named {
                    underlying: Some(u),
                    ..
                } => id = *u,
                _ => return id,
            }
        }
    }

    /// Human readable form of a type, used in logs and error messages.
    /// Named types are not expanded, which keeps cyclic types printable.
    pub fn type_string(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Basic(b) => b.to_string(),
            Type::Named { pkg, name, .. } => {
                if pkg.is_empty() {
                    name.clone()
                } else {
                    format!("{pkg}.{name}")
                }
            }
            Type::Struct(fields) => {
                let ff = fields
                    .iter()
                    .map(|f| format!("{} {}", f.name, self.type_string(f.ty)))
                    .collect::<Vec<_>>()
                    .join("; ");
                format!("struct{{{ff}}}")
            }
            Type::Ptr(e) => format!("*{}", self.type_string(*e)),
            Type::Slice(e) => format!("[]{}", self.type_string(*e)),
            Type::Array(e, n) => format!("[{}]{}", n, self.type_string(*e)),
            Type::Map(v) => format!("map[string]{}", self.type_string(*v)),
            Type::Chan(e) => format!("chan {}", self.type_string(*e)),
        }
    }

    fn intern(&mut self, t: Type) -> TypeId {
        if let Some(id) = self.structural.get(&t) {
            return *id;
        }
        let id = self.push(t.clone());
        self.structural.insert(t, id);
        id
    }

    fn push(&mut self, t: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(t);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_interning() {
        let mut arena = TypeArena::new();
        let s1 = arena.basic(Basic::String);
        let s2 = arena.basic(Basic::String);
        assert_eq!(s1, s2);

        let a = arena.strukt(vec![Field::new("A", s1)]);
        let b = arena.strukt(vec![Field::new("A", s2)]);
        assert_eq!(a, b);

        let c = arena.strukt(vec![Field::new("B", s1)]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_named_interning_and_underlying() {
        let mut arena = TypeArena::new();
        let str_ = arena.basic(Basic::String);
        let t = arena.named("test", "test", str_);

        assert_eq!(arena.declare_named("test", "test"), t);
        assert_eq!(arena.underlying(t), str_);
    }

    #[test]
    fn test_cyclic_named_type() {
        // type T *T
        let mut arena = TypeArena::new();
        let t = arena.declare_named("test", "T");
        let ptr = arena.ptr(t);
        arena.define_named(t, ptr);

        assert_eq!(arena.underlying(t), ptr);
        assert_eq!(arena.type_string(ptr), "*test.T");
    }

    #[test]
    fn test_field_exported() {
        let mut arena = TypeArena::new();
        let s = arena.basic(Basic::String);

        assert!(Field::new("Visible", s).exported());
        assert!(!Field::new("hidden", s).exported());
    }
}
