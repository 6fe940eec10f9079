use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::error::Error;
use crate::lang::{Basic, Field, Type, TypeArena, TypeId};
use crate::pointer::Pointer;
use crate::scan::types::points::PointMap;
use crate::spec::{Schema, SchemaType};
use crate::tag::Tag;

lazy_static! {
    static ref REF_OVERRIDES: Mutex<HashMap<String, Schema>> = {
        let mut m = HashMap::new();
        m.insert("go://time#/Time".to_string(), Schema::string_property());
        Mutex::new(m)
    };
}

/// Registers a schema override for a pointer. Whenever a reference to the
/// pointer would be emitted, the override is produced instead. The registry
/// is seeded with the standard library time type.
pub fn add_ref_override(p: Pointer, s: Schema) {
    REF_OVERRIDES
        .lock()
        .expect("ref override registry poisoned")
        .insert(p.to_string(), s);
}

fn ref_override(key: &str) -> Option<Schema> {
    REF_OVERRIDES
        .lock()
        .expect("ref override registry poisoned")
        .get(key)
        .cloned()
}

type Path = Vec<TypeId>;

/// Converts a type into an OpenAPI schema.
///
/// The visit path carries every type already being converted up the call
/// chain; hitting one again emits a reference instead of recursing forever.
pub fn type_to_schema(
    arena: &TypeArena,
    t: TypeId,
    m: &PointMap,
    mut tp: Path,
    tag: &Tag,
) -> Result<Schema, Error> {
    let t = arena.underlying(t);

    if tp.contains(&t) {
        return reference_to_schema(arena, t, m);
    }
    tp.push(t);

    match arena.get(t) {
        Type::Struct(_) => {
            if tp.len() == 1 {
                struct_to_schema(arena, t, m, tp)
            } else {
                reference_to_schema(arena, t, m)
            }
        }
        Type::Array(elem, len) => array_to_schema(arena, t, *elem, *len, m, tp, tag),
        Type::Basic(b) => basic_to_schema(*b, tag),
        Type::Map(value) => map_to_schema(arena, t, *value, m, tp, tag),
        Type::Slice(elem) => slice_to_schema(arena, t, *elem, m, tp, tag),
        Type::Ptr(elem) => pointer_to_schema(arena, t, *elem, m, tp, tag),
        _ => Err(Error::UnsupportedType(arena.type_string(t))),
    }
}

/// Element conversion shared by the collection kinds. A collection whose
/// element reduces back to the collection itself has no schema
/// representation at all.
fn element_to_schema(
    arena: &TypeArena,
    t: TypeId,
    elem: TypeId,
    m: &PointMap,
    tp: Path,
    tag: &Tag,
) -> Result<Schema, Error> {
    if arena.underlying(elem) == t {
        return Err(Error::InvalidSelfReference(arena.type_string(t)));
    }
    type_to_schema(arena, elem, m, tp, tag)
}

fn struct_to_schema(arena: &TypeArena, t: TypeId, m: &PointMap, tp: Path) -> Result<Schema, Error> {
    let mut s = Schema::typed(SchemaType::Object);
    let mut properties = BTreeMap::new();

    let fields = collect_struct_fields(arena, t, vec![], &Tag::default())?;

    for (field, tag) in fields {
        let mut pschema = if !tag.ty.is_empty() {
            basic_string_to_schema(&tag.ty, &tag)?
        } else {
            let underlying = arena.underlying(field.ty);
            match arena.get(underlying) {
                Type::Struct(_) => reference_to_schema(arena, underlying, m)?,
                _ => type_to_schema(arena, field.ty, m, tp.clone(), &tag)?,
            }
        };

        let name = if tag.name.is_empty() {
            field.name.clone()
        } else {
            tag.name.clone()
        };

        if pschema.reference.is_none() {
            pschema.deprecated = tag.deprecated;
            pschema.read_only = tag.read_only;
            pschema.write_only = tag.write_only;
            if !tag.format.is_empty() {
                pschema.format = tag.format.clone();
            }
            if let Some(nullable) = tag.nullable {
                pschema.nullable = nullable;
            }
            if tag.required {
                s.required.push(name.clone());
            }
        }

        properties.insert(name, pschema);
    }

    if !properties.is_empty() {
        s.properties = Some(properties);
    }

    Ok(s)
}

fn map_to_schema(
    arena: &TypeArena,
    t: TypeId,
    value: TypeId,
    m: &PointMap,
    tp: Path,
    tag: &Tag,
) -> Result<Schema, Error> {
    let sch = element_to_schema(arena, t, value, m, tp, tag)?;

    let mut s = Schema::typed(SchemaType::Object);
    s.additional_properties = Some(Box::new(sch));
    s.nullable = true;

    s.min_properties = tag.min_props;
    s.max_properties = tag.max_props;
    if let Some(nullable) = tag.nullable {
        s.nullable = nullable;
    }

    Ok(s)
}

fn slice_to_schema(
    arena: &TypeArena,
    t: TypeId,
    elem: TypeId,
    m: &PointMap,
    tp: Path,
    tag: &Tag,
) -> Result<Schema, Error> {
    let sch = element_to_schema(arena, t, elem, m, tp, tag)?;

    let mut s = Schema::typed(SchemaType::Array);
    s.items = Some(Box::new(sch));
    s.nullable = true;

    s.min_items = tag.min_items;
    s.max_items = tag.max_items;
    s.unique_items = tag.uniq_items;
    if let Some(nullable) = tag.nullable {
        s.nullable = nullable;
    }

    Ok(s)
}

fn array_to_schema(
    arena: &TypeArena,
    t: TypeId,
    elem: TypeId,
    len: u64,
    m: &PointMap,
    tp: Path,
    tag: &Tag,
) -> Result<Schema, Error> {
    let sch = element_to_schema(arena, t, elem, m, tp, tag)?;

    let mut s = Schema::typed(SchemaType::Array);
    s.items = Some(Box::new(sch));

    s.min_items = tag.min_items;
    s.max_items = tag.max_items;
    if len > 0 {
        s.max_items = Some(len);
    }

    s.unique_items = tag.uniq_items;
    if let Some(nullable) = tag.nullable {
        s.nullable = nullable;
    }

    Ok(s)
}

fn pointer_to_schema(
    arena: &TypeArena,
    t: TypeId,
    elem: TypeId,
    m: &PointMap,
    tp: Path,
    tag: &Tag,
) -> Result<Schema, Error> {
    let mut s = element_to_schema(arena, t, elem, m, tp, tag)?;
    s.nullable = true;

    if let Some(nullable) = tag.nullable {
        s.nullable = nullable;
    }

    if s.reference.is_none() || !s.nullable {
        return Ok(s);
    }

    // keep the reference site nullable without inlining it
    s.nullable = false;
    Ok(Schema::one_of(vec![
        s,
        Schema {
            nullable: true,
            ..Schema::typed(SchemaType::Object)
        },
    ]))
}

fn reference_to_schema(arena: &TypeArena, t: TypeId, m: &PointMap) -> Result<Schema, Error> {
    let point = m
        .pick(t)
        .ok_or_else(|| Error::NotFound(arena.type_string(t)))?;

    if let Some(sch) = ref_override(&point.to_string()) {
        return Ok(sch);
    }

    Ok(Schema::ref_to(point.0))
}

fn basic_to_schema(b: Basic, tag: &Tag) -> Result<Schema, Error> {
    let mut s = match b {
        Basic::Float32 => Schema::float32_property(),
        Basic::Float64 => Schema::float64_property(),
        Basic::Uint | Basic::Uint8 | Basic::Uint16 | Basic::Uint32 => {
            let mut s = Schema::int_fmt_property("int32");
            s.minimum = Some(0.);
            s
        }
        Basic::Uint64 => {
            let mut s = Schema::int_fmt_property("int64");
            s.minimum = Some(0.);
            s
        }
        Basic::Int | Basic::Int8 | Basic::Int16 | Basic::Int32 => Schema::int_fmt_property("int32"),
        Basic::Int64 => Schema::int_fmt_property("int64"),
        Basic::Bool => Schema::boolean_property(),
        Basic::String => Schema::string_property(),
    };

    match s.ty {
        Some(SchemaType::Number) | Some(SchemaType::Integer) => {
            if let Some(min) = tag.min {
                s.minimum = Some(min);
            }
            if let Some(max) = tag.max {
                s.maximum = Some(max);
            }
            if let Some(emin) = tag.emin {
                s.minimum = Some(emin);
                s.exclusive_minimum = true;
            }
            if let Some(emax) = tag.emax {
                s.maximum = Some(emax);
                s.exclusive_maximum = true;
            }
            if let Some(mul_of) = tag.mul_of {
                s.multiple_of = Some(mul_of);
            }
        }
        Some(SchemaType::String) => {
            s.max_length = tag.max_len;
            s.min_length = tag.min_len;
            s.pattern = tag.pattern.clone();
        }
        _ => {}
    }

    Ok(s)
}

/// Schema for a tag-forced type. Besides the language basic kinds this
/// understands the aliases `float`, `double`, `integer` and the format
/// sugars `base64`, `uuid`, `password`, plus raw `number` and `object`.
fn basic_string_to_schema(t: &str, tag: &Tag) -> Result<Schema, Error> {
    match t.trim() {
        "string" => basic_to_schema(Basic::String, tag),
        "float32" | "float" => basic_to_schema(Basic::Float32, tag),
        "float64" | "double" => basic_to_schema(Basic::Float64, tag),
        "uint" => basic_to_schema(Basic::Uint, tag),
        "uint8" => basic_to_schema(Basic::Uint8, tag),
        "uint16" => basic_to_schema(Basic::Uint16, tag),
        "uint32" => basic_to_schema(Basic::Uint32, tag),
        "uint64" => basic_to_schema(Basic::Uint64, tag),
        "int" => basic_to_schema(Basic::Int, tag),
        "int8" => basic_to_schema(Basic::Int8, tag),
        "int16" => basic_to_schema(Basic::Int16, tag),
        "int32" | "integer" => basic_to_schema(Basic::Int32, tag),
        "int64" => basic_to_schema(Basic::Int64, tag),
        "bool" => basic_to_schema(Basic::Bool, tag),
        "base64" => {
            let mut s = basic_to_schema(Basic::String, tag)?;
            s.format = "binary".to_string();
            Ok(s)
        }
        "uuid" => {
            let mut s = basic_to_schema(Basic::String, tag)?;
            s.format = "uuid".to_string();
            Ok(s)
        }
        "password" => {
            let mut s = basic_to_schema(Basic::String, tag)?;
            s.format = "password".to_string();
            Ok(s)
        }
        "number" => Ok(Schema::typed(SchemaType::Number)),
        "object" => Ok(Schema::typed(SchemaType::Object)),
        other => Err(Error::InvalidSchemaType(other.to_string())),
    }
}

/// The struct type behind an embedded or inline field, if flattening
/// applies. An explicit `inline` tag wins over embedding; an indirection is
/// looked through.
fn cast_inline_struct(arena: &TypeArena, field: &Field, tag: &Tag) -> Option<TypeId> {
    let mut tx = arena.underlying(field.ty);
    if let Type::Ptr(elem) = arena.get(tx) {
        tx = arena.underlying(*elem);
    }
    if !matches!(arena.get(tx), Type::Struct(_)) {
        return None;
    }
    tag.inline.unwrap_or(field.embedded).then_some(tx)
}

/// Walks struct fields left to right, parsing tags, skipping ignored and
/// non-exported fields and flattening inline structs. The visit stack on
/// struct identity prevents flattening loops.
fn collect_struct_fields(
    arena: &TypeArena,
    t: TypeId,
    mut p: Path,
    _tag: &Tag,
) -> Result<Vec<(Field, Tag)>, Error> {
    if p.contains(&t) {
        return Ok(vec![]);
    }
    p.push(t);

    let Type::Struct(fields) = arena.get(t) else {
        return Ok(vec![]);
    };

    let mut arr = vec![];
    for field in fields {
        let tag = Tag::parse(&field.tag)?;
        if tag.ignore || !field.exported() {
            continue;
        }
        match cast_inline_struct(arena, field, &tag) {
            Some(st) => arr.extend(collect_struct_fields(arena, st, p.clone(), &tag)?),
            None => arr.push((field.clone(), tag)),
        }
    }

    Ok(arr)
}
