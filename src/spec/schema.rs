use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pointer::Pointer;
use crate::spec::is_false;

/// Value of the schema `type` keyword.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
}

/// OpenAPI v3 Schema Object, restricted to the keywords the generator
/// produces and configuration may supply.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<Pointer>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<SchemaType>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,

    #[serde(skip_serializing_if = "is_false")]
    pub nullable: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<Schema>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(rename = "exclusiveMinimum", skip_serializing_if = "is_false")]
    pub exclusive_minimum: bool,

    #[serde(rename = "exclusiveMaximum", skip_serializing_if = "is_false")]
    pub exclusive_maximum: bool,

    #[serde(rename = "multipleOf", skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub pattern: String,

    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(rename = "uniqueItems", skip_serializing_if = "is_false")]
    pub unique_items: bool,

    #[serde(rename = "minProperties", skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,

    #[serde(rename = "maxProperties", skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,

    #[serde(rename = "readOnly", skip_serializing_if = "is_false")]
    pub read_only: bool,

    #[serde(rename = "writeOnly", skip_serializing_if = "is_false")]
    pub write_only: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub deprecated: bool,

    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,

    #[serde(rename = "allOf", skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Schema>>,

    #[serde(rename = "anyOf", skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Schema>>,
}

impl Schema {
    pub fn typed(ty: SchemaType) -> Schema {
        Schema {
            ty: Some(ty),
            ..Schema::default()
        }
    }

    pub fn string_property() -> Schema {
        Schema::typed(SchemaType::String)
    }

    pub fn boolean_property() -> Schema {
        Schema::typed(SchemaType::Boolean)
    }

    pub fn int_fmt_property(format: &str) -> Schema {
        Schema {
            format: format.to_string(),
            ..Schema::typed(SchemaType::Integer)
        }
    }

    pub fn float32_property() -> Schema {
        Schema {
            format: "float".to_string(),
            ..Schema::typed(SchemaType::Number)
        }
    }

    pub fn float64_property() -> Schema {
        Schema {
            format: "double".to_string(),
            ..Schema::typed(SchemaType::Number)
        }
    }

    pub fn ref_to(ptr: Pointer) -> Schema {
        Schema {
            reference: Some(ptr),
            ..Schema::default()
        }
    }

    /// Union of alternatives.
    pub fn one_of(schemas: Vec<Schema>) -> Schema {
        Schema {
            one_of: Some(schemas),
            ..Schema::default()
        }
    }

    pub fn is_ref(&self) -> bool {
        self.reference.is_some()
    }
}
