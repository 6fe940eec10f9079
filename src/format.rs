use crate::container::Sorter;
use crate::document::Document;
use crate::error::Error;

/// Top-level key order of the serialized document; keys not listed follow in
/// document order.
pub const KEY_ORDER: &[&str] = &["openapi", "info", "components", "paths"];

/// Serializes the document in the requested format.
///
/// `yaml`/`yml` produce YAML, `json` compact JSON, `json:pretty` indented
/// JSON, and `go` a Go source file embedding the compact JSON as a string
/// constant.
pub fn format(f: &str, doc: &Document) -> Result<Vec<u8>, Error> {
    let sorter = Sorter::new(KEY_ORDER.iter().copied());

    match f {
        "yaml" | "yml" => sorter.marshal_yaml(doc.container()),
        "json" => sorter.marshal_json(doc.container()),
        "json:pretty" => sorter.marshal_json_pretty(doc.container()),
        "go" => {
            let data = sorter.marshal_json(doc.container())?;
            Ok(go_file("main", &String::from_utf8_lossy(&data)))
        }
        other => Err(Error::UnknownFormat(other.to_string())),
    }
}

fn go_file(pkg: &str, json: &str) -> Vec<u8> {
    let mut quoted = String::with_capacity(json.len() + 2);
    quoted.push('"');
    for ch in json.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');

    format!(
        "// Code generated by oapigen. DO NOT EDIT.\n\n\
         package {pkg}\n\n\
         // OpenAPI holds the generated OpenAPI v3 document as compact JSON.\n\
         const OpenAPI = {quoted}\n"
    )
    .into_bytes()
}
