use std::collections::HashMap;

use crate::error::Error;

/// Per-field attributes decoded from a struct tag string.
///
/// Two namespaces are consulted, in order: the serialization namespace
/// (`json`) for the wire name and inline/omitempty options, then the `oapi`
/// namespace for everything schema related. `Option<bool>` attributes are
/// tri-state: unset, explicitly true, explicitly false.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tag {
    pub ignore: bool,
    pub inline: Option<bool>,
    pub omit_empty: bool,
    pub nullable: Option<bool>,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
    pub required: bool,
    pub name: String,
    pub pattern: String,
    pub format: String,
    pub ty: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub emin: Option<f64>,
    pub emax: Option<f64>,
    pub mul_of: Option<f64>,
    pub min_len: Option<u64>,
    pub max_len: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub uniq_items: bool,
    pub min_props: Option<u64>,
    pub max_props: Option<u64>,
}

impl Tag {
    /// Parses a raw struct tag string, e.g.
    /// `json:"name,omitempty" oapi:"name,required,min:0"`.
    pub fn parse(rawtags: &str) -> Result<Tag, Error> {
        let mut meta = Tag::default();
        if rawtags.is_empty() {
            return Ok(meta);
        }
        let tags = parse_struct_tags(rawtags)?;
        if let Some(value) = tags.get("json") {
            parse_json_tag(value, &mut meta)?;
        }
        if let Some(value) = tags.get("oapi") {
            parse_oapi_tag(value, &mut meta)?;
        }
        Ok(meta)
    }
}

fn parse_json_tag(value: &str, meta: &mut Tag) -> Result<(), Error> {
    let tag = TagValue::parse(value);
    if tag.name == "-" {
        meta.ignore = true;
        return Ok(());
    }
    if !tag.name.is_empty() {
        meta.name = tag.name.clone();
    }
    tag.bool_opt_ptr("inline", &mut meta.inline)?;
    tag.bool_opt("omitempty", &mut meta.omit_empty);
    Ok(())
}

fn parse_oapi_tag(value: &str, meta: &mut Tag) -> Result<(), Error> {
    let tag = TagValue::parse(value);
    if tag.name == "-" {
        meta.ignore = true;
        return Ok(());
    }
    if !tag.name.is_empty() {
        meta.name = tag.name.clone();
    }
    tag.bool_opt_ptr("inline", &mut meta.inline)?;
    tag.bool_opt("omitempty", &mut meta.omit_empty);
    tag.bool_opt_ptr("nullable", &mut meta.nullable)?;
    tag.bool_opt("readonly", &mut meta.read_only);
    tag.bool_opt("writeonly", &mut meta.write_only);
    tag.bool_opt("deprecated", &mut meta.deprecated);
    tag.bool_opt("unique", &mut meta.uniq_items);
    tag.bool_opt("required", &mut meta.required);
    tag.uint_opt("maxlen", &mut meta.max_len)?;
    tag.uint_opt("minlen", &mut meta.min_len)?;
    tag.uint_opt("maxitems", &mut meta.max_items)?;
    tag.uint_opt("minitems", &mut meta.min_items)?;
    tag.uint_opt("maxprops", &mut meta.max_props)?;
    tag.uint_opt("minprops", &mut meta.min_props)?;
    tag.string_opt("pattern", &mut meta.pattern);
    tag.string_opt("format", &mut meta.format);
    tag.string_opt("type", &mut meta.ty);
    tag.float_opt("max", &mut meta.max)?;
    tag.float_opt("min", &mut meta.min)?;
    tag.float_opt("emax", &mut meta.emax)?;
    tag.float_opt("emin", &mut meta.emin)?;
    tag.float_opt("mulof", &mut meta.mul_of)?;
    Ok(())
}

/// One namespace's tag value split into the leading name and its options.
struct TagValue {
    name: String,
    options: HashMap<String, String>,
}

impl TagValue {
    /// Splits `name,opt1,opt2:value` into name and option map. An option
    /// without a `:` is recorded with an empty value; its presence alone is
    /// meaningful for boolean options.
    fn parse(value: &str) -> TagValue {
        let mut parts = value.split(',');
        let name = parts.next().unwrap_or_default().trim().to_string();
        let mut options = HashMap::new();
        for part in parts {
            match part.split_once(':') {
                Some((k, v)) => {
                    options.insert(k.trim().to_string(), v.trim().trim_matches('\'').to_string())
                }
                None => options.insert(part.trim().to_string(), String::new()),
            };
        }
        TagValue { name, options }
    }

    /// Presence of a valueless option counts as `true`; an explicit value is
    /// parsed as a boolean, with parse failures treated as `false`.
    fn bool_opt(&self, key: &str, val: &mut bool) {
        match self.options.get(key) {
            None => {}
            Some(x) if x.is_empty() => *val = true,
            Some(x) => *val = parse_go_bool(x).unwrap_or(false),
        }
    }

    fn bool_opt_ptr(&self, key: &str, val: &mut Option<bool>) -> Result<(), Error> {
        match self.options.get(key) {
            None => Ok(()),
            Some(x) if x.is_empty() => {
                *val = Some(true);
                Ok(())
            }
            Some(x) => {
                *val = Some(parse_go_bool(x).ok_or_else(|| {
                    Error::TagParse(key.to_string(), format!("invalid boolean {x:?}"))
                })?);
                Ok(())
            }
        }
    }

    fn string_opt(&self, key: &str, val: &mut String) {
        if let Some(x) = self.options.get(key) {
            *val = x.clone();
        }
    }

    fn float_opt(&self, key: &str, val: &mut Option<f64>) -> Result<(), Error> {
        match self.options.get(key) {
            None => Ok(()),
            Some(x) => {
                let parsed = x.parse::<f64>().map_err(|err| {
                    Error::TagParse(key.to_string(), err.to_string())
                })?;
                *val = Some(parsed);
                Ok(())
            }
        }
    }

    fn uint_opt(&self, key: &str, val: &mut Option<u64>) -> Result<(), Error> {
        match self.options.get(key) {
            None => Ok(()),
            Some(x) => {
                let parsed = x.parse::<u64>().map_err(|err| {
                    Error::TagParse(key.to_string(), err.to_string())
                })?;
                *val = Some(parsed);
                Ok(())
            }
        }
    }
}

fn parse_go_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Parses the outer struct tag syntax: space-separated `key:"value"` pairs
/// with backslash escapes inside the quoted value.
fn parse_struct_tags(raw: &str) -> Result<HashMap<String, String>, Error> {
    let mut out = HashMap::new();
    let mut chars = raw.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            return Ok(out);
        }

        let mut key = String::new();
        for c in chars.by_ref() {
            if c == ':' {
                break;
            }
            if c.is_whitespace() {
                return Err(Error::TagParse(raw.to_string(), "bad syntax".to_string()));
            }
            key.push(c);
        }
        if key.is_empty() {
            return Err(Error::TagParse(raw.to_string(), "bad syntax".to_string()));
        }

        if chars.next() != Some('"') {
            return Err(Error::TagParse(
                raw.to_string(),
                format!("value of {key} is not quoted"),
            ));
        }
        let mut value = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(n) = chars.next() {
                        value.push(n);
                    }
                }
                '"' => {
                    closed = true;
                    break;
                }
                _ => value.push(c),
            }
        }
        if !closed {
            return Err(Error::TagParse(
                raw.to_string(),
                format!("value of {key} is not terminated"),
            ));
        }
        out.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_empty() {
        assert_eq!(Tag::parse("").unwrap(), Tag::default());
    }

    #[test]
    fn test_parse_name_from_both_namespaces() {
        let t = Tag::parse(r#"json:"b" oapi:"a""#).unwrap();
        assert_eq!(t.name, "a");

        let t = Tag::parse(r#"json:"b""#).unwrap();
        assert_eq!(t.name, "b");
    }

    #[test_case(r#"json:"-""#)]
    #[test_case(r#"oapi:"-""#)]
    fn test_parse_ignore(raw: &str) {
        assert!(Tag::parse(raw).unwrap().ignore);
    }

    #[test]
    fn test_parse_options() {
        let t = Tag::parse(
            r#"oapi:"a,required,nullable,minlen:1,maxlen:64,pattern:^x$,format:uuid,min:0,max:10""#,
        )
        .unwrap();

        assert_eq!(t.name, "a");
        assert!(t.required);
        assert_eq!(t.nullable, Some(true));
        assert_eq!(t.min_len, Some(1));
        assert_eq!(t.max_len, Some(64));
        assert_eq!(t.pattern, "^x$");
        assert_eq!(t.format, "uuid");
        assert_eq!(t.min, Some(0.));
        assert_eq!(t.max, Some(10.));
    }

    #[test]
    fn test_parse_bool_presence_counts() {
        // an option set with an empty value means true by presence
        let t = Tag::parse(r#"oapi:",inline,omitempty""#).unwrap();

        assert_eq!(t.inline, Some(true));
        assert!(t.omit_empty);
    }

    #[test]
    fn test_parse_bool_explicit_value() {
        let t = Tag::parse(r#"oapi:",inline:false,nullable:false""#).unwrap();

        assert_eq!(t.inline, Some(false));
        assert_eq!(t.nullable, Some(false));
    }

    #[test]
    fn test_parse_mulof_goes_to_mul_of() {
        let t = Tag::parse(r#"oapi:",mulof:5""#).unwrap();

        assert_eq!(t.mul_of, Some(5.));
        assert_eq!(t.emin, None);
    }

    #[test]
    fn test_parse_type_option() {
        let t = Tag::parse(r#"oapi:"a,type:number""#).unwrap();

        assert_eq!(t.name, "a");
        assert_eq!(t.ty, "number");
    }

    #[test]
    fn test_unknown_options_are_ignored() {
        let t = Tag::parse(r#"oapi:"a,whatever,other:1""#).unwrap();

        assert_eq!(t.name, "a");
        assert_eq!(t.min, None);
    }

    #[test]
    fn test_bad_number_fails() {
        assert!(Tag::parse(r#"oapi:",min:abc""#).is_err());
        assert!(Tag::parse(r#"oapi:",minlen:-1""#).is_err());
    }

    #[test]
    fn test_malformed_struct_tag_fails() {
        assert!(Tag::parse(r#"oapi:"unterminated"#).is_err());
        assert!(Tag::parse(r#"oapi"#).is_err());
    }
}
