use std::collections::HashMap;
use std::sync::Mutex;

use regex::Regex;

use crate::error::Error;

lazy_static! {
    static ref VARIABLES: Regex = Regex::new(r"(\{[a-z][a-zA-Z0-9]+?\}|\*)").unwrap();
    static ref REGEXEN: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

const METHODS: &[&str] = &[
    "ACL",
    "BASELINE-CONTROL",
    "BIND",
    "CHECKIN",
    "CHECKOUT",
    "CONNECT",
    "COPY",
    "DELETE",
    "GET",
    "HEAD",
    "LABEL",
    "LINK",
    "LOCK",
    "MERGE",
    "MKACTIVITY",
    "MKCALENDAR",
    "MKCOL",
    "MKREDIRECTREF",
    "MKWORKSPACE",
    "MOVE",
    "OPTIONS",
    "ORDERPATCH",
    "PATCH",
    "POST",
    "PRI",
    "PROPFIND",
    "PROPPATCH",
    "PUT",
    "REBIND",
    "REPORT",
    "SEARCH",
    "TRACE",
    "UNBIND",
    "UNCHECKOUT",
    "UNLINK",
    "UNLOCK",
    "UPDATE",
    "UPDATEREDIRECTREF",
    "VERSION-CONTROL",
];

/// Matches a request `method` + `path` against a route pattern.
///
/// The pattern grammar is `(METHOD ":")? path` where `{name}` segments match
/// anything but a slash and `*` matches anything. Method comparison is
/// case-insensitive; an absent method on either side matches any method.
pub fn matches(pattern: &str, method: &str, path: &str) -> Result<bool, Error> {
    let mut pattern = pattern;
    let mut fm = "";
    for m in METHODS {
        let met = m.to_lowercase();
        if pattern.to_lowercase().starts_with(&format!("{met}:")) {
            pattern = &pattern[m.len() + 1..];
            fm = m;
            break;
        }
    }
    if !fm.is_empty() && !method.is_empty() && !fm.eq_ignore_ascii_case(method) {
        return Ok(false);
    }

    let mut parts: Vec<String> = vec![];
    let mut last = 0;
    for x in VARIABLES.find_iter(pattern) {
        let (i, j) = (x.start(), x.end());
        parts.push(regex::escape(&pattern[last..i]));
        let bytes = pattern.as_bytes();
        if bytes[i] == b'{' && bytes[j - 1] == b'}' {
            parts.push("([^/]+)".to_string());
        } else if bytes[i] == b'*' {
            parts.push("(.*)".to_string());
        } else {
            parts.push(pattern[i..j].to_string());
        }
        last = j;
    }
    parts.push(regex::escape(&pattern[last..]));

    let compiled = parts.join("");
    let reg = compile_cached(&compiled)?;
    Ok(reg.is_match(path))
}

fn compile_cached(pattern: &str) -> Result<Regex, Error> {
    let mut regexen = REGEXEN.lock().expect("route regex cache poisoned");

    if let Some(reg) = regexen.get(pattern) {
        return Ok(reg.clone());
    }
    let reg = Regex::new(&format!("^{pattern}$"))
        .map_err(|err| Error::InvalidRoutePattern(pattern.to_string(), err))?;
    regexen.insert(pattern.to_string(), reg.clone());
    Ok(reg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn must_match(pattern: &str, method: &str, path: &str) -> bool {
        matches(pattern, method, path).unwrap()
    }

    #[test_case("/[]foo/{av}/1/*2", "", "/ok")]
    #[test_case("/[]foo/{av}/1/*2", "", "/[]")]
    #[test_case("/[]foo/{av}/1/*2", "", "/[]foo")]
    #[test_case("/[]foo/{av}/1/*2", "", "/[]foo/{xxxx}/1")]
    #[test_case("/[]foo/{av}/1/*2", "", "/[]foo/{xxxx}/1/3")]
    #[test_case("/[]foo/{av}/1/*2", "", "/[]foo/{xxxx}/2")]
    #[test_case("GET:/foo", "POST", "/foo")]
    fn test_route_rejects(pattern: &str, method: &str, path: &str) {
        assert!(!must_match(pattern, method, path));
    }

    #[test_case("GET:/foo", "", "/foo"; "get_foo_empty_method")]
    #[test_case("POST:/foo", "", "/foo"; "post_foo_empty_method")]
    #[test_case("GET:/foo", "get", "/foo"; "get_foo_lowercase_method")]
    #[test_case("GET:/foo", "GET", "/foo"; "get_foo_uppercase_method")]
    #[test_case("/[]foo/{av}/1/*2", "", "/[]foo/{123}/1/3/2")]
    #[test_case("/[]foo/{av}/1/valid/*2", "", "/[]foo/{x}/1/valid/2")]
    #[test_case("/[]foo/{av}/1/valid/*2", "", "/[]foo/{xxxx}/1/valid/2")]
    #[test_case("GET:/[]foo/{av}/1/valid/*2", "", "/[]foo/{xxxx}/1/valid/2")]
    fn test_route_accepts(pattern: &str, method: &str, path: &str) {
        assert!(must_match(pattern, method, path));
    }
}
