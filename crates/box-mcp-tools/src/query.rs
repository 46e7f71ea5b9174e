//! Query-string and path-segment serialization.

use crate::config::QueryStyleConfig;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QuerySerialization {
    pub style: QueryStyleConfig,
    pub explode: bool,
}

impl QuerySerialization {
    pub(crate) fn new(style: Option<QueryStyleConfig>, explode: Option<bool>) -> Self {
        let style = style.unwrap_or(QueryStyleConfig::Form);
        let explode = explode.unwrap_or(matches!(
            style,
            QueryStyleConfig::Form | QueryStyleConfig::DeepObject
        ));
        Self { style, explode }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueryPair {
    pub key: String,
    pub value: String,
}

impl QueryPair {
    fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Serialize one non-null query argument.
///
/// A present value always yields at least one pair; empty strings are sent as `name=`.
pub(crate) fn serialize_query_param(
    name: &str,
    value: &Value,
    ser: QuerySerialization,
) -> Vec<QueryPair> {
    match value {
        Value::Array(arr) => serialize_query_array(name, arr, ser),
        Value::Object(map) => serialize_query_object(name, map, ser),
        _ => vec![QueryPair::new(name, value_to_string(value))],
    }
}

fn serialize_query_array(name: &str, arr: &[Value], ser: QuerySerialization) -> Vec<QueryPair> {
    // Arrays of structured items (e.g. search `mdfilters`) go out as one JSON array.
    if arr.iter().any(|v| v.is_object() || v.is_array()) {
        return vec![QueryPair::new(name, Value::Array(arr.to_vec()).to_string())];
    }
    let items: Vec<String> = arr.iter().map(value_to_string).collect();
    match ser.style {
        QueryStyleConfig::Form if ser.explode && !items.is_empty() => items
            .into_iter()
            .map(|v| QueryPair::new(name, v))
            .collect(),
        QueryStyleConfig::Form | QueryStyleConfig::DeepObject => {
            vec![QueryPair::new(name, items.join(","))]
        }
        QueryStyleConfig::SpaceDelimited => vec![QueryPair::new(name, items.join(" "))],
        QueryStyleConfig::PipeDelimited => vec![QueryPair::new(name, items.join("|"))],
    }
}

fn serialize_query_object(
    name: &str,
    map: &serde_json::Map<String, Value>,
    ser: QuerySerialization,
) -> Vec<QueryPair> {
    match ser.style {
        QueryStyleConfig::DeepObject if !map.is_empty() => map
            .iter()
            .map(|(k, v)| QueryPair::new(format!("{name}[{k}]"), value_to_string(v)))
            .collect(),
        QueryStyleConfig::Form if !ser.explode => {
            let mut parts = Vec::with_capacity(map.len() * 2);
            for (k, v) in map {
                parts.push(k.clone());
                parts.push(value_to_string(v));
            }
            vec![QueryPair::new(name, parts.join(","))]
        }
        // Remaining object values are sent as JSON text.
        _ => vec![QueryPair::new(name, Value::Object(map.clone()).to_string())],
    }
}

pub(crate) fn encode_query(pairs: &[QueryPair]) -> String {
    let mut query = String::new();
    for (i, p) in pairs.iter().enumerate() {
        if i > 0 {
            query.push('&');
        }
        query.push_str(&percent_encode(&p.key, b""));
        query.push('=');
        query.push_str(&percent_encode(&p.value, b","));
    }
    query
}

/// Encode a value substituted into a path template.
pub(crate) fn encode_path_segment(s: &str) -> String {
    percent_encode(s, b"")
}

fn percent_encode(s: &str, keep: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) || keep.contains(&b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(explode: bool) -> QuerySerialization {
        QuerySerialization::new(Some(QueryStyleConfig::Form), Some(explode))
    }

    #[test]
    fn comma_joined_array_keeps_commas_unescaped() {
        let pairs = serialize_query_param("fields", &json!(["id", "name"]), form(false));
        assert_eq!(pairs, vec![QueryPair::new("fields", "id,name")]);
        assert_eq!(encode_query(&pairs), "fields=id,name");
    }

    #[test]
    fn exploded_array_repeats_the_key() {
        let pairs = serialize_query_param("ids", &json!(["1", "2"]), form(true));
        assert_eq!(encode_query(&pairs), "ids=1&ids=2");
    }

    #[test]
    fn empty_values_are_still_sent_once() {
        assert_eq!(
            encode_query(&serialize_query_param("q", &json!(""), form(true))),
            "q="
        );
        assert_eq!(
            encode_query(&serialize_query_param("ids", &json!([]), form(true))),
            "ids="
        );
    }

    #[test]
    fn deep_object_uses_bracketed_keys() {
        let ser = QuerySerialization::new(Some(QueryStyleConfig::DeepObject), None);
        let pairs = serialize_query_param("filter", &json!({"a": 1}), ser);
        assert_eq!(pairs, vec![QueryPair::new("filter[a]", "1")]);
    }

    #[test]
    fn object_defaults_to_json_text() {
        let pairs = serialize_query_param(
            "mdfilters",
            &json!([{"scope": "enterprise"}]),
            form(false),
        );
        assert_eq!(pairs, vec![QueryPair::new("mdfilters", r#"[{"scope":"enterprise"}]"#)]);

        let two = json!([
            {"scope": "enterprise", "filters": {"category": "online"}},
            {"scope": "global", "filters": {}}
        ]);
        let pairs = serialize_query_param("mdfilters", &two, form(true));
        assert_eq!(pairs.len(), 1);
        let parsed: Value = serde_json::from_str(&pairs[0].value).expect("json array");
        assert_eq!(parsed, two);

        let pairs = serialize_query_param("created", &json!({"gt": "2024"}), form(true));
        assert_eq!(pairs[0].value, r#"{"gt":"2024"}"#);
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let pairs = vec![QueryPair::new("query", "a&b=c d")];
        assert_eq!(encode_query(&pairs), "query=a%26b%3Dc%20d");
        assert_eq!(encode_path_segment("a/b"), "a%2Fb");
        assert_eq!(encode_path_segment("12345"), "12345");
    }

    #[test]
    fn scalars_are_stringified() {
        assert_eq!(value_to_string(&json!(5)), "5");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!("x")), "x");
    }
}
