//! Nested `application/x-www-form-urlencoded` decoding and encoding.
//!
//! Keys use bracket notation for nesting, the way browsers and most HTTP
//! clients serialize structured query strings:
//!
//! ```text
//! token=T&data[a]=1&data[tags][]=x&data[tags][]=y
//! ```
//!
//! decodes to
//!
//! ```json
//! {"token": "T", "data": {"a": "1", "tags": ["x", "y"]}}
//! ```
//!
//! Leaf values are always strings. A repeated plain key collects into an array.

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::utils::value::to_text;

/// Bracket segments past this depth are ignored.
const MAX_DEPTH: usize = 5;

/// Decodes a query string or urlencoded body into a nested map.
pub fn parse(input: &str) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in form_urlencoded::parse(input.as_bytes()) {
        let segments = split_key(&key);
        if segments.is_empty() {
            continue;
        }
        insert(&mut out, &segments, Value::String(value.into_owned()));
    }
    out
}

/// Encodes a nested map back into bracket notation.
pub fn stringify(map: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in map {
        append(&mut serializer, key, value);
    }
    serializer.finish()
}

fn split_key(key: &str) -> Vec<String> {
    if key.is_empty() {
        return Vec::new();
    }
    let open = match key.find('[') {
        Some(open) if open > 0 => open,
        _ => return vec![key.to_string()],
    };

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else { break };
        if segments.len() > MAX_DEPTH {
            break;
        }
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }

    if segments.len() == 1 {
        return vec![key.to_string()];
    }
    segments
}

fn insert(map: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        if let Some(existing) = map.get_mut(head) {
            if let Value::Array(items) = existing {
                items.push(value);
            } else {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
        } else {
            map.insert(head.clone(), value);
        }
        return;
    }

    if rest[0].is_empty() {
        let slot = map
            .entry(head.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            let previous = slot.take();
            *slot = Value::Array(vec![previous]);
        }
        if let Value::Array(items) = slot {
            if rest.len() == 1 {
                items.push(value);
            } else {
                let mut child = Map::new();
                insert(&mut child, &rest[1..], value);
                items.push(Value::Object(child));
            }
        }
        return;
    }

    let slot = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(child) = slot {
        insert(child, rest, value);
    }
}

fn append(serializer: &mut form_urlencoded::Serializer<'_, String>, key: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (child_key, child) in map {
                append(serializer, &format!("{key}[{child_key}]"), child);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                if item.is_object() || item.is_array() {
                    append(serializer, &format!("{key}[{index}]"), item);
                } else {
                    append(serializer, &format!("{key}[]"), item);
                }
            }
        }
        Value::Null => {
            serializer.append_pair(key, "");
        }
        scalar => {
            serializer.append_pair(key, &to_text(scalar));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_flat() {
        let map = parse("a=1&b=two&empty=");
        assert_eq!(Value::Object(map), json!({"a": "1", "b": "two", "empty": ""}));
    }

    #[test]
    fn test_parse_nested_data() {
        let map = parse("token=T&data[a]=1&data[b][c]=2");
        assert_eq!(
            Value::Object(map),
            json!({"token": "T", "data": {"a": "1", "b": {"c": "2"}}})
        );
    }

    #[test]
    fn test_parse_arrays() {
        let map = parse("tags[]=x&tags[]=y&dup=1&dup=2");
        assert_eq!(
            Value::Object(map),
            json!({"tags": ["x", "y"], "dup": ["1", "2"]})
        );
    }

    #[test]
    fn test_parse_percent_encoded_brackets() {
        let map = parse("data%5Ba%5D=hello%20world");
        assert_eq!(Value::Object(map), json!({"data": {"a": "hello world"}}));
    }

    #[test]
    fn test_parse_malformed_keys_stay_literal() {
        let map = parse("a[b=1&[c]=2");
        assert_eq!(Value::Object(map), json!({"a[b": "1", "[c]": "2"}));
    }

    #[test]
    fn test_stringify_nested() {
        let map = json!({"a": "1", "b": {"c": 2}, "tags": ["x", "y"]});
        let Value::Object(map) = map else { unreachable!() };
        let encoded = stringify(&map);
        assert_eq!(Value::Object(parse(&encoded)), json!({"a": "1", "b": {"c": "2"}, "tags": ["x", "y"]}));
    }
}
