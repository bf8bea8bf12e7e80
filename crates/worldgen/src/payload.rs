//! Helpers for walking untyped completion payloads.
//!
//! Object keys are visited in the map's iteration order, which for
//! `serde_json` without `preserve_order` is sorted key order.

use serde_json::Value;

/// Looks up a dotted path such as `assets.imagery.pano_url`.
///
/// Numeric segments index into arrays.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Looks up a dotted path and returns it when it is a non-empty string.
pub fn lookup_str<'a>(root: &'a Value, path: &str) -> Option<&'a str> {
    lookup(root, path)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Depth-first search for the first string accepted by `accept`.
pub fn find_string<'a>(root: &'a Value, accept: &mut dyn FnMut(&str) -> bool) -> Option<&'a str> {
    match root {
        Value::String(s) => accept(s).then_some(s.as_str()),
        Value::Array(items) => items.iter().find_map(|v| find_string(v, accept)),
        Value::Object(map) => map.values().find_map(|v| find_string(v, accept)),
        _ => None,
    }
}

/// True for strings that can be fetched: absolute http(s) or `data:` URLs.
pub fn is_url_like(s: &str) -> bool {
    let lower = s.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://") || lower.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_objects_and_arrays() {
        let v = json!({"a": {"b": [{"c": "x"}, {"c": "y"}]}});
        assert_eq!(lookup_str(&v, "a.b.1.c"), Some("y"));
        assert_eq!(lookup_str(&v, "a.b.5.c"), None);
        assert_eq!(lookup_str(&v, "a.missing"), None);
        assert!(lookup(&v, "a.b").unwrap().is_array());
    }

    #[test]
    fn lookup_str_skips_empty_and_non_strings() {
        let v = json!({"empty": "  ", "num": 3});
        assert_eq!(lookup_str(&v, "empty"), None);
        assert_eq!(lookup_str(&v, "num"), None);
    }

    #[test]
    fn find_string_is_depth_first() {
        let v = json!({
            "a": {"deep": {"url": "https://x.test/one.spz"}},
            "b": "https://x.test/two.spz"
        });
        let found = find_string(&v, &mut |s| s.ends_with(".spz"));
        assert_eq!(found, Some("https://x.test/one.spz"));
    }

    #[test]
    fn find_string_walks_arrays_in_order() {
        let v = json!(["nope", ["https://x.test/a.glb", "https://x.test/b.glb"]]);
        let found = find_string(&v, &mut |s| s.contains(".glb"));
        assert_eq!(found, Some("https://x.test/a.glb"));
    }

    #[test]
    fn url_like() {
        assert!(is_url_like("https://x.test/a"));
        assert!(is_url_like("data:image/png;base64,AA"));
        assert!(!is_url_like("thumbnail.webp"));
        assert!(!is_url_like("ftp://x"));
    }
}
