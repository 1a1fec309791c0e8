//! Query string helpers
//!
//! Queries are handled as sorted multi-maps so rewritten URLs are stable.

use std::collections::BTreeMap;

/// Parsed query parameters, keys in sorted order
pub type QueryMap = BTreeMap<String, Vec<String>>;

pub fn parse_query(query: &str) -> QueryMap {
    let mut map = QueryMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        map.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    map
}

pub fn encode_query(map: &QueryMap) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, values) in map {
        for value in values {
            serializer.append_pair(key, value);
        }
    }
    serializer.finish()
}

/// Apply `edit` to the query of `target`, keeping its path and fragment
///
/// # Examples
/// ```
/// use hyper_render::http::query::rewrite_query;
/// let url = rewrite_query("/items?b=2&a=1#top", |q| {
///     q.insert("page".into(), vec!["3".into()]);
/// });
/// assert_eq!(url, "/items?a=1&b=2&page=3#top");
/// ```
pub fn rewrite_query(target: &str, edit: impl FnOnce(&mut QueryMap)) -> String {
    let (rest, fragment) = match target.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (target, None),
    };
    let (base, query) = rest.split_once('?').unwrap_or((rest, ""));

    let mut map = parse_query(query);
    edit(&mut map);
    let query = encode_query(&map);

    let mut out = String::with_capacity(target.len() + 16);
    out.push_str(base);
    if !query.is_empty() {
        out.push('?');
        out.push_str(&query);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
