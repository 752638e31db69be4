//! String-keyed, multi-valued request sources.
//!
//! Path parameters, query strings, headers and form bodies all reduce to the
//! same model before binding: an ordered map from key to a non-empty,
//! ordered list of raw string values.

use http::HeaderMap;
use indexmap::IndexMap;
use std::fmt;

use crate::error::BindError;
use crate::params::Params;

/// The request source a [`SourceMap`] was built from.
///
/// Each kind has its own tag in `#[bind(...)]` field attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Route path parameters (`#[bind(path = "...")]`).
    Path,
    /// Query string parameters (`#[bind(query = "...")]`).
    Query,
    /// Request headers (`#[bind(header = "...")]`).
    Header,
    /// URL-encoded or multipart form fields (`#[bind(form = "...")]`).
    Form,
}

impl SourceKind {
    /// All source kinds, in overlay order.
    pub const ALL: [Self; 4] = [Self::Path, Self::Query, Self::Header, Self::Form];

    /// Returns the attribute key used to tag fields for this source.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Form => "form",
        }
    }

    /// Whether untagged fields may match this source by field name.
    #[must_use]
    pub fn allows_name_fallback(self) -> bool {
        matches!(self, Self::Query)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Ordered multi-map of raw request values.
///
/// Keys are unique and keep first-seen order. Values under a key keep
/// arrival order and are never empty: a key exists only once a value has
/// been pushed for it.
///
/// # Example
///
/// ```rust
/// use syndesis::SourceMap;
///
/// let map = SourceMap::from_query("id=1&ID=2&id=3").unwrap();
///
/// assert_eq!(map.get("id").unwrap(), ["1", "3"]);
/// assert_eq!(map.get_ignore_case("Id").unwrap(), ["1", "3"]);
/// assert_eq!(map.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    entries: IndexMap<String, Vec<String>>,
}

impl SourceMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `key`.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    /// Appends every value of `other`, key by key.
    pub fn merge(&mut self, other: &Self) {
        for (key, values) in &other.entries {
            self.entries
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    /// Returns the values stored under exactly `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Returns the values for `key`, preferring an exact match and otherwise
    /// the first key (in arrival order) equal to it ignoring ASCII case.
    #[must_use]
    pub fn get_ignore_case(&self, key: &str) -> Option<&[String]> {
        self.get(key).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_slice())
        })
    }

    /// Returns true if a key equal to `key` ignoring case is present.
    #[must_use]
    pub fn contains_ignore_case(&self, key: &str) -> bool {
        self.get_ignore_case(key).is_some()
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no key is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates keys and their values in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Builds a map from route parameters.
    #[must_use]
    pub fn from_params(params: &Params) -> Self {
        params.iter().collect()
    }

    /// Parses a URL query string (without the leading `?`).
    pub fn from_query(query: &str) -> Result<Self, BindError> {
        Self::from_urlencoded(query.as_bytes()).map_err(|err| {
            BindError::configuration(format!("invalid query string: {err}"))
                .in_source(SourceKind::Query)
        })
    }

    /// Parses an `application/x-www-form-urlencoded` payload.
    pub fn from_urlencoded(bytes: &[u8]) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)?;
        Ok(pairs.into_iter().collect())
    }

    /// Builds a map from request headers.
    ///
    /// Header names are lowercase; values that are not visible ASCII are
    /// skipped.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut map = Self::new();
        for (name, value) in headers {
            if let Ok(value) = value.to_str() {
                map.push(name.as_str(), value);
            }
        }
        map
    }
}

impl<K, V> FromIterator<(K, V)> for SourceMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.push(key, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderValue;

    #[test]
    fn test_push_groups_values_in_arrival_order() {
        let mut map = SourceMap::new();
        map.push("a", "1");
        map.push("b", "2");
        map.push("a", "3");

        assert_eq!(map.get("a").unwrap(), ["1", "3"]);
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_exact_key_is_prioritized() {
        let map = SourceMap::from_query("NAME=upper&name=lower").unwrap();

        assert_eq!(map.get_ignore_case("name").unwrap(), ["lower"]);
        assert_eq!(map.get_ignore_case("Name").unwrap(), ["upper"]);
        assert!(map.get("Name").is_none());
        assert!(map.contains_ignore_case("nAmE"));
    }

    #[test]
    fn test_from_query_decodes_percent_and_plus() {
        let map = SourceMap::from_query("name=Jon+Snow&city=New%20York&empty=").unwrap();

        assert_eq!(map.get("name").unwrap(), ["Jon Snow"]);
        assert_eq!(map.get("city").unwrap(), ["New York"]);
        assert_eq!(map.get("empty").unwrap(), [""]);
    }

    #[test]
    fn test_from_headers_keeps_repeated_values() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        headers.insert("id", HeaderValue::from_static("2"));

        let map = SourceMap::from_headers(&headers);
        assert_eq!(map.get("x-tag").unwrap(), ["a", "b"]);
        assert_eq!(map.get_ignore_case("ID").unwrap(), ["2"]);
    }

    #[test]
    fn test_from_params_and_merge() {
        let params: Params = [("id", "1"), ("node", "x")].into_iter().collect();
        let mut map = SourceMap::from_params(&params);
        map.merge(&SourceMap::from_query("id=2&lang=en").unwrap());

        assert_eq!(map.get("id").unwrap(), ["1", "2"]);
        assert_eq!(map.get("lang").unwrap(), ["en"]);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_source_kind_tags() {
        assert_eq!(SourceKind::Path.to_string(), "path");
        assert_eq!(SourceKind::Header.tag(), "header");
        assert!(SourceKind::Query.allows_name_fallback());
        assert!(!SourceKind::Form.allows_name_fallback());
    }
}
