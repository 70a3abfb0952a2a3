//! Raw query-string parameters.

use std::collections::BTreeMap;

/// Multi-valued query parameters.
///
/// `a=1&a=2` and `a[]=1&a[]=2` both produce the list `["1", "2"]` under `a`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Self {
        Self::from_pairs(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut params = Self::new();
        for (k, v) in pairs {
            params.push(k, v);
        }
        params
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let key = key.strip_suffix("[]").map(str::to_string).unwrap_or(key);
        self.values.entry(key).or_default().push(value.into());
    }

    /// First value for `key`, trimmed, if present and non-blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|vs| vs.first())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// All values for `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_decodes() {
        let params = QueryParams::parse("search=red%20shoe&page=2&tag=a&tag=b&cat[]=x");
        assert_eq!(params.get("search"), Some("red shoe"));
        assert_eq!(params.get("page"), Some("2"));
        assert_eq!(params.get_all("tag"), ["a", "b"]);
        assert_eq!(params.get_all("cat"), ["x"]);
    }

    #[test]
    fn blank_values_read_as_absent() {
        let params = QueryParams::parse("status=&name=%20%20");
        assert_eq!(params.get("status"), None);
        assert!(!params.contains("name"));
        assert_eq!(params.get("missing"), None);
    }
}
