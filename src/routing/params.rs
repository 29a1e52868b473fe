//! Path and query parameter containers.
//!
//! Path parameters preserve the declaration order of their template
//! variables. Query parameters keep one ordered value list per name so
//! repeated keys survive parsing, plus the raw query string verbatim
//! for diagnostics.

use std::collections::HashMap;

/// Path variables extracted by a template match, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Value for `name`, case-sensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parsed query string: name to ordered value list, repeated keys kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    params: HashMap<String, Vec<String>>,
    raw: String,
}

impl QueryParams {
    /// Parse a raw query string (without the leading `?`).
    pub fn parse(raw: &str) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            params
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        Self {
            params,
            raw: raw.to_string(),
        }
    }

    /// All values seen for `name`, in order of appearance.
    pub fn all(&self, name: &str) -> &[String] {
        self.params.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value seen for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.all(name).first().map(String::as_str)
    }

    /// The query string exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Query string portion of a request URI, empty when absent.
pub fn query_string_of(uri: &str) -> &str {
    match uri.rfind('?') {
        Some(idx) => &uri[idx + 1..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_keep_every_value_in_order() {
        let query = QueryParams::parse("query1=value1&query2=value2&query2=value3");
        assert_eq!(query.all("query1"), &["value1".to_string()]);
        assert_eq!(
            query.all("query2"),
            &["value2".to_string(), "value3".to_string()]
        );
        assert_eq!(query.raw(), "query1=value1&query2=value2&query2=value3");
    }

    #[test]
    fn values_are_url_decoded() {
        let query = QueryParams::parse("q=a%20b&r=c+d");
        assert_eq!(query.first("q"), Some("a b"));
        assert_eq!(query.first("r"), Some("c d"));
    }

    #[test]
    fn absent_key_yields_empty_slice() {
        let query = QueryParams::parse("a=1");
        assert!(query.all("missing").is_empty());
        assert_eq!(query.first("missing"), None);
    }

    #[test]
    fn query_string_of_splits_on_question_mark() {
        assert_eq!(query_string_of("/a/b?x=1&y=2"), "x=1&y=2");
        assert_eq!(query_string_of("/a/b"), "");
        assert_eq!(query_string_of("/a/b?"), "");
    }

    #[test]
    fn path_params_preserve_declaration_order() {
        let params = PathParams::new(vec![
            ("first".into(), "1".into()),
            ("second".into(), "2".into()),
        ]);
        let names: Vec<&str> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(params.get("second"), Some("2"));
        assert_eq!(params.get("Second"), None);
    }
}
