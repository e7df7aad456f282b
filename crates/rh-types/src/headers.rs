use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Header multimap of a captured request.
///
/// Key order is irrelevant for storage; every rendering goes through
/// [`Headers::sorted`], which orders keys alphabetically and joins repeated
/// values with a comma.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(HashMap<String, Vec<String>>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `name`, keeping earlier values.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.entry(name.into()).or_default().push(value.into());
    }

    /// All values recorded under `name`.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Header names in alphabetical order paired with their comma-joined values.
    pub fn sorted(&self) -> Vec<(&str, String)> {
        let mut rows: Vec<(&str, String)> = self
            .0
            .iter()
            .map(|(name, values)| (name.as_str(), values.join(",")))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        rows
    }
}

impl From<HashMap<String, Vec<String>>> for Headers {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_orders_keys_and_joins_values() {
        let headers: Headers = [("hello", "world"), ("foo", "bar"), ("hello", "foobar")]
            .into_iter()
            .collect();

        let rows = headers.sorted();
        assert_eq!(
            rows,
            vec![("foo", "bar".to_string()), ("hello", "world,foobar".to_string())]
        );
    }

    #[test]
    fn append_keeps_earlier_values() {
        let mut headers = Headers::new();
        headers.append("accept", "text/html");
        headers.append("accept", "application/json");
        assert_eq!(headers.len(), 1);
        assert_eq!(
            headers.get("accept").unwrap(),
            &["text/html".to_string(), "application/json".to_string()]
        );
        assert!(headers.get("missing").is_none());
    }

    #[test]
    fn serializes_as_plain_object() {
        let headers: Headers = [("foo", "bar")].into_iter().collect();
        let json = serde_json::to_value(&headers).unwrap();
        assert_eq!(json, serde_json::json!({"foo": ["bar"]}));
    }

    #[test]
    fn empty_headers_render_nothing() {
        assert!(Headers::new().sorted().is_empty());
        assert!(Headers::new().is_empty());
    }
}
