//! Query string dictionary for HTTP request parameters.
//!
//! [`QueryDict`] holds GET and POST parameters. A key may carry several
//! values; [`QueryDict::get`] returns the last one, matching how HTML forms
//! resolve repeated fields.

use std::collections::HashMap;

/// A multi-valued dictionary for query string and form data.
///
/// # Examples
///
/// ```
/// use cbvtoolkit_http::QueryDict;
///
/// let qd = QueryDict::parse("color=red&color=blue&size=large");
/// assert_eq!(qd.get("color"), Some("blue"));
/// assert_eq!(qd.get_list("color"), Some(&vec!["red".to_string(), "blue".to_string()]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    data: HashMap<String, Vec<String>>,
}

impl QueryDict {
    /// Creates a new, empty `QueryDict`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` string.
    ///
    /// Handles percent-encoding, `+` as space, and repeated keys.
    pub fn parse(query_string: &str) -> Self {
        let mut qd = Self::new();
        for (key, value) in url::form_urlencoded::parse(query_string.as_bytes()) {
            qd.append(&key, &value);
        }
        qd
    }

    /// Returns the last value for the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// Returns all values for the given key.
    pub fn get_list(&self, key: &str) -> Option<&Vec<String>> {
        self.data.get(key)
    }

    /// Replaces all values for `key` with a single value.
    pub fn set(&mut self, key: &str, value: &str) {
        self.data.insert(key.to_string(), vec![value.to_string()]);
    }

    /// Appends a value to the list for `key`.
    pub fn append(&mut self, key: &str, value: &str) {
        self.data
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// Encodes the dictionary back into a query string. Keys are sorted so
    /// the output is stable.
    pub fn urlencode(&self) -> String {
        let mut keys: Vec<&String> = self.data.keys().collect();
        keys.sort();

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for key in keys {
            for value in &self.data[key] {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }
}
