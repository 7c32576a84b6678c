use std::collections::HashMap;
use std::collections::hash_map;

/// Field names with a fixed meaning on the wire.
pub mod fields {
    pub const SIGN: &str = "sign";
    pub const SIGN_TYPE: &str = "sign_type";
    pub const NONCE_STR: &str = "nonce_str";
    pub const APP_ID: &str = "appid";
    pub const MCH_ID: &str = "mch_id";
    pub const MCH_APP_ID: &str = "mch_appid";
    pub const MCH_ID_TRANSFER: &str = "mchid";
    pub const RETURN_CODE: &str = "return_code";
    pub const RETURN_MSG: &str = "return_msg";
    pub const DATA: &str = "data";
}

/// Values of `return_code`.
pub const SUCCESS: &str = "SUCCESS";
pub const FAIL: &str = "FAIL";

/// A flat, unordered set of string parameters.
///
/// Requests and decoded responses share this shape. Ordering is only imposed
/// when the set is canonicalized for signing or serialized to XML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: HashMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning `self` for chaining.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    /// Builder-style variant of [`Params::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    /// Returns the value for `key`, or an empty string when it is absent.
    pub fn get_string(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.inner.remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
        self.inner.iter()
    }

    /// Keys in byte-wise ascending order.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.inner.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for Params {
    type Item = (String, String);
    type IntoIter = hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a String);
    type IntoIter = hash_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_string_defaults_to_empty() {
        let params = Params::from([("a", "1")]);
        assert_eq!(params.get_string("a"), "1");
        assert_eq!(params.get_string("missing"), "");
        assert!(params.get("missing").is_none());
    }

    #[test]
    fn test_set_replaces_existing_value() {
        let mut params = Params::new();
        params.set("a", "1").set("a", "2");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("a"), Some("2"));
    }

    #[test]
    fn test_sorted_keys_are_bytewise() {
        let params = Params::from([("b", "1"), ("B", "2"), ("a_b", "3"), ("a", "4")]);
        assert_eq!(params.sorted_keys(), vec!["B", "a", "a_b", "b"]);
    }
}
