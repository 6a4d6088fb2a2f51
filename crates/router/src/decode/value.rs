//! The flat key to value(s) mapping produced by the content adapters.

use std::collections::HashMap;
use std::collections::hash_map;

/// One external value as seen by a field decoder: a single string, or the ordered values of a
/// repeated key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawValue<'a> {
    One(&'a str),
    Many(&'a [String]),
}

impl<'a> RawValue<'a> {
    /// The value a single-valued field reads: the string itself, or the first of many.
    pub fn first(&self) -> Option<&'a str> {
        match *self {
            RawValue::One(value) => Some(value),
            RawValue::Many(values) => values.first().map(String::as_str),
        }
    }

    /// True for an empty string or an empty list.
    pub fn is_blank(&self) -> bool {
        match *self {
            RawValue::One(value) => value.is_empty(),
            RawValue::Many(values) => values.is_empty(),
        }
    }

    /// The elements a list-valued field reads.
    ///
    /// A single string is split on `,` and every segment is trimmed, repeated keys are taken
    /// as they are. A blank value yields no elements.
    pub fn items(&self) -> Vec<&'a str> {
        match *self {
            RawValue::One("") => Vec::new(),
            RawValue::One(value) => value.split(',').map(str::trim).collect(),
            RawValue::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// A value stored in [`FormValues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Single(String),
    Multi(Vec<String>),
}

impl FormValue {
    pub fn as_raw(&self) -> RawValue<'_> {
        match self {
            FormValue::Single(value) => RawValue::One(value),
            FormValue::Multi(values) => RawValue::Many(values),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            FormValue::Single(first) => {
                let first = std::mem::take(first);
                *self = FormValue::Multi(vec![first, value]);
            }
            FormValue::Multi(values) => values.push(value),
        }
    }

    fn is_blank(&self) -> bool {
        self.as_raw().is_blank()
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Single(value)
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Single(value.to_owned())
    }
}

impl From<Vec<String>> for FormValue {
    fn from(values: Vec<String>) -> Self {
        FormValue::Multi(values)
    }
}

/// Flat mapping from external key to a single value or an ordered list of values.
///
/// Built fresh for every decode call. Appending the same key twice turns its value into
/// [`FormValue::Multi`], keeping the submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    inner: HashMap<String, FormValue>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: HashMap::with_capacity(capacity) }
    }

    /// Appends `value` under `key`, turning the entry into a list when the key repeats.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.inner.entry(key.into()) {
            hash_map::Entry::Occupied(mut entry) => entry.get_mut().push(value),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(FormValue::Single(value));
            }
        }
    }

    /// Replaces whatever is stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FormValue>) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.inner.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Drops keys whose only value is the empty string, so blank form inputs read as absent.
    pub fn remove_blank(&mut self) {
        self.inner.retain(|_, value| !value.is_blank());
    }
}

impl<K, V> FromIterator<(K, V)> for FormValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FormValues::new();
        values.extend(iter);
        values
    }
}

impl<K, V> Extend<(K, V)> for FormValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.append(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FormValue, FormValues, RawValue};

    #[test]
    fn repeated_keys_become_multi() {
        let values: FormValues = [("tag", "a"), ("tag", "b"), ("name", "jane")].into_iter().collect();

        assert_eq!(values.len(), 2);
        assert_eq!(values.get("tag"), Some(&FormValue::Multi(vec!["a".into(), "b".into()])));
        assert_eq!(values.get("name"), Some(&FormValue::Single("jane".into())));
    }

    #[test]
    fn remove_blank_keeps_lists() {
        let mut values: FormValues = [("empty", ""), ("tag", ""), ("tag", "x")].into_iter().collect();
        values.remove_blank();

        assert!(!values.contains_key("empty"));
        assert!(values.contains_key("tag"));
    }

    #[test]
    fn items_split_and_trim() {
        assert_eq!(RawValue::One("1, 2 ,3").items(), vec!["1", "2", "3"]);
        assert_eq!(RawValue::One("").items(), Vec::<&str>::new());

        let many = vec!["a".to_string(), " b".to_string()];
        assert_eq!(RawValue::Many(&many).items(), vec!["a", " b"]);
        assert_eq!(RawValue::Many(&many).first(), Some("a"));
    }
}
