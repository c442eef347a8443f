use std::collections::BTreeMap;

use super::value::{AsFieldName, FieldKey};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorMap(BTreeMap<FieldKey, String>);

impl ErrorMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, field: impl AsFieldName) -> Option<&str> {
        self.0.get(field.field_name()).map(String::as_str)
    }

    pub fn contains(&self, field: impl AsFieldName) -> bool {
        self.0.contains_key(field.field_name())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> + '_ {
        self.0.iter().map(|(key, message)| (*key, message.as_str()))
    }

    pub fn first(&self) -> Option<(FieldKey, &str)> {
        self.iter().next()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(super) fn set_field(&mut self, key: FieldKey, message: Option<String>) {
        match message {
            Some(message) => {
                self.0.insert(key, message);
            }
            None => {
                self.0.remove(&key);
            }
        }
    }

    pub(super) fn replace_all(&mut self, next: ErrorMap) {
        *self = next;
    }

    pub(super) fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<(FieldKey, String)> for ErrorMap {
    fn from_iter<I: IntoIterator<Item = (FieldKey, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
