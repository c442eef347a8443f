use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use super::controller::{FormError, FormResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        self.0
    }
}

pub trait AsFieldName {
    fn field_name(&self) -> &str;
}

impl AsFieldName for FieldKey {
    fn field_name(&self) -> &str {
        self.0
    }
}

impl AsFieldName for &str {
    fn field_name(&self) -> &str {
        self
    }
}

impl AsFieldName for String {
    fn field_name(&self) -> &str {
        self.as_str()
    }
}

impl AsFieldName for &String {
    fn field_name(&self) -> &str {
        self.as_str()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum FieldValue {
    #[default]
    Unset,
    Text(String),
    Number(Decimal),
    Bool(bool),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_unset(&self) -> bool {
        matches!(self, FieldValue::Unset)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Unset => "unset",
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::Bool(_) => "bool",
            FieldValue::List(_) => "list",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(Decimal::from(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(Decimal::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

pub trait IntoFieldValue {
    fn into_field_value(self) -> FieldValue;
}

macro_rules! into_field_value_via_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoFieldValue for $ty {
                fn into_field_value(self) -> FieldValue {
                    FieldValue::from(self)
                }
            }
        )*
    };
}

into_field_value_via_from!(&str, String, Decimal, i64, i32, bool, Vec<String>);

impl IntoFieldValue for FieldValue {
    fn into_field_value(self) -> FieldValue {
        self
    }
}

impl IntoFieldValue for f64 {
    fn into_field_value(self) -> FieldValue {
        decimal_from_f64(self).map_or(FieldValue::Unset, FieldValue::Number)
    }
}

impl<T> IntoFieldValue for Option<T>
where
    T: IntoFieldValue,
{
    fn into_field_value(self) -> FieldValue {
        self.map_or(FieldValue::Unset, IntoFieldValue::into_field_value)
    }
}

pub trait FromFieldValue: Sized {
    fn from_field_value(key: FieldKey, value: Option<&FieldValue>) -> FormResult<Self>;
}

fn mismatch(key: FieldKey, expected: &'static str) -> FormError {
    FormError::ValueMismatch {
        field: key,
        expected,
    }
}

impl FromFieldValue for String {
    fn from_field_value(key: FieldKey, value: Option<&FieldValue>) -> FormResult<Self> {
        value
            .and_then(FieldValue::as_text)
            .map(str::to_string)
            .ok_or_else(|| mismatch(key, "text"))
    }
}

impl FromFieldValue for Decimal {
    fn from_field_value(key: FieldKey, value: Option<&FieldValue>) -> FormResult<Self> {
        value
            .and_then(FieldValue::as_number)
            .ok_or_else(|| mismatch(key, "number"))
    }
}

impl FromFieldValue for i64 {
    fn from_field_value(key: FieldKey, value: Option<&FieldValue>) -> FormResult<Self> {
        value
            .and_then(FieldValue::as_number)
            .filter(|number| number.fract().is_zero())
            .and_then(|number| number.to_i64())
            .ok_or_else(|| mismatch(key, "integer"))
    }
}

impl FromFieldValue for f64 {
    fn from_field_value(key: FieldKey, value: Option<&FieldValue>) -> FormResult<Self> {
        value
            .and_then(FieldValue::as_number)
            .and_then(|number| number.to_f64())
            .ok_or_else(|| mismatch(key, "number"))
    }
}

impl FromFieldValue for bool {
    fn from_field_value(key: FieldKey, value: Option<&FieldValue>) -> FormResult<Self> {
        value
            .and_then(FieldValue::as_bool)
            .ok_or_else(|| mismatch(key, "bool"))
    }
}

impl FromFieldValue for Vec<String> {
    fn from_field_value(key: FieldKey, value: Option<&FieldValue>) -> FormResult<Self> {
        value
            .and_then(FieldValue::as_list)
            .map(<[String]>::to_vec)
            .ok_or_else(|| mismatch(key, "list"))
    }
}

impl<T> FromFieldValue for Option<T>
where
    T: FromFieldValue,
{
    fn from_field_value(key: FieldKey, value: Option<&FieldValue>) -> FormResult<Self> {
        match value {
            None | Some(FieldValue::Unset) => Ok(None),
            Some(value) => T::from_field_value(key, Some(value)).map(Some),
        }
    }
}

pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;
    fn field_keys() -> Vec<FieldKey>;
    fn to_values(&self) -> FieldValues;
    fn from_values(values: &FieldValues) -> FormResult<Self>;
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldValues(BTreeMap<FieldKey, FieldValue>);

impl FieldValues {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, field: impl AsFieldName) -> Option<&FieldValue> {
        self.0.get(field.field_name())
    }

    pub fn insert(&mut self, key: FieldKey, value: impl IntoFieldValue) -> Option<FieldValue> {
        self.0.insert(key, value.into_field_value())
    }

    pub fn contains(&self, field: impl AsFieldName) -> bool {
        self.0.contains_key(field.field_name())
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &FieldValue)> + '_ {
        self.0.iter().map(|(key, value)| (*key, value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_model<M: FormModel>(&self) -> FormResult<M> {
        M::from_values(self)
    }

    pub(super) fn get_mut(&mut self, key: FieldKey) -> Option<&mut FieldValue> {
        self.0.get_mut(key.as_str())
    }
}

impl FromIterator<(FieldKey, FieldValue)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (FieldKey, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FieldValues {
    type Item = (&'a FieldKey, &'a FieldValue);
    type IntoIter = std::collections::btree_map::Iter<'a, FieldKey, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValuePatch(Vec<(String, FieldValue)>);

impl ValuePatch {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn set(mut self, field: impl AsFieldName, value: impl IntoFieldValue) -> Self {
        self.0
            .push((field.field_name().to_string(), value.into_field_value()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&FieldValues> for ValuePatch {
    fn from(values: &FieldValues) -> Self {
        Self(
            values
                .iter()
                .map(|(key, value)| (key.as_str().to_string(), value.clone()))
                .collect(),
        )
    }
}

fn decimal_from_f64(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|number| number.normalize())
}
