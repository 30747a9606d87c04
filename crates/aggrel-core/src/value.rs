//! Dynamic domain value model
//!
//! Aggregates cross the mapping boundary as a [`Record`]: an ordered map of
//! field name to [`Value`]. Typed domain structs convert to and from records
//! through [`IntoValue`] / [`FromValue`] and implement [`Aggregate`].

use crate::codec::CodecError;
use crate::descriptor::AggregateDescriptor;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};
use uuid::Uuid;

/// A domain value: primitive, embedded object, or collection
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Object(Record),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

static NULL: Value = Value::Null;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Uuid(_) => "uuid",
            Value::DateTime(_) => "datetime",
            Value::Object(_) => "object",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    /// Structural equality where sets compare by membership
    ///
    /// Lists stay order-sensitive; maps compare by key association.
    pub fn equivalent(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len()
                    && a.iter().all(|x| b.iter().any(|y| x.equivalent(y)))
                    && b.iter().all(|y| a.iter().any(|x| x.equivalent(y)))
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.equivalent(w)))
            }
            (Value::Object(a), Value::Object(b)) => a.equivalent(b),
            _ => self == other,
        }
    }

    /// Render as JSON for diagnostics and CLI output
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Text(s) => Json::String(s.clone()),
            Value::Uuid(u) => Json::String(u.to_string()),
            Value::DateTime(dt) => Json::String(crate::codec::format_datetime(dt)),
            Value::Object(record) => record.to_json(),
            Value::List(items) | Value::Set(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Field-name keyed bag of values for one object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field (builder style)
    pub fn with(mut self, name: impl Into<String>, value: impl IntoValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl IntoValue) {
        self.fields.insert(name.into(), value.into_value());
    }

    /// Get a field; absent fields read as `Null`
    pub fn get(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }

    /// Remove a field and convert it to `T`
    ///
    /// Conversion failures carry the field name.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, CodecError> {
        let value = self.fields.remove(name).unwrap_or(Value::Null);
        T::from_value(value).map_err(|e| e.in_field(name))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Structural equality where sets compare by membership and an absent
    /// field equals an explicit `Null`
    pub fn equivalent(&self, other: &Record) -> bool {
        let names: BTreeSet<&String> = self.fields.keys().chain(other.fields.keys()).collect();
        names
            .into_iter()
            .all(|name| self.get(name).equivalent(other.get(name)))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// An aggregate root persisted by the engine
///
/// Implementations supply the static descriptor and the conversion to and
/// from the dynamic record form.
pub trait Aggregate: Sized {
    /// Static shape of the aggregate
    fn descriptor() -> AggregateDescriptor;

    /// Identity of this instance
    fn id(&self) -> Uuid;

    fn to_record(&self) -> Record;

    /// Rebuild an instance from its record form
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] when a field is missing or of the wrong kind.
    fn from_record(record: Record) -> Result<Self, CodecError>;
}

// ========== Conversions ==========

/// Conversion into a domain [`Value`]
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion out of a domain [`Value`]
pub trait FromValue: Sized {
    /// # Errors
    ///
    /// Returns a [`CodecError::TypeMismatch`] when the value has the wrong kind.
    fn from_value(value: Value) -> Result<Self, CodecError>;
}

fn mismatch(expected: &'static str, found: &Value) -> CodecError {
    CodecError::TypeMismatch {
        expected,
        found: found.kind_name(),
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        Ok(value)
    }
}

impl IntoValue for Record {
    fn into_value(self) -> Value {
        Value::Object(self)
    }
}

impl FromValue for Record {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Object(record) => Ok(record),
            other => Err(mismatch("object", &other)),
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(mismatch("int", &other)),
        }
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| CodecError::OutOfRange {
            value: wide.to_string(),
            target: "i32",
        })
    }
}

impl IntoValue for u32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl FromValue for u32 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let wide = i64::from_value(value)?;
        u32::try_from(wide).map_err(|_| CodecError::OutOfRange {
            value: wide.to_string(),
            target: "u32",
        })
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Float(f) => Ok(f),
            // Widening only; never narrows a float to an int.
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl IntoValue for Uuid {
    fn into_value(self) -> Value {
        Value::Uuid(self)
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Uuid(u) => Ok(u),
            other => Err(mismatch("uuid", &other)),
        }
    }
}

impl IntoValue for DateTime<Utc> {
    fn into_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// Collections never observe `Null`: it reads back as an empty collection.

fn into_items(value: Value, expected: &'static str) -> Result<Vec<Value>, CodecError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::List(items) | Value::Set(items) => Ok(items),
        other => Err(mismatch(expected, &other)),
    }
}

fn into_entries(value: Value) -> Result<BTreeMap<String, Value>, CodecError> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Map(entries) => Ok(entries),
        other => Err(mismatch("map", &other)),
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        into_items(value, "list")?
            .into_iter()
            .enumerate()
            .map(|(i, item)| T::from_value(item).map_err(|e| e.in_field(&format!("[{}]", i))))
            .collect()
    }
}

impl<T: IntoValue, S> IntoValue for HashSet<T, S> {
    fn into_value(self) -> Value {
        Value::Set(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue + Eq + Hash, S: BuildHasher + Default> FromValue for HashSet<T, S> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        into_items(value, "set")?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<T: IntoValue> IntoValue for BTreeSet<T> {
    fn into_value(self) -> Value {
        Value::Set(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        into_items(value, "set")?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<T: IntoValue, S> IntoValue for HashMap<String, T, S> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k, v.into_value()))
                .collect(),
        )
    }
}

impl<T: FromValue, S: BuildHasher + Default> FromValue for HashMap<String, T, S> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        into_entries(value)?
            .into_iter()
            .map(|(k, v)| -> Result<(String, T), CodecError> {
                let item = T::from_value(v).map_err(|e| e.in_field(&k))?;
                Ok((k, item))
            })
            .collect()
    }
}

impl<T: IntoValue> IntoValue for BTreeMap<String, T> {
    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k, v.into_value()))
                .collect(),
        )
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        into_entries(value)?
            .into_iter()
            .map(|(k, v)| -> Result<(String, T), CodecError> {
                let item = T::from_value(v).map_err(|e| e.in_field(&k))?;
                Ok((k, item))
            })
            .collect()
    }
}
