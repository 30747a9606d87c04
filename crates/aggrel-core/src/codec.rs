//! TypeCodec: domain primitives <-> storage column values
//!
//! Encoding rules:
//! - `Uuid` is stored as canonical hyphenated text (16-byte blobs decode too)
//! - `DateTime` is stored as ISO-8601 UTC text with millisecond precision
//!   (`YYYY-MM-DDTHH:mm:ss.sssZ`)
//! - `bool` is stored as integer `1` / `0`; any nonzero integer decodes `true`
//! - `int` / `double` use native INTEGER / REAL columns; the declared field
//!   type drives decoding, so a whole-number double stays a double
//! - `null` is the backend null marker for every kind

use crate::descriptor::PrimitiveType;
use crate::value::Value;
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Storage-native column value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Integer(i) => i.to_string(),
            SqlValue::Real(f) => f.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Blob(b) => format!("<{} byte blob>", b.len()),
        }
    }
}

/// Declared SQL column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// Encode/decode failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {value} does not fit in {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("malformed stored {} value `{stored}`: {reason}", .kind.label())]
    Malformed {
        kind: PrimitiveType,
        stored: String,
        reason: String,
    },

    #[error("missing column `{column}`")]
    MissingColumn { column: String },

    #[error("field `{field}`: {source}")]
    InField {
        field: String,
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    /// Prefix the error with a field path segment
    pub fn in_field(self, field: &str) -> CodecError {
        match self {
            CodecError::InField {
                field: inner,
                source,
            } => {
                let joined = if inner.starts_with('[') {
                    format!("{}{}", field, inner)
                } else {
                    format!("{}.{}", field, inner)
                };
                CodecError::InField {
                    field: joined,
                    source,
                }
            }
            other => CodecError::InField {
                field: field.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with field context stripped
    pub fn root_cause(&self) -> &CodecError {
        match self {
            CodecError::InField { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Render a timestamp in the canonical stored form
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stateless codec for domain primitives
pub struct TypeCodec;

impl TypeCodec {
    /// Declared column type for a primitive kind
    pub fn column_type(ty: PrimitiveType) -> ColumnType {
        match ty {
            PrimitiveType::Bool | PrimitiveType::Int => ColumnType::Integer,
            PrimitiveType::Float => ColumnType::Real,
            PrimitiveType::Text | PrimitiveType::Uuid | PrimitiveType::DateTime => {
                ColumnType::Text
            }
        }
    }

    /// Encode a domain value declared as `ty`
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] if the value does not match `ty`
    /// and [`CodecError::OutOfRange`] for NaN/infinite floats and timestamps
    /// outside years 0000-9999, which the stored forms cannot carry.
    pub fn encode(value: &Value, ty: PrimitiveType) -> Result<SqlValue, CodecError> {
        let encoded = match (value, ty) {
            (Value::Null, _) => SqlValue::Null,
            (Value::Bool(b), PrimitiveType::Bool) => SqlValue::Integer(i64::from(*b)),
            (Value::Int(i), PrimitiveType::Int) => SqlValue::Integer(*i),
            (Value::Float(f), PrimitiveType::Float) if !f.is_finite() => {
                return Err(CodecError::OutOfRange {
                    value: f.to_string(),
                    target: ty.label(),
                })
            }
            (Value::Float(f), PrimitiveType::Float) => SqlValue::Real(*f),
            (Value::Int(i), PrimitiveType::Float) => SqlValue::Real(*i as f64),
            (Value::Text(s), PrimitiveType::Text) => SqlValue::Text(s.clone()),
            (Value::Uuid(u), PrimitiveType::Uuid) => SqlValue::Text(u.hyphenated().to_string()),
            (Value::DateTime(dt), PrimitiveType::DateTime) => {
                if !(0..=9999).contains(&dt.year()) {
                    return Err(CodecError::OutOfRange {
                        value: dt.to_rfc3339(),
                        target: ty.label(),
                    });
                }
                SqlValue::Text(format_datetime(dt))
            }
            (other, ty) => {
                return Err(CodecError::TypeMismatch {
                    expected: ty.label(),
                    found: other.kind_name(),
                })
            }
        };
        Ok(encoded)
    }

    /// Decode a stored value into the declared kind `ty`
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] when the stored value cannot
    /// represent `ty`. Defaults are never substituted.
    pub fn decode(stored: &SqlValue, ty: PrimitiveType) -> Result<Value, CodecError> {
        if stored.is_null() {
            return Ok(Value::Null);
        }
        let malformed = |reason: &str| CodecError::Malformed {
            kind: ty,
            stored: stored.describe(),
            reason: reason.to_string(),
        };

        match ty {
            PrimitiveType::Bool => match stored {
                SqlValue::Integer(i) => Ok(Value::Bool(*i != 0)),
                SqlValue::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(|i| Value::Bool(i != 0))
                    .map_err(|_| malformed("not an integer flag")),
                _ => Err(malformed("not an integer flag")),
            },
            PrimitiveType::Int => match stored {
                SqlValue::Integer(i) => Ok(Value::Int(*i)),
                SqlValue::Real(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                    Ok(Value::Int(*f as i64))
                }
                SqlValue::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| malformed(&e.to_string())),
                _ => Err(malformed("not an integer")),
            },
            PrimitiveType::Float => match stored {
                SqlValue::Real(f) => Ok(Value::Float(*f)),
                SqlValue::Integer(i) => Ok(Value::Float(*i as f64)),
                SqlValue::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| malformed(&e.to_string())),
                SqlValue::Blob(_) | SqlValue::Null => Err(malformed("not a number")),
            },
            PrimitiveType::Text => match stored {
                SqlValue::Text(s) => Ok(Value::Text(s.clone())),
                _ => Err(malformed("not text")),
            },
            PrimitiveType::Uuid => match stored {
                SqlValue::Text(s) => Uuid::parse_str(s)
                    .map(Value::Uuid)
                    .map_err(|e| malformed(&e.to_string())),
                SqlValue::Blob(bytes) => Uuid::from_slice(bytes)
                    .map(Value::Uuid)
                    .map_err(|e| malformed(&e.to_string())),
                _ => Err(malformed("not a uuid")),
            },
            PrimitiveType::DateTime => match stored {
                SqlValue::Text(s) => DateTime::parse_from_rfc3339(s)
                    .map(|dt| Value::DateTime(dt.with_timezone(&Utc)))
                    .map_err(|e| malformed(&e.to_string())),
                SqlValue::Integer(ms) => DateTime::from_timestamp_millis(*ms)
                    .map(Value::DateTime)
                    .ok_or_else(|| malformed("epoch milliseconds out of range")),
                _ => Err(malformed("not a timestamp")),
            },
        }
    }
}
