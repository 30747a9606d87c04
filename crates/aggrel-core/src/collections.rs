//! CollectionPersister: list/set/map fields <-> child table rows
//!
//! - Lists carry a zero-based `index`; reads order by it
//! - Sets write one row per distinct element (by value equivalence)
//! - Maps carry the entry `key`
//! - A null collection writes zero rows and reads back empty

use crate::codec::{CodecError, SqlValue, TypeCodec};
use crate::mapper::{decode_fields, encode_fields, is_vacant, Row};
use crate::schema::{ChildTable, CollectionKind, ElementPlan, INDEX_COLUMN, KEY_COLUMN, VALUE_COLUMN};
use crate::value::Value;
use std::collections::BTreeMap;

pub struct CollectionPersister;

impl CollectionPersister {
    /// Rows for one collection value owned by `parent_id`
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] when the value is not the declared collection
    /// kind or an element does not match the element type.
    pub fn write_rows(
        child: &ChildTable,
        parent_id: &SqlValue,
        value: &Value,
    ) -> Result<Vec<Row>, CodecError> {
        let base = || {
            let mut row = Row::new();
            row.insert(child.parent_column.clone(), parent_id.clone());
            row
        };

        match (child.collection, value) {
            (_, Value::Null) => Ok(Vec::new()),
            (CollectionKind::List, Value::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let mut row = base();
                    row.insert(INDEX_COLUMN.to_string(), SqlValue::Integer(i as i64));
                    write_element(&child.element, item, &mut row)
                        .map_err(|e| e.in_field(&format!("[{}]", i)))?;
                    Ok(row)
                })
                .collect(),
            (CollectionKind::Set, Value::Set(items) | Value::List(items)) => {
                let mut distinct: Vec<&Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !distinct.iter().any(|seen| seen.equivalent(item)) {
                        distinct.push(item);
                    }
                }
                distinct
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let mut row = base();
                        write_element(&child.element, item, &mut row)
                            .map_err(|e| e.in_field(&format!("[{}]", i)))?;
                        Ok(row)
                    })
                    .collect()
            }
            (CollectionKind::Map, Value::Map(entries)) => entries
                .iter()
                .map(|(key, item)| {
                    let mut row = base();
                    row.insert(KEY_COLUMN.to_string(), SqlValue::Text(key.clone()));
                    write_element(&child.element, item, &mut row)
                        .map_err(|e| e.in_field(&format!("[{:?}]", key)))?;
                    Ok(row)
                })
                .collect(),
            (kind, other) => Err(CodecError::TypeMismatch {
                expected: kind.label(),
                found: other.kind_name(),
            }),
        }
    }

    /// Rebuild one collection value from its child rows
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for missing `index`/`key` columns or
    /// undecodable element values.
    pub fn read_rows(child: &ChildTable, rows: &[Row]) -> Result<Value, CodecError> {
        match child.collection {
            CollectionKind::List => {
                let mut indexed = Vec::with_capacity(rows.len());
                for row in rows {
                    let index = row
                        .get(INDEX_COLUMN)
                        .and_then(SqlValue::as_i64)
                        .ok_or_else(|| CodecError::MissingColumn {
                            column: INDEX_COLUMN.to_string(),
                        })?;
                    indexed.push((index, row));
                }
                indexed.sort_by_key(|(index, _)| *index);
                let items = indexed
                    .into_iter()
                    .map(|(index, row)| {
                        read_element(&child.element, row)
                            .map_err(|e| e.in_field(&format!("[{}]", index)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(items))
            }
            CollectionKind::Set => {
                let items = rows
                    .iter()
                    .map(|row| read_element(&child.element, row))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Set(items))
            }
            CollectionKind::Map => {
                let mut entries = BTreeMap::new();
                for row in rows {
                    let key = row
                        .get(KEY_COLUMN)
                        .and_then(SqlValue::as_str)
                        .ok_or_else(|| CodecError::MissingColumn {
                            column: KEY_COLUMN.to_string(),
                        })?;
                    let item = read_element(&child.element, row)
                        .map_err(|e| e.in_field(&format!("[{:?}]", key)))?;
                    entries.insert(key.to_string(), item);
                }
                Ok(Value::Map(entries))
            }
        }
    }
}

fn write_element(plan: &ElementPlan, item: &Value, row: &mut Row) -> Result<(), CodecError> {
    match plan {
        ElementPlan::Primitive { ty, nullable } => {
            if item.is_null() && !nullable {
                return Err(CodecError::TypeMismatch {
                    expected: ty.label(),
                    found: "null",
                });
            }
            row.insert(VALUE_COLUMN.to_string(), TypeCodec::encode(item, *ty)?);
            Ok(())
        }
        ElementPlan::Object { nullable, fields } => {
            let record = match item {
                Value::Object(record) => Some(record),
                Value::Null if *nullable => None,
                other => {
                    return Err(CodecError::TypeMismatch {
                        expected: "object",
                        found: other.kind_name(),
                    })
                }
            };
            encode_fields(fields, record, row, &mut no_nested_collections)
        }
    }
}

fn read_element(plan: &ElementPlan, row: &Row) -> Result<Value, CodecError> {
    match plan {
        ElementPlan::Primitive { ty, .. } => {
            let stored = row.get(VALUE_COLUMN).ok_or_else(|| CodecError::MissingColumn {
                column: VALUE_COLUMN.to_string(),
            })?;
            TypeCodec::decode(stored, *ty)
        }
        ElementPlan::Object { nullable, fields } => {
            let record = decode_fields(fields, row, &mut |_| Ok(Value::Null))?;
            if *nullable && is_vacant(&record) {
                Ok(Value::Null)
            } else {
                Ok(Value::Object(record))
            }
        }
    }
}

// Compiled element plans never contain collections.
fn no_nested_collections(_child: usize, _value: &Value) -> Result<(), CodecError> {
    Ok(())
}
