//! AggregateMapper: aggregate records <-> root and child rows
//!
//! The mapper walks the compiled field plans, so it never re-derives names.
//! A nullable embedded object whose columns all read back null (and whose
//! nested collections are empty) is reconstructed as `null`.

use crate::codec::{CodecError, SqlValue, TypeCodec};
use crate::collections::CollectionPersister;
use crate::descriptor::ID_FIELD;
use crate::schema::{CompiledSchema, FieldPlan};
use crate::value::{Aggregate, Record, Value};
use std::collections::BTreeMap;

/// One table row, keyed by column name
pub type Row = BTreeMap<String, SqlValue>;

/// Root row plus child rows for one aggregate instance
///
/// `children[i]` holds the rows for `schema.children()[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub root: Row,
    pub children: Vec<Vec<Row>>,
}

impl RowSet {
    pub fn child_row_count(&self) -> usize {
        self.children.iter().map(Vec::len).sum()
    }
}

/// Converts between aggregate records and rows for one compiled schema
#[derive(Debug, Clone, Copy)]
pub struct AggregateMapper<'s> {
    schema: &'s CompiledSchema,
}

impl<'s> AggregateMapper<'s> {
    pub fn new(schema: &'s CompiledSchema) -> Self {
        Self { schema }
    }

    /// Flatten an aggregate record into its root row and child rows
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] naming the offending field path when a value
    /// does not match its declared type or a non-nullable field is null.
    pub fn to_rows(&self, record: &Record) -> Result<RowSet, CodecError> {
        let parent_id = match record.get(ID_FIELD) {
            Value::Uuid(id) => SqlValue::Text(id.hyphenated().to_string()),
            other => {
                return Err(CodecError::TypeMismatch {
                    expected: "Uuid",
                    found: other.kind_name(),
                }
                .in_field(ID_FIELD))
            }
        };

        let schema = self.schema;
        let mut children = vec![Vec::new(); schema.children().len()];
        let mut root = Row::new();
        encode_fields(
            schema.root_plan(),
            Some(record),
            &mut root,
            &mut |index, value| {
                if let Some(child) = schema.child(index) {
                    children[index] = CollectionPersister::write_rows(child, &parent_id, value)?;
                }
                Ok(())
            },
        )?;
        Ok(RowSet { root, children })
    }

    /// Rebuild an aggregate record from its root row and child rows
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for missing columns or undecodable values.
    pub fn from_rows(&self, rows: &RowSet) -> Result<Record, CodecError> {
        let schema = self.schema;
        decode_fields(schema.root_plan(), &rows.root, &mut |index| {
            let child = schema.child(index).ok_or_else(|| CodecError::MissingColumn {
                column: format!("child table #{}", index),
            })?;
            let child_rows = rows.children.get(index).map(Vec::as_slice).unwrap_or(&[]);
            CollectionPersister::read_rows(child, child_rows)
        })
    }

    /// Typed variant of [`AggregateMapper::to_rows`]
    ///
    /// # Errors
    ///
    /// See [`AggregateMapper::to_rows`].
    pub fn aggregate_to_rows<T: Aggregate>(&self, aggregate: &T) -> Result<RowSet, CodecError> {
        self.to_rows(&aggregate.to_record())
    }

    /// Typed variant of [`AggregateMapper::from_rows`]
    ///
    /// # Errors
    ///
    /// See [`AggregateMapper::from_rows`].
    pub fn rows_to_aggregate<T: Aggregate>(&self, rows: &RowSet) -> Result<T, CodecError> {
        T::from_record(self.from_rows(rows)?)
    }
}

/// Write the columns of a flattened shape into `row`
///
/// `record == None` means the owning object is absent: every column is
/// written as null and collections receive `Value::Null`.
pub(crate) fn encode_fields(
    fields: &[FieldPlan],
    record: Option<&Record>,
    row: &mut Row,
    on_collection: &mut dyn FnMut(usize, &Value) -> Result<(), CodecError>,
) -> Result<(), CodecError> {
    for plan in fields {
        match plan {
            FieldPlan::Column {
                field,
                column,
                ty,
                nullable,
            } => {
                let value = record.map(|r| r.get(field)).unwrap_or(&Value::Null);
                if value.is_null() && record.is_some() && !nullable {
                    return Err(null_in(field, ty.label()));
                }
                let stored = TypeCodec::encode(value, *ty).map_err(|e| e.in_field(field))?;
                row.insert(column.clone(), stored);
            }
            FieldPlan::Embedded {
                field,
                nullable,
                fields,
            } => {
                let value = record.map(|r| r.get(field)).unwrap_or(&Value::Null);
                let nested = match value {
                    Value::Object(nested) => Some(nested),
                    Value::Null if record.is_none() || *nullable => None,
                    Value::Null => return Err(null_in(field, "object")),
                    other => {
                        return Err(CodecError::TypeMismatch {
                            expected: "object",
                            found: other.kind_name(),
                        }
                        .in_field(field))
                    }
                };
                encode_fields(fields, nested, row, on_collection).map_err(|e| e.in_field(field))?;
            }
            FieldPlan::Collection { field, child } => {
                let value = record.map(|r| r.get(field)).unwrap_or(&Value::Null);
                on_collection(*child, value).map_err(|e| e.in_field(field))?;
            }
        }
    }
    Ok(())
}

/// Read the columns of a flattened shape from `row`
pub(crate) fn decode_fields(
    fields: &[FieldPlan],
    row: &Row,
    on_collection: &mut dyn FnMut(usize) -> Result<Value, CodecError>,
) -> Result<Record, CodecError> {
    let mut record = Record::new();
    for plan in fields {
        match plan {
            FieldPlan::Column {
                field, column, ty, ..
            } => {
                let stored = row.get(column).ok_or_else(|| {
                    CodecError::MissingColumn {
                        column: column.clone(),
                    }
                    .in_field(field)
                })?;
                let value = TypeCodec::decode(stored, *ty).map_err(|e| e.in_field(field))?;
                record.set(field.clone(), value);
            }
            FieldPlan::Embedded {
                field,
                nullable,
                fields,
            } => {
                let nested =
                    decode_fields(fields, row, on_collection).map_err(|e| e.in_field(field))?;
                if *nullable && is_vacant(&nested) {
                    record.set(field.clone(), Value::Null);
                } else {
                    record.set(field.clone(), Value::Object(nested));
                }
            }
            FieldPlan::Collection { field, child } => {
                let value = on_collection(*child).map_err(|e| e.in_field(field))?;
                record.set(field.clone(), value);
            }
        }
    }
    Ok(record)
}

/// True when every field is null, an empty collection or a vacant object
pub(crate) fn is_vacant(record: &Record) -> bool {
    record.iter().all(|(_, value)| match value {
        Value::Null => true,
        Value::List(items) | Value::Set(items) => items.is_empty(),
        Value::Map(entries) => entries.is_empty(),
        Value::Object(nested) => is_vacant(nested),
        _ => false,
    })
}

fn null_in(field: &str, expected: &'static str) -> CodecError {
    CodecError::TypeMismatch {
        expected,
        found: "null",
    }
    .in_field(field)
}
