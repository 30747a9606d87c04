//! aggrel Core - Aggregate-to-relational mapping kernel
//!
//! This crate provides the backend-independent half of the persistence engine:
//! - Aggregate, entity and value-object descriptors (static shape metadata)
//! - The dynamic `Value` / `Record` model and typed conversions
//! - TypeCodec for primitives without a native SQL representation
//! - SchemaCompiler deriving root and child table layouts
//! - AggregateMapper and CollectionPersister (aggregate <-> rows)
//! - The uniform repository error taxonomy and backend error rule table
//! - Schema registry and structured logging facility

pub mod codec;
pub mod collections;
pub mod descriptor;
pub mod error_rules;
pub mod errors;
pub mod logging_facility;
pub mod mapper;
pub mod naming;
pub mod registry;
pub mod schema;
pub mod value;

/// Canonical logging field and event names, re-exported for the macros
pub use aggrel_core_types::schema as log_schema;

// Re-export commonly used types
pub use codec::{CodecError, SqlValue};
pub use descriptor::{
    AggregateDescriptor, ElementDescriptor, ElementKind, FieldDescriptor, FieldKind,
    PrimitiveType, ShapeDescriptor,
};
pub use errors::{BackendError, RepoError, RepoErrorKind, Result};
pub use mapper::{AggregateMapper, Row, RowSet};
pub use registry::{RegistryError, SchemaRegistry};
pub use schema::{ChildTable, CollectionKind, CompiledSchema, SchemaCompiler, SchemaError, TableLayout};
pub use value::{Aggregate, FromValue, IntoValue, Record, Value};
