//! SchemaCompiler: aggregate descriptors -> relational table layouts
//!
//! # Layout rules
//!
//! - Primitive fields become one column named after the snake_cased field.
//! - Embedded value objects and entities are flattened into the owning table
//!   with `prefix_subfield` column names; nesting concatenates prefixes.
//! - Every list/set/map field gets a child table `<root>_<column path>` with a
//!   `<root>_id` foreign key (`ON DELETE CASCADE`), an `index` column for
//!   lists, a `key` column for maps, and the element columns: `value` for
//!   primitives, flattened columns for value objects, the entity id plus
//!   flattened columns for entities.
//!
//! Unsupported shapes are rejected at compile time with the field, the
//! offending type and a corrective suggestion.

use crate::codec::{ColumnType, TypeCodec};
use crate::descriptor::{
    AggregateDescriptor, ElementDescriptor, ElementKind, FieldDescriptor, FieldKind,
    PrimitiveType, ShapeDescriptor, ID_FIELD,
};
use crate::naming::{quote_ident, resource_path, snake_case};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Column holding a list element's position
pub const INDEX_COLUMN: &str = "index";
/// Column holding a map entry's key
pub const KEY_COLUMN: &str = "key";
/// Column holding a primitive collection element
pub const VALUE_COLUMN: &str = "value";

/// Why a field shape was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NestedCollection,
    DynamicType,
    CrossAggregate,
    MissingId,
    DuplicateColumn(String),
    ReservedColumn(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NestedCollection => f.write_str("collections cannot be nested"),
            RejectReason::DynamicType => f.write_str("statically erased types cannot be mapped"),
            RejectReason::CrossAggregate => {
                f.write_str("another aggregate root cannot be embedded")
            }
            RejectReason::MissingId => f.write_str("an identity field `id: Uuid` is required"),
            RejectReason::DuplicateColumn(col) => {
                write!(f, "column `{}` is produced more than once", col)
            }
            RejectReason::ReservedColumn(col) => {
                write!(f, "column `{}` collides with a reserved child-table column", col)
            }
        }
    }
}

/// Schema compilation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("invalid identifier `{name}` (derived `{derived}`): names must not start or end with `_` or contain `__`")]
    InvalidName { name: String, derived: String },

    #[error("field `{field}` of type `{offending_type}`: {reason}. Suggestion: {suggestion}")]
    Rejected {
        field: String,
        offending_type: String,
        reason: RejectReason,
        suggestion: String,
    },
}

impl SchemaError {
    fn rejected(
        field: &str,
        offending_type: impl Into<String>,
        reason: RejectReason,
        suggestion: impl Into<String>,
    ) -> Self {
        SchemaError::Rejected {
            field: field.to_string(),
            offending_type: offending_type.into(),
            reason,
            suggestion: suggestion.into(),
        }
    }

    /// Rejection reason, if this is a rejected shape
    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            SchemaError::Rejected { reason, .. } => Some(reason),
            SchemaError::InvalidName { .. } => None,
        }
    }
}

/// One table column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

/// Foreign key from a child table to the root table
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub on_delete_cascade: bool,
}

/// Derived physical layout of one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub table_name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableLayout {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// `CREATE TABLE` statement for this layout
    pub fn create_table_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                format!(
                    "    {} {}{}",
                    quote_ident(&c.name),
                    c.column_type.sql_name(),
                    if c.nullable { "" } else { " NOT NULL" }
                )
            })
            .collect();
        if !self.primary_key.is_empty() {
            parts.push(format!(
                "    PRIMARY KEY ({})",
                self.primary_key
                    .iter()
                    .map(|c| quote_ident(c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        for fk in &self.foreign_keys {
            parts.push(format!(
                "    FOREIGN KEY ({}) REFERENCES {} ({}){}",
                quote_ident(&fk.column),
                quote_ident(&fk.references_table),
                quote_ident(&fk.references_column),
                if fk.on_delete_cascade {
                    " ON DELETE CASCADE"
                } else {
                    ""
                }
            ));
        }
        format!(
            "CREATE TABLE {} (\n{}\n)",
            quote_ident(&self.table_name),
            parts.join(",\n")
        )
    }
}

/// Collection flavour of a child table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    Set,
    Map,
}

impl CollectionKind {
    pub fn label(&self) -> &'static str {
        match self {
            CollectionKind::List => "list",
            CollectionKind::Set => "set",
            CollectionKind::Map => "map",
        }
    }
}

/// Compiled mapping for one field of a flattened shape
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPlan {
    Column {
        field: String,
        column: String,
        ty: PrimitiveType,
        nullable: bool,
    },
    Embedded {
        field: String,
        nullable: bool,
        fields: Vec<FieldPlan>,
    },
    Collection {
        field: String,
        child: usize,
    },
}

/// Compiled mapping for a collection element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementPlan {
    Primitive {
        ty: PrimitiveType,
        nullable: bool,
    },
    Object {
        nullable: bool,
        fields: Vec<FieldPlan>,
    },
}

/// A collection field and its child table
#[derive(Debug, Clone, PartialEq)]
pub struct ChildTable {
    /// Field names from the root down to the collection field
    pub field_path: Vec<String>,
    pub collection: CollectionKind,
    pub element: ElementPlan,
    pub layout: TableLayout,
    /// Foreign key column referencing the root id
    pub parent_column: String,
}

impl ChildTable {
    pub fn table_name(&self) -> &str {
        &self.layout.table_name
    }

    pub fn field_label(&self) -> String {
        self.field_path.join(".")
    }
}

/// Immutable compiled schema for one aggregate type
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    descriptor: AggregateDescriptor,
    root: TableLayout,
    root_plan: Vec<FieldPlan>,
    children: Vec<ChildTable>,
}

impl CompiledSchema {
    pub fn descriptor(&self) -> &AggregateDescriptor {
        &self.descriptor
    }

    pub fn type_name(&self) -> &str {
        &self.descriptor.type_name
    }

    pub fn root(&self) -> &TableLayout {
        &self.root
    }

    pub fn root_table(&self) -> &str {
        &self.root.table_name
    }

    pub fn root_plan(&self) -> &[FieldPlan] {
        &self.root_plan
    }

    pub fn id_column(&self) -> &'static str {
        ID_FIELD
    }

    pub fn children(&self) -> &[ChildTable] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&ChildTable> {
        self.children.get(index)
    }

    /// REST-style collection path (`/orders`)
    pub fn resource_path(&self) -> String {
        // Type name was validated during compilation.
        resource_path(&self.descriptor.type_name).unwrap_or_else(|_| format!("/{}", self.root.table_name))
    }

    /// Ordered DDL: root table first, then every child table and its index
    pub fn create_table_statements(&self) -> Vec<String> {
        let mut statements = vec![self.root.create_table_sql()];
        for child in &self.children {
            statements.push(child.layout.create_table_sql());
            statements.push(format!(
                "CREATE INDEX {} ON {} ({})",
                quote_ident(&format!("idx_{}_{}", child.table_name(), child.parent_column)),
                quote_ident(child.table_name()),
                quote_ident(&child.parent_column)
            ));
        }
        statements
    }

    /// SHA-256 hex digest of the DDL, used to detect schema drift
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for statement in self.create_table_statements() {
            hasher.update(statement.as_bytes());
            hasher.update(b";\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// Tracks column names for one table and rejects collisions
struct ColumnSet {
    columns: Vec<ColumnDef>,
    names: HashSet<String>,
    reserved: HashSet<String>,
}

impl ColumnSet {
    fn new(reserved: &[&str]) -> Self {
        Self {
            columns: Vec::new(),
            names: HashSet::new(),
            reserved: reserved.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn add_reserved(&mut self, name: &str, column_type: ColumnType) {
        self.names.insert(name.to_string());
        self.columns.push(ColumnDef {
            name: name.to_string(),
            column_type,
            nullable: false,
        });
    }

    fn add(
        &mut self,
        field: &str,
        name: String,
        column_type: ColumnType,
        nullable: bool,
    ) -> Result<(), SchemaError> {
        if self.reserved.contains(&name) {
            return Err(SchemaError::rejected(
                field,
                column_type.sql_name(),
                RejectReason::ReservedColumn(name),
                "rename the field inside the collection element",
            ));
        }
        if !self.names.insert(name.clone()) {
            return Err(SchemaError::rejected(
                field,
                column_type.sql_name(),
                RejectReason::DuplicateColumn(name),
                "rename one of the fields so the flattened column names differ",
            ));
        }
        self.columns.push(ColumnDef {
            name,
            column_type,
            nullable,
        });
        Ok(())
    }
}

/// Derives table layouts from aggregate descriptors
pub struct SchemaCompiler;

impl SchemaCompiler {
    /// Compile an aggregate descriptor
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for invalid identifiers or unsupported shapes.
    pub fn compile(descriptor: &AggregateDescriptor) -> Result<CompiledSchema, SchemaError> {
        let root_table = snake_case(&descriptor.type_name)?;
        require_id(&descriptor.type_name, &descriptor.fields, &descriptor.type_name)?;

        let mut ctx = Context {
            root_table: root_table.clone(),
            parent_column: format!("{}_{}", root_table, ID_FIELD),
            children: Vec::new(),
        };
        let mut columns = ColumnSet::new(&[]);
        let root_plan = ctx.plan_fields(
            &descriptor.fields,
            None,
            &[],
            &descriptor.type_name,
            false,
            false,
            &mut columns,
        )?;

        let mut root_columns = columns.columns;
        for column in &mut root_columns {
            if column.name == ID_FIELD {
                column.nullable = false;
            }
        }

        Ok(CompiledSchema {
            descriptor: descriptor.clone(),
            root: TableLayout {
                table_name: root_table,
                columns: root_columns,
                primary_key: vec![ID_FIELD.to_string()],
                foreign_keys: Vec::new(),
            },
            root_plan,
            children: ctx.children,
        })
    }
}

struct Context {
    root_table: String,
    parent_column: String,
    children: Vec<ChildTable>,
}

impl Context {
    #[allow(clippy::too_many_arguments)]
    fn plan_fields(
        &mut self,
        fields: &[FieldDescriptor],
        prefix: Option<&str>,
        path: &[String],
        owner: &str,
        in_collection: bool,
        parent_nullable: bool,
        columns: &mut ColumnSet,
    ) -> Result<Vec<FieldPlan>, SchemaError> {
        let mut plans = Vec::with_capacity(fields.len());
        for field in fields {
            let label = format!("{}.{}", owner, field.name);
            let column = match prefix {
                Some(p) => format!("{}_{}", p, snake_case(&field.name)?),
                None => snake_case(&field.name)?,
            };
            let mut field_path = path.to_vec();
            field_path.push(field.name.clone());
            let nullable = parent_nullable || field.nullable;

            let plan = match &field.kind {
                FieldKind::Primitive(ty) => {
                    columns.add(&label, column.clone(), TypeCodec::column_type(*ty), nullable)?;
                    FieldPlan::Column {
                        field: field.name.clone(),
                        column,
                        ty: *ty,
                        nullable: field.nullable,
                    }
                }
                FieldKind::Value(shape) | FieldKind::Entity(shape) => {
                    if matches!(field.kind, FieldKind::Entity(_)) {
                        require_id(&label, &shape.fields, &shape.type_name)?;
                    }
                    let nested = self.plan_fields(
                        &shape.fields,
                        Some(&column),
                        &field_path,
                        &shape.type_name,
                        in_collection,
                        nullable,
                        columns,
                    )?;
                    FieldPlan::Embedded {
                        field: field.name.clone(),
                        nullable: field.nullable,
                        fields: nested,
                    }
                }
                FieldKind::List(element) | FieldKind::Set(element) | FieldKind::Map(element) => {
                    if in_collection {
                        return Err(SchemaError::rejected(
                            &label,
                            field.type_label(),
                            RejectReason::NestedCollection,
                            "store the inner collection on the aggregate root or model the element as an entity with its own aggregate",
                        ));
                    }
                    let collection = match field.kind {
                        FieldKind::List(_) => CollectionKind::List,
                        FieldKind::Set(_) => CollectionKind::Set,
                        _ => CollectionKind::Map,
                    };
                    let child = self.plan_child(&label, field, element, collection, &column, field_path)?;
                    FieldPlan::Collection {
                        field: field.name.clone(),
                        child,
                    }
                }
                FieldKind::Dynamic => {
                    return Err(SchemaError::rejected(
                        &label,
                        field.type_label(),
                        RejectReason::DynamicType,
                        "declare a concrete primitive, value object or entity type",
                    ))
                }
                FieldKind::AggregateRef(name) => {
                    return Err(SchemaError::rejected(
                        &label,
                        name.clone(),
                        RejectReason::CrossAggregate,
                        format!("store a reference id (`{}Id: Uuid`) instead", lower_first(name)),
                    ))
                }
            };
            plans.push(plan);
        }
        Ok(plans)
    }

    fn plan_child(
        &mut self,
        label: &str,
        field: &FieldDescriptor,
        element: &ElementDescriptor,
        collection: CollectionKind,
        column: &str,
        field_path: Vec<String>,
    ) -> Result<usize, SchemaError> {
        let table_name = format!("{}_{}", self.root_table, column);
        let parent_column = self.parent_column.clone();

        let mut reserved = vec![parent_column.as_str()];
        match collection {
            CollectionKind::List => reserved.push(INDEX_COLUMN),
            CollectionKind::Map => reserved.push(KEY_COLUMN),
            CollectionKind::Set => {}
        }
        let mut columns = ColumnSet::new(&reserved);
        columns.add_reserved(&parent_column, ColumnType::Text);
        let mut primary_key = Vec::new();
        match collection {
            CollectionKind::List => {
                columns.add_reserved(INDEX_COLUMN, ColumnType::Integer);
                primary_key = vec![parent_column.clone(), INDEX_COLUMN.to_string()];
            }
            CollectionKind::Map => {
                columns.add_reserved(KEY_COLUMN, ColumnType::Text);
                primary_key = vec![parent_column.clone(), KEY_COLUMN.to_string()];
            }
            CollectionKind::Set => {}
        }

        let element_plan = match &element.kind {
            ElementKind::Primitive(ty) => {
                columns.add(
                    label,
                    VALUE_COLUMN.to_string(),
                    TypeCodec::column_type(*ty),
                    element.nullable,
                )?;
                ElementPlan::Primitive {
                    ty: *ty,
                    nullable: element.nullable,
                }
            }
            ElementKind::Value(shape) | ElementKind::Entity(shape) => {
                if matches!(element.kind, ElementKind::Entity(_)) {
                    require_id(label, &shape.fields, &shape.type_name)?;
                }
                reject_inner_collections(label, field, shape)?;
                let fields = self.plan_fields(
                    &shape.fields,
                    None,
                    &[],
                    &shape.type_name,
                    true,
                    element.nullable,
                    &mut columns,
                )?;
                ElementPlan::Object {
                    nullable: element.nullable,
                    fields,
                }
            }
            ElementKind::Collection(_) => {
                return Err(SchemaError::rejected(
                    label,
                    field.type_label(),
                    RejectReason::NestedCollection,
                    "wrap the inner collection in an entity stored in its own aggregate, or flatten it",
                ))
            }
            ElementKind::Dynamic => {
                return Err(SchemaError::rejected(
                    label,
                    field.type_label(),
                    RejectReason::DynamicType,
                    "declare a concrete element type",
                ))
            }
            ElementKind::AggregateRef(name) => {
                return Err(SchemaError::rejected(
                    label,
                    field.type_label(),
                    RejectReason::CrossAggregate,
                    format!(
                        "store a collection of reference ids (`List<Uuid>`) instead of `{}` roots",
                        name
                    ),
                ))
            }
        };

        self.children.push(ChildTable {
            field_path,
            collection,
            element: element_plan,
            layout: TableLayout {
                table_name,
                columns: columns.columns,
                primary_key,
                foreign_keys: vec![ForeignKey {
                    column: parent_column.clone(),
                    references_table: self.root_table.clone(),
                    references_column: ID_FIELD.to_string(),
                    on_delete_cascade: true,
                }],
            },
            parent_column,
        });
        Ok(self.children.len() - 1)
    }
}

fn require_id(label: &str, fields: &[FieldDescriptor], type_name: &str) -> Result<(), SchemaError> {
    let has_id = fields.iter().any(|f| {
        f.name == ID_FIELD && f.kind == FieldKind::Primitive(PrimitiveType::Uuid) && !f.nullable
    });
    if has_id {
        Ok(())
    } else {
        Err(SchemaError::rejected(
            label,
            type_name,
            RejectReason::MissingId,
            format!("add a non-nullable `id: Uuid` field to `{}`", type_name),
        ))
    }
}

/// Element shapes stored in a child table must be flat
fn reject_inner_collections(
    label: &str,
    field: &FieldDescriptor,
    shape: &ShapeDescriptor,
) -> Result<(), SchemaError> {
    for inner in &shape.fields {
        match &inner.kind {
            kind if kind.is_collection() => {
                return Err(SchemaError::rejected(
                    &format!("{}.{}", label, inner.name),
                    field.type_label(),
                    RejectReason::NestedCollection,
                    format!(
                        "`{}` is used as a collection element and cannot own the collection `{}`; move it to the aggregate root",
                        shape.type_name, inner.name
                    ),
                ))
            }
            FieldKind::Value(nested) | FieldKind::Entity(nested) => {
                reject_inner_collections(label, field, nested)?
            }
            _ => {}
        }
    }
    Ok(())
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
