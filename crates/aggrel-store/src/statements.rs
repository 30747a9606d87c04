//! SQL text derived once per compiled schema

use aggrel_core::naming::quote_ident;
use aggrel_core::schema::INDEX_COLUMN;
use aggrel_core::{ChildTable, CollectionKind, CompiledSchema, Row, SqlValue, TableLayout};

#[derive(Debug, Clone)]
pub(crate) struct ChildStatements {
    pub table: String,
    pub columns: Vec<String>,
    pub insert: String,
    pub select: String,
    pub delete: String,
    pub count: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Statements {
    pub root_columns: Vec<String>,
    pub upsert_root: String,
    pub select_root: String,
    pub exists_root: String,
    pub delete_root: String,
    pub children: Vec<ChildStatements>,
}

impl Statements {
    pub fn new(schema: &CompiledSchema) -> Self {
        let root = schema.root();
        let table = quote_ident(&root.table_name);
        let id = quote_ident(schema.id_column());

        Self {
            root_columns: column_names(root),
            upsert_root: upsert_sql(root, schema.id_column()),
            select_root: format!("SELECT * FROM {} WHERE {} = ?1", table, id),
            exists_root: format!("SELECT 1 AS \"found\" FROM {} WHERE {} = ?1", table, id),
            delete_root: format!("DELETE FROM {} WHERE {} = ?1", table, id),
            children: schema.children().iter().map(child_statements).collect(),
        }
    }
}

/// Parameters for `columns`, in order; absent columns bind NULL
pub(crate) fn bind(columns: &[String], row: &Row) -> Vec<SqlValue> {
    columns
        .iter()
        .map(|c| row.get(c).cloned().unwrap_or(SqlValue::Null))
        .collect()
}

fn column_names(layout: &TableLayout) -> Vec<String> {
    layout.column_names().map(str::to_string).collect()
}

fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_sql(layout: &TableLayout) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&layout.table_name),
        layout
            .column_names()
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(", "),
        placeholders(layout.columns.len())
    )
}

fn upsert_sql(layout: &TableLayout, key: &str) -> String {
    let updates: Vec<String> = layout
        .column_names()
        .filter(|c| *c != key)
        .map(|c| format!("{0} = excluded.{0}", quote_ident(c)))
        .collect();
    let action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET\n    {}", updates.join(",\n    "))
    };
    format!(
        "{}\nON CONFLICT({}) {}",
        insert_sql(layout),
        quote_ident(key),
        action
    )
}

fn child_statements(child: &ChildTable) -> ChildStatements {
    let table = quote_ident(child.table_name());
    let fk = quote_ident(&child.parent_column);
    let order = match child.collection {
        CollectionKind::List => format!(" ORDER BY {}", quote_ident(INDEX_COLUMN)),
        CollectionKind::Set | CollectionKind::Map => String::new(),
    };

    ChildStatements {
        table: child.table_name().to_string(),
        columns: column_names(&child.layout),
        insert: insert_sql(&child.layout),
        select: format!("SELECT * FROM {} WHERE {} = ?1{}", table, fk, order),
        delete: format!("DELETE FROM {} WHERE {} = ?1", table, fk),
        count: format!("SELECT COUNT(*) AS \"n\" FROM {} WHERE {} = ?1", table, fk),
    }
}
