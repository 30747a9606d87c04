//! Transactional aggregate repository
//!
//! Every operation runs in one transaction on an exclusively held
//! connection:
//!
//! - `get_by_id`: root row, then each child table filtered by the root id
//! - `save`: upsert the root row, then per collection delete all rows for
//!   the id and insert the current rows (full replace, last write wins)
//! - `delete_by_id`: delete the root row; child rows go by cascade, or by
//!   explicit deletes first when the backend has no cascade

use crate::bootstrap::{self, BootstrapOutcome};
use crate::connection::Connection;
use crate::errors::{backend, codec, Result};
use crate::statements::{bind, Statements};
use aggrel_core::{
    log_op_end, log_op_error, log_op_start, Aggregate, AggregateMapper, CompiledSchema, Record,
    RepoError, RepoErrorKind, RowSet, SchemaRegistry, SqlValue,
};
use aggrel_core_types::schema::{
    OP_BOOTSTRAP, OP_COUNT_CHILD_ROWS, OP_CREATE_TABLES, OP_DELETE_BY_ID, OP_EXISTS_BY_ID,
    OP_GET_BY_ID, OP_SAVE, OP_TRANSACTION,
};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;

/// Persistence contract for one aggregate type
pub trait Repository<T> {
    /// # Errors
    ///
    /// `NotFound` if no aggregate has this id; `Unknown` if stored data
    /// cannot be decoded.
    fn get_by_id(&self, id: Uuid) -> Result<T>;

    /// Insert or fully replace the aggregate
    ///
    /// # Errors
    ///
    /// Any failure leaves the previously persisted state unchanged.
    fn save(&self, aggregate: &T) -> Result<()>;

    /// # Errors
    ///
    /// `NotFound` if no aggregate has this id.
    fn delete_by_id(&self, id: Uuid) -> Result<()>;
}

/// Repository over record-shaped aggregates, for tools without a typed model
pub type DynamicRepository<C> = TransactionalRepository<Record, C>;

pub struct TransactionalRepository<T, C> {
    schema: Arc<CompiledSchema>,
    sql: Statements,
    conn: Mutex<C>,
    _aggregate: PhantomData<fn() -> T>,
}

fn id_param(id: Uuid) -> [SqlValue; 1] {
    [SqlValue::Text(id.hyphenated().to_string())]
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl<T, C: Connection> TransactionalRepository<T, C> {
    pub fn new(schema: Arc<CompiledSchema>, conn: C) -> Self {
        let sql = Statements::new(&schema);
        Self {
            schema,
            sql,
            conn: Mutex::new(conn),
            _aggregate: PhantomData,
        }
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// Exclusive access to the underlying connection
    ///
    /// # Errors
    ///
    /// Fails if a previous holder panicked.
    pub fn connection(&self) -> Result<MutexGuard<'_, C>> {
        self.conn.lock().map_err(|_| {
            RepoError::new(RepoErrorKind::Unknown)
                .with_aggregate(self.schema.type_name())
                .with_message("connection lock poisoned")
        })
    }

    fn instrumented<R>(
        &self,
        op: &'static str,
        id: Option<Uuid>,
        body: impl FnOnce(&mut C) -> Result<R>,
    ) -> Result<R> {
        let start = Instant::now();
        let aggregate = self.schema.type_name();
        let aggregate_id = id.map(|id| id.to_string()).unwrap_or_default();
        log_op_start!(op, aggregate = aggregate, aggregate_id = aggregate_id.as_str());

        let result = self.connection().and_then(|mut guard| body(&mut guard));
        let result = result.map_err(|err| {
            let err = err.with_aggregate(aggregate);
            match id {
                Some(id) if err.entity_id().is_none() => err.with_entity_id(id.to_string()),
                _ => err,
            }
        });

        match &result {
            Ok(_) => {
                log_op_end!(op, duration_ms = elapsed_ms(start), aggregate = aggregate);
            }
            Err(err) => {
                log_op_error!(op, err, duration_ms = elapsed_ms(start), aggregate = aggregate);
            }
        }
        result
    }

    /// Create the root table and every child table
    ///
    /// # Errors
    ///
    /// Existing tables surface as backend errors.
    pub fn create_tables(&self) -> Result<()> {
        self.instrumented(OP_CREATE_TABLES, None, |conn| {
            bootstrap::create_tables(conn, &self.schema).map(|_| ())
        })
    }

    /// Idempotent table creation guarded by the schema fingerprint
    ///
    /// # Errors
    ///
    /// `Unknown` ("schema drift") if the tables were created from a
    /// different descriptor.
    pub fn bootstrap(&self) -> Result<BootstrapOutcome> {
        self.instrumented(OP_BOOTSTRAP, None, |conn| {
            bootstrap::bootstrap(conn, &self.schema)
        })
    }

    /// # Errors
    ///
    /// Classified backend errors only.
    pub fn exists_by_id(&self, id: Uuid) -> Result<bool> {
        self.instrumented(OP_EXISTS_BY_ID, Some(id), |conn| self.exists_in(conn, id))
    }

    /// Child row count per child table for one aggregate id
    ///
    /// # Errors
    ///
    /// Classified backend errors, or `Unknown` if a count query returns no
    /// usable number.
    pub fn count_child_rows(&self, id: Uuid) -> Result<Vec<(String, usize)>> {
        self.instrumented(OP_COUNT_CHILD_ROWS, Some(id), |conn| {
            let params = id_param(id);
            conn.transaction(|conn| {
                let mut counts = Vec::with_capacity(self.sql.children.len());
                for child in &self.sql.children {
                    let rows = conn
                        .query(&child.count, &params)
                        .map_err(backend(OP_COUNT_CHILD_ROWS))?;
                    let n = rows
                        .first()
                        .and_then(|row| row.get("n"))
                        .and_then(SqlValue::as_i64)
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| {
                            RepoError::new(RepoErrorKind::Unknown)
                                .with_op(OP_COUNT_CHILD_ROWS)
                                .with_message(format!("no row count returned for {}", child.table))
                        })?;
                    counts.push((child.table.clone(), n));
                }
                Ok(counts)
            })
        })
    }

    /// Load an aggregate in record form
    ///
    /// # Errors
    ///
    /// As [`Repository::get_by_id`].
    pub fn load_record(&self, id: Uuid) -> Result<Record> {
        self.instrumented(OP_GET_BY_ID, Some(id), |conn| self.load_in(conn, id))
    }

    /// Save an aggregate in record form
    ///
    /// # Errors
    ///
    /// As [`Repository::save`].
    pub fn save_record(&self, record: &Record) -> Result<()> {
        let id = match record.get(self.schema.id_column()) {
            aggrel_core::Value::Uuid(id) => Some(*id),
            _ => None,
        };
        self.instrumented(OP_SAVE, id, |conn| self.save_in(conn, record))
    }

    /// # Errors
    ///
    /// `NotFound` if no aggregate has this id.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.instrumented(OP_DELETE_BY_ID, Some(id), |conn| self.delete_in(conn, id))
    }

    /// Run several operations in one transaction
    ///
    /// Operations inside the session join the outer transaction. If `body`
    /// fails, or swallows a failed operation, nothing is committed.
    ///
    /// # Errors
    ///
    /// The body's error, or `Unknown` ("transaction marked rollback-only").
    pub fn transaction<R>(
        &self,
        body: impl FnOnce(&mut RepositorySession<'_, T, C>) -> Result<R>,
    ) -> Result<R> {
        self.instrumented(OP_TRANSACTION, None, |conn| {
            conn.transaction(|conn| {
                let mut session = RepositorySession { repo: self, conn };
                body(&mut session)
            })
        })
    }

    fn exists_in(&self, conn: &mut C, id: Uuid) -> Result<bool> {
        let rows = conn
            .query(&self.sql.exists_root, &id_param(id))
            .map_err(backend(OP_EXISTS_BY_ID))?;
        Ok(!rows.is_empty())
    }

    fn load_in(&self, conn: &mut C, id: Uuid) -> Result<Record> {
        let params = id_param(id);
        let rows = conn.transaction(|conn| {
            let root = conn
                .query(&self.sql.select_root, &params)
                .map_err(backend(OP_GET_BY_ID))?
                .into_iter()
                .next()
                .ok_or_else(|| RepoError::not_found(self.schema.type_name(), id).with_op(OP_GET_BY_ID))?;
            let mut children = Vec::with_capacity(self.sql.children.len());
            for child in &self.sql.children {
                children.push(
                    conn.query(&child.select, &params)
                        .map_err(backend(OP_GET_BY_ID))?,
                );
            }
            Ok(RowSet { root, children })
        })?;

        tracing::debug!(
            aggregate = self.schema.type_name(),
            rows_read = 1 + rows.child_row_count(),
            "rows loaded"
        );
        AggregateMapper::new(&self.schema)
            .from_rows(&rows)
            .map_err(|e| codec(OP_GET_BY_ID, self.schema.type_name(), e))
    }

    fn save_in(&self, conn: &mut C, record: &Record) -> Result<()> {
        let rows = AggregateMapper::new(&self.schema)
            .to_rows(record)
            .map_err(|e| codec(OP_SAVE, self.schema.type_name(), e))?;
        let id_value = rows
            .root
            .get(self.schema.id_column())
            .cloned()
            .unwrap_or(SqlValue::Null);
        let id = [id_value];

        conn.transaction(|conn| {
            conn.execute(&self.sql.upsert_root, &bind(&self.sql.root_columns, &rows.root))
                .map_err(backend(OP_SAVE))?;
            for (child, child_rows) in self.sql.children.iter().zip(&rows.children) {
                conn.execute(&child.delete, &id).map_err(backend(OP_SAVE))?;
                for row in child_rows {
                    conn.execute(&child.insert, &bind(&child.columns, row))
                        .map_err(backend(OP_SAVE))?;
                }
            }
            Ok(())
        })?;

        tracing::debug!(
            aggregate = self.schema.type_name(),
            rows_written = 1 + rows.child_row_count(),
            "rows written"
        );
        Ok(())
    }

    fn delete_in(&self, conn: &mut C, id: Uuid) -> Result<()> {
        let params = id_param(id);
        conn.transaction(|conn| {
            if !conn.supports_cascade() {
                for child in &self.sql.children {
                    conn.execute(&child.delete, &params)
                        .map_err(backend(OP_DELETE_BY_ID))?;
                }
            }
            let affected = conn
                .execute(&self.sql.delete_root, &params)
                .map_err(backend(OP_DELETE_BY_ID))?;
            if affected == 0 {
                return Err(RepoError::not_found(self.schema.type_name(), id).with_op(OP_DELETE_BY_ID));
            }
            Ok(())
        })
    }
}

impl<T: Aggregate, C: Connection> TransactionalRepository<T, C> {
    /// Repository for `T` using the schema compiled at startup
    ///
    /// # Errors
    ///
    /// `Unknown` if `T` was never registered.
    pub fn from_registry(registry: &SchemaRegistry, conn: C) -> Result<Self> {
        let schema = registry.schema_for::<T>().map_err(|e| {
            RepoError::new(RepoErrorKind::Unknown)
                .with_message(e.to_string())
                .with_cause(e)
        })?;
        Ok(Self::new(schema, conn))
    }
}

impl<T: Aggregate, C: Connection> Repository<T> for TransactionalRepository<T, C> {
    fn get_by_id(&self, id: Uuid) -> Result<T> {
        self.instrumented(OP_GET_BY_ID, Some(id), |conn| {
            let record = self.load_in(conn, id)?;
            T::from_record(record).map_err(|e| codec(OP_GET_BY_ID, self.schema.type_name(), e))
        })
    }

    fn save(&self, aggregate: &T) -> Result<()> {
        self.instrumented(OP_SAVE, Some(aggregate.id()), |conn| {
            self.save_in(conn, &aggregate.to_record())
        })
    }

    fn delete_by_id(&self, id: Uuid) -> Result<()> {
        self.delete(id)
    }
}

/// Operations sharing one enclosing transaction
pub struct RepositorySession<'a, T, C> {
    repo: &'a TransactionalRepository<T, C>,
    conn: &'a mut C,
}

impl<T, C: Connection> RepositorySession<'_, T, C> {
    /// # Errors
    ///
    /// As [`Repository::save`].
    pub fn save_record(&mut self, record: &Record) -> Result<()> {
        self.repo.save_in(self.conn, record)
    }

    /// # Errors
    ///
    /// As [`Repository::get_by_id`].
    pub fn load_record(&mut self, id: Uuid) -> Result<Record> {
        self.repo.load_in(self.conn, id)
    }

    /// # Errors
    ///
    /// `NotFound` if no aggregate has this id.
    pub fn delete_by_id(&mut self, id: Uuid) -> Result<()> {
        self.repo.delete_in(self.conn, id)
    }

    /// # Errors
    ///
    /// Classified backend errors only.
    pub fn exists_by_id(&mut self, id: Uuid) -> Result<bool> {
        self.repo.exists_in(self.conn, id)
    }

    /// Raw connection, for custom statements inside the transaction
    pub fn connection(&mut self) -> &mut C {
        self.conn
    }
}

impl<T: Aggregate, C: Connection> RepositorySession<'_, T, C> {
    /// # Errors
    ///
    /// As [`Repository::save`].
    pub fn save(&mut self, aggregate: &T) -> Result<()> {
        self.save_record(&aggregate.to_record())
    }

    /// # Errors
    ///
    /// As [`Repository::get_by_id`].
    pub fn get_by_id(&mut self, id: Uuid) -> Result<T> {
        let record = self.load_record(id)?;
        T::from_record(record).map_err(|e| codec(OP_GET_BY_ID, self.repo.schema.type_name(), e))
    }
}
