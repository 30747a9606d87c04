//! Process-wide table of compiled aggregate schemas
//!
//! Built once at startup and handed to repositories explicitly.

use crate::descriptor::AggregateDescriptor;
use crate::schema::{CompiledSchema, SchemaCompiler, SchemaError};
use crate::value::Aggregate;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("aggregate `{0}` is already registered")]
    AlreadyRegistered(String),

    #[error("aggregate `{0}` is not registered")]
    NotRegistered(String),

    #[error("failed to compile `{type_name}`: {source}")]
    Compile {
        type_name: String,
        #[source]
        source: SchemaError,
    },
}

#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<CompiledSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register the descriptor of `T`
    ///
    /// # Errors
    ///
    /// Fails if the type is already registered or does not compile.
    pub fn register<T: Aggregate>(&mut self) -> Result<Arc<CompiledSchema>, RegistryError> {
        self.register_descriptor(T::descriptor())
    }

    /// Compile and register a descriptor loaded at runtime
    ///
    /// # Errors
    ///
    /// Fails if the type is already registered or does not compile.
    pub fn register_descriptor(
        &mut self,
        descriptor: AggregateDescriptor,
    ) -> Result<Arc<CompiledSchema>, RegistryError> {
        let type_name = descriptor.type_name.clone();
        if self.schemas.contains_key(&type_name) {
            return Err(RegistryError::AlreadyRegistered(type_name));
        }
        let schema = SchemaCompiler::compile(&descriptor).map_err(|source| {
            RegistryError::Compile {
                type_name: type_name.clone(),
                source,
            }
        })?;
        let schema = Arc::new(schema);
        self.schemas.insert(type_name, Arc::clone(&schema));
        Ok(schema)
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<CompiledSchema>> {
        self.schemas.get(type_name).cloned()
    }

    /// Schema registered for `T`
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotRegistered`] if `T` was never registered.
    pub fn schema_for<T: Aggregate>(&self) -> Result<Arc<CompiledSchema>, RegistryError> {
        let type_name = T::descriptor().type_name;
        self.get(&type_name)
            .ok_or(RegistryError::NotRegistered(type_name))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
