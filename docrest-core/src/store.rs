//! Main entry point binding schemas to a storage backend.
//!
//! # Example
//!
//! ```ignore
//! use docrest::prelude::*;
//! use docrest::memory::InMemoryStore;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let schema = Schema::builder("users").build();
//!
//! let users = store.model(&schema);
//! users.ensure_indexes().await?;
//! let created = users.post(doc! { "name": "Jane" }).await?;
//! ```

use crate::{backend::StoreBackend, error::DocumentStoreResult, model::Model, schema::Schema};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Binds a schema to this store, exposing its verbs.
    pub fn model<'a>(&'a self, schema: &'a Schema) -> Model<'a, B> {
        Model::new(schema, &self.backend)
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// This consumes the store and should be called when no longer needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;

        Ok(())
    }
}
