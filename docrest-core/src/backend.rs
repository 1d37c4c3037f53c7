//! Storage backend abstraction used by the verbs.
//!
//! The verbs never talk to a database directly. Everything they need from persistence is
//! expressed by the [`StoreBackend`] trait: insert/update/delete by id, fetch by id,
//! query with a [`Query`], count with a [`Query`], and index management.
//!
//! # Mapping of the classic model operations
//!
//! | model operation                        | backend call |
//! |----------------------------------------|--------------|
//! | `findById(id).select(p).where(f)`      | [`StoreBackend::query_documents`] with `_id = id AND f`, `limit 1`, projection `p` |
//! | `find(f).sort(s).skip(n).limit(m)`     | [`StoreBackend::query_documents`] |
//! | `countDocuments(f)`                    | [`StoreBackend::count_documents`] |
//! | `record.save()` on a new record        | [`StoreBackend::insert_documents`] |
//! | `record.save()` on a persisted record  | [`StoreBackend::update_documents`] |
//! | `record.remove()`                      | [`StoreBackend::delete_documents`] |
//!
//! # Examples
//!
//! ```ignore
//! use docrest::backend::StoreBackend;
//! use bson::{Uuid, Bson, doc};
//!
//! let backend = MyBackendImpl::new();
//!
//! let uuid = Uuid::new();
//! let doc = Bson::Document(doc! { "_id": uuid, "name": "Alice" });
//! backend.insert_documents(vec![(uuid, doc)], "users").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, query::Query};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks: the list read issues its count, page and last-modified queries
/// concurrently against the same backend.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// A backend that wants a specific status reported to callers returns
/// [`DocumentStoreError::Rejected`](crate::error::DocumentStoreError::Rejected); every
/// other error is reported with the default status.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// # Arguments
    ///
    /// * `documents` - A vector of (UUID, BSON document) pairs to insert
    /// * `collection` - The name of the collection to insert into. Created automatically if it doesn't exist.
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` on success, or a [`DocumentStoreError`](crate::error::DocumentStoreError)
    /// on failure, e.g. when a document with the same id exists or a unique index rejects it.
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Updates existing documents in a collection, replacing them entirely.
    ///
    /// # Arguments
    ///
    /// * `documents` - A vector of (UUID, BSON document) pairs with updated content
    /// * `collection` - The name of the collection containing the documents
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` on success, or a [`DocumentStoreError`](crate::error::DocumentStoreError) on failure.
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Deletes documents from a collection by their IDs.
    ///
    /// # Arguments
    ///
    /// * `ids` - A vector of document UUIDs to delete
    /// * `collection` - The name of the collection to delete from
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` on success, or a [`DocumentStoreError`](crate::error::DocumentStoreError) on failure.
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()>;

    /// Retrieves documents from a collection by their IDs.
    ///
    /// Documents are returned in store order. Missing IDs are omitted from the results.
    ///
    /// # Arguments
    ///
    /// * `ids` - A vector of document UUIDs to retrieve
    /// * `collection` - The name of the collection to query
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Queries documents in a collection.
    ///
    /// Applies the filter and search, then the sort keys, then the offset and limit, and
    /// finally the projection.
    ///
    /// # Arguments
    ///
    /// * `query` - The [`Query`] object specifying filter, search, sorts, window and projection
    /// * `collection` - The name of the collection to query
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Counts documents matching the filter and search of `query`.
    ///
    /// Sort keys, the pagination window and the projection are ignored.
    async fn count_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<usize>;

    /// Creates an index on a field.
    ///
    /// # Arguments
    ///
    /// * `collection` - The name of the collection
    /// * `field` - The field to index
    /// * `unique` - Whether the index rejects duplicate values
    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()>;

    /// Drops the index on a field.
    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with persistent storage or
    /// external connections should override this.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        (**self)
            .insert_documents(documents, collection)
            .await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        (**self)
            .update_documents(documents, collection)
            .await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        (**self)
            .delete_documents(ids, collection)
            .await
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        (**self)
            .get_documents(ids, collection)
            .await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        (**self)
            .query_documents(query, collection)
            .await
    }

    async fn count_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<usize> {
        (**self)
            .count_documents(query, collection)
            .await
    }

    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()> {
        (**self)
            .add_index(collection, field, unique)
            .await
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        (**self)
            .drop_index(collection, field)
            .await
    }
}

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
