//! In-memory storage implementation for document stores.
//!
//! This module provides a simple but powerful in-memory backend that stores
//! documents as BSON values in HashMaps with async-safe read-write locks.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use log::trace;
use mea::rwlock::RwLock;
use bson::{Uuid, Bson};

use docrest_core::{
    query::Query,
    error::{DocumentStoreError, DocumentStoreResult},
    backend::{StoreBackend, StoreBackendBuilder},
};

use crate::evaluator::{DocumentEvaluator, Comparable, compare_by, lookup};

type CollectionMap = HashMap<String, Bson>;
type StoreMap = HashMap<String, CollectionMap>;
/// collection_name -> (field -> unique)
type IndexMap = HashMap<String, HashMap<String, bool>>;


/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait to provide a fully functional
/// document store that operates entirely in memory using async-aware read-write locks.
/// All documents are stored as BSON values indexed by their UUID.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Indexes
///
/// Queries scan all documents in a collection. Indexes are only recorded to enforce
/// uniqueness: a write that would give two documents of a collection the same value for
/// a unique field fails with [`DocumentStoreError::DuplicateKey`].
///
/// # Example
///
/// ```ignore
/// use docrest_memory::InMemoryStore;
/// use docrest::backend::StoreBackend;
/// use bson::{Uuid, Bson, doc};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     // Insert documents
///     let id = Uuid::new();
///     let doc = Bson::Document(doc! { "_id": id, "name": "Alice", "age": 30 });
///     store.insert_documents(vec![(id, doc)], "users").await?;
///
///     // Retrieve documents
///     let docs = store.get_documents(vec![id], "users").await?;
///     assert_eq!(docs.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// The main storage map: collection_name -> (document_id -> document)
    store: Arc<RwLock<StoreMap>>,
    /// Indexed fields per collection. Always locked before `store`.
    indexes: Arc<RwLock<IndexMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    ///
    /// The returned store is ready for use and contains no collections or documents.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            indexes: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use docrest_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder().build().await.unwrap();
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

/// Fails when `document` shares the value of a unique field with another document of the
/// collection. Missing and null values are never considered duplicates.
fn check_unique(
    indexes: Option<&HashMap<String, bool>>,
    collection_map: &CollectionMap,
    key: &str,
    document: &Bson,
    collection: &str,
) -> DocumentStoreResult<()> {
    let (Some(indexes), Some(document)) = (indexes, document.as_document()) else {
        return Ok(());
    };

    for field in indexes
        .iter()
        .filter(|(_, unique)| **unique)
        .map(|(field, _)| field)
    {
        let value = match lookup(document, field) {
            None | Some(Bson::Null) => continue,
            Some(value) => Comparable::from(value),
        };

        let duplicate = collection_map
            .iter()
            .filter(|(other_key, _)| other_key.as_str() != key)
            .filter_map(|(_, other)| other.as_document())
            .filter_map(|other| lookup(other, field))
            .any(|other| Comparable::from(other) == value);

        if duplicate {
            return Err(DocumentStoreError::DuplicateKey(field.clone(), collection.to_string()));
        }
    }

    Ok(())
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let indexes = self.indexes.read().await;
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        for (id, doc) in documents {
            let key = id.to_string();

            if collection_map.contains_key(&key) {
                return Err(DocumentStoreError::DocumentAlreadyExists(key, collection.to_string()));
            }
            check_unique(indexes.get(collection), collection_map, &key, &doc, collection)?;

            trace!("Inserted document '{}' into '{}'", key, collection);
            collection_map.insert(key, doc);
        }

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let indexes = self.indexes.read().await;
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        for (id, doc) in documents {
            let key = id.to_string();

            if !collection_map.contains_key(&key) {
                return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string()));
            }
            check_unique(indexes.get(collection), collection_map, &key, &doc, collection)?;

            trace!("Updated document '{}' in '{}'", key, collection);
            collection_map.insert(key, doc);
        }

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        for id in ids {
            let key = id.to_string();

            if collection_map.remove(&key).is_none() {
                return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string()));
            }
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut documents = Vec::with_capacity(ids.len());

        for id in ids {
            let key = id.to_string();

            if let Some(doc) = collection_map.get(&key) {
                documents.push(doc.clone());
            }
        }

        Ok(documents)
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut documents = DocumentEvaluator::filter_documents(
            collection_map.values(),
            query.filter.as_ref(),
            query.search.as_ref(),
        )?;

        if !query.sort.is_empty() {
            documents.sort_by(|a, b| compare_by(a, b, &query.sort));
        }

        // Apply offset and limit, then the projection
        Ok(
            documents
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .map(|doc| match (&query.projection, doc) {
                    (Some(projection), Bson::Document(doc)) => Bson::Document(projection.apply(&doc)),
                    (_, doc) => doc,
                })
                .collect()
        )
    }

    async fn count_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<usize> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(0),
        };

        Ok(
            DocumentEvaluator::filter_documents(
                collection_map.values(),
                query.filter.as_ref(),
                query.search.as_ref(),
            )?
            .len()
        )
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        let mut indexes = self.indexes.write().await;

        if unique {
            // Refuse a unique index the stored documents already violate
            let store = self.store.read().await;
            let candidate = HashMap::from([(field.to_string(), true)]);

            if let Some(collection_map) = store.get(collection) {
                for (key, doc) in collection_map {
                    check_unique(Some(&candidate), collection_map, key, doc, collection)?;
                }
            }
        }

        trace!("Indexed '{}' of '{}' (unique: {})", field, collection, unique);
        indexes
            .entry(collection.to_string())
            .or_default()
            .insert(field.to_string(), unique);

        Ok(())
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        if let Some(fields) = self.indexes.write().await.get_mut(collection) {
            fields.remove(field);
        }

        Ok(())
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docrest_memory::InMemoryStore;
/// use docrest::backend::StoreBackendBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder().build().await.unwrap();
/// }
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docrest_core::query::{Filter, Projection, Sort, TextSearch};

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        let documents = [("Ann", 31), ("bob", 25), ("Cleo", 40)]
            .into_iter()
            .map(|(name, age)| {
                let id = Uuid::new();
                (id, Bson::Document(doc! { "_id": id, "name": name, "age": age }))
            })
            .collect();

        store.insert_documents(documents, "users").await.unwrap();
        store
    }

    #[tokio::test]
    async fn query_sorts_windows_and_projects() {
        let store = seeded().await;
        let query = Query::builder()
            .sorts([Sort::desc("age")])
            .offset(1)
            .limit(1)
            .projection(Some(Projection::include(["name"]).without_id()))
            .build();

        let documents = store.query_documents(query, "users").await.unwrap();

        assert_eq!(documents, vec![Bson::Document(doc! { "name": "Ann" })]);
    }

    #[tokio::test]
    async fn count_applies_filter_and_search() {
        let store = seeded().await;

        let adults = Query::builder().filter(Filter::gte("age", 30)).build();
        assert_eq!(store.count_documents(adults, "users").await.unwrap(), 2);

        let search = Query::builder()
            .search(Some(TextSearch::new("B", vec!["name".to_string()])))
            .build();
        assert_eq!(store.count_documents(search, "users").await.unwrap(), 1);

        assert_eq!(store.count_documents(Query::new(), "missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates() {
        let store = seeded().await;
        store.add_index("users", "name", true).await.unwrap();
        store.add_index("users", "name", true).await.unwrap();

        let id = Uuid::new();
        let error = store
            .insert_documents(vec![(id, Bson::Document(doc! { "_id": id, "name": "Ann" }))], "users")
            .await
            .unwrap_err();
        assert!(matches!(error, DocumentStoreError::DuplicateKey(field, _) if field == "name"));

        store.drop_index("users", "name").await.unwrap();
        store
            .insert_documents(vec![(id, Bson::Document(doc! { "_id": id, "name": "Ann" }))], "users")
            .await
            .unwrap();

        let error = store.add_index("users", "name", true).await.unwrap_err();
        assert!(matches!(error, DocumentStoreError::DuplicateKey(..)));
    }
}
