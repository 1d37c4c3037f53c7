//! Main docrest crate providing REST-style verbs over document models.
//!
//! This crate is the primary entry point for users of docrest. It re-exports the core
//! types and functionality from the sub-crates and provides convenient access to the
//! storage backends.
//!
//! # Features
//!
//! - **Conventional verbs** - `post`, `get_by_id`, `get`, `fresh`, `put`, `patch` and `del`
//!   for every model, in a static and an instance form
//! - **Hooks** - Before/after extension points on every verb, able to abort or replace
//! - **Paginated reads** - List results wrapped in an envelope with totals and page counts
//! - **Pluggable storage** - Any [`StoreBackend`](backend::StoreBackend) implementation
//!
//! # Quick Start
//!
//! ```ignore
//! use docrest::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create an in-memory store backend
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!
//!     // Define a model with a search field and a hook
//!     let schema = Schema::builder("users")
//!         .with_options(SchemaOptions::builder().with_search_fields(["name"]).build())
//!         .before_post(|mut record: Record| async move {
//!             record.set(&doc! { "role": "member" });
//!             Ok(Some(record))
//!         })
//!         .build();
//!     let users = store.model(&schema);
//!
//!     // Create, update and read records
//!     let jane = users.post(doc! { "name": "Jane" }).await?;
//!     let id = jane.id().ok_or("no id")?;
//!
//!     users.patch(UpdateRequest::by_id(id, doc! { "name": "Janet" })).await?;
//!
//!     let page = users
//!         .get(QueryOptions::builder().filter(doc! { "q": "jan" }).build())
//!         .await?;
//!     println!("{} of {} users", page.size, page.total);
//!
//!     // Soft delete keeps the record with a deletion timestamp
//!     users.del(DeleteOptions::new(id).soft()).await?;
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Typed documents
//!
//! Records are plain BSON documents. Types implementing [`Document`](document::Document)
//! can be posted with [`Record::from_typed`](record::Record::from_typed) and read back with
//! [`Record::to_typed`](record::Record::to_typed) or
//! [`ResultEnvelope::into_typed`](envelope::ResultEnvelope::into_typed).
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing

pub mod prelude;

pub use docrest_core::{
    backend, config, criteria, document, envelope, error, hooks, model, options, query, record,
    request, schema, store,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docrest_memory::{InMemoryStore, InMemoryStoreBuilder};
}
