//! REST-style verbs for document models.
//!
//! This crate is the core of the docrest project. Given a [`Schema`](schema::Schema) and a
//! [`StoreBackend`](backend::StoreBackend), it provides the conventional verb operations
//! every resource type needs:
//!
//! - `post` creates a record,
//! - `get_by_id` reads one record, `get`/`fresh` read a page of records,
//! - `put` and `patch` update a record,
//! - `del` removes or soft deletes a record.
//!
//! Each verb runs the same pipeline: normalize the arguments, run the before hook, call the
//! store, run the after hook, and normalize the error status.
//!
//! Modules:
//!
//! - **Records** ([`record`], [`document`]) - The documents verbs operate on, and typed views of them
//! - **Store backend abstraction** ([`backend`]) - The contract a storage backend implements
//! - **Query shape** ([`query`], [`criteria`]) - Filter expressions, search, sorting and projection
//! - **Schemas and hooks** ([`schema`], [`hooks`], [`config`]) - Model definitions and extension points
//! - **Verb arguments** ([`request`], [`options`]) - Accepted call shapes of each verb
//! - **Results** ([`envelope`]) - Paginated list results
//! - **Error handling** ([`error`]) - Store and verb errors
//!
//! # Example
//!
//! ```ignore
//! use docrest::prelude::*;
//! use docrest::memory::InMemoryStore;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let schema = Schema::builder("users").build();
//! let users = store.model(&schema);
//!
//! let jane = users.post(doc! { "name": "Jane" }).await?;
//! let id = jane.id().unwrap();
//!
//! users.patch(UpdateRequest::by_id(id, doc! { "name": "Janet" })).await?;
//! let page = users.get(QueryOptions::default()).await?;
//! users.del(DeleteOptions::new(id).soft()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrest_core;

pub mod backend;
pub mod config;
pub mod criteria;
pub mod document;
pub mod envelope;
pub mod error;
pub mod hooks;
pub mod model;
pub mod options;
pub mod query;
pub mod record;
pub mod request;
pub mod schema;
pub mod store;

mod delete;
mod get;
mod patch;
mod post;
mod put;
mod update;
