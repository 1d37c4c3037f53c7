//! Convenient re-exports of commonly used types from docrest.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docrest::prelude::*;
//! ```
//!
//! This provides access to:
//! - Schemas, models and their configuration
//! - Records and typed document traits
//! - Verb arguments and results
//! - Store backends and builders
//! - Query construction
//! - Error types

pub use docrest_core::{
    store::DocumentStore,
    schema::{Schema, SchemaBuilder},
    config::{SchemaOptions, SchemaOptionsBuilder},
    model::{Instance, Model},
    hooks::Hook,
    record::{Changes, Record},
    document::{Document, DocumentExt},
    options::{DeleteOptions, GetByIdOptions, Headers, Paginate, Populate, QueryOptions},
    request::{PostBody, UpdateRequest, Updates},
    envelope::ResultEnvelope,
    backend::{StoreBackend, StoreBackendBuilder},
    query::{Expr, Filter, Projection, Query, QueryBuilder, Sort, SortDirection, TextSearch},
    error::{ActionError, ActionErrorKind, ActionResult, DocumentStoreError, DocumentStoreResult},
};

pub use bson::{Bson, Uuid, doc};
