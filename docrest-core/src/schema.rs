//! Schema definitions: a collection name, its options and its hooks.
//!
//! A [`Schema`] is assembled once, when a model is defined, and is immutable afterwards.
//! Binding it to a backend with [`DocumentStore::model`](crate::store::DocumentStore::model)
//! yields a [`Model`](crate::model::Model) exposing the verbs.
//!
//! # Example
//!
//! ```ignore
//! use docrest::prelude::*;
//!
//! let schema = Schema::builder("users")
//!     .with_options(SchemaOptions::builder().with_unique_fields(["email"]).build())
//!     .before_post(|mut record: Record| async move {
//!         record.set(&doc! { "role": "member" });
//!         Ok(Some(record))
//!     })
//!     .after_get_by_id(|record: Record| async move {
//!         log::info!("served {:?}", record.id());
//!         Ok(None)
//!     })
//!     .build();
//! ```
//!
//! # Hook names
//!
//! | verb        | before                               | after                              |
//! |-------------|--------------------------------------|------------------------------------|
//! | `post`      | `before_post`, `before_save`         | `after_post`, `after_save`         |
//! | `put`       | `before_put`, `before_update`        | `after_put`, `after_update`        |
//! | `patch`     | `before_patch`, `before_update`      | `after_patch`, `after_update`      |
//! | `del`       | `before_delete`                      | `after_delete`                     |
//! | `get_by_id` | `before_get_by_id`                   | `after_get_by_id`                  |
//! | `get`       | `before_get`                         | `after_get`                        |
//!
//! The first name of each cell registers the verb's own hook, the second a shared alias.
//! When both are registered the verb's own hook runs and the alias is ignored.

use std::future::Future;

use bson::Uuid;

use crate::{
    config::SchemaOptions,
    document::Document,
    envelope::ResultEnvelope,
    error::ActionResult,
    hooks::{Hook, ModelHooks, Priority},
    options::QueryOptions,
    record::{Changes, Record},
};

/// An immutable model definition.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    options: SchemaOptions,
    hooks: ModelHooks,
}

impl Schema {
    /// Starts a schema for the collection `name`.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name.into())
    }

    /// Starts a schema named after the collection of `D`.
    pub fn for_document<D: Document>() -> SchemaBuilder {
        SchemaBuilder::new(D::collection_name().to_string())
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    pub(crate) fn hooks(&self) -> &ModelHooks {
        &self.hooks
    }
}

/// Builder for [`Schema`].
///
/// Every hook method accepts an async closure; see [`Hook`] for the meaning of its result.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    options: SchemaOptions,
    hooks: ModelHooks,
}

impl SchemaBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            options: SchemaOptions::default(),
            hooks: ModelHooks::default(),
        }
    }

    pub fn with_options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs before a new record is inserted. May replace the record.
    pub fn before_post<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .before_post
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    /// Alias of [`before_post`](Self::before_post).
    pub fn before_save<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .before_post
            .offer(Priority::Alias, Hook::new(hook));
        self
    }

    /// Runs after a new record was inserted, with the saved record.
    pub fn after_post<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .after_post
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    /// Alias of [`after_post`](Self::after_post).
    pub fn after_save<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .after_post
            .offer(Priority::Alias, Hook::new(hook));
        self
    }

    /// Runs before a full update with the record and the requested changes.
    pub fn before_put<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn((Record, Changes)) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .before_put
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    pub fn after_put<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn((Record, Changes)) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .after_put
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    /// Runs before a partial update with the record and the requested changes.
    pub fn before_patch<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn((Record, Changes)) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .before_patch
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    pub fn after_patch<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn((Record, Changes)) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .after_patch
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    /// Runs before both `put` and `patch`, unless the verb has a hook of its own.
    pub fn before_update<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn((Record, Changes)) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        let hook = Hook::new(hook);
        self.hooks
            .before_put
            .offer(Priority::Alias, hook.clone());
        self.hooks
            .before_patch
            .offer(Priority::Alias, hook);
        self
    }

    /// Runs after both `put` and `patch`, unless the verb has a hook of its own.
    pub fn after_update<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn((Record, Changes)) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        let hook = Hook::new(hook);
        self.hooks
            .after_put
            .offer(Priority::Alias, hook.clone());
        self.hooks
            .after_patch
            .offer(Priority::Alias, hook);
        self
    }

    /// Runs before a record is removed or soft deleted.
    pub fn before_delete<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .before_delete
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    pub fn after_delete<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .after_delete
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    /// Runs before an id lookup with the target id. It can only abort the lookup.
    pub fn before_get_by_id<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Uuid) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<()>> + Send + 'static,
    {
        let hook = Hook::new(move |id: Uuid| {
            let abort = hook(id);
            async move { abort.await.map(|()| None::<()>) }
        });
        self.hooks
            .before_get_by_id
            .offer(Priority::Specific, hook);
        self
    }

    /// Runs after an id lookup with the found record.
    pub fn after_get_by_id<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<Record>>> + Send + 'static,
    {
        self.hooks
            .after_get_by_id
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    /// Runs before a list read. May substitute the query options.
    pub fn before_get<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(QueryOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<QueryOptions>>> + Send + 'static,
    {
        self.hooks
            .before_get
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    /// Runs after a list read with the options used and the assembled envelope.
    pub fn after_get<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn((QueryOptions, ResultEnvelope)) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<ResultEnvelope>>> + Send + 'static,
    {
        self.hooks
            .after_get
            .offer(Priority::Specific, Hook::new(hook));
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            name: self.name,
            options: self.options,
            hooks: self.hooks,
        }
    }
}
