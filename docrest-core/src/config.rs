//! Per-schema configuration.
//!
//! [`SchemaOptions`] can be built in code with [`SchemaOptions::builder`] or deserialized
//! from any serde format; missing keys fall back to their defaults.
//!
//! ```ignore
//! use docrest::config::SchemaOptions;
//!
//! let options = SchemaOptions::builder()
//!     .with_default_limit(20)
//!     .with_search_fields(["name", "email"])
//!     .with_unique_fields(["email"])
//!     .build();
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DEFAULT_ERROR_STATUS;

/// Options shared by every verb of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaOptions {
    /// Field stamped once when a record is first saved.
    pub created_at_field: String,
    /// Field stamped on every save and used for conditional reads.
    pub updated_at_field: String,
    /// Field set by soft deletes.
    pub deleted_at_field: String,
    /// Page size used when a list read does not ask for a positive limit.
    pub default_limit: i64,
    /// Status reported when an id lookup matches nothing.
    pub not_found_status: u16,
    /// Fields searched by the `q` term. Empty searches every top-level string field.
    pub search_fields: Vec<String>,
    /// Fields given a unique index by [`Model::ensure_indexes`](crate::model::Model::ensure_indexes).
    pub unique_fields: Vec<String>,
}

impl SchemaOptions {
    pub fn builder() -> SchemaOptionsBuilder {
        SchemaOptionsBuilder::new()
    }

    /// The timestamp fields every schema indexes.
    pub fn timestamp_fields(&self) -> [&str; 3] {
        [
            self.created_at_field.as_str(),
            self.updated_at_field.as_str(),
            self.deleted_at_field.as_str(),
        ]
    }
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            created_at_field: "createdAt".to_string(),
            updated_at_field: "updatedAt".to_string(),
            deleted_at_field: "deletedAt".to_string(),
            default_limit: 10,
            not_found_status: DEFAULT_ERROR_STATUS,
            search_fields: Vec::new(),
            unique_fields: Vec::new(),
        }
    }
}

/// Builder for [`SchemaOptions`].
#[derive(Debug, Clone, Default)]
pub struct SchemaOptionsBuilder {
    options: SchemaOptions,
}

impl SchemaOptionsBuilder {
    /// Creates a builder holding the default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_created_at_field(mut self, field: impl Into<String>) -> Self {
        self.options.created_at_field = field.into();
        self
    }

    pub fn with_updated_at_field(mut self, field: impl Into<String>) -> Self {
        self.options.updated_at_field = field.into();
        self
    }

    pub fn with_deleted_at_field(mut self, field: impl Into<String>) -> Self {
        self.options.deleted_at_field = field.into();
        self
    }

    /// Sets the page size used when callers do not ask for one. Non-positive values are
    /// ignored.
    pub fn with_default_limit(mut self, limit: i64) -> Self {
        if limit > 0 {
            self.options.default_limit = limit;
        }
        self
    }

    /// Sets the status reported when an id lookup matches nothing, e.g. `404`.
    pub fn with_not_found_status(mut self, status: u16) -> Self {
        self.options.not_found_status = status;
        self
    }

    pub fn with_search_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.options.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unique_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.options.unique_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> SchemaOptions {
        self.options
    }
}
