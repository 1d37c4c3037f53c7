//! Schemas bound to a backend, and the records they hand out.
//!
//! A [`Model`] exposes the static form of every verb (`post`, `get_by_id`, `get`, `fresh`,
//! `put`, `patch`, `del`). An [`Instance`] wraps one record of a model and exposes the
//! instance form of the write verbs. The verbs themselves live in their own modules; this
//! module holds the store operations they share.

use std::collections::{HashMap, HashSet};

use bson::{Bson, DateTime as BsonDateTime, Document as BsonDocument, Uuid};
use log::{debug, trace};

use crate::{
    backend::StoreBackend,
    criteria::{self, criteria_to_expr},
    error::{ActionError, ActionResult, DocumentStoreError},
    options::Populate,
    query::{Filter, Projection, Query},
    record::{ID_FIELD, Record, uuid_from_bson},
    schema::Schema,
};

/// A schema bound to a storage backend.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the schema and backend references
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Model<'a, B: StoreBackend> {
    schema: &'a Schema,
    backend: &'a B,
}

impl<B: StoreBackend> Clone for Model<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: StoreBackend> Copy for Model<'_, B> {}

impl<'a, B: StoreBackend> Model<'a, B> {
    pub(crate) fn new(schema: &'a Schema, backend: &'a B) -> Self {
        Self { schema, backend }
    }

    /// Returns the collection name of this model.
    pub fn name(&self) -> &'a str {
        self.schema.name()
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    /// Wraps a record of this model, giving access to the instance verbs.
    pub fn instance(&self, record: Record) -> Instance<'a, B> {
        Instance { model: *self, record }
    }

    /// Creates the indexes this model relies on: one per timestamp field, plus a unique
    /// index per configured unique field.
    ///
    /// # Errors
    ///
    /// Fails when the backend refuses an index, e.g. because stored records already
    /// violate a unique index.
    pub async fn ensure_indexes(&self) -> ActionResult<()> {
        let options = self.schema.options();

        for field in options.timestamp_fields() {
            self.backend
                .add_index(self.name(), field, false)
                .await?;
        }

        for field in &options.unique_fields {
            self.backend
                .add_index(self.name(), field, true)
                .await?;
        }

        debug!("Ensured indexes of '{}'", self.name());

        Ok(())
    }

    /// Looks up the record `id`, which must also match `filter`.
    pub(crate) async fn find_existing(
        &self,
        id: Uuid,
        filter: Option<&BsonDocument>,
        select: Option<Projection>,
    ) -> ActionResult<Record> {
        let mut conditions = vec![Filter::eq(ID_FIELD, id)];
        if let Some(filter) = filter {
            conditions.extend(criteria_to_expr(filter)?);
        }

        let query = Query::builder()
            .maybe_filter(criteria::all(conditions))
            .projection(select)
            .limit(1)
            .build();

        let found = self
            .backend
            .query_documents(query, self.name())
            .await?
            .into_iter()
            .next();

        match found {
            Some(document) => Ok(Record::from_bson(document)?),
            None => {
                debug!("Record '{}' not found in '{}'", id, self.name());
                Err(ActionError::from(DocumentStoreError::DocumentNotFound(
                    id.to_string(),
                    self.name().to_string(),
                ))
                .with_status(self.schema.options().not_found_status))
            }
        }
    }

    /// Persists a record: inserts it when new, otherwise writes its fields over the stored
    /// version. Timestamps are stamped on the way.
    pub(crate) async fn save(&self, mut record: Record) -> ActionResult<Record> {
        let options = self.schema.options();
        let id = record.id().ok_or_else(ActionError::missing_instance_id)?;
        let now = BsonDateTime::now();

        record.stamp(&options.updated_at_field, now);

        if record.is_new() {
            if record.get(&options.created_at_field).is_none() {
                record.stamp(&options.created_at_field, now);
            }

            trace!("Inserting record '{}' into '{}'", id, self.name());
            self.backend
                .insert_documents(vec![(id, Bson::Document(record.to_stored()))], self.name())
                .await?;
            record.mark_persisted();
        } else {
            // Records read with a projection only carry some fields
            let mut stored = self.stored(id).await?;
            for (field, value) in record.to_stored() {
                stored.insert(field, value);
            }

            trace!("Updating record '{}' in '{}'", id, self.name());
            self.backend
                .update_documents(vec![(id, Bson::Document(stored))], self.name())
                .await?;
        }

        Ok(record)
    }

    /// Physically removes a record.
    pub(crate) async fn remove(&self, record: &Record) -> ActionResult<()> {
        let id = record.id().ok_or_else(ActionError::missing_instance_id)?;

        trace!("Removing record '{}' from '{}'", id, self.name());
        self.backend
            .delete_documents(vec![id], self.name())
            .await?;

        Ok(())
    }

    /// Applies reference expansions to `records`, one spec after the other.
    pub(crate) async fn populate(
        &self,
        records: &mut [Record],
        specs: &[Populate],
    ) -> ActionResult<()> {
        for spec in specs {
            self.populate_path(records, spec).await?;
        }

        Ok(())
    }

    async fn populate_path(&self, records: &mut [Record], spec: &Populate) -> ActionResult<()> {
        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = records
            .iter()
            .filter_map(|record| record.get(&spec.path))
            .flat_map(referenced_ids)
            .filter(|id| seen.insert(*id))
            .collect();

        if ids.is_empty() {
            return Ok(());
        }

        let referenced: HashMap<Uuid, BsonDocument> = self
            .backend
            .get_documents(ids, &spec.from)
            .await?
            .into_iter()
            .filter_map(|document| match document {
                Bson::Document(document) => {
                    let id = document.get(ID_FIELD).and_then(uuid_from_bson)?;
                    let document = match &spec.select {
                        Some(select) => select.apply(&document),
                        None => document,
                    };
                    Some((id, document))
                }
                _ => None,
            })
            .collect();

        trace!(
            "Populating '{}' of {} record(s) with {} '{}' record(s)",
            spec.path,
            records.len(),
            referenced.len(),
            spec.from
        );

        for record in records.iter_mut() {
            let Some(value) = record.get(&spec.path) else {
                continue;
            };

            let expanded = expand(value, &referenced);
            record.expand_reference(&spec.path, expanded);
        }

        Ok(())
    }

    async fn stored(&self, id: Uuid) -> ActionResult<BsonDocument> {
        let stored = self
            .backend
            .get_documents(vec![id], self.name())
            .await?
            .into_iter()
            .next();

        match stored {
            Some(Bson::Document(document)) => Ok(document),
            _ => Err(DocumentStoreError::DocumentNotFound(id.to_string(), self.name().to_string()).into()),
        }
    }
}

/// One record of a model.
#[derive(Debug)]
pub struct Instance<'a, B: StoreBackend> {
    pub(crate) model: Model<'a, B>,
    pub(crate) record: Record,
}

impl<B: StoreBackend> Clone for Instance<'_, B> {
    fn clone(&self) -> Self {
        Self {
            model: self.model,
            record: self.record.clone(),
        }
    }
}

impl<'a, B: StoreBackend> Instance<'a, B> {
    pub fn model(&self) -> Model<'a, B> {
        self.model
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}

fn referenced_ids(value: &Bson) -> Vec<Uuid> {
    match value {
        Bson::Array(items) => items.iter().filter_map(uuid_from_bson).collect(),
        value => uuid_from_bson(value).into_iter().collect(),
    }
}

/// Replaces ids by the records they reference. A single id without a match becomes
/// `null`, unmatched ids inside an array are dropped, values that are not ids are kept.
fn expand(value: &Bson, referenced: &HashMap<Uuid, BsonDocument>) -> Bson {
    match value {
        Bson::Array(items) => Bson::Array(
            items
                .iter()
                .filter_map(|item| match uuid_from_bson(item) {
                    Some(id) => referenced.get(&id).cloned().map(Bson::Document),
                    None => Some(item.clone()),
                })
                .collect(),
        ),
        value => match uuid_from_bson(value) {
            Some(id) => referenced
                .get(&id)
                .cloned()
                .map_or(Bson::Null, Bson::Document),
            None => value.clone(),
        },
    }
}
