//! The `del` verb: remove or soft delete a record.
//!
//! A soft delete stamps the deletion timestamp through the `patch` pipeline (so the patch
//! hooks run too) and keeps the record; a hard delete removes it from the store. There is
//! no way back from either.

use bson::DateTime as BsonDateTime;
use log::debug;

use crate::{
    backend::StoreBackend,
    error::{ActionError, ActionResult},
    hooks::invoke,
    model::{Instance, Model},
    options::DeleteOptions,
    record::{Changes, Record},
    update::UpdateVerb,
};

impl<'a, B: StoreBackend> Model<'a, B> {
    /// Deletes the record addressed by `options`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// users.del(id).await?;
    /// users.del(DeleteOptions::new(id).soft()).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Fails with `MissingInstanceId` when no id is given and with not-found when no
    /// record matches the id and filter.
    pub async fn del(&self, options: impl Into<DeleteOptions>) -> ActionResult<Record> {
        self.run_del(options.into())
            .await
            .map_err(ActionError::normalized)
    }

    async fn run_del(&self, options: DeleteOptions) -> ActionResult<Record> {
        let id = options
            .id
            .ok_or_else(ActionError::missing_instance_id)?;
        let existing = self
            .find_existing(id, options.filter.as_ref(), None)
            .await?;

        self.instance(existing)
            .run_del(options.soft)
            .await
    }
}

impl<B: StoreBackend> Instance<'_, B> {
    /// Deletes this record. With `soft` the record is kept and its deletion timestamp set.
    pub async fn del(self, soft: bool) -> ActionResult<Record> {
        self.run_del(soft)
            .await
            .map_err(ActionError::normalized)
    }

    async fn run_del(self, soft: bool) -> ActionResult<Record> {
        let Instance { model, record } = self;
        let hooks = model.schema().hooks();

        debug!(
            "Deleting record {:?} from '{}' (soft: {})",
            record.id(),
            model.name(),
            soft
        );

        let record = invoke(hooks.before_delete.get(), record, Record::clone).await?;

        let deleted = if soft {
            let mut changes = Changes::new();
            changes.insert(
                model.schema().options().deleted_at_field.clone(),
                BsonDateTime::now(),
            );

            model
                .instance(record)
                .update(UpdateVerb::Patch, changes)
                .await?
        } else {
            model.remove(&record).await?;
            record
        };

        invoke(hooks.after_delete.get(), deleted, Record::clone).await
    }
}
