//! The `post` verb: create a record.
//!
//! Pipeline: build (or accept) the record, run the before hook, insert, run the after hook
//! with the saved record.

use log::debug;

use crate::{
    backend::StoreBackend,
    error::{ActionError, ActionResult},
    hooks::invoke,
    model::{Instance, Model},
    record::Record,
    request::PostBody,
};

impl<'a, B: StoreBackend> Model<'a, B> {
    /// Creates a record from plain fields or from an already built record.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let jane = users.post(doc! { "name": "Jane", "email": "jane@example.com" }).await?;
    /// assert!(!jane.is_new());
    /// ```
    ///
    /// # Errors
    ///
    /// Fails when the fields carry a malformed id, when a hook aborts, or when the backend
    /// rejects the insert (e.g. a unique index violation).
    pub async fn post(&self, body: impl Into<PostBody>) -> ActionResult<Record> {
        match body.into().into_record() {
            Ok(record) => self.instance(record).post().await,
            Err(err) => Err(err.normalized()),
        }
    }
}

impl<B: StoreBackend> Instance<'_, B> {
    /// Saves this record through the create pipeline.
    pub async fn post(self) -> ActionResult<Record> {
        self.run_post()
            .await
            .map_err(ActionError::normalized)
    }

    async fn run_post(self) -> ActionResult<Record> {
        let Instance { model, record } = self;
        let hooks = model.schema().hooks();

        debug!("Posting record {:?} into '{}'", record.id(), model.name());

        let record = invoke(hooks.before_post.get(), record, Record::clone).await?;
        let saved = model.save(record).await?;

        invoke(hooks.after_post.get(), saved, Record::clone).await
    }
}
