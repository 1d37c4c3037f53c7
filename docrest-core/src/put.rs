//! The `put` verb: full update of a record.

use crate::{
    backend::StoreBackend,
    error::{ActionError, ActionResult},
    model::{Instance, Model},
    record::{Changes, Record},
    request::UpdateRequest,
    update::UpdateVerb,
};

impl<'a, B: StoreBackend> Model<'a, B> {
    /// Replaces the fields of an existing record.
    ///
    /// Accepts `(id, updates)` through [`UpdateRequest::by_id`], updates carrying their own
    /// `_id`, or a loaded record (saved as is, without a lookup).
    ///
    /// # Errors
    ///
    /// Fails with a bad-request error when no id can be resolved, with not-found when the
    /// record does not exist, or with whatever a hook or the backend reports.
    pub async fn put(&self, request: impl Into<UpdateRequest>) -> ActionResult<Record> {
        self.update(UpdateVerb::Put, request.into())
            .await
            .map_err(ActionError::normalized)
    }
}

impl<B: StoreBackend> Instance<'_, B> {
    /// Applies `changes` to this record and saves it, running the `put` hooks.
    ///
    /// `_id`, `id` and the created/updated timestamps are ignored in `changes`.
    pub async fn put(self, changes: Changes) -> ActionResult<Record> {
        self.update(UpdateVerb::Put, changes)
            .await
            .map_err(ActionError::normalized)
    }
}
