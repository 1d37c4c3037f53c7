//! The `patch` verb: partial update of a record.

use crate::{
    backend::StoreBackend,
    error::{ActionError, ActionResult},
    model::{Instance, Model},
    record::{Changes, Record},
    request::UpdateRequest,
    update::UpdateVerb,
};

impl<'a, B: StoreBackend> Model<'a, B> {
    /// Applies changes to an existing record.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let janet = users.patch(UpdateRequest::by_id(id, doc! { "name": "Janet" })).await?;
    /// let same = users.patch(doc! { "_id": id, "address.city": "Dodoma" }).await?;
    /// ```
    pub async fn patch(&self, request: impl Into<UpdateRequest>) -> ActionResult<Record> {
        self.update(UpdateVerb::Patch, request.into())
            .await
            .map_err(ActionError::normalized)
    }
}

impl<B: StoreBackend> Instance<'_, B> {
    /// Applies `changes` to this record and saves it, running the `patch` hooks.
    pub async fn patch(self, changes: Changes) -> ActionResult<Record> {
        self.update(UpdateVerb::Patch, changes)
            .await
            .map_err(ActionError::normalized)
    }
}
