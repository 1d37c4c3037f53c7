//! Update pipeline shared by `put` and `patch`.
//!
//! Static form: resolve the request, look the record up unless a loaded record was given,
//! then continue with the instance form.
//!
//! Instance form: drop protected fields from the changes, run the before hook with the
//! record and the changes, apply the changes, save, run the after hook with the saved
//! record and the changes.

use log::debug;

use crate::{
    backend::StoreBackend,
    config::SchemaOptions,
    error::ActionResult,
    hooks::{ModelHooks, UpdateHook, invoke},
    model::{Instance, Model},
    record::{Changes, ID_FIELD, LEGACY_ID_FIELD, Record},
    request::{UpdateRequest, UpdateTarget},
};

/// Which of the two update verbs is running. They only differ by their hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpdateVerb {
    Put,
    Patch,
}

impl UpdateVerb {
    fn name(self) -> &'static str {
        match self {
            UpdateVerb::Put => "put",
            UpdateVerb::Patch => "patch",
        }
    }

    fn hooks(self, hooks: &ModelHooks) -> (Option<&UpdateHook>, Option<&UpdateHook>) {
        match self {
            UpdateVerb::Put => (hooks.before_put.get(), hooks.after_put.get()),
            UpdateVerb::Patch => (hooks.before_patch.get(), hooks.after_patch.get()),
        }
    }
}

impl<'a, B: StoreBackend> Model<'a, B> {
    pub(crate) async fn update(&self, verb: UpdateVerb, request: UpdateRequest) -> ActionResult<Record> {
        match request.resolve()? {
            UpdateTarget::Instance(record) => {
                self.instance(record)
                    .update(verb, Changes::new())
                    .await
            }
            UpdateTarget::Lookup { id, changes } => {
                let existing = self.find_existing(id, None, None).await?;
                self.instance(existing)
                    .update(verb, changes)
                    .await
            }
        }
    }
}

impl<B: StoreBackend> Instance<'_, B> {
    pub(crate) async fn update(self, verb: UpdateVerb, changes: Changes) -> ActionResult<Record> {
        let Instance { model, record } = self;
        let changes = without_protected(changes, model.schema().options());
        let (before, after) = verb.hooks(model.schema().hooks());

        debug!(
            "Running {} on record {:?} of '{}' with {} change(s)",
            verb.name(),
            record.id(),
            model.name(),
            changes.len()
        );

        let mut record = invoke(before, record, |record| (record.clone(), changes.clone())).await?;
        record.set(&changes);

        let saved = model.save(record).await?;

        invoke(after, saved, |saved| (saved.clone(), changes.clone())).await
    }
}

/// Drops the fields callers may never change: the id and the timestamps maintained by
/// the store.
fn without_protected(mut changes: Changes, options: &SchemaOptions) -> Changes {
    for field in [
        ID_FIELD,
        LEGACY_ID_FIELD,
        options.created_at_field.as_str(),
        options.updated_at_field.as_str(),
    ] {
        changes.remove(field);
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{DateTime as BsonDateTime, Uuid, doc};

    #[test]
    fn protected_fields_are_dropped() {
        let changes = doc! {
            "_id": Uuid::new(),
            "id": "legacy",
            "createdAt": BsonDateTime::now(),
            "updatedAt": BsonDateTime::now(),
            "name": "Janet",
            "deletedAt": BsonDateTime::now(),
        };

        let kept = without_protected(changes, &SchemaOptions::default());
        assert_eq!(kept.keys().collect::<Vec<_>>(), vec!["name", "deletedAt"]);
    }
}
