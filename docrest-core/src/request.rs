//! Call shapes of the write verbs.
//!
//! `post`, `put` and `patch` accept several shapes of arguments. Each shape is one variant
//! of a request enum, and every shape is resolved into a single canonical form before any
//! hook or store call runs.

use bson::{Bson, Document as BsonDocument, Uuid};

use crate::{
    error::{ActionError, ActionResult},
    options::read_id,
    record::{Changes, Record, uuid_from_bson},
};

/// Body of a `post`.
#[derive(Debug, Clone, PartialEq)]
pub enum PostBody {
    /// Plain fields of a record to create. The id is taken from `_id` (or `id`) when
    /// present, otherwise generated.
    Fields(BsonDocument),
    /// An already constructed record, saved as is.
    Instance(Record),
}

impl PostBody {
    pub(crate) fn into_record(self) -> ActionResult<Record> {
        match self {
            PostBody::Fields(fields) => {
                Record::new(fields).map_err(|err| ActionError::invalid_argument(err.to_string()))
            }
            PostBody::Instance(record) => Ok(record),
        }
    }
}

impl From<BsonDocument> for PostBody {
    fn from(fields: BsonDocument) -> Self {
        PostBody::Fields(fields)
    }
}

impl From<Record> for PostBody {
    fn from(record: Record) -> Self {
        PostBody::Instance(record)
    }
}

/// Updates addressed to a known id.
#[derive(Debug, Clone, PartialEq)]
pub enum Updates {
    Fields(Changes),
    Instance(Record),
}

impl From<BsonDocument> for Updates {
    fn from(changes: BsonDocument) -> Self {
        Updates::Fields(changes)
    }
}

impl From<Record> for Updates {
    fn from(record: Record) -> Self {
        Updates::Instance(record)
    }
}

/// Arguments of a static `put` or `patch`.
///
/// # Example
///
/// ```ignore
/// // (id, updates)
/// users.patch(UpdateRequest::by_id(id, doc! { "name": "Janet" })).await?;
/// // (updates carrying their own id)
/// users.patch(doc! { "_id": id, "name": "Janet" }).await?;
/// // (a loaded record)
/// users.patch(record).await?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateRequest {
    ById { id: Uuid, updates: Updates },
    ByUpdates(BsonDocument),
    ByInstance(Record),
}

/// Canonical form of an [`UpdateRequest`].
#[derive(Debug)]
pub(crate) enum UpdateTarget {
    /// A loaded record; no lookup is needed and no changes are applied.
    Instance(Record),
    /// The record `id` must be looked up, then `changes` applied to it.
    Lookup { id: Uuid, changes: Changes },
}

impl UpdateRequest {
    pub fn by_id(id: Uuid, updates: impl Into<Updates>) -> Self {
        UpdateRequest::ById { id, updates: updates.into() }
    }

    /// Builds a request from positional, untyped arguments: `[id, updates]` or
    /// `[updates]`.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalArguments` for any other arity or when the updates are not a
    /// document, and with an invalid-argument error when the id is not a UUID.
    pub fn from_args(args: Vec<Bson>) -> ActionResult<Self> {
        let mut args = args.into_iter();

        match (args.next(), args.next(), args.next()) {
            (Some(Bson::Document(updates)), None, None) => Ok(UpdateRequest::ByUpdates(updates)),
            (Some(Bson::Null), Some(Bson::Document(updates)), None) => {
                Ok(UpdateRequest::ByUpdates(updates))
            }
            (Some(id), Some(Bson::Document(updates)), None) => {
                let id = uuid_from_bson(&id)
                    .ok_or_else(|| ActionError::invalid_argument(format!("{id} is not a valid id")))?;
                Ok(UpdateRequest::by_id(id, updates))
            }
            _ => Err(ActionError::illegal_arguments()),
        }
    }

    pub(crate) fn resolve(self) -> ActionResult<UpdateTarget> {
        match self {
            UpdateRequest::ById { id, updates } => Ok(match updates {
                // A loaded record addressed to its own id is taken as is
                Updates::Instance(record) if !record.is_new() && record.id() == Some(id) => {
                    UpdateTarget::Instance(record)
                }
                Updates::Instance(record) => UpdateTarget::Lookup {
                    id,
                    changes: record.to_stored(),
                },
                Updates::Fields(changes) => UpdateTarget::Lookup { id, changes },
            }),
            UpdateRequest::ByUpdates(changes) => {
                let id = read_id(&changes)?.ok_or_else(ActionError::missing_instance_id)?;
                Ok(UpdateTarget::Lookup { id, changes })
            }
            UpdateRequest::ByInstance(record) => match record.id() {
                Some(_) if !record.is_new() => Ok(UpdateTarget::Instance(record)),
                Some(id) => Ok(UpdateTarget::Lookup {
                    id,
                    changes: record.to_stored(),
                }),
                None => Err(ActionError::missing_instance_id()),
            },
        }
    }
}

impl From<BsonDocument> for UpdateRequest {
    fn from(updates: BsonDocument) -> Self {
        UpdateRequest::ByUpdates(updates)
    }
}

impl From<Record> for UpdateRequest {
    fn from(record: Record) -> Self {
        UpdateRequest::ByInstance(record)
    }
}

impl From<(Uuid, BsonDocument)> for UpdateRequest {
    fn from((id, updates): (Uuid, BsonDocument)) -> Self {
        UpdateRequest::by_id(id, updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionErrorKind;
    use bson::doc;

    fn loaded(id: Uuid) -> Record {
        Record::persisted(doc! { "_id": id, "name": "Jane" })
    }

    #[test]
    fn instance_with_same_id_is_used_as_is() {
        let id = Uuid::new();
        let target = UpdateRequest::by_id(id, loaded(id)).resolve().unwrap();

        assert!(matches!(target, UpdateTarget::Instance(record) if record.id() == Some(id)));
    }

    #[test]
    fn instance_with_other_id_is_copied_as_changes() {
        let id = Uuid::new();
        let target = UpdateRequest::by_id(id, loaded(Uuid::new())).resolve().unwrap();

        assert!(matches!(
            target,
            UpdateTarget::Lookup { id: target_id, changes } if target_id == id && changes.get_str("name").ok() == Some("Jane")
        ));
    }

    #[test]
    fn updates_must_carry_an_id() {
        let error = UpdateRequest::from(doc! { "name": "Jane" }).resolve().unwrap_err();
        assert!(matches!(error.kind(), ActionErrorKind::MissingInstanceId));
        assert_eq!(error.status(), 400);

        let id = Uuid::new();
        let target = UpdateRequest::from(doc! { "id": id.to_string() }).resolve().unwrap();
        assert!(matches!(target, UpdateTarget::Lookup { id: target_id, .. } if target_id == id));
    }

    #[test]
    fn positional_arguments_follow_arity_rules() {
        let id = Uuid::new();

        assert_eq!(
            UpdateRequest::from_args(vec![Bson::String(id.to_string()), Bson::Document(doc! { "a": 1 })])
                .unwrap(),
            UpdateRequest::by_id(id, doc! { "a": 1 })
        );
        assert_eq!(
            UpdateRequest::from_args(vec![Bson::Document(doc! { "a": 1 })]).unwrap(),
            UpdateRequest::ByUpdates(doc! { "a": 1 })
        );

        for args in [vec![], vec![Bson::Int32(1)], vec![Bson::Null, Bson::Null, Bson::Null]] {
            let error = UpdateRequest::from_args(args).unwrap_err();
            assert!(matches!(error.kind(), ActionErrorKind::IllegalArguments));
        }
    }

    #[test]
    fn post_fields_with_bad_id_are_rejected() {
        let error = PostBody::from(doc! { "_id": "nope" }).into_record().unwrap_err();
        assert!(matches!(error.kind(), ActionErrorKind::InvalidArgument(_)));
    }
}
