//! The record type verbs operate on.
//!
//! A [`Record`] is a BSON document whose `_id` is a UUID, together with a flag telling
//! whether it has already been persisted. Saving a new record inserts it, saving a
//! persisted record updates it.
//!
//! Populating a record swaps reference ids for the documents they point to. The record
//! keeps the ids it replaced, and saving writes those ids back instead of the expanded
//! documents.

use bson::{
    Bson, DateTime as BsonDateTime, Document as BsonDocument, Uuid,
    de::deserialize_from_bson, spec::BinarySubtype,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Field holding the identifier of every record.
pub const ID_FIELD: &str = "_id";

/// Legacy alias accepted wherever an identifier is read from caller input.
pub const LEGACY_ID_FIELD: &str = "id";

/// A mapping of field paths to new values, as passed to `put`/`patch`.
pub type Changes = BsonDocument;

/// A single document managed through the verbs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BsonDocument", into = "BsonDocument")]
pub struct Record {
    document: BsonDocument,
    is_new: bool,
    populated: Vec<(String, Bson)>,
}

impl Record {
    /// Creates a new, not yet persisted record from plain fields.
    ///
    /// The identifier is taken from `_id` (or the legacy `id` key) when present, otherwise
    /// a fresh UUID is generated.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if an identifier is present but is
    /// not a UUID.
    pub fn new(fields: BsonDocument) -> DocumentStoreResult<Self> {
        let mut document = fields;
        let id = match resolve_id(&document) {
            Some(Ok(id)) => id,
            Some(Err(raw)) => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "identifier {raw} is not a UUID"
                )));
            }
            None => Uuid::new(),
        };

        if !document.contains_key(ID_FIELD) {
            document.remove(LEGACY_ID_FIELD);
        }
        document.insert(ID_FIELD, id);

        Ok(Self {
            document,
            is_new: true,
            populated: Vec::new(),
        })
    }

    /// Wraps a document loaded from a store.
    pub fn persisted(document: BsonDocument) -> Self {
        Self {
            document,
            is_new: false,
            populated: Vec::new(),
        }
    }

    /// Wraps a BSON value returned by a store backend.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if the value is not a document.
    pub fn from_bson(value: Bson) -> DocumentStoreResult<Self> {
        match value {
            Bson::Document(document) => Ok(Self::persisted(document)),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "expected a document, found {:?}",
                other.element_type()
            ))),
        }
    }

    /// Creates a new record from a typed document.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not serialize to a BSON document or carries an
    /// invalid identifier.
    pub fn from_typed<D: Document>(value: &D) -> DocumentStoreResult<Self> {
        match value.to_bson()? {
            Bson::Document(document) => Self::new(document),
            _ => Err(DocumentStoreError::InvalidDocument(format!(
                "{} does not serialize to a document",
                D::collection_name()
            ))),
        }
    }

    /// Deserializes this record into a typed document.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not match the shape of `D`.
    pub fn to_typed<D: Document>(&self) -> DocumentStoreResult<D> {
        Ok(deserialize_from_bson(Bson::Document(self.document.clone()))?)
    }

    /// Returns the identifier of this record.
    pub fn id(&self) -> Option<Uuid> {
        self.document.get(ID_FIELD).and_then(uuid_from_bson)
    }

    /// Returns `true` until the record has been saved once.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.is_new = false;
    }

    /// Returns the value at a dotted field path.
    pub fn get(&self, path: &str) -> Option<&Bson> {
        let mut segments = path.split('.');
        let mut current = self.document.get(segments.next()?)?;

        for segment in segments {
            current = current.as_document()?.get(segment)?;
        }

        Some(current)
    }

    /// Returns the timestamp stored at `field`, if it holds a date.
    pub fn get_datetime(&self, field: &str) -> Option<DateTime<Utc>> {
        match self.get(field)? {
            Bson::DateTime(value) => Some(value.to_chrono()),
            _ => None,
        }
    }

    /// Assigns every change onto this record. Dotted paths create missing intermediate
    /// documents.
    ///
    /// A change covering a populated path replaces the reference, so the id it held is
    /// forgotten.
    pub fn set(&mut self, changes: &Changes) {
        for (path, value) in changes {
            self.populated.retain(|(populated, _)| !covers(path, populated));
            set_path(&mut self.document, path, value.clone());
        }
    }

    /// Replaces the reference at `path` by its expansion, remembering the value it held.
    pub(crate) fn expand_reference(&mut self, path: &str, expanded: Bson) {
        let Some(original) = self.get(path).cloned() else {
            return;
        };

        if !self.populated.iter().any(|(populated, _)| populated == path) {
            self.populated.push((path.to_string(), original));
        }
        set_path(&mut self.document, path, expanded);
    }

    /// Returns the paths expanded by a populate, in the order they were expanded.
    pub fn populated_paths(&self) -> impl Iterator<Item = &str> {
        self.populated.iter().map(|(path, _)| path.as_str())
    }

    /// Returns the document to write to a store: populated paths hold their reference ids
    /// again.
    pub(crate) fn to_stored(&self) -> BsonDocument {
        let mut document = self.document.clone();
        for (path, original) in &self.populated {
            set_path(&mut document, path, original.clone());
        }

        document
    }

    pub(crate) fn stamp(&mut self, field: &str, at: BsonDateTime) {
        set_path(&mut self.document, field, Bson::DateTime(at));
    }

    /// Returns the underlying document.
    pub fn document(&self) -> &BsonDocument {
        &self.document
    }

    /// Consumes the record, returning the underlying document.
    pub fn into_document(self) -> BsonDocument {
        self.document
    }
}

impl From<BsonDocument> for Record {
    fn from(document: BsonDocument) -> Self {
        Self::persisted(document)
    }
}

impl From<Record> for BsonDocument {
    fn from(record: Record) -> Self {
        record.document
    }
}

/// Reads a UUID out of a BSON value. Accepts binary UUIDs and their string form.
pub fn uuid_from_bson(value: &Bson) -> Option<Uuid> {
    match value {
        Bson::Binary(binary) if binary.subtype == BinarySubtype::Uuid => {
            <[u8; 16]>::try_from(binary.bytes.as_slice())
                .ok()
                .map(Uuid::from_bytes)
        }
        Bson::String(value) => Uuid::parse_str(value).ok(),
        _ => None,
    }
}

/// Looks up the identifier of a caller supplied document, preferring `_id` over the legacy
/// `id` key.
///
/// Returns `None` when neither key holds a value, and `Some(Err(raw))` with the raw value
/// when the identifier is present but is not a UUID.
pub(crate) fn resolve_id(document: &BsonDocument) -> Option<Result<Uuid, Bson>> {
    [ID_FIELD, LEGACY_ID_FIELD]
        .into_iter()
        .filter_map(|key| document.get(key))
        .find(|value| !matches!(value, Bson::Null))
        .map(|value| uuid_from_bson(value).ok_or_else(|| value.clone()))
}

/// Whether assigning `path` overwrites the value at `other`.
fn covers(path: &str, other: &str) -> bool {
    other
        .strip_prefix(path)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

fn set_path(document: &mut BsonDocument, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, BsonDocument::new());
            }
            if let Some(Bson::Document(child)) = document.get_mut(head) {
                set_path(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn new_record_generates_identifier() {
        let record = Record::new(doc! { "name": "Jane" }).unwrap();
        assert!(record.is_new());
        assert!(record.id().is_some());
        assert_eq!(record.get("name"), Some(&Bson::String("Jane".into())));
    }

    #[test]
    fn new_record_keeps_legacy_identifier() {
        let id = Uuid::new();
        let record = Record::new(doc! { "id": id.to_string(), "name": "Jane" }).unwrap();
        assert_eq!(record.id(), Some(id));
        assert!(record.get("id").is_none());
    }

    #[test]
    fn new_record_rejects_malformed_identifier() {
        let error = Record::new(doc! { "_id": 42 }).unwrap_err();
        assert!(matches!(error, DocumentStoreError::InvalidDocument(_)));
    }

    #[test]
    fn set_creates_nested_paths() {
        let mut record = Record::new(doc! { "name": "Jane", "address": "n/a" }).unwrap();
        record.set(&doc! { "name": "Janet", "address.city": "Dodoma", "meta.tags": ["a"] });

        assert_eq!(record.get("name"), Some(&Bson::String("Janet".into())));
        assert_eq!(record.get("address.city"), Some(&Bson::String("Dodoma".into())));
        assert!(record.get("meta.tags").is_some());
    }

    #[test]
    fn expanded_references_are_stored_as_ids() {
        let guardian = Uuid::new();
        let mut record = Record::persisted(doc! { "_id": Uuid::new(), "guardian": guardian });
        record.expand_reference("guardian", Bson::Document(doc! { "_id": guardian, "name": "Jane" }));
        record.expand_reference("missing", Bson::Null);

        assert_eq!(record.populated_paths().collect::<Vec<_>>(), vec!["guardian"]);
        assert!(matches!(record.get("guardian"), Some(Bson::Document(_))));
        assert_eq!(record.to_stored().get("guardian"), Some(&Bson::from(guardian)));
        assert!(record.to_stored().get("missing").is_none());
    }

    #[test]
    fn setting_a_populated_path_forgets_the_reference() {
        let guardian = Uuid::new();
        let other = Uuid::new();
        let mut record = Record::persisted(doc! { "_id": Uuid::new(), "guardian": guardian });
        record.expand_reference("guardian", Bson::Document(doc! { "_id": guardian }));

        record.set(&doc! { "guardianship": "full" });
        assert_eq!(record.populated_paths().count(), 1);

        record.set(&doc! { "guardian": other });
        assert_eq!(record.populated_paths().count(), 0);
        assert_eq!(record.to_stored().get("guardian"), Some(&Bson::from(other)));
    }

    #[test]
    fn datetime_accessor_reads_bson_dates() {
        let mut record = Record::new(doc! {}).unwrap();
        let now = BsonDateTime::now();
        record.stamp("updatedAt", now);

        assert_eq!(record.get_datetime("updatedAt"), Some(now.to_chrono()));
        assert_eq!(record.get_datetime("missing"), None);
    }
}
