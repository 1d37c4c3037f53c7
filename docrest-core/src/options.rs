//! Options accepted by the read and delete verbs.
//!
//! Each type can be built in code or read from an untyped BSON document (the shape an
//! HTTP or CLI adapter typically has at hand) through `TryFrom<bson::Document>`.

use bson::{Bson, Document as BsonDocument, Uuid};
use chrono::{DateTime, Utc};

use crate::{
    error::{ActionError, ActionResult},
    query::{Projection, Sort, SortDirection},
    record::resolve_id,
};

/// Reference expansion applied to read results.
///
/// The value at `path` holds an id (or an array of ids) of records in the collection
/// `from`; it is replaced by the referenced record(s), optionally projected with `select`.
#[derive(Debug, Clone, PartialEq)]
pub struct Populate {
    pub path: String,
    pub from: String,
    pub select: Option<Projection>,
}

impl Populate {
    pub fn new(path: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            from: from.into(),
            select: None,
        }
    }

    pub fn select(mut self, select: Projection) -> Self {
        self.select = Some(select);
        self
    }
}

/// Nested pagination block. Top-level `limit`/`skip`/`page` on [`QueryOptions`] take
/// precedence over these.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paginate {
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub page: Option<i64>,
}

/// Request metadata relevant to reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    /// Only records updated after this instant are returned.
    pub if_modified_since: Option<DateTime<Utc>>,
}

/// Options of a list read.
///
/// The match criteria may be given as `filter`, `criteria` or `query`; the first
/// non-empty one, in that order, is used. A `q` string inside the criteria is a
/// free-text search term rather than a field condition.
///
/// # Example
///
/// ```ignore
/// let options = QueryOptions::builder()
///     .filter(doc! { "age": { "$gte": 18 }, "q": "jan" })
///     .sort(Sort::desc("createdAt"))
///     .page(2)
///     .limit(20)
///     .build();
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub filter: Option<BsonDocument>,
    pub criteria: Option<BsonDocument>,
    pub query: Option<BsonDocument>,
    pub select: Option<Projection>,
    pub sort: Vec<Sort>,
    pub populate: Vec<Populate>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    /// Alias of `skip`, used when `skip` is absent or zero.
    pub offset: Option<i64>,
    pub page: Option<i64>,
    pub paginate: Option<Paginate>,
    pub headers: Headers,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> QueryOptionsBuilder {
        QueryOptionsBuilder::default()
    }

    /// Returns the criteria to match, honoring the `filter`/`criteria`/`query` aliases.
    pub fn match_criteria(&self) -> Option<&BsonDocument> {
        [&self.filter, &self.criteria, &self.query]
            .into_iter()
            .flatten()
            .find(|criteria| !criteria.is_empty())
    }
}

/// Builder for [`QueryOptions`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptionsBuilder {
    options: QueryOptions,
}

impl QueryOptionsBuilder {
    pub fn filter(mut self, filter: BsonDocument) -> Self {
        self.options.filter = Some(filter);
        self
    }

    pub fn select(mut self, select: Projection) -> Self {
        self.options.select = Some(select);
        self
    }

    /// Appends a sort key.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.options.sort.push(sort);
        self
    }

    /// Appends a reference expansion. Expansions run in the order they were added.
    pub fn populate(mut self, populate: Populate) -> Self {
        self.options.populate.push(populate);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.options.skip = Some(skip);
        self
    }

    pub fn page(mut self, page: i64) -> Self {
        self.options.page = Some(page);
        self
    }

    pub fn if_modified_since(mut self, since: DateTime<Utc>) -> Self {
        self.options.headers.if_modified_since = Some(since);
        self
    }

    pub fn build(self) -> QueryOptions {
        self.options
    }
}

impl TryFrom<BsonDocument> for QueryOptions {
    type Error = ActionError;

    fn try_from(document: BsonDocument) -> ActionResult<Self> {
        let paginate = match document.get("paginate") {
            Some(Bson::Document(paginate)) => Some(Paginate {
                limit: read_int(paginate, "limit")?,
                skip: read_int(paginate, "skip")?,
                page: read_int(paginate, "page")?,
            }),
            Some(Bson::Null) | None => None,
            Some(_) => return Err(ActionError::invalid_argument("paginate must be a document")),
        };

        let if_modified_since = match document.get("headers") {
            Some(Bson::Document(headers)) => read_datetime(headers, "ifModifiedSince")?,
            _ => None,
        };

        Ok(Self {
            filter: read_document(&document, "filter")?,
            criteria: read_document(&document, "criteria")?,
            query: read_document(&document, "query")?,
            select: read_projection(&document)?,
            sort: read_sort(&document)?,
            populate: read_populate(&document)?,
            limit: read_int(&document, "limit")?,
            skip: read_int(&document, "skip")?,
            offset: read_int(&document, "offset")?,
            page: read_int(&document, "page")?,
            paginate,
            headers: Headers { if_modified_since },
        })
    }
}

/// Options of an id lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetByIdOptions {
    pub id: Option<Uuid>,
    pub select: Option<Projection>,
    pub populate: Vec<Populate>,
    /// Extra criteria the record must also match.
    pub filter: Option<BsonDocument>,
}

impl GetByIdOptions {
    pub fn new(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn select(mut self, select: Projection) -> Self {
        self.select = Some(select);
        self
    }

    pub fn populate(mut self, populate: Populate) -> Self {
        self.populate.push(populate);
        self
    }

    pub fn filter(mut self, filter: BsonDocument) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl From<Uuid> for GetByIdOptions {
    fn from(id: Uuid) -> Self {
        Self::new(id)
    }
}

impl TryFrom<BsonDocument> for GetByIdOptions {
    type Error = ActionError;

    fn try_from(document: BsonDocument) -> ActionResult<Self> {
        Ok(Self {
            id: read_id(&document)?,
            select: read_projection(&document)?,
            populate: read_populate(&document)?,
            filter: read_document(&document, "filter")?,
        })
    }
}

/// Options of a delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    pub id: Option<Uuid>,
    /// Stamp the deletion timestamp instead of removing the record.
    pub soft: bool,
    /// Extra criteria the record must also match.
    pub filter: Option<BsonDocument>,
}

impl DeleteOptions {
    pub fn new(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn soft(mut self) -> Self {
        self.soft = true;
        self
    }

    pub fn filter(mut self, filter: BsonDocument) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl From<Uuid> for DeleteOptions {
    fn from(id: Uuid) -> Self {
        Self::new(id)
    }
}

impl TryFrom<BsonDocument> for DeleteOptions {
    type Error = ActionError;

    fn try_from(document: BsonDocument) -> ActionResult<Self> {
        let soft = match document.get("soft") {
            Some(Bson::Boolean(soft)) => *soft,
            Some(Bson::String(soft)) => soft == "true",
            Some(Bson::Null) | None => false,
            Some(_) => return Err(ActionError::invalid_argument("soft must be a boolean")),
        };

        Ok(Self {
            id: read_id(&document)?,
            soft,
            filter: read_document(&document, "filter")?,
        })
    }
}

pub(crate) fn read_id(document: &BsonDocument) -> ActionResult<Option<Uuid>> {
    resolve_id(document)
        .transpose()
        .map_err(|raw| ActionError::invalid_argument(format!("{raw} is not a valid id")))
}

fn read_document(document: &BsonDocument, key: &str) -> ActionResult<Option<BsonDocument>> {
    match document.get(key) {
        Some(Bson::Document(value)) => Ok(Some(value.clone())),
        Some(Bson::Null) | None => Ok(None),
        Some(_) => Err(ActionError::invalid_argument(format!("{key} must be a document"))),
    }
}

fn read_int(document: &BsonDocument, key: &str) -> ActionResult<Option<i64>> {
    match document.get(key) {
        Some(Bson::Int32(value)) => Ok(Some(i64::from(*value))),
        Some(Bson::Int64(value)) => Ok(Some(*value)),
        Some(Bson::Double(value)) => Ok(Some(value.trunc() as i64)),
        Some(Bson::String(value)) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ActionError::invalid_argument(format!("{key} must be a number"))),
        Some(Bson::Null) | None => Ok(None),
        Some(_) => Err(ActionError::invalid_argument(format!("{key} must be a number"))),
    }
}

fn read_datetime(document: &BsonDocument, key: &str) -> ActionResult<Option<DateTime<Utc>>> {
    match document.get(key) {
        Some(Bson::DateTime(value)) => Ok(Some(value.to_chrono())),
        Some(Bson::String(value)) => DateTime::parse_from_rfc3339(value)
            .map(|value| Some(value.with_timezone(&Utc)))
            .map_err(|_| ActionError::invalid_argument(format!("{key} must be an RFC 3339 date"))),
        Some(Bson::Null) | None => Ok(None),
        Some(_) => Err(ActionError::invalid_argument(format!("{key} must be a date"))),
    }
}

/// Reads `select` either as `"name -age"` or as `{ name: 1, age: 0 }`.
fn read_projection(document: &BsonDocument) -> ActionResult<Option<Projection>> {
    match document.get("select") {
        Some(Bson::String(spec)) if spec.trim().is_empty() => Ok(None),
        Some(Bson::String(spec)) => Ok(Some(Projection::parse(spec)?)),
        Some(Bson::Document(fields)) if fields.is_empty() => Ok(None),
        Some(Bson::Document(fields)) => {
            let spec = fields
                .iter()
                .map(|(field, flag)| match truthy(flag) {
                    true => field.clone(),
                    false => format!("-{field}"),
                })
                .collect::<Vec<_>>()
                .join(" ");
            Ok(Some(Projection::parse(&spec)?))
        }
        Some(Bson::Null) | None => Ok(None),
        Some(_) => Err(ActionError::invalid_argument("select must be a string or a document")),
    }
}

/// Reads `sort` either as `"name -age"` or as `{ name: 1, age: -1 }` (`"asc"`/`"desc"` are
/// accepted as values too).
fn read_sort(document: &BsonDocument) -> ActionResult<Vec<Sort>> {
    match document.get("sort") {
        Some(Bson::String(spec)) => Ok(spec
            .split_whitespace()
            .map(|token| match token.strip_prefix('-') {
                Some(field) => Sort::desc(field),
                None => Sort::asc(token.trim_start_matches('+')),
            })
            .collect()),
        Some(Bson::Document(fields)) => fields
            .iter()
            .map(|(field, direction)| {
                let direction = match direction {
                    Bson::Int32(-1) | Bson::Int64(-1) => SortDirection::Desc,
                    Bson::Double(value) if *value < 0.0 => SortDirection::Desc,
                    Bson::String(value) if value.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                    Bson::Int32(1) | Bson::Int64(1) | Bson::Double(_) => SortDirection::Asc,
                    Bson::String(value) if value.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                    _ => {
                        return Err(ActionError::invalid_argument(format!(
                            "sort direction of {field} must be 1, -1, \"asc\" or \"desc\""
                        )));
                    }
                };
                Ok(Sort { field: field.clone(), direction })
            })
            .collect(),
        Some(Bson::Null) | None => Ok(Vec::new()),
        Some(_) => Err(ActionError::invalid_argument("sort must be a string or a document")),
    }
}

/// Reads `populate` as one `{ path, from, select }` document or an array of them.
fn read_populate(document: &BsonDocument) -> ActionResult<Vec<Populate>> {
    let specs = match document.get("populate") {
        Some(Bson::Document(spec)) => vec![spec],
        Some(Bson::Array(specs)) => specs
            .iter()
            .map(|spec| {
                spec.as_document()
                    .ok_or_else(|| ActionError::invalid_argument("populate entries must be documents"))
            })
            .collect::<ActionResult<_>>()?,
        Some(Bson::Null) | None => Vec::new(),
        Some(_) => return Err(ActionError::invalid_argument("populate must be a document or an array")),
    };

    specs
        .into_iter()
        .map(|spec| {
            let path = spec
                .get_str("path")
                .map_err(|_| ActionError::invalid_argument("populate requires a path"))?;
            let from = spec
                .get_str("from")
                .or_else(|_| spec.get_str("model"))
                .map_err(|_| ActionError::invalid_argument("populate requires a from collection"))?;

            Ok(Populate {
                path: path.to_string(),
                from: from.to_string(),
                select: read_projection(spec)?,
            })
        })
        .collect()
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(value) => *value,
        Bson::Int32(value) => *value != 0,
        Bson::Int64(value) => *value != 0,
        Bson::Double(value) => *value != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionErrorKind;
    use bson::doc;

    #[test]
    fn match_criteria_prefers_first_non_empty_alias() {
        let options = QueryOptions {
            filter: Some(doc! {}),
            criteria: Some(doc! { "name": "Jane" }),
            query: Some(doc! { "name": "John" }),
            ..QueryOptions::default()
        };
        assert_eq!(options.match_criteria(), Some(&doc! { "name": "Jane" }));

        assert_eq!(QueryOptions::default().match_criteria(), None);
    }

    #[test]
    fn query_options_read_from_document() {
        let options = QueryOptions::try_from(doc! {
            "filter": { "age": { "$gte": 18 } },
            "select": { "name": 1, "age": 1 },
            "sort": { "age": -1, "name": "asc" },
            "paginate": { "limit": "20", "page": 2 },
            "populate": [{ "path": "guardian", "from": "guardians", "select": "name" }],
            "headers": { "ifModifiedSince": "2020-01-01T00:00:00Z" },
        })
        .unwrap();

        assert_eq!(options.sort, vec![Sort::desc("age"), Sort::asc("name")]);
        assert_eq!(options.select, Some(Projection::include(["name", "age"])));
        assert_eq!(
            options.paginate,
            Some(Paginate { limit: Some(20), skip: None, page: Some(2) })
        );
        assert_eq!(
            options.populate,
            vec![Populate::new("guardian", "guardians").select(Projection::include(["name"]))]
        );
        assert!(options.headers.if_modified_since.is_some());
    }

    #[test]
    fn sort_string_form() {
        let options = QueryOptions::try_from(doc! { "sort": "name -createdAt" }).unwrap();
        assert_eq!(options.sort, vec![Sort::asc("name"), Sort::desc("createdAt")]);
    }

    #[test]
    fn get_by_id_reads_legacy_id() {
        let id = Uuid::new();
        let options = GetByIdOptions::try_from(doc! { "id": id.to_string(), "select": "name" }).unwrap();

        assert_eq!(options.id, Some(id));
        assert_eq!(options.select, Some(Projection::include(["name"])));
    }

    #[test]
    fn delete_options_read_soft_flag() {
        let id = Uuid::new();
        let options = DeleteOptions::try_from(doc! { "_id": id, "soft": true }).unwrap();

        assert_eq!(options, DeleteOptions::new(id).soft());
        assert_eq!(DeleteOptions::try_from(doc! {}).unwrap().id, None);
    }

    #[test]
    fn malformed_ids_are_invalid_arguments() {
        let error = DeleteOptions::try_from(doc! { "_id": "not-a-uuid" }).unwrap_err();

        assert_eq!(error.status(), 400);
        assert!(matches!(error.kind(), ActionErrorKind::InvalidArgument(_)));
    }
}
