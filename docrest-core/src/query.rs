//! Query construction and filtering API for document stores.
//!
//! This module describes the query shape verbs hand to a store backend: a filter expression
//! tree, an optional free-text search, sort keys, a projection and a pagination window,
//! plus a visitor trait backends use to evaluate or translate filter expressions.
//!
//! # Query Building
//!
//! Queries can be constructed using the fluent builder API:
//!
//! ```ignore
//! use docrest::query::{Query, Filter, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("name", "Alice"))
//!     .limit(10)
//!     .offset(0)
//!     .sort("createdAt", SortDirection::Desc)
//!     .build();
//! ```
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides a collection of static methods for building filter expressions:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Existence: `exists`, `not_exists`
//! - Array: `any_of`, `none_of`
//! - Logical: `and`, `or`
//!
//! These are the expressions criteria documents translate to, see
//! [`criteria_to_expr`](crate::criteria::criteria_to_expr).

use bson::Bson;

use crate::error::DocumentStoreError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification for query results.
///
/// Specifies which field to sort by and in which direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Array contains any of the values.
    AnyOf,
    /// Array contains none of the values.
    NoneOf,
}

/// A filter expression for querying documents.
///
/// Expressions can be combined using logical operators (`And`, `Or`)
/// to build complex filter predicates.
///
/// # Example
///
/// ```ignore
/// use docrest::query::{Expr, Filter, FieldOp};
///
/// // Simple equality check
/// let expr1 = Filter::eq("status", "active");
///
/// // Complex nested expression
/// let expr2 = Filter::and(vec![
///     Filter::eq("status", "active"),
///     Filter::gt("age", 18)
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }
}

/// A structured query for retrieving and filtering documents.
///
/// This struct encapsulates the filter, free-text search, sort keys, projection and
/// pagination window handed to a store backend. Use [`QueryBuilder`] for ergonomic
/// construction.
///
/// # Example
///
/// ```ignore
/// use docrest::query::{Query, Filter, SortDirection};
///
/// let query = Query::builder()
///     .filter(Filter::eq("status", "active"))
///     .limit(10)
///     .offset(0)
///     .sort("createdAt", SortDirection::Desc)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
    /// Optional free-text search, combined with the filter using AND.
    pub search: Option<TextSearch>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip (for pagination).
    pub offset: Option<usize>,
    /// Sort keys, most significant first.
    pub sort: Vec<Sort>,
    /// Fields to keep in (or strip from) returned documents.
    pub projection: Option<Projection>,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// A free-text search term, matched case-insensitively against `fields`.
///
/// An empty field list lets the backend search every top-level string field.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearch {
    /// The term to look for.
    pub term: String,
    /// The fields to search in.
    pub fields: Vec<String>,
}

impl TextSearch {
    pub fn new(term: impl Into<String>, fields: Vec<String>) -> Self {
        Self { term: term.into(), fields }
    }
}

/// Whether a [`Projection`] lists the fields to keep or the fields to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Only the listed fields (plus `_id`) are returned.
    Include,
    /// Every field except the listed ones is returned.
    Exclude,
}

/// Selection of top-level fields returned by a query.
///
/// `_id` is always returned unless explicitly excluded with `-_id`.
///
/// # Example
///
/// ```ignore
/// use docrest::query::Projection;
///
/// let select = Projection::parse("name email -_id")?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    mode: ProjectionMode,
    fields: Vec<String>,
    exclude_id: bool,
}

impl Projection {
    /// Keeps only the given fields.
    pub fn include<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            mode: ProjectionMode::Include,
            fields: fields.into_iter().map(Into::into).collect(),
            exclude_id: false,
        }
    }

    /// Drops the given fields.
    pub fn exclude<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            mode: ProjectionMode::Exclude,
            fields: fields.into_iter().map(Into::into).collect(),
            exclude_id: false,
        }
    }

    /// Parses the space separated `"name -age"` form.
    ///
    /// A leading `-` excludes a field, a bare name or a leading `+` includes it. Inclusions
    /// and exclusions cannot be mixed, except for `-_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] when the specification mixes modes.
    pub fn parse(spec: &str) -> Result<Self, DocumentStoreError> {
        let mut included = Vec::new();
        let mut excluded = Vec::new();
        let mut exclude_id = false;

        for token in spec.split_whitespace() {
            match token.strip_prefix('-') {
                Some("_id") => exclude_id = true,
                Some(field) => excluded.push(field.to_string()),
                None => included.push(token.trim_start_matches('+').to_string()),
            }
        }

        let mut projection = match (included.is_empty(), excluded.is_empty()) {
            (false, false) => {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "projection {spec:?} mixes inclusion and exclusion"
                )));
            }
            (false, true) => Self::include(included),
            (true, _) => Self::exclude(excluded),
        };
        projection.exclude_id = exclude_id;

        Ok(projection)
    }

    /// Also drops `_id` from the returned documents.
    pub fn without_id(mut self) -> Self {
        self.exclude_id = true;
        self
    }

    /// Returns the projection mode.
    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    /// Returns the listed fields.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Applies this projection to a document.
    pub fn apply(&self, document: &bson::Document) -> bson::Document {
        let listed = |key: &str| self.fields.iter().any(|field| field == key);

        document
            .iter()
            .filter(|(key, _)| match key.as_str() {
                "_id" => !self.exclude_id,
                key => match self.mode {
                    ProjectionMode::Include => listed(key),
                    ProjectionMode::Exclude => !listed(key),
                },
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Helper struct for constructing filter expressions.
///
/// Provides static methods to construct common filter expressions in a type-safe manner.
/// All methods accept field names and values as `Into<String>` and `Into<Bson>` for ergonomics.
///
/// # Example
///
/// ```ignore
/// use docrest::query::Filter;
///
/// let expr = Filter::and([Filter::eq("name", "Alice"), Filter::gt("age", 18)]);
/// ```
pub struct Filter;

impl Filter {
    /// Creates an equality filter expression.
    ///
    /// Matches documents where the field equals the specified value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Creates a not-equal filter expression.
    ///
    /// Matches documents where the field does not equal the specified value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Creates a greater-than filter expression.
    ///
    /// Matches documents where the field is greater than the specified value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Creates a greater-than-or-equal filter expression.
    ///
    /// Matches documents where the field is greater than or equal to the specified value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Creates a less-than filter expression.
    ///
    /// Matches documents where the field is less than the specified value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Creates a less-than-or-equal filter expression.
    ///
    /// Matches documents where the field is less than or equal to the specified value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Creates an existence filter expression.
    ///
    /// Matches documents where the field exists (is not null or missing).
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Creates a non-existence filter expression.
    ///
    /// Matches documents where the field does not exist (is null or missing).
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// Creates a logical AND filter expression.
    ///
    /// Combines multiple expressions such that all must match for a document to be included.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Creates a logical OR filter expression.
    ///
    /// Combines multiple expressions such that any can match for a document to be included.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Creates an array membership filter expression.
    ///
    /// Matches documents where the array field contains any of the specified values.
    pub fn any_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, value.into())
    }

    /// Creates an array exclusion filter expression.
    ///
    /// Matches documents where the array field contains none of the specified values.
    pub fn none_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, value.into())
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    ///
    /// # Arguments
    ///
    /// * `filter` - The filter expression to apply
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the maximum number of documents to return.
    ///
    /// # Arguments
    ///
    /// * `limit` - The maximum number of documents to return
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip (for pagination).
    ///
    /// # Arguments
    ///
    /// * `offset` - The number of documents to skip
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Appends a sort key to the query.
    ///
    /// # Arguments
    ///
    /// * `field` - The field name to sort by
    /// * `direction` - The sort direction (ascending or descending)
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort { field: field.into(), direction });
        self
    }

    /// Appends several sort keys, most significant first.
    pub fn sorts(mut self, sorts: impl IntoIterator<Item = Sort>) -> Self {
        self.query.sort.extend(sorts);
        self
    }

    /// Sets the optional filter expression, clearing it on `None`.
    pub fn maybe_filter(mut self, filter: Option<Expr>) -> Self {
        self.query.filter = filter;
        self
    }

    /// Sets the free-text search for this query.
    pub fn search(mut self, search: Option<TextSearch>) -> Self {
        self.query.search = search;
        self
    }

    /// Sets the projection applied to returned documents.
    pub fn projection(mut self, projection: Option<Projection>) -> Self {
        self.query.projection = projection;
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn projection_parses_inclusion() {
        let projection = Projection::parse("name +email").unwrap();
        assert_eq!(projection.mode(), ProjectionMode::Include);
        assert_eq!(projection.fields().to_vec(), vec!["name", "email"]);

        let applied = projection.apply(&doc! { "_id": 1, "name": "Jane", "email": "j@x.io", "age": 3 });
        assert_eq!(applied, doc! { "_id": 1, "name": "Jane", "email": "j@x.io" });
    }

    #[test]
    fn projection_parses_exclusion_without_id() {
        let projection = Projection::parse("-age -_id").unwrap();
        assert_eq!(projection.mode(), ProjectionMode::Exclude);

        let applied = projection.apply(&doc! { "_id": 1, "name": "Jane", "age": 3 });
        assert_eq!(applied, doc! { "name": "Jane" });
    }

    #[test]
    fn projection_rejects_mixed_modes() {
        assert!(matches!(
            Projection::parse("name -age"),
            Err(DocumentStoreError::InvalidQuery(_))
        ));
    }

    #[test]
    fn builder_accumulates_sort_keys() {
        let query = Query::builder()
            .sort("name", SortDirection::Asc)
            .sorts([Sort::desc("age")])
            .limit(5)
            .build();

        assert_eq!(query.sort, vec![Sort::asc("name"), Sort::desc("age")]);
        assert_eq!(query.limit, Some(5));
    }
}
