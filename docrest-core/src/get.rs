//! The read verbs: `get_by_id`, `get` and `fresh`.
//!
//! A list read merges the caller's options over the schema defaults, then issues three
//! independent store calls concurrently: the count of matching records, the requested
//! page, and the most recently updated matching record (for `last_modified`). The first
//! failure fails the whole read. The three calls see independent snapshots of the store,
//! so `total` may briefly disagree with `data` under concurrent writes.

use bson::{Bson, DateTime as BsonDateTime};
use futures::TryFutureExt;
use log::debug;

use crate::{
    backend::StoreBackend,
    config::SchemaOptions,
    criteria::{self, criteria_to_expr},
    envelope::{Pagination, ResultEnvelope},
    error::{ActionError, ActionResult, DocumentStoreResult},
    hooks::invoke,
    model::Model,
    options::{GetByIdOptions, QueryOptions},
    query::{Expr, Filter, Projection, Query, Sort, TextSearch},
    record::Record,
};

/// Criteria key holding a free-text search term.
const SEARCH_KEY: &str = "q";

impl<'a, B: StoreBackend> Model<'a, B> {
    /// Reads one record by id.
    ///
    /// Without `select` or `populate` the stored record is returned as is.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let jane = users.get_by_id(id).await?;
    /// let slim = users
    ///     .get_by_id(GetByIdOptions::new(id).select(Projection::include(["name"])))
    ///     .await?;
    /// ```
    pub async fn get_by_id(&self, options: impl Into<GetByIdOptions>) -> ActionResult<Record> {
        self.run_get_by_id(options.into())
            .await
            .map_err(ActionError::normalized)
    }

    async fn run_get_by_id(&self, options: GetByIdOptions) -> ActionResult<Record> {
        let id = options
            .id
            .ok_or_else(ActionError::missing_instance_id)?;
        let hooks = self.schema().hooks();

        debug!("Getting record '{}' of '{}'", id, self.name());

        invoke(hooks.before_get_by_id.get(), (), |_| id).await?;

        let mut found = self
            .find_existing(id, options.filter.as_ref(), options.select.clone())
            .await?;
        self.populate(std::slice::from_mut(&mut found), &options.populate)
            .await?;

        invoke(hooks.after_get_by_id.get(), found, Record::clone).await
    }

    /// Reads a page of records, running the `get` hooks.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let page = users
    ///     .get(QueryOptions::builder().filter(doc! { "q": "jan" }).limit(20).build())
    ///     .await?;
    /// println!("{} of {}", page.size, page.total);
    /// ```
    pub async fn get(&self, options: QueryOptions) -> ActionResult<ResultEnvelope> {
        self.run_get(options)
            .await
            .map_err(ActionError::normalized)
    }

    async fn run_get(&self, options: QueryOptions) -> ActionResult<ResultEnvelope> {
        let hooks = self.schema().hooks();

        let options = invoke(hooks.before_get.get(), options, QueryOptions::clone).await?;
        let envelope = self.find_paginated(&options).await?;

        invoke(hooks.after_get.get(), envelope, |envelope| {
            (options.clone(), envelope.clone())
        })
        .await
    }

    /// Reads a page of records without running any hook.
    pub async fn fresh(&self, options: QueryOptions) -> ActionResult<ResultEnvelope> {
        self.find_paginated(&options)
            .await
            .map_err(ActionError::normalized)
    }

    async fn find_paginated(&self, options: &QueryOptions) -> ActionResult<ResultEnvelope> {
        let schema_options = self.schema().options();
        let resolved = ResolvedQuery::resolve(options, schema_options)?;

        debug!(
            "Listing '{}' (limit: {}, skip: {}, page: {})",
            self.name(),
            resolved.window.limit,
            resolved.window.skip,
            resolved.window.page
        );

        let count = self
            .backend()
            .count_documents(resolved.count_query(), self.name())
            .map_err(ActionError::from);

        let page = async {
            let mut records = self
                .backend()
                .query_documents(resolved.page_query(), self.name())
                .await?
                .into_iter()
                .map(Record::from_bson)
                .collect::<DocumentStoreResult<Vec<_>>>()?;
            self.populate(&mut records, &options.populate)
                .await?;

            Ok::<_, ActionError>(records)
        };

        let latest = self
            .backend()
            .query_documents(
                resolved.latest_query(&schema_options.updated_at_field),
                self.name(),
            )
            .map_err(ActionError::from);

        let (total, data, latest) = futures::try_join!(count, page, latest)?;

        let last_modified = latest
            .into_iter()
            .next()
            .and_then(|document| Record::from_bson(document).ok())
            .and_then(|record| record.get_datetime(&schema_options.updated_at_field));

        Ok(ResultEnvelope::builder(data)
            .with_total(total as u64)
            .with_window(resolved.window)
            .with_last_modified(last_modified)
            .build())
    }
}

/// Caller options merged over the schema defaults.
#[derive(Debug, Clone, PartialEq)]
struct ResolvedQuery {
    filter: Option<Expr>,
    search: Option<TextSearch>,
    sort: Vec<Sort>,
    select: Option<Projection>,
    window: Pagination,
}

impl ResolvedQuery {
    fn resolve(options: &QueryOptions, schema: &SchemaOptions) -> DocumentStoreResult<Self> {
        let mut criteria = options
            .match_criteria()
            .cloned()
            .unwrap_or_default();

        let search = match criteria.remove(SEARCH_KEY) {
            Some(Bson::String(term)) if !term.trim().is_empty() => {
                Some(TextSearch::new(term.trim(), schema.search_fields.clone()))
            }
            _ => None,
        };

        let mut conditions: Vec<Expr> = criteria_to_expr(&criteria)?
            .into_iter()
            .collect();
        if let Some(since) = options.headers.if_modified_since {
            conditions.push(Filter::gt(
                &schema.updated_at_field,
                BsonDateTime::from_chrono(since),
            ));
        }

        let paginate = options
            .paginate
            .clone()
            .unwrap_or_default();
        let window = Pagination::resolve(
            options.limit.or(paginate.limit),
            options
                .skip
                .filter(|skip| *skip != 0)
                .or(options.offset)
                .or(paginate.skip),
            options.page.or(paginate.page),
            schema.default_limit,
        );

        Ok(Self {
            filter: criteria::all(conditions),
            search,
            sort: options.sort.clone(),
            select: options.select.clone(),
            window,
        })
    }

    fn count_query(&self) -> Query {
        Query::builder()
            .maybe_filter(self.filter.clone())
            .search(self.search.clone())
            .build()
    }

    fn page_query(&self) -> Query {
        Query::builder()
            .maybe_filter(self.filter.clone())
            .search(self.search.clone())
            .sorts(self.sort.clone())
            .offset(self.window.skip as usize)
            .limit(self.window.limit as usize)
            .projection(self.select.clone())
            .build()
    }

    fn latest_query(&self, updated_at_field: &str) -> Query {
        Query::builder()
            .maybe_filter(self.filter.clone())
            .search(self.search.clone())
            .sorts([Sort::desc(updated_at_field)])
            .limit(1)
            .projection(Some(Projection::include([updated_at_field])))
            .build()
    }
}
