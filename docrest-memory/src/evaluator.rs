//! Query expression evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for filter expressions and text searches,
//! along with the ordering used to sort query results.

use std::{collections::HashMap, cmp::Ordering};
use bson::{Bson, Document as BsonDocument, datetime::DateTime};

use docrest_core::{
    query::{QueryVisitor, Expr, FieldOp, Sort, SortDirection, TextSearch},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Type-erased, comparable representation of BSON values.
///
/// This enum wraps BSON values and provides comparison operations for
/// filtering queries. It normalizes numeric types to f64 for easy comparison.
///
/// # Note
///
/// This is a private implementation detail used for query evaluation.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// String value
    String(&'a str),
    /// Binary value, including UUIDs
    Bytes(&'a [u8]),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Bytes(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted field path inside a document.
pub(crate) fn lookup<'a>(document: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Orders two documents by a list of sort keys, the first key deciding first.
///
/// Missing fields and nulls sort before every other value.
pub(crate) fn compare_by(left: &Bson, right: &Bson, sorts: &[Sort]) -> Ordering {
    for sort in sorts {
        let ordering = match (sort_value(left, &sort.field), sort_value(right, &sort.field)) {
            (Comparable::Null, Comparable::Null) => Ordering::Equal,
            (Comparable::Null, _) => Ordering::Less,
            (_, Comparable::Null) => Ordering::Greater,
            (a, b) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        };

        let ordering = match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn sort_value<'a>(document: &'a Bson, field: &str) -> Comparable<'a> {
    document
        .as_document()
        .and_then(|doc| lookup(doc, field))
        .map(Comparable::from)
        .unwrap_or(Comparable::Null)
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Bson,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Bson) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns `true` when the search term occurs in one of the searched fields, ignoring
    /// case. Without fields, every top-level string field is searched.
    pub fn matches_search(&self, search: &TextSearch) -> bool {
        let Some(document) = self.document.as_document() else {
            return false;
        };
        let term = search.term.to_lowercase();
        let contains = |value: &Bson| match value {
            Bson::String(text) => text.to_lowercase().contains(&term),
            Bson::Array(items) => items
                .iter()
                .filter_map(Bson::as_str)
                .any(|text| text.to_lowercase().contains(&term)),
            _ => false,
        };

        if search.fields.is_empty() {
            document
                .values()
                .any(|value| matches!(value, Bson::String(_)) && contains(value))
        } else {
            search
                .fields
                .iter()
                .filter_map(|field| lookup(document, field))
                .any(contains)
        }
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Bson>,
        expr: Option<&Expr>,
        search: Option<&TextSearch>,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let mut matched = Vec::new();

        for document in documents {
            let mut evaluator = DocumentEvaluator::new(document);

            if let Some(expr) = expr {
                if !evaluator.evaluate(expr)? {
                    continue;
                }
            }
            if let Some(search) = search {
                if !evaluator.matches_search(search) {
                    continue;
                }
            }

            matched.push(document.clone());
        }

        Ok(matched)
    }

    fn field(&self, field: &str) -> Option<&'a Bson> {
        self.document
            .as_document()
            .and_then(|doc| lookup(doc, field))
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.field(field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.field(field) else {
            // An absent field only equals null
            return Ok(match op {
                FieldOp::Eq => matches!(value, Bson::Null),
                FieldOp::Ne | FieldOp::NoneOf => !matches!(value, Bson::Null),
                _ => false,
            });
        };

        match op {
            FieldOp::Eq => Ok(Comparable::from(field_value) == Comparable::from(value)),
            FieldOp::Ne => Ok(Comparable::from(field_value) != Comparable::from(value)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => Ok(match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    }),
                    None => Ok(false),
                }
            },
            FieldOp::AnyOf => Ok(any_of(field_value, value)),
            FieldOp::NoneOf => Ok(!any_of(field_value, value)),
        }
    }
}

/// Whether the field value (or one of its elements) equals one of the given values.
fn any_of(field_value: &Bson, value: &Bson) -> bool {
    match (Comparable::from(field_value), Comparable::from(value)) {
        (Comparable::Array(array), Comparable::Array(values)) => {
            values.iter().any(|val| array.iter().any(|item| item == val))
        },
        (Comparable::Array(array), single_value) => array.iter().any(|item| item == &single_value),
        (single_value, Comparable::Array(values)) => values.iter().any(|val| val == &single_value),
        _ => false,
    }
}
