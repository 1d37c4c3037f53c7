//! Translation of filter mappings into filter expressions.
//!
//! Callers describe match criteria as a BSON document:
//!
//! - `{ "field": value }` matches by equality,
//! - `{ "field": { "$gt": value, ... } }` applies comparison operators
//!   (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`),
//! - `{ "$and": [..] }` / `{ "$or": [..] }` combine nested criteria.
//!
//! Sibling conditions are combined with AND. Anything else is rejected rather than
//! silently ignored.
//!
//! Identifiers are stored as binary UUIDs, so string operands of equality and membership
//! tests that parse as UUIDs are cast to UUIDs.

use bson::{Bson, Document as BsonDocument, Uuid};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp},
};

/// Converts a criteria document into a filter expression.
///
/// Returns `None` for empty criteria.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidQuery`] for unsupported operators or malformed
/// `$and`/`$or` operands.
pub fn criteria_to_expr(criteria: &BsonDocument) -> DocumentStoreResult<Option<Expr>> {
    let mut exprs = Vec::with_capacity(criteria.len());

    for (key, value) in criteria {
        match key.as_str() {
            "$and" => exprs.push(Expr::And(nested(key, value)?)),
            "$or" => exprs.push(Expr::Or(nested(key, value)?)),
            op if op.starts_with('$') => return Err(unsupported(op)),
            field => exprs.extend(field_conditions(field, value)?),
        }
    }

    Ok(all(exprs))
}

/// Combines expressions with AND, collapsing the trivial cases.
pub(crate) fn all(mut exprs: Vec<Expr>) -> Option<Expr> {
    match exprs.len() {
        0 => None,
        1 => exprs.pop(),
        _ => Some(Expr::And(exprs)),
    }
}

fn nested(op: &str, value: &Bson) -> DocumentStoreResult<Vec<Expr>> {
    let Bson::Array(items) = value else {
        return Err(DocumentStoreError::InvalidQuery(format!("{op} expects an array")));
    };

    items
        .iter()
        .map(|item| match item {
            // Empty criteria match everything
            Bson::Document(criteria) => Ok(criteria_to_expr(criteria)?.unwrap_or(Expr::And(Vec::new()))),
            _ => Err(DocumentStoreError::InvalidQuery(format!(
                "{op} expects an array of documents"
            ))),
        })
        .collect()
}

fn field_conditions(field: &str, value: &Bson) -> DocumentStoreResult<Vec<Expr>> {
    match value {
        Bson::Document(operators) if is_operator_document(operators) => operators
            .iter()
            .map(|(op, operand)| operator_condition(field, op, operand))
            .collect(),
        value => Ok(vec![Expr::field(field.to_string(), FieldOp::Eq, cast(value))]),
    }
}

fn is_operator_document(document: &BsonDocument) -> bool {
    document
        .keys()
        .next()
        .is_some_and(|key| key.starts_with('$'))
}

fn operator_condition(field: &str, op: &str, operand: &Bson) -> DocumentStoreResult<Expr> {
    let op = match op {
        "$eq" => FieldOp::Eq,
        "$ne" => FieldOp::Ne,
        "$gt" => FieldOp::Gt,
        "$gte" => FieldOp::Gte,
        "$lt" => FieldOp::Lt,
        "$lte" => FieldOp::Lte,
        "$in" => FieldOp::AnyOf,
        "$nin" => FieldOp::NoneOf,
        "$exists" => return Ok(Expr::Exists(field.to_string(), truthy(operand))),
        other => return Err(unsupported(other)),
    };

    let operand = match op {
        FieldOp::Eq | FieldOp::Ne | FieldOp::AnyOf | FieldOp::NoneOf => cast(operand),
        _ => operand.clone(),
    };

    Ok(Expr::field(field.to_string(), op, operand))
}

fn cast(value: &Bson) -> Bson {
    match value {
        Bson::String(text) => Uuid::parse_str(text)
            .map(Bson::from)
            .unwrap_or_else(|_| value.clone()),
        Bson::Array(items) => Bson::Array(items.iter().map(cast).collect()),
        value => value.clone(),
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(value) => *value,
        Bson::Int32(value) => *value != 0,
        Bson::Int64(value) => *value != 0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

fn unsupported(op: &str) -> DocumentStoreError {
    DocumentStoreError::InvalidQuery(format!("unsupported operator {op}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;
    use bson::doc;

    #[test]
    fn empty_criteria_match_everything() {
        assert_eq!(criteria_to_expr(&doc! {}).unwrap(), None);
    }

    #[test]
    fn plain_values_are_equality() {
        let expr = criteria_to_expr(&doc! { "name": "Jane" }).unwrap();
        assert_eq!(expr, Some(Filter::eq("name", "Jane")));
    }

    #[test]
    fn operators_and_siblings_combine_with_and() {
        let expr = criteria_to_expr(&doc! {
            "age": { "$gte": 18, "$lt": 65 },
            "status": { "$in": ["active", "pending"] },
            "deletedAt": { "$exists": false },
        })
        .unwrap();

        assert_eq!(
            expr,
            Some(Expr::And(vec![
                Filter::gte("age", 18),
                Filter::lt("age", 65),
                Filter::any_of("status", vec!["active", "pending"]),
                Filter::not_exists("deletedAt"),
            ]))
        );
    }

    #[test]
    fn every_operator_has_a_filter_counterpart() {
        let expr = criteria_to_expr(&doc! {
            "$and": [
                { "status": { "$ne": "archived", "$nin": ["draft"] } },
                { "age": { "$lte": 65, "$gt": 17 } },
                { "email": { "$exists": 1 } },
            ],
        })
        .unwrap();

        assert_eq!(
            expr,
            Some(Filter::and([
                Filter::and([
                    Filter::ne("status", "archived"),
                    Filter::none_of("status", vec!["draft"]),
                ]),
                Filter::and([Filter::lte("age", 65), Filter::gt("age", 17)]),
                Filter::exists("email"),
            ]))
        );
    }

    #[test]
    fn uuid_strings_are_cast_for_equality_and_membership() {
        let id = Uuid::new();
        let other = Uuid::new();
        let expr = criteria_to_expr(&doc! {
            "_id": id.to_string(),
            "owner": { "$in": [other.to_string(), "nobody"] },
            "label": { "$gt": id.to_string() },
        })
        .unwrap();

        assert_eq!(
            expr,
            Some(Filter::and([
                Filter::eq("_id", id),
                Filter::any_of("owner", vec![Bson::from(other), Bson::from("nobody")]),
                Filter::gt("label", id.to_string()),
            ]))
        );
    }

    #[test]
    fn logical_operators_nest() {
        let expr = criteria_to_expr(&doc! {
            "$or": [{ "name": "Jane" }, { "name": "John" }],
        })
        .unwrap();

        assert_eq!(
            expr,
            Some(Filter::or([Filter::eq("name", "Jane"), Filter::eq("name", "John")]))
        );
    }

    #[test]
    fn unknown_operators_are_rejected() {
        assert!(matches!(
            criteria_to_expr(&doc! { "name": { "$regex": "^J" } }),
            Err(DocumentStoreError::InvalidQuery(_))
        ));
        assert!(matches!(
            criteria_to_expr(&doc! { "$where": "1" }),
            Err(DocumentStoreError::InvalidQuery(_))
        ));
        assert!(matches!(
            criteria_to_expr(&doc! { "$or": { "name": "Jane" } }),
            Err(DocumentStoreError::InvalidQuery(_))
        ));
    }
}
