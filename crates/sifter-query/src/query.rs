//! Query expression trees: parse, serialize.
//!
//! The wire format is nested 2-element arrays `[key, payload]`:
//!
//! - `["and" | "or", [pair, ...]]` — a connector over child pairs,
//! - `["not", pair]` — negation of one child pair,
//! - `[field, {"lookup"?: string | [string, ...], "value": v}]` — a leaf
//!   criterion.
//!
//! Key tokens are matched case-insensitively and serialized lowercase.
//! Parsing tolerates a bare leaf at the *root* by wrapping it in a
//! one-child `and`; at nested positions a leaf stays bare. Serialization
//! collapses a single-child connector to the child's own form, so the two
//! tolerances round-trip against each other (see DESIGN.md).
//!
//! Trees are built fresh per request, consumed to produce a predicate, and
//! discarded; they are never mutated in place.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use sifter_model::{LookupExpr, ModelError};

/// Wire token for negation.
pub const NOT_TOKEN: &str = "not";

#[derive(Debug, Error)]
pub enum QueryError {
    /// Raw data does not conform to the expected pair/operator shape.
    /// Fatal for the current request.
    #[error("invalid query data: {0}")]
    InvalidQueryData(String),

    /// A predicate was requested without first successfully validating.
    /// This is a programmer-usage error.
    #[error("filter set must be validated before building a predicate")]
    InvalidFilterSet,

    #[error(transparent)]
    Model(#[from] ModelError),
}

fn invalid(message: impl Into<String>) -> QueryError {
    QueryError::InvalidQueryData(message.into())
}

// ============================================================================
// Tree shape
// ============================================================================

/// Boolean connector of a non-leaf node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn token(self) -> &'static str {
        match self {
            Connector::And => "and",
            Connector::Or => "or",
        }
    }

    /// Case-insensitive token parse.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("and") {
            Some(Connector::And)
        } else if token.eq_ignore_ascii_case("or") {
            Some(Connector::Or)
        } else {
            None
        }
    }
}

/// Leaf criterion: one field, an optional lookup (the owning filter's
/// default substitutes at transmute time), and the request value.
///
/// The wire form is the `[field, {lookup?, value}]` pair produced by
/// `to_query_data`, not a serialized struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub field: String,
    pub lookup: Option<LookupExpr>,
    pub value: Value,
}

/// A validated-shape filter request. Connector children are never empty.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Connector {
        op: Connector,
        children: Vec<QueryNode>,
    },
    Not(Box<QueryNode>),
    Criterion(Criterion),
}

// ============================================================================
// Parse
// ============================================================================

impl QueryNode {
    /// Parse raw query data into an expression tree.
    ///
    /// Structural malformation is `QueryError::InvalidQueryData`; semantic
    /// checks (unknown fields/lookups) belong to the filter set validator.
    pub fn from_query_data(data: &Value) -> Result<Self, QueryError> {
        parse_node(data, true)
    }

    /// Serialize back into the raw nested-array shape. Single-child
    /// connectors collapse to the child's form.
    pub fn to_query_data(&self) -> Value {
        match self {
            QueryNode::Criterion(criterion) => {
                let mut details = serde_json::Map::new();
                if let Some(lookup) = &criterion.lookup {
                    details.insert("lookup".to_string(), lookup_to_value(lookup));
                }
                details.insert("value".to_string(), criterion.value.clone());
                json!([criterion.field, details])
            }
            QueryNode::Not(child) => json!([NOT_TOKEN, child.to_query_data()]),
            QueryNode::Connector { op, children } => {
                if children.len() == 1 {
                    return children[0].to_query_data();
                }
                let children: Vec<Value> =
                    children.iter().map(QueryNode::to_query_data).collect();
                json!([op.token(), children])
            }
        }
    }

    /// All leaf criteria, in serialization order.
    pub fn criteria(&self) -> Vec<&Criterion> {
        let mut out = Vec::new();
        self.collect_criteria(&mut out);
        out
    }

    fn collect_criteria<'a>(&'a self, out: &mut Vec<&'a Criterion>) {
        match self {
            QueryNode::Criterion(criterion) => out.push(criterion),
            QueryNode::Not(child) => child.collect_criteria(out),
            QueryNode::Connector { children, .. } => {
                for child in children {
                    child.collect_criteria(out);
                }
            }
        }
    }
}

fn parse_node(data: &Value, root: bool) -> Result<QueryNode, QueryError> {
    let pair = data
        .as_array()
        .ok_or_else(|| invalid("expected a [key, payload] pair"))?;
    if pair.len() != 2 {
        return Err(invalid(format!(
            "expected a 2-element [key, payload] pair, got {} elements",
            pair.len()
        )));
    }
    let key = pair[0]
        .as_str()
        .ok_or_else(|| invalid("pair key must be a string"))?;
    let payload = &pair[1];

    if key.eq_ignore_ascii_case(NOT_TOKEN) {
        let inner = parse_node(payload, false)?;
        return Ok(QueryNode::Not(Box::new(inner)));
    }

    if let Some(op) = Connector::from_token(key) {
        let items = payload
            .as_array()
            .ok_or_else(|| invalid(format!("`{key}` payload must be a list of pairs")))?;
        if items.is_empty() {
            return Err(invalid(format!("`{key}` requires at least one child")));
        }
        let children = items
            .iter()
            .map(|item| parse_node(item, false))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(QueryNode::Connector { op, children });
    }

    let criterion = parse_criterion(key, payload)?;
    if root {
        // Bare leaf at the root: wrap in a one-child `and` so the tree root
        // is always addressable as a connector. Serialization collapses it
        // back.
        Ok(QueryNode::Connector {
            op: Connector::And,
            children: vec![QueryNode::Criterion(criterion)],
        })
    } else {
        Ok(QueryNode::Criterion(criterion))
    }
}

fn parse_criterion(field: &str, payload: &Value) -> Result<Criterion, QueryError> {
    let details = payload
        .as_object()
        .ok_or_else(|| invalid(format!("details for `{field}` must be an object")))?;
    let lookup = match details.get("lookup") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(parse_lookup_expr(raw)?),
    };
    let value = details
        .get("value")
        .cloned()
        .ok_or_else(|| invalid(format!("details for `{field}` must carry a `value`")))?;
    Ok(Criterion {
        field: field.to_string(),
        lookup,
        value,
    })
}

/// Parse a wire lookup: a plain name string or a non-empty chain of
/// segment strings.
pub(crate) fn parse_lookup_expr(raw: &Value) -> Result<LookupExpr, QueryError> {
    match raw {
        Value::String(name) => Ok(LookupExpr::Name(name.clone())),
        Value::Array(segments) => {
            let segments = segments
                .iter()
                .map(|segment| {
                    segment
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid("lookup chain segments must be strings"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if segments.is_empty() {
                return Err(invalid("lookup chain must not be empty"));
            }
            Ok(LookupExpr::Chain(segments))
        }
        _ => Err(invalid("lookup must be a string or an array of strings")),
    }
}

fn lookup_to_value(lookup: &LookupExpr) -> Value {
    match lookup {
        LookupExpr::Name(name) => json!(name),
        LookupExpr::Chain(segments) => json!(segments),
    }
}
