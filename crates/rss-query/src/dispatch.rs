//! Query dispatch
//!
//! Maps the closed verb vocabulary onto the store operations. Each expanded
//! template is dispatched exactly once.

use tracing::debug;

use crate::error::QueryError;
use crate::store::{Meta, Payload, Row, StatusStore};
use crate::switches::{QueryVerb, RequestTemplate};

/// Columns requested from the store, in display order
pub const COLUMNS: &[&str] = &[
    "name",
    "statusType",
    "status",
    "elementType",
    "reason",
    "dateEffective",
    "lastCheckTime",
    "tokenOwner",
    "tokenExpiration",
];

impl QueryVerb {
    /// Store operation a verb is routed to
    pub fn operation(&self) -> &'static str {
        match self {
            QueryVerb::Select => "select",
            QueryVerb::Insert => "insert",
            QueryVerb::Update => "update",
            QueryVerb::Add => "add_or_modify",
            QueryVerb::Modify => "modify",
            QueryVerb::Delete => "delete",
        }
    }
}

/// A successful store answer for one template
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub query: QueryVerb,
    pub payload: Payload,
    pub columns: Option<Vec<String>>,
}

impl QueryOutcome {
    /// Rows worth tabulating: only reads that came back with column names
    pub fn table(&self) -> Option<(&[Row], &[String])> {
        match (&self.payload, &self.columns) {
            (Payload::Rows(rows), Some(columns)) if !rows.is_empty() => {
                Some((rows.as_slice(), columns.as_slice()))
            }
            _ => None,
        }
    }
}

/// Run one template against the store
pub fn dispatch(
    store: &mut (impl StatusStore + ?Sized),
    template: &RequestTemplate,
) -> Result<QueryOutcome, QueryError> {
    let filter = &template.filter;
    let meta = Meta { columns: COLUMNS };

    debug!(
        query = %template.query,
        operation = template.query.operation(),
        table = %filter.table(),
        name = ?filter.name,
        status_type = ?filter.status_type,
        "dispatching"
    );

    let envelope = match template.query {
        QueryVerb::Select => store.select(filter, meta),
        QueryVerb::Insert => store.insert(filter),
        QueryVerb::Update => store.update(filter),
        QueryVerb::Add => store.add_or_modify(filter, meta),
        QueryVerb::Modify => store.modify(filter, meta),
        QueryVerb::Delete => store.delete(filter),
    };

    if !envelope.ok {
        return Err(QueryError::StoreOperationFailed {
            query: template.query.to_string(),
            message: envelope
                .message
                .unwrap_or_else(|| format!("'{}' query failed", template.query)),
        });
    }

    Ok(QueryOutcome {
        query: template.query,
        payload: envelope.payload,
        columns: envelope.columns,
    })
}
