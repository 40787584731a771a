//! Switch validation
//!
//! Raw switches arrive as optional strings. Validation normalizes the closed
//! vocabularies (element, tableType, status, query) and produces a
//! `RequestTemplate`. Checks run in a fixed order and stop at the first
//! violation so the reported error is deterministic.

use std::fmt;
use tracing::debug;

use crate::error::QueryError;

/// Python-style title case: first letter of every alphabetic run upper-cased,
/// the rest lower-cased.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Element family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Site,
    Resource,
    Component,
    Node,
}

impl Element {
    pub const ALL: &'static [Element] = &[
        Element::Site,
        Element::Resource,
        Element::Component,
        Element::Node,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Site => "Site",
            Element::Resource => "Resource",
            Element::Component => "Component",
            Element::Node => "Node",
        }
    }

    /// Parse an already title-cased name
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Site" => Some(Element::Site),
            "Resource" => Some(Element::Resource),
            "Component" => Some(Element::Component),
            "Node" => Some(Element::Node),
            _ => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which table of an element family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableType {
    Status,
    Log,
    History,
}

impl TableType {
    pub const ALL: &'static [TableType] = &[TableType::Status, TableType::Log, TableType::History];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableType::Status => "Status",
            TableType::Log => "Log",
            TableType::History => "History",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Status" => Some(TableType::Status),
            "Log" => Some(TableType::Log),
            "History" => Some(TableType::History),
            _ => None,
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Active,
    Probing,
    Degraded,
    Banned,
    Error,
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "Active",
            Status::Probing => "Probing",
            Status::Degraded => "Degraded",
            Status::Banned => "Banned",
            Status::Error => "Error",
            Status::Unknown => "Unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(Status::Active),
            "Probing" => Some(Status::Probing),
            "Degraded" => Some(Status::Degraded),
            "Banned" => Some(Status::Banned),
            "Error" => Some(Status::Error),
            "Unknown" => Some(Status::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store operation requested with `--query`/`-q`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryVerb {
    Select,
    Insert,
    Update,
    Add,
    Modify,
    Delete,
}

impl QueryVerb {
    pub const ALL: &'static [QueryVerb] = &[
        QueryVerb::Select,
        QueryVerb::Insert,
        QueryVerb::Update,
        QueryVerb::Add,
        QueryVerb::Modify,
        QueryVerb::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryVerb::Select => "select",
            QueryVerb::Insert => "insert",
            QueryVerb::Update => "update",
            QueryVerb::Add => "add",
            QueryVerb::Modify => "modify",
            QueryVerb::Delete => "delete",
        }
    }

    /// Parse an already lower-cased verb
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "select" => Some(QueryVerb::Select),
            "insert" => Some(QueryVerb::Insert),
            "update" => Some(QueryVerb::Update),
            "add" => Some(QueryVerb::Add),
            "modify" => Some(QueryVerb::Modify),
            "delete" => Some(QueryVerb::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for QueryVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Switches as given on the command line, before any validation
#[derive(Debug, Clone, Default)]
pub struct RawSwitches {
    pub element: Option<String>,
    pub table_type: Option<String>,
    pub name: Option<String>,
    pub status_type: Option<String>,
    pub status: Option<String>,
    pub element_type: Option<String>,
    pub reason: Option<String>,
    pub date_effective: Option<String>,
    pub last_check_time: Option<String>,
    pub token_owner: Option<String>,
    pub token_expiration: Option<String>,
    /// Long form, `--query`
    pub query: Option<String>,
    /// Short form, `-q`
    pub q: Option<String>,
    pub positional: Vec<String>,
}

/// Every named argument a store operation receives.
///
/// `name` and `status_type` may still hold comma-separated lists on the
/// template produced by [`validate`]; expansion reduces them to single values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFilter {
    pub element: Element,
    pub table_type: TableType,
    pub name: Option<String>,
    pub status_type: Option<String>,
    pub status: Option<Status>,
    pub element_type: Option<String>,
    pub reason: Option<String>,
    pub date_effective: Option<String>,
    pub last_check_time: Option<String>,
    pub token_owner: Option<String>,
    pub token_expiration: Option<String>,
}

impl StatusFilter {
    pub fn new(element: Element, table_type: TableType) -> Self {
        Self {
            element,
            table_type,
            name: None,
            status_type: None,
            status: None,
            element_type: None,
            reason: None,
            date_effective: None,
            last_check_time: None,
            token_owner: None,
            token_expiration: None,
        }
    }

    /// Table the filter addresses, e.g. `SiteStatus`
    pub fn table(&self) -> String {
        format!("{}{}", self.element, self.table_type)
    }
}

/// A validated request: one verb applied to one filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    pub query: QueryVerb,
    pub filter: StatusFilter,
}

impl RequestTemplate {
    pub fn new(query: QueryVerb, element: Element, table_type: TableType) -> Self {
        Self {
            query,
            filter: StatusFilter::new(element, table_type),
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.filter.name = name;
        self
    }

    pub fn with_status_type(mut self, status_type: Option<String>) -> Self {
        self.filter.status_type = status_type;
        self
    }

    pub fn with_status(mut self, status: Option<Status>) -> Self {
        self.filter.status = status;
        self
    }
}

fn required<'a>(value: &'a Option<String>, switch: &'static str) -> Result<&'a str, QueryError> {
    value
        .as_deref()
        .ok_or(QueryError::MissingSwitch { switch })
}

/// Validate raw switches into a request template.
///
/// Order: positional args, element, tableType, status, query.
pub fn validate(raw: &RawSwitches) -> Result<RequestTemplate, QueryError> {
    if !raw.positional.is_empty() {
        return Err(QueryError::UnexpectedArguments(raw.positional.clone()));
    }

    let element = title_case(required(&raw.element, "element")?);
    let element =
        Element::from_str(&element).ok_or_else(|| QueryError::invalid("element", element))?;

    let table_type = title_case(required(&raw.table_type, "tableType")?);
    let table_type = TableType::from_str(&table_type)
        .ok_or_else(|| QueryError::invalid("tableType", table_type))?;

    let status = match raw.status.as_deref() {
        Some(status) => {
            let status = title_case(status);
            Some(Status::from_str(&status).ok_or_else(|| QueryError::invalid("status", status))?)
        }
        None => None,
    };

    // --query wins over -q when both are given
    let query = raw
        .query
        .as_deref()
        .or(raw.q.as_deref())
        .ok_or(QueryError::MissingSwitch { switch: "query" })?
        .to_lowercase();
    let query = QueryVerb::from_str(&query).ok_or_else(|| QueryError::invalid("query", query))?;

    let template = RequestTemplate {
        query,
        filter: StatusFilter {
            element,
            table_type,
            name: raw.name.clone(),
            status_type: raw.status_type.clone(),
            status,
            element_type: raw.element_type.clone(),
            reason: raw.reason.clone(),
            date_effective: raw.date_effective.clone(),
            last_check_time: raw.last_check_time.clone(),
            token_owner: raw.token_owner.clone(),
            token_expiration: raw.token_expiration.clone(),
        },
    };

    debug!(?template, "The switches used are");
    Ok(template)
}
