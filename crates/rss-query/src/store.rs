//! Status store interface
//!
//! The query tool only talks to the store through `StatusStore`: six
//! operations, each taking the full filter set, each answering with an
//! `Envelope` (success flag, payload, optional column names, message).

use chrono::NaiveDateTime;
use std::fmt;

use crate::switches::StatusFilter;

/// Text form of timestamps, both on disk and on screen
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One value in a result row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Timestamp(NaiveDateTime),
}

impl Cell {
    /// Numbers are right-aligned in tables, everything else left-aligned
    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Integer(_) | Cell::Real(_))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("None"),
            Cell::Text(s) => f.write_str(s),
            Cell::Integer(n) => write!(f, "{}", n),
            Cell::Real(x) => write!(f, "{}", x),
            Cell::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

pub type Row = Vec<Cell>;

/// What a successful operation returned
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Matching rows of a read
    Rows(Vec<Row>),
    /// Rows touched by a write
    Affected(u64),
}

impl Payload {
    /// Number reported in the confirmation line
    pub fn match_count(&self) -> u64 {
        match self {
            Payload::Rows(rows) => rows.len() as u64,
            Payload::Affected(n) => *n,
        }
    }
}

/// Result envelope of a store operation
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub ok: bool,
    pub payload: Payload,
    pub columns: Option<Vec<String>>,
    pub message: Option<String>,
}

impl Envelope {
    pub fn rows(rows: Vec<Row>, columns: Vec<String>) -> Self {
        Self {
            ok: true,
            payload: Payload::Rows(rows),
            columns: Some(columns),
            message: None,
        }
    }

    pub fn affected(count: u64) -> Self {
        Self {
            ok: true,
            payload: Payload::Affected(count),
            columns: None,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: Payload::Affected(0),
            columns: None,
            message: Some(message.into()),
        }
    }
}

/// Columns a read operation should return
#[derive(Debug, Clone, Copy)]
pub struct Meta<'a> {
    pub columns: &'a [&'a str],
}

/// The status store client
pub trait StatusStore {
    /// Rows of `<element><tableType>` matching every given filter
    fn select(&mut self, filter: &StatusFilter, meta: Meta<'_>) -> Envelope;

    /// Insert a new row
    fn insert(&mut self, filter: &StatusFilter) -> Envelope;

    /// Update the rows keyed by (name, statusType)
    fn update(&mut self, filter: &StatusFilter) -> Envelope;

    /// Insert, or update if the key exists; status tables also get a log entry
    fn add_or_modify(&mut self, filter: &StatusFilter, meta: Meta<'_>) -> Envelope;

    /// Update an existing row; status tables also get a log entry
    fn modify(&mut self, filter: &StatusFilter, meta: Meta<'_>) -> Envelope;

    /// Delete the rows matching every given filter
    fn delete(&mut self, filter: &StatusFilter) -> Envelope;
}

impl<T: StatusStore + ?Sized> StatusStore for &mut T {
    fn select(&mut self, filter: &StatusFilter, meta: Meta<'_>) -> Envelope {
        (**self).select(filter, meta)
    }

    fn insert(&mut self, filter: &StatusFilter) -> Envelope {
        (**self).insert(filter)
    }

    fn update(&mut self, filter: &StatusFilter) -> Envelope {
        (**self).update(filter)
    }

    fn add_or_modify(&mut self, filter: &StatusFilter, meta: Meta<'_>) -> Envelope {
        (**self).add_or_modify(filter, meta)
    }

    fn modify(&mut self, filter: &StatusFilter, meta: Meta<'_>) -> Envelope {
        (**self).modify(filter, meta)
    }

    fn delete(&mut self, filter: &StatusFilter) -> Envelope {
        (**self).delete(filter)
    }
}
