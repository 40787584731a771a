//! rss-query - Resource Status database query tool
//!
//! Turns command-line switches into store requests:
//! - switches: validate and normalize raw switches into a request template
//! - expand: fan comma-separated `name`/`statusType` lists out into one
//!   request per combination
//! - dispatch: route each request to one of the six store operations
//! - present: render the returned rows as an aligned table
//!
//! The store itself sits behind the `StatusStore` trait; `sqlite` holds the
//! on-disk implementation used by the binary.

pub mod cli;
pub mod dispatch;
pub mod error;
pub mod expand;
pub mod present;
pub mod sqlite;
pub mod store;
pub mod switches;

pub use dispatch::{dispatch, QueryOutcome};
pub use error::QueryError;
pub use expand::{expand, StatusTypeSource};
pub use sqlite::SqliteStatusStore;
pub use store::{Cell, Envelope, Payload, Row, StatusStore};
pub use switches::{validate, QueryVerb, RawSwitches, RequestTemplate, StatusFilter};
