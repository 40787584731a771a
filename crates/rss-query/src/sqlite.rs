//! SQLite status store
//!
//! One table per element family and table type (`SiteStatus`, `SiteLog`,
//! `SiteHistory`, `ResourceStatus`, ...), all with the same columns.
//! Status tables hold one row per (Name, StatusType); Log and History
//! tables are append-only journals of those rows.

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection};
use rss_core::Paths;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::store::{Cell, Envelope, Meta, Row, StatusStore, TIMESTAMP_FORMAT};
use crate::switches::{Element, StatusFilter, TableType};

/// Store-side failures, reported to the caller as failed envelopes
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Sql(#[from] rusqlite::Error),

    #[error("'{field}' is mandatory for '{operation}'")]
    MissingField {
        field: &'static str,
        operation: &'static str,
    },

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Nothing to update for '{operation}': no field besides name and statusType")]
    NothingToUpdate { operation: &'static str },

    #[error("{table} is append-only, '{operation}' cannot change its rows")]
    AppendOnly {
        table: String,
        operation: &'static str,
    },

    #[error("No {table} row for name '{name}' and statusType '{status_type}'")]
    NoMatch {
        table: String,
        name: String,
        status_type: String,
    },
}

/// Mapping between request field names and table columns
struct Column {
    field: &'static str,
    sql: &'static str,
    timestamp: bool,
}

const COLUMNS: &[Column] = &[
    Column { field: "name", sql: "Name", timestamp: false },
    Column { field: "statusType", sql: "StatusType", timestamp: false },
    Column { field: "status", sql: "Status", timestamp: false },
    Column { field: "elementType", sql: "ElementType", timestamp: false },
    Column { field: "reason", sql: "Reason", timestamp: false },
    Column { field: "dateEffective", sql: "DateEffective", timestamp: true },
    Column { field: "lastCheckTime", sql: "LastCheckTime", timestamp: true },
    Column { field: "tokenOwner", sql: "TokenOwner", timestamp: false },
    Column { field: "tokenExpiration", sql: "TokenExpiration", timestamp: true },
];

fn column(field: &str) -> Result<&'static Column, StoreError> {
    COLUMNS
        .iter()
        .find(|c| c.field == field)
        .ok_or_else(|| StoreError::UnknownColumn(field.to_string()))
}

/// Column list shared by every table, in schema order
fn column_list() -> String {
    COLUMNS.iter().map(|c| c.sql).collect::<Vec<_>>().join(", ")
}

/// Non-empty filter fields as (column, value) pairs, in schema order
fn assignments(filter: &StatusFilter) -> Vec<(&'static str, String)> {
    let values = [
        ("Name", filter.name.clone()),
        ("StatusType", filter.status_type.clone()),
        ("Status", filter.status.map(|s| s.as_str().to_string())),
        ("ElementType", filter.element_type.clone()),
        ("Reason", filter.reason.clone()),
        ("DateEffective", filter.date_effective.clone()),
        ("LastCheckTime", filter.last_check_time.clone()),
        ("TokenOwner", filter.token_owner.clone()),
        ("TokenExpiration", filter.token_expiration.clone()),
    ];
    values
        .into_iter()
        .filter_map(|(col, value)| value.map(|v| (col, v)))
        .collect()
}

fn where_clause(conditions: &[(&'static str, String)]) -> String {
    if conditions.is_empty() {
        return String::new();
    }
    let terms: Vec<String> = conditions
        .iter()
        .map(|(col, _)| format!("{} = ?", col))
        .collect();
    format!(" WHERE {}", terms.join(" AND "))
}

fn now() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn to_cell(value: ValueRef<'_>, timestamp: bool) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(n) => Cell::Integer(n),
        ValueRef::Real(x) => Cell::Real(x),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            match timestamp.then(|| parse_timestamp(&text)).flatten() {
                Some(ts) => Cell::Timestamp(ts),
                None => Cell::Text(text),
            }
        }
    }
}

/// (name, statusType) identifying a status row
fn key<'a>(
    filter: &'a StatusFilter,
    operation: &'static str,
) -> Result<(&'a str, &'a str), StoreError> {
    let name = filter
        .name
        .as_deref()
        .ok_or(StoreError::MissingField { field: "name", operation })?;
    let status_type = filter
        .status_type
        .as_deref()
        .ok_or(StoreError::MissingField { field: "statusType", operation })?;
    Ok((name, status_type))
}

fn insert_row(conn: &Connection, filter: &StatusFilter) -> Result<u64, StoreError> {
    key(filter, "insert")?;
    if filter.status.is_none() {
        return Err(StoreError::MissingField {
            field: "status",
            operation: "insert",
        });
    }

    let mut values = assignments(filter);
    for col in ["DateEffective", "LastCheckTime"] {
        if !values.iter().any(|(c, _)| *c == col) {
            values.push((col, now()));
        }
    }

    let cols: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        filter.table(),
        cols.join(", "),
        placeholders
    );
    let affected = conn.execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))?;
    Ok(affected as u64)
}

/// Update the rows keyed by (name, statusType). `touch` stamps LastCheckTime.
fn update_row(
    conn: &Connection,
    filter: &StatusFilter,
    operation: &'static str,
    touch: bool,
) -> Result<u64, StoreError> {
    let (name, status_type) = key(filter, operation)?;

    let mut sets: Vec<(&'static str, String)> = assignments(filter)
        .into_iter()
        .filter(|(col, _)| *col != "Name" && *col != "StatusType")
        .collect();
    if touch && !sets.iter().any(|(col, _)| *col == "LastCheckTime") {
        sets.push(("LastCheckTime", now()));
    }
    if sets.is_empty() {
        return Err(StoreError::NothingToUpdate { operation });
    }

    let set_clause: Vec<String> = sets.iter().map(|(col, _)| format!("{} = ?", col)).collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE Name = ? AND StatusType = ?",
        filter.table(),
        set_clause.join(", ")
    );
    let params: Vec<&str> = sets
        .iter()
        .map(|(_, v)| v.as_str())
        .chain([name, status_type])
        .collect();
    let affected = conn.execute(&sql, params_from_iter(params))?;
    Ok(affected as u64)
}

/// Copy the current status row into the element's log table
fn log_entry(conn: &Connection, filter: &StatusFilter) -> Result<(), StoreError> {
    if filter.table_type != TableType::Status {
        return Ok(());
    }
    let (name, status_type) = key(filter, "log")?;
    let cols = column_list();
    let sql = format!(
        "INSERT INTO {element}Log ({cols}) SELECT {cols} FROM {element}Status
         WHERE Name = ?1 AND StatusType = ?2",
        element = filter.element,
        cols = cols
    );
    let logged = conn.execute(&sql, params![name, status_type])?;
    debug!(element = %filter.element, name, status_type, logged, "logged status change");
    Ok(())
}

/// SQLite-backed status store
pub struct SqliteStatusStore {
    conn: Connection,
}

impl SqliteStatusStore {
    /// Open or create the database (default: `~/.local/share/rss/resource-status.db`)
    pub fn open(db_path: Option<&Path>) -> Result<Self> {
        let path = db_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Paths::new().status_db());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create every `<Element><TableType>` table
    fn init_schema(&self) -> Result<()> {
        let mut ddl = String::new();
        for element in Element::ALL {
            for table_type in TableType::ALL {
                let unique = if *table_type == TableType::Status {
                    ",\n                UNIQUE (Name, StatusType)"
                } else {
                    ""
                };
                ddl.push_str(&format!(
                    r#"
            CREATE TABLE IF NOT EXISTS {element}{table_type} (
                ID INTEGER PRIMARY KEY AUTOINCREMENT,
                Name TEXT NOT NULL,
                StatusType TEXT NOT NULL,
                Status TEXT NOT NULL,
                ElementType TEXT,
                Reason TEXT,
                DateEffective TIMESTAMP,
                LastCheckTime TIMESTAMP,
                TokenOwner TEXT,
                TokenExpiration TIMESTAMP{unique}
            );
            CREATE INDEX IF NOT EXISTS idx_{element}{table_type}_name ON {element}{table_type}(Name);
            "#,
                ));
            }
        }
        self.conn
            .execute_batch(&ddl)
            .context("Failed to initialize status schema")?;
        Ok(())
    }

    fn select_rows(&self, filter: &StatusFilter, meta: Meta<'_>) -> Result<Envelope, StoreError> {
        let columns = meta
            .columns
            .iter()
            .map(|field| column(field))
            .collect::<Result<Vec<_>, _>>()?;
        let projection: Vec<&str> = columns.iter().map(|c| c.sql).collect();

        let conditions = assignments(filter);
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY ID",
            projection.join(", "),
            filter.table(),
            where_clause(&conditions)
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.iter().map(|(_, v)| v)), |row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| Ok(to_cell(row.get_ref(i)?, col.timestamp)))
                    .collect::<rusqlite::Result<Row>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Envelope::rows(
            rows,
            meta.columns.iter().map(|c| c.to_string()).collect(),
        ))
    }

    /// Status tables are keyed by (Name, StatusType); journals only grow
    fn add_or_modify_row(&mut self, filter: &StatusFilter) -> Result<Envelope, StoreError> {
        if filter.table_type != TableType::Status {
            return insert_row(&self.conn, filter).map(Envelope::affected);
        }

        let tx = self.conn.transaction()?;
        let (name, status_type) = key(filter, "add")?;

        let existing: i64 = tx.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE Name = ?1 AND StatusType = ?2",
                filter.table()
            ),
            params![name, status_type],
            |row| row.get(0),
        )?;

        let affected = if existing > 0 {
            update_row(&tx, filter, "add", true)?
        } else {
            insert_row(&tx, filter)?
        };
        log_entry(&tx, filter)?;
        tx.commit()?;
        Ok(Envelope::affected(affected))
    }

    fn modify_row(&mut self, filter: &StatusFilter) -> Result<Envelope, StoreError> {
        if filter.table_type != TableType::Status {
            return Err(StoreError::AppendOnly {
                table: filter.table(),
                operation: "modify",
            });
        }

        let tx = self.conn.transaction()?;
        let affected = update_row(&tx, filter, "modify", true)?;
        if affected == 0 {
            let (name, status_type) = key(filter, "modify")?;
            return Err(StoreError::NoMatch {
                table: filter.table(),
                name: name.to_string(),
                status_type: status_type.to_string(),
            });
        }
        log_entry(&tx, filter)?;
        tx.commit()?;
        Ok(Envelope::affected(affected))
    }

    fn delete_rows(&self, filter: &StatusFilter) -> Result<Envelope, StoreError> {
        let conditions = assignments(filter);
        let sql = format!("DELETE FROM {}{}", filter.table(), where_clause(&conditions));
        let affected = self
            .conn
            .execute(&sql, params_from_iter(conditions.iter().map(|(_, v)| v)))?;
        Ok(Envelope::affected(affected as u64))
    }
}

/// Turn a store result into an envelope
fn respond(
    operation: &str,
    filter: &StatusFilter,
    result: Result<Envelope, StoreError>,
) -> Envelope {
    match result {
        Ok(envelope) => {
            debug!(
                operation,
                table = %filter.table(),
                payload = ?envelope.payload,
                "store operation done"
            );
            envelope
        }
        Err(err) => {
            debug!(operation, table = %filter.table(), error = %err, "store operation failed");
            Envelope::failure(err.to_string())
        }
    }
}

impl StatusStore for SqliteStatusStore {
    fn select(&mut self, filter: &StatusFilter, meta: Meta<'_>) -> Envelope {
        respond("select", filter, self.select_rows(filter, meta))
    }

    fn insert(&mut self, filter: &StatusFilter) -> Envelope {
        let result = insert_row(&self.conn, filter).map(Envelope::affected);
        respond("insert", filter, result)
    }

    fn update(&mut self, filter: &StatusFilter) -> Envelope {
        let result = update_row(&self.conn, filter, "update", false).map(Envelope::affected);
        respond("update", filter, result)
    }

    fn add_or_modify(&mut self, filter: &StatusFilter, _meta: Meta<'_>) -> Envelope {
        let result = self.add_or_modify_row(filter);
        respond("add_or_modify", filter, result)
    }

    fn modify(&mut self, filter: &StatusFilter, _meta: Meta<'_>) -> Envelope {
        let result = self.modify_row(filter);
        respond("modify", filter, result)
    }

    fn delete(&mut self, filter: &StatusFilter) -> Envelope {
        respond("delete", filter, self.delete_rows(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::COLUMNS as DISPLAY_COLUMNS;
    use crate::store::Payload;
    use crate::switches::Status;
    use tempfile::TempDir;

    const META: Meta<'static> = Meta {
        columns: DISPLAY_COLUMNS,
    };

    fn site(table_type: TableType, name: &str, status_type: &str) -> StatusFilter {
        let mut filter = StatusFilter::new(Element::Site, table_type);
        filter.name = Some(name.to_string());
        filter.status_type = Some(status_type.to_string());
        filter
    }

    fn rows(envelope: Envelope) -> Vec<Row> {
        assert!(envelope.ok, "{:?}", envelope.message);
        match envelope.payload {
            Payload::Rows(rows) => rows,
            other => panic!("expected rows, got {:?}", other),
        }
    }

    #[test]
    fn test_database_creation() -> Result<()> {
        let tmp = TempDir::new()?;
        let db_path = tmp.path().join("nested").join("status.db");
        let _store = SqliteStatusStore::open(Some(&db_path))?;
        assert!(db_path.exists());
        Ok(())
    }

    #[test]
    fn test_insert_then_select() -> Result<()> {
        let mut store = SqliteStatusStore::open_in_memory()?;
        let mut filter = site(TableType::Status, "CERN", "ReadAccess");
        filter.status = Some(Status::Probing);
        filter.date_effective = Some("2024-05-01 12:00:00".into());

        assert_eq!(store.insert(&filter), Envelope::affected(1));

        let found = rows(store.select(&StatusFilter::new(Element::Site, TableType::Status), META));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0][0], Cell::from("CERN"));
        assert_eq!(found[0][2], Cell::from("Probing"));
        assert_eq!(found[0][4], Cell::Null);
        assert!(matches!(found[0][5], Cell::Timestamp(_)));
        assert!(matches!(found[0][6], Cell::Timestamp(_)));

        // Other families are separate tables
        let other = rows(store.select(&StatusFilter::new(Element::Node, TableType::Status), META));
        assert!(other.is_empty());
        Ok(())
    }

    #[test]
    fn test_duplicate_insert_fails() -> Result<()> {
        let mut store = SqliteStatusStore::open_in_memory()?;
        let mut filter = site(TableType::Status, "CERN", "ReadAccess");
        filter.status = Some(Status::Active);

        assert!(store.insert(&filter).ok);
        let envelope = store.insert(&filter);
        assert!(!envelope.ok);
        assert!(envelope.message.unwrap_or_default().contains("UNIQUE"));
        Ok(())
    }

    #[test]
    fn test_insert_requires_key() -> Result<()> {
        let mut store = SqliteStatusStore::open_in_memory()?;
        let filter = StatusFilter::new(Element::Site, TableType::Status);
        let envelope = store.insert(&filter);
        assert!(!envelope.ok);
        assert_eq!(
            envelope.message.as_deref(),
            Some("'name' is mandatory for 'insert'")
        );
        Ok(())
    }

    #[test]
    fn test_update_and_delete_counts() -> Result<()> {
        let mut store = SqliteStatusStore::open_in_memory()?;
        for status_type in ["ReadAccess", "WriteAccess"] {
            let mut filter = site(TableType::Status, "PIC", status_type);
            filter.status = Some(Status::Active);
            store.insert(&filter);
        }

        let mut change = site(TableType::Status, "PIC", "WriteAccess");
        change.status = Some(Status::Banned);
        change.reason = Some("downtime".into());
        assert_eq!(store.update(&change), Envelope::affected(1));

        let mut banned = StatusFilter::new(Element::Site, TableType::Status);
        banned.status = Some(Status::Banned);
        let found = rows(store.select(&banned, META));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0][1], Cell::from("WriteAccess"));
        assert_eq!(found[0][4], Cell::from("downtime"));

        let mut everything_at_pic = StatusFilter::new(Element::Site, TableType::Status);
        everything_at_pic.name = Some("PIC".into());
        assert_eq!(store.delete(&everything_at_pic), Envelope::affected(2));
        Ok(())
    }

    #[test]
    fn test_add_or_modify_logs_changes() -> Result<()> {
        let mut store = SqliteStatusStore::open_in_memory()?;
        let mut filter = site(TableType::Status, "RAL", "ReadAccess");
        filter.status = Some(Status::Active);

        // First call inserts, second updates
        assert_eq!(store.add_or_modify(&filter, META), Envelope::affected(1));
        filter.status = Some(Status::Degraded);
        assert_eq!(store.add_or_modify(&filter, META), Envelope::affected(1));

        let status_table = StatusFilter::new(Element::Site, TableType::Status);
        let current = rows(store.select(&status_table, META));
        assert_eq!(current.len(), 1);
        assert_eq!(current[0][2], Cell::from("Degraded"));

        let log = rows(store.select(&StatusFilter::new(Element::Site, TableType::Log), META));
        let statuses: Vec<&Cell> = log.iter().map(|row| &row[2]).collect();
        assert_eq!(statuses, vec![&Cell::from("Active"), &Cell::from("Degraded")]);
        Ok(())
    }

    #[test]
    fn test_add_on_journal_appends() -> Result<()> {
        let mut store = SqliteStatusStore::open_in_memory()?;
        let mut entry = site(TableType::Log, "CERN", "ReadAccess");
        entry.status = Some(Status::Active);
        assert_eq!(store.add_or_modify(&entry, META), Envelope::affected(1));
        entry.status = Some(Status::Banned);
        assert_eq!(store.add_or_modify(&entry, META), Envelope::affected(1));

        let log = rows(store.select(&StatusFilter::new(Element::Site, TableType::Log), META));
        let statuses: Vec<&Cell> = log.iter().map(|row| &row[2]).collect();
        assert_eq!(statuses, vec![&Cell::from("Active"), &Cell::from("Banned")]);

        // Journal adds do not touch the status table
        let status_table = StatusFilter::new(Element::Site, TableType::Status);
        let current = rows(store.select(&status_table, META));
        assert!(current.is_empty());
        Ok(())
    }

    #[test]
    fn test_modify_rejects_journal_tables() -> Result<()> {
        let mut store = SqliteStatusStore::open_in_memory()?;
        let mut entry = site(TableType::History, "CERN", "ReadAccess");
        entry.status = Some(Status::Active);
        store.insert(&entry);

        entry.status = Some(Status::Banned);
        let envelope = store.modify(&entry, META);
        assert!(!envelope.ok);
        assert_eq!(
            envelope.message.as_deref(),
            Some("SiteHistory is append-only, 'modify' cannot change its rows")
        );

        let history =
            rows(store.select(&StatusFilter::new(Element::Site, TableType::History), META));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0][2], Cell::from("Active"));
        Ok(())
    }

    #[test]
    fn test_update_without_fields() -> Result<()> {
        let mut store = SqliteStatusStore::open_in_memory()?;
        let envelope = store.update(&site(TableType::Status, "PIC", "ReadAccess"));
        assert!(!envelope.ok);
        assert!(envelope
            .message
            .unwrap_or_default()
            .starts_with("Nothing to update for 'update'"));
        Ok(())
    }

    #[test]
    fn test_modify_requires_existing_row() -> Result<()> {
        let mut store = SqliteStatusStore::open_in_memory()?;
        let mut filter = site(TableType::Status, "IN2P3", "WriteAccess");
        filter.status = Some(Status::Error);

        let envelope = store.modify(&filter, META);
        assert!(!envelope.ok);
        assert_eq!(
            envelope.message.as_deref(),
            Some("No SiteStatus row for name 'IN2P3' and statusType 'WriteAccess'")
        );

        filter.status = Some(Status::Active);
        store.insert(&filter);
        filter.status = Some(Status::Error);
        assert_eq!(store.modify(&filter, META), Envelope::affected(1));

        let log = rows(store.select(&StatusFilter::new(Element::Site, TableType::Log), META));
        assert_eq!(log.len(), 1);
        assert_eq!(log[0][2], Cell::from("Error"));
        Ok(())
    }

    #[test]
    fn test_unknown_column() -> Result<()> {
        let mut store = SqliteStatusStore::open_in_memory()?;
        let envelope = store.select(
            &StatusFilter::new(Element::Site, TableType::Status),
            Meta { columns: &["name", "colour"] },
        );
        assert_eq!(envelope.message.as_deref(), Some("Unknown column 'colour'"));
        Ok(())
    }
}
