//! Command-line surface of `rss-query`

use clap::{CommandFactory, Parser};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::dispatch::dispatch;
use crate::error::QueryError;
use crate::expand::{expand, StatusTypeSource};
use crate::present::{render, report_error};
use crate::store::StatusStore;
use crate::switches::{validate, RawSwitches, RequestTemplate};

#[derive(Parser, Debug)]
#[command(name = "rss-query")]
#[command(about = "Dump and modify the Resource Status database")]
#[command(version)]
#[command(after_help = r#"Returns the StatusType and Status attributes of the elements that match the switches.
Both --name and --statusType accept comma-separated lists; every combination is queried.

VERBOSITY:
    -o LogLevel=LEVEL     NOTICE by default, levels available: INFO, DEBUG, VERBOSE..

EXAMPLES:
    # Current status of a site
    rss-query --element=Site --tableType=Status --query=select --name=CERN

    # Ban two storage elements for writing
    rss-query --element=Resource --tableType=Status -q modify \
        --name=SE1,SE2 --statusType=WriteAccess --status=Banned --reason="disk full"

    # Audit trail of a node
    rss-query --element=Node --tableType=Log --query=select --name=node01.example.org
"#)]
pub struct Cli {
    /// Element family ( Site, Resource, Component, Node )
    #[arg(long, value_name = "ELEMENT")]
    pub element: Option<String>,

    /// A valid table type ( Status, Log, History )
    #[arg(long = "tableType", value_name = "TABLE")]
    pub table_type: Option<String>,

    /// ElementName; comma-separated list allowed; None by default
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// StatusType (e.g. ReadAccess, WriteAccess); comma-separated list allowed; None by default
    #[arg(long = "statusType", value_name = "TYPE")]
    pub status_type: Option<String>,

    /// Status ( Active, Probing, Degraded, Banned, Error, Unknown ); None by default
    #[arg(long, value_name = "STATUS")]
    pub status: Option<String>,

    /// ElementType narrows the search; None by default
    #[arg(long = "elementType", value_name = "TYPE")]
    pub element_type: Option<String>,

    /// Decision that triggered the assigned status
    #[arg(long, value_name = "TEXT")]
    pub reason: Option<String>,

    /// Time-stamp of downtime announcement
    #[arg(long = "dateEffective", value_name = "TIME")]
    pub date_effective: Option<String>,

    /// Time-stamp setting last time the status was checked
    #[arg(long = "lastCheckTime", value_name = "TIME")]
    pub last_check_time: Option<String>,

    /// Owner of the token; None by default
    #[arg(long = "tokenOwner", value_name = "OWNER")]
    pub token_owner: Option<String>,

    /// Time-stamp setting validity of token ownership
    #[arg(long = "tokenExpiration", value_name = "TIME")]
    pub token_expiration: Option<String>,

    /// A valid query ( select, insert, update, add, modify, delete )
    #[arg(long, value_name = "QUERY")]
    pub query: Option<String>,

    /// Short form of --query
    #[arg(short = 'q', value_name = "QUERY")]
    pub q: Option<String>,

    /// Extra options as KEY=VALUE, e.g. LogLevel=DEBUG
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Status database (default: ~/.local/share/rss/resource-status.db, or $RSS_DB)
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Registry configuration (default: ~/.config/rss/config.yaml, or $RSS_CONFIG)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(hide = true)]
    pub positional: Vec<String>,
}

impl Cli {
    pub fn switches(&self) -> RawSwitches {
        RawSwitches {
            element: self.element.clone(),
            table_type: self.table_type.clone(),
            name: self.name.clone(),
            status_type: self.status_type.clone(),
            status: self.status.clone(),
            element_type: self.element_type.clone(),
            reason: self.reason.clone(),
            date_effective: self.date_effective.clone(),
            last_check_time: self.last_check_time.clone(),
            token_owner: self.token_owner.clone(),
            token_expiration: self.token_expiration.clone(),
            query: self.query.clone(),
            q: self.q.clone(),
            positional: self.positional.clone(),
        }
    }
}

/// Full help text, shown after every error
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

/// Dispatch and render each expanded request in order, stopping at the
/// first failure.
pub fn run_requests<W: Write>(
    requests: &[RequestTemplate],
    store: &mut (impl StatusStore + ?Sized),
    out: &mut W,
) -> Result<(), QueryError> {
    for request in requests {
        let outcome = dispatch(store, request)?;
        render(out, &outcome)?;
    }
    Ok(())
}

/// Validate, expand and run every request, returning the exit code.
///
/// The store is only opened once the switches are known to be good. A
/// failure is reported on `err` and yields 1; errors opening the store are
/// returned to the caller.
pub fn run<S, W, E>(
    cli: &Cli,
    source: &(impl StatusTypeSource + ?Sized),
    open_store: impl FnOnce() -> anyhow::Result<S>,
    out: &mut W,
    err: &mut E,
) -> anyhow::Result<i32>
where
    S: StatusStore,
    W: Write,
    E: Write,
{
    let requests = match validate(&cli.switches()).and_then(|t| expand(&t, source)) {
        Ok(requests) => requests,
        Err(error) => return Ok(fail(err, &error)?),
    };
    debug!(requests = requests.len(), "running requests");

    let mut store = open_store()?;
    match run_requests(&requests, &mut store, out) {
        Ok(()) => Ok(0),
        Err(error) => Ok(fail(err, &error)?),
    }
}

fn fail<E: Write>(err: &mut E, error: &QueryError) -> io::Result<i32> {
    let usage = error.shows_usage().then(usage);
    report_error(err, &error.to_string(), usage.as_deref())?;
    Ok(1)
}
