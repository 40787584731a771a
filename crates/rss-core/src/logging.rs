//! Logging bootstrap
//!
//! The tools accept `-o LogLevel=LEVEL` with the operator-facing level names
//! (NOTICE by default). Those are mapped onto `tracing` levels here and a
//! `tracing-subscriber` formatter writing to stderr is installed.
//! `RUST_LOG` wins when it is set.

use std::fmt;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Operator-facing verbosity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    #[default]
    Notice,
    Always,
    Info,
    Verbose,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Notice => "NOTICE",
            Self::Always => "ALWAYS",
            Self::Info => "INFO",
            Self::Verbose => "VERBOSE",
            Self::Debug => "DEBUG",
        }
    }

    /// The tracing level this verbosity maps onto
    pub fn tracing_level(&self) -> Level {
        match self {
            Self::Fatal | Self::Error => Level::ERROR,
            Self::Warn | Self::Notice | Self::Always => Level::WARN,
            Self::Info => Level::INFO,
            Self::Verbose | Self::Debug => Level::DEBUG,
        }
    }

    /// Pick `LogLevel=LEVEL` out of `-o KEY=VALUE` options. The last one wins.
    pub fn from_options<S: AsRef<str>>(options: &[S]) -> Result<Self, String> {
        let mut level = Self::default();
        for option in options {
            let Some((key, value)) = option.as_ref().split_once('=') else {
                return Err(format!("'{}' is not a KEY=VALUE option", option.as_ref()));
            };
            if key.trim().eq_ignore_ascii_case("LogLevel") {
                level = value.parse()?;
            }
        }
        Ok(level)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FATAL" => Ok(Self::Fatal),
            "ERROR" => Ok(Self::Error),
            "WARN" => Ok(Self::Warn),
            "NOTICE" => Ok(Self::Notice),
            "ALWAYS" => Ok(Self::Always),
            "INFO" => Ok(Self::Info),
            "VERBOSE" => Ok(Self::Verbose),
            "DEBUG" => Ok(Self::Debug),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the stderr subscriber. Safe to call more than once.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.tracing_level().as_str().to_lowercase()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
