//! Query errors
//!
//! Every variant is terminal: the binary prints it under the error banner,
//! shows the usage text and exits with status 1.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Found the following positional args '{0:?}', but we only accept switches")]
    UnexpectedArguments(Vec<String>),

    #[error("{switch} Switch is mandatory but found missing")]
    MissingSwitch { switch: &'static str },

    #[error("{}", invalid_value_message(.switch, .value, .acceptable))]
    InvalidValue {
        switch: &'static str,
        value: String,
        /// Listed in the message when the vocabulary is dynamic
        acceptable: Option<Vec<String>>,
    },

    #[error("{message}")]
    StoreOperationFailed { query: String, message: String },

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl QueryError {
    /// Switch and store failures are followed by the usage text; output
    /// failures are not.
    pub fn shows_usage(&self) -> bool {
        !matches!(self, QueryError::Output(_))
    }

    pub(crate) fn invalid(switch: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            switch,
            value: value.into(),
            acceptable: None,
        }
    }
}

fn invalid_value_message(switch: &str, value: &str, acceptable: &Option<Vec<String>>) -> String {
    match acceptable {
        Some(values) => format!(
            "'{}' is a wrong value for switch '{}'.\n\tThe acceptable values are:\n\t{:?}",
            value, switch, values
        ),
        None => format!("'{}' is an invalid argument for switch '{}'", value, switch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = QueryError::MissingSwitch { switch: "element" };
        assert_eq!(err.to_string(), "element Switch is mandatory but found missing");

        let err = QueryError::invalid("tableType", "Nope");
        assert_eq!(
            err.to_string(),
            "'Nope' is an invalid argument for switch 'tableType'"
        );

        let err = QueryError::InvalidValue {
            switch: "statusType",
            value: "Bogus".into(),
            acceptable: Some(vec!["ReadAccess".into()]),
        };
        assert!(err.to_string().starts_with("'Bogus' is a wrong value for switch 'statusType'."));
        assert!(err.to_string().contains("[\"ReadAccess\"]"));
    }

    #[test]
    fn test_usage_only_for_query_failures() {
        assert!(QueryError::MissingSwitch { switch: "query" }.shows_usage());
        assert!(QueryError::StoreOperationFailed {
            query: "select".into(),
            message: "locked".into(),
        }
        .shows_usage());

        let broken_pipe = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        assert!(!QueryError::Output(broken_pipe).shows_usage());
    }
}
