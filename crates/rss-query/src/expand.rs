//! Combination expansion
//!
//! `--name` and `--statusType` accept comma-separated lists. A template
//! carrying lists is expanded into one template per (name, statusType)
//! combination, names in the outer loop and status types in the inner one.

use rss_core::config::STATUS_TYPES_PATH;
use rss_core::{ConfigRegistry, Operations};
use tracing::debug;

use crate::error::QueryError;
use crate::switches::RequestTemplate;

/// Where the acceptable status types come from
pub trait StatusTypeSource {
    fn acceptable_status_types(&self) -> Vec<String>;
}

impl StatusTypeSource for ConfigRegistry {
    /// The operations option is a comma and/or space separated string
    fn acceptable_status_types(&self) -> Vec<String> {
        Operations::new(self)
            .get_value(STATUS_TYPES_PATH)
            .map(|value| {
                value
                    .replace(',', " ")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl StatusTypeSource for [String] {
    fn acceptable_status_types(&self) -> Vec<String> {
        self.to_vec()
    }
}

fn split_tokens(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Reject any status type outside the configured vocabulary
fn check_status_types(
    status_types: &[String],
    source: &(impl StatusTypeSource + ?Sized),
) -> Result<(), QueryError> {
    let acceptable = source.acceptable_status_types();
    match status_types.iter().find(|st| !acceptable.contains(st)) {
        Some(unknown) => Err(QueryError::InvalidValue {
            switch: "statusType",
            value: unknown.clone(),
            acceptable: Some(acceptable),
        }),
        None => Ok(()),
    }
}

/// Expand a validated template into single-valued templates.
///
/// Always yields at least one template. Fails before yielding anything when a
/// status type is not acceptable.
pub fn expand(
    template: &RequestTemplate,
    source: &(impl StatusTypeSource + ?Sized),
) -> Result<Vec<RequestTemplate>, QueryError> {
    let names = split_tokens(template.filter.name.as_deref());
    let status_types = split_tokens(template.filter.status_type.as_deref());

    if !status_types.is_empty() {
        check_status_types(&status_types, source)?;
    }

    let branch = |name: Option<&String>, status_type: Option<&String>| {
        template
            .clone()
            .with_name(name.cloned())
            .with_status_type(status_type.cloned())
    };

    let expanded: Vec<RequestTemplate> = match (names.is_empty(), status_types.is_empty()) {
        (false, false) => names
            .iter()
            .flat_map(|name| {
                status_types
                    .iter()
                    .map(move |status_type| branch(Some(name), Some(status_type)))
            })
            .collect(),
        (false, true) => names.iter().map(|name| branch(Some(name), None)).collect(),
        (true, false) => status_types
            .iter()
            .map(|status_type| branch(None, Some(status_type)))
            .collect(),
        (true, true) => vec![branch(None, None)],
    };

    debug!(
        names = names.len(),
        status_types = status_types.len(),
        requests = expanded.len(),
        "expanded request"
    );
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switches::{Element, QueryVerb, TableType};

    fn vocabulary() -> Vec<String> {
        ["ReadAccess", "WriteAccess", "x", "y"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn template(name: Option<&str>, status_type: Option<&str>) -> RequestTemplate {
        RequestTemplate::new(QueryVerb::Select, Element::Site, TableType::Status)
            .with_name(name.map(str::to_string))
            .with_status_type(status_type.map(str::to_string))
    }

    fn expand_all(template: &RequestTemplate) -> Result<Vec<RequestTemplate>, QueryError> {
        expand(template, vocabulary().as_slice())
    }

    fn pairs(expanded: &[RequestTemplate]) -> Vec<(Option<&str>, Option<&str>)> {
        expanded
            .iter()
            .map(|t| (t.filter.name.as_deref(), t.filter.status_type.as_deref()))
            .collect()
    }

    #[test]
    fn test_cartesian_product_order() {
        let expanded = expand_all(&template(Some("a,b"), Some("x,y"))).unwrap();
        assert_eq!(
            pairs(&expanded),
            vec![
                (Some("a"), Some("x")),
                (Some("a"), Some("y")),
                (Some("b"), Some("x")),
                (Some("b"), Some("y")),
            ]
        );
    }

    #[test]
    fn test_names_only() {
        let expanded = expand_all(&template(Some("CERN,,PIC,"), None)).unwrap();
        assert_eq!(pairs(&expanded), vec![(Some("CERN"), None), (Some("PIC"), None)]);
    }

    #[test]
    fn test_status_types_only() {
        let expanded = expand_all(&template(None, Some("ReadAccess"))).unwrap();
        assert_eq!(pairs(&expanded), vec![(None, Some("ReadAccess"))]);
    }

    #[test]
    fn test_unrestricted_template() {
        let original = template(None, None);
        let expanded = expand_all(&original).unwrap();
        assert_eq!(expanded, vec![original]);

        // Only separators collapses to the same single template
        let expanded = expand_all(&template(Some(",,"), Some(","))).unwrap();
        assert_eq!(pairs(&expanded), vec![(None, None)]);
    }

    #[test]
    fn test_other_fields_survive() {
        let mut original = template(Some("a,b"), None);
        original.filter.reason = Some("maintenance".into());
        let expanded = expand_all(&original).unwrap();
        assert!(expanded
            .iter()
            .all(|t| t.filter.reason.as_deref() == Some("maintenance")));
    }

    #[test]
    fn test_unknown_status_type_fails_whole_expansion() {
        let err = expand_all(&template(Some("a"), Some("x,Bogus"))).unwrap_err();
        match err {
            QueryError::InvalidValue {
                switch,
                value,
                acceptable,
            } => {
                assert_eq!(switch, "statusType");
                assert_eq!(value, "Bogus");
                assert_eq!(acceptable, Some(vocabulary()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_registry_vocabulary() {
        let mut registry = ConfigRegistry::empty();
        registry.set(
            &format!("/Operations/Defaults/{}", STATUS_TYPES_PATH),
            "ReadAccess,WriteAccess CheckAccess",
        );
        assert_eq!(
            registry.acceptable_status_types(),
            vec!["ReadAccess", "WriteAccess", "CheckAccess"]
        );
        assert!(ConfigRegistry::empty().acceptable_status_types().is_empty());

        let expanded = expand(&template(None, Some("CheckAccess")), &registry).unwrap();
        assert_eq!(expanded.len(), 1);
    }
}
