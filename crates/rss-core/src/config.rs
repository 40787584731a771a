//! Hierarchical configuration registry
//!
//! The registry is a tree of sections and options addressed with
//! slash-separated paths (`/Registry/Users/alice/DN`). It is loaded from
//! `~/.config/rss/config.yaml` and merged over a small built-in default
//! tree, so the tools work out of the box.
//!
//! `Operations` is the view used for operational settings: a relative path
//! is looked up under the active setup first, then under `Defaults`.

use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::paths::Paths;

/// Operations path holding the acceptable status types for storage elements
pub const STATUS_TYPES_PATH: &str = "ResourceStatus/Config/StatusTypes/StorageElement";

const DEFAULT_STATUS_TYPES: &str = "ReadAccess, WriteAccess, CheckAccess, RemoveAccess";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Path {0} does not exist")]
    MissingPath(String),

    #[error("{0} is not a section")]
    NotASection(String),

    /// A lookup that found nothing; the message is user-facing
    #[error("{0}")]
    NotFound(String),

    #[error("Failed to read configuration from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// The configuration tree
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    root: Value,
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.set(
            &format!("/Operations/Defaults/{}", STATUS_TYPES_PATH),
            DEFAULT_STATUS_TYPES,
        );
        registry.set("/Registry/DefaultGroup", "user");
        registry
    }
}

impl ConfigRegistry {
    /// A registry with no sections at all
    pub fn empty() -> Self {
        Self {
            root: Value::Mapping(Mapping::new()),
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Paths::new().registry_config())
    }

    /// Load configuration from a specific path, merged over the defaults.
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        if !path.exists() {
            debug!(path = %path.display(), "no registry configuration, using defaults");
            return Ok(registry);
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let overlay: Value = serde_yaml::from_str(&content)?;
        merge(&mut registry.root, overlay);
        debug!(path = %path.display(), "loaded registry configuration");
        Ok(registry)
    }

    /// Parse a YAML document as a complete registry (no defaults)
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_yaml::from_str(content)?;
        Ok(Self { root })
    }

    /// Set an option, creating intermediate sections as needed
    pub fn set(&mut self, path: &str, value: &str) {
        let mut segments: Vec<&str> = split_path(path).collect();
        let Some(leaf) = segments.pop() else {
            return;
        };

        let mut node = &mut self.root;
        for segment in segments {
            if !node.is_mapping() {
                *node = Value::Mapping(Mapping::new());
            }
            let Value::Mapping(map) = node else {
                return;
            };
            node = map
                .entry(Value::String(segment.to_string()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
        }

        if !node.is_mapping() {
            *node = Value::Mapping(Mapping::new());
        }
        if let Value::Mapping(map) = node {
            map.insert(
                Value::String(leaf.to_string()),
                Value::String(value.to_string()),
            );
        }
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        split_path(path).try_fold(&self.root, |node, segment| node.get(segment))
    }

    /// Get an option as text. Lists are rendered comma-separated.
    pub fn get_value(&self, path: &str) -> Option<String> {
        match self.lookup(path)? {
            Value::Sequence(items) => Some(
                items
                    .iter()
                    .filter_map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            other => scalar_to_string(other),
        }
    }

    /// Get an option with a fallback
    pub fn get_value_or(&self, path: &str, default: &str) -> String {
        self.get_value(path).unwrap_or_else(|| default.to_string())
    }

    /// Get an option as a list. Text options are split on commas.
    pub fn get_list(&self, path: &str) -> Vec<String> {
        match self.lookup(path) {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_to_string).collect(),
            Some(other) => scalar_to_string(other)
                .map(|text| split_list(&text))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Names of the sub-sections under `path`
    pub fn get_sections(&self, path: &str) -> Result<Vec<String>, ConfigError> {
        self.children(path, true)
    }

    /// Names of the options (non-section children) under `path`
    pub fn get_options(&self, path: &str) -> Result<Vec<String>, ConfigError> {
        self.children(path, false)
    }

    fn children(&self, path: &str, sections: bool) -> Result<Vec<String>, ConfigError> {
        let node = self
            .lookup(path)
            .ok_or_else(|| ConfigError::MissingPath(path.to_string()))?;
        let Value::Mapping(map) = node else {
            return Err(ConfigError::NotASection(path.to_string()));
        };

        Ok(map
            .iter()
            .filter(|(_, value)| value.is_mapping() == sections)
            .filter_map(|(key, _)| scalar_to_string(key))
            .collect())
    }
}

/// Operations view over the registry
pub struct Operations<'a> {
    registry: &'a ConfigRegistry,
    setup: Option<String>,
}

impl<'a> Operations<'a> {
    pub fn new(registry: &'a ConfigRegistry) -> Self {
        let setup = registry.get_value("/System/Setup");
        Self { registry, setup }
    }

    /// Look a relative path up under the setup section, then under `Defaults`
    pub fn get_value(&self, path: &str) -> Option<String> {
        self.resolve(path)
            .and_then(|full| self.registry.get_value(&full))
    }

    /// List variant of [`Operations::get_value`]
    pub fn get_list(&self, path: &str) -> Vec<String> {
        self.resolve(path)
            .map(|full| self.registry.get_list(&full))
            .unwrap_or_default()
    }

    fn resolve(&self, path: &str) -> Option<String> {
        let path = path.trim_start_matches('/');
        let candidates = self
            .setup
            .iter()
            .map(|setup| format!("/Operations/{}/{}", setup, path))
            .chain(std::iter::once(format!("/Operations/Defaults/{}", path)));

        for candidate in candidates {
            if self.registry.lookup(&candidate).is_some() {
                return Some(candidate);
            }
        }
        None
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Deep-merge `overlay` into `base`; overlay options win
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
