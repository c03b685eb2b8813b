// Application state module
// Holds the loaded configuration and the resolved location scopes

use config::ConfigError;

use super::types::{Config, LocationConfig};
use crate::accel::{AccelRedirect, AccelSettings, ContentFilter, DirConfig};

/// Location scope with settings already merged over the global defaults
#[derive(Debug, Clone)]
pub struct Location {
    pub prefix: String,
    pub alias: Option<String>,
    pub dir: DirConfig,
    pub filters: Vec<ContentFilter>,
}

impl Location {
    fn from_config(config: &LocationConfig, global: DirConfig) -> Self {
        let own = DirConfig {
            redirect: config.redirect,
            min_size: config.min_size,
        };
        Self {
            prefix: config.prefix.clone(),
            alias: config.alias.clone(),
            dir: own.inherit(global),
            filters: config.filters.iter().map(|name| ContentFilter::named(name)).collect(),
        }
    }
}

/// Application state, shared read-only by all connections
pub struct AppState {
    pub config: Config,
    pub accel: AccelRedirect,
    /// Scope used when no location matches
    pub root_scope: DirConfig,
    /// Sorted by prefix length, longest first
    pub locations: Vec<Location>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let root_scope = DirConfig {
            redirect: config.accel.redirect,
            min_size: config.accel.min_size,
        };

        let mut locations: Vec<Location> = config
            .locations
            .iter()
            .map(|l| Location::from_config(l, root_scope))
            .collect();
        locations.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        let settings = AccelSettings {
            outside_doc_root: config.accel.outside_doc_root,
            max_redirect_len: config.accel.max_redirect_len,
            containment: config.accel.containment,
            debug_level: config.accel.debug_level,
        };

        Ok(Self {
            config: config.clone(),
            accel: AccelRedirect::new(normalize_doc_root(&config.server.document_root), settings),
            root_scope,
            locations,
        })
    }

    /// Most specific location whose prefix matches `path`
    pub fn location_for(&self, path: &str) -> Option<&Location> {
        self.locations
            .iter()
            .find(|location| location.matches(path))
    }

    /// Map a request path to a filesystem path
    ///
    /// Aliased locations replace their prefix with the alias directory, which
    /// may lie outside the document root. Everything else is appended to the
    /// document root as is.
    pub fn map_to_filesystem(&self, path: &str, location: Option<&Location>) -> String {
        if let Some(location) = location {
            if let Some(alias) = &location.alias {
                let rest = path.strip_prefix(location.prefix.as_str()).unwrap_or(path);
                return format!("{alias}{rest}");
            }
        }
        format!("{}{path}", self.accel.doc_root())
    }
}

impl Location {
    /// Whether `path` falls under this location's prefix, segment-wise
    ///
    /// `/dl` matches `/dl` and `/dl/x` but not `/dl-private/x`.
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix.ends_with('/'),
            None => false,
        }
    }
}

/// Drop trailing slashes so the remainder after the root keeps its leading '/'
fn normalize_doc_root(doc_root: &str) -> String {
    doc_root.trim_end_matches('/').to_string()
}
