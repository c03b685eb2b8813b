// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

use super::size;
use crate::accel::{Containment, DEFAULT_MAX_REDIRECT_LEN};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub accel: AccelConfig,
    /// Location scopes, matched by longest prefix
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Directory request paths are mapped into
    pub document_root: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    /// Seconds allowed for each request head, including keep-alive idle time
    pub read_timeout: u64,
    pub max_connections: Option<u64>,
    /// Seconds to wait for open connections on shutdown
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: u64,
}

const fn default_shutdown_grace() -> u64 {
    10
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    /// Largest request body drained before a redirect, in bytes
    pub max_body_size: u64,
}

/// Server-wide X-Accel-Redirect settings
///
/// `redirect` and `min_size` are the defaults every location inherits.
/// `outside_doc_root` can only be set here.
#[derive(Debug, Deserialize, Clone)]
pub struct AccelConfig {
    #[serde(default)]
    pub redirect: Option<bool>,
    #[serde(default, deserialize_with = "size::deserialize")]
    pub min_size: Option<u64>,
    #[serde(default)]
    pub outside_doc_root: bool,
    #[serde(default = "default_max_redirect_len")]
    pub max_redirect_len: usize,
    #[serde(default)]
    pub containment: Containment,
    /// Accel diagnostic verbosity (0 = off, 4 = every considered request)
    #[serde(default)]
    pub debug_level: u8,
}

const fn default_max_redirect_len() -> usize {
    DEFAULT_MAX_REDIRECT_LEN
}

/// A location scope
#[derive(Debug, Deserialize, Clone)]
pub struct LocationConfig {
    /// Request path prefix, e.g. "/downloads"
    pub prefix: String,
    /// Directory the prefix is mapped to instead of the document root
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub redirect: Option<bool>,
    #[serde(default, deserialize_with = "size::deserialize")]
    pub min_size: Option<u64>,
    /// Output filters attached to responses of this location
    #[serde(default)]
    pub filters: Vec<String>,
    /// Rejected at load time: only valid in `[accel]`
    #[serde(default)]
    pub outside_doc_root: Option<bool>,
}
