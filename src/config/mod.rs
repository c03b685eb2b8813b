// Configuration module entry point
// Loads the TOML configuration and prepares the per-location scopes

pub mod size;
mod state;
mod types;

use config::ConfigError;
use std::net::SocketAddr;

// Re-export public types
pub use size::{parse_size, SizeParseError};
pub use state::{AppState, Location};
pub use types::{
    AccelConfig, Config, HttpConfig, LocationConfig, LoggingConfig, PerformanceConfig,
    ServerConfig,
};

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    ///
    /// Environment variables prefixed with `ACCEL_` override file values,
    /// e.g. `ACCEL_SERVER__PORT=9090`.
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("ACCEL").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.document_root", "./public")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("http.server_name", "accel-redirect/0.1")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("accel.outside_doc_root", false)?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that deserialize but make no sense
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.document_root.is_empty() {
            return Err(ConfigError::Message(
                "server.document_root must not be empty".to_string(),
            ));
        }
        if self.accel.max_redirect_len == 0 {
            return Err(ConfigError::Message(
                "accel.max_redirect_len must be greater than 0".to_string(),
            ));
        }

        for location in &self.locations {
            if !location.prefix.starts_with('/') {
                return Err(ConfigError::Message(format!(
                    "location prefix '{}' must start with '/'",
                    location.prefix
                )));
            }
            if location.outside_doc_root.is_some() {
                return Err(ConfigError::Message(format!(
                    "outside_doc_root is only allowed in the [accel] section, not in location '{}'",
                    location.prefix
                )));
            }
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// Minimal configuration for unit tests
#[cfg(test)]
pub fn test_config(document_root: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: None,
            document_root: document_root.to_string(),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            access_log: false,
            access_log_format: "combined".to_string(),
            access_log_file: None,
            error_log_file: None,
        },
        performance: PerformanceConfig {
            keep_alive_timeout: 75,
            read_timeout: 30,
            max_connections: None,
            shutdown_grace: 1,
        },
        http: HttpConfig {
            server_name: "test".to_string(),
            max_body_size: 1024,
        },
        accel: AccelConfig {
            redirect: Some(true),
            min_size: Some(100),
            outside_doc_root: false,
            max_redirect_len: 8192,
            containment: crate::accel::Containment::Literal,
            debug_level: 0,
        },
        locations: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn load(toml: &str) -> Result<Config, ConfigError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        fs::write(&path, toml).unwrap();
        Config::load_from(path.to_str().unwrap())
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load_from("/nonexistent/accel-redirect-config").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.accel.redirect, None);
        assert_eq!(config.accel.min_size, None);
        assert!(!config.accel.outside_doc_root);
        assert_eq!(config.accel.max_redirect_len, 8192);
        assert!(config.locations.is_empty());
    }

    #[test]
    fn test_full_file() {
        let config = load(
            r#"
            [server]
            port = 9000
            document_root = "/var/www"

            [accel]
            redirect = true
            min_size = "1k"
            outside_doc_root = true
            containment = "canonical"
            debug_level = 2

            [[locations]]
            prefix = "/downloads"
            alias = "/srv/files"
            min_size = 4096

            [[locations]]
            prefix = "/pages"
            redirect = false
            filters = ["includes"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.document_root, "/var/www");
        assert_eq!(config.accel.redirect, Some(true));
        assert_eq!(config.accel.min_size, Some(1024));
        assert!(config.accel.outside_doc_root);
        assert_eq!(config.accel.containment, crate::accel::Containment::Canonical);
        assert_eq!(config.accel.debug_level, 2);
        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.locations[0].alias.as_deref(), Some("/srv/files"));
        assert_eq!(config.locations[0].min_size, Some(4096));
        assert_eq!(config.locations[1].redirect, Some(false));
        assert_eq!(config.locations[1].filters, vec!["includes".to_string()]);
    }

    #[test]
    fn test_bad_size_is_config_error() {
        let err = load(
            r#"
            [accel]
            min_size = "12 parsecs"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid size in min_size"));
    }

    #[test]
    fn test_outside_doc_root_rejected_in_location() {
        let err = load(
            r#"
            [[locations]]
            prefix = "/downloads"
            outside_doc_root = true
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("only allowed in the [accel] section"));
    }

    #[test]
    fn test_relative_location_prefix_rejected() {
        let err = load(
            r#"
            [[locations]]
            prefix = "downloads"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }
}
