//! Configuration management
//!
//! Layers, lowest to highest precedence: built-in defaults, the optional
//! `calltone.toml` (or the file named by `CALLTONE_CONFIG`), then
//! `CALLTONE_*` environment variables with `__` between nested keys
//! (`CALLTONE_VAPI__API_KEY`). `DATABASE_URL` overrides `database.url`.

use ::config::{ConfigError, Environment, File, Source};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "calltone.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub vapi: VapiConfig,
    pub rate_limit: RateLimitConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VapiConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Shared secret for webhook authentication; unset disables the check
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub backend: StorageBackend,
    /// Call initiations allowed per organization per window
    pub initiate_limit: u32,
    pub window_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub stale_after_secs: i64,
    pub batch_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` env-filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://postgres@localhost/calltone".to_string(),
                max_connections: 10,
                min_connections: 2,
                connect_timeout_secs: 5,
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
            },
            vapi: VapiConfig {
                api_key: String::new(),
                base_url: "https://api.vapi.ai".to_string(),
                request_timeout_secs: 30,
                webhook_secret: None,
            },
            rate_limit: RateLimitConfig {
                backend: StorageBackend::Memory,
                initiate_limit: 30,
                window_secs: 60,
            },
            sync: SyncConfig {
                enabled: true,
                interval_secs: 60,
                stale_after_secs: 300,
                batch_size: 50,
            },
            logging: LoggingConfig {
                level: "calltone=info,tower_http=info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load from file and process environment
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("CALLTONE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::layered(
            File::with_name(&path).required(false),
            env_source(),
            std::env::var("DATABASE_URL").ok(),
        )
    }

    fn layered<F>(
        file: F,
        env: Environment,
        database_url: Option<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Source + Send + Sync + 'static,
    {
        ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(env)
            .set_override_option("database.url", database_url)?
            .build()?
            .try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("CALLTONE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl VapiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_secs)
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_after_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::config::FileFormat;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_source().source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = Config::layered(File::from_str("", FileFormat::Toml), env(&[]), None).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.vapi.base_url, "https://api.vapi.ai");
        assert!(config.vapi.webhook_secret.is_none());
        assert!(config.sync.enabled);
    }

    #[test]
    fn test_file_then_env_precedence() {
        let file = File::from_str(
            r#"
            [server]
            port = 9000

            [storage]
            backend = "memory"

            [vapi]
            api_key = "from-file"
            webhook_secret = "s3cret"
            "#,
            FileFormat::Toml,
        );
        let config = Config::layered(
            file,
            env(&[
                ("CALLTONE_VAPI__API_KEY", "from-env"),
                ("CALLTONE_SYNC__BATCH_SIZE", "7"),
            ]),
            None,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.vapi.api_key, "from-env");
        assert_eq!(config.vapi.webhook_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.sync.batch_size, 7);
        // Untouched keys keep their defaults
        assert_eq!(config.rate_limit.initiate_limit, 30);
    }

    #[test]
    fn test_database_url_override() {
        let config = Config::layered(
            File::from_str("", FileFormat::Toml),
            env(&[("CALLTONE_DATABASE__URL", "postgres://env@db/one")]),
            Some("postgres://override@db/two".to_string()),
        )
        .unwrap();
        assert_eq!(config.database.url, "postgres://override@db/two");
    }
}
