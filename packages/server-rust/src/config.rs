//! Configuration types for the country cache server.
//!
//! [`ServerArgs`] is the command-line/environment surface; the typed
//! configs it produces are what the rest of the crate consumes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

pub const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// Command-line arguments. Every flag falls back to an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "country-cache", version, about = "Country currency & exchange cache")]
pub struct ServerArgs {
    /// Bind address.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on. 0 means OS-assigned.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Storage backend.
    #[arg(long, env = "COUNTRY_CACHE_STORAGE", value_enum, default_value_t = StorageBackend::Postgres)]
    pub storage: StorageBackend,

    /// `PostgreSQL` connection string. Required for postgres storage.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_db_connections: u32,

    /// Country-directory endpoint.
    #[arg(long, env = "COUNTRIES_API_URL", default_value = DEFAULT_COUNTRIES_URL)]
    pub countries_url: String,

    /// USD exchange-rate endpoint.
    #[arg(long, env = "EXCHANGE_RATES_API_URL", default_value = DEFAULT_RATES_URL)]
    pub rates_url: String,

    /// Timeout applied to each upstream call.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 10)]
    pub upstream_timeout_secs: u64,

    /// Directory holding the rendered summary image.
    #[arg(long, env = "COUNTRY_CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Allowed CORS origins; `*` allows any.
    #[arg(long = "cors-origin", env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Upper bound on any single HTTP request.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

/// Settings that parse individually but are inconsistent together.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "request timeout ({request_secs}s) must exceed twice the upstream timeout ({upstream_secs}s)"
    )]
    RequestTimeoutTooShort { request_secs: u64, upstream_secs: u64 },
}

impl ServerArgs {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RequestTimeoutTooShort`] unless the request
    /// timeout is longer than both upstream calls back to back.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs <= self.upstream_timeout_secs.saturating_mul(2) {
            return Err(ConfigError::RequestTimeoutTooShort {
                request_secs: self.request_timeout_secs,
                upstream_secs: self.upstream_timeout_secs,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    #[must_use]
    pub fn upstream(&self) -> UpstreamConfig {
        UpstreamConfig {
            countries_url: self.countries_url.clone(),
            rates_url: self.rates_url.clone(),
            timeout: Duration::from_secs(self.upstream_timeout_secs),
        }
    }

    #[must_use]
    pub fn summary(&self) -> SummaryConfig {
        SummaryConfig {
            cache_dir: self.cache_dir.clone(),
        }
    }

    #[must_use]
    pub fn storage(&self) -> StorageConfig {
        StorageConfig {
            backend: self.storage,
            database_url: self.database_url.clone(),
            max_connections: self.max_db_connections,
        }
    }
}

/// Which [`CountryStore`](crate::storage::CountryStore) backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Upstream endpoints and their per-call timeout.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub countries_url: String,
    pub rates_url: String,
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            countries_url: DEFAULT_COUNTRIES_URL.to_string(),
            rates_url: DEFAULT_RATES_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Where the summary image is written.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub cache_dir: PathBuf,
}

impl SummaryConfig {
    /// Full path of the rendered PNG.
    #[must_use]
    pub fn image_path(&self) -> PathBuf {
        self.cache_dir.join("summary.png")
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
}
