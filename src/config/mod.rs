//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `HILITE_*` environment
//! variables; the oracle key additionally falls back to `GEMINI_API_KEY`.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::oracle::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `HILITE_*` overrides on top of
/// defaults.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Directory for persisted query records. Default: `./.data`.
    pub data_dir: PathBuf,

    /// Process-level oracle API key from `GEMINI_API_KEY`. Optional:
    /// without it every request must carry its own key.
    pub gemini_api_key: Option<String>,

    /// Oracle model name. Default: `gemini-2.5-flash`.
    pub oracle_model: String,

    /// Oracle API base URL.
    pub oracle_base_url: String,

    /// Per-call oracle timeout in seconds. Default: `60`.
    pub oracle_timeout_secs: u64,

    /// Oracle attempts per request, including the first. Default: `3`.
    pub oracle_attempts: u32,

    /// Max records held in the in-process read cache. Default: `1024`.
    pub read_cache_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            data_dir: PathBuf::from("./.data"),
            gemini_api_key: None,
            oracle_model: DEFAULT_MODEL.to_string(),
            oracle_base_url: DEFAULT_BASE_URL.to_string(),
            oracle_timeout_secs: 60,
            oracle_attempts: 3,
            read_cache_capacity: 1024,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "HILITE_PORT";
    const ENV_BIND_ADDR: &'static str = "HILITE_BIND_ADDR";
    const ENV_DATA_DIR: &'static str = "HILITE_DATA_DIR";
    const ENV_GEMINI_API_KEY: &'static str = "GEMINI_API_KEY";
    const ENV_ORACLE_MODEL: &'static str = "HILITE_ORACLE_MODEL";
    const ENV_ORACLE_URL: &'static str = "HILITE_ORACLE_URL";
    const ENV_ORACLE_TIMEOUT_SECS: &'static str = "HILITE_ORACLE_TIMEOUT_SECS";
    const ENV_ORACLE_ATTEMPTS: &'static str = "HILITE_ORACLE_ATTEMPTS";
    const ENV_READ_CACHE_CAPACITY: &'static str = "HILITE_READ_CACHE_CAPACITY";

    /// Loads configuration from environment variables (falling back to
    /// defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let data_dir = Self::parse_path_from_env(Self::ENV_DATA_DIR, defaults.data_dir);
        let gemini_api_key = Self::parse_optional_string_from_env(Self::ENV_GEMINI_API_KEY);
        let oracle_model =
            Self::parse_string_from_env(Self::ENV_ORACLE_MODEL, defaults.oracle_model);
        let oracle_base_url =
            Self::parse_string_from_env(Self::ENV_ORACLE_URL, defaults.oracle_base_url);
        let oracle_timeout_secs =
            Self::parse_u64_from_env(Self::ENV_ORACLE_TIMEOUT_SECS, defaults.oracle_timeout_secs);
        let oracle_attempts =
            Self::parse_u32_from_env(Self::ENV_ORACLE_ATTEMPTS, defaults.oracle_attempts);
        let read_cache_capacity = Self::parse_u64_from_env(
            Self::ENV_READ_CACHE_CAPACITY,
            defaults.read_cache_capacity,
        );

        Ok(Self {
            port,
            bind_addr,
            data_dir,
            gemini_api_key,
            oracle_model,
            oracle_base_url,
            oracle_timeout_secs,
            oracle_attempts,
            read_cache_capacity,
        })
    }

    /// Validates basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.exists() && !self.data_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.data_dir.clone(),
            });
        }

        if self.oracle_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_ORACLE_ATTEMPTS,
                value: self.oracle_attempts.to_string(),
            });
        }

        if self.oracle_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_ORACLE_TIMEOUT_SECS,
                value: self.oracle_timeout_secs.to_string(),
            });
        }

        if self.oracle_base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_ORACLE_URL,
                value: self.oracle_base_url.clone(),
            });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Per-call oracle timeout as a [`Duration`].
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_u32_from_env(var_name: &str, default: u32) -> u32 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

impl fmt::Debug for Config {
    // Handwritten so the API key can never reach a log line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("oracle_model", &self.oracle_model)
            .field("oracle_base_url", &self.oracle_base_url)
            .field("oracle_timeout_secs", &self.oracle_timeout_secs)
            .field("oracle_attempts", &self.oracle_attempts)
            .field("read_cache_capacity", &self.read_cache_capacity)
            .finish()
    }
}
