//! Configuration for the capture broker.
//!
//! Values are resolved in layers: built-in defaults, then an optional
//! TOML file, then environment variables. The binary applies CLI
//! flags on top of the result.
//!
//! - `BROKER_BIND_ADDR`   (default: "0.0.0.0")
//! - `BROKER_PORT`        (default: "8123")
//! - `BROKER_BACKEND_URL` (required)
//! - `BROKER_LOG_JSON`    (default: "false")

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8123;

pub const ENV_BIND_ADDR: &str = "BROKER_BIND_ADDR";
pub const ENV_PORT: &str = "BROKER_PORT";
pub const ENV_BACKEND_URL: &str = "BROKER_BACKEND_URL";
pub const ENV_LOG_JSON: &str = "BROKER_LOG_JSON";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no backend URL configured (set BROKER_BACKEND_URL or `backend_url`)")]
    MissingBackendUrl,

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// Port serving both the WebSocket endpoint and the liveness probe.
    pub port: u16,

    /// Base URL of the control-plane backend, e.g. `http://backend:5858`.
    pub backend_url: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

/// Optional settings read from a TOML file. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind_addr: Option<String>,
    port: Option<u16>,
    backend_url: Option<String>,
    log_json: Option<bool>,
}

impl Config {
    /// Read `path` (if any), then apply `lookup` on top. The binary
    /// passes a lookup that consults CLI flags before the environment.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => read_file(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, lookup)
    }

    fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup(ENV_BIND_ADDR)
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let port = read_or(&lookup, ENV_PORT, file.port.unwrap_or(DEFAULT_PORT))?;
        let log_json = read_or(&lookup, ENV_LOG_JSON, file.log_json.unwrap_or(false))?;
        let backend_url = lookup(ENV_BACKEND_URL)
            .or(file.backend_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingBackendUrl)?;

        Ok(Config {
            bind_addr,
            port,
            backend_url: backend_url.trim_end_matches('/').to_string(),
            log_json,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

fn read_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: val }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_backend_is_set() {
        let cfg = Config::load_with(None, lookup_from(&[(ENV_BACKEND_URL, "http://backend:5858/")])).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0");
        assert_eq!(cfg.port, 8123);
        assert_eq!(cfg.backend_url, "http://backend:5858");
        assert!(!cfg.log_json);
        assert_eq!(cfg.socket_addr_string(), "0.0.0.0:8123");
    }

    #[test]
    fn backend_url_is_required() {
        assert!(matches!(
            Config::load_with(None, lookup_from(&[])),
            Err(ConfigError::MissingBackendUrl)
        ));
        assert!(matches!(
            Config::load_with(None, lookup_from(&[(ENV_BACKEND_URL, "  ")])),
            Err(ConfigError::MissingBackendUrl)
        ));
    }

    #[test]
    fn bad_port_is_reported() {
        let err = Config::load_with(None, lookup_from(&[
            (ENV_BACKEND_URL, "http://b"),
            (ENV_PORT, "eighty"),
        ]))
        .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value } => {
                assert_eq!(key, ENV_PORT);
                assert_eq!(value, "eighty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 9000\nbackend_url = \"http://from-file\"\nlog_json = true"
        )
        .unwrap();

        let parsed = read_file(file.path()).unwrap();
        let cfg = Config::resolve(parsed, lookup_from(&[(ENV_PORT, "9100")])).unwrap();
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.backend_url, "http://from-file");
        assert!(cfg.log_json);
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prot = 1").unwrap();
        assert!(matches!(read_file(file.path()), Err(ConfigError::Toml { .. })));
    }
}
