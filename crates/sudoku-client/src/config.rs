//! Client configuration. Same key-colon-value grammar as the server's
//! config file: split each line on the first `:`, trim the value,
//! dispatch on the key.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("missing required key {0}")]
    MissingKey(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_ip: String,
    pub server_port: u16,
    /// Defaults to this process's id when `ID_CLIENTE` is absent or
    /// negative.
    pub client_id: i32,
    pub server_timeout: Duration,
    pub log_path: Option<String>,
    /// Worker cap for the solver's fan-out, clamped to `1..=9` by the
    /// solver itself.
    pub max_workers: usize,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw = parse_key_colon_value(text);

        let server_ip = raw
            .get("IP_SERVIDOR")
            .cloned()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingKey("IP_SERVIDOR"))?;

        let server_port: u16 = parse_required(&raw, "PORTA")?;
        if server_port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PORTA",
                value: server_port.to_string(),
            });
        }

        let client_id = match raw.get("ID_CLIENTE") {
            Some(v) => v.parse::<i32>().map_err(|_| ConfigError::InvalidValue {
                key: "ID_CLIENTE",
                value: v.clone(),
            })?,
            None => std::process::id() as i32,
        };

        let timeout_secs: u64 = parse_required(&raw, "TIMEOUT_SERVIDOR")?;
        let server_timeout = Duration::from_secs(timeout_secs);

        let log_path = raw.get("LOG").cloned();

        let max_workers: usize = match raw.get("MAX_THREADS") {
            Some(v) => v.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                key: "MAX_THREADS",
                value: v.clone(),
            })?,
            None => 9,
        };
        if max_workers == 0 || max_workers > 9 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_THREADS",
                value: max_workers.to_string(),
            });
        }

        Ok(Config {
            server_ip,
            server_port,
            client_id,
            server_timeout,
            log_path,
            max_workers,
        })
    }
}

fn parse_key_colon_value(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    map
}

fn parse_required<T: std::str::FromStr>(
    raw: &HashMap<String, String>,
    key: &'static str,
) -> Result<T, ConfigError> {
    let value = raw.get(key).ok_or(ConfigError::MissingKey(key))?;
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
# client config
IP_SERVIDOR: 127.0.0.1
PORTA: 9000
ID_CLIENTE: 42
TIMEOUT_SERVIDOR: 10
LOG: cliente.log
MAX_THREADS: 4
"#;

    #[test]
    fn parses_a_well_formed_config() {
        let cfg = Config::parse(BASE).unwrap();
        assert_eq!(cfg.server_ip, "127.0.0.1");
        assert_eq!(cfg.server_port, 9000);
        assert_eq!(cfg.client_id, 42);
        assert_eq!(cfg.server_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_workers, 4);
    }

    #[test]
    fn defaults_client_id_to_process_id_when_absent() {
        let text = BASE.replace("ID_CLIENTE: 42\n", "");
        let cfg = Config::parse(&text).unwrap();
        assert_eq!(cfg.client_id, std::process::id() as i32);
    }

    #[test]
    fn defaults_max_workers_when_absent() {
        let text = BASE.replace("MAX_THREADS: 4\n", "");
        let cfg = Config::parse(&text).unwrap();
        assert_eq!(cfg.max_workers, 9);
    }

    #[test]
    fn rejects_max_workers_out_of_range() {
        let text = BASE.replace("MAX_THREADS: 4", "MAX_THREADS: 10");
        assert!(matches!(
            Config::parse(&text),
            Err(ConfigError::InvalidValue { key: "MAX_THREADS", .. })
        ));
    }

    #[test]
    fn rejects_missing_server_ip() {
        let text = BASE.replace("IP_SERVIDOR: 127.0.0.1\n", "");
        assert!(matches!(
            Config::parse(&text),
            Err(ConfigError::MissingKey("IP_SERVIDOR"))
        ));
    }

    #[test]
    fn rejects_missing_port() {
        let text = BASE.replace("PORTA: 9000\n", "");
        assert!(matches!(Config::parse(&text), Err(ConfigError::MissingKey("PORTA"))));
    }
}
