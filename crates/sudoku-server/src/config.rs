//! Server configuration. A key-colon-value text file with `#` comments:
//! split each line on the first `:`, trim the value, dispatch on the key.

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Padrao,
    Debug,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub listen_backlog: u32,
    pub max_puzzles: usize,
    pub min_buffer: usize,
    pub client_timeout: Duration,
    pub lobby_capacity: usize,
    pub aggregation_window: Duration,
    pub puzzles_path: String,
    /// Accepted for grammar compatibility but not consumed: the puzzle
    /// loader reads only `JOGOS`, a combined `id,givens,solution` CSV.
    /// `SOLUCOES` is parsed so a config file that sets it does not fail
    /// validation, nothing more.
    pub solutions_path: Option<String>,
    pub log_path: String,
    pub mode: Mode,
    pub log_retention_days: Option<u32>,
    pub clear_logs_on_shutdown: Option<bool>,
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

        let port: u16 = parse_required(&raw, "PORTA")?;
        if port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PORTA",
                value: port.to_string(),
            });
        }

        let listen_backlog: u32 = parse_required(&raw, "MAX_FILA")?;
        let max_puzzles: usize = parse_required(&raw, "MAX_JOGOS")?;

        let min_buffer: usize = parse_required(&raw, "MAXLINE")?;
        if min_buffer < 256 {
            return Err(ConfigError::InvalidValue {
                key: "MAXLINE",
                value: min_buffer.to_string(),
            });
        }

        let timeout_secs: u64 = parse_required(&raw, "TIMEOUT_CLIENTE")?;
        let client_timeout = Duration::from_secs(timeout_secs);

        let lobby_capacity: usize = parse_required(&raw, "MAX_CLIENTES_JOGO")?;
        if lobby_capacity <= 1 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_CLIENTES_JOGO",
                value: lobby_capacity.to_string(),
            });
        }

        let window_secs: u64 = parse_required(&raw, "TEMPO_AGREGACAO")?;
        if window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TEMPO_AGREGACAO",
                value: window_secs.to_string(),
            });
        }
        let aggregation_window = Duration::from_secs(window_secs);

        let puzzles_path = raw
            .get("JOGOS")
            .cloned()
            .ok_or(ConfigError::MissingKey("JOGOS"))?;
        let solutions_path = raw.get("SOLUCOES").cloned();
        let log_path = raw
            .get("LOG")
            .cloned()
            .ok_or(ConfigError::MissingKey("LOG"))?;

        let mode_str = raw.get("MODO").cloned().ok_or(ConfigError::MissingKey("MODO"))?;
        let mode = match mode_str.as_str() {
            "PADRAO" => Mode::Padrao,
            "DEBUG" => Mode::Debug,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "MODO",
                    value: other.to_string(),
                })
            }
        };

        let log_retention_days = match mode {
            Mode::Padrao => Some(parse_required(&raw, "DIAS_RETENCAO_LOGS")?),
            Mode::Debug => None,
        };
        let clear_logs_on_shutdown = match mode {
            Mode::Debug => {
                let v: u8 = parse_required(&raw, "LIMPAR_LOGS_ENCERRAMENTO")?;
                Some(v != 0)
            }
            Mode::Padrao => None,
        };

        Ok(Config {
            port,
            listen_backlog,
            max_puzzles,
            min_buffer,
            client_timeout,
            lobby_capacity,
            aggregation_window,
            puzzles_path,
            solutions_path,
            log_path,
            mode,
            log_retention_days,
            clear_logs_on_shutdown,
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
