// Configuration loading and parsing (kiosk.toml, credentials.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

/// Keypad letters shown on the kiosk when `kiosk.alphabet` is not set.
pub const DEFAULT_ALPHABET: &str = "АБВГДЕЖЗИЙКЛМНОПРСТУФХЦЧШЩЪЫЬЭЮЯ";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub kiosk: KioskConfig,
    pub export: ExportConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    /// The printer identifier handed to every print job: the explicit
    /// `kiosk.printer_target`, else the last path segment of `kiosk.url`.
    pub fn printer_target(&self) -> Option<String> {
        self.kiosk
            .printer_target
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.kiosk
                    .url
                    .as_deref()
                    .and_then(crate::registration::printer_target_from_url)
            })
    }
}

// ---------------------------------------------------------------------------
// kiosk.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire kiosk.toml file.
#[derive(Debug, Clone, Deserialize)]
struct KioskFile {
    server: ServerConfig,
    polling: PollingConfig,
    #[serde(default)]
    kiosk: KioskConfig,
    #[serde(default)]
    export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Root of the server of record, e.g. `http://10.0.0.2:9998/`.
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KioskConfig {
    /// The kiosk's own access URL, `http://<host>/kiosk/<printer>`.
    #[serde(default)]
    pub url: Option<String>,
    /// Explicit printer identifier; takes precedence over `url`.
    #[serde(default)]
    pub printer_target: Option<String>,
    #[serde(default = "default_alphabet")]
    pub alphabet: String,
}

impl Default for KioskConfig {
    fn default() -> Self {
        KioskConfig {
            url: None,
            printer_target: None,
            alphabet: default_alphabet(),
        }
    }
}

fn default_alphabet() -> String {
    DEFAULT_ALPHABET.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// File stem for CSV exports; `_participants.csv` / `_teams.csv` are appended.
    #[serde(default = "default_export_path")]
    pub path: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            path: default_export_path(),
        }
    }
}

fn default_export_path() -> String {
    "export/checkin".to_string()
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub api_login: Option<String>,
    pub api_password: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/kiosk.toml` and (optionally)
/// `config/credentials.toml`, relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- kiosk.toml (required) ---
    let kiosk_path = config_dir.join("kiosk.toml");
    let kiosk_text = read_file(&kiosk_path)?;
    let kiosk_file: KioskFile =
        toml::from_str(&kiosk_text).map_err(|e| ConfigError::ParseError {
            path: kiosk_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        server: kiosk_file.server,
        polling: kiosk_file.polling,
        kiosk: kiosk_file.kiosk,
        export: kiosk_file.export,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    match Url::parse(&config.server.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => {
            return Err(ConfigError::ValidationError {
                field: "server.base_url".into(),
                message: format!("unsupported scheme `{}`", url.scheme()),
            });
        }
        Err(e) => {
            return Err(ConfigError::ValidationError {
                field: "server.base_url".into(),
                message: e.to_string(),
            });
        }
    }

    let positive: &[(&str, u64)] = &[
        ("server.request_timeout_ms", config.server.request_timeout_ms),
        ("polling.interval_ms", config.polling.interval_ms),
        ("polling.retry_attempts", u64::from(config.polling.retry_attempts)),
    ];
    for (name, val) in positive {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    // A tick's pings, retries included, must finish before the next tick
    // fires. The pause before retry n is n * backoff, and every attempt may
    // run into the request timeout.
    let polling = &config.polling;
    let retries = u64::from(polling.retry_attempts - 1);
    let backoff_total = polling
        .retry_backoff_ms
        .saturating_mul(retries * (retries + 1) / 2);
    if backoff_total >= polling.interval_ms {
        return Err(ConfigError::ValidationError {
            field: "polling.retry_backoff_ms".into(),
            message: format!(
                "{retries} retries with {}ms linear backoff take {backoff_total}ms, \
                 which does not fit in a {}ms interval",
                polling.retry_backoff_ms, polling.interval_ms
            ),
        });
    }

    let worst_tick = config
        .server
        .request_timeout_ms
        .saturating_mul(u64::from(polling.retry_attempts))
        .saturating_add(backoff_total);
    if worst_tick >= polling.interval_ms {
        return Err(ConfigError::ValidationError {
            field: "server.request_timeout_ms".into(),
            message: format!(
                "{} attempts of up to {}ms plus {backoff_total}ms backoff take {worst_tick}ms, \
                 which does not fit in a {}ms interval",
                polling.retry_attempts, config.server.request_timeout_ms, polling.interval_ms
            ),
        });
    }

    if config.kiosk.alphabet.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "kiosk.alphabet".into(),
            message: "must contain at least one letter".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
