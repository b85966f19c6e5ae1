// krishi_config/src/lib.rs

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is missing; set it in the environment or in .env")]
    MissingCredential,
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Settings for the hosted model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Everything the binaries read from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub gemini: GeminiSettings,
    pub host: IpAddr,
    pub port: u16,
    /// Reply language used when a request does not name one.
    pub default_language: String,
    /// Echo dependency error detail to callers. Local development only.
    pub echo_errors: bool,
    /// Optional JSON file replacing the built-in price table.
    pub knowledge_path: Option<PathBuf>,
    /// Optional JSON file replacing the built-in prompt rules.
    pub rules_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to
    /// its value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = get("GEMINI_API_KEY").ok_or(ConfigError::MissingCredential)?;

        let host = match get("HOST") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "HOST",
                value,
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = match get("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let echo_errors = match get("KRISHI_ECHO_ERRORS") {
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: "KRISHI_ECHO_ERRORS",
                value,
            })?,
            None => false,
        };
        if echo_errors {
            warn!("[Config] KRISHI_ECHO_ERRORS is on; dependency errors will be shown to callers.");
        }

        let config = Self {
            gemini: GeminiSettings {
                api_key,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            },
            host,
            port,
            default_language: get("KRISHI_DEFAULT_LANG")
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            echo_errors,
            knowledge_path: get("KRISHI_KNOWLEDGE_PATH").map(PathBuf::from),
            rules_path: get("KRISHI_RULES_PATH").map(PathBuf::from),
        };
        debug!(
            "[Config] model={} port={} default_language={}",
            config.gemini.model, config.port, config.default_language
        );
        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Loads `.env.local` then `.env` from the working directory. Missing files
/// are fine; variables already in the environment win.
pub fn load_env_files() {
    for file in [".env.local", ".env"] {
        match dotenvy::from_filename(file) {
            Ok(path) => debug!("[Config] Loaded {}", path.display()),
            Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!("[Config] Unable to load {}: {}", file, err),
        }
    }
}
