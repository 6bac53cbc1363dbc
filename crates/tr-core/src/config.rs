//! Configuration management
//!
//! Settings are resolved in this order of precedence:
//! 1. Environment variables
//! 2. `topic-relay.toml` (or the file passed with `--config`)
//! 3. Default values
//!
//! `${VAR_NAME}` inside the TOML file is expanded from the environment.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "topic-relay.toml";

/// Generation provider type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Google Generative Language API
    #[default]
    Gemini,
    /// OpenAI-compatible chat completions API
    OpenAi,
}

impl LlmProvider {
    /// Parse a provider name as written in config or env
    pub fn parse(name: &str) -> crate::Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!("Unknown LLM provider: {}", other))),
        }
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-pro",
            Self::OpenAi => "gpt-4o-mini",
        }
    }

    /// Base URL used when none is configured
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

/// Session storage backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Process-local map, lost on restart
    #[default]
    Memory,
    /// SQLite file
    Sqlite,
}

impl SessionBackend {
    pub fn parse(name: &str) -> crate::Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::Config(format!("Unknown session backend: {}", other))),
        }
    }
}

/// Topic domain the assistant is restricted to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Human-readable domain label, e.g. "Python programming help"
    #[serde(default = "default_domain_label")]
    pub label: String,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            label: default_domain_label(),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API provider
    #[serde(default)]
    pub provider: LlmProvider,

    /// API key (absent means the relay runs unconfigured)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model to use (provider default if unset)
    pub model: Option<String>,

    /// Base URL (optional, for custom endpoints)
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: None,
            model: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// The API key, if one is set and not blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Effective model name
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Effective base URL, without trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. If unset, CORS is permissive.
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: None,
        }
    }
}

/// Session storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackend,

    /// Path to SQLite database file (sqlite backend only)
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Name of the cookie carrying the session id
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            db_path: default_db_path(),
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_domain_label() -> String {
    "Python programming help".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_db_path() -> String {
    "data/topic-relay.db".to_string()
}

fn default_cookie_name() -> String {
    "topic_relay_session".to_string()
}

/// Main configuration for topic-relay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub domain: DomainConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Expand `${VAR_NAME}` references using `lookup`.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_vars(value: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
        let mut result = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Some(env_value) = lookup(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut cfg = Self::from_toml_str_with(&toml_content, &env_lookup)?;
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Parse TOML content, expanding `${VAR}` with `lookup`
    pub fn from_toml_str_with(
        content: &str,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> crate::Result<Self> {
        let raw: toml::Value = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        let toml = Self::expand_string_values(raw, lookup)
            .try_into::<TomlConfig>()
            .map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        Self::from_toml_config(toml)
    }

    /// Expand `${VAR}` inside parsed string values only, so substituted text
    /// can never alter the TOML structure.
    fn expand_string_values(value: toml::Value, lookup: &impl Fn(&str) -> Option<String>) -> toml::Value {
        match value {
            toml::Value::String(s) => toml::Value::String(Self::expand_vars(&s, lookup)),
            toml::Value::Array(arr) => toml::Value::Array(
                arr.into_iter()
                    .map(|v| Self::expand_string_values(v, lookup))
                    .collect(),
            ),
            toml::Value::Table(table) => toml::Value::Table(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::expand_string_values(v, lookup)))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Load configuration from the default locations.
    ///
    /// An explicit `path` must exist. Otherwise `./topic-relay.toml` is used
    /// when present, falling back to environment variables and defaults.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = path {
            return Self::from_toml_file(path);
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Build from the parsed TOML structure
    fn from_toml_config(toml: TomlConfig) -> crate::Result<Self> {
        let domain = toml.domain.unwrap_or_default();
        let domain_config = DomainConfig {
            label: domain.label.unwrap_or_else(default_domain_label),
        };

        let llm = toml.llm.unwrap_or_default();
        let provider = match llm.provider {
            Some(name) => LlmProvider::parse(&name)?,
            None => LlmProvider::default(),
        };
        let llm_config = LlmConfig {
            provider,
            api_key: llm.api_key,
            model: llm.model,
            base_url: llm.base_url,
            timeout_secs: llm.timeout_secs.unwrap_or_else(default_timeout_secs),
        };

        let server = toml.server.unwrap_or_default();
        let server_config = ServerConfig {
            host: server.host.unwrap_or_else(default_host),
            port: server.port.unwrap_or_else(default_port),
            allowed_origins: server.allowed_origins,
        };

        let session = toml.session.unwrap_or_default();
        let backend = match session.backend {
            Some(name) => SessionBackend::parse(&name)?,
            None => SessionBackend::default(),
        };
        let session_config = SessionConfig {
            backend,
            db_path: session.db_path.unwrap_or_else(default_db_path),
            cookie_name: session.cookie_name.unwrap_or_else(default_cookie_name),
        };

        Ok(Config {
            domain: domain_config,
            llm: llm_config,
            server: server_config,
            session: session_config,
        })
    }

    /// Override settings from process environment variables
    pub fn apply_env_overrides(&mut self) -> crate::Result<()> {
        self.apply_overrides(&env_lookup)
    }

    /// Override settings from `lookup`; blank values are ignored
    pub fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> crate::Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(label) = get("RELAY_DOMAIN") {
            self.domain.label = label;
        }

        if let Some(provider) = get("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::parse(&provider)?;
        }
        // LLM_API_KEY wins over GOOGLE_API_KEY when both are set
        if let Some(key) = get("GOOGLE_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(key) = get("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = get("LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(base_url) = get("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(timeout) = get("LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = timeout
                .parse()
                .map_err(|_| Error::Config(format!("Invalid LLM_TIMEOUT_SECS: {}", timeout)))?;
        }

        if let Some(host) = get("RELAY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("RELAY_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid RELAY_PORT: {}", port)))?;
        }
        if let Some(origins) = get("RELAY_ALLOWED_ORIGINS") {
            self.server.allowed_origins = Some(
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        if let Some(backend) = get("SESSION_BACKEND") {
            self.session.backend = SessionBackend::parse(&backend)?;
        }
        if let Some(path) = get("SESSION_DB_PATH") {
            self.session.db_path = path;
        }
        if let Some(name) = get("SESSION_COOKIE_NAME") {
            self.session.cookie_name = name;
        }

        Ok(())
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ============================================================================
// TOML file structure
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    domain: Option<TomlDomainConfig>,
    llm: Option<TomlLlmConfig>,
    server: Option<TomlServerConfig>,
    session: Option<TomlSessionConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDomainConfig {
    label: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLlmConfig {
    /// "gemini" or "openai"
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlServerConfig {
    host: Option<String>,
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlSessionConfig {
    /// "memory" or "sqlite"
    backend: Option<String>,
    db_path: Option<String>,
    cookie_name: Option<String>,
}
