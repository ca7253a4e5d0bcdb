use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub agent: AgentConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Relational datastore settings. Without a `url` the application runs on
/// the in-memory stores.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub max_iterations: u32,
    pub max_history: usize,
    pub recommendation_count: usize,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub seed_demo_data: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
    Offline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub server_port: Option<u16>,
    pub seed_demo_data: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig { url: None, max_connections: 5, timeout_secs: 30 },
            llm: LlmConfig {
                provider: LlmProvider::Gemini,
                api_key: None,
                base_url: None,
                model: "gemini-2.0-flash".to_string(),
                timeout_secs: 30,
                temperature: 0.7,
                max_tokens: 2048,
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 8000 },
            agent: AgentConfig { max_iterations: 10, max_history: 10, recommendation_count: 5 },
            store: StoreConfig { seed_demo_data: true },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "offline" => Ok(Self::Offline),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|openai|ollama|offline)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmProvider {
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("https://generativelanguage.googleapis.com"),
            Self::OpenAi => Some("https://api.openai.com"),
            Self::Ollama => Some("http://localhost:11434"),
            Self::Offline => None,
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("shopwise.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Base URL for the configured provider, falling back to the provider's
    /// public endpoint.
    pub fn llm_base_url(&self) -> Option<String> {
        self.llm
            .base_url
            .clone()
            .or_else(|| self.llm.provider.default_base_url().map(str::to_string))
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = Some(url);
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(max_iterations) = agent.max_iterations {
                self.agent.max_iterations = max_iterations;
            }
            if let Some(max_history) = agent.max_history {
                self.agent.max_history = max_history;
            }
            if let Some(recommendation_count) = agent.recommendation_count {
                self.agent.recommendation_count = recommendation_count;
            }
        }

        if let Some(store) = patch.store {
            if let Some(seed_demo_data) = store.seed_demo_data {
                self.store.seed_demo_data = seed_demo_data;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SHOPWISE_DATABASE_URL") {
            self.database.url = Some(value);
        }
        if let Some(value) = read_env("SHOPWISE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SHOPWISE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SHOPWISE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SHOPWISE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SHOPWISE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("SHOPWISE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SHOPWISE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SHOPWISE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SHOPWISE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SHOPWISE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SHOPWISE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("SHOPWISE_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("SHOPWISE_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("SHOPWISE_LLM_MAX_TOKENS", &value)?;
        }

        if let Some(value) = read_env("SHOPWISE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SHOPWISE_SERVER_PORT") {
            self.server.port = parse_u16("SHOPWISE_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("SHOPWISE_AGENT_MAX_ITERATIONS") {
            self.agent.max_iterations = parse_u32("SHOPWISE_AGENT_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = read_env("SHOPWISE_AGENT_MAX_HISTORY") {
            self.agent.max_history = parse_usize("SHOPWISE_AGENT_MAX_HISTORY", &value)?;
        }
        if let Some(value) = read_env("SHOPWISE_AGENT_RECOMMENDATION_COUNT") {
            self.agent.recommendation_count =
                parse_usize("SHOPWISE_AGENT_RECOMMENDATION_COUNT", &value)?;
        }

        if let Some(value) = read_env("SHOPWISE_STORE_SEED_DEMO_DATA") {
            self.store.seed_demo_data = parse_bool("SHOPWISE_STORE_SEED_DEMO_DATA", &value)?;
        }

        let log_level =
            read_env("SHOPWISE_LOGGING_LEVEL").or_else(|| read_env("SHOPWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHOPWISE_LOGGING_FORMAT").or_else(|| read_env("SHOPWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = Some(database_url);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(seed_demo_data) = overrides.seed_demo_data {
            self.store.seed_demo_data = seed_demo_data;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_agent(&self.agent)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("shopwise.toml"), PathBuf::from("config/shopwise.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    if let Some(url) = &database.url {
        let url = url.trim();
        let sqlite_url =
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
        if !sqlite_url {
            return Err(ConfigError::Validation(
                "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`); leave it unset to use in-memory storage"
                    .to_string(),
            ));
        }
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::Gemini | LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for gemini/openai providers (set SHOPWISE_LLM_API_KEY or use provider `offline`)"
                        .to_string(),
                ));
            }
        }
        LlmProvider::Ollama | LlmProvider::Offline => {}
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.max_iterations == 0 {
        return Err(ConfigError::Validation(
            "agent.max_iterations must be greater than zero".to_string(),
        ));
    }

    if agent.recommendation_count == 0 || agent.recommendation_count > 20 {
        return Err(ConfigError::Validation(
            "agent.recommendation_count must be in range 1..=20".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    agent: Option<AgentPatch>,
    store: Option<StorePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    max_iterations: Option<u32>,
    max_history: Option<usize>,
    recommendation_count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    seed_demo_data: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
