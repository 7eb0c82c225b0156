use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_RECIPIENT_EMAIL: &str = "samuel.shulman@example.com";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub knowledge: KnowledgeConfig,
    pub contact: ContactConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub summary_model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_tool_rounds: u32,
}

#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    pub dir: PathBuf,
    pub summary_file: String,
    pub resume_file: String,
    pub linkedin_file: String,
    pub subject_name: String,
}

#[derive(Clone, Debug)]
pub struct ContactConfig {
    pub recipient_email: String,
    pub direct_contact_email: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub sender_address: Option<SecretString>,
    pub sender_password: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub knowledge_dir: Option<PathBuf>,
    pub recipient_email: Option<String>,
    pub log_level: Option<String>,
    pub server_port: Option<u16>,
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
            llm: LlmConfig {
                api_key: None,
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                model: "gemini-2.0-flash".to_string(),
                summary_model: "gemini-2.0-flash".to_string(),
                temperature: 0.7,
                timeout_secs: 60,
                max_tool_rounds: 4,
            },
            knowledge: KnowledgeConfig {
                dir: PathBuf::from("me"),
                summary_file: "summary.md".to_string(),
                resume_file: "resume.pdf".to_string(),
                linkedin_file: "linkedin.pdf".to_string(),
                subject_name: "Samuel".to_string(),
            },
            contact: ContactConfig {
                recipient_email: DEFAULT_RECIPIENT_EMAIL.to_string(),
                direct_contact_email: DEFAULT_RECIPIENT_EMAIL.to_string(),
                smtp_host: "smtp.gmail.com".to_string(),
                smtp_port: 587,
                sender_address: None,
                sender_password: None,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 7860,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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

impl KnowledgeConfig {
    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(&self.summary_file)
    }

    pub fn resume_path(&self) -> PathBuf {
        self.dir.join(&self.resume_file)
    }

    pub fn linkedin_path(&self) -> PathBuf {
        self.dir.join(&self.linkedin_file)
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("twin.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(summary_model) = llm.summary_model {
                self.llm.summary_model = summary_model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_tool_rounds) = llm.max_tool_rounds {
                self.llm.max_tool_rounds = max_tool_rounds;
            }
        }

        if let Some(knowledge) = patch.knowledge {
            if let Some(dir) = knowledge.dir {
                self.knowledge.dir = dir;
            }
            if let Some(summary_file) = knowledge.summary_file {
                self.knowledge.summary_file = summary_file;
            }
            if let Some(resume_file) = knowledge.resume_file {
                self.knowledge.resume_file = resume_file;
            }
            if let Some(linkedin_file) = knowledge.linkedin_file {
                self.knowledge.linkedin_file = linkedin_file;
            }
            if let Some(subject_name) = knowledge.subject_name {
                self.knowledge.subject_name = subject_name;
            }
        }

        if let Some(contact) = patch.contact {
            if let Some(recipient_email) = contact.recipient_email.and_then(non_blank) {
                self.contact.recipient_email = recipient_email;
            }
            if let Some(direct_contact_email) = contact.direct_contact_email.and_then(non_blank) {
                self.contact.direct_contact_email = direct_contact_email;
            }
            if let Some(smtp_host) = contact.smtp_host {
                self.contact.smtp_host = smtp_host;
            }
            if let Some(smtp_port) = contact.smtp_port {
                self.contact.smtp_port = smtp_port;
            }
            if let Some(sender_address_value) = contact.sender_address {
                self.contact.sender_address = Some(secret_value(sender_address_value));
            }
            if let Some(sender_password_value) = contact.sender_password {
                self.contact.sender_password = Some(secret_value(sender_password_value));
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        let api_key = read_env("TWIN_LLM_API_KEY").or_else(|| read_env("GOOGLE_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TWIN_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("TWIN_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("TWIN_LLM_SUMMARY_MODEL") {
            self.llm.summary_model = value;
        }
        if let Some(value) = read_env("TWIN_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("TWIN_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("TWIN_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("TWIN_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TWIN_LLM_MAX_TOOL_ROUNDS") {
            self.llm.max_tool_rounds = parse_u32("TWIN_LLM_MAX_TOOL_ROUNDS", &value)?;
        }

        if let Some(value) = read_env("TWIN_KNOWLEDGE_DIR") {
            self.knowledge.dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("TWIN_KNOWLEDGE_SUBJECT_NAME") {
            self.knowledge.subject_name = value;
        }

        let recipient =
            read_env("TWIN_CONTACT_RECIPIENT_EMAIL").or_else(|| read_env("RECIPIENT_EMAIL"));
        if let Some(value) = recipient {
            self.contact.recipient_email = value;
        }
        if let Some(value) = read_env("TWIN_CONTACT_DIRECT_EMAIL") {
            self.contact.direct_contact_email = value;
        }
        if let Some(value) = read_env("TWIN_CONTACT_SMTP_HOST") {
            self.contact.smtp_host = value;
        }
        if let Some(value) = read_env("TWIN_CONTACT_SMTP_PORT") {
            self.contact.smtp_port = parse_u16("TWIN_CONTACT_SMTP_PORT", &value)?;
        }
        let sender_address =
            read_env("TWIN_CONTACT_SENDER_ADDRESS").or_else(|| read_env("EMAIL_ADDRESS"));
        if let Some(value) = sender_address {
            self.contact.sender_address = Some(secret_value(value));
        }
        let sender_password =
            read_env("TWIN_CONTACT_SENDER_PASSWORD").or_else(|| read_env("EMAIL_PASSWORD"));
        if let Some(value) = sender_password {
            self.contact.sender_password = Some(secret_value(value));
        }

        if let Some(value) = read_env("TWIN_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TWIN_SERVER_PORT") {
            self.server.port = parse_u16("TWIN_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("TWIN_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("TWIN_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("TWIN_LOGGING_LEVEL").or_else(|| read_env("TWIN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("TWIN_LOGGING_FORMAT").or_else(|| read_env("TWIN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(knowledge_dir) = overrides.knowledge_dir {
            self.knowledge.dir = knowledge_dir;
        }
        if let Some(recipient_email) = overrides.recipient_email.and_then(non_blank) {
            self.contact.recipient_email = recipient_email;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_knowledge(&self.knowledge)?;
        validate_contact(&self.contact)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

impl ContactConfig {
    /// Sender address and password, if both are configured and non-blank.
    /// Shared by SMTP delivery and the readiness check.
    pub fn sender_credentials(&self) -> Option<(&str, &str)> {
        let address = self.sender_address.as_ref()?.expose_secret().trim();
        let password = self.sender_password.as_ref()?.expose_secret();
        if address.is_empty() || password.trim().is_empty() {
            return None;
        }
        Some((address, password))
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("twin.toml"), PathBuf::from("config/twin.toml")]
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

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    let missing =
        llm.api_key.as_ref().map(|value| value.expose_secret().trim().is_empty()).unwrap_or(true);
    if missing {
        return Err(ConfigError::Validation(
            "llm.api_key is required (set TWIN_LLM_API_KEY or GOOGLE_API_KEY)".to_string(),
        ));
    }

    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() || llm.summary_model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.model and llm.summary_model must not be empty".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_tool_rounds == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tool_rounds must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_knowledge(knowledge: &KnowledgeConfig) -> Result<(), ConfigError> {
    if knowledge.subject_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "knowledge.subject_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_contact(contact: &ContactConfig) -> Result<(), ConfigError> {
    if !contact.recipient_email.contains('@') {
        return Err(ConfigError::Validation(
            "contact.recipient_email must be an email address".to_string(),
        ));
    }
    if !contact.direct_contact_email.contains('@') {
        return Err(ConfigError::Validation(
            "contact.direct_contact_email must be an email address".to_string(),
        ));
    }
    if contact.smtp_host.trim().is_empty() || contact.smtp_port == 0 {
        return Err(ConfigError::Validation(
            "contact.smtp_host and contact.smtp_port must be set".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
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
    env::var(key).ok().and_then(non_blank)
}

/// Blank address settings mean "unset" so the default recipient applies.
fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    knowledge: Option<KnowledgePatch>,
    contact: Option<ContactPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    summary_model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    max_tool_rounds: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgePatch {
    dir: Option<PathBuf>,
    summary_file: Option<String>,
    resume_file: Option<String>,
    linkedin_file: Option<String>,
    subject_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContactPatch {
    recipient_email: Option<String>,
    direct_contact_email: Option<String>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    sender_address: Option<String>,
    sender_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
