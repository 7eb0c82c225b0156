use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use toml::Value;
use twin_core::config::{AppConfig, LoadOptions};

struct FieldSources {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let path = detect_config_path();
    let sources = FieldSources { doc: load_config_file_doc(path.as_deref()), path };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: &str, env_keys: &[&str]| {
        lines.push(render_line(key, value, sources.field_source(key, env_keys)));
    };

    let api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    push("llm.api_key", api_key, &["TWIN_LLM_API_KEY", "GOOGLE_API_KEY"]);
    push("llm.base_url", &config.llm.base_url, &["TWIN_LLM_BASE_URL"]);
    push("llm.model", &config.llm.model, &["TWIN_LLM_MODEL"]);
    push("llm.summary_model", &config.llm.summary_model, &["TWIN_LLM_SUMMARY_MODEL"]);
    push("llm.temperature", &config.llm.temperature.to_string(), &["TWIN_LLM_TEMPERATURE"]);
    push("llm.timeout_secs", &config.llm.timeout_secs.to_string(), &["TWIN_LLM_TIMEOUT_SECS"]);
    push(
        "llm.max_tool_rounds",
        &config.llm.max_tool_rounds.to_string(),
        &["TWIN_LLM_MAX_TOOL_ROUNDS"],
    );

    push("knowledge.dir", &config.knowledge.dir.display().to_string(), &["TWIN_KNOWLEDGE_DIR"]);
    push("knowledge.summary_file", &config.knowledge.summary_file, &[]);
    push("knowledge.resume_file", &config.knowledge.resume_file, &[]);
    push("knowledge.linkedin_file", &config.knowledge.linkedin_file, &[]);
    push(
        "knowledge.subject_name",
        &config.knowledge.subject_name,
        &["TWIN_KNOWLEDGE_SUBJECT_NAME"],
    );

    push(
        "contact.recipient_email",
        &config.contact.recipient_email,
        &["TWIN_CONTACT_RECIPIENT_EMAIL", "RECIPIENT_EMAIL"],
    );
    push(
        "contact.direct_contact_email",
        &config.contact.direct_contact_email,
        &["TWIN_CONTACT_DIRECT_EMAIL"],
    );
    push("contact.smtp_host", &config.contact.smtp_host, &["TWIN_CONTACT_SMTP_HOST"]);
    push("contact.smtp_port", &config.contact.smtp_port.to_string(), &["TWIN_CONTACT_SMTP_PORT"]);
    push(
        "contact.sender_address",
        &redact_address(config.contact.sender_address.as_ref()),
        &["TWIN_CONTACT_SENDER_ADDRESS", "EMAIL_ADDRESS"],
    );
    let password = if config.contact.sender_password.is_some() { "<redacted>" } else { "<unset>" };
    push(
        "contact.sender_password",
        password,
        &["TWIN_CONTACT_SENDER_PASSWORD", "EMAIL_PASSWORD"],
    );

    push("server.bind_address", &config.server.bind_address, &["TWIN_SERVER_BIND_ADDRESS"]);
    push("server.port", &config.server.port.to_string(), &["TWIN_SERVER_PORT"]);
    push(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        &["TWIN_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    );

    push("logging.level", &config.logging.level, &["TWIN_LOGGING_LEVEL", "TWIN_LOG_LEVEL"]);
    push(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["TWIN_LOGGING_FORMAT", "TWIN_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("twin.toml"), PathBuf::from("config/twin.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

impl FieldSources {
    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_address(address: Option<&SecretString>) -> String {
    let Some(address) = address else {
        return "<unset>".to_string();
    };
    let trimmed = address.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "<redacted>".to_string(),
    }
}
