use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tempfile::TempDir;
use twin_cli::commands::{ask, config, doctor};

#[test]
fn config_reports_validation_failure_without_model_key() {
    with_env(&[], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed"));
        assert!(output.contains("llm.api_key is required"));
    });
}

#[test]
fn config_attributes_alias_sources_and_redacts_secrets() {
    with_env(
        &[
            ("GOOGLE_API_KEY", "very-secret-key"),
            ("EMAIL_ADDRESS", "bot@example.com"),
            ("TWIN_SERVER_PORT", "8080"),
        ],
        || {
            let output = config::run();

            assert!(output.contains("- llm.api_key = <redacted> (source: env (GOOGLE_API_KEY))"));
            assert!(output.contains("- contact.sender_address = b***@example.com"));
            assert!(output.contains("- server.port = 8080 (source: env (TWIN_SERVER_PORT))"));
            assert!(output.contains("- llm.model = gemini-2.0-flash (source: default)"));
            assert!(!output.contains("very-secret-key"));
        },
    );
}

#[test]
fn doctor_fails_and_skips_dependent_checks_when_config_invalid() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["name"], "config_validation");
        assert_eq!(payload["checks"][1]["status"], "skipped");
    });
}

#[test]
fn doctor_warns_when_only_some_documents_and_no_mail_credentials() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("summary.md"), "Builds compilers.").expect("write summary");
    let knowledge_dir = dir.path().display().to_string();

    with_env(&[("TWIN_LLM_API_KEY", "test-key"), ("TWIN_KNOWLEDGE_DIR", &knowledge_dir)], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "warn");
        assert_eq!(check(&payload, "knowledge_about")["status"], "pass");
        assert_eq!(check(&payload, "knowledge_resume")["status"], "warn");
        assert_eq!(check(&payload, "knowledge_context")["status"], "pass");
        assert_eq!(check(&payload, "mail_credentials")["status"], "warn");
    });
}

#[test]
fn doctor_fails_when_no_document_is_readable() {
    let dir = TempDir::new().expect("tempdir");
    let knowledge_dir = dir.path().display().to_string();

    with_env(
        &[
            ("TWIN_LLM_API_KEY", "test-key"),
            ("TWIN_KNOWLEDGE_DIR", &knowledge_dir),
            ("EMAIL_ADDRESS", "bot@example.com"),
            ("EMAIL_PASSWORD", "app-password"),
        ],
        || {
            let result = doctor::run(false);
            assert_eq!(result.exit_code, 1);
            assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
            assert!(result.output.contains("- [fail] knowledge_context"));
            assert!(result.output.contains("- [ok] mail_credentials"));
        },
    );
}

#[test]
fn ask_rejects_blank_message() {
    with_env(&[], || {
        let result = ask::run("   ");
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn ask_returns_config_failure_without_model_key() {
    with_env(&[], || {
        let result = ask::run("What are your skills?");
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn ask_fails_fast_when_knowledge_is_missing() {
    let dir = TempDir::new().expect("tempdir");
    let knowledge_dir = dir.path().display().to_string();

    with_env(&[("TWIN_LLM_API_KEY", "test-key"), ("TWIN_KNOWLEDGE_DIR", &knowledge_dir)], || {
        let result = ask::run("What are your skills?");
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "agent_bootstrap");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("failed to load any context documents"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn check<'a>(payload: &'a Value, name: &str) -> &'a Value {
    payload["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .expect("check should be present")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TWIN_LLM_API_KEY",
        "GOOGLE_API_KEY",
        "TWIN_LLM_BASE_URL",
        "TWIN_LLM_MODEL",
        "TWIN_LLM_SUMMARY_MODEL",
        "TWIN_LLM_TEMPERATURE",
        "TWIN_LLM_TIMEOUT_SECS",
        "TWIN_LLM_MAX_TOOL_ROUNDS",
        "TWIN_KNOWLEDGE_DIR",
        "TWIN_KNOWLEDGE_SUBJECT_NAME",
        "TWIN_CONTACT_RECIPIENT_EMAIL",
        "RECIPIENT_EMAIL",
        "TWIN_CONTACT_DIRECT_EMAIL",
        "TWIN_CONTACT_SMTP_HOST",
        "TWIN_CONTACT_SMTP_PORT",
        "TWIN_CONTACT_SENDER_ADDRESS",
        "TWIN_CONTACT_SENDER_PASSWORD",
        "EMAIL_ADDRESS",
        "EMAIL_PASSWORD",
        "TWIN_SERVER_BIND_ADDRESS",
        "TWIN_SERVER_PORT",
        "TWIN_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "TWIN_LOGGING_LEVEL",
        "TWIN_LOGGING_FORMAT",
        "TWIN_LOG_LEVEL",
        "TWIN_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
