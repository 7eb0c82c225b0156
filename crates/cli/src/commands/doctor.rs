use serde::Serialize;
use twin_core::config::{AppConfig, LoadOptions};
use twin_core::knowledge::{probe_document, DocumentKind};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.extend(check_knowledge(&config));
            checks.push(check_mail_credentials(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["knowledge_context", "mail_credentials"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let overall_status = if checks.iter().any(|check| check.status == CheckStatus::Fail) {
        CheckStatus::Fail
    } else if checks.iter().any(|check| check.status == CheckStatus::Warn) {
        CheckStatus::Warn
    } else {
        CheckStatus::Pass
    };
    let summary = match overall_status {
        CheckStatus::Pass => "doctor: all readiness checks passed",
        CheckStatus::Warn => "doctor: ready with warnings",
        _ => "doctor: one or more readiness checks failed",
    }
    .to_string();

    DoctorReport { overall_status, summary, checks }
}

/// One check per document plus an aggregate; only the aggregate can fail.
fn check_knowledge(config: &AppConfig) -> Vec<DoctorCheck> {
    let knowledge = &config.knowledge;
    let documents = [
        ("knowledge_about", DocumentKind::About, knowledge.summary_path()),
        ("knowledge_resume", DocumentKind::Resume, knowledge.resume_path()),
        ("knowledge_linkedin", DocumentKind::LinkedIn, knowledge.linkedin_path()),
    ];

    let mut checks = Vec::new();
    let mut readable = 0;
    for (name, kind, path) in documents {
        let check = match probe_document(kind, &path) {
            Ok(characters) => {
                readable += 1;
                DoctorCheck {
                    name,
                    status: CheckStatus::Pass,
                    details: format!("{characters} characters from `{}`", path.display()),
                }
            }
            Err(reason) => DoctorCheck { name, status: CheckStatus::Warn, details: reason },
        };
        checks.push(check);
    }

    checks.push(if readable > 0 {
        DoctorCheck {
            name: "knowledge_context",
            status: CheckStatus::Pass,
            details: format!("{readable} of 3 documents readable"),
        }
    } else {
        DoctorCheck {
            name: "knowledge_context",
            status: CheckStatus::Fail,
            details: format!("no readable documents in `{}`", knowledge.dir.display()),
        }
    });

    checks
}

fn check_mail_credentials(config: &AppConfig) -> DoctorCheck {
    match config.contact.sender_credentials() {
        Some(_) => DoctorCheck {
            name: "mail_credentials",
            status: CheckStatus::Pass,
            details: format!(
                "sender configured for {}:{}",
                config.contact.smtp_host, config.contact.smtp_port
            ),
        },
        None => DoctorCheck {
            name: "mail_credentials",
            status: CheckStatus::Warn,
            details: format!(
                "sender address/password unset; contact requests will point visitors to {}",
                config.contact.direct_contact_email
            ),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
