use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;
use sfmcp_core::config::AppConfig;
use sfmcp_crm::SalesforceOrg;

use crate::commands::load_config;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
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
    checked_at: DateTime<Utc>,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match load_config() {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_credential(&config));
            checks.push(check_salesforce_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["llm_credential", "salesforce_connectivity"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    // Skipped checks are informational; only failures fail the report.
    let any_fail = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_fail { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_fail {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checked_at: Utc::now(), checks }
}

fn check_llm_credential(config: &AppConfig) -> DoctorCheck {
    let present = config
        .llm
        .api_key
        .as_ref()
        .map(|key| !key.expose_secret().trim().is_empty())
        .unwrap_or(false);

    if present {
        DoctorCheck {
            name: "llm_credential",
            status: CheckStatus::Pass,
            details: format!(
                "api key present for `{}` via {}",
                config.llm.model, config.llm.base_url
            ),
        }
    } else {
        DoctorCheck {
            name: "llm_credential",
            status: CheckStatus::Fail,
            details: "no model api key configured (SFMCP_LLM_API_KEY or OPENROUTER_API_KEY)"
                .to_string(),
        }
    }
}

fn check_salesforce_connectivity(config: &AppConfig) -> DoctorCheck {
    if !config.salesforce.has_login_credentials() {
        return DoctorCheck {
            name: "salesforce_connectivity",
            status: CheckStatus::Skipped,
            details: "no Salesforce credentials configured; live-only operations stay hidden"
                .to_string(),
        };
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "salesforce_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let org = SalesforceOrg::new(config.salesforce.clone());
    match runtime.block_on(org.connect()) {
        Ok(()) => DoctorCheck {
            name: "salesforce_connectivity",
            status: CheckStatus::Pass,
            details: format!(
                "session established against `{}`",
                org.instance_url().unwrap_or_else(|| config.salesforce.login_url.clone())
            ),
        },
        Err(error) => DoctorCheck {
            name: "salesforce_connectivity",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
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
