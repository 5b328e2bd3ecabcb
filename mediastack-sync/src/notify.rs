//! Best-effort webhook notifications.
//!
//! A notification is a single JSON POST `{"content": "<message>"}`. The
//! message is rendered from a tera template; a broken template falls back
//! to a plain summary so operators still hear about the deploy.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::error::SyncError;
use crate::report::SyncReport;

/// Discord rejects longer `content` fields.
pub const MAX_CONTENT_CHARS: usize = 2000;

pub const DEFAULT_TEMPLATE: &str = "\
{% if fatal %}:x:{% elif healthy %}:white_check_mark:{% else %}:warning:{% endif %} \
mediastack {{ status }}: {{ from }} -> {{ to }}
restart: {% if restart %}yes{% else %}no{% endif %}\
{% if health %}, health: {{ health }}{% endif %}
{% for problem in problems %}- {{ problem }}
{% endfor %}{% for step in failures %}- {{ step }}
{% endfor %}";

pub trait Notify {
    fn send(&self, message: &str) -> Result<(), SyncError>;
}

/// POSTs to a webhook URL with ureq.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl Notify for WebhookNotifier {
    fn send(&self, message: &str) -> Result<(), SyncError> {
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        agent
            .post(&self.url)
            .send_json(json!({ "content": truncate(message) }))
            .map_err(|e| SyncError::Notify(e.to_string()))?;
        Ok(())
    }
}

/// Discards every message; used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

impl Notify for Disabled {
    fn send(&self, _message: &str) -> Result<(), SyncError> {
        tracing::debug!("no webhook configured, notification dropped");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MessageContext<'a> {
    status: &'a str,
    from: String,
    to: String,
    restart: bool,
    fatal: bool,
    healthy: bool,
    health: Option<String>,
    problems: Vec<String>,
    failures: Vec<String>,
}

fn context(report: &SyncReport) -> MessageContext<'_> {
    let short = |rev: &Option<mediastack_core::Revision>| {
        rev.as_ref()
            .map(|r| r.short().to_string())
            .unwrap_or_else(|| "none".to_string())
    };
    MessageContext {
        status: report.status_label(),
        from: short(&report.local),
        to: short(&report.remote),
        restart: report.decision.restart,
        fatal: report.has_fatal(),
        healthy: report.health.as_ref().map_or(true, |h| h.passed()),
        health: report
            .health
            .as_ref()
            .map(|h| if h.passed() { "pass".to_string() } else { "issues".to_string() }),
        problems: report
            .health
            .iter()
            .flat_map(|h| h.problems())
            .map(|p| format!("{} [{}]: {}", p.name, p.verdict, p.detail))
            .collect(),
        failures: report
            .steps
            .iter()
            .filter_map(|s| s.outcome.detail().map(|d| format!("{}: {d}", s.step)))
            .collect(),
    }
}

/// Render the notification for `report` with `template` (or the default).
pub fn render_message(report: &SyncReport, template: Option<&str>) -> String {
    let ctx = context(report);
    let rendered = tera::Context::from_serialize(&ctx).and_then(|c| {
        tera::Tera::one_off(template.unwrap_or(DEFAULT_TEMPLATE), &c, false)
    });
    match rendered {
        Ok(text) => text.trim_end().to_string(),
        Err(e) => {
            tracing::warn!("notification template failed, using plain message: {e}");
            plain_message(&ctx)
        }
    }
}

fn plain_message(ctx: &MessageContext<'_>) -> String {
    let mut out = format!(
        "mediastack {}: {} -> {} (restart: {})",
        ctx.status,
        ctx.from,
        ctx.to,
        if ctx.restart { "yes" } else { "no" }
    );
    for line in ctx.problems.iter().chain(&ctx.failures) {
        out.push_str("\n- ");
        out.push_str(line);
    }
    out
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_CONTENT_CHARS {
        return message.to_string();
    }
    let mut out: String = message.chars().take(MAX_CONTENT_CHARS - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediastack_core::{HealthReport, ProbeResult, Revision, RestartDecision, StepOutcome};

    use crate::report::Step;

    fn report() -> SyncReport {
        let mut r = SyncReport::begin(false);
        r.local = Some(Revision::from("1111111111"));
        r.remote = Some(Revision::from("2222222222"));
        r.decision = RestartDecision {
            restart: true,
            reinstall_dependencies: false,
        };
        r
    }

    #[test]
    fn default_template_summarizes_a_healthy_deploy() {
        let mut r = report();
        r.health = Some(HealthReport::new(vec![ProbeResult::pass("daemon", "active")]));

        let msg = render_message(&r, None);

        assert!(msg.starts_with(":white_check_mark:"), "{msg}");
        assert!(msg.contains("11111111 -> 22222222"), "{msg}");
        assert!(msg.contains("restart: yes, health: pass"), "{msg}");
    }

    #[test]
    fn failing_probes_and_steps_are_listed() {
        let mut r = report();
        r.health = Some(HealthReport::new(vec![
            ProbeResult::pass("daemon", "active"),
            ProbeResult::fail("disk", "0.5 GB free on /srv"),
        ]));
        r.record(Step::StartServices, StepOutcome::Fatal("xteve did not start".into()));

        let msg = render_message(&r, None);

        assert!(msg.starts_with(":x:"), "{msg}");
        assert!(msg.contains("- disk [fail]: 0.5 GB free on /srv"), "{msg}");
        assert!(msg.contains("- start: xteve did not start"), "{msg}");
    }

    #[test]
    fn custom_template_is_used() {
        let msg = render_message(&report(), Some("deployed {{ to }}"));
        assert_eq!(msg, "deployed 22222222");
    }

    #[test]
    fn broken_template_falls_back_to_plain_text() {
        let msg = render_message(&report(), Some("{% if %}"));
        assert!(msg.starts_with("mediastack "), "{msg}");
        assert!(msg.contains("(restart: yes)"), "{msg}");
    }

    #[test]
    fn long_messages_are_truncated() {
        let long = "x".repeat(MAX_CONTENT_CHARS + 50);
        let out = truncate(&long);
        assert_eq!(out.chars().count(), MAX_CONTENT_CHARS);
        assert!(out.ends_with("..."));
        assert_eq!(truncate("short"), "short");
    }
}
