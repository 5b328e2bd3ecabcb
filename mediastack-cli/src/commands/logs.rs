//! `mediastack logs`: recent log lines for one service.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use mediastack_compose::{ControlPlane, DockerCompose};
use mediastack_core::StackConfig;
use mediastack_health::probes::count_error_lines;

/// Arguments for `mediastack logs`.
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Service name as declared in the config.
    pub service: String,

    /// Number of trailing lines to show.
    #[arg(long, short = 'n', default_value_t = 50)]
    pub lines: usize,
}

impl LogsArgs {
    pub fn run(self, config: &StackConfig) -> Result<i32> {
        if !config.services.iter().any(|s| s.name == self.service) {
            bail!(
                "unknown service '{}' (configured: {})",
                self.service,
                config.service_names().join(", ")
            );
        }

        let plane = DockerCompose::from_config(config);
        let lines = plane
            .recent_logs(&self.service, self.lines)
            .with_context(|| format!("failed to read logs for {}", self.service))?;

        for line in &lines {
            if is_error_line(line, &config.log_scan.tokens) {
                println!("{}", line.red());
            } else {
                println!("{line}");
            }
        }
        Ok(0)
    }
}

/// Matches exactly the lines the log health check counts.
fn is_error_line(line: &str, tokens: &[String]) -> bool {
    count_error_lines(std::slice::from_ref(&line.to_string()), tokens) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_tokens_match_case_insensitively() {
        let tokens = vec!["error".to_string(), "fatal".to_string()];
        assert!(is_error_line("2024 ERROR transcoder died", &tokens));
        assert!(is_error_line("Fatal: bind failed", &tokens));
        assert!(!is_error_line("serving on :8096", &tokens));
    }

    #[test]
    fn highlighting_agrees_with_the_log_health_check() {
        let tokens = vec!["error".to_string(), "exception".to_string()];
        let lines: Vec<String> = [
            "ERROR: db locked",
            "Unhandled Exception in handler",
            "ready",
            "ÉRROR accented is not ascii-folded",
        ]
        .iter()
        .map(|l| l.to_string())
        .collect();

        let highlighted = lines.iter().filter(|l| is_error_line(l, &tokens)).count();
        assert_eq!(highlighted, count_error_lines(&lines, &tokens));
    }
}
