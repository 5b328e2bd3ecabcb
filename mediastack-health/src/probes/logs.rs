use mediastack_compose::ControlPlane;
use mediastack_core::config::LogScanConfig;
use mediastack_core::{ProbeResult, Verdict};

use crate::Probe;

/// Density of error-looking lines in a service's recent log window.
pub struct LogErrorProbe<'a> {
    service: String,
    scan: LogScanConfig,
    plane: &'a dyn ControlPlane,
}

impl<'a> LogErrorProbe<'a> {
    pub fn new(service: impl Into<String>, scan: LogScanConfig, plane: &'a dyn ControlPlane) -> Self {
        Self {
            service: service.into(),
            scan,
            plane,
        }
    }
}

/// Lines containing any token, compared case-insensitively.
pub fn count_error_lines(lines: &[String], tokens: &[String]) -> usize {
    let tokens: Vec<String> = tokens.iter().map(|t| t.to_ascii_lowercase()).collect();
    lines
        .iter()
        .filter(|line| {
            let line = line.to_ascii_lowercase();
            tokens.iter().any(|t| line.contains(t.as_str()))
        })
        .count()
}

impl Probe for LogErrorProbe<'_> {
    fn name(&self) -> String {
        format!("logs:{}", self.service)
    }

    fn run(&self) -> ProbeResult {
        let lines = match self.plane.recent_logs(&self.service, self.scan.lines) {
            Ok(lines) => lines,
            Err(err) => return ProbeResult::warn(self.name(), format!("logs unavailable: {err}")),
        };
        let errors = count_error_lines(&lines, &self.scan.tokens);
        let verdict = if errors >= self.scan.fail_at {
            Verdict::Fail
        } else if errors >= self.scan.warn_at && errors > 0 {
            Verdict::Warn
        } else {
            Verdict::Pass
        };
        ProbeResult::new(
            self.name(),
            verdict,
            format!("{errors} error line(s) in last {}", lines.len()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediastack_compose::fakes::FakeControlPlane;
    use rstest::rstest;

    fn lines(n_errors: usize) -> Vec<String> {
        let mut out: Vec<String> = (0..10).map(|i| format!("INFO request {i} ok")).collect();
        out.extend((0..n_errors).map(|i| format!("[ERROR] upstream {i} refused")));
        out
    }

    #[test]
    fn tokens_match_case_insensitively() {
        let tokens = LogScanConfig::default().tokens;
        let sample = vec![
            "Fatal: cannot bind".to_string(),
            "all good".to_string(),
            "Unhandled Exception in handler".to_string(),
        ];
        assert_eq!(count_error_lines(&sample, &tokens), 2);
    }

    #[rstest]
    #[case(0, Verdict::Pass)]
    #[case(1, Verdict::Warn)]
    #[case(4, Verdict::Warn)]
    #[case(5, Verdict::Fail)]
    #[case(12, Verdict::Fail)]
    fn error_density_thresholds(#[case] n_errors: usize, #[case] expected: Verdict) {
        let sample = lines(n_errors);
        let refs: Vec<&str> = sample.iter().map(String::as_str).collect();
        let plane = FakeControlPlane::new(&["jellyfin"]).with_logs("jellyfin", &refs);
        let mut scan = LogScanConfig::default();
        scan.lines = 100;
        let result = LogErrorProbe::new("jellyfin", scan, &plane).run();
        assert_eq!(result.verdict, expected, "{}", result.detail);
    }

    #[test]
    fn only_recent_window_is_scanned() {
        let mut sample: Vec<String> = (0..6).map(|i| format!("error {i}")).collect();
        sample.extend((0..50).map(|i| format!("fine {i}")));
        let refs: Vec<&str> = sample.iter().map(String::as_str).collect();
        let plane = FakeControlPlane::new(&["caddy"]).with_logs("caddy", &refs);
        let result = LogErrorProbe::new("caddy", LogScanConfig::default(), &plane).run();
        assert_eq!(result.verdict, Verdict::Pass);
    }
}
