//! Parsing of `docker compose ps --format json`.
//!
//! Compose v2 prior to 2.21 prints a single JSON array; later releases print
//! one JSON object per line. Both forms are accepted.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::ComposeError;

#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "State", default)]
    state: String,
}

/// Map each service in `stdout` to whether its container is running.
///
/// A service with several containers counts as running if any one is.
pub fn parse_ps_output(stdout: &str) -> Result<BTreeMap<String, bool>, ComposeError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(BTreeMap::new());
    }

    let entries: Vec<PsEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| ComposeError::Status(e.to_string()))?
    } else {
        trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<PsEntry>(line)
                    .map_err(|e| ComposeError::Status(format!("{e}: {line}")))
            })
            .collect::<Result<_, _>>()?
    };

    let mut status = BTreeMap::new();
    for entry in entries {
        let running = entry.state.eq_ignore_ascii_case("running");
        let slot = status.entry(entry.service).or_insert(false);
        *slot |= running;
    }
    Ok(status)
}

/// Fill in declared services missing from `observed` as not running.
pub fn with_declared(
    mut observed: BTreeMap<String, bool>,
    declared: &[String],
) -> BTreeMap<String, bool> {
    for name in declared {
        observed.entry(name.clone()).or_insert(false);
    }
    observed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("running", true)]
    #[case("RUNNING", true)]
    #[case("exited", false)]
    #[case("restarting", false)]
    #[case("paused", false)]
    #[case("", false)]
    fn only_the_running_state_counts_as_up(#[case] state: &str, #[case] up: bool) {
        let line = format!(r#"{{"Service":"jellyfin","State":"{state}"}}"#);
        assert_eq!(parse_ps_output(&line).unwrap().get("jellyfin"), Some(&up));
    }

    #[test]
    fn parses_json_lines_form() {
        let out = r#"{"Service":"jellyfin","State":"running","Name":"jellyfin"}
{"Service":"caddy","State":"exited","Name":"caddy"}
"#;
        let status = parse_ps_output(out).unwrap();
        assert_eq!(status.get("jellyfin"), Some(&true));
        assert_eq!(status.get("caddy"), Some(&false));
    }

    #[test]
    fn parses_array_form() {
        let out = r#"[{"Service":"xteve","State":"running"},{"Service":"caddy","State":"restarting"}]"#;
        let status = parse_ps_output(out).unwrap();
        assert_eq!(status.get("xteve"), Some(&true));
        assert_eq!(status.get("caddy"), Some(&false));
    }

    #[test]
    fn empty_output_is_empty_map() {
        assert!(parse_ps_output("  \n").unwrap().is_empty());
    }

    #[test]
    fn any_running_replica_counts() {
        let out = r#"{"Service":"caddy","State":"exited"}
{"Service":"caddy","State":"running"}"#;
        assert_eq!(parse_ps_output(out).unwrap().get("caddy"), Some(&true));
    }

    #[test]
    fn garbage_is_a_status_error() {
        let err = parse_ps_output("NAME  IMAGE  STATUS").unwrap_err();
        assert!(matches!(err, ComposeError::Status(_)));
    }

    #[test]
    fn declared_but_absent_services_are_down() {
        let observed = BTreeMap::from([("caddy".to_string(), true)]);
        let merged = with_declared(observed, &["caddy".into(), "xteve".into()]);
        assert_eq!(merged.get("caddy"), Some(&true));
        assert_eq!(merged.get("xteve"), Some(&false));
    }
}
