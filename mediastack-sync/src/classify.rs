//! Change classification: which changed paths require what of the stack.
//!
//! The mapping is a rule table rather than branching so that new patterns
//! only add rows. Classification is a pure function of the change set.

use std::path::{Component, Path};

use mediastack_core::{ChangeSet, RestartDecision, StackConfig};

/// What a matching path implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Restart,
    ReinstallDependencies,
}

/// A repository-relative path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Exactly this file.
    Exact(String),
    /// Anything below this directory.
    Under(String),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        let path = normalize(path);
        match self {
            PathPattern::Exact(p) => path == *p,
            PathPattern::Under(dir) => {
                path.len() > dir.len() && path.starts_with(dir.as_str()) && path[dir.len()..].starts_with('/')
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: PathPattern,
    pub effect: Effect,
}

impl Rule {
    pub fn new(pattern: PathPattern, effect: Effect) -> Self {
        Self { pattern, effect }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierRules {
    pub rules: Vec<Rule>,
}

impl ClassifierRules {
    /// Compose file, env file and scripts dir restart; the dependency
    /// manifest reinstalls. Paths outside the repository are ignored.
    pub fn from_config(config: &StackConfig) -> Self {
        let mut rules = Vec::new();
        let mut add = |path: &Path, under: bool, effect: Effect| {
            if let Some(rel) = repo_relative(config, path) {
                let pattern = if under {
                    PathPattern::Under(rel)
                } else {
                    PathPattern::Exact(rel)
                };
                rules.push(Rule::new(pattern, effect));
            }
        };
        add(&config.compose_file, false, Effect::Restart);
        add(&config.env_file, false, Effect::Restart);
        add(&config.scripts_dir, true, Effect::Restart);
        add(&config.dependency_manifest, false, Effect::ReinstallDependencies);
        Self { rules }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Map a change set to the actions it requires.
pub fn classify(changes: &ChangeSet, rules: &ClassifierRules) -> RestartDecision {
    let mut decision = RestartDecision::default();
    for path in changes {
        for rule in &rules.rules {
            if rule.pattern.matches(path) {
                match rule.effect {
                    Effect::Restart => decision.restart = true,
                    Effect::ReinstallDependencies => decision.reinstall_dependencies = true,
                }
            }
        }
    }
    decision
}

/// `/`-separated, no leading `./`, no trailing `/`.
fn normalize(path: &str) -> String {
    let mut out = path.trim().replace('\\', "/");
    while let Some(rest) = out.strip_prefix("./") {
        out = rest.to_string();
    }
    out.trim_end_matches('/').to_string()
}

fn repo_relative(config: &StackConfig, path: &Path) -> Option<String> {
    let rel = if path.is_absolute() {
        path.strip_prefix(&config.repo_dir).ok()?
    } else {
        path
    };
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changes(paths: &[&str]) -> ChangeSet {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn default_rules() -> ClassifierRules {
        ClassifierRules::from_config(&StackConfig::rooted_at("/srv/stack"))
    }

    #[test]
    fn compose_change_restarts() {
        let d = classify(&changes(&["docker-compose.yml"]), &default_rules());
        assert_eq!(
            d,
            RestartDecision {
                restart: true,
                reinstall_dependencies: false
            }
        );
    }

    #[test]
    fn env_and_scripts_restart() {
        assert!(classify(&changes(&[".env"]), &default_rules()).restart);
        assert!(classify(&changes(&["scripts/health-check.sh"]), &default_rules()).restart);
        assert!(classify(&changes(&["scripts/nested/x.sh"]), &default_rules()).restart);
    }

    #[test]
    fn playlist_change_does_not_restart() {
        let d = classify(&changes(&["xteve_config/playlist.m3u"]), &default_rules());
        assert_eq!(d, RestartDecision::default());
    }

    #[test]
    fn lookalike_paths_do_not_match() {
        let d = classify(
            &changes(&["scripts.md", "docs/docker-compose.yml", "old.env", "scriptsx/a.sh"]),
            &default_rules(),
        );
        assert!(!d.restart);
    }

    #[test]
    fn manifest_change_reinstalls_only() {
        let d = classify(&changes(&["requirements.txt"]), &default_rules());
        assert!(d.reinstall_dependencies);
        assert!(!d.restart);
    }

    #[test]
    fn mixed_changes_set_both_flags() {
        let d = classify(
            &changes(&["README.md", "requirements.txt", "scripts/update.sh"]),
            &default_rules(),
        );
        assert!(d.restart && d.reinstall_dependencies);
    }

    #[test]
    fn empty_change_set_needs_nothing() {
        assert_eq!(classify(&ChangeSet::new(), &default_rules()), RestartDecision::default());
    }

    #[test]
    fn configured_paths_are_normalized() {
        let mut config = StackConfig::rooted_at("/srv/stack");
        config.compose_file = "./deploy/compose.yaml".into();
        config.scripts_dir = "/srv/stack/ops/".into();
        config.env_file = "/etc/mediastack.env".into();
        let rules = ClassifierRules::from_config(&config);

        assert!(classify(&changes(&["deploy/compose.yaml"]), &rules).restart);
        assert!(classify(&changes(&["ops/run.sh"]), &rules).restart);
        assert!(!classify(&changes(&["etc/mediastack.env"]), &rules).restart);
        assert_eq!(rules.rules.len(), 3, "env file outside the repo has no rule");
    }

    #[test]
    fn extra_rules_extend_the_table() {
        let rules = default_rules().with_rule(Rule::new(
            PathPattern::Under("caddy".into()),
            Effect::Restart,
        ));
        assert!(classify(&changes(&["caddy/Caddyfile"]), &rules).restart);
    }

    #[test]
    fn restart_iff_a_path_hits_a_restart_pattern() {
        let restart_paths = ["docker-compose.yml", ".env", "scripts/a.sh"];
        let other_paths = ["README.md", "xteve_config/playlist.m3u", "requirements.txt", "docs/a.md"];
        let rules = default_rules();

        for extra in &restart_paths {
            for base in &other_paths {
                let set = changes(&[base, extra]);
                assert!(classify(&set, &rules).restart, "{set:?}");
            }
        }
        for base in &other_paths {
            assert!(!classify(&changes(&[base]), &rules).restart, "{base}");
        }
    }
}
