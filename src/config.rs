use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::repo::RepoRef;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Environment variables that override the ownership policy.
pub const ENV_ALLOWED_OWNERS: &str = "FORKGUARD_ALLOWED_OWNERS";
pub const ENV_ALLOWED_REPOS: &str = "FORKGUARD_ALLOWED_REPOS";
pub const ENV_GITHUB_HOSTS: &str = "FORKGUARD_GITHUB_HOSTS";

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub policy: PolicySection,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub gh: GhConfig,
    #[serde(default)]
    pub advisory: AdvisoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct PolicySection {
    #[serde(default)]
    pub allowed_owners: Vec<String>,
    #[serde(default)]
    pub allowed_repos: Vec<String>,
    #[serde(default)]
    pub github_hosts: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct GitConfig {
    #[serde(default)]
    pub timeout_ms: u64,
}

/// `gh <resource> <action>` pairs treated as writes (cross product).
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct GhConfig {
    #[serde(default)]
    pub write_resources: Vec<String>,
    #[serde(default)]
    pub write_actions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct AdvisoryConfig {
    #[serde(default)]
    pub protected_branches: Vec<String>,
    #[serde(default)]
    pub idle_min_secs: u64,
    #[serde(default)]
    pub idle_max_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: String,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    policy: PolicyOverlay,
    #[serde(default)]
    git: GitOverlay,
    #[serde(default)]
    gh: GhOverlay,
    #[serde(default)]
    advisory: AdvisoryOverlay,
    #[serde(default)]
    logging: LoggingOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct PolicyOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    allowed_owners: Vec<String>,
    #[serde(default)]
    allowed_repos: Vec<String>,
    #[serde(default)]
    github_hosts: Vec<String>,
    #[serde(default)]
    remove_allowed_owners: Vec<String>,
    #[serde(default)]
    remove_allowed_repos: Vec<String>,
    #[serde(default)]
    remove_github_hosts: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct GitOverlay {
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct GhOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    write_resources: Vec<String>,
    #[serde(default)]
    write_actions: Vec<String>,
    #[serde(default)]
    remove_write_resources: Vec<String>,
    #[serde(default)]
    remove_write_actions: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AdvisoryOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    protected_branches: Vec<String>,
    #[serde(default)]
    remove_protected_branches: Vec<String>,
    idle_min_secs: Option<u64>,
    idle_max_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingOverlay {
    level: Option<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

/// Split an environment list on commas and whitespace, dropping empties
/// and duplicates while keeping order.
fn parse_env_list(value: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in value.split(|c: char| c == ',' || c.is_whitespace()) {
        if !item.is_empty() && !out.iter().any(|o| o == item) {
            out.push(item.to_string());
        }
    }
    out
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/cc-forkguard/config.toml (if exists)
    /// 3. Apply `FORKGUARD_*` environment overrides (lists replace)
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay() {
            config.apply_overlay(overlay);
        }
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Try to load user overlay from ~/.config/cc-forkguard/config.toml.
    fn load_overlay() -> Option<ConfigOverlay> {
        let home = std::env::var_os("HOME")?;
        let path = std::path::Path::new(&home).join(".config/cc-forkguard/config.toml");
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                eprintln!("cc-forkguard: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let p = overlay.policy;
        merge_list(
            &mut self.policy.allowed_owners,
            p.allowed_owners,
            &p.remove_allowed_owners,
            p.replace,
        );
        merge_list(
            &mut self.policy.allowed_repos,
            p.allowed_repos,
            &p.remove_allowed_repos,
            p.replace,
        );
        merge_list(
            &mut self.policy.github_hosts,
            p.github_hosts,
            &p.remove_github_hosts,
            p.replace,
        );

        if let Some(v) = overlay.git.timeout_ms {
            self.git.timeout_ms = v;
        }

        let gh = overlay.gh;
        merge_list(
            &mut self.gh.write_resources,
            gh.write_resources,
            &gh.remove_write_resources,
            gh.replace,
        );
        merge_list(
            &mut self.gh.write_actions,
            gh.write_actions,
            &gh.remove_write_actions,
            gh.replace,
        );

        let a = overlay.advisory;
        merge_list(
            &mut self.advisory.protected_branches,
            a.protected_branches,
            &a.remove_protected_branches,
            a.replace,
        );
        if let Some(v) = a.idle_min_secs {
            self.advisory.idle_min_secs = v;
        }
        if let Some(v) = a.idle_max_secs {
            self.advisory.idle_max_secs = v;
        }

        if let Some(v) = overlay.logging.level {
            self.logging.level = v;
        }
    }

    /// Apply environment overrides. Set variables replace the configured
    /// list outright, so an empty value clears it.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(ENV_ALLOWED_OWNERS) {
            self.policy.allowed_owners = parse_env_list(&v);
        }
        if let Some(v) = lookup(ENV_ALLOWED_REPOS) {
            self.policy.allowed_repos = parse_env_list(&v);
        }
        if let Some(v) = lookup(ENV_GITHUB_HOSTS) {
            self.policy.github_hosts = parse_env_list(&v);
        }
    }

    /// Timeout for each git metadata query.
    pub fn git_timeout(&self) -> Duration {
        Duration::from_millis(self.git.timeout_ms.max(1))
    }

    /// Build the immutable policy threaded through every evaluation.
    pub fn policy(&self) -> PolicyConfig {
        let allowed_repos = self
            .policy
            .allowed_repos
            .iter()
            .filter_map(|entry| {
                let parsed = RepoRef::parse(entry);
                if parsed.is_none() {
                    log::warn!("ignoring malformed allowed_repos entry: {entry}");
                }
                parsed
            })
            .collect();
        PolicyConfig {
            allowed_owners: self.policy.allowed_owners.clone(),
            allowed_repos,
            github_hosts: self.policy.github_hosts.clone(),
        }
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

/// Ownership policy, read-only for the duration of an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyConfig {
    /// GitHub users/orgs whose repositories may be written. Order matters:
    /// the first entry is the default owner for `gh repo create NAME`.
    pub allowed_owners: Vec<String>,
    /// Explicit `owner/repo` overrides, checked before owners.
    pub allowed_repos: Vec<RepoRef>,
    /// Extra hosts treated as GitHub.
    pub github_hosts: Vec<String>,
}

impl PolicyConfig {
    pub fn new(owners: &[&str]) -> Self {
        Self {
            allowed_owners: owners.iter().map(|s| s.to_string()).collect(),
            allowed_repos: Vec::new(),
            github_hosts: vec!["github.com".into()],
        }
    }

    pub fn with_repos(mut self, repos: &[&str]) -> Self {
        self.allowed_repos = repos.iter().filter_map(|r| RepoRef::parse(r)).collect();
        self
    }

    pub fn with_hosts(mut self, hosts: &[&str]) -> Self {
        self.github_hosts = hosts.iter().map(|s| s.to_string()).collect();
        self
    }

    /// No owners configured: writes fail closed.
    pub fn is_unconfigured(&self) -> bool {
        self.allowed_owners.is_empty()
    }

    /// Default owner for bare repository names.
    pub fn default_owner(&self) -> Option<&str> {
        self.allowed_owners.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_parses() {
        let config = Config::default_config();
        assert!(config.policy.allowed_owners.is_empty());
        assert_eq!(config.policy.github_hosts, vec!["github.com"]);
        assert!(config.git.timeout_ms > 0);
        assert!(config.gh.write_resources.contains(&"pr".to_string()));
        assert!(config.gh.write_actions.contains(&"merge".to_string()));
        assert_eq!(config.advisory.idle_min_secs, 300);
        assert_eq!(config.advisory.idle_max_secs, 28800);
    }

    #[test]
    fn default_policy_is_unconfigured() {
        assert!(Config::default_config().policy().is_unconfigured());
    }

    #[test]
    fn overlay_extends_owners() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [policy]
            allowed_owners = ["me", "my-org"]
            allowed_repos = ["them/blessed"]
        "#,
        );
        let policy = config.policy();
        assert_eq!(policy.allowed_owners, vec!["me", "my-org"]);
        assert_eq!(policy.default_owner(), Some("me"));
        assert_eq!(policy.allowed_repos, vec![RepoRef::new("them", "blessed")]);
        assert_eq!(policy.github_hosts, vec!["github.com"]);
    }

    #[test]
    fn overlay_removes_write_action() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [gh]
            remove_write_actions = ["comment"]
        "#,
        );
        assert!(!config.gh.write_actions.contains(&"comment".to_string()));
        assert!(config.gh.write_actions.contains(&"create".to_string()));
    }

    #[test]
    fn overlay_replace_hosts() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [policy]
            replace = true
            github_hosts = ["ghe.example.com"]
        "#,
        );
        assert_eq!(config.policy.github_hosts, vec!["ghe.example.com"]);
    }

    #[test]
    fn overlay_scalars() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [git]
            timeout_ms = 750

            [advisory]
            idle_min_secs = 60

            [logging]
            level = "debug"
        "#,
        );
        assert_eq!(config.git_timeout(), Duration::from_millis(750));
        assert_eq!(config.advisory.idle_min_secs, 60);
        assert_eq!(config.advisory.idle_max_secs, 28800);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn overlay_no_duplicates() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [advisory]
            protected_branches = ["main", "trunk"]
        "#,
        );
        assert_eq!(config.advisory.protected_branches, vec!["main", "master", "trunk"]);
    }

    #[test]
    fn env_overrides_replace_lists() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [policy]
            allowed_owners = ["file-owner"]
        "#,
        );
        config.apply_env(env(&[
            (ENV_ALLOWED_OWNERS, "me, my-org  me"),
            (ENV_ALLOWED_REPOS, "them/blessed,bogus"),
        ]));
        let policy = config.policy();
        assert_eq!(policy.allowed_owners, vec!["me", "my-org"]);
        assert_eq!(policy.allowed_repos, vec![RepoRef::new("them", "blessed")]);
    }

    #[test]
    fn empty_env_clears_owners() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [policy]
            allowed_owners = ["me"]
        "#,
        );
        config.apply_env(env(&[(ENV_ALLOWED_OWNERS, "")]));
        assert!(config.policy().is_unconfigured());
    }

    #[test]
    fn unset_env_changes_nothing() {
        let mut config = Config::default_config();
        config.apply_env(env(&[]));
        assert_eq!(config.policy(), Config::default_config().policy());
    }

    #[test]
    fn empty_overlay_changes_nothing() {
        let mut config = Config::default_config();
        config.apply_overlay_str("");
        assert_eq!(config.policy(), Config::default_config().policy());
        assert_eq!(config.gh.write_actions, Config::default_config().gh.write_actions);
    }
}
