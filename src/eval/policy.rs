//! Ownership policy: may this repository be written to?

use crate::config::PolicyConfig;
use crate::repo::RepoRef;

/// The allow-list entry that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowRule {
    ExplicitRepo,
    Owner,
    ForkParent,
}

impl AllowRule {
    pub fn describe(self) -> &'static str {
        match self {
            AllowRule::ExplicitRepo => "listed in allowed repos",
            AllowRule::Owner => "owner is allowed",
            AllowRule::ForkParent => "explicitly targets this fork's upstream",
        }
    }
}

/// Check `repo` against the policy in order: explicit repos, owners, then
/// the fork-parent exception. Matching ignores ASCII case.
pub fn allow_rule(
    repo: &RepoRef,
    policy: &PolicyConfig,
    fork_parent: Option<&RepoRef>,
) -> Option<AllowRule> {
    if policy.allowed_repos.iter().any(|r| r.matches(repo)) {
        return Some(AllowRule::ExplicitRepo);
    }
    if policy
        .allowed_owners
        .iter()
        .any(|o| o.eq_ignore_ascii_case(&repo.owner))
    {
        return Some(AllowRule::Owner);
    }
    if fork_parent.is_some_and(|parent| parent.matches(repo)) {
        return Some(AllowRule::ForkParent);
    }
    None
}

pub fn is_allowed(repo: &RepoRef, policy: &PolicyConfig, fork_parent: Option<&RepoRef>) -> bool {
    allow_rule(repo, policy, fork_parent).is_some()
}

/// Human-readable summary of the configured allow-lists.
pub fn describe_policy(policy: &PolicyConfig) -> String {
    let owners = if policy.allowed_owners.is_empty() {
        "(none)".to_string()
    } else {
        policy.allowed_owners.join(", ")
    };
    if policy.allowed_repos.is_empty() {
        format!("allowed owners: {owners}")
    } else {
        let repos: Vec<String> = policy.allowed_repos.iter().map(ToString::to_string).collect();
        format!("allowed owners: {owners}; allowed repos: {}", repos.join(", "))
    }
}
