/// Final answer handed back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Decision {
    Allow,
    Block,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Block => "block",
        }
    }
}

/// Which branch of the evaluation produced a decision.
///
/// `NotApplicable` (fail-open on hosts we can't verify) and `Unconfigured`
/// (fail-closed without a policy) are separate outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No guarded verb anywhere in the command.
    NotRelevant,
    /// The verb appears, but only in read-only invocations.
    ReadOnly,
    /// Account-scoped operation (gists) outside ownership checks.
    Exempt,
    /// Target host isn't GitHub-shaped; nothing to verify against.
    NotApplicable,
    /// Target resolved and permitted by the policy.
    Allowed,
    /// Loop or batch that can't be resolved to one target.
    TooComplex,
    /// No allowed owners configured.
    Unconfigured,
    /// Target repository could not be determined.
    Unresolvable,
    /// Fork with an `upstream` remote and no explicit target.
    ForkAmbiguous,
    /// Target resolved but not permitted by the policy.
    Denied,
}

impl Outcome {
    pub fn decision(self) -> Decision {
        match self {
            Outcome::NotRelevant
            | Outcome::ReadOnly
            | Outcome::Exempt
            | Outcome::NotApplicable
            | Outcome::Allowed => Decision::Allow,
            Outcome::TooComplex
            | Outcome::Unconfigured
            | Outcome::Unresolvable
            | Outcome::ForkAmbiguous
            | Outcome::Denied => Decision::Block,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::NotRelevant => "not-relevant",
            Outcome::ReadOnly => "read-only",
            Outcome::Exempt => "exempt",
            Outcome::NotApplicable => "not-applicable",
            Outcome::Allowed => "allowed",
            Outcome::TooComplex => "too-complex",
            Outcome::Unconfigured => "unconfigured",
            Outcome::Unresolvable => "unresolvable",
            Outcome::ForkAmbiguous => "fork-ambiguous",
            Outcome::Denied => "denied",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub decision: Decision,
    pub outcome: Outcome,
    pub reason: String,
}

impl RuleMatch {
    pub fn new(outcome: Outcome, reason: impl Into<String>) -> Self {
        Self {
            decision: outcome.decision(),
            outcome,
            reason: reason.into(),
        }
    }
}
