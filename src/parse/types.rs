//! Types produced by the shell splitter and consumed by the guards.

/// Shell operator separating consecutive pipeline segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `&&` — run next only if previous succeeded
    And,
    /// `||` — run next only if previous failed
    Or,
    /// `;` or a newline — run next unconditionally
    Semi,
    /// `|` — pipe stdout
    Pipe,
    /// `|&` — pipe stdout+stderr
    PipeErr,
    /// `&` — run previous in the background
    Background,
}

impl Operator {
    /// `&&`, `||` and `;` sequence commands in the current shell; pipes
    /// and `&` run their neighbours in subshells.
    pub fn is_chain(&self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Semi)
    }
}

/// A single command within a compound command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSegment {
    /// Trimmed command text, quotes intact.
    pub command: String,
    /// Operator that introduced this segment; `None` for the first one.
    pub preceded_by: Option<Operator>,
}

impl ShellSegment {
    /// Whether this segment starts the line or directly follows `&&`, `||` or `;`.
    pub fn starts_chain_step(&self) -> bool {
        self.preceded_by.is_none_or(|op| op.is_chain())
    }
}

/// A compound command decomposed into segments.
///
/// For `a && b | c` there are three segments; the second is preceded by
/// `&&` and the third by `|`.
#[derive(Debug, Clone, Default)]
pub struct ParsedPipeline {
    pub segments: Vec<ShellSegment>,
}
