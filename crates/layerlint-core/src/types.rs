use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single source file of the analysed corpus.
///
/// `path` is relative to the project root with `/` separators and is the
/// identity key used everywhere else (graph nodes, findings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub path: String,
    /// Import targets as written in the source, in order of appearance.
    pub imports: Vec<String>,
    pub classes: Vec<String>,
    pub functions: Vec<String>,
    pub line_count: usize,
    pub layer: Option<String>,
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            imports: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            line_count: 0,
            layer: None,
        }
    }

    /// Dotted module name: extension stripped, `/` replaced by `.`.
    ///
    /// `app/domain/user.py` becomes `app.domain.user`.
    pub fn dotted_name(&self) -> String {
        let without_ext = match self.path.rsplit_once('.') {
            Some((stem, ext)) if !ext.contains('/') && !stem.is_empty() => stem,
            _ => self.path.as_str(),
        };
        without_ext.replace('/', ".")
    }

    /// Number of declared functions and methods.
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

/// Normalize a relative path to `/` separators.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Upper-case label used by the rule document and the text report.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(anyhow::anyhow!("unknown severity: {s}")),
        }
    }
}

// Rule documents spell severities in upper case (`ERROR`), config files in
// lower case (`error`); accept both.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifiers of the built-in structural rules.
pub mod rule_ids {
    pub const LAYER_VIOLATION: &str = "no_layer_skipping";
    pub const CIRCULAR_DEPENDENCY: &str = "no_circular_dependencies";
    pub const COMPLEXITY: &str = "single_responsibility";
    pub const DUPLICATE_LOGIC: &str = "duplicate_logic";
}

/// A rule violation reported by one of the checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub rule: String,
    pub file: String,
    /// 1-based line; absent for whole-module findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Finding {
    pub fn new(
        severity: Severity,
        rule: impl Into<String>,
        file: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            rule: rule.into(),
            file: file.into(),
            line: None,
            message: message.into(),
            suggestion: None,
            snippet: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        let suggestion = suggestion.into();
        if !suggestion.is_empty() {
            self.suggestion = Some(suggestion);
        }
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Total order used for the final report: file, line, rule, then message.
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.file
            .cmp(&other.file)
            .then_with(|| self.line.cmp(&other.line))
            .then_with(|| self.rule.cmp(&other.rule))
            .then_with(|| self.message.cmp(&other.message))
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line)?,
            None => write!(f, "{}", self.file)?,
        }
        write!(f, " [{}] {}", self.rule, self.message)
    }
}

/// Kind of non-fatal problem encountered during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// File could not be read.
    Read,
    /// File could not be parsed into a module.
    Parse,
    /// A single rule was skipped because its definition is unusable.
    InvalidRule,
}

/// A problem that did not abort the run. Not a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWarning {
    pub kind: WarningKind,
    /// File path or rule name the warning is about.
    pub subject: String,
    pub message: String,
}

impl AnalysisWarning {
    pub fn new(kind: WarningKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Emit the warning through `tracing` and hand it back for collection.
    pub fn logged(self) -> Self {
        tracing::warn!(kind = ?self.kind, subject = %self.subject, "{}", self.message);
        self
    }
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}
