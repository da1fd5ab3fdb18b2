//! Line-based regex checks with allowed-context exceptions.

use regex::Regex;

use crate::rule_spec::{PatternEntry, ValidationCheck};
use crate::types::{AnalysisWarning, Finding, Severity, WarningKind};

/// Allowed-context pattern that exempts every file under a `tests/` directory.
pub const TESTS_SENTINEL: &str = "tests/";

/// A pattern entry with its regex compiled and defaults resolved.
struct CompiledPattern {
    regex: Regex,
    severity: Severity,
    message: String,
    suggestion: Option<String>,
}

struct CompiledCheck {
    name: String,
    files: Option<Vec<String>>,
    patterns: Vec<CompiledPattern>,
    allowed_contexts: Vec<String>,
    context_lines: usize,
}

impl CompiledCheck {
    fn applies_to(&self, path: &str) -> bool {
        match &self.files {
            Some(filters) => filters.iter().any(|f| path.contains(f.as_str())),
            None => true,
        }
    }
}

/// Compiled validation checks, ready to run against individual files.
pub struct TextualRules {
    checks: Vec<CompiledCheck>,
}

impl TextualRules {
    /// Compile every check's patterns. A pattern whose regex does not compile
    /// is dropped with a warning; the other patterns of the check still run.
    pub fn compile(checks: &[ValidationCheck]) -> (Self, Vec<AnalysisWarning>) {
        let mut warnings = Vec::new();

        let compiled = checks
            .iter()
            .map(|check| {
                let patterns = check
                    .patterns
                    .iter()
                    .filter_map(|entry| match compile_pattern(check, entry) {
                        Ok(p) => Some(p),
                        Err(e) => {
                            warnings.push(
                                AnalysisWarning::new(
                                    WarningKind::InvalidRule,
                                    &check.name,
                                    format!("skipping pattern '{}': {e}", entry.regex()),
                                )
                                .logged(),
                            );
                            None
                        }
                    })
                    .collect();

                CompiledCheck {
                    name: check.name.clone(),
                    files: check.files.clone(),
                    patterns,
                    allowed_contexts: check
                        .allowed_contexts
                        .iter()
                        .map(|c| c.pattern.clone())
                        .collect(),
                    context_lines: check.context_lines,
                }
            })
            .collect();

        (Self { checks: compiled }, warnings)
    }

    /// Run every applicable check over one file's contents.
    pub fn check_file(&self, path: &str, content: &str) -> Vec<Finding> {
        let lines: Vec<&str> = content.lines().collect();
        let mut findings = Vec::new();

        for check in self.checks.iter().filter(|c| c.applies_to(path)) {
            for pattern in &check.patterns {
                for (index, line) in lines.iter().enumerate() {
                    if !pattern.regex.is_match(line) {
                        continue;
                    }
                    if is_allowed_context(
                        path,
                        &lines,
                        index,
                        &check.allowed_contexts,
                        check.context_lines,
                    ) {
                        continue;
                    }

                    let mut finding =
                        Finding::new(pattern.severity, &check.name, path, &pattern.message)
                            .at_line(index + 1)
                            .with_snippet(line.trim());
                    if let Some(suggestion) = &pattern.suggestion {
                        finding = finding.with_suggestion(suggestion.clone());
                    }
                    findings.push(finding);
                }
            }
        }

        findings
    }
}

fn compile_pattern(
    check: &ValidationCheck,
    entry: &PatternEntry,
) -> Result<CompiledPattern, regex::Error> {
    let regex = Regex::new(entry.regex())?;
    Ok(match entry {
        PatternEntry::Bare(raw) => CompiledPattern {
            regex,
            severity: check.severity,
            message: format!("Matched pattern: {raw}"),
            suggestion: None,
        },
        PatternEntry::Rich(rich) => CompiledPattern {
            regex,
            severity: rich.severity.unwrap_or(check.severity),
            message: rich
                .message
                .clone()
                .unwrap_or_else(|| "Pattern match".to_string()),
            suggestion: rich.suggestion.clone(),
        },
    })
}

/// Whether a match on line `index` (0-based) is exempted by one of the
/// allowed contexts.
///
/// A context exempts the match when it is the `tests/` sentinel and the path
/// is under `tests/`, when it occurs in the matching line, or when it occurs
/// in any line within `context_lines` before or after it. The window is
/// clamped to the file on both ends.
pub fn is_allowed_context(
    path: &str,
    lines: &[&str],
    index: usize,
    contexts: &[String],
    context_lines: usize,
) -> bool {
    if lines.is_empty() || index >= lines.len() {
        return false;
    }
    let start = index.saturating_sub(context_lines);
    let end = index.saturating_add(context_lines).min(lines.len() - 1);
    let window = &lines[start..=end];

    contexts.iter().any(|context| {
        (context == TESTS_SENTINEL && path.contains(TESTS_SENTINEL))
            || lines[index].contains(context.as_str())
            || window.iter().any(|line| line.contains(context.as_str()))
    })
}
