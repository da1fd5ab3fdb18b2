use std::collections::HashMap;
use std::path::PathBuf;

use regex::Regex;

use crate::rule_spec::DuplicateLogic;
use crate::types::{rule_ids, AnalysisWarning, Finding, Module, Severity, WarningKind};

/// Raw file contents for the duplicate-logic check, read independently of
/// module extraction.
pub trait SourceProvider: Sync {
    fn read(&self, module: &Module) -> std::io::Result<String>;
}

/// Reads module sources from disk relative to the project root.
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceProvider for FsSource {
    fn read(&self, module: &Module) -> std::io::Result<String> {
        std::fs::read_to_string(self.root.join(&module.path))
    }
}

/// In-memory sources keyed by module path.
impl SourceProvider for HashMap<String, String> {
    fn read(&self, module: &Module) -> std::io::Result<String> {
        self.get(&module.path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, module.path.clone())
        })
    }
}

/// A duplicate-logic pattern with its compiled regex.
pub struct CompiledDuplicatePattern {
    pub name: String,
    pub regex: Regex,
    pub suggestion: String,
}

/// Compiled duplicate-logic rules.
pub struct DuplicateRules {
    pub threshold: usize,
    pub patterns: Vec<CompiledDuplicatePattern>,
}

impl DuplicateRules {
    /// Compile the configured patterns. A pattern whose regex does not
    /// compile is skipped and reported.
    pub fn compile(config: &DuplicateLogic) -> (Self, Vec<AnalysisWarning>) {
        let mut warnings = Vec::new();
        let patterns = config
            .patterns
            .iter()
            .filter_map(|p| match Regex::new(&p.regex) {
                Ok(regex) => Some(CompiledDuplicatePattern {
                    name: p.name.clone(),
                    regex,
                    suggestion: p.suggestion.clone(),
                }),
                Err(e) => {
                    warnings.push(
                        AnalysisWarning::new(
                            WarningKind::InvalidRule,
                            format!("duplicate_logic.{}", p.name),
                            format!("skipping pattern with invalid regex: {e}"),
                        )
                        .logged(),
                    );
                    None
                }
            })
            .collect();

        (
            Self {
                threshold: config.threshold,
                patterns,
            },
            warnings,
        )
    }
}

/// Flag patterns that occur in at least `threshold` modules.
///
/// Returns one INFO finding per matching module, plus a warning for each
/// module whose source could not be read again.
pub fn check_duplicate_logic(
    modules: &[Module],
    rules: &DuplicateRules,
    sources: &dyn SourceProvider,
) -> (Vec<Finding>, Vec<AnalysisWarning>) {
    let mut findings = Vec::new();
    let mut warnings = Vec::new();

    if rules.patterns.is_empty() {
        return (findings, warnings);
    }

    let contents: Vec<(&Module, String)> = modules
        .iter()
        .filter_map(|module| match sources.read(module) {
            Ok(content) => Some((module, content)),
            Err(e) => {
                warnings.push(
                    AnalysisWarning::new(
                        WarningKind::Read,
                        &module.path,
                        format!("could not re-read source for duplicate check: {e}"),
                    )
                    .logged(),
                );
                None
            }
        })
        .collect();

    for pattern in &rules.patterns {
        let matches: Vec<&str> = contents
            .iter()
            .filter(|(_, content)| pattern.regex.is_match(content))
            .map(|(module, _)| module.path.as_str())
            .collect();

        if matches.len() < rules.threshold {
            continue;
        }
        for path in &matches {
            findings.push(
                Finding::new(
                    Severity::Info,
                    rule_ids::DUPLICATE_LOGIC,
                    *path,
                    format!(
                        "Duplicate pattern '{}' found in {} files",
                        pattern.name,
                        matches.len()
                    ),
                )
                .with_suggestion(pattern.suggestion.clone()),
            );
        }
    }

    (findings, warnings)
}
