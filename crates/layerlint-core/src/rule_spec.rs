//! The rule document: layers, complexity thresholds, duplicate-logic patterns
//! and textual validation checks.
//!
//! The document is validated into typed structs when it is loaded. A shape
//! error anywhere is fatal; bad regexes or globs are not checked here and are
//! reported per rule when the engines compile them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::types::Severity;

/// Default `lines.warning` threshold.
pub const DEFAULT_LINES_WARNING: usize = 500;
/// Default `lines.error` threshold.
pub const DEFAULT_LINES_ERROR: usize = 1000;
/// Default `methods.error` threshold.
pub const DEFAULT_METHODS_ERROR: usize = 30;
/// Default minimum number of files for a duplicate-logic finding.
pub const DEFAULT_DUPLICATE_THRESHOLD: usize = 3;
/// Default number of lines around a match searched for allowed contexts.
pub const DEFAULT_CONTEXT_LINES: usize = 2;

const SECTION_LAYERS: &str = "layers";
const SECTION_COMPLEXITY: &str = "complexity_thresholds";
const SECTION_ABSTRACTION: &str = "abstraction_indicators";
const SECTION_GLOBAL_EXCLUDES: &str = "global_excludes";

#[derive(Debug, Error)]
pub enum RuleSpecError {
    #[error("failed to read rule file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule document is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("rule document must be a mapping of sections")]
    NotAMapping,

    #[error("invalid section '{section}': {message}")]
    Section { section: String, message: String },
}

impl RuleSpecError {
    fn section(section: impl Into<String>, err: impl std::fmt::Display) -> Self {
        RuleSpecError::Section {
            section: section.into(),
            message: err.to_string(),
        }
    }
}

/// Parsed and shape-validated rule document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleSpec {
    /// Layers in document order; classification is first-match-wins.
    pub layers: Vec<LayerRule>,
    pub complexity: ComplexityThresholds,
    pub duplicate_logic: DuplicateLogic,
    /// Validation checks in document order.
    pub validation_checks: Vec<ValidationCheck>,
    /// Extra excluded-directory markers from `global_excludes.directories`.
    pub global_excludes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerRule {
    pub name: String,
    pub directories: Vec<String>,
    pub forbidden_imports: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LayerDto {
    #[serde(default)]
    directories: Vec<String>,
    #[serde(default)]
    forbidden_imports: Vec<String>,
}

/// A warning/error pair of upper bounds. `None` disables that tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Threshold {
    pub warning: Option<usize>,
    pub error: Option<usize>,
}

impl Threshold {
    /// Tier reached by `value`; error takes precedence over warning.
    pub fn classify(&self, value: usize) -> Option<Severity> {
        if self.error.is_some_and(|limit| value >= limit) {
            Some(Severity::Error)
        } else if self.warning.is_some_and(|limit| value >= limit) {
            Some(Severity::Warning)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComplexityThresholds {
    pub lines: Threshold,
    pub methods: Threshold,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            lines: Threshold {
                warning: Some(DEFAULT_LINES_WARNING),
                error: Some(DEFAULT_LINES_ERROR),
            },
            methods: Threshold {
                warning: None,
                error: Some(DEFAULT_METHODS_ERROR),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ThresholdDto {
    warning: Option<usize>,
    error: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ComplexityDto {
    #[serde(default)]
    lines: ThresholdDto,
    #[serde(default)]
    methods: ThresholdDto,
}

impl From<ComplexityDto> for ComplexityThresholds {
    fn from(dto: ComplexityDto) -> Self {
        let defaults = ComplexityThresholds::default();
        Self {
            lines: Threshold {
                warning: dto.lines.warning.or(defaults.lines.warning),
                error: dto.lines.error.or(defaults.lines.error),
            },
            methods: Threshold {
                warning: dto.methods.warning.or(defaults.methods.warning),
                error: dto.methods.error.or(defaults.methods.error),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateLogic {
    pub threshold: usize,
    pub patterns: Vec<DuplicatePattern>,
}

impl Default for DuplicateLogic {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DUPLICATE_THRESHOLD,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePattern {
    pub name: String,
    pub regex: String,
    #[serde(default)]
    pub suggestion: String,
}

#[derive(Debug, Deserialize)]
struct DuplicateLogicDto {
    #[serde(default = "default_duplicate_threshold")]
    threshold: usize,
    #[serde(default)]
    patterns: Vec<DuplicatePattern>,
}

fn default_duplicate_threshold() -> usize {
    DEFAULT_DUPLICATE_THRESHOLD
}

#[derive(Debug, Default, Deserialize)]
struct AbstractionDto {
    #[serde(default)]
    duplicate_logic: Option<DuplicateLogicDto>,
}

#[derive(Debug, Default, Deserialize)]
struct GlobalExcludesDto {
    #[serde(default)]
    directories: Vec<String>,
}

/// A named textual check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationCheck {
    pub name: String,
    pub severity: Severity,
    /// Path substrings the check is limited to; `None` means every file.
    pub files: Option<Vec<String>>,
    pub patterns: Vec<PatternEntry>,
    pub allowed_contexts: Vec<AllowedContext>,
    pub context_lines: usize,
}

/// A textual pattern: either a bare regex or a record with its own message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternEntry {
    Bare(String),
    Rich(RichPattern),
}

impl PatternEntry {
    pub fn regex(&self) -> &str {
        match self {
            PatternEntry::Bare(regex) => regex,
            PatternEntry::Rich(rich) => &rich.regex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichPattern {
    pub regex: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowedContext {
    pub pattern: String,
}

#[derive(Debug, Deserialize)]
struct ValidationCheckDto {
    #[serde(default = "default_check_severity")]
    severity: Severity,
    #[serde(default)]
    files: Option<Vec<String>>,
    patterns: Vec<PatternEntry>,
    #[serde(default)]
    allowed_contexts: Vec<AllowedContext>,
    #[serde(default = "default_context_lines")]
    context_lines: usize,
}

fn default_check_severity() -> Severity {
    Severity::Warning
}

fn default_context_lines() -> usize {
    DEFAULT_CONTEXT_LINES
}

impl RuleSpec {
    /// Load and validate a rule document from disk.
    pub fn load(path: &Path) -> Result<Self, RuleSpecError> {
        let content = std::fs::read_to_string(path).map_err(|source| RuleSpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a rule document.
    pub fn from_yaml_str(content: &str) -> Result<Self, RuleSpecError> {
        let document: Value = serde_yaml::from_str(content)?;
        let Value::Mapping(sections) = document else {
            return Err(RuleSpecError::NotAMapping);
        };
        Self::from_sections(sections)
    }

    fn from_sections(sections: Mapping) -> Result<Self, RuleSpecError> {
        let mut spec = RuleSpec::default();

        for (key, value) in sections {
            let section = match key {
                Value::String(section) => section,
                other => {
                    return Err(RuleSpecError::section(
                        format!("{other:?}"),
                        "section names must be strings",
                    ))
                }
            };
            if value.is_null() {
                continue;
            }

            match section.as_str() {
                SECTION_LAYERS => spec.layers = parse_layers(value)?,
                SECTION_COMPLEXITY => {
                    let dto: ComplexityDto = serde_yaml::from_value(value)
                        .map_err(|e| RuleSpecError::section(&section, e))?;
                    spec.complexity = dto.into();
                }
                SECTION_ABSTRACTION => {
                    let dto: AbstractionDto = serde_yaml::from_value(value)
                        .map_err(|e| RuleSpecError::section(&section, e))?;
                    if let Some(dup) = dto.duplicate_logic {
                        spec.duplicate_logic = DuplicateLogic {
                            threshold: dup.threshold,
                            patterns: dup.patterns,
                        };
                    }
                }
                SECTION_GLOBAL_EXCLUDES => {
                    let dto: GlobalExcludesDto = serde_yaml::from_value(value)
                        .map_err(|e| RuleSpecError::section(&section, e))?;
                    spec.global_excludes = dto.directories;
                }
                _ if is_validation_check(&value) => {
                    let dto: ValidationCheckDto = serde_yaml::from_value(value)
                        .map_err(|e| RuleSpecError::section(&section, e))?;
                    spec.validation_checks.push(ValidationCheck {
                        name: section.clone(),
                        severity: dto.severity,
                        files: dto.files,
                        patterns: dto.patterns,
                        allowed_contexts: dto.allowed_contexts,
                        context_lines: dto.context_lines,
                    });
                }
                _ => tracing::debug!("Ignoring unknown rule section '{section}'"),
            }
        }

        Ok(spec)
    }

    /// Look up a validation check by name.
    pub fn check(&self, name: &str) -> Option<&ValidationCheck> {
        self.validation_checks.iter().find(|c| c.name == name)
    }

    pub fn check_names(&self) -> Vec<&str> {
        self.validation_checks
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Keep only the named validation checks. Returns the names that matched
    /// nothing.
    pub fn retain_checks(&mut self, names: &[String]) -> Vec<String> {
        if names.is_empty() {
            return Vec::new();
        }
        let unknown = names
            .iter()
            .filter(|n| self.check(n).is_none())
            .cloned()
            .collect();
        self.validation_checks
            .retain(|c| names.iter().any(|n| *n == c.name));
        unknown
    }
}

fn is_validation_check(value: &Value) -> bool {
    value
        .as_mapping()
        .is_some_and(|m| m.contains_key("patterns"))
}

fn parse_layers(value: Value) -> Result<Vec<LayerRule>, RuleSpecError> {
    let Value::Mapping(entries) = value else {
        return Err(RuleSpecError::section(
            SECTION_LAYERS,
            "expected a mapping of layer name to definition",
        ));
    };

    entries
        .into_iter()
        .map(|(name, def)| {
            let Value::String(name) = name else {
                return Err(RuleSpecError::section(
                    SECTION_LAYERS,
                    "layer names must be strings",
                ));
            };
            let dto: LayerDto = if def.is_null() {
                LayerDto {
                    directories: Vec::new(),
                    forbidden_imports: Vec::new(),
                }
            } else {
                serde_yaml::from_value(def)
                    .map_err(|e| RuleSpecError::section(format!("layers.{name}"), e))?
            };
            Ok(LayerRule {
                name,
                directories: dto.directories,
                forbidden_imports: dto.forbidden_imports,
            })
        })
        .collect()
}

/// Starter rule document written by `layerlint init`.
pub fn default_rules_yaml() -> String {
    r##"# layerlint rule document

global_excludes:
  directories: ["migrations"]

layers:
  domain:
    directories: ["**/domain/**"]
    forbidden_imports: ["infrastructure.*", "api.*"]
  application:
    directories: ["**/application/**"]
    forbidden_imports: ["api.*"]
  infrastructure:
    directories: ["**/infrastructure/**"]
    forbidden_imports: []
  api:
    directories: ["**/api/**"]
    forbidden_imports: []

complexity_thresholds:
  lines: { warning: 500, error: 1000 }
  methods: { warning: 20, error: 30 }

abstraction_indicators:
  duplicate_logic:
    threshold: 3
    patterns:
      - name: manual_retry_loop
        regex: 'for attempt in range\('
        suggestion: "Extract a shared retry helper"

unsafe_fallbacks:
  severity: WARNING
  context_lines: 2
  allowed_contexts:
    - pattern: "tests/"
    - pattern: "# fallback-ok"
  patterns:
    - 'except\s*:'
    - regex: '\.get\([^,]+,\s*None\)'
      message: "Silent None fallback"
      suggestion: "Fail loudly or use an explicit default"
      severity: INFO
"##
    .to_string()
}
