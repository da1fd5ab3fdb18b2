use serde::{Deserialize, Serialize};

use crate::graph::{DependencyGraph, ImportResolution};
use crate::types::{AnalysisWarning, Finding, Module, Severity};

/// Number of findings per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

/// Modules and lines assigned to one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerStats {
    pub layer: String,
    pub modules: usize,
    pub lines: usize,
}

/// Outcome of one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Sorted by file, line, rule, then message.
    pub findings: Vec<Finding>,
    pub warnings: Vec<AnalysisWarning>,
    pub module_count: usize,
    pub total_lines: usize,
    pub edge_count: usize,
    /// Imports that resolved to more than one module.
    pub ambiguous_imports: Vec<ImportResolution>,
    /// Declared layers in document order, including empty ones.
    pub layer_stats: Vec<LayerStats>,
    pub unclassified_modules: usize,
}

impl AnalysisResult {
    /// Collect run statistics around an already sorted finding list.
    pub fn new(
        modules: &[Module],
        graph: &DependencyGraph,
        layer_names: &[&str],
        findings: Vec<Finding>,
        warnings: Vec<AnalysisWarning>,
    ) -> Self {
        let layer_stats = layer_names
            .iter()
            .map(|&name| {
                let members = modules
                    .iter()
                    .filter(|m| m.layer.as_deref() == Some(name));
                let (count, lines) = members.fold((0, 0), |(c, l), m| (c + 1, l + m.line_count));
                LayerStats {
                    layer: name.to_string(),
                    modules: count,
                    lines,
                }
            })
            .collect();

        Self {
            findings,
            warnings,
            module_count: modules.len(),
            total_lines: modules.iter().map(|m| m.line_count).sum(),
            edge_count: graph.edge_count(),
            ambiguous_imports: graph.ambiguous_imports().into_iter().cloned().collect(),
            layer_stats,
            unclassified_modules: modules.iter().filter(|m| m.layer.is_none()).count(),
        }
    }

    pub fn counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for finding in &self.findings {
            match finding.severity {
                Severity::Error => counts.error += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    /// A run passes when it has no ERROR finding.
    pub fn passed(&self) -> bool {
        self.passed_at(Severity::Error)
    }

    /// A run passes when no finding is at or above `fail_on`.
    pub fn passed_at(&self, fail_on: Severity) -> bool {
        self.findings.iter().all(|f| f.severity < fail_on)
    }

    /// Findings of one severity, in report order.
    pub fn findings_with(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }
}
