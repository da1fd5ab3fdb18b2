//! Structural checks over the module set and the dependency graph.
//!
//! Each check is a pure function of its inputs and returns its own findings;
//! the pipeline merges them.

use crate::graph::DependencyGraph;
use crate::layer::LayerClassifier;
use crate::rule_spec::ComplexityThresholds;
use crate::types::{rule_ids, Finding, Module, Severity};

/// Flag imports that the importing module's layer forbids.
///
/// Works on raw import strings, so it does not need the graph. Unclassified
/// modules are exempt.
pub fn check_layer_violations(modules: &[Module], classifier: &LayerClassifier) -> Vec<Finding> {
    let mut findings = Vec::new();

    for module in modules {
        let Some(layer) = module.layer.as_deref() else {
            continue;
        };
        for import in &module.imports {
            for pattern in classifier.forbidden_matches(layer, import) {
                findings.push(
                    Finding::new(
                        Severity::Error,
                        rule_ids::LAYER_VIOLATION,
                        &module.path,
                        format!("Layer '{layer}' should not import '{import}'"),
                    )
                    .with_suggestion(format!(
                        "Access '{import}' through an allowed layer instead (forbidden by '{pattern}')"
                    )),
                );
            }
        }
    }

    findings
}

/// Report each dependency cycle once.
///
/// The graph is split into strongly connected components; every component
/// with two or more modules is one cycle, reported on its smallest member.
pub fn check_circular_dependencies(graph: &DependencyGraph) -> Vec<Finding> {
    graph
        .cycles()
        .into_iter()
        .filter_map(|members| {
            let anchor = members.first()?.clone();
            let chain = members.join(" ↔ ");
            Some(
                Finding::new(
                    Severity::Error,
                    rule_ids::CIRCULAR_DEPENDENCY,
                    anchor,
                    format!(
                        "Circular dependency between {} modules: {chain}",
                        members.len()
                    ),
                )
                .with_suggestion(
                    "Refactor to remove the circular dependency, e.g. extract the shared code into a module both can import",
                ),
            )
        })
        .collect()
}

/// Compare each module's size and function count against the thresholds.
/// At most one finding per metric per module.
pub fn check_complexity(modules: &[Module], thresholds: &ComplexityThresholds) -> Vec<Finding> {
    let mut findings = Vec::new();

    for module in modules {
        match thresholds.lines.classify(module.line_count) {
            Some(Severity::Error) => findings.push(
                Finding::new(
                    Severity::Error,
                    rule_ids::COMPLEXITY,
                    &module.path,
                    format!("File too large: {} lines", module.line_count),
                )
                .with_suggestion("Consider splitting into smaller modules"),
            ),
            Some(severity) => findings.push(
                Finding::new(
                    severity,
                    rule_ids::COMPLEXITY,
                    &module.path,
                    format!("File is large: {} lines", module.line_count),
                )
                .with_suggestion("Consider refactoring"),
            ),
            None => {}
        }

        let functions = module.function_count();
        match thresholds.methods.classify(functions) {
            Some(Severity::Error) => findings.push(
                Finding::new(
                    Severity::Error,
                    rule_ids::COMPLEXITY,
                    &module.path,
                    format!("Too many methods: {functions}"),
                )
                .with_suggestion("Split into multiple classes"),
            ),
            Some(severity) => findings.push(
                Finding::new(
                    severity,
                    rule_ids::COMPLEXITY,
                    &module.path,
                    format!("Many methods: {functions}"),
                )
                .with_suggestion("Consider splitting responsibilities"),
            ),
            None => {}
        }
    }

    findings
}
