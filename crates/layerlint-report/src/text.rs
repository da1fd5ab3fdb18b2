use colored::{ColoredString, Colorize};

use layerlint_core::summary::AnalysisResult;
use layerlint_core::types::{Finding, Severity};

const SEVERITY_ORDER: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Info];

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Error => severity.label().red().bold(),
        Severity::Warning => severity.label().yellow().bold(),
        Severity::Info => severity.label().blue().bold(),
    }
}

/// Format a full findings report for terminal output.
pub fn format_report(result: &AnalysisResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "layerlint - Architecture Check".bold()));
    out.push_str(&format!("{}\n", "=".repeat(40)));

    out.push_str(&format!(
        "\n{}: {} modules, {} dependencies\n",
        "Summary".bold(),
        result.module_count,
        result.edge_count,
    ));

    if !result.warnings.is_empty() {
        out.push_str(&format!(
            "\n{} ({})\n",
            "Skipped".yellow().bold(),
            result.warnings.len()
        ));
        for w in &result.warnings {
            out.push_str(&format!("  {w}\n"));
        }
    }

    if result.findings.is_empty() {
        out.push_str(&format!("\n{}\n", "No findings!".green().bold()));
    } else {
        for severity in SEVERITY_ORDER {
            let group: Vec<&Finding> = result.findings_with(severity).collect();
            if group.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "\n{} ({})\n{}\n",
                severity_label(severity),
                group.len(),
                "-".repeat(40)
            ));
            for finding in group {
                out.push_str(&format_finding(finding));
            }
        }
    }

    let counts = result.counts();
    out.push_str(&format!(
        "\n{}: {} error(s), {} warning(s), {} info\n",
        "Total".bold(),
        counts.error,
        counts.warning,
        counts.info,
    ));

    out
}

fn format_finding(finding: &Finding) -> String {
    let location = match finding.line {
        Some(line) => format!("{}:{line}", finding.file),
        None => finding.file.clone(),
    };
    let mut out = format!(
        "\n  {} [{}] {}\n",
        location.bold(),
        finding.rule,
        finding.message
    );
    if let Some(ref snippet) = finding.snippet {
        out.push_str(&format!("    {} {}\n", ">".dimmed(), snippet));
    }
    if let Some(ref suggestion) = finding.suggestion {
        out.push_str(&format!("    {}: {}\n", "Fix".cyan(), suggestion));
    }
    out
}

/// Format a check result for CI use. Returns (text, passed).
pub fn format_check(result: &AnalysisResult, fail_on: Severity) -> (String, bool) {
    let failing = result
        .findings
        .iter()
        .filter(|f| f.severity >= fail_on)
        .count();
    let passed = result.passed_at(fail_on);

    let mut out = format_report(result);
    out.push('\n');
    if passed {
        out.push_str(&format!("{}\n", "CHECK PASSED".green().bold()));
    } else {
        out.push_str(&format!(
            "{}: {} finding(s) at severity {} or above\n",
            "CHECK FAILED".red().bold(),
            failing,
            fail_on,
        ));
    }

    (out, passed)
}

/// Format the project overview printed by `analyze`.
pub fn format_summary(result: &AnalysisResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n{}\n", "Project Summary".bold(), "-".repeat(40)));
    out.push_str(&format!("  Modules:           {}\n", result.module_count));
    out.push_str(&format!("  Total lines:       {}\n", result.total_lines));
    out.push_str(&format!("  Dependencies:      {}\n", result.edge_count));
    out.push_str(&format!(
        "  Ambiguous imports: {}\n",
        result.ambiguous_imports.len()
    ));
    for resolution in &result.ambiguous_imports {
        out.push_str(&format!(
            "    {}: '{}' -> {}\n",
            resolution.module,
            resolution.import,
            resolution.candidates.join(", ")
        ));
    }

    if !result.layer_stats.is_empty() {
        out.push_str("  Layers:\n");
        for stats in &result.layer_stats {
            out.push_str(&format!(
                "    {}: {} modules, {} lines\n",
                stats.layer, stats.modules, stats.lines
            ));
        }
        out.push_str(&format!(
            "    (unclassified): {} modules\n",
            result.unclassified_modules
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerlint_core::graph::ImportResolution;
    use layerlint_core::summary::LayerStats;
    use layerlint_core::types::{rule_ids, AnalysisWarning, WarningKind};

    fn plain() {
        colored::control::set_override(false);
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            findings: vec![
                Finding::new(
                    Severity::Error,
                    rule_ids::LAYER_VIOLATION,
                    "app/domain/user.py",
                    "Layer 'domain' should not import 'infra.db'",
                )
                .with_suggestion("Go through a port"),
                Finding::new(Severity::Warning, "no_prints", "app/infra/db.py", "Matched pattern: print")
                    .at_line(4)
                    .with_snippet("print('connect')"),
            ],
            warnings: vec![AnalysisWarning::new(
                WarningKind::Parse,
                "app/broken.py",
                "syntax error at line 3, column 1",
            )],
            module_count: 3,
            total_lines: 42,
            edge_count: 2,
            ambiguous_imports: vec![ImportResolution {
                module: "app/main.py".to_string(),
                import: "models".to_string(),
                candidates: vec!["app/a/models.py".to_string(), "app/b/models.py".to_string()],
            }],
            layer_stats: vec![LayerStats {
                layer: "domain".to_string(),
                modules: 1,
                lines: 20,
            }],
            unclassified_modules: 2,
        }
    }

    #[test]
    fn test_report_groups_by_severity() {
        plain();
        let out = format_report(&sample_result());
        let error_pos = out.find("ERROR (1)").unwrap();
        let warning_pos = out.find("WARNING (1)").unwrap();
        assert!(error_pos < warning_pos);
        assert!(out.contains("app/infra/db.py:4 [no_prints] Matched pattern: print"));
        assert!(out.contains("> print('connect')"));
        assert!(out.contains("Fix: Go through a port"));
        assert!(out.contains("app/broken.py: syntax error"));
        assert!(out.contains("1 error(s), 1 warning(s), 0 info"));
    }

    #[test]
    fn test_empty_report() {
        plain();
        let out = format_report(&AnalysisResult::default());
        assert!(out.contains("No findings!"));
        assert!(!out.contains("Skipped"));
    }

    #[test]
    fn test_check_fails_on_error() {
        plain();
        let (out, passed) = format_check(&sample_result(), Severity::Error);
        assert!(!passed);
        assert!(out.contains("CHECK FAILED: 1 finding(s) at severity error or above"));
    }

    #[test]
    fn test_check_threshold() {
        plain();
        let mut result = sample_result();
        result.findings.remove(0);
        assert!(format_check(&result, Severity::Error).1);
        let (out, passed) = format_check(&result, Severity::Warning);
        assert!(!passed);
        assert!(out.contains("CHECK FAILED"));
    }

    #[test]
    fn test_summary() {
        plain();
        let out = format_summary(&sample_result());
        assert!(out.contains("Modules:           3"));
        assert!(out.contains("Ambiguous imports: 1"));
        assert!(out.contains("app/main.py: 'models' -> app/a/models.py, app/b/models.py"));
        assert!(out.contains("domain: 1 modules, 20 lines"));
        assert!(out.contains("(unclassified): 2 modules"));
    }
}
