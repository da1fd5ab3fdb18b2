use anyhow::{Context, Result};
use serde::Serialize;

use layerlint_core::summary::{AnalysisResult, SeverityCounts};
use layerlint_core::types::Severity;

fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.context("failed to serialize report")
}

/// Full analysis result with severity totals.
#[derive(Debug, Serialize)]
pub struct ReportOutput<'a> {
    #[serde(flatten)]
    pub result: &'a AnalysisResult,
    pub counts: SeverityCounts,
}

/// Format a full analysis report as JSON.
pub fn format_report(result: &AnalysisResult, compact: bool) -> Result<String> {
    to_json(
        &ReportOutput {
            result,
            counts: result.counts(),
        },
        compact,
    )
}

/// Wrapper for check output that adds pass/fail metadata.
#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    #[serde(flatten)]
    pub report: ReportOutput<'a>,
    pub check: CheckStatus,
}

#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub passed: bool,
    pub fail_on: Severity,
    pub failing_finding_count: usize,
}

/// Format a check result as JSON. Returns (json_string, passed).
pub fn format_check(
    result: &AnalysisResult,
    fail_on: Severity,
    compact: bool,
) -> Result<(String, bool)> {
    let failing_count = result
        .findings
        .iter()
        .filter(|f| f.severity >= fail_on)
        .count();
    let passed = result.passed_at(fail_on);

    let output = CheckOutput {
        report: ReportOutput {
            result,
            counts: result.counts(),
        },
        check: CheckStatus {
            passed,
            fail_on,
            failing_finding_count: failing_count,
        },
    };

    Ok((to_json(&output, compact)?, passed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerlint_core::types::{AnalysisWarning, Finding, WarningKind};

    fn sample_result(with_error: bool) -> AnalysisResult {
        let mut findings = vec![Finding::new(
            Severity::Info,
            "duplicate_logic",
            "app/a.py",
            "Duplicate pattern 'retry' found in 3 files",
        )];
        if with_error {
            findings.insert(
                0,
                Finding::new(
                    Severity::Error,
                    "no_circular_dependencies",
                    "app/a.py",
                    "Circular dependency between 2 modules: app/a.py ↔ app/b.py",
                ),
            );
        }
        AnalysisResult {
            findings,
            warnings: vec![AnalysisWarning::new(WarningKind::Read, "app/c.py", "boom")],
            module_count: 2,
            edge_count: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_report_valid_json() {
        let json = format_report(&sample_result(true), false).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
        assert_eq!(parsed["module_count"], 2);
        assert_eq!(parsed["findings"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["findings"][0]["severity"], "error");
        assert!(parsed["findings"][0].get("line").is_none());
        assert_eq!(parsed["warnings"][0]["kind"], "read");
        assert_eq!(parsed["counts"]["error"], 1);
        assert_eq!(parsed["counts"]["info"], 1);
    }

    #[test]
    fn test_format_report_compact_is_single_line() {
        let json = format_report(&sample_result(false), true).unwrap();
        assert!(!json.contains('\n'), "compact JSON should be single line");
    }

    #[test]
    fn test_format_check_passed() {
        let (json, passed) = format_check(&sample_result(false), Severity::Error, false).unwrap();
        assert!(passed);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
        assert_eq!(parsed["check"]["passed"], true);
        assert_eq!(parsed["check"]["failing_finding_count"], 0);
        assert_eq!(parsed["check"]["fail_on"], "error");
    }

    #[test]
    fn test_format_check_failed() {
        let (json, passed) = format_check(&sample_result(true), Severity::Error, false).unwrap();
        assert!(!passed);
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should be valid JSON");
        assert_eq!(parsed["check"]["passed"], false);
        assert_eq!(parsed["check"]["failing_finding_count"], 1);
        // Flattened result fields stay at top level
        assert!(parsed.get("findings").is_some());
        assert!(parsed.get("counts").is_some());
    }

    #[test]
    fn test_format_check_info_threshold() {
        let (_, passed) = format_check(&sample_result(false), Severity::Info, true).unwrap();
        assert!(!passed);
    }
}
