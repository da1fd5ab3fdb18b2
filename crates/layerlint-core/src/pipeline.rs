use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::analyzer::ModuleExtractor;
use crate::config::Config;
use crate::duplicate::{check_duplicate_logic, DuplicateRules, FsSource};
use crate::graph::DependencyGraph;
use crate::layer::LayerClassifier;
use crate::rule_spec::RuleSpec;
use crate::structural;
use crate::summary::AnalysisResult;
use crate::textual::TextualRules;
use crate::types::{normalize_path, AnalysisWarning, Finding, Module, WarningKind};

/// Full analysis output including the module set and graph for reporting.
pub struct FullAnalysis {
    pub result: AnalysisResult,
    pub graph: DependencyGraph,
    pub modules: Vec<Module>,
}

/// Per-file outcome before merging.
#[derive(Default)]
struct FileResult {
    module: Option<Module>,
    findings: Vec<Finding>,
    warnings: Vec<AnalysisWarning>,
}

/// Reusable analysis pipeline: rules are compiled once, then any number of
/// project roots can be analysed.
pub struct AnalysisPipeline {
    extractors: Vec<Box<dyn ModuleExtractor>>,
    spec: RuleSpec,
    config: Config,
    classifier: LayerClassifier,
    textual: TextualRules,
    duplicates: DuplicateRules,
    rule_warnings: Vec<AnalysisWarning>,
}

impl AnalysisPipeline {
    pub fn new(extractors: Vec<Box<dyn ModuleExtractor>>, spec: RuleSpec, config: Config) -> Self {
        let (classifier, mut rule_warnings) = LayerClassifier::new(&spec.layers);
        let (textual, textual_warnings) = TextualRules::compile(&spec.validation_checks);
        let (duplicates, duplicate_warnings) = DuplicateRules::compile(&spec.duplicate_logic);
        rule_warnings.extend(textual_warnings);
        rule_warnings.extend(duplicate_warnings);

        Self {
            extractors,
            spec,
            config,
            classifier,
            textual,
            duplicates,
            rule_warnings,
        }
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a full analysis on the given project path.
    pub fn analyze(&self, project_path: &Path) -> Result<FullAnalysis> {
        if !project_path.is_dir() {
            bail!("'{}' is not a directory", project_path.display());
        }

        let source_files = self.source_files(project_path);
        tracing::info!(files = source_files.len(), "Analysing {}", project_path.display());

        let file_results: Vec<FileResult> = source_files
            .par_iter()
            .map(|file_path| self.analyze_file(project_path, file_path))
            .collect();

        let mut findings = Vec::new();
        let mut warnings = self.rule_warnings.clone();
        let mut modules = Vec::new();
        for fr in file_results {
            findings.extend(fr.findings);
            warnings.extend(fr.warnings);
            modules.extend(fr.module);
        }

        for module in &mut modules {
            module.layer = self.classifier.classify(&module.path).map(str::to_string);
        }

        let graph = DependencyGraph::build(&modules);
        tracing::info!(
            modules = modules.len(),
            edges = graph.edge_count(),
            "Dependency graph built"
        );

        findings.extend(structural::check_layer_violations(&modules, &self.classifier));
        findings.extend(structural::check_circular_dependencies(&graph));
        findings.extend(structural::check_complexity(&modules, &self.spec.complexity));

        let (duplicate_findings, duplicate_warnings) =
            check_duplicate_logic(&modules, &self.duplicates, &FsSource::new(project_path));
        findings.extend(duplicate_findings);
        warnings.extend(duplicate_warnings);

        findings.sort_by(|a, b| a.report_order(b));

        let result = AnalysisResult::new(
            &modules,
            &graph,
            &self.classifier.layer_names(),
            findings,
            warnings,
        );
        Ok(FullAnalysis {
            result,
            graph,
            modules,
        })
    }

    /// Files with a configured extension outside every excluded directory,
    /// sorted by path.
    fn source_files(&self, project_path: &Path) -> Vec<PathBuf> {
        let extensions = &self.config.project.extensions;
        let excludes: Vec<&str> = self
            .config
            .project
            .exclude_dirs
            .iter()
            .chain(self.spec.global_excludes.iter())
            .map(String::as_str)
            .collect();

        WalkDir::new(project_path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!("Skipping unreadable directory entry: {err}");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| extensions.iter().any(|x| x == ext))
            })
            .filter(|e| {
                let rel = relative_path(project_path, e.path());
                !excludes.iter().any(|marker| rel.contains(marker))
            })
            .map(|e| e.into_path())
            .collect()
    }

    fn analyze_file(&self, project_path: &Path, file_path: &Path) -> FileResult {
        let rel_path = relative_path(project_path, file_path);

        let content = match std::fs::read_to_string(file_path) {
            Ok(c) => c,
            Err(e) => {
                return FileResult {
                    warnings: vec![AnalysisWarning::new(
                        WarningKind::Read,
                        &rel_path,
                        format!("failed to read file: {e}"),
                    )
                    .logged()],
                    ..Default::default()
                };
            }
        };

        let mut result = FileResult {
            findings: self.textual.check_file(&rel_path, &content),
            ..Default::default()
        };

        let Some(extractor) = self.extractors.iter().find(|x| x.handles(file_path)) else {
            tracing::debug!("No extractor for {rel_path}; textual checks only");
            return result;
        };

        match extractor.extract(&rel_path, &content) {
            Ok(module) => result.module = Some(module),
            Err(e) => result.warnings.push(
                AnalysisWarning::new(
                    WarningKind::Parse,
                    &rel_path,
                    format!("failed to parse {} source: {e}", extractor.language()),
                )
                .logged(),
            ),
        }
        result
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    normalize_path(
        &path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy(),
    )
}
