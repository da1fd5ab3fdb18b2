use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::rule_spec::LayerRule;
use crate::types::{AnalysisWarning, WarningKind};

/// A layer with its compiled directory and forbidden-import globs.
struct CompiledLayer {
    name: String,
    directories: GlobSet,
    forbidden: Vec<ForbiddenImport>,
}

/// A forbidden-import glob, matched against dotted module names.
struct ForbiddenImport {
    pattern: String,
    matcher: GlobMatcher,
}

/// Classifies file paths into the layers declared by the rule document.
///
/// Layers are tried in document order and the first layer with a matching
/// directory glob wins. `*` never crosses a path separator; `**` does.
pub struct LayerClassifier {
    layers: Vec<CompiledLayer>,
}

fn compile_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

/// Dotted names are matched as paths so that `.` acts as the segment
/// separator: `infra.*` matches `infra.db` but not `infra2.other`.
fn dotted_to_path(name: &str) -> String {
    name.replace('.', "/")
}

impl LayerClassifier {
    /// Compile the layer definitions. Globs that fail to compile are skipped
    /// and reported; the rest of the layer stays active.
    pub fn new(layers: &[LayerRule]) -> (Self, Vec<AnalysisWarning>) {
        let mut warnings = Vec::new();

        let compiled = layers
            .iter()
            .map(|layer| {
                let mut builder = GlobSetBuilder::new();
                for pattern in &layer.directories {
                    match compile_glob(pattern) {
                        Ok(glob) => {
                            builder.add(glob);
                        }
                        Err(e) => warnings.push(invalid_glob(&layer.name, pattern, &e)),
                    }
                }
                let directories = builder.build().unwrap_or_else(|e| {
                    warnings.push(invalid_glob(&layer.name, "<directories>", &e));
                    GlobSet::empty()
                });

                let forbidden = layer
                    .forbidden_imports
                    .iter()
                    .filter_map(|pattern| match compile_glob(&dotted_to_path(pattern)) {
                        Ok(glob) => Some(ForbiddenImport {
                            pattern: pattern.clone(),
                            matcher: glob.compile_matcher(),
                        }),
                        Err(e) => {
                            warnings.push(invalid_glob(&layer.name, pattern, &e));
                            None
                        }
                    })
                    .collect();

                CompiledLayer {
                    name: layer.name.clone(),
                    directories,
                    forbidden,
                }
            })
            .collect();

        (Self { layers: compiled }, warnings)
    }

    /// Classify a relative file path into a layer name.
    pub fn classify(&self, path: &str) -> Option<&str> {
        let normalized = path.replace('\\', "/");
        self.layers
            .iter()
            .find(|layer| layer.directories.is_match(&normalized))
            .map(|layer| layer.name.as_str())
    }

    /// Forbidden-import patterns of `layer` that match `import`.
    ///
    /// A pattern matches when it matches the import itself or one of its
    /// dotted prefixes, so a forbidden package also forbids its submodules.
    pub fn forbidden_matches(&self, layer: &str, import: &str) -> Vec<&str> {
        let Some(layer) = self.layers.iter().find(|l| l.name == layer) else {
            return Vec::new();
        };
        let candidates = dotted_prefixes(import);

        layer
            .forbidden
            .iter()
            .filter(|f| candidates.iter().any(|c| f.matcher.is_match(c)))
            .map(|f| f.pattern.as_str())
            .collect()
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }
}

/// `a.b.c` yields the path forms of `a.b.c`, `a.b` and `a`.
fn dotted_prefixes(import: &str) -> Vec<String> {
    let segments: Vec<&str> = import.split('.').filter(|s| !s.is_empty()).collect();
    (1..=segments.len())
        .rev()
        .map(|n| segments[..n].join("/"))
        .collect()
}

fn invalid_glob(layer: &str, pattern: &str, err: &globset::Error) -> AnalysisWarning {
    AnalysisWarning::new(
        WarningKind::InvalidRule,
        format!("layers.{layer}"),
        format!("skipping invalid glob '{pattern}': {err}"),
    )
    .logged()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str, dirs: &[&str], forbidden: &[&str]) -> LayerRule {
        LayerRule {
            name: name.to_string(),
            directories: dirs.iter().map(|s| s.to_string()).collect(),
            forbidden_imports: forbidden.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn classifier(layers: &[LayerRule]) -> LayerClassifier {
        let (classifier, warnings) = LayerClassifier::new(layers);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        classifier
    }

    #[test]
    fn test_classify_by_directory_globs() {
        let c = classifier(&[
            layer("domain", &["**/domain/**"], &[]),
            layer("infra", &["app/infrastructure/**"], &[]),
        ]);

        assert_eq!(c.classify("app/domain/user.py"), Some("domain"));
        assert_eq!(c.classify("domain/user.py"), Some("domain"));
        assert_eq!(c.classify("app/infrastructure/db/pg.py"), Some("infra"));
        assert_eq!(c.classify("lib/infrastructure/db.py"), None);
        assert_eq!(c.classify("main.py"), None);
    }

    #[test]
    fn test_first_declared_layer_wins() {
        let c = classifier(&[
            layer("special", &["app/domain/special/**"], &[]),
            layer("domain", &["app/domain/**"], &[]),
        ]);
        assert_eq!(c.classify("app/domain/special/x.py"), Some("special"));
        assert_eq!(c.classify("app/domain/x.py"), Some("domain"));

        let reversed = classifier(&[
            layer("domain", &["app/domain/**"], &[]),
            layer("special", &["app/domain/special/**"], &[]),
        ]);
        assert_eq!(reversed.classify("app/domain/special/x.py"), Some("domain"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let c = classifier(&[layer("top", &["app/*.py"], &[])]);
        assert_eq!(c.classify("app/main.py"), Some("top"));
        assert_eq!(c.classify("app/sub/main.py"), None);
    }

    #[test]
    fn test_classify_normalizes_backslashes() {
        let c = classifier(&[layer("domain", &["app/domain/**"], &[])]);
        assert_eq!(c.classify("app\\domain\\user.py"), Some("domain"));
    }

    #[test]
    fn test_forbidden_import_matches_segment() {
        let c = classifier(&[layer("domain", &["**/domain/**"], &["infra.*"])]);
        assert_eq!(c.forbidden_matches("domain", "infra.db"), vec!["infra.*"]);
        assert!(c.forbidden_matches("domain", "infra2.other").is_empty());
        assert!(c.forbidden_matches("domain", "infra").is_empty());
        assert!(c.forbidden_matches("domain", "app.infra.db").is_empty());
    }

    #[test]
    fn test_forbidden_import_covers_submodules() {
        let c = classifier(&[layer("domain", &["**/domain/**"], &["infra.*", "api"])]);
        assert_eq!(c.forbidden_matches("domain", "infra.db.models"), vec!["infra.*"]);
        assert_eq!(c.forbidden_matches("domain", "api.routes"), vec!["api"]);
    }

    #[test]
    fn test_forbidden_double_star() {
        let c = classifier(&[layer("domain", &["**/domain/**"], &["**.sqlalchemy.**"])]);
        assert_eq!(
            c.forbidden_matches("domain", "vendor.sqlalchemy.orm"),
            vec!["**.sqlalchemy.**"]
        );
    }

    #[test]
    fn test_unknown_layer_has_no_forbidden_imports() {
        let c = classifier(&[layer("domain", &["**/domain/**"], &["infra.*"])]);
        assert!(c.forbidden_matches("ui", "infra.db").is_empty());
    }

    #[test]
    fn test_invalid_glob_is_skipped_with_warning() {
        let (c, warnings) = LayerClassifier::new(&[layer(
            "domain",
            &["app/{domain/**", "**/domain/**"],
            &["infra.[", "infra.*"],
        )]);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.kind == WarningKind::InvalidRule));
        assert_eq!(c.classify("app/domain/x.py"), Some("domain"));
        assert_eq!(c.forbidden_matches("domain", "infra.db"), vec!["infra.*"]);
    }

    #[test]
    fn test_empty_layers() {
        let c = classifier(&[]);
        assert!(c.layers.is_empty());
        assert_eq!(c.classify("app/domain/x.py"), None);
    }
}
