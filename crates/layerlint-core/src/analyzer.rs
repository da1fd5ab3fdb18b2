use std::path::Path;

use thiserror::Error;

use crate::types::Module;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to initialize {language} parser: {message}")]
    Setup {
        language: &'static str,
        message: String,
    },

    #[error("parser produced no syntax tree")]
    NoTree,

    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    /// Parses under the grammar but is not valid in the supported language version.
    #[error("unsupported {construct} at line {line}, column {column}")]
    Unsupported {
        construct: &'static str,
        line: usize,
        column: usize,
    },
}

/// Trait that each language extractor must implement.
///
/// An extractor turns one file into a [`Module`]. It must not classify the
/// module into a layer; that happens afterwards, once per module.
pub trait ModuleExtractor: Send + Sync {
    /// Language name (e.g., "python")
    fn language(&self) -> &'static str;

    /// File extensions this extractor handles (e.g., &["py"])
    fn file_extensions(&self) -> &[&str];

    /// Parse `content` and build the module keyed by `rel_path`.
    fn extract(&self, rel_path: &str, content: &str) -> Result<Module, ExtractError>;

    /// Whether this extractor handles the file at `path`.
    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.file_extensions().contains(&ext))
    }
}

/// Line count by newline splitting: `"a\nb"` and `"a\nb\n"` have 2 and 3.
pub fn count_lines(content: &str) -> usize {
    content.split('\n').count()
}
