use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use layerlint_core::analyzer::{count_lines, ExtractError, ModuleExtractor};
use layerlint_core::types::Module;

/// Python module extractor using tree-sitter.
pub struct PythonExtractor {
    language: Language,
    module_query: Query,
}

impl PythonExtractor {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_python::LANGUAGE.into();

        // Nested classes, methods and imports inside functions are all
        // matched; decorated definitions wrap an ordinary definition node.
        // The grammar also accepts Python 2 `print`/`exec` statements.
        let module_query = Query::new(
            &language,
            r#"
            (class_definition name: (identifier) @class)
            (function_definition name: (identifier) @function)
            (import_statement name: (dotted_name) @import)
            (import_statement name: (aliased_import name: (dotted_name) @import))
            (import_from_statement module_name: (_) @from_import)
            (future_import_statement) @future
            (print_statement) @python2
            (exec_statement) @python2
            "#,
        )
        .context("failed to compile Python module query")?;

        Ok(Self {
            language,
            module_query,
        })
    }
}

impl ModuleExtractor for PythonExtractor {
    fn language(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn extract(&self, rel_path: &str, content: &str) -> Result<Module, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ExtractError::Setup {
                language: "python",
                message: e.to_string(),
            })?;
        let tree = parser.parse(content, None).ok_or(ExtractError::NoTree)?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error(root)
                .map(|n| {
                    let pos = n.start_position();
                    (pos.row + 1, pos.column + 1)
                })
                .unwrap_or((1, 1));
            return Err(ExtractError::Syntax { line, column });
        }

        let mut module = Module::new(rel_path);
        module.line_count = count_lines(content);

        let capture_names = self.module_query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.module_query, root, content.as_bytes());

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let name = capture_names[capture.index as usize];
                if name == "python2" {
                    let pos = capture.node.start_position();
                    return Err(ExtractError::Unsupported {
                        construct: "Python 2 statement",
                        line: pos.row + 1,
                        column: pos.column + 1,
                    });
                }
                let text = node_text(capture.node, content);
                match name {
                    "class" => module.classes.push(text),
                    "function" => module.functions.push(text),
                    "import" => module.imports.push(text),
                    "future" => module.imports.push("__future__".to_string()),
                    "from_import" => {
                        // `.models` → `models`; `from . import x` names no module
                        let target = text.trim_start_matches('.');
                        if !target.is_empty() {
                            module.imports.push(target.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(module)
    }
}

/// First ERROR or MISSING node in document order.
fn first_error(root: Node) -> Option<Node> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node
            .children(&mut cursor)
            .filter(|c| c.has_error() || c.is_missing())
            .collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn node_text(node: Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str) -> Module {
        PythonExtractor::new()
            .unwrap()
            .extract("app/service.py", content)
            .unwrap()
    }

    #[test]
    fn test_import_forms() {
        let module = extract(
            r#"
import os
import app.domain.user, app.infra.db as db
from app.services import orders
from .models import Order
from ..shared.utils import helper
from . import sibling
"#,
        );
        assert_eq!(
            module.imports,
            vec![
                "os",
                "app.domain.user",
                "app.infra.db",
                "app.services",
                "models",
                "shared.utils",
            ]
        );
    }

    #[test]
    fn test_nested_imports_are_found() {
        let module = extract(
            r#"
def load():
    import json
    if True:
        from app.infra import cache
    return json
"#,
        );
        assert_eq!(module.imports, vec!["json", "app.infra"]);
    }

    #[test]
    fn test_classes_and_functions() {
        let module = extract(
            r#"
class Repo:
    def save(self):
        pass

    class Meta:
        pass

class Other:
    def save(self):
        pass

    @staticmethod
    def build():
        pass

async def fetch():
    pass

@decorator
def wrapped():
    def inner():
        pass
"#,
        );
        assert_eq!(module.classes, vec!["Repo", "Meta", "Other"]);
        assert_eq!(
            module.functions,
            vec!["save", "save", "build", "fetch", "wrapped", "inner"]
        );
        assert_eq!(module.function_count(), 6);
    }

    #[test]
    fn test_line_count_and_path() {
        let module = PythonExtractor::new()
            .unwrap()
            .extract("app\\domain\\user.py", "x = 1\ny = 2\n")
            .unwrap();
        assert_eq!(module.line_count, 3);
        assert_eq!(module.path, "app/domain/user.py");
        assert!(module.layer.is_none());
    }

    #[test]
    fn test_syntax_error_is_rejected() {
        let extractor = PythonExtractor::new().unwrap();
        let err = extractor
            .extract("bad.py", "import os\n\ndef broken(:\n    pass\n")
            .unwrap_err();
        match err {
            ExtractError::Syntax { line, .. } => assert_eq!(line, 3),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_future_import_is_recorded() {
        let module = extract("from __future__ import annotations\nimport os\n");
        assert_eq!(module.imports, vec!["__future__", "os"]);
    }

    #[test]
    fn test_python2_statements_are_rejected() {
        let extractor = PythonExtractor::new().unwrap();
        for (source, expected_line) in [
            ("import os\nprint \"hello\"\n", 2),
            ("exec \"x = 1\"\n", 1),
        ] {
            match extractor.extract("legacy.py", source).unwrap_err() {
                ExtractError::Unsupported { line, column, .. } => {
                    assert_eq!((line, column), (expected_line, 1), "{source}");
                }
                other => panic!("expected unsupported statement, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_print_call_is_not_python2() {
        let module = extract("print(\"hello\")\nexec(\"x = 1\")\n");
        assert!(module.imports.is_empty());
    }

    #[test]
    fn test_empty_file() {
        let module = extract("");
        assert!(module.imports.is_empty());
        assert!(module.classes.is_empty());
        assert_eq!(module.line_count, 1);
    }

    #[test]
    fn test_handles_py_only() {
        let extractor = PythonExtractor::new().unwrap();
        assert!(extractor.handles(std::path::Path::new("a/b.py")));
        assert!(!extractor.handles(std::path::Path::new("a/b.pyc")));
        assert_eq!(extractor.language(), "python");
    }
}
