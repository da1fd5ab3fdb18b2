//! Dependency tree rendering for `analyze` and `deps`.

use colored::Colorize;

use layerlint_core::graph::DependencyGraph;
use layerlint_core::types::Module;

/// Number of root modules shown when no start module is given.
pub const MAX_ROOTS: usize = 10;

/// Find a module by relative path or dotted name (`app.domain.user`).
pub fn find_module<'a>(graph: &'a DependencyGraph, query: &str) -> Option<&'a str> {
    if let Some(node) = graph.node(query) {
        return Some(node.path.as_str());
    }
    graph
        .nodes()
        .into_iter()
        .map(|n| n.path.as_str())
        .find(|path| Module::new(*path).dotted_name() == query)
}

/// Render the dependencies of `start` down to `max_depth` levels.
///
/// Every node is tagged with its layer. A module already on the current
/// branch is marked as a cycle and not expanded again.
pub fn format_dependency_tree(graph: &DependencyGraph, start: &str, max_depth: usize) -> String {
    let mut out = format!("{}{}\n", start.bold(), layer_tag(graph, start));
    let mut branch = vec![start];
    render_children(graph, start, 1, max_depth, "", &mut branch, &mut out);
    out
}

/// Render a tree for each root module: modules nobody depends on.
pub fn format_dependency_forest(graph: &DependencyGraph, max_depth: usize) -> String {
    let roots = graph.roots();
    if roots.is_empty() {
        return "No root modules: every module is imported by another.\n".to_string();
    }

    let mut out = String::new();
    for root in roots.iter().take(MAX_ROOTS) {
        out.push_str(&format_dependency_tree(graph, root, max_depth));
    }
    if roots.len() > MAX_ROOTS {
        out.push_str(&format!("... and {} more root modules\n", roots.len() - MAX_ROOTS));
    }
    out
}

/// List the modules that depend on `module`.
pub fn format_dependents(graph: &DependencyGraph, module: &str) -> String {
    let dependents = graph.dependents(module);
    let mut out = format!("{} ({})\n", "Depended on by".bold(), dependents.len());
    for path in dependents {
        out.push_str(&format!("  {path}{}\n", layer_tag(graph, path)));
    }
    out
}

fn render_children<'a>(
    graph: &'a DependencyGraph,
    module: &str,
    depth: usize,
    max_depth: usize,
    prefix: &str,
    branch: &mut Vec<&'a str>,
    out: &mut String,
) {
    if depth > max_depth {
        return;
    }
    let deps: Vec<&str> = graph.dependencies(module).into_iter().collect();
    let count = deps.len();

    for (i, dep) in deps.into_iter().enumerate() {
        let last = i + 1 == count;
        let connector = if last { "└── " } else { "├── " };

        if branch.contains(&dep) {
            out.push_str(&format!(
                "{prefix}{connector}{dep}{} {}\n",
                layer_tag(graph, dep),
                "(cycle)".red()
            ));
            continue;
        }
        out.push_str(&format!("{prefix}{connector}{dep}{}\n", layer_tag(graph, dep)));

        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        branch.push(dep);
        render_children(graph, dep, depth + 1, max_depth, &child_prefix, branch, out);
        branch.pop();
    }
}

fn layer_tag(graph: &DependencyGraph, path: &str) -> String {
    match graph.node(path).and_then(|n| n.layer.as_deref()) {
        Some(layer) => format!(" [{}]", layer.cyan()),
        None => String::new(),
    }
}
