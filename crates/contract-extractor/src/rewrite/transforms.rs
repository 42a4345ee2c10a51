//! Per-file source transforms.
//!
//! Each transform parses the current text, computes byte-range edits from
//! the tree and applies them once. Every applied rewrite is reported as a
//! short description.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::{AliasRewrite, MarkerNames, TransformOptions};
use crate::diagnostic::{ExtractorError, Span};
use crate::frontend::typescript::ast::ParsedModule;
use crate::frontend::typescript::parser::{
    collect_identifiers, decorator_name, decorator_nodes, is_class_kind, node_text, span_of, top_level_declarations,
};
use crate::frontend::TypeScriptParser;
use crate::graph::{FileGraph, FileNode, ImportInfo};
use crate::paths::{is_relative_specifier, relative_specifier, runtime_extension};
use super::edit::EditSet;

/// What a transform needs to know about the file being copied.
pub struct TransformContext<'a> {
    pub output_path: &'a Path,
    /// Graph node of the source file.
    pub node: Option<&'a FileNode>,
    pub graph: &'a FileGraph,
    /// Source path to output path of every copied file.
    pub output_paths: &'a BTreeMap<PathBuf, PathBuf>,
    pub markers: &'a MarkerNames,
    /// Type names that must carry `export` in this file.
    pub export_types: &'a [String],
    pub alias_rewrites: &'a [AliasRewrite],
}

impl TransformContext<'_> {
    fn import_info(&self, specifier: &str) -> Option<&ImportInfo> {
        self.node?
            .imports
            .iter()
            .find(|i| i.module_specifier == specifier)
    }
}

/// Result of one transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub text: String,
    pub descriptions: Vec<String>,
}

impl Transformed {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            descriptions: Vec::new(),
        }
    }
}

/// A module edge in the current text: specifier, statement span, literal span, quote.
struct Edge {
    specifier: String,
    statement: Span,
    literal: Span,
    quote: char,
}

fn edges(module: &ParsedModule) -> Vec<Edge> {
    let imports = module.imports.iter().map(|i| Edge {
        specifier: i.source.clone(),
        statement: i.span,
        literal: i.source_span,
        quote: i.quote,
    });
    let re_exports = module.re_exports.iter().map(|r| Edge {
        specifier: r.source.clone(),
        statement: r.span,
        literal: r.source_span,
        quote: r.quote,
    });
    let mut all: Vec<Edge> = imports.chain(re_exports).collect();
    all.sort_by_key(|e| e.statement.start);
    all
}

/// Runs every enabled transform in order.
pub fn apply_all(
    parser: &mut TypeScriptParser,
    text: &str,
    ctx: &TransformContext,
    options: TransformOptions,
) -> Result<Transformed, ExtractorError> {
    let mut current = Transformed::unchanged(text);
    let steps: [(bool, TransformFn); 5] = [
        (options.strip_excluded_imports, strip_excluded_imports),
        (options.strip_markers, strip_markers),
        (options.export_response_types, export_response_types),
        (options.rewrite_internal_paths, rewrite_internal_paths),
        (options.rewrite_external_aliases, rewrite_external_aliases),
    ];
    for (enabled, step) in steps {
        if !enabled {
            continue;
        }
        let next = step(parser, &current.text, ctx)?;
        current.text = next.text;
        current.descriptions.extend(next.descriptions);
    }
    Ok(current)
}

type TransformFn = fn(&mut TypeScriptParser, &str, &TransformContext) -> Result<Transformed, ExtractorError>;

/// Removes imports and re-exports whose target is an excluded file.
pub fn strip_excluded_imports(
    parser: &mut TypeScriptParser,
    text: &str,
    ctx: &TransformContext,
) -> Result<Transformed, ExtractorError> {
    let tree = parser.parse(text, ctx.output_path)?;
    let module = tree.summarize();
    let mut edits = EditSet::new();
    let mut descriptions = Vec::new();

    for edge in edges(&module) {
        let excluded = ctx
            .import_info(&edge.specifier)
            .and_then(|i| i.resolved_path.as_deref())
            .map(|p| ctx.graph.is_excluded(p))
            .unwrap_or(false);
        if excluded && edits.delete_statement(text, edge.statement) {
            descriptions.push(format!("removed import of excluded module '{}'", edge.specifier));
        }
    }

    Ok(Transformed {
        text: edits.apply(text),
        descriptions,
    })
}

/// Removes marker decorators, then marker import bindings nothing uses anymore.
pub fn strip_markers(
    parser: &mut TypeScriptParser,
    text: &str,
    ctx: &TransformContext,
) -> Result<Transformed, ExtractorError> {
    let tree = parser.parse(text, ctx.output_path)?;
    let module = tree.summarize();
    let mut edits = EditSet::new();
    let mut descriptions = Vec::new();

    for item in top_level_declarations(tree.root()) {
        if !is_class_kind(item.declaration.kind()) {
            continue;
        }
        let class_name = item
            .declaration
            .child_by_field_name("name")
            .map(|n| node_text(tree.source(), n).to_string())
            .unwrap_or_default();
        for decorator in decorator_nodes(&item) {
            let Some(local) = decorator_name(tree.source(), decorator) else { continue };
            let imported = module.imported_name(&local).unwrap_or(&local);
            if ctx.markers.kind_of(imported).is_none() {
                continue;
            }
            if edits.delete_decorator(text, span_of(decorator)) {
                descriptions.push(format!("removed @{} from {}", local, class_name));
            }
        }
    }

    if edits.is_empty() {
        return Ok(Transformed::unchanged(text));
    }
    let stripped = edits.apply(text);

    // Second pass on the stripped text: drop marker bindings left unused.
    let tree = parser.parse(&stripped, ctx.output_path)?;
    let module = tree.summarize();
    let mut used = BTreeSet::new();
    let root = tree.root();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() != "import_statement" {
            collect_identifiers(tree.source(), child, &mut used);
        }
    }

    let mut edits = EditSet::new();
    for import in &module.imports {
        let unused: Vec<&str> = import
            .specifiers
            .iter()
            .filter(|s| ctx.markers.kind_of(&s.name).is_some() && !used.contains(s.local_name()))
            .map(|s| s.local_name())
            .collect();
        if unused.is_empty() {
            continue;
        }
        let keep = |local: &str| !unused.contains(&local);
        let applied = match import.render_subset(&keep) {
            Some(line) => edits.replace(import.span.range(), line),
            None => edits.delete_statement(&stripped, import.span),
        };
        if applied {
            for local in unused {
                descriptions.push(format!("removed unused marker import '{}'", local));
            }
        }
    }

    Ok(Transformed {
        text: edits.apply(&stripped),
        descriptions,
    })
}

/// Adds `export` to flagged declarations that lack it. Already exported
/// declarations are left alone and not reported.
pub fn export_response_types(
    parser: &mut TypeScriptParser,
    text: &str,
    ctx: &TransformContext,
) -> Result<Transformed, ExtractorError> {
    if ctx.export_types.is_empty() {
        return Ok(Transformed::unchanged(text));
    }
    let tree = parser.parse(text, ctx.output_path)?;
    let module = tree.summarize();
    let mut edits = EditSet::new();
    let mut descriptions = Vec::new();

    for name in ctx.export_types {
        let Some(decl) = module.declaration(name) else { continue };
        if decl.exported {
            continue;
        }
        if edits.insert(decl.span.start, "export ") {
            descriptions.push(format!("exported '{}'", name));
        }
    }

    Ok(Transformed {
        text: edits.apply(text),
        descriptions,
    })
}

/// Points local imports at the copied files' output locations.
pub fn rewrite_internal_paths(
    parser: &mut TypeScriptParser,
    text: &str,
    ctx: &TransformContext,
) -> Result<Transformed, ExtractorError> {
    let tree = parser.parse(text, ctx.output_path)?;
    let module = tree.summarize();
    let out_dir = ctx.output_path.parent().unwrap_or(Path::new(""));
    let mut edits = EditSet::new();
    let mut descriptions = Vec::new();

    for edge in edges(&module) {
        let Some(info) = ctx.import_info(&edge.specifier) else { continue };
        let Some(resolved) = info.resolved_path.as_deref() else { continue };
        let Some(target) = ctx.output_paths.get(resolved) else { continue };
        let mut rewritten = relative_specifier(out_dir, target);
        if let Some(ext) = runtime_extension(&edge.specifier) {
            rewritten.push_str(ext);
        }
        if rewritten == edge.specifier {
            continue;
        }
        let literal = format!("{}{}{}", edge.quote, rewritten, edge.quote);
        if edits.replace(edge.literal.range(), literal) {
            descriptions.push(format!("'{}' -> '{}'", edge.specifier, rewritten));
        }
    }

    Ok(Transformed {
        text: edits.apply(text),
        descriptions,
    })
}

/// Longest matching prefix rewrite for an external specifier.
pub fn rewrite_alias(specifier: &str, rewrites: &[AliasRewrite]) -> Option<String> {
    rewrites
        .iter()
        .filter(|r| specifier.starts_with(r.from.as_str()))
        .max_by_key(|r| r.from.len())
        .map(|r| format!("{}{}", r.to, &specifier[r.from.len()..]))
}

/// Applies the caller's prefix substitutions to external specifiers.
pub fn rewrite_external_aliases(
    parser: &mut TypeScriptParser,
    text: &str,
    ctx: &TransformContext,
) -> Result<Transformed, ExtractorError> {
    if ctx.alias_rewrites.is_empty() {
        return Ok(Transformed::unchanged(text));
    }
    let tree = parser.parse(text, ctx.output_path)?;
    let module = tree.summarize();
    let mut edits = EditSet::new();
    let mut descriptions = Vec::new();

    for edge in edges(&module) {
        if is_relative_specifier(&edge.specifier) {
            continue;
        }
        let external = ctx.import_info(&edge.specifier).map(|i| i.is_external).unwrap_or(true);
        if !external {
            continue;
        }
        let Some(rewritten) = rewrite_alias(&edge.specifier, ctx.alias_rewrites) else { continue };
        let literal = format!("{}{}{}", edge.quote, rewritten, edge.quote);
        if edits.replace(edge.literal.range(), literal) {
            descriptions.push(format!("'{}' -> '{}'", edge.specifier, rewritten));
        }
    }

    Ok(Transformed {
        text: edits.apply(text),
        descriptions,
    })
}
