//! Symbol narrowing: reduce an entry file to its target classes and the local
//! declarations they transitively reference.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::ResponseConvention;
use crate::frontend::typescript::ast::{Declaration, ParsedModule};
use crate::frontend::SyntaxTree;

/// Suffixes stripped from a message name before sibling lookup.
const KIND_SUFFIXES: &[&str] = &["Event", "Command", "Query"];

/// Sibling names a message's supporting types conventionally use.
const SIBLING_SUFFIXES: &[&str] = &["Result", "Response", "Payload"];

/// A narrowed entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrowedFile {
    pub text: String,
    /// Module specifiers of the imports that survived.
    pub retained_specifiers: Vec<String>,
    /// Local declarations kept besides the targets, in source order.
    pub included: Vec<String>,
}

/// Names worth pulling in next to a target even when the class body does not
/// mention them.
pub fn sibling_candidates(name: &str, conventions: &[ResponseConvention]) -> Vec<String> {
    let mut names: Vec<String> = SIBLING_SUFFIXES.iter().map(|s| format!("{}{}", name, s)).collect();
    if let Some(stem) = KIND_SUFFIXES.iter().find_map(|s| name.strip_suffix(s)).filter(|s| !s.is_empty()) {
        names.extend(SIBLING_SUFFIXES.iter().map(|s| format!("{}{}", stem, s)));
    }
    names.extend(conventions.iter().filter_map(|c| c.derive(name)));
    names.dedup();
    names
}

/// Narrows `tree` to `targets`. Returns `None` when none of the targets is
/// declared in the file, in which case the file is copied whole.
pub fn narrow(
    tree: &SyntaxTree,
    module: &ParsedModule,
    targets: &[String],
    extra_seeds: &[String],
    conventions: &[ResponseConvention],
) -> Option<NarrowedFile> {
    let source = tree.source();
    let target_decls: Vec<&Declaration> = module
        .declarations
        .iter()
        .filter(|d| d.names.iter().any(|n| targets.contains(n)))
        .collect();
    if target_decls.is_empty() {
        return None;
    }

    let declared = module.declared_names();
    let target_names: BTreeSet<&str> = target_decls.iter().flat_map(|d| d.names.iter().map(String::as_str)).collect();

    let mut worklist: Vec<String> = Vec::new();
    for decl in &target_decls {
        worklist.extend(decl.references.iter().cloned());
        worklist.extend(sibling_candidates(decl.name(), conventions));
    }
    worklist.extend(extra_seeds.iter().cloned());

    // Fixed point over local declarations.
    let mut included: BTreeSet<String> = BTreeSet::new();
    let mut referenced: BTreeSet<String> = BTreeSet::new();
    while let Some(name) = worklist.pop() {
        if !referenced.insert(name.clone()) {
            continue;
        }
        if target_names.contains(name.as_str()) || !declared.contains(&name) {
            continue;
        }
        if let Some(decl) = module.declaration(&name) {
            for bound in &decl.names {
                included.insert(bound.clone());
            }
            worklist.extend(decl.references.iter().cloned());
        }
    }

    let mut sections = Vec::new();
    let mut retained_specifiers = Vec::new();

    let mut import_lines = Vec::new();
    for import in &module.imports {
        let keep = |local: &str| referenced.contains(local) && !declared.contains(local);
        if let Some(line) = import.render_subset(&keep) {
            import_lines.push(line);
            if !retained_specifiers.contains(&import.source) {
                retained_specifiers.push(import.source.clone());
            }
        } else {
            debug!(specifier = %import.source, "import dropped by narrowing");
        }
    }
    if !import_lines.is_empty() {
        sections.push(import_lines.join("\n"));
    }

    let mut included_names = Vec::new();
    for decl in &module.declarations {
        if decl.names.iter().any(|n| included.contains(n)) && !target_decls.iter().any(|t| t.span == decl.span) {
            sections.push(forced_export(source, decl));
            included_names.extend(decl.names.iter().cloned());
        }
    }
    for decl in &target_decls {
        sections.push(forced_export(source, decl));
    }

    let mut text = sections.join("\n\n");
    text.push('\n');
    Some(NarrowedFile {
        text,
        retained_specifiers,
        included: included_names,
    })
}

/// Statement text with an `export` keyword, added when the statement had none.
fn forced_export(source: &str, decl: &Declaration) -> String {
    let statement = &source[decl.span.range()];
    let has_keyword = decl.span != decl.decl_span;
    if has_keyword {
        statement.to_string()
    } else {
        format!("export {}", statement)
    }
}
