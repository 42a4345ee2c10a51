//! Module-level syntax summary of a TypeScript file.
//!
//! This is deliberately shallow: imports, re-exports and top-level
//! declarations with their byte spans and the identifiers they mention. The
//! rewrite engine edits text by these spans; the contract parser and the type
//! extractor go back to the tree-sitter nodes for anything structural.

use std::collections::BTreeSet;

use crate::diagnostic::Span;

/// Summary of one parsed file.
#[derive(Debug, Default, Clone)]
pub struct ParsedModule {
    pub imports: Vec<ImportDecl>,
    pub re_exports: Vec<ReExportDecl>,
    pub declarations: Vec<Declaration>,
    /// Names exported through a local `export { a, b }` clause.
    pub local_exports: BTreeSet<String>,
}

impl ParsedModule {
    /// Finds the top-level declaration that binds `name`.
    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.names.iter().any(|n| n == name))
    }

    /// Every name bound by a top-level declaration.
    pub fn declared_names(&self) -> BTreeSet<String> {
        self.declarations
            .iter()
            .flat_map(|d| d.names.iter().cloned())
            .collect()
    }

    /// Returns the imported (pre-alias) name bound to a local identifier.
    pub fn imported_name(&self, local: &str) -> Option<&str> {
        self.imports
            .iter()
            .flat_map(|i| i.specifiers.iter())
            .find(|s| s.local_name() == local)
            .map(|s| s.name.as_str())
    }

    /// Every module specifier this file depends on, imports first, with the
    /// names each statement explicitly brings in.
    pub fn dependencies(&self) -> Vec<(String, Vec<String>)> {
        let mut deps: Vec<(String, Vec<String>)> = self
            .imports
            .iter()
            .filter(|i| !i.source.is_empty())
            .map(|i| (i.source.clone(), i.imported_names()))
            .collect();
        deps.extend(
            self.re_exports
                .iter()
                .map(|r| (r.source.clone(), r.specifiers.iter().map(|s| s.name.clone()).collect())),
        );
        deps
    }

    pub fn is_exported(&self, name: &str) -> bool {
        self.local_exports.contains(name)
            || self
                .declaration(name)
                .map(|d| d.exported)
                .unwrap_or(false)
    }
}

/// An `import ... from "x"` statement.
#[derive(Debug, Clone)]
pub struct ImportDecl {
    /// Module specifier without quotes.
    pub source: String,
    /// `import type { ... }`.
    pub type_only: bool,
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub specifiers: Vec<ImportSpecifier>,
    /// Whole statement.
    pub span: Span,
    /// The string literal, quotes included.
    pub source_span: Span,
    pub quote: char,
}

impl ImportDecl {
    /// Local bindings introduced by this import.
    pub fn local_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(d) = &self.default {
            names.push(d.clone());
        }
        if let Some(ns) = &self.namespace {
            names.push(ns.clone());
        }
        names.extend(self.specifiers.iter().map(|s| s.local_name().to_string()));
        names
    }

    /// Names as exported by the target module.
    pub fn imported_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.default.is_some() {
            names.push("default".to_string());
        }
        if self.namespace.is_some() {
            names.push("*".to_string());
        }
        names.extend(self.specifiers.iter().map(|s| s.name.clone()));
        names
    }

    /// Side-effect only import (`import "./polyfill"`).
    pub fn is_bare(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.specifiers.is_empty()
    }

    /// Re-renders the statement keeping only bindings whose local name passes
    /// `keep`. Returns `None` when nothing survives.
    pub fn render_subset(&self, keep: &dyn Fn(&str) -> bool) -> Option<String> {
        let default = self.default.as_ref().filter(|d| keep(d));
        let namespace = self.namespace.as_ref().filter(|n| keep(n));
        let specifiers: Vec<&ImportSpecifier> =
            self.specifiers.iter().filter(|s| keep(s.local_name())).collect();

        if default.is_none() && namespace.is_none() && specifiers.is_empty() {
            return None;
        }

        let mut clause = Vec::new();
        if let Some(d) = default {
            clause.push(d.clone());
        }
        if let Some(ns) = namespace {
            clause.push(format!("* as {}", ns));
        }
        if !specifiers.is_empty() {
            let inner: Vec<String> = specifiers.iter().map(|s| s.render()).collect();
            clause.push(format!("{{ {} }}", inner.join(", ")));
        }

        let type_kw = if self.type_only { "type " } else { "" };
        Some(format!(
            "import {}{} from {}{}{};",
            type_kw,
            clause.join(", "),
            self.quote,
            self.source,
            self.quote
        ))
    }
}

/// One named binding in an import or export clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpecifier {
    /// Name exported by the other module.
    pub name: String,
    /// Local alias (`name as alias`).
    pub alias: Option<String>,
    /// Inline `type` qualifier.
    pub type_only: bool,
}

impl ImportSpecifier {
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn render(&self) -> String {
        let prefix = if self.type_only { "type " } else { "" };
        match &self.alias {
            Some(alias) => format!("{}{} as {}", prefix, self.name, alias),
            None => format!("{}{}", prefix, self.name),
        }
    }
}

/// An `export ... from "x"` statement.
#[derive(Debug, Clone)]
pub struct ReExportDecl {
    pub source: String,
    pub type_only: bool,
    /// `export * from` or `export * as ns from`.
    pub star: bool,
    pub specifiers: Vec<ImportSpecifier>,
    pub span: Span,
    pub source_span: Span,
    pub quote: char,
}

/// Kind of top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Class,
    Interface,
    TypeAlias,
    Enum,
    Function,
    Variable,
}

/// A top-level declaration statement.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// Bound names (several for `const a = 1, b = 2`).
    pub names: Vec<String>,
    pub kind: DeclKind,
    /// Carries an `export` keyword.
    pub exported: bool,
    pub default_export: bool,
    /// The whole statement, including `export` and leading decorators.
    pub span: Span,
    /// The declaration node itself.
    pub decl_span: Span,
    pub decorators: Vec<Decorator>,
    /// Identifiers mentioned anywhere in the statement, minus its own names.
    pub references: BTreeSet<String>,
}

impl Declaration {
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("")
    }
}

/// A decorator application such as `@PublicEvent({ response: Foo })`.
#[derive(Debug, Clone)]
pub struct Decorator {
    /// Called name as written (local binding).
    pub name: String,
    pub span: Span,
    /// `key: value` pairs of a leading object-literal argument. Values are
    /// identifier text or unquoted string literals.
    pub options: Vec<(String, String)>,
}

impl Decorator {
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(default: Option<&str>, specifiers: &[(&str, Option<&str>, bool)]) -> ImportDecl {
        ImportDecl {
            source: "./types".to_string(),
            type_only: false,
            default: default.map(str::to_string),
            namespace: None,
            specifiers: specifiers
                .iter()
                .map(|(name, alias, type_only)| ImportSpecifier {
                    name: name.to_string(),
                    alias: alias.map(str::to_string),
                    type_only: *type_only,
                })
                .collect(),
            span: Span::default(),
            source_span: Span::default(),
            quote: '"',
        }
    }

    #[test]
    fn test_render_subset_keeps_aliases_and_type_qualifiers() {
        let decl = import(None, &[("A", None, false), ("B", Some("Bee"), true), ("C", None, false)]);
        let rendered = decl.render_subset(&|name| name != "C").unwrap();
        assert_eq!(rendered, r#"import { A, type B as Bee } from "./types";"#);
    }

    #[test]
    fn test_render_subset_drops_empty_import() {
        let decl = import(Some("Def"), &[("A", None, false)]);
        assert!(decl.render_subset(&|_| false).is_none());
        assert_eq!(
            decl.render_subset(&|name| name == "Def").unwrap(),
            r#"import Def from "./types";"#
        );
    }

    #[test]
    fn test_render_subset_preserves_type_only_statement() {
        let mut decl = import(None, &[("A", None, false), ("B", None, false)]);
        decl.type_only = true;
        assert_eq!(
            decl.render_subset(&|name| name == "B").unwrap(),
            r#"import type { B } from "./types";"#
        );
    }
}
