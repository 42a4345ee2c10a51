//! TypeScript parser using tree-sitter.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

use crate::diagnostic::{ExtractorError, Span};
use super::ast::*;

/// TypeScript / TSX parser.
pub struct TypeScriptParser {
    typescript: Parser,
    tsx: Parser,
}

impl TypeScriptParser {
    /// Creates a new TypeScript parser.
    pub fn new() -> Result<Self, ExtractorError> {
        let mut typescript = Parser::new();
        typescript
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .map_err(|_| ExtractorError::ParserInitFailed)?;
        let mut tsx = Parser::new();
        tsx.set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())
            .map_err(|_| ExtractorError::ParserInitFailed)?;
        Ok(Self { typescript, tsx })
    }

    /// Parses a TypeScript source file. `.tsx` files use the TSX grammar.
    pub fn parse(&mut self, source: &str, path: &Path) -> Result<SyntaxTree, ExtractorError> {
        let is_tsx = path.extension().map(|e| e == "tsx").unwrap_or(false);
        let parser = if is_tsx { &mut self.tsx } else { &mut self.typescript };
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ExtractorError::ParseFailed { path: path.to_path_buf() })?;
        Ok(SyntaxTree {
            source: source.to_string(),
            tree,
            path: path.to_path_buf(),
        })
    }
}

/// A parsed file: owns its text and tree.
pub struct SyntaxTree {
    source: String,
    tree: Tree,
    path: PathBuf,
}

impl SyntaxTree {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn text(&self, node: Node) -> &str {
        node_text(&self.source, node)
    }

    /// Builds the module-level summary.
    pub fn summarize(&self) -> ParsedModule {
        let mut visitor = Visitor::new(&self.source);
        visitor.visit_program(self.root());
        visitor.finish()
    }
}

/// One top-level declaration together with the statement that holds it.
#[derive(Debug, Clone, Copy)]
pub struct TopLevelItem<'t> {
    /// `export_statement` when exported, otherwise the declaration itself.
    pub statement: Node<'t>,
    pub declaration: Node<'t>,
    pub exported: bool,
    pub default_export: bool,
}

/// Lists top-level declarations in source order.
pub fn top_level_declarations(root: Node<'_>) -> Vec<TopLevelItem<'_>> {
    let mut items = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "export_statement" => {
                if let Some(declaration) = child.child_by_field_name("declaration") {
                    let default_export = has_token(child, "default");
                    items.push(TopLevelItem {
                        statement: child,
                        declaration,
                        exported: true,
                        default_export,
                    });
                }
            }
            kind if is_declaration_kind(kind) => items.push(TopLevelItem {
                statement: child,
                declaration: child,
                exported: false,
                default_export: false,
            }),
            _ => {}
        }
    }
    items
}

/// Decorators attached to a top-level item, whether written before `export`
/// or before `class`.
pub fn decorator_nodes<'t>(item: &TopLevelItem<'t>) -> Vec<Node<'t>> {
    let mut decorators = Vec::new();
    let mut cursor = item.statement.walk();
    if item.statement.id() != item.declaration.id() {
        decorators.extend(item.statement.children_by_field_name("decorator", &mut cursor));
    }
    let mut cursor = item.declaration.walk();
    decorators.extend(item.declaration.children_by_field_name("decorator", &mut cursor));
    decorators
}

pub fn is_declaration_kind(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "abstract_class_declaration"
            | "interface_declaration"
            | "type_alias_declaration"
            | "enum_declaration"
            | "function_declaration"
            | "generator_function_declaration"
            | "lexical_declaration"
            | "variable_declaration"
    )
}

pub fn is_class_kind(kind: &str) -> bool {
    matches!(kind, "class_declaration" | "abstract_class_declaration")
}

pub fn node_text<'s>(source: &'s str, node: Node) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

pub fn span_of(node: Node) -> Span {
    Span::new(node.start_byte(), node.end_byte(), node.start_position().row)
}

/// Whether `node` has an anonymous child token with exactly this text.
pub fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == token);
    found
}

/// Strips the quotes from a string literal node.
pub fn string_value(source: &str, node: Node) -> String {
    let text = node_text(source, node);
    if text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\''))
            || (text.starts_with('`') && text.ends_with('`')))
    {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

/// Collects every identifier-like name below `node`: value identifiers, type
/// identifiers and shorthand properties. Property names are not references.
pub fn collect_identifiers(source: &str, node: Node, out: &mut BTreeSet<String>) {
    match node.kind() {
        "identifier" | "type_identifier" | "shorthand_property_identifier" => {
            out.insert(node_text(source, node).to_string());
        }
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_identifiers(source, child, out);
    }
}

/// Name of the function a decorator applies.
pub fn decorator_name(source: &str, decorator: Node) -> Option<String> {
    let mut cursor = decorator.walk();
    let expr = decorator.named_children(&mut cursor).next()?;
    let callee = match expr.kind() {
        "call_expression" => expr.child_by_field_name("function")?,
        _ => expr,
    };
    match callee.kind() {
        "identifier" => Some(node_text(source, callee).to_string()),
        "member_expression" => callee
            .child_by_field_name("property")
            .map(|p| node_text(source, p).to_string()),
        _ => None,
    }
}

/// AST visitor that extracts the module summary from tree-sitter nodes.
struct Visitor<'a> {
    source: &'a str,
    module: ParsedModule,
}

impl<'a> Visitor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            module: ParsedModule::default(),
        }
    }

    fn finish(mut self) -> ParsedModule {
        let local_exports = self.module.local_exports.clone();
        for decl in &mut self.module.declarations {
            if decl.names.iter().any(|n| local_exports.contains(n)) {
                decl.exported = true;
            }
        }
        self.module
    }

    fn node_text(&self, node: Node) -> &str {
        node_text(self.source, node)
    }

    fn visit_program(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "import_statement" => self.visit_import(child),
                "export_statement" => self.visit_export(child),
                _ => {}
            }
        }

        for item in top_level_declarations(node) {
            if let Some(decl) = self.visit_declaration(&item) {
                self.module.declarations.push(decl);
            }
        }
    }

    fn visit_import(&mut self, node: Node) {
        let Some(source_node) = node.child_by_field_name("source") else {
            // `import x = require("y")` and friends are not module edges we follow
            return;
        };

        let mut decl = ImportDecl {
            source: string_value(self.source, source_node),
            type_only: has_token(node, "type"),
            default: None,
            namespace: None,
            specifiers: Vec::new(),
            span: span_of(node),
            source_span: span_of(source_node),
            quote: quote_of(self.node_text(source_node)),
        };

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "import_clause" {
                self.visit_import_clause(child, &mut decl);
            }
        }

        self.module.imports.push(decl);
    }

    fn visit_import_clause(&self, node: Node, decl: &mut ImportDecl) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "identifier" => {
                    decl.default = Some(self.node_text(child).to_string());
                }
                "namespace_import" => {
                    let mut inner = child.walk();
                    let found = child.named_children(&mut inner).find(|c| c.kind() == "identifier");
                    if let Some(id) = found {
                        decl.namespace = Some(self.node_text(id).to_string());
                    }
                }
                "named_imports" => {
                    let mut inner = child.walk();
                    for spec in child.named_children(&mut inner) {
                        if spec.kind() == "import_specifier" {
                            if let Some(s) = self.visit_specifier(spec) {
                                decl.specifiers.push(s);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Handles both `import_specifier` and `export_specifier`.
    fn visit_specifier(&self, node: Node) -> Option<ImportSpecifier> {
        let name_node = node.child_by_field_name("name")?;
        let name = match name_node.kind() {
            "string" => string_value(self.source, name_node),
            _ => self.node_text(name_node).to_string(),
        };
        let alias = node
            .child_by_field_name("alias")
            .map(|a| self.node_text(a).to_string());
        Some(ImportSpecifier {
            name,
            alias,
            type_only: has_token(node, "type"),
        })
    }

    fn visit_export(&mut self, node: Node) {
        if node.child_by_field_name("declaration").is_some() || node.child_by_field_name("value").is_some() {
            return;
        }

        let mut specifiers = Vec::new();
        let mut star = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "*" | "namespace_export" => star = true,
                "export_clause" => {
                    let mut inner = child.walk();
                    for spec in child.named_children(&mut inner) {
                        if spec.kind() == "export_specifier" {
                            if let Some(s) = self.visit_specifier(spec) {
                                specifiers.push(s);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        match node.child_by_field_name("source") {
            Some(source_node) => self.module.re_exports.push(ReExportDecl {
                source: string_value(self.source, source_node),
                type_only: has_token(node, "type"),
                star,
                specifiers,
                span: span_of(node),
                source_span: span_of(source_node),
                quote: quote_of(self.node_text(source_node)),
            }),
            None => {
                for spec in specifiers {
                    self.module.local_exports.insert(spec.name);
                }
            }
        }
    }

    fn visit_declaration(&self, item: &TopLevelItem) -> Option<Declaration> {
        let node = item.declaration;
        let (kind, names) = match node.kind() {
            "class_declaration" | "abstract_class_declaration" => (DeclKind::Class, self.field_name(node)),
            "interface_declaration" => (DeclKind::Interface, self.field_name(node)),
            "type_alias_declaration" => (DeclKind::TypeAlias, self.field_name(node)),
            "enum_declaration" => (DeclKind::Enum, self.field_name(node)),
            "function_declaration" | "generator_function_declaration" => {
                (DeclKind::Function, self.field_name(node))
            }
            "lexical_declaration" | "variable_declaration" => (DeclKind::Variable, self.declarator_names(node)),
            _ => return None,
        };
        if names.is_empty() {
            return None;
        }

        let decorators = decorator_nodes(item)
            .into_iter()
            .filter_map(|d| self.visit_decorator(d))
            .collect();

        let mut references = BTreeSet::new();
        collect_identifiers(self.source, item.statement, &mut references);
        for name in &names {
            references.remove(name);
        }

        Some(Declaration {
            names,
            kind,
            exported: item.exported,
            default_export: item.default_export,
            span: span_of(item.statement),
            decl_span: span_of(node),
            decorators,
            references,
        })
    }

    fn field_name(&self, node: Node) -> Vec<String> {
        node.child_by_field_name("name")
            .map(|n| vec![self.node_text(n).to_string()])
            .unwrap_or_default()
    }

    fn declarator_names(&self, node: Node) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "variable_declarator" {
                if let Some(name) = child.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        names.push(self.node_text(name).to_string());
                    } else {
                        // destructuring: bind every identifier in the pattern
                        let mut bound = BTreeSet::new();
                        collect_identifiers(self.source, name, &mut bound);
                        names.extend(bound);
                    }
                }
            }
        }
        names
    }

    fn visit_decorator(&self, node: Node) -> Option<Decorator> {
        let name = decorator_name(self.source, node)?;
        let mut options = Vec::new();

        let mut cursor = node.walk();
        let call = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "call_expression");
        if let Some(args) = call.and_then(|c| c.child_by_field_name("arguments")) {
            let mut args_cursor = args.walk();
            let first = args.named_children(&mut args_cursor).next();
            if let Some(object) = first.filter(|n| n.kind() == "object") {
                let mut pair_cursor = object.walk();
                for pair in object.named_children(&mut pair_cursor) {
                    match pair.kind() {
                        "pair" => {
                            let key = pair.child_by_field_name("key");
                            let value = pair.child_by_field_name("value");
                            if let (Some(key), Some(value)) = (key, value) {
                                let key = match key.kind() {
                                    "string" => string_value(self.source, key),
                                    _ => self.node_text(key).to_string(),
                                };
                                let value = match value.kind() {
                                    "string" => string_value(self.source, value),
                                    _ => self.node_text(value).to_string(),
                                };
                                options.push((key, value));
                            }
                        }
                        "shorthand_property_identifier" => {
                            let text = self.node_text(pair).to_string();
                            options.push((text.clone(), text));
                        }
                        _ => {}
                    }
                }
            }
        }

        Some(Decorator {
            name,
            span: span_of(node),
            options,
        })
    }
}

fn quote_of(literal: &str) -> char {
    if literal.starts_with('\'') {
        '\''
    } else {
        '"'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarize(source: &str) -> ParsedModule {
        let mut parser = TypeScriptParser::new().unwrap();
        parser.parse(source, Path::new("test.ts")).unwrap().summarize()
    }

    #[test]
    fn test_imports_and_reexports() {
        let module = summarize(
            r#"
import type { A, B as Bee } from "./types";
import Def, * as ns from '@lib/x';
import "./polyfill";
export * from "./all";
export { C, D as Dee } from "./more";
"#,
        );

        assert_eq!(module.imports.len(), 3);
        let first = &module.imports[0];
        assert!(first.type_only);
        assert_eq!(first.source, "./types");
        assert_eq!(first.local_names(), vec!["A", "Bee"]);
        assert_eq!(first.imported_names(), vec!["A", "B"]);

        let second = &module.imports[1];
        assert_eq!(second.default.as_deref(), Some("Def"));
        assert_eq!(second.namespace.as_deref(), Some("ns"));
        assert_eq!(second.quote, '\'');

        assert!(module.imports[2].is_bare());

        assert_eq!(module.re_exports.len(), 2);
        assert!(module.re_exports[0].star);
        assert_eq!(module.re_exports[1].specifiers[1].name, "D");

        let deps: Vec<String> = module.dependencies().into_iter().map(|(s, _)| s).collect();
        assert_eq!(deps, vec!["./types", "@lib/x", "./polyfill", "./all", "./more"]);
    }

    #[test]
    fn test_declarations_and_references() {
        let module = summarize(
            r#"
import { UserId } from "./ids";

type Name = string;
export interface User { id: UserId; name: Name }
const DEFAULT_NAME: Name = "anon", OTHER = 1;
function helper(u: User): Name { return u.name; }
enum Role { Admin, Member }
export { Role };
"#,
        );

        let names: Vec<&str> = module.declarations.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["Name", "User", "DEFAULT_NAME", "helper", "Role"]);

        let user = module.declaration("User").unwrap();
        assert!(user.exported);
        assert!(user.references.contains("UserId"));
        assert!(user.references.contains("Name"));
        assert!(!user.references.contains("User"));

        let constants = module.declaration("OTHER").unwrap();
        assert_eq!(constants.names, vec!["DEFAULT_NAME", "OTHER"]);
        assert!(!constants.exported);

        assert!(module.is_exported("Role"));
        assert!(!module.is_exported("Name"));
    }

    #[test]
    fn test_decorators_before_and_after_export() {
        let module = summarize(
            r#"
import { PublicQuery as Q } from "@contracts/markers";

@PublicEvent()
export class UserCreated extends DomainEvent<{ id: string }> {}

export @Q({ response: GetUserResult, version: "2" }) class GetUser extends Query<{ id: string }> {}
"#,
        );

        let created = module.declaration("UserCreated").unwrap();
        assert_eq!(created.decorators.len(), 1);
        assert_eq!(created.decorators[0].name, "PublicEvent");
        assert!(created.references.contains("DomainEvent"));

        let get_user = module.declaration("GetUser").unwrap();
        assert_eq!(get_user.decorators[0].name, "Q");
        assert_eq!(get_user.decorators[0].option("response"), Some("GetUserResult"));
        assert_eq!(get_user.decorators[0].option("version"), Some("2"));
        assert_eq!(module.imported_name("Q"), Some("PublicQuery"));
    }

    #[test]
    fn test_tsx_files_use_tsx_grammar() {
        let mut parser = TypeScriptParser::new().unwrap();
        let tree = parser
            .parse(
                "export const View = () => <div className=\"x\" />;\n",
                Path::new("view.tsx"),
            )
            .unwrap();
        assert!(!tree.root().has_error());
        assert_eq!(tree.summarize().declarations[0].name(), "View");
    }
}
