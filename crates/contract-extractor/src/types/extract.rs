//! Conversion of tree-sitter type nodes into [`TypeRef`].

use std::collections::BTreeSet;
use std::path::Path;
use tree_sitter::Node;

use crate::frontend::typescript::parser::{has_token, node_text, top_level_declarations};
use super::{Field, TypeDefinition, TypeKind, TypeRef};

/// Stateless converter bound to one source text.
pub struct TypeExtractor<'a> {
    source: &'a str,
}

impl<'a> TypeExtractor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    fn text(&self, node: Node) -> &'a str {
        node_text(self.source, node)
    }

    /// Converts a type node (or a `type_annotation` wrapping one).
    pub fn type_ref(&self, node: Node) -> TypeRef {
        match node.kind() {
            "type_annotation" | "parenthesized_type" | "readonly_type" | "optional_type" | "rest_type" => {
                match first_named(node) {
                    Some(inner) => self.type_ref(inner),
                    None => TypeRef::unknown(),
                }
            }
            "predefined_type" => TypeRef::primitive(self.text(node)),
            "type_identifier" | "nested_type_identifier" => TypeRef::reference(self.text(node)),
            "generic_type" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default();
                let type_args = node
                    .child_by_field_name("type_arguments")
                    .map(|args| self.named_types(args))
                    .unwrap_or_default();
                TypeRef::Reference { name, type_args }
            }
            "array_type" => {
                let element = first_named(node)
                    .map(|n| self.type_ref(n))
                    .unwrap_or_else(TypeRef::unknown);
                TypeRef::Array {
                    element: Box::new(element),
                }
            }
            "union_type" => TypeRef::Union {
                members: self.flatten(node, "union_type"),
            },
            "intersection_type" => TypeRef::Intersection {
                members: self.flatten(node, "intersection_type"),
            },
            "object_type" | "interface_body" => TypeRef::Object {
                fields: self.object_fields(node),
            },
            "literal_type" => {
                let text = self.text(node);
                match text {
                    "null" | "undefined" => TypeRef::primitive(text),
                    _ => TypeRef::Literal {
                        value: text.to_string(),
                    },
                }
            }
            "tuple_type" => {
                let mut elements = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "required_parameter" | "optional_parameter" => {
                            elements.push(
                                child
                                    .child_by_field_name("type")
                                    .map(|t| self.type_ref(t))
                                    .unwrap_or_else(TypeRef::unknown),
                            );
                        }
                        _ => elements.push(self.type_ref(child)),
                    }
                }
                TypeRef::Tuple { elements }
            }
            "function_type" | "constructor_type" => {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|p| self.parameters(p))
                    .unwrap_or_default();
                let return_type = node
                    .child_by_field_name("return_type")
                    .map(|r| self.type_ref(r))
                    .unwrap_or_else(|| TypeRef::primitive("void"));
                TypeRef::Function {
                    params,
                    return_type: Box::new(return_type),
                }
            }
            // keyof, typeof, indexed access, conditional, mapped, template literal
            _ => TypeRef::reference(self.text(node)),
        }
    }

    fn named_types(&self, node: Node) -> Vec<TypeRef> {
        let mut cursor = node.walk();
        let types = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() != "comment")
            .map(|c| self.type_ref(c))
            .collect();
        types
    }

    /// Left-nested `A | B | C` becomes one flat member list.
    fn flatten(&self, node: Node, kind: &str) -> Vec<TypeRef> {
        let mut members = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == kind {
                members.extend(self.flatten(child, kind));
            } else if child.kind() != "comment" {
                members.push(self.type_ref(child));
            }
        }
        members
    }

    /// Fields of an object type / interface body, in declaration order.
    pub fn object_fields(&self, node: Node) -> Vec<Field> {
        let mut fields = Vec::new();
        let mut cursor = node.walk();
        for member in node.named_children(&mut cursor) {
            match member.kind() {
                "property_signature" => {
                    let Some(name) = member.child_by_field_name("name") else { continue };
                    let type_ref = member
                        .child_by_field_name("type")
                        .map(|t| self.type_ref(t))
                        .unwrap_or_else(|| TypeRef::primitive("any"));
                    fields.push(Field {
                        name: property_name(self.source, name),
                        type_ref,
                        optional: has_token(member, "?"),
                        readonly: has_token(member, "readonly"),
                    });
                }
                "method_signature" => {
                    let Some(name) = member.child_by_field_name("name") else { continue };
                    let params = member
                        .child_by_field_name("parameters")
                        .map(|p| self.parameters(p))
                        .unwrap_or_default();
                    let return_type = member
                        .child_by_field_name("return_type")
                        .map(|r| self.type_ref(r))
                        .unwrap_or_else(|| TypeRef::primitive("void"));
                    fields.push(Field {
                        name: property_name(self.source, name),
                        type_ref: TypeRef::Function {
                            params,
                            return_type: Box::new(return_type),
                        },
                        optional: has_token(member, "?"),
                        readonly: false,
                    });
                }
                "index_signature" => {
                    let mut inner = member.walk();
                    let key = member
                        .named_children(&mut inner)
                        .find(|c| c.kind() == "identifier")
                        .map(|k| self.text(k).to_string())
                        .unwrap_or_else(|| "key".to_string());
                    let type_ref = member
                        .child_by_field_name("type")
                        .map(|t| self.type_ref(t))
                        .unwrap_or_else(TypeRef::unknown);
                    fields.push(Field {
                        name: format!("[{}]", key),
                        type_ref,
                        optional: false,
                        readonly: has_token(member, "readonly"),
                    });
                }
                _ => {}
            }
        }
        fields
    }

    fn parameters(&self, node: Node) -> Vec<Field> {
        let mut params = Vec::new();
        let mut cursor = node.walk();
        for param in node.named_children(&mut cursor) {
            if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                continue;
            }
            let name = param
                .child_by_field_name("pattern")
                .map(|p| self.text(p).to_string())
                .unwrap_or_default();
            let type_ref = param
                .child_by_field_name("type")
                .map(|t| self.type_ref(t))
                .unwrap_or_else(|| TypeRef::primitive("any"));
            params.push(Field {
                name,
                type_ref,
                optional: param.kind() == "optional_parameter",
                readonly: has_token(param, "readonly"),
            });
        }
        params
    }

    /// Fields declared in a class body (instance properties only).
    pub fn class_fields(&self, body: Node) -> Vec<Field> {
        let mut fields = Vec::new();
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() != "public_field_definition" || has_token(member, "static") {
                continue;
            }
            let Some(name) = member.child_by_field_name("name") else { continue };
            let type_ref = member
                .child_by_field_name("type")
                .map(|t| self.type_ref(t))
                .unwrap_or_else(|| TypeRef::primitive("any"));
            fields.push(Field {
                name: property_name(self.source, name),
                type_ref,
                optional: has_token(member, "?"),
                readonly: has_token(member, "readonly"),
            });
        }
        fields
    }

    fn type_parameters(&self, node: Node) -> Vec<String> {
        let Some(params) = node.child_by_field_name("type_parameters") else {
            return Vec::new();
        };
        let mut cursor = params.walk();
        let names = params
            .named_children(&mut cursor)
            .filter(|p| p.kind() == "type_parameter")
            .filter_map(|p| p.child_by_field_name("name"))
            .map(|n| self.text(n).to_string())
            .collect();
        names
    }

    /// Extracts every top-level type alias, interface, enum and class.
    ///
    /// `skip_classes` names classes that should not become type definitions
    /// (the marked message classes). `local_exports` are names exported via a
    /// separate `export { ... }` clause.
    pub fn definitions(
        &self,
        root: Node,
        source_file: &Path,
        skip_classes: &BTreeSet<String>,
        local_exports: &BTreeSet<String>,
    ) -> Vec<TypeDefinition> {
        let mut definitions = Vec::new();
        for item in top_level_declarations(root) {
            let node = item.declaration;
            let Some(name_node) = node.child_by_field_name("name") else { continue };
            let name = self.text(name_node).to_string();

            let (kind, body) = match node.kind() {
                "type_alias_declaration" => (
                    TypeKind::Type,
                    node.child_by_field_name("value")
                        .map(|v| self.type_ref(v))
                        .unwrap_or_else(TypeRef::unknown),
                ),
                "interface_declaration" => (TypeKind::Interface, self.interface_body(node)),
                "enum_declaration" => (TypeKind::Enum, self.enum_body(node)),
                "class_declaration" | "abstract_class_declaration" => {
                    if skip_classes.contains(&name) {
                        continue;
                    }
                    let fields = node
                        .child_by_field_name("body")
                        .map(|b| self.class_fields(b))
                        .unwrap_or_default();
                    (TypeKind::Class, TypeRef::Object { fields })
                }
                _ => continue,
            };

            definitions.push(TypeDefinition {
                exported: item.exported || local_exports.contains(&name),
                type_parameters: self.type_parameters(node),
                name,
                kind,
                source_file: source_file.to_path_buf(),
                body,
            });
        }
        definitions
    }

    fn interface_body(&self, node: Node) -> TypeRef {
        let object = TypeRef::Object {
            fields: node
                .child_by_field_name("body")
                .map(|b| self.object_fields(b))
                .unwrap_or_default(),
        };

        let mut extends = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "extends_type_clause" {
                let mut inner = child.walk();
                for ty in child.named_children(&mut inner) {
                    extends.push(self.type_ref(ty));
                }
            }
        }

        if extends.is_empty() {
            object
        } else {
            extends.push(object);
            TypeRef::Intersection { members: extends }
        }
    }

    /// Enum members become literals: the initializer text when present,
    /// otherwise the member name.
    fn enum_body(&self, node: Node) -> TypeRef {
        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "enum_assignment" => {
                        let value = member
                            .child_by_field_name("value")
                            .or_else(|| member.child_by_field_name("name"))
                            .map(|v| self.text(v).to_string())
                            .unwrap_or_default();
                        members.push(TypeRef::Literal { value });
                    }
                    "property_identifier" | "string" => members.push(TypeRef::Literal {
                        value: self.text(member).to_string(),
                    }),
                    _ => {}
                }
            }
        }
        TypeRef::Union { members }
    }
}

fn first_named(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let first = node.named_children(&mut cursor).find(|c| c.kind() != "comment");
    first
}

fn property_name(source: &str, node: Node) -> String {
    match node.kind() {
        "string" => crate::frontend::typescript::parser::string_value(source, node),
        _ => node_text(source, node).to_string(),
    }
}
